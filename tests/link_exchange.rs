//! End-to-end exchanges between both roles of the protocol, run over an
//! in-memory duplex pipe with the survey head on one thread and the
//! camera-node role on another.

#![cfg(not(target_os = "espidf"))]

use std::collections::BTreeSet;
use std::thread;

use surveyrig::config::SystemConfig;
use surveyrig::link::driver::{LinkDriver, RxIdle};
use surveyrig::link::transport::pipe::{duplex, PipeEnd};
use surveyrig::link::transport::{Transport, TransportError};
use surveyrig::link::wire::{Bssid, Command, CommandKind, Frame, Position, Ssid, StepSize};
use surveyrig::link::{procs, LinkError};
use surveyrig::ports::{NullMotion, ScanEntry, ScanSource};
use surveyrig::session::Session;

/// Keep the spinning reader polite to the other thread.
struct YieldIdle;

impl RxIdle for YieldIdle {
    fn on_idle(&mut self) {
        thread::yield_now();
    }
}

fn deg_to_raw(deg: f64) -> u32 {
    (deg / 360.0 * 4_294_967_296.0) as u32
}

/// A scanner that sights the same access points every pass.
struct FixedNetworks {
    entries: Vec<(&'static str, [u8; 6], i32)>,
}

impl ScanSource for FixedNetworks {
    fn scan(&mut self) -> Vec<ScanEntry> {
        self.entries
            .iter()
            .map(|(name, addr, rssi)| ScanEntry {
                ssid: Ssid::new(name).expect("test ssid fits"),
                bssid: Bssid::new(*addr),
                rssi_dbm: *rssi,
            })
            .collect()
    }
}

/// Camera-node role: initiate the handshake and configuration, then
/// consume survey frames (answering ack requests) until the peer closes.
fn run_camera_node(end: PipeEnd, step_deg: f64) -> Vec<Frame> {
    let mut drv = LinkDriver::new(end, YieldIdle);

    procs::handshake_initiate(&mut drv).expect("handshake");
    procs::configure_initiate(
        &mut drv,
        Position::new(deg_to_raw(50.0), 0),
        StepSize::new(deg_to_raw(step_deg), deg_to_raw(200.0)),
        1,
    )
    .expect("configuration");

    let mut collected = Vec::new();
    loop {
        match drv.receive_frame() {
            Ok(frame) => {
                let kind = frame.cmd.kind();
                collected.push(frame);
                match kind {
                    CommandKind::EndOfTransmission => break,
                    CommandKind::RequestAck => {
                        procs::answer_ack_request(&mut drv).expect("ack answer");
                    }
                    _ => {}
                }
            }
            Err(LinkError::Frame(_)) => {}
            Err(fatal) => panic!("camera role hit a fatal link error: {fatal}"),
        }
    }
    collected
}

#[test]
fn clean_survey_exchange() {
    let (head_end, camera_end) = duplex();

    let camera = thread::spawn(move || run_camera_node(camera_end, 100.0));

    let mut session = Session::new(LinkDriver::new(head_end, YieldIdle), SystemConfig::default());
    let mut scanner = FixedNetworks {
        entries: vec![("lab", [1, 2, 3, 4, 5, 6], -55)],
    };
    session.run(&mut NullMotion, &mut scanner).expect("session");

    let collected = camera.join().expect("camera thread");
    let kinds: Vec<CommandKind> = collected.iter().map(|f| f.cmd.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            CommandKind::AddSsid,
            CommandKind::AddBssid,
            CommandKind::RecordRssi,
            CommandKind::RecordRssi,
            CommandKind::EndOfTransmission,
        ]
    );

    // The announcement precedes the record that references it.
    let announced = match &collected[0].cmd {
        Command::AddSsid { id, ssid } => {
            assert_eq!(ssid.as_str(), "lab");
            *id
        }
        other => panic!("expected AddSsid first, got {other:?}"),
    };
    match &collected[2].cmd {
        Command::RecordRssi { records, .. } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, announced);
        }
        other => panic!("expected RecordRssi, got {other:?}"),
    }
}

/// Pipe wrapper that silently swallows one chosen outbound frame write,
/// simulating loss on the line.
struct LossyPipe {
    inner: PipeEnd,
    writes_seen: usize,
    drop_nth: usize,
    dropped: bool,
}

impl Transport for LossyPipe {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.inner.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let n = self.writes_seen;
        self.writes_seen += 1;
        if n == self.drop_nth && !self.dropped {
            self.dropped = true;
            return Ok(());
        }
        self.inner.write(data)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.inner.flush()
    }

    fn available(&self) -> bool {
        self.inner.available()
    }
}

#[test]
fn lost_frame_is_recovered_through_the_ack_exchange() {
    let (head_end, camera_end) = duplex();

    let camera = thread::spawn(move || run_camera_node(camera_end, 100.0));

    // Four networks per pass pushes the head past the unack threshold in
    // the first cycle, forcing a RequestAck exchange. Write #6 is the
    // third AddSsid announcement (after 4 handshake/config responses and
    // two earlier announcements) — dropping it opens a hole the
    // exchange must detect and repair.
    let lossy = LossyPipe {
        inner: head_end,
        writes_seen: 0,
        drop_nth: 6,
        dropped: false,
    };
    let mut session = Session::new(LinkDriver::new(lossy, YieldIdle), SystemConfig::default());
    let mut scanner = FixedNetworks {
        entries: vec![
            ("lab", [1, 1, 1, 1, 1, 1], -50),
            ("guest", [2, 2, 2, 2, 2, 2], -60),
            ("ops", [3, 3, 3, 3, 3, 3], -70),
            ("iot", [4, 4, 4, 4, 4, 4], -80),
        ],
    };
    session.run(&mut NullMotion, &mut scanner).expect("session");

    let collected = camera.join().expect("camera thread");

    // Despite the loss, every announcement eventually arrived.
    let ssids: BTreeSet<String> = collected
        .iter()
        .filter_map(|f| match &f.cmd {
            Command::AddSsid { ssid, .. } => Some(ssid.as_str().to_owned()),
            _ => None,
        })
        .collect();
    assert_eq!(
        ssids,
        BTreeSet::from([
            "lab".to_owned(),
            "guest".to_owned(),
            "ops".to_owned(),
            "iot".to_owned(),
        ])
    );

    let bssid_count = collected
        .iter()
        .filter(|f| f.cmd.kind() == CommandKind::AddBssid)
        .count();
    assert_eq!(bssid_count, 4);

    // The recovery really happened: the camera asked for a retransmit
    // and saw the RequestAck at least twice (original + re-send).
    let request_acks = collected
        .iter()
        .filter(|f| f.cmd.kind() == CommandKind::RequestAck)
        .count();
    assert!(request_acks >= 2, "expected the RequestAck to be re-sent");

    // Records reference only announced network handles.
    let announced: BTreeSet<u32> = collected
        .iter()
        .filter_map(|f| match &f.cmd {
            Command::AddSsid { id, .. } => Some(id.value()),
            _ => None,
        })
        .collect();
    for frame in &collected {
        if let Command::RecordRssi { records, .. } = &frame.cmd {
            for record in records {
                assert!(
                    announced.contains(&record.id.value()),
                    "record referenced an unannounced network"
                );
            }
        }
    }

    assert_eq!(
        collected.last().map(|f| f.cmd.kind()),
        Some(CommandKind::EndOfTransmission)
    );
}
