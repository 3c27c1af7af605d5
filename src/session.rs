//! Session driver — one connection's worth of protocol, from handshake
//! to EndOfTransmission.
//!
//! ```text
//!   Disconnected ─▶ Handshaking ─▶ Configuring ─▶ Active ─▶ Disconnected
//! ```
//!
//! The Active loop is strictly ordered: drain every available inbound
//! frame first, then measure, transmit records, and advance the sweep.
//! That ordering guarantees inbound commands (a RequestRetransmit in
//! particular) are observed before the next outbound batch is built.
//! A transport fault is the only fatal condition — it is logged, a
//! best-effort EndOfTransmission goes out, and the caller re-initialises
//! the whole session from scratch.

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::link::driver::{LinkDriver, RxIdle};
use crate::link::transport::Transport;
use crate::link::wire::{Command, Frame, Position, StepSize};
use crate::link::{procs, LinkError};
use crate::ports::{MotionPort, ParamSink, ScanSource};
use crate::survey::{measure, sweep, StepOutcome, SurveyState};

/// Where in its lifecycle the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Handshaking,
    Configuring,
    Active,
}

/// Applies a received SetParams to the device state, driving motion.
struct ParamApplier<'a, M: MotionPort> {
    state: &'a mut SurveyState,
    motion: &'a mut M,
}

impl<M: MotionPort> ParamSink for ParamApplier<'_, M> {
    fn apply_params(&mut self, position: Position, step_size: StepSize, measurements_per_step: u8) {
        self.state
            .apply_params(position, step_size, measurements_per_step, self.motion);
    }
}

/// One logical connection to the camera node.
pub struct Session<T: Transport, W: RxIdle> {
    driver: LinkDriver<T, W>,
    state: SurveyState,
    config: SystemConfig,
    phase: SessionPhase,
}

impl<T: Transport, W: RxIdle> Session<T, W> {
    pub fn new(driver: LinkDriver<T, W>, config: SystemConfig) -> Self {
        Self {
            driver,
            state: SurveyState::new(),
            config,
            phase: SessionPhase::Disconnected,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SurveyState {
        &self.state
    }

    /// Run one full connection: handshake, configuration, then the
    /// measure/transmit/step cycle until the sweep finishes or either
    /// side closes. On a fatal link error the peer gets a best-effort
    /// EndOfTransmission and the error is returned for the outer loop to
    /// re-initialise.
    pub fn run(
        &mut self,
        motion: &mut impl MotionPort,
        scanner: &mut impl ScanSource,
    ) -> Result<()> {
        self.driver.queue_mut().reset();
        self.state.reset();

        let outcome = self.run_connection(motion, scanner);
        self.set_phase(SessionPhase::Disconnected);

        match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("session aborted: {e}");
                self.state.set_active(false);
                // Best effort; the transport may already be gone. Sent
                // untracked so it cannot re-enter the ack machinery.
                let eot =
                    Frame::from_command(Command::EndOfTransmission, self.driver.queue().local_frame_id());
                let _ = self.driver.resend(&eot);
                Err(Error::Link(e))
            }
        }
    }

    fn run_connection(
        &mut self,
        motion: &mut impl MotionPort,
        scanner: &mut impl ScanSource,
    ) -> core::result::Result<(), LinkError> {
        self.set_phase(SessionPhase::Handshaking);
        procs::handshake_listen(&mut self.driver)?;
        info!("handshake performed successfully");

        self.set_phase(SessionPhase::Configuring);
        {
            let mut sink = ParamApplier {
                state: &mut self.state,
                motion,
            };
            procs::configure_listen(&mut self.driver, &mut sink)?;
        }
        info!("reset/configuration exchange performed successfully");

        self.state.set_active(true);
        self.set_phase(SessionPhase::Active);

        while self.state.is_active() {
            self.drain_inbound(motion)?;
            if !self.state.is_active() {
                break;
            }

            measure::measure_rssi(&mut self.state, scanner);
            procs::drain_and_send_records(&mut self.driver, &mut self.state)?;

            if sweep::advance_step(&mut self.state, motion, &self.config)
                == StepOutcome::SweepComplete
            {
                self.finish_sweep(motion)?;
            }
        }
        Ok(())
    }

    /// Pull every frame the transport already has before doing outbound
    /// work.
    fn drain_inbound(
        &mut self,
        motion: &mut impl MotionPort,
    ) -> core::result::Result<(), LinkError> {
        while self.state.is_active() && self.driver.inbound_available() {
            match self.driver.receive_frame() {
                Ok(frame) => self.handle_incoming(frame, motion)?,
                Err(LinkError::Frame(e)) => {
                    warn!("inbound frame rejected: {e}");
                    // With a readable header the offending frame can be
                    // named precisely; otherwise the next ack walk will
                    // catch the hole.
                    if let Some(id) = self.driver.last_rx_header_id() {
                        self.driver.send_command(Command::RequestRetransmit {
                            frame_id_start: id,
                            frame_id_end: id.wrapping_add(1),
                        })?;
                    }
                }
                Err(fatal) => return Err(fatal),
            }
        }
        Ok(())
    }

    /// Dispatch one inbound frame.
    pub fn handle_incoming(
        &mut self,
        frame: Frame,
        motion: &mut impl MotionPort,
    ) -> core::result::Result<(), LinkError> {
        match frame.cmd {
            Command::SetPosition { position } => {
                self.state.set_position(position.pitch, position.yaw, motion);
            }
            Command::SetParams {
                position,
                step_size,
                measurements_per_step,
            } => {
                self.state
                    .apply_params(position, step_size, measurements_per_step, motion);
            }
            Command::Ack { frame_id } => {
                procs::process_ack(self.driver.queue_mut(), frame_id);
            }
            Command::RequestAck { .. } => {
                procs::answer_ack_request(&mut self.driver)?;
            }
            Command::RequestRetransmit {
                frame_id_start,
                frame_id_end,
            } => {
                procs::handle_retransmit_request(&mut self.driver, frame_id_start, frame_id_end)?;
            }
            Command::EndOfTransmission => {
                info!("peer closed the connection");
                self.state.set_active(false);
            }
            other => {
                warn!("unhandled {:?} frame; ignoring", other.kind());
            }
        }
        Ok(())
    }

    /// The sweep covered its whole envelope: notify the peer, then wind
    /// the yaw back home so the cabling untwists.
    fn finish_sweep(&mut self, motion: &mut impl MotionPort) -> core::result::Result<(), LinkError> {
        info!("survey sweep complete; closing the connection");
        self.driver.send_command(Command::EndOfTransmission)?;
        self.state.set_active(false);

        let pitch = self.state.position().pitch;
        self.state.direction_mut().invert_horizontal();
        self.state.set_position(pitch, 0, motion);
        self.state.direction_mut().invert_horizontal();
        Ok(())
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if self.phase != next {
            info!("session phase: {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::driver::test_support::ScriptTransport;
    use crate::link::driver::SpinIdle;
    use crate::link::wire::{parse_frame, CommandKind, NetworkId, Ssid};
    use crate::ports::{NullMotion, NullScan, ScanEntry};

    fn deg_to_raw(deg: f64) -> u32 {
        (deg / 360.0 * 4_294_967_296.0) as u32
    }

    fn decode_all(mut bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        while !bytes.is_empty() {
            let (frame, consumed) = parse_frame(bytes).expect("outbound stream must be valid");
            frames.push(frame);
            bytes = &bytes[consumed..];
        }
        frames
    }

    fn handshake_and_config_frames(script: &mut ScriptTransport, step_deg: f64) {
        script.push_inbound(&Frame::from_command(Command::StartOfTransmission, 0).to_bytes());
        script.push_inbound(&Frame::from_command(Command::Reset, 1).to_bytes());
        script.push_inbound(
            &Frame::from_command(
                Command::SetParams {
                    position: Position::new(deg_to_raw(50.0), 0),
                    step_size: StepSize::new(deg_to_raw(step_deg), deg_to_raw(200.0)),
                    measurements_per_step: 1,
                },
                2,
            )
            .to_bytes(),
        );
        script.push_inbound(&Frame::from_command(Command::Ready, 3).to_bytes());
    }

    struct OneShotScan;

    impl crate::ports::ScanSource for OneShotScan {
        fn scan(&mut self) -> Vec<ScanEntry> {
            vec![ScanEntry {
                ssid: Ssid::new("lab").unwrap(),
                bssid: crate::link::wire::Bssid::new([1, 2, 3, 4, 5, 6]),
                rssi_dbm: -55,
            }]
        }
    }

    #[test]
    fn session_ends_when_peer_sends_eot() {
        let mut script = ScriptTransport::new();
        handshake_and_config_frames(&mut script, 10.0);
        script.push_inbound(&Frame::from_command(Command::EndOfTransmission, 4).to_bytes());

        let driver = LinkDriver::new(script, SpinIdle);
        let mut session = Session::new(driver, SystemConfig::default());
        session.run(&mut NullMotion, &mut NullScan).unwrap();

        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert!(!session.state().is_active());

        // Handshake acks, configuration ack + Ready — and nothing after
        // the EoT stopped the loop before any measurement.
        let sent = decode_all(&session.driver.transport().outbound);
        let kinds: Vec<CommandKind> = sent.iter().map(|f| f.cmd.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Ack,
                CommandKind::Ack,
                CommandKind::Ack,
                CommandKind::Ready,
            ]
        );
        // All outbound ids are drawn from one counter, gap-free.
        let ids: Vec<u32> = sent.iter().map(|f| f.frame_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn full_sweep_announces_measures_and_closes() {
        let mut script = ScriptTransport::new();
        // A 100° pitch step leaves the vertical envelope immediately, so
        // each cycle takes a 200° yaw step: two cycles and the sweep is
        // done.
        handshake_and_config_frames(&mut script, 100.0);

        let driver = LinkDriver::new(script, SpinIdle);
        let mut session = Session::new(driver, SystemConfig::default());
        session.run(&mut NullMotion, &mut OneShotScan).unwrap();

        let sent = decode_all(&session.driver.transport().outbound);
        let kinds: Vec<CommandKind> = sent.iter().map(|f| f.cmd.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Ack,
                CommandKind::Ack,
                CommandKind::Ack,
                CommandKind::Ready,
                // First cycle: the new network is announced before its
                // record ships.
                CommandKind::AddSsid,
                CommandKind::AddBssid,
                CommandKind::RecordRssi,
                // Second cycle: nothing new to announce.
                CommandKind::RecordRssi,
                CommandKind::EndOfTransmission,
            ]
        );

        // The record references the announced handle.
        let announced_id = sent
            .iter()
            .find_map(|f| match &f.cmd {
                Command::AddSsid { id, .. } => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(announced_id, NetworkId::new(1));
        match &sent[6].cmd {
            Command::RecordRssi { records, .. } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].id, announced_id);
                assert_eq!(records[0].rssi.dbm(), -55);
            }
            other => panic!("expected RecordRssi, got {other:?}"),
        }

        // The head wound back to yaw 0 after closing.
        assert_eq!(session.state().position().yaw, 0);
        assert!(!session.state().is_active());
    }

    #[test]
    fn undecodable_inbound_frame_triggers_a_retransmit_request() {
        let mut script = ScriptTransport::new();
        handshake_and_config_frames(&mut script, 10.0);

        // A frame whose trailer was mangled in transit, then a clean EoT.
        let mut corrupt = Frame::from_command(Command::Ready, 7).to_bytes();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x40;
        script.push_inbound(&corrupt);
        script.push_inbound(&Frame::from_command(Command::EndOfTransmission, 8).to_bytes());

        let driver = LinkDriver::new(script, SpinIdle);
        let mut session = Session::new(driver, SystemConfig::default());
        session.run(&mut NullMotion, &mut NullScan).unwrap();

        let sent = decode_all(&session.driver.transport().outbound);
        let request = sent
            .iter()
            .find_map(|f| match f.cmd {
                Command::RequestRetransmit {
                    frame_id_start,
                    frame_id_end,
                } => Some((frame_id_start, frame_id_end)),
                _ => None,
            })
            .expect("a retransmit request must go out");
        assert_eq!(request, (7, 8));
    }

    #[test]
    fn set_position_command_moves_the_head() {
        let mut script = ScriptTransport::new();
        handshake_and_config_frames(&mut script, 100.0);
        script.push_inbound(
            &Frame::from_command(
                Command::SetPosition {
                    position: Position::new(deg_to_raw(30.0), deg_to_raw(40.0)),
                },
                4,
            )
            .to_bytes(),
        );
        script.push_inbound(&Frame::from_command(Command::EndOfTransmission, 5).to_bytes());

        let driver = LinkDriver::new(script, SpinIdle);
        let mut session = Session::new(driver, SystemConfig::default());
        session.run(&mut NullMotion, &mut NullScan).unwrap();

        // EoT lands after SetPosition, so the moved position survives.
        assert!((session.state().position().pitch_deg() - 30.0).abs() < 0.01);
        assert!((session.state().position().yaw_deg() - 40.0).abs() < 0.01);
    }
}
