//! Protocol procedures — handshake, configuration, record exchange, and
//! the ack/retransmit sub-protocol, expressed as sequences of link driver
//! calls.
//!
//! Each exchange exists in both roles: the survey head *listens* for the
//! handshake and configuration (the peer initiates), and *initiates* the
//! record transmission. The ack/retransmit machinery is symmetric.

use log::{debug, error, info, warn};

use crate::ports::ParamSink;
use crate::survey::SurveyState;

use super::driver::{LinkDriver, RxIdle};
use super::queue::FrameQueue;
use super::transport::Transport;
use super::wire::{Command, CommandKind, Frame, Position, StepSize};
use super::LinkError;

/// How many responses the ack-request loop will examine before declaring
/// the exchange dead. Comfortably above the unack window, so a live peer
/// cannot trip it even while interleaving retransmit requests.
pub const ACK_EXCHANGE_ROUND_LIMIT: usize = 32;

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Receiver role: wait for StartOfTransmission, ack it, wait for Reset,
/// ack that. Anything else arriving mid-sequence is logged and dropped.
pub fn handshake_listen<T: Transport, W: RxIdle>(
    drv: &mut LinkDriver<T, W>,
) -> Result<(), LinkError> {
    info!("waiting for handshake...");
    drv.receive_expect(CommandKind::StartOfTransmission)?;
    drv.send_command(Command::Ack { frame_id: 0 })?;
    drv.receive_expect(CommandKind::Reset)?;
    drv.send_command(Command::Ack { frame_id: 0 })?;
    Ok(())
}

/// Initiator role: the mirror image of [`handshake_listen`].
pub fn handshake_initiate<T: Transport, W: RxIdle>(
    drv: &mut LinkDriver<T, W>,
) -> Result<(), LinkError> {
    drv.send_command(Command::StartOfTransmission)?;
    drv.receive_expect(CommandKind::Ack)?;
    drv.send_command(Command::Reset)?;
    drv.receive_expect(CommandKind::Ack)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Configuration exchange
// ---------------------------------------------------------------------------

/// Receiver role: take the peer's SetParams, ack it, apply it through the
/// injected sink (which may drive physical motion), then swap Ready
/// frames.
pub fn configure_listen<T: Transport, W: RxIdle, P: ParamSink>(
    drv: &mut LinkDriver<T, W>,
    sink: &mut P,
) -> Result<(), LinkError> {
    let frame = drv.receive_expect(CommandKind::SetParams)?;
    drv.send_command(Command::Ack { frame_id: 0 })?;

    if let Command::SetParams {
        position,
        step_size,
        measurements_per_step,
    } = frame.cmd
    {
        sink.apply_params(position, step_size, measurements_per_step);
    }

    drv.send_command(Command::Ready)?;
    drv.receive_expect(CommandKind::Ready)?;
    Ok(())
}

/// Initiator role: push the initial parameters and wait for the peer to
/// finish its physical preparation.
pub fn configure_initiate<T: Transport, W: RxIdle>(
    drv: &mut LinkDriver<T, W>,
    position: Position,
    step_size: StepSize,
    measurements_per_step: u8,
) -> Result<(), LinkError> {
    drv.send_command(Command::SetParams {
        position,
        step_size,
        measurements_per_step,
    })?;
    drv.receive_expect(CommandKind::Ack)?;
    drv.receive_expect(CommandKind::Ready)?;
    drv.send_command(Command::Ready)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Record transmission
// ---------------------------------------------------------------------------

/// Once per measurement cycle: announce any not-yet-announced SSIDs and
/// BSSIDs, then ship all accumulated records in one RecordRSSI frame.
/// Announcements must precede any RecordRSSI referencing their ids.
pub fn drain_and_send_records<T: Transport, W: RxIdle>(
    drv: &mut LinkDriver<T, W>,
    state: &mut SurveyState,
) -> Result<(), LinkError> {
    for ssid in state.take_pending_ssids() {
        match state.network_id_of(&ssid) {
            Some(id) => {
                drv.send_command(Command::AddSsid { id, ssid })?;
            }
            None => warn!("pending ssid '{ssid}' missing from table; dropping announcement"),
        }
    }

    for bssid in state.take_pending_bssids() {
        match state.resolve_bssid_network(&bssid) {
            Some(id) => {
                drv.send_command(Command::AddBssid { id, bssid })?;
            }
            None => warn!("bssid {bssid} has no resolved ssid; dropping announcement"),
        }
    }

    let records = state.take_pending_records();
    drv.send_command(Command::RecordRssi {
        position: state.position(),
        records,
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Ack / retransmit sub-protocol
// ---------------------------------------------------------------------------

/// Apply a peer Ack: every tracked frame with `frame_id <= id` is
/// delivered.
pub fn process_ack(queue: &mut FrameQueue, frame_id: u32) {
    queue.ack_up_to(frame_id);
    debug!(
        "acked through id {frame_id}; {} frames still pending",
        queue.unacked_count()
    );
}

/// Resend every tracked frame with `start <= frame_id < end`, in queue
/// order.
pub fn handle_retransmit_request<T: Transport, W: RxIdle>(
    drv: &mut LinkDriver<T, W>,
    start: u32,
    end: u32,
) -> Result<(), LinkError> {
    let wanted: Vec<Frame> = drv.queue().pending_in_range(start, end).cloned().collect();
    for frame in &wanted {
        debug!("retransmitting frame id={}", frame.frame_id);
        drv.resend(frame)?;
    }
    debug!("finished retransmission of requested frames");
    Ok(())
}

/// Ask the peer to confirm everything sent so far and block until it
/// does. Interleaved RequestRetransmit frames are serviced (and the
/// request itself re-sent) as part of the exchange.
pub fn issue_ack_request<T: Transport, W: RxIdle>(
    drv: &mut LinkDriver<T, W>,
) -> Result<(), LinkError> {
    drv.queue_mut().set_ack_request_in_flight(true);
    let result = run_ack_exchange(drv);
    drv.queue_mut().set_ack_request_in_flight(false);
    result
}

fn run_ack_exchange<T: Transport, W: RxIdle>(drv: &mut LinkDriver<T, W>) -> Result<(), LinkError> {
    let request_id = drv.queue().local_frame_id();
    let request = Frame::from_command(Command::RequestAck { frame_id: request_id }, request_id);
    drv.send_frame(request.clone())?;

    let mut rounds = 0;
    loop {
        match drv.receive_frame() {
            Ok(frame) => match frame.cmd {
                Command::Ack { frame_id } => {
                    process_ack(drv.queue_mut(), frame_id);
                    return Ok(());
                }
                Command::RequestRetransmit {
                    frame_id_start,
                    frame_id_end,
                } => {
                    debug!("peer requested retransmit of [{frame_id_start}, {frame_id_end})");
                    handle_retransmit_request(drv, frame_id_start, frame_id_end)?;
                    drv.resend(&request)?;
                }
                _ => warn!(
                    "unexpected {:?} while awaiting ack; discarding",
                    frame.cmd.kind()
                ),
            },
            Err(LinkError::Frame(e)) => debug!("parse error while awaiting ack: {e}"),
            Err(fatal) => return Err(fatal),
        }

        rounds += 1;
        if rounds >= ACK_EXCHANGE_ROUND_LIMIT {
            error!("no ack after {ACK_EXCHANGE_ROUND_LIMIT} responses; abandoning the exchange");
            return Err(LinkError::AckRequestExhausted);
        }
    }
}

/// The peer asked for an ack: walk the sorted received ids forward from
/// the last committed point. A contiguous run is acknowledged wholesale;
/// the first hole turns into a RequestRetransmit covering it, with
/// nothing committed.
pub fn answer_ack_request<T: Transport, W: RxIdle>(
    drv: &mut LinkDriver<T, W>,
) -> Result<(), LinkError> {
    let ids = drv.queue().received_ids_sorted();
    let mut pointer = drv.queue().remote_ackd_frame_id();

    for id in ids {
        if id < pointer {
            continue; // duplicate of something already acknowledged
        }
        if id == pointer {
            pointer += 1;
            continue;
        }
        info!("inbound gap detected: [{pointer}, {id})");
        drv.send_command(Command::RequestRetransmit {
            frame_id_start: pointer,
            frame_id_end: id,
        })?;
        return Ok(());
    }

    drv.send_command(Command::Ack { frame_id: pointer })?;
    drv.queue_mut().commit_remote_ack(pointer);
    Ok(())
}
