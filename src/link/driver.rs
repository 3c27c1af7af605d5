//! Link driver — blocking whole-frame reads and writes over a byte
//! stream.
//!
//! A read first blocks for the 6-byte header, computes the remaining
//! body+trailer size from it, then blocks until those bytes arrive. A
//! single transport read may deliver part of a header, part of a body, or
//! several frames' worth of bytes; the accumulation loop handles all of
//! it. Sends are tracked in the [`FrameQueue`] and, once too many frames
//! sit unacknowledged, trigger a proactive ack request before returning
//! control to the caller.

use log::{debug, info, warn};

use super::queue::{FrameQueue, UNACK_THRESHOLD};
use super::transport::{Transport, TransportError};
use super::wire::{self, Command, CommandKind, Frame, FRAME_HEADER_SIZE, MAX_FRAME_LEN};
use super::{procs, LinkError};

/// Capability invoked whenever the transport has nothing for us yet.
/// May perform side effects (feed a watchdog, abort the process) but the
/// read itself retries indefinitely.
pub trait RxIdle {
    fn on_idle(&mut self);
}

/// Default idle policy: plain busy retry.
pub struct SpinIdle;

impl RxIdle for SpinIdle {
    fn on_idle(&mut self) {}
}

/// Blocking frame pump over a [`Transport`].
pub struct LinkDriver<T: Transport, W: RxIdle = SpinIdle> {
    transport: T,
    idle: W,
    queue: FrameQueue,
    /// Assembly buffer; protocol frames can never exceed `MAX_FRAME_LEN`.
    rx_buf: heapless::Vec<u8, MAX_FRAME_LEN>,
    /// Frame id from the most recent successfully parsed inbound header,
    /// kept so a body/checksum failure can name the range to retransmit.
    last_rx_header_id: Option<u32>,
}

impl<T: Transport, W: RxIdle> LinkDriver<T, W> {
    pub fn new(transport: T, idle: W) -> Self {
        Self {
            transport,
            idle,
            queue: FrameQueue::new(),
            rx_buf: heapless::Vec::new(),
            last_rx_header_id: None,
        }
    }

    pub fn queue(&self) -> &FrameQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut FrameQueue {
        &mut self.queue
    }

    /// Whether the transport has inbound bytes waiting.
    pub fn inbound_available(&self) -> bool {
        self.transport.available()
    }

    /// Frame id of the last inbound header that parsed, if any.
    pub fn last_rx_header_id(&self) -> Option<u32> {
        self.last_rx_header_id
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Block until one complete frame has been read and parsed.
    ///
    /// On success the frame is also appended to the receive queue for ack
    /// bookkeeping. Parse failures are returned without enqueuing
    /// anything; transport failures are fatal.
    pub fn receive_frame(&mut self) -> Result<Frame, LinkError> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        read_exact(&mut self.transport, &mut self.idle, &mut header)?;

        self.last_rx_header_id = None;
        let (_, _, frame_length, frame_id) = wire::parse_header(&header)?;
        self.last_rx_header_id = Some(frame_id);

        self.rx_buf.clear();
        self.rx_buf
            .resize(frame_length, 0)
            .map_err(|()| LinkError::Transport(TransportError::ReadFailed))?;
        self.rx_buf[..FRAME_HEADER_SIZE].copy_from_slice(&header);
        read_exact(
            &mut self.transport,
            &mut self.idle,
            &mut self.rx_buf[FRAME_HEADER_SIZE..],
        )?;

        let (frame, _) = wire::parse_frame(&self.rx_buf)?;
        self.queue.note_received(frame.clone());
        Ok(frame)
    }

    /// Receive until a frame of the expected kind arrives.
    ///
    /// Parse errors are logged and retried; valid frames of other kinds
    /// are logged and discarded (they still entered the receive queue for
    /// ack bookkeeping). Transport failures propagate.
    pub fn receive_expect(&mut self, expected: CommandKind) -> Result<Frame, LinkError> {
        loop {
            match self.receive_frame() {
                Ok(frame) if frame.cmd.kind() == expected => return Ok(frame),
                Ok(frame) => {
                    warn!(
                        "expected {:?}, got {:?} (id={}); discarding",
                        expected,
                        frame.cmd.kind(),
                        frame.frame_id
                    );
                }
                Err(LinkError::Frame(e)) => {
                    debug!("parse error while waiting for {:?}: {}", expected, e);
                }
                Err(fatal) => return Err(fatal),
            }
        }
    }

    /// Build a frame around `cmd` with the next local id and send it.
    /// Returns the id the frame carried.
    pub fn send_command(&mut self, cmd: Command) -> Result<u32, LinkError> {
        let frame_id = self.queue.local_frame_id();
        self.send_frame(Frame::from_command(cmd, frame_id))?;
        Ok(frame_id)
    }

    /// Send an already-built frame: write it, track it as unacknowledged,
    /// advance the local id, then — if the unacked window has grown past
    /// the threshold — run an ack-request exchange before returning.
    pub fn send_frame(&mut self, frame: Frame) -> Result<(), LinkError> {
        self.transport.write(&frame.to_bytes())?;
        self.transport.flush()?;
        self.queue.note_sent(frame);

        if self.queue.unacked_count() >= UNACK_THRESHOLD && !self.queue.ack_request_in_flight() {
            info!(
                "{} frames unacknowledged; requesting an ack",
                self.queue.unacked_count()
            );
            procs::issue_ack_request(self)?;
        }
        Ok(())
    }

    /// Write a frame's bytes again without touching any bookkeeping.
    /// Used only for retransmission of frames already tracked.
    pub fn resend(&mut self, frame: &Frame) -> Result<(), LinkError> {
        self.transport.write(&frame.to_bytes())?;
        self.transport.flush()?;
        Ok(())
    }
}

fn read_exact<T: Transport, W: RxIdle>(
    transport: &mut T,
    idle: &mut W,
    buf: &mut [u8],
) -> Result<(), LinkError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = transport.read(&mut buf[filled..])?;
        if n == 0 {
            idle.on_idle();
            continue;
        }
        filled += n;
    }
    Ok(())
}
