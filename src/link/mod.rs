//! The serial link protocol stack.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      Link Stack                           │
//! │                                                           │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────────────────┐  │
//! │  │ Transport │──▶│  Wire    │──▶│  Driver (blocking    │  │
//! │  │ (trait)   │   │ (codec)  │   │  rx/tx + threshold)  │  │
//! │  └───────────┘   └──────────┘   └──────────┬───────────┘  │
//! │        ▲                                   │              │
//! │        │         ┌──────────┐   ┌──────────▼───────────┐  │
//! │        └─────────│  Queue   │◀──│  Procs (handshake,   │  │
//! │                  │ (window) │   │  ack, retransmit)    │  │
//! │                  └──────────┘   └──────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The wire codec knows bytes, the queue knows ids, the driver knows how
//! to move whole frames over a byte stream, and the procedures sequence
//! driver calls into the handshake/configuration/record exchanges.

pub mod driver;
pub mod procs;
pub mod queue;
pub mod transport;
pub mod wire;

use core::fmt;

pub use driver::{LinkDriver, RxIdle, SpinIdle};
pub use queue::{FrameQueue, UNACK_THRESHOLD};
pub use transport::{NullTransport, Transport, TransportError};
pub use wire::{Command, CommandKind, Frame, FrameError};

/// Anything a link operation can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// A frame failed to parse — local and recoverable.
    Frame(FrameError),
    /// The byte channel itself failed — fatal to the session.
    Transport(TransportError),
    /// An ack-request exchange exhausted its retry budget — fatal to the
    /// session.
    AckRequestExhausted,
}

impl LinkError {
    /// Fatal errors tear the session down; the rest are retried in place.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Frame(_))
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::AckRequestExhausted => write!(f, "ack request retries exhausted"),
        }
    }
}

impl From<FrameError> for LinkError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

impl From<TransportError> for LinkError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}
