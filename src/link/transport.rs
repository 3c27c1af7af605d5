//! Transport abstraction — any byte-oriented channel.
//!
//! Concrete implementations:
//! - UART serial on the target (`adapters::uart`)
//! - in-memory duplex pipe for host tests
//!
//! The link driver is generic over `Transport`, so swapping the physical
//! channel requires zero changes to the protocol logic. Reads are
//! non-blocking polls; the driver turns them into blocking-with-retry.

use core::fmt;

/// Transport-level faults. These are the only fatal errors in the system:
/// a parse failure is recoverable, a dead transport is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The peer device is gone (unplugged, powered off).
    Disconnected,
    /// The underlying read failed.
    ReadFailed,
    /// The underlying write failed or was short.
    WriteFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "transport disconnected"),
            Self::ReadFailed => write!(f, "transport read failed"),
            Self::WriteFailed => write!(f, "transport write failed"),
        }
    }
}

/// Byte-oriented transport channel.
pub trait Transport {
    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read; 0 means no data is
    /// available right now.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data` to the transport.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;
}

/// A null transport that discards all writes and never reads.
/// Useful as a default when no peer is connected.
pub struct NullTransport;

impl Transport for NullTransport {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn write(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}

/// In-memory duplex pipe for host-side tests and protocol exercises.
/// Each endpoint reads what the other wrote.
pub mod pipe {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use super::{Transport, TransportError};

    struct Lane {
        buf: Mutex<VecDeque<u8>>,
        open: AtomicBool,
    }

    pub struct PipeEnd {
        incoming: Arc<Lane>,
        outgoing: Arc<Lane>,
    }

    /// Create a connected pair of endpoints.
    pub fn duplex() -> (PipeEnd, PipeEnd) {
        let ab = Arc::new(Lane {
            buf: Mutex::new(VecDeque::new()),
            open: AtomicBool::new(true),
        });
        let ba = Arc::new(Lane {
            buf: Mutex::new(VecDeque::new()),
            open: AtomicBool::new(true),
        });
        (
            PipeEnd {
                incoming: Arc::clone(&ba),
                outgoing: Arc::clone(&ab),
            },
            PipeEnd {
                incoming: ab,
                outgoing: ba,
            },
        )
    }

    impl Drop for PipeEnd {
        fn drop(&mut self) {
            // A dropped endpoint closes both lanes so the peer observes
            // the loss on its next read or write.
            self.incoming.open.store(false, Ordering::SeqCst);
            self.outgoing.open.store(false, Ordering::SeqCst);
        }
    }

    impl Transport for PipeEnd {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            let mut staged = self.incoming.buf.lock().expect("pipe lock poisoned");
            if staged.is_empty() {
                if !self.incoming.open.load(Ordering::SeqCst) {
                    return Err(TransportError::Disconnected);
                }
                return Ok(0);
            }
            let mut n = 0;
            while n < buf.len() {
                match staged.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
            if !self.outgoing.open.load(Ordering::SeqCst) {
                return Err(TransportError::Disconnected);
            }
            let mut staged = self.outgoing.buf.lock().expect("pipe lock poisoned");
            staged.extend(data.iter().copied());
            Ok(())
        }

        fn flush(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn available(&self) -> bool {
            !self
                .incoming
                .buf
                .lock()
                .expect("pipe lock poisoned")
                .is_empty()
        }
    }
}
