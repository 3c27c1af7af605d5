//! UART transport to the camera node (ESP-IDF only).

use esp_idf_hal::delay::TickType;
use esp_idf_hal::uart::UartDriver;
use log::warn;

use crate::link::transport::{Transport, TransportError};

pub struct UartTransport<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl Transport for UartTransport<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        // Zero-tick read: return whatever the FIFO already holds. The
        // link driver supplies the blocking-with-retry loop.
        self.uart
            .read(buf, TickType::new_millis(0).ticks())
            .map_err(|e| {
                warn!("uart read failed: {e}");
                TransportError::ReadFailed
            })
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut written = 0;
        while written < data.len() {
            let n = self.uart.write(&data[written..]).map_err(|e| {
                warn!("uart write failed: {e}");
                TransportError::WriteFailed
            })?;
            written += n;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.uart
            .wait_tx_done(TickType::new_millis(100).ticks())
            .map_err(|_| TransportError::WriteFailed)
    }

    fn available(&self) -> bool {
        self.uart.remaining_unread_bytes().map_or(false, |n| n > 0)
    }
}
