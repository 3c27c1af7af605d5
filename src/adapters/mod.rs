//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter         | Implements    | Connects to                |
//! |-----------------|---------------|----------------------------|
//! | `GearedMotion`  | `MotionPort`  | the two stepper drivers    |
//! | `UartTransport` | `Transport`   | UART2 to the camera node   |
//! | `EspScanSource` | `ScanSource`  | the onboard WiFi radio     |
//!
//! The motion adapter is dual-target; the UART and WiFi adapters only
//! exist on ESP-IDF.

pub mod motion;

#[cfg(target_os = "espidf")]
pub mod uart;

#[cfg(target_os = "espidf")]
pub mod wifi_scan;
