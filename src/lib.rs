//! SurveyRig firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod config;
pub mod error;
pub mod link;
pub mod ports;
pub mod session;
pub mod survey;

pub mod pins;

// Hardware edges. The UART and WiFi adapters only exist on the target;
// the stepper driver and motion adapter are dual-target.
pub mod adapters;
pub mod drivers;
