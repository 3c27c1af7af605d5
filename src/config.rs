//! System configuration parameters
//!
//! Physical constants of the survey rig. Operating parameters (initial
//! position, step size, measurement count) are not configured here —
//! they always arrive over the link via SetParams.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// UART baud rate, agreed with the peer out of band.
    pub uart_baud: u32,

    // --- Sweep envelope ---
    /// Lowest pitch the rig may aim at (degrees).
    pub vertical_min_deg: f64,
    /// Highest pitch the rig may aim at (degrees).
    pub vertical_max_deg: f64,
    /// Yaw sweep start (degrees).
    pub horizontal_min_deg: f64,
    /// Yaw sweep end (degrees).
    pub horizontal_max_deg: f64,
    /// Tolerance applied to the vertical limits when deciding whether a
    /// step still fits.
    pub vertical_slack_deg: f64,

    // --- Drive train ---
    /// Gear reduction between the vertical stepper and the head.
    pub vertical_gear_ratio: f64,
    /// Gear reduction between the horizontal stepper and the head.
    pub horizontal_gear_ratio: f64,
    /// Delay between stepper half-steps (milliseconds).
    pub stepper_delay_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            uart_baud: 115_200,

            // Sweep envelope
            vertical_min_deg: 10.0,
            vertical_max_deg: 90.0,
            horizontal_min_deg: 0.0,
            horizontal_max_deg: 360.0,
            vertical_slack_deg: 1.0,

            // Drive train
            vertical_gear_ratio: 8.0,
            horizontal_gear_ratio: 8.0,
            stepper_delay_ms: 5,
        }
    }
}
