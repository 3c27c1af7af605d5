//! Port traits — the boundary between the protocol/survey core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Session / SurveyState (domain)
//! ```
//!
//! Driven adapters (steppers, the WiFi radio) implement these traits and
//! are passed in per call, so the domain core never touches hardware
//! directly and host tests can substitute recorders.

use crate::link::wire::{Bssid, Position, Ssid, StepSize};
use crate::survey::SurveyState;

// ───────────────────────────────────────────────────────────────
// Motion port (domain → actuators)
// ───────────────────────────────────────────────────────────────

/// Invoked synchronously whenever the survey position is mutated. The
/// implementation may perform physical actuation but must not mutate the
/// position itself — it only reacts.
pub trait MotionPort {
    fn on_position_change(&mut self, state: &SurveyState, old_pitch: u32, old_yaw: u32);
}

/// Motion sink that goes nowhere. Useful when no rig is attached.
pub struct NullMotion;

impl MotionPort for NullMotion {
    fn on_position_change(&mut self, _state: &SurveyState, _old_pitch: u32, _old_yaw: u32) {}
}

// ───────────────────────────────────────────────────────────────
// Measurement source (radio → domain)
// ───────────────────────────────────────────────────────────────

/// One access point sighting from a scan pass.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub ssid: Ssid,
    pub bssid: Bssid,
    pub rssi_dbm: i32,
}

/// Supplies raw signal-strength scan results. A failed scan surfaces as
/// an empty result; the measurement cycle simply records nothing.
pub trait ScanSource {
    fn scan(&mut self) -> Vec<ScanEntry>;
}

/// Scan source that never sees a network.
pub struct NullScan;

impl ScanSource for NullScan {
    fn scan(&mut self) -> Vec<ScanEntry> {
        Vec::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration sink (link → domain)
// ───────────────────────────────────────────────────────────────

/// Receives the peer's SetParams during the configuration exchange,
/// after the ack and before the Ready — physical preparation happens
/// inside this call.
pub trait ParamSink {
    fn apply_params(&mut self, position: Position, step_size: StepSize, measurements_per_step: u8);
}
