//! Device state and survey logic.
//!
//! [`SurveyState`] holds the negotiated position and step configuration,
//! the SSID/BSSID registries with their pending-announcement lists, and
//! the accumulated records. `sweep` advances the head across its scan
//! envelope; `measure` turns radio scans into records.

pub mod measure;
pub mod state;
pub mod sweep;

pub use state::SurveyState;
pub use sweep::{Direction, StepOutcome};
