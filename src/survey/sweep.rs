//! Sweep stepping — walks the head across its scan envelope in a
//! boustrophedon pattern.
//!
//! Pitch advances within the vertical range; at a limit the vertical
//! direction inverts and the head takes one horizontal step instead.
//! When a horizontal step would leave the yaw envelope, the sweep is
//! complete and the session winds the connection down.

use log::{debug, info};

use crate::config::SystemConfig;
use crate::ports::MotionPort;

use super::state::SurveyState;

/// Current travel direction of each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    vertical: i8,
    horizontal: i8,
}

impl Direction {
    pub const UP: i8 = 1;
    pub const DOWN: i8 = -1;
    pub const LEFT: i8 = 1;
    pub const RIGHT: i8 = -1;

    pub fn vertical(self) -> i8 {
        self.vertical
    }

    pub fn horizontal(self) -> i8 {
        self.horizontal
    }

    pub fn invert_vertical(&mut self) {
        self.vertical = -self.vertical;
    }

    pub fn invert_horizontal(&mut self) {
        self.horizontal = -self.horizontal;
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self {
            vertical: Self::UP,
            horizontal: Self::LEFT,
        }
    }
}

/// What a call to [`advance_step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The head moved one step; the sweep continues.
    Stepped,
    /// Both axes are out of travel — the survey is finished. The caller
    /// owns the shutdown (EndOfTransmission, re-homing).
    SweepComplete,
}

/// Advance the head by one survey step, moving it through the state's
/// motion dispatch.
pub fn advance_step(
    state: &mut SurveyState,
    motion: &mut impl MotionPort,
    config: &SystemConfig,
) -> StepOutcome {
    let position = state.position();
    let step = state.step_size();

    let next_pitch = i64::from(position.pitch)
        + i64::from(step.pitch_step) * i64::from(state.direction().vertical());
    let next_pitch_deg = signed_raw_to_deg(next_pitch);
    debug!("next pitch candidate: {next_pitch_deg:.2}°");

    if (config.vertical_min_deg - config.vertical_slack_deg) <= next_pitch_deg
        && next_pitch_deg <= (config.vertical_max_deg + config.vertical_slack_deg)
    {
        debug!(
            "stepping vertically: {:.2}° -> {next_pitch_deg:.2}°",
            position.pitch_deg()
        );
        state.set_position(next_pitch as u32, position.yaw, motion);
        return StepOutcome::Stepped;
    }

    // Vertical limit reached: reverse that axis and take one horizontal
    // step instead.
    state.direction_mut().invert_vertical();

    let next_yaw = i64::from(position.yaw)
        + i64::from(step.yaw_step) * i64::from(state.direction().horizontal());
    let next_yaw_deg = signed_raw_to_deg(next_yaw);
    debug!("next yaw candidate: {next_yaw_deg:.2}°");

    if config.horizontal_min_deg <= next_yaw_deg && next_yaw_deg <= config.horizontal_max_deg {
        debug!(
            "stepping horizontally: {:.2}° -> {next_yaw_deg:.2}°",
            position.yaw_deg()
        );
        state.set_position(position.pitch, next_yaw as u32, motion);
        return StepOutcome::Stepped;
    }

    info!("yaw envelope exhausted; sweep complete");
    StepOutcome::SweepComplete
}

/// Degree mapping that survives positions pushed past either end of the
/// raw range by a candidate step.
fn signed_raw_to_deg(raw: i64) -> f64 {
    raw as f64 / 4_294_967_296.0 * 360.0
}
