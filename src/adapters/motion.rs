//! Motion adapter — turns position deltas into geared stepper moves.
//!
//! The survey core dispatches raw position changes; this adapter maps
//! them to degrees, applies the drive-train gear ratios, and runs the
//! two steppers. Accelerometer-assisted zeroing lives outside this
//! adapter: on the very first move the requested pitch is taken at face
//! value from the rig's parked position.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info};

use crate::config::SystemConfig;
use crate::drivers::stepper::Stepper;
use crate::link::wire::Position;
use crate::ports::MotionPort;
use crate::survey::SurveyState;

pub struct GearedMotion<P: OutputPin, D: DelayNs> {
    vertical: Stepper<P>,
    horizontal: Stepper<P>,
    delay: D,
    vertical_ratio: f64,
    horizontal_ratio: f64,
}

impl<P: OutputPin, D: DelayNs> GearedMotion<P, D> {
    pub fn new(
        vertical: Stepper<P>,
        horizontal: Stepper<P>,
        delay: D,
        config: &SystemConfig,
    ) -> Self {
        Self {
            vertical,
            horizontal,
            delay,
            vertical_ratio: config.vertical_gear_ratio,
            horizontal_ratio: config.horizontal_gear_ratio,
        }
    }
}

impl<P: OutputPin, D: DelayNs> MotionPort for GearedMotion<P, D> {
    fn on_position_change(&mut self, state: &SurveyState, old_pitch: u32, old_yaw: u32) {
        let target = state.position();

        let (pitch_deg, pitch_sign, yaw_deg, yaw_sign) = if state.known_position() {
            let dp = i64::from(target.pitch) - i64::from(old_pitch);
            let dy = i64::from(target.yaw) - i64::from(old_yaw);
            (
                Position::raw_to_deg(dp.unsigned_abs() as u32),
                if dp < 0 { -1 } else { 1 },
                Position::raw_to_deg(dy.unsigned_abs() as u32),
                if dy < 0 { -1 } else { 1 },
            )
        } else {
            info!(
                "first move: driving from park to requested pitch {:.1}°",
                target.pitch_deg()
            );
            (target.pitch_deg(), 1, target.yaw_deg(), 1)
        };

        debug!(
            "moving vertically {:.2}° (ratio {}), horizontally {:.2}° (ratio {})",
            pitch_sign as f64 * pitch_deg,
            self.vertical_ratio,
            yaw_sign as f64 * yaw_deg,
            self.horizontal_ratio
        );
        self.vertical
            .rotate_deg(pitch_deg * self.vertical_ratio, pitch_sign, &mut self.delay);
        self.horizontal
            .rotate_deg(yaw_deg * self.horizontal_ratio, yaw_sign, &mut self.delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MotionPort;
    use core::convert::Infallible;

    #[derive(Clone, Copy)]
    struct SilentPin;

    impl embedded_hal::digital::ErrorType for SilentPin {
        type Error = Infallible;
    }

    impl OutputPin for SilentPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    /// Delay double that counts half-steps (one `delay_ms` per
    /// half-step; the default `delay_ms` would fan out into a million
    /// `delay_ns` calls).
    struct StepCounter {
        count: u64,
    }

    impl DelayNs for StepCounter {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, _ms: u32) {
            self.count += 1;
        }
    }

    fn motion() -> GearedMotion<SilentPin, StepCounter> {
        let config = SystemConfig::default();
        GearedMotion::new(
            Stepper::new([SilentPin; 4], 1),
            Stepper::new([SilentPin; 4], 1),
            StepCounter { count: 0 },
            &config,
        )
    }

    fn deg_to_raw(deg: f64) -> u32 {
        (deg / 360.0 * 4_294_967_296.0) as u32
    }

    #[test]
    fn known_position_moves_by_the_delta() {
        let mut adapter = motion();
        let mut state = SurveyState::new();

        // Calibrating move first so the state is "known".
        state.set_position(deg_to_raw(45.0), 0, &mut adapter);
        let after_first = adapter.delay.count;

        // 45° -> 50°: a 5° pitch delta, geared 8:1 = 40° of motor.
        state.set_position(deg_to_raw(50.0), 0, &mut adapter);
        let steps = adapter.delay.count - after_first;
        let expected = (40.0 / 360.0 * 4096.0_f64).round() as u64;
        assert_eq!(steps, expected);
    }

    #[test]
    fn first_move_drives_the_full_requested_angle() {
        let mut adapter = motion();
        let mut state = SurveyState::new();

        // From park: the whole 45°, geared 8:1 = 360° of motor.
        state.set_position(deg_to_raw(45.0), 0, &mut adapter);
        let expected = (360.0 / 360.0 * 4096.0_f64).round() as u64;
        assert_eq!(adapter.delay.count, expected);
    }
}
