//! Unipolar stepper driver (28BYJ-48 class) in half-step mode.
//!
//! Drives four coil pins through the eight-entry half-step sequence.
//! The phase index persists across moves so consecutive rotations never
//! skip a step. This is a dumb actuator: travel limits and gear ratios
//! live in the motion adapter above it.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Coil energisation pattern, half-step order.
const HALF_STEP_SEQ: [[bool; 4]; 8] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

pub struct Stepper<P: OutputPin> {
    coils: [P; 4],
    phase: usize,
    steps_per_rev: u32,
    step_delay_ms: u32,
}

impl<P: OutputPin> Stepper<P> {
    /// Half-steps per output revolution for the 28BYJ-48's internal
    /// gearbox.
    pub const DEFAULT_STEPS_PER_REV: u32 = 4096;

    pub fn new(coils: [P; 4], step_delay_ms: u32) -> Self {
        Self {
            coils,
            phase: 0,
            steps_per_rev: Self::DEFAULT_STEPS_PER_REV,
            step_delay_ms,
        }
    }

    pub fn with_steps_per_rev(mut self, steps_per_rev: u32) -> Self {
        self.steps_per_rev = steps_per_rev;
        self
    }

    /// Rotate by `degrees` (magnitude) in `direction` (+1 / -1).
    pub fn rotate_deg(&mut self, degrees: f64, direction: i8, delay: &mut impl DelayNs) {
        let steps = (degrees.abs() / 360.0 * f64::from(self.steps_per_rev)).round() as u64;
        for _ in 0..steps {
            self.half_step(direction);
            delay.delay_ms(self.step_delay_ms);
        }
    }

    /// De-energise every coil so the motor can cool between sweeps.
    pub fn release(&mut self) {
        for coil in &mut self.coils {
            let _ = coil.set_low();
        }
    }

    pub fn steps_for_deg(&self, degrees: f64) -> u64 {
        (degrees.abs() / 360.0 * f64::from(self.steps_per_rev)).round() as u64
    }

    fn half_step(&mut self, direction: i8) {
        let len = HALF_STEP_SEQ.len();
        self.phase = if direction >= 0 {
            (self.phase + 1) % len
        } else {
            (self.phase + len - 1) % len
        };

        for (coil, energise) in self.coils.iter_mut().zip(HALF_STEP_SEQ[self.phase]) {
            // Pin errors are infallible on every board this targets.
            if energise {
                let _ = coil.set_high();
            } else {
                let _ = coil.set_low();
            }
        }
    }
}
