//! Dumb actuator drivers. Policy (travel limits, gearing, calibration)
//! lives in the adapters and the survey core, not here.

pub mod stepper;
