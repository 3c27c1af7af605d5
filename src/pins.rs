//! GPIO / peripheral pin assignments for the survey head main board.
//!
//! Single source of truth — every adapter references this module rather
//! than hard-coding pin numbers.

/// UART2 to the camera node.
pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 16;

/// Vertical (pitch) stepper coils, half-step order.
pub const V_STEPPER_GPIOS: [i32; 4] = [2, 4, 18, 19];

/// Horizontal (yaw) stepper coils, half-step order.
pub const H_STEPPER_GPIOS: [i32; 4] = [13, 12, 14, 27];

/// Accelerometer I2C. Fixed by the sensor breakout, do not remap.
pub const ACCEL_SDA_GPIO: i32 = 21;
pub const ACCEL_SCL_GPIO: i32 = 22;
