#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod alerts;
pub mod logger;
pub mod tcu_hal;
pub mod tcu_mock;
pub mod util;

pub use logger::{DataPointLogger, FrameSink, SerialFrameLogger};

/// Sensor noise deadband for both throttle pots, 4 counts of a 10-bit ADC.
pub const THROTTLE_DEADBAND_RATIO: f32 = 4.0 / 1024.0;

pub const ADC_FULL_SCALE_COUNTS: u16 = 1023;
pub const DAC_FULL_SCALE_CODE: u16 = 4095;

pub const FAULT_BLINK_PERIOD_S: f32 = 0.25;
