#![cfg_attr(not(any(test, feature = "sil")), no_std)]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "sil"))]
macro_rules! silprintln {
    () => { println!() };
    ($($arg:tt)*) => { println!($($arg)*) };
}

#[cfg(not(any(test, feature = "sil")))]
macro_rules! silprintln {
    () => {};
    ($($arg:tt)*) => {};
}

mod alert_watchdog;
pub mod arbitration;
pub mod converter;
pub mod debug_info;
pub mod fault;
pub mod indicator;
pub mod tcu;

pub(crate) use silprintln;

pub use converter::{ChannelConverter, ConverterError};
pub use tcu::{CycleResult, Tcu, TcuChannels, TcuConverters, TcuError};

pub const ALERT_RATE: f32 = 0.1;
