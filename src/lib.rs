pub mod config;
pub mod data;
pub mod error;
mod helper;
pub mod platform;
pub mod report;

pub use self::data::*;
pub use self::error::{Error, Result};
pub use self::platform::interface::Measurement;
pub use self::platform::sysfs::{DevicePattern, SysfsMeasurement};
pub use self::report::{Reporter, Snapshot, Startup, Ticker};
