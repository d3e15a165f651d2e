//! # scopetemp-linux
//!
//! Host side of the ScopeTemp accessory: device discovery and the vendor requests
//! ([`ScopeTemp`]), temperature decoding ([`decode`]), timed pulse guiding ([`Guider`]) and
//! the temperature log format ([`LogLine`]).
//!
//! The USB transport is abstracted by [`UsbBackend`]; the `libusb` feature (on by default)
//! provides one on top of `rusb`.
#![deny(missing_docs)]

mod connection;
pub mod decode;
mod error;
pub mod guider;
mod logline;
#[cfg(feature = "libusb")]
mod rusb_backend;

pub use connection::{ControlPipe, DeviceIdentity, ScopeTemp, UsbBackend};
pub use error::HostError;
pub use guider::{Axis, Direction, GuideSink, Guider};
pub use logline::LogLine;
#[cfg(feature = "libusb")]
pub use rusb_backend::{RusbBackend, RusbPipe};

pub use scopetemp_protocol::{CHANNELS, FanCommand, FanVariant, Record};

/// Default interval between log lines.
pub const DEFAULT_LOG_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);
/// Default log file of the `log` command.
pub const DEFAULT_LOG_FILE: &str = "scopetemp.log";
