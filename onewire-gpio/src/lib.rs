#![no_std]
#![deny(missing_docs)]
//! # onewire-gpio
//! A no-std, bit-banged 1-Wire master driving a single open-drain line.
//!
//! The [OneWire] trait defines the primitives every 1-Wire master needs: a bus reset with
//! presence detection and a combined write/read time slot. Byte transfers and ROM addressing
//! are provided on top of those primitives.
//!
//! [OneWireGpio] implements the trait for any [`embedded_hal`] pin that is both an
//! [`OutputPin`](embedded_hal::digital::OutputPin) (low = drive, high = release) and an
//! [`InputPin`](embedded_hal::digital::InputPin), timed with a
//! [`DelayNs`](embedded_hal::delay::DelayNs) implementation.
//!
//! [OneWireCrc] computes the Dallas/Maxim CRC-8 used to protect ROM codes and scratchpads.

mod crc;
mod error;
mod gpio;
mod traits;

pub use crc::OneWireCrc;
pub use error::OneWireError;
pub use gpio::{OneWireGpio, Timing};
pub use traits::OneWire;

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;

/// Command to match a specific ROM address in 1-Wire communication.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to skip ROM addressing. On a single-drop line every following
/// function command reaches the one attached device.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;
