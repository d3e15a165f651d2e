#![no_std]
#![deny(missing_docs)]
//! # scopetemp-protocol
//!
//! Vendor control requests understood by the ScopeTemp accessory.
//!
//! | Request | Direction | `wValue` | `wIndex` | Data |
//! |---------|-----------|----------|----------|------|
//! | 1 `GET_TEMPERATURES` | IN  | channel (low byte) | - | 4 byte [`Record`] |
//! | 2 `SET_GUIDE_OUTPUTS` | OUT | [`GuideBits`] (low byte) | - | - |
//! | 3 `SET_FAN_OUTPUTS` (PWM) | OUT | fan 1 duty | fan 2 duty | - |
//! | 3 `SET_FAN_OUTPUTS` (switched) | OUT | fan mask (low byte) | - | - |
//!
//! Which form of request 3 applies depends on the board's [`FanVariant`].

use bitfield_struct::bitfield;
use core::fmt;

pub use ds1820::Record;

/// Number of temperature channels.
pub const CHANNELS: usize = 4;

/// USB vendor id (shared vendor-class id).
pub const VENDOR_ID: u16 = 0x16c0;
/// USB product id.
pub const PRODUCT_ID: u16 = 0x05dc;
/// Manufacturer string descriptor.
pub const MANUFACTURER: &str = "mconovici@gmail.com";
/// Product string descriptor.
pub const PRODUCT: &str = "ScopeTemp";

/// `bmRequestType` of device-to-host vendor requests.
pub const REQUEST_TYPE_IN: u8 = 0xc0;
/// `bmRequestType` of host-to-device vendor requests.
pub const REQUEST_TYPE_OUT: u8 = 0x40;

/// Vendor id and product id packed as `vid << 16 | pid`.
pub const fn device_id(vendor_id: u16, product_id: u16) -> u32 {
    (vendor_id as u32) << 16 | product_id as u32
}

/// Request codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Read one channel's record.
    GetTemperatures = 1,
    /// Replace the guide output state.
    SetGuideOutputs = 2,
    /// Set the fan outputs.
    SetFanOutputs = 3,
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        match value {
            1 => Ok(GetTemperatures),
            2 => Ok(SetGuideOutputs),
            3 => Ok(SetFanOutputs),
            other => Err(ProtocolError::UnknownRequest(other)),
        }
    }
}

/// Malformed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// `bRequest` is not one of the [`Opcode`]s.
    UnknownRequest(u8),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRequest(code) => write!(f, "unknown request {code}"),
        }
    }
}

/// Guide output lines as laid out on the output port.
///
/// | Bit | Line |
/// |-----|------|
/// | 1 | north (DEC+) |
/// | 3 | west (RA+) |
/// | 4 | south (DEC-) |
/// | 5 | east (RA-) |
///
/// Other bits are reserved and read as zero.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct GuideBits {
    #[bits(1)]
    __reserved0: u8,
    /// DEC+
    pub north: bool,
    #[bits(1)]
    __reserved2: u8,
    /// RA+
    pub west: bool,
    /// DEC-
    pub south: bool,
    /// RA-
    pub east: bool,
    #[bits(2)]
    __reserved6: u8,
}

impl GuideBits {
    /// Every bit that maps to a guide line.
    pub const MASK: u8 = 0b0011_1010;

    /// Build from direction flags. Opposite directions are not checked against each other.
    pub const fn from_directions(north: bool, south: bool, west: bool, east: bool) -> Self {
        Self::new()
            .with_north(north)
            .with_south(south)
            .with_west(west)
            .with_east(east)
    }

    /// Keep only the bits in `mask`.
    pub const fn masked(self, mask: u8) -> Self {
        Self::from_bits(self.into_bits() & mask)
    }
}

/// How a board drives its two fans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanVariant {
    /// Two 16-bit PWM duty cycles.
    #[default]
    Pwm,
    /// Two on/off outputs.
    Switched,
}

/// Fan state requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanCommand {
    /// Duty cycles, `0` = off, `0xffff` = full speed.
    Duty {
        /// Fan 1 duty cycle.
        fan1: u16,
        /// Fan 2 duty cycle.
        fan2: u16,
    },
    /// On/off state.
    Switched {
        /// Fan 1 on.
        fan1: bool,
        /// Fan 2 on.
        fan2: bool,
    },
}

impl FanCommand {
    /// Variant this command belongs to.
    pub fn variant(&self) -> FanVariant {
        match self {
            Self::Duty { .. } => FanVariant::Pwm,
            Self::Switched { .. } => FanVariant::Switched,
        }
    }
}

/// The fields of a SETUP packet that carry the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setup {
    /// `bmRequestType`
    pub request_type: u8,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
    /// `wLength`
    pub length: u16,
}

/// A decoded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read the record of one channel.
    GetTemperatures {
        /// Channel index, `0..CHANNELS`.
        channel: usize,
    },
    /// Replace the guide outputs.
    SetGuideOutputs(GuideBits),
    /// Set the fans.
    SetFanOutputs(FanCommand),
}

impl Command {
    /// Decode a request. `fan` selects how request 3 is interpreted.
    ///
    /// The channel index is taken modulo [`CHANNELS`], so every value addresses a channel.
    pub fn decode(request: u8, value: u16, index: u16, fan: FanVariant) -> Result<Self, ProtocolError> {
        let low = value.to_le_bytes()[0];
        Ok(match Opcode::try_from(request)? {
            Opcode::GetTemperatures => Command::GetTemperatures {
                channel: low as usize & (CHANNELS - 1),
            },
            Opcode::SetGuideOutputs => Command::SetGuideOutputs(GuideBits::from_bits(low)),
            Opcode::SetFanOutputs => Command::SetFanOutputs(match fan {
                FanVariant::Pwm => FanCommand::Duty {
                    fan1: value,
                    fan2: index,
                },
                FanVariant::Switched => FanCommand::Switched {
                    fan1: low & 0x01 != 0,
                    fan2: low & 0x02 != 0,
                },
            }),
        })
    }

    /// Opcode of this command.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::GetTemperatures { .. } => Opcode::GetTemperatures,
            Self::SetGuideOutputs(_) => Opcode::SetGuideOutputs,
            Self::SetFanOutputs(_) => Opcode::SetFanOutputs,
        }
    }

    /// SETUP fields the host sends for this command.
    pub fn setup(&self) -> Setup {
        let (request_type, value, index, length) = match *self {
            Self::GetTemperatures { channel } => {
                (REQUEST_TYPE_IN, channel as u16, 0, Record::LEN as u16)
            }
            Self::SetGuideOutputs(bits) => (REQUEST_TYPE_OUT, bits.into_bits() as u16, 0, 0),
            Self::SetFanOutputs(FanCommand::Duty { fan1, fan2 }) => (REQUEST_TYPE_OUT, fan1, fan2, 0),
            Self::SetFanOutputs(FanCommand::Switched { fan1, fan2 }) => {
                (REQUEST_TYPE_OUT, fan1 as u16 | (fan2 as u16) << 1, 0, 0)
            }
        };
        Setup {
            request_type,
            request: self.opcode() as u8,
            value,
            index,
            length,
        }
    }
}
