#![no_std]
//! Conversion, busy-poll and scratchpad readout for DS1820/DS18S20 sensors.
//!
//! Every operation performs exactly one bus transaction and returns; nothing here waits for
//! a conversion to finish. The caller decides when to come back, which keeps the time spent
//! on the bus per call bounded.

use fixed::types::I15F1;
use onewire_gpio::{OneWire, OneWireCrc, OneWireError, OneWireResult};

#[cfg(any(test, feature = "sim"))]
pub mod sim;

const DS1820_START_CONV: u8 = 0x44;
const DS1820_READ_SCRATCH: u8 = 0xbe;

/// Half-degree reading straight from the temperature register.
pub type Temperature = I15F1;

/// Handle for one DS1820 on a 1-Wire line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ds1820 {
    rom: Option<u64>,
}

impl Ds1820 {
    /// Talk to whichever device is on the line (Skip ROM). Single-drop lines only.
    pub const fn any() -> Self {
        Self { rom: None }
    }

    /// Talk to the device with this ROM code (Match ROM).
    pub const fn with_rom(rom: u64) -> Self {
        Self { rom: Some(rom) }
    }

    /// Reset the line, address the sensor and start a temperature conversion.
    ///
    /// Returns as soon as the command is on the wire; the conversion itself takes up to
    /// 750 ms and is tracked with [`poll_busy`](Ds1820::poll_busy).
    pub fn start_conversion<O: OneWire>(&self, bus: &mut O) -> OneWireResult<(), O::BusError> {
        bus.address(self.rom)?;
        bus.write_byte(DS1820_START_CONV)?;
        Ok(())
    }

    /// Read one byte while a conversion is running.
    ///
    /// The sensor holds the line low until the conversion completes, so any read returns
    /// zero bits while busy and `0xff` once done. Returns `true` while still busy.
    pub fn poll_busy<O: OneWire>(&self, bus: &mut O) -> OneWireResult<bool, O::BusError> {
        Ok(bus.read_byte()? != 0xff)
    }

    /// Read the scratchpad and check its CRC.
    ///
    /// # Errors
    /// [`OneWireError::InvalidCrc`] when byte 8 is not the CRC of bytes 0..8, or when
    /// COUNT_PER_C reads zero. An all-zero block passes the CRC but is what a line held low
    /// reads as.
    pub fn read_scratchpad<O: OneWire>(
        &self,
        bus: &mut O,
    ) -> OneWireResult<Scratchpad, O::BusError> {
        bus.address(self.rom)?;
        bus.write_byte(DS1820_READ_SCRATCH)?;
        let mut buf = [0; 9];
        for b in buf.iter_mut() {
            *b = bus.read_byte()?;
        }
        Scratchpad::validate(buf).ok_or(OneWireError::InvalidCrc)
    }

    /// Read the scratchpad and reduce it to a [`Record`].
    pub fn read_and_validate<O: OneWire>(&self, bus: &mut O) -> OneWireResult<Record, O::BusError> {
        self.read_scratchpad(bus).map(|pad| pad.record())
    }
}

/// The nine scratchpad bytes, CRC checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratchpad([u8; 9]);

impl Scratchpad {
    /// Accept the block only if its last byte is the CRC of the first eight and it carries
    /// a non-zero count per degree.
    pub fn validate(bytes: [u8; 9]) -> Option<Self> {
        (OneWireCrc::validate(&bytes) && bytes[7] != 0).then_some(Self(bytes))
    }

    /// Temperature register, count remain and count per degree.
    pub fn record(&self) -> Record {
        Record {
            lsb: self.0[0],
            msb: self.0[1],
            count_remain: self.0[6],
            count_per_c: self.0[7],
        }
    }
}

/// The part of the scratchpad needed to compute an extended resolution temperature.
///
/// Laid out as it travels on the wire: `lsb, msb, count_remain, count_per_c`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Record {
    /// Temperature register, low byte.
    pub lsb: u8,
    /// Temperature register, high (sign) byte.
    pub msb: u8,
    /// COUNT_REMAIN register.
    pub count_remain: u8,
    /// COUNT_PER_C register.
    pub count_per_c: u8,
}

impl Record {
    /// Size on the wire.
    pub const LEN: usize = 4;

    /// Record before the first successful read.
    pub const EMPTY: Record = Record {
        lsb: 0,
        msb: 0,
        count_remain: 0,
        count_per_c: 0,
    };

    /// Rebuild a record from its wire bytes.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            lsb: bytes[0],
            msb: bytes[1],
            count_remain: bytes[2],
            count_per_c: bytes[3],
        }
    }

    /// Wire bytes.
    pub const fn to_bytes(&self) -> [u8; 4] {
        [self.lsb, self.msb, self.count_remain, self.count_per_c]
    }

    /// Signed temperature register.
    pub const fn raw(&self) -> i16 {
        i16::from_le_bytes([self.lsb, self.msb])
    }

    /// Temperature at the register's native half-degree resolution.
    pub fn coarse(&self) -> Temperature {
        Temperature::from_bits(self.raw())
    }

    /// Register value with the half-degree bit truncated, as the extended resolution formula
    /// expects.
    pub fn truncated(&self) -> Temperature {
        Temperature::from_bits(self.raw() & !1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimDs1820;

    fn record_40c() -> Record {
        Record::from_bytes([0x50, 0x00, 0x0c, 0x10])
    }

    #[test]
    fn start_conversion_issues_skip_rom_and_convert() {
        let mut sensor = SimDs1820::new(record_40c());
        Ds1820::any().start_conversion(&mut sensor).unwrap();
        assert_eq!(sensor.conversions(), 1);
        assert_eq!(sensor.resets(), 1);
    }

    #[test]
    fn poll_busy_follows_the_line() {
        let mut sensor = SimDs1820::new(record_40c()).with_busy_polls(2);
        let dev = Ds1820::any();
        dev.start_conversion(&mut sensor).unwrap();
        assert!(dev.poll_busy(&mut sensor).unwrap());
        assert!(dev.poll_busy(&mut sensor).unwrap());
        assert!(!dev.poll_busy(&mut sensor).unwrap());
        // no reset between polls
        assert_eq!(sensor.resets(), 1);
    }

    #[test]
    fn read_extracts_record_bytes() {
        let mut sensor = SimDs1820::new(record_40c());
        let record = Ds1820::any().read_and_validate(&mut sensor).unwrap();
        assert_eq!(record, record_40c());
        assert_eq!(record.coarse(), Temperature::from_num(40));
    }

    #[test]
    fn corrupted_scratchpad_is_rejected() {
        let mut sensor = SimDs1820::new(record_40c()).with_corrupt_reads(1);
        let dev = Ds1820::any();
        assert_eq!(
            dev.read_and_validate(&mut sensor),
            Err(OneWireError::InvalidCrc)
        );
        assert_eq!(dev.read_and_validate(&mut sensor), Ok(record_40c()));
    }

    #[test]
    fn all_zero_scratchpad_is_rejected() {
        assert!(OneWireCrc::validate(&[0; 9]));
        assert_eq!(Scratchpad::validate([0; 9]), None);
        let pad = [0x50, 0x00, 0x4b, 0x46, 0xff, 0xff, 0x0c, 0x10, 0x0c];
        assert_eq!(Scratchpad::validate(pad).map(|p| p.record()), Some(record_40c()));
    }

    #[test]
    fn missing_sensor_is_a_bus_error() {
        let mut sensor = SimDs1820::new(record_40c()).with_present(false);
        let dev = Ds1820::any();
        assert_eq!(
            dev.start_conversion(&mut sensor),
            Err(OneWireError::NoDevicePresent)
        );
        assert_eq!(
            dev.read_and_validate(&mut sensor),
            Err(OneWireError::NoDevicePresent)
        );
    }

    #[test]
    fn match_rom_addresses_one_device() {
        let rom = 0x8d00_0801_a2b3_c410;
        let mut sensor = SimDs1820::new(record_40c()).with_rom(rom);
        assert!(Ds1820::with_rom(rom).read_and_validate(&mut sensor).is_ok());
        assert_eq!(
            Ds1820::with_rom(rom ^ 0x100).read_and_validate(&mut sensor),
            Err(OneWireError::InvalidCrc)
        );
    }

    #[test]
    fn negative_readings_sign_extend() {
        // -0.5 °C
        let record = Record::from_bytes([0xff, 0xff, 0x0c, 0x10]);
        assert_eq!(record.coarse(), Temperature::from_num(-0.5));
        assert_eq!(record.truncated(), Temperature::from_num(-1));
    }
}
