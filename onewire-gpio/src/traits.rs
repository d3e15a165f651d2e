use crate::{ONEWIRE_MATCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWireResult};

/// Trait for 1-Wire communication.
///
/// Only [`reset`](OneWire::reset) and [`write_bit`](OneWire::write_bit) touch the line;
/// everything else is composed from them. A time slot always reports what was observed
/// on the line, so writing a `1` doubles as a read slot.
pub trait OneWire {
    /// The error type returned by the underlying hardware.
    type BusError;

    /// Resets the 1-Wire bus and checks for a presence pulse.
    ///
    /// # Errors
    /// [`NoDevicePresent`](crate::OneWireError::NoDevicePresent) if no device answered,
    /// [`BusStuck`](crate::OneWireError::BusStuck) if the line did not return high.
    fn reset(&mut self) -> OneWireResult<(), Self::BusError>;

    /// Generates one time slot.
    ///
    /// # Arguments
    /// * `bit` - The bit to write. A `1` releases the line right after the lead time.
    ///
    /// # Returns
    /// The bit observed on the line at the sampling point.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<bool, Self::BusError>;

    /// Writes a byte, least significant bit first.
    ///
    /// # Returns
    /// The byte observed on the line while writing.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<u8, Self::BusError> {
        let mut observed = 0;
        for i in 0..8 {
            if self.write_bit(byte & (1 << i) != 0)? {
                observed |= 1 << i;
            }
        }
        Ok(observed)
    }

    /// Reads a byte from the 1-Wire bus.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        self.write_byte(0xff)
    }

    /// Reads a single bit from the 1-Wire bus.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.write_bit(true)
    }

    /// Addresses devices on the 1-Wire bus.
    ///
    /// Resets the bus, then issues either a Match ROM followed by the 64-bit ROM code, or a
    /// Skip ROM when `rom` is [`None`].
    fn address(&mut self, rom: Option<u64>) -> OneWireResult<(), Self::BusError> {
        self.reset()?;
        match rom {
            Some(rom) => {
                self.write_byte(ONEWIRE_MATCH_ROM_CMD)?;
                for &b in rom.to_le_bytes().iter() {
                    self.write_byte(b)?;
                }
            }
            None => {
                self.write_byte(ONEWIRE_SKIP_ROM_CMD)?;
            }
        }
        Ok(())
    }
}

impl<T: OneWire + ?Sized> OneWire for &mut T {
    type BusError = T::BusError;

    fn reset(&mut self) -> OneWireResult<(), Self::BusError> {
        T::reset(self)
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<bool, Self::BusError> {
        T::write_bit(self, bit)
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<u8, Self::BusError> {
        T::write_byte(self, byte)
    }
}
