//! A byte-level DS1820 model implementing [`OneWire`], for host-side tests.

use crate::Record;
use core::convert::Infallible;
use onewire_gpio::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWire, OneWireCrc, OneWireError, OneWireResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Waiting for a ROM command after reset.
    Rom,
    /// Receiving Match ROM bytes.
    Match { pos: u8, matched: bool },
    /// Waiting for a function command.
    Function,
    /// Shifting out scratchpad bytes.
    Scratchpad { pos: usize },
    /// Not addressed, or done with the last command.
    Idle,
    /// Not selected by Match ROM; stays off the line until the next reset.
    Deselected,
}

/// Simulated sensor.
#[derive(Debug, Clone)]
pub struct SimDs1820 {
    present: bool,
    rom: u64,
    scratchpad: [u8; 9],
    busy_polls: usize,
    busy_remaining: usize,
    corrupt_reads: usize,
    mode: Mode,
    resets: usize,
    conversions: usize,
}

impl SimDs1820 {
    /// A present sensor whose next conversion produces `record`.
    pub fn new(record: Record) -> Self {
        Self {
            present: true,
            rom: u64::from_le_bytes([0x10, 0, 0, 0, 0, 0, 0, 0]),
            scratchpad: Self::scratchpad_for(record),
            busy_polls: 0,
            busy_remaining: 0,
            corrupt_reads: 0,
            mode: Mode::Idle,
            resets: 0,
            conversions: 0,
        }
    }

    /// Sets whether the sensor answers resets.
    pub fn with_present(mut self, present: bool) -> Self {
        self.present = present;
        self
    }

    /// Sets the ROM code matched by Match ROM.
    pub fn with_rom(mut self, rom: u64) -> Self {
        self.rom = rom;
        self
    }

    /// Number of busy reads after each Convert T before the line is released.
    pub fn with_busy_polls(mut self, polls: usize) -> Self {
        self.busy_polls = polls;
        self
    }

    /// Number of upcoming scratchpad reads that arrive with a flipped bit.
    pub fn with_corrupt_reads(mut self, reads: usize) -> Self {
        self.corrupt_reads = reads;
        self
    }

    /// Replace the value the sensor reports.
    pub fn set_record(&mut self, record: Record) {
        self.scratchpad = Self::scratchpad_for(record);
    }

    /// Flip a bit in the next `reads` scratchpad reads.
    pub fn set_corrupt_reads(&mut self, reads: usize) {
        self.corrupt_reads = reads;
    }

    /// Plug or unplug the sensor.
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Reset pulses seen so far.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Convert T commands seen so far.
    pub fn conversions(&self) -> usize {
        self.conversions
    }

    /// Whether a conversion is still holding the line.
    pub fn converting(&self) -> bool {
        self.busy_remaining > 0
    }

    fn scratchpad_for(record: Record) -> [u8; 9] {
        let mut pad = [
            record.lsb,
            record.msb,
            0x4b,
            0x46,
            0xff,
            0xff,
            record.count_remain,
            record.count_per_c,
            0,
        ];
        pad[8] = OneWireCrc::compute(&pad[..8]);
        pad
    }
}

impl OneWire for SimDs1820 {
    type BusError = Infallible;

    fn reset(&mut self) -> OneWireResult<(), Self::BusError> {
        self.resets += 1;
        if !self.present {
            return Err(OneWireError::NoDevicePresent);
        }
        self.mode = Mode::Rom;
        Ok(())
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<bool, Self::BusError> {
        Ok(bit && self.present && self.busy_remaining == 0)
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<u8, Self::BusError> {
        if !self.present {
            return Ok(byte);
        }
        let (next, observed) = match self.mode {
            Mode::Rom => match byte {
                ONEWIRE_SKIP_ROM_CMD => (Mode::Function, byte),
                ONEWIRE_MATCH_ROM_CMD => (Mode::Match { pos: 0, matched: true }, byte),
                _ => (Mode::Idle, byte),
            },
            Mode::Match { pos, matched } => {
                let matched = matched && self.rom.to_le_bytes()[pos as usize] == byte;
                match (pos, matched) {
                    (7, true) => (Mode::Function, byte),
                    (7, false) => (Mode::Deselected, byte),
                    _ => (Mode::Match { pos: pos + 1, matched }, byte),
                }
            }
            Mode::Function => match byte {
                0x44 => {
                    self.conversions += 1;
                    self.busy_remaining = self.busy_polls;
                    (Mode::Idle, byte)
                }
                0xbe => (Mode::Scratchpad { pos: 0 }, byte),
                _ => (Mode::Idle, byte),
            },
            Mode::Scratchpad { pos } => {
                let mut value = self.scratchpad[pos];
                if pos == 0 && self.corrupt_reads > 0 {
                    self.corrupt_reads -= 1;
                    value ^= 0x04;
                }
                let next = if pos == 8 {
                    Mode::Idle
                } else {
                    Mode::Scratchpad { pos: pos + 1 }
                };
                (next, value & byte)
            }
            Mode::Idle if self.busy_remaining > 0 => {
                self.busy_remaining -= 1;
                (Mode::Idle, 0x00)
            }
            Mode::Idle | Mode::Deselected => (self.mode, byte),
        };
        self.mode = next;
        Ok(observed)
    }
}
