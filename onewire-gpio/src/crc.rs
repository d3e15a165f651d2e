/// Reflected form of the Dallas/Maxim polynomial `x^8 + x^5 + x^4 + 1` (0x31).
const POLY: u8 = 0x8c;

#[cfg(feature = "crc-table")]
const TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x1 == 0x1 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

#[derive(Debug, Default, Clone, Copy)]
/// Calculate CRC-8 used in 1-Wire communications.
pub struct OneWireCrc(u8);

impl OneWireCrc {
    /// Get the current CRC value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Update the CRC with the incoming byte.
    #[cfg(feature = "crc-table")]
    pub fn update(&mut self, byte: u8) {
        self.0 = TABLE[(self.0 ^ byte) as usize];
    }

    /// Update the CRC with the incoming byte.
    #[cfg(not(feature = "crc-table"))]
    pub fn update(&mut self, byte: u8) {
        let mut crc = self.0 ^ byte;
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
        self.0 = crc;
    }

    /// Compute the CRC of a byte sequence.
    pub fn compute(sequence: &[u8]) -> u8 {
        let mut crc = OneWireCrc(0);
        for &byte in sequence.iter() {
            crc.update(byte);
        }
        crc.0
    }

    /// Validate a sequence of bytes where the last byte is the 1-Wire CRC of
    /// the previous bytes.
    pub fn validate(sequence: &[u8]) -> bool {
        // running the CRC over data + CRC leaves a zero residue
        !sequence.is_empty() && Self::compute(sequence) == 0x0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn rom_code_from_app_note() {
        assert_eq!(OneWireCrc::compute(&[0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00]), 0xa2);
        assert!(OneWireCrc::validate(&[0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00, 0xa2]));
    }

    #[test]
    fn power_on_scratchpads() {
        // DS18S20 and DS18B20 power-on register contents
        assert!(OneWireCrc::validate(&[0xaa, 0x00, 0x4b, 0x46, 0xff, 0xff, 0x0c, 0x10, 0x87]));
        assert!(OneWireCrc::validate(&[0x50, 0x05, 0x4b, 0x46, 0x7f, 0xff, 0x0c, 0x10, 0x1c]));
    }

    #[test]
    fn empty_sequence_is_invalid() {
        assert!(!OneWireCrc::validate(&[]));
    }

    #[test]
    fn random_blocks_validate_and_single_bit_flips_fail() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let mut block = [0u8; 9];
            rng.fill(&mut block[..8]);
            block[8] = OneWireCrc::compute(&block[..8]);
            assert!(OneWireCrc::validate(&block));

            for byte in 0..9 {
                for bit in 0..8 {
                    let mut corrupted = block;
                    corrupted[byte] ^= 1 << bit;
                    assert!(
                        !OneWireCrc::validate(&corrupted),
                        "flip of byte {byte} bit {bit} went undetected in {block:02x?}"
                    );
                }
            }
        }
    }
}
