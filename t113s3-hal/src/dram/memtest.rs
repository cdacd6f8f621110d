//! Write/read self test of the initialized DRAM.
use t113s3::SDRAM_BASE;

use crate::mmio::RegisterSpace;

/// Words written to each half of the DRAM by [simple_write_read_test].
pub const SIMPLE_TEST_WORDS: usize = 4096;

pub const PATTERN_LOW: u32 = 0x0123_4567;
pub const PATTERN_HIGH: u32 = 0xFEDC_BA98;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("memory test error at {addr:#010x}: expected {expected:#010x}, found {found:#010x}")]
pub struct MemTestError {
    pub addr: usize,
    pub expected: u32,
    pub found: u32,
}

/// Writes `words` incrementing words at the DRAM start and at half of the DRAM size, then
/// verifies both blocks.
pub fn simple_write_read_test(
    regs: &mut impl RegisterSpace,
    size_mb: u32,
    words: usize,
) -> Result<(), MemTestError> {
    let half = ((size_mb as usize) >> 1) << 20;
    let low = SDRAM_BASE;
    let high = SDRAM_BASE + half;

    for i in 0..words {
        regs.write32(low + 4 * i, PATTERN_LOW.wrapping_add(i as u32));
        regs.write32(high + 4 * i, PATTERN_HIGH.wrapping_add(i as u32));
    }

    for i in 0..words {
        for (base, pattern) in [(low, PATTERN_LOW), (high, PATTERN_HIGH)] {
            let addr = base + 4 * i;
            let expected = pattern.wrapping_add(i as u32);
            let found = regs.read32(addr);
            if found != expected {
                return Err(MemTestError {
                    addr,
                    expected,
                    found,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Memory {
        words: HashMap<usize, u32>,
        /// Address bits which are not connected.
        ignored_bits: usize,
    }

    impl RegisterSpace for Memory {
        fn read32(&mut self, addr: usize) -> u32 {
            *self.words.get(&(addr & !self.ignored_bits)).unwrap_or(&0)
        }

        fn write32(&mut self, addr: usize, value: u32) {
            self.words.insert(addr & !self.ignored_bits, value);
        }
    }

    #[test]
    fn test_passes_on_working_memory() {
        let mut mem = Memory::default();
        simple_write_read_test(&mut mem, 128, SIMPLE_TEST_WORDS).unwrap();
        assert_eq!(mem.words.len(), 2 * SIMPLE_TEST_WORDS);
        assert_eq!(mem.words[&SDRAM_BASE], PATTERN_LOW);
        assert_eq!(mem.words[&(SDRAM_BASE + (64 << 20) + 4)], PATTERN_HIGH + 1);
    }

    #[test]
    fn test_detects_missing_address_line() {
        // The upper half aliases with the lower half of a 256 MB device.
        let mut mem = Memory {
            ignored_bits: 1 << 27,
            ..Default::default()
        };
        let err = simple_write_read_test(&mut mem, 256, 16).unwrap_err();
        assert_eq!(
            err,
            MemTestError {
                addr: SDRAM_BASE,
                expected: PATTERN_LOW,
                found: PATTERN_HIGH,
            }
        );
    }

    #[test]
    fn test_zero_words() {
        let mut mem = Memory {
            ignored_bits: !0,
            ..Default::default()
        };
        simple_write_read_test(&mut mem, 128, 0).unwrap();
        assert!(mem.words.is_empty());
    }
}
