#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::fmt::Display;

use log::{info, warn};

use crate::common::format_word;
use crate::errors::SimError;

pub const WORD_BYTES: usize = 4;

/// Byte addressable data memory, stored as 32-bit words. Byte `k` of a word
/// occupies bits `8k..8k+7`, so word accesses behave as little-endian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    words: Vec<u32>,
    baseline: Option<Vec<u32>>,
}

/// Mask covering the low `n_bytes` bytes of a word, `n_bytes` in `1..=3`
fn low_mask(n_bytes: usize) -> u32 {
    (1u32 << (n_bytes * 8)) - 1
}

impl Memory {
    /// Creates a zero filled memory of `capacity` bytes. `capacity` must be a
    /// non-zero multiple of `WORD_BYTES`
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity != 0 && capacity % WORD_BYTES == 0,
            "Memory capacity {capacity} is not a non-zero multiple of {WORD_BYTES}"
        );
        info!("Creating data memory with {capacity} bytes");

        Self {
            words: vec![0; capacity / WORD_BYTES],
            baseline: None,
        }
    }

    /// Returns the capacity in bytes
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    fn check_address(&self, address: i64) -> Result<usize, SimError> {
        let capacity = self.capacity();
        match usize::try_from(address) {
            Ok(addr) if addr < capacity => Ok(addr),
            _ => Err(SimError::MemoryOutOfBounds { address, capacity }),
        }
    }

    fn check_word_access(&self, address: i64) -> Result<usize, SimError> {
        let addr = self.check_address(address)?;
        let capacity = self.capacity();
        if addr + WORD_BYTES > capacity {
            return Err(SimError::UnalignedOversizeAccess { address, capacity });
        }
        Ok(addr)
    }

    /// Reads the 32-bit word starting at byte `address`. Unaligned reads
    /// are assembled from the two words the access straddles
    pub fn read_word(&self, address: i64) -> Result<u32, SimError> {
        let byte_address = self.check_word_access(address)?;

        let start_word = byte_address & !0x3;
        let end_word = (byte_address + 3) & !0x3;
        let byte_offset = byte_address & 0x3;

        if start_word == end_word {
            return Ok(self.words[start_word / WORD_BYTES]);
        }

        let first_word = self.words[start_word / WORD_BYTES];
        let second_word = self.words[end_word / WORD_BYTES];
        let bytes_from_first = WORD_BYTES - byte_offset;

        let upper_part = first_word >> (byte_offset * 8);
        let lower_part = second_word & low_mask(byte_offset);

        Ok(upper_part | (lower_part << (bytes_from_first * 8)))
    }

    /// Writes `value` to the 32-bit word starting at byte `address`. Unaligned
    /// writes update the low bytes of the second word and the high bytes of
    /// the first, leaving the remaining bytes of both intact
    pub fn write_word(&mut self, address: i64, value: u32) -> Result<(), SimError> {
        let byte_address = self.check_word_access(address)?;
        info!("Writing {} to address {byte_address:04X}", format_word(value));

        let start_word = byte_address & !0x3;
        let end_word = (byte_address + 3) & !0x3;
        let byte_offset = byte_address & 0x3;

        if start_word == end_word {
            self.words[start_word / WORD_BYTES] = value;
            return Ok(());
        }

        let bytes_to_replace = WORD_BYTES - byte_offset;
        let keep_mask = low_mask(byte_offset);

        let first_word = &mut self.words[start_word / WORD_BYTES];
        *first_word = (*first_word & keep_mask) | ((value << (byte_offset * 8)) & !keep_mask);

        let second_word = &mut self.words[end_word / WORD_BYTES];
        *second_word = (*second_word & !keep_mask) | ((value >> (bytes_to_replace * 8)) & keep_mask);

        Ok(())
    }

    pub fn read_byte(&self, address: i64) -> Result<u8, SimError> {
        let addr = self.check_address(address)?;
        Ok(self.words[addr / WORD_BYTES].to_le_bytes()[addr & 0x3])
    }

    pub fn write_byte(&mut self, address: i64, value: u8) -> Result<(), SimError> {
        let addr = self.check_address(address)?;
        let shift = (addr & 0x3) * 8;
        let word = &mut self.words[addr / WORD_BYTES];
        *word = (*word & !(0xFF << shift)) | (u32::from(value) << shift);
        Ok(())
    }

    /// Zero fills the whole region
    pub fn reset(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub fn snapshot_as_baseline(&mut self) {
        self.baseline = Some(self.words.clone());
    }

    pub fn restore_from_baseline(&mut self) {
        if let Some(baseline) = &self.baseline {
            self.words.clone_from(baseline);
        } else {
            warn!("No previously saved memory state available");
        }
    }

    /// Formats `count` words starting with word index `start_word` as
    /// `"AAAA: XXXX XXXX"` rows, with a byte address
    pub fn rows(&self, start_word: usize, count: usize) -> Vec<String> {
        self.words
            .iter()
            .enumerate()
            .skip(start_word)
            .take(count)
            .map(|(i, word)| format!("{:04X}: {}", i * WORD_BYTES, format_word(*word)))
            .collect()
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.rows(0, self.words.len()) {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
