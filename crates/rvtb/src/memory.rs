//! Simulated memories a binary can be loaded into.
//!
//! A design under test exposes its memory one of two ways: as an indexable
//! array of 32-bit words (a `mem_array` signal), or behind a bus model that
//! accepts byte-addressed word writes (an AXI-Lite RAM). [`WordArray`] and
//! [`BusInterface`] capture the two, and [`WordMemory`] / [`BusRam`] are
//! in-process implementations used by tests and standalone drivers.

use thiserror::Error;

/// Target memory write error.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("word index {index} is outside the {len}-word memory")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("address {addr:#x} is outside the {size}-byte memory")]
    AddressOutOfRange { addr: u64, size: usize },

    #[error("address {0:#x} is not word aligned")]
    Misaligned(u64),
}

/// Memory addressed by word index.
pub trait WordArray {
    /// Number of words in the array.
    fn len_words(&self) -> usize;

    /// Store `value` at word `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    fn set_word(&mut self, index: u64, value: u32) -> Result<(), MemoryError>;
}

/// Memory behind a bus that takes byte-addressed 4-byte writes.
pub trait BusInterface {
    /// Write the 4-byte word `value` at byte address `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    fn write_dword(&mut self, addr: u64, value: u32) -> Result<(), MemoryError>;
}

/// Fixed-size array of words, like a design's `mem_array`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordMemory {
    words: Vec<u32>,
}

impl WordMemory {
    /// Create a zeroed memory of `len` words.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len],
        }
    }

    #[must_use]
    pub fn word(&self, index: usize) -> Option<u32> {
        self.words.get(index).copied()
    }

    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl WordArray for WordMemory {
    fn len_words(&self) -> usize {
        self.words.len()
    }

    fn set_word(&mut self, index: u64, value: u32) -> Result<(), MemoryError> {
        let len = self.words.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.words.get_mut(i))
            .ok_or(MemoryError::IndexOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }
}

/// Byte-addressed little-endian RAM, like an AXI-Lite RAM model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusRam {
    data: Vec<u8>,
}

impl BusRam {
    /// Create a zeroed RAM of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.data.len()
    }

    /// Read the 4-byte word at byte address `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is misaligned or out of range.
    pub fn read_dword(&self, addr: u64) -> Result<u32, MemoryError> {
        let range = self.word_range(addr)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[range]);
        Ok(u32::from_le_bytes(bytes))
    }

    fn word_range(&self, addr: u64) -> Result<std::ops::Range<usize>, MemoryError> {
        if addr % 4 != 0 {
            return Err(MemoryError::Misaligned(addr));
        }
        let size = self.data.len();
        let start = usize::try_from(addr)
            .ok()
            .filter(|&start| start.checked_add(4).is_some_and(|end| end <= size))
            .ok_or(MemoryError::AddressOutOfRange { addr, size })?;
        Ok(start..start + 4)
    }
}

impl BusInterface for BusRam {
    fn write_dword(&mut self, addr: u64, value: u32) -> Result<(), MemoryError> {
        let range = self.word_range(addr)?;
        self.data[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_memory() {
        let mut mem = WordMemory::new(4);
        mem.set_word(3, 0xdead_beef).unwrap();
        assert_eq!(mem.word(3), Some(0xdead_beef));
        assert_eq!(mem.words(), &[0, 0, 0, 0xdead_beef]);
        assert!(matches!(
            mem.set_word(4, 1),
            Err(MemoryError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_bus_ram_little_endian() {
        let mut ram = BusRam::new(16);
        ram.write_dword(4, 0x2345_02b7).unwrap();
        assert_eq!(ram.read_dword(4).unwrap(), 0x2345_02b7);
        assert_eq!(ram.data[4..8], [0xb7, 0x02, 0x45, 0x23]);
        assert_eq!(ram.read_dword(0).unwrap(), 0);
    }

    #[test]
    fn test_bus_ram_bounds() {
        let mut ram = BusRam::new(8);
        assert!(matches!(ram.write_dword(2, 0), Err(MemoryError::Misaligned(2))));
        assert!(matches!(
            ram.write_dword(8, 0),
            Err(MemoryError::AddressOutOfRange { addr: 8, size: 8 })
        ));
        assert!(ram.write_dword(4, 0).is_ok());
    }
}
