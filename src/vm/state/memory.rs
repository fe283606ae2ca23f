//! This module contains the definition of the virtual machine's concrete
//! memory.

use ethnum::U256;

use crate::{
    constant::WORD_SIZE_BYTES,
    error::execution::Error,
    utility::{to_usize, word_from_be_slice},
};

/// The byte-addressed transient memory of the virtual machine.
///
/// As on a real EVM, memory is a flat byte array that grows in whole words
/// whenever an access touches a byte past its current end, and reading
/// unwritten bytes yields zero. Growth beyond the configured `limit` is an
/// error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
    bytes: Vec<u8>,
    limit: usize,
}

impl Memory {
    /// Constructs a new, empty memory that may grow to at most `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let bytes = Vec::new();
        Self { bytes, limit }
    }

    /// Validates an access of `size` bytes at `offset`, growing the memory to
    /// cover it, and returns both as `usize`.
    ///
    /// A zero-sized access never grows the memory, whatever its offset.
    ///
    /// # Errors
    ///
    /// If the access would grow the memory past its limit.
    pub fn expand(&mut self, offset: U256, size: U256) -> Result<(usize, usize), Error> {
        if size == U256::ZERO {
            return Ok((0, 0));
        }
        let limit_exceeded = || Error::MemoryLimitExceeded {
            requested: offset.saturating_add(size),
            limit:     self.limit,
        };
        let offset_usize = to_usize(offset).ok_or_else(limit_exceeded)?;
        let size_usize = to_usize(size).ok_or_else(limit_exceeded)?;
        let end = offset_usize.checked_add(size_usize).ok_or_else(limit_exceeded)?;
        let new_size = end.div_ceil(WORD_SIZE_BYTES) * WORD_SIZE_BYTES;
        if new_size > self.limit {
            return Err(limit_exceeded());
        }
        if new_size > self.bytes.len() {
            self.bytes.resize(new_size, 0);
        }

        Ok((offset_usize, size_usize))
    }

    /// Loads the word at `offset`.
    ///
    /// # Errors
    ///
    /// If the access would grow the memory past its limit.
    pub fn load_word(&mut self, offset: U256) -> Result<U256, Error> {
        let (offset, _) = self.expand(offset, U256::from(WORD_SIZE_BYTES as u64))?;
        Ok(word_from_be_slice(
            &self.bytes[offset..offset + WORD_SIZE_BYTES],
        ))
    }

    /// Stores `value` as a big-endian word at `offset`.
    ///
    /// # Errors
    ///
    /// If the access would grow the memory past its limit.
    pub fn store_word(&mut self, offset: U256, value: U256) -> Result<(), Error> {
        let (offset, _) = self.expand(offset, U256::from(WORD_SIZE_BYTES as u64))?;
        self.bytes[offset..offset + WORD_SIZE_BYTES].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Stores the single byte `value` at `offset`.
    ///
    /// # Errors
    ///
    /// If the access would grow the memory past its limit.
    pub fn store_byte(&mut self, offset: U256, value: u8) -> Result<(), Error> {
        let (offset, _) = self.expand(offset, U256::ONE)?;
        self.bytes[offset] = value;
        Ok(())
    }

    /// Reads `size` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// If the access would grow the memory past its limit.
    pub fn read(&mut self, offset: U256, size: U256) -> Result<Vec<u8>, Error> {
        let (offset, size) = self.expand(offset, size)?;
        Ok(self.bytes[offset..offset + size].to_vec())
    }

    /// Writes `data` at `offset`.
    ///
    /// # Errors
    ///
    /// If the access would grow the memory past its limit.
    pub fn write(&mut self, offset: U256, data: &[u8]) -> Result<(), Error> {
        let (offset, size) = self.expand(offset, U256::from(data.len() as u64))?;
        self.bytes[offset..offset + size].copy_from_slice(data);
        Ok(())
    }

    /// Copies `size` bytes from `source` to `destination`, which may overlap.
    ///
    /// # Errors
    ///
    /// If either region would grow the memory past its limit.
    pub fn copy_within(
        &mut self,
        destination: U256,
        source: U256,
        size: U256,
    ) -> Result<(), Error> {
        let (source, size) = self.expand(source, size)?;
        let (destination, _) = self.expand(destination, U256::from(size as u64))?;
        self.bytes.copy_within(source..source + size, destination);
        Ok(())
    }

    /// Reads `size` bytes at `offset` without growing the memory, with bytes
    /// past the end reading as zero.
    #[must_use]
    pub fn peek(&self, offset: usize, size: usize) -> Vec<u8> {
        (offset..offset.saturating_add(size))
            .map(|i| self.bytes.get(i).copied().unwrap_or(0))
            .collect()
    }

    /// Gets the current size of the memory in bytes, which is always a whole
    /// number of words.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Checks if the memory has never been touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reads `size` bytes of `data` starting at `offset`, with bytes past its end
/// reading as zero.
///
/// This is how call data and code are read by the copying opcodes.
#[must_use]
pub fn padded_slice(data: &[u8], offset: U256, size: usize) -> Vec<u8> {
    let start = to_usize(offset);
    (0..size)
        .map(|i| {
            start
                .and_then(|s| s.checked_add(i))
                .and_then(|index| data.get(index))
                .copied()
                .unwrap_or(0)
        })
        .collect()
}
