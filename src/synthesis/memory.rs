//! This module contains the symbolic memory, which keeps the full history of
//! memory writes and works out which earlier writes make up a read.
//!
//! # Lazy Resolution
//!
//! Writes only append an entry and never create placements. All circuit work is
//! deferred to reads, where [`SymbolicMemory::get_data_alias`] describes how
//! each contributing write has to be shifted and masked to rebuild the region.
//! The [`super::memory_manager`] turns that description into placements.

use ethnum::U256;

use crate::{
    constant::WORD_SIZE_BYTES,
    error::execution::Error,
    synthesis::symbol::DataPt,
    utility::byte_mask,
};

/// One write to memory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryEntry {
    timestamp: usize,
    offset:    usize,
    size:      usize,
    symbol:    DataPt,
}

impl MemoryEntry {
    #[must_use]
    pub fn timestamp(&self) -> usize {
        self.timestamp
    }

    /// Gets the byte offset in memory at which the entry was written.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Gets the number of bytes written.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gets the byte offset one past the end of the entry.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Gets the symbol whose big-endian bytes were written.
    #[must_use]
    pub fn symbol(&self) -> &DataPt {
        &self.symbol
    }
}

/// How one earlier write contributes to a read.
///
/// The contribution is `shift(symbol) & masker`, where a positive `shift`
/// moves the symbol's bits left and a negative one moves them right. The read
/// value is the bitwise OR of all contributions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataAliasInfo {
    /// The symbol that was written.
    pub symbol: DataPt,

    /// The number of bytes occupied by the write.
    pub size: usize,

    /// The bit shift aligning the write with the read.
    pub shift: i32,

    /// The bits of the aligned write that are visible in the read.
    pub masker: U256,
}

impl DataAliasInfo {
    /// Gets the bits that the aligned write can occupy, before masking.
    #[must_use]
    pub fn footprint(&self) -> U256 {
        shift_bits(byte_mask(self.size), self.shift)
    }

    /// Checks if the contribution needs a mask to discard bits of the write
    /// that are not visible in the read.
    #[must_use]
    pub fn needs_mask(&self) -> bool {
        self.footprint() & !self.masker != U256::ZERO
    }

    /// Checks if the write lines up exactly with a read of `size` bytes, so
    /// that its symbol is the value of the read as it stands.
    #[must_use]
    pub fn covers(&self, size: usize) -> bool {
        self.shift == 0 && self.size == size && self.masker == byte_mask(size)
    }

    /// Computes the value of the contribution.
    #[must_use]
    pub fn contribution(&self) -> U256 {
        shift_bits(self.symbol.value(), self.shift) & self.masker
    }
}

/// The write history of memory for one transaction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolicMemory {
    entries: Vec<MemoryEntry>,
}

impl SymbolicMemory {
    /// Creates a memory with no writes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the low `size` bytes of `symbol` were written big-endian
    /// at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `size` is not between one and a word, or if the
    /// value of `symbol` does not fit in `size` bytes.
    pub fn write(&mut self, offset: usize, size: usize, symbol: DataPt) -> Result<(), Error> {
        if size == 0 || size > WORD_SIZE_BYTES {
            return Err(Error::InvalidReadSize { size });
        }
        if symbol.value() & !byte_mask(size) != U256::ZERO {
            return Err(Error::SymbolTooWide {
                value: symbol.value(),
                size,
            });
        }

        let timestamp = self.entries.len();
        self.entries.push(MemoryEntry {
            timestamp,
            offset,
            size,
            symbol,
        });

        Ok(())
    }

    /// Works out which earlier writes make up the `size` bytes at `offset`,
    /// returned in the order they were written.
    ///
    /// Later writes take precedence over earlier ones on every byte they cover.
    /// Writes whose bytes are entirely overwritten do not contribute, and bytes
    /// that were never written read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `size` is not between one and a word.
    pub fn get_data_alias(&self, offset: usize, size: usize) -> Result<Vec<DataAliasInfo>, Error> {
        if size == 0 || size > WORD_SIZE_BYTES {
            return Err(Error::InvalidReadSize { size });
        }
        let end = offset + size;
        let mut uncovered = byte_mask(size);
        let mut infos = Vec::new();

        for entry in self.entries.iter().rev() {
            if uncovered == U256::ZERO {
                break;
            }
            let overlap_start = entry.offset.max(offset);
            let overlap_end = entry.end().min(end);
            if overlap_start >= overlap_end {
                continue;
            }

            let region = range_mask(end - overlap_end, overlap_end - overlap_start);
            let contributing = region & uncovered;
            if contributing == U256::ZERO {
                continue;
            }
            uncovered &= !contributing;

            infos.push(DataAliasInfo {
                symbol: entry.symbol.clone(),
                size:   entry.size,
                shift:  alignment_shift(end, entry.end()),
                masker: contributing,
            });
        }

        infos.reverse();
        Ok(infos)
    }

    /// Gets every write in the order it was made.
    #[must_use]
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Checks if memory has never been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Gets a mask of `count` bytes starting `low_byte` bytes above the least
/// significant byte.
fn range_mask(low_byte: usize, count: usize) -> U256 {
    shift_bits(byte_mask(count), bits(low_byte))
}

/// Gets the bit shift that moves the last byte of a write ending at
/// `entry_end` onto the byte it occupies in a read ending at `read_end`.
fn alignment_shift(read_end: usize, entry_end: usize) -> i32 {
    if read_end >= entry_end {
        bits(read_end - entry_end)
    } else {
        -bits(entry_end - read_end)
    }
}

/// Converts a byte distance into a bit shift, saturating past the word.
fn bits(bytes: usize) -> i32 {
    i32::try_from(bytes.min(WORD_SIZE_BYTES) * 8).unwrap_or(i32::MAX)
}

/// Shifts `value` left by `shift` bits, or right for a negative `shift`.
#[must_use]
pub fn shift_bits(value: U256, shift: i32) -> U256 {
    let amount = shift.unsigned_abs();
    if amount >= 256 {
        U256::ZERO
    } else if shift >= 0 {
        value << amount
    } else {
        value >> amount
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;
    use rand::{thread_rng, Rng};

    use crate::{
        arith::ArithOp,
        constant::WORD_SIZE_BYTES,
        error::execution::Error,
        finalize::{finalize, witness::NativeBackend},
        synthesis::{
            memory::{DataAliasInfo, SymbolicMemory},
            memory_manager,
            operation::place_arith,
            registry::StateRegistry,
            symbol::DataPt,
        },
        utility::{byte_mask, word_from_be_slice},
    };

    fn word(value: U256) -> DataPt {
        DataPt::word(value)
    }

    fn read_value(infos: &[DataAliasInfo]) -> U256 {
        infos.iter().fold(U256::ZERO, |acc, info| acc | info.contribution())
    }

    #[test]
    fn unwritten_memory_has_no_contributions() -> anyhow::Result<()> {
        let memory = SymbolicMemory::new();
        assert!(memory.get_data_alias(0, 32)?.is_empty());

        Ok(())
    }

    #[test]
    fn aligned_reads_are_a_single_unmasked_contribution() -> anyhow::Result<()> {
        let mut memory = SymbolicMemory::new();
        let value = word(U256::from(0x1234u16));
        memory.write(0x20, 32, value.clone())?;

        let infos = memory.get_data_alias(0x20, 32)?;
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].symbol, value);
        assert_eq!(infos[0].shift, 0);
        assert_eq!(infos[0].masker, U256::MAX);
        assert!(!infos[0].needs_mask());

        Ok(())
    }

    #[test]
    fn fully_overwritten_writes_do_not_contribute() -> anyhow::Result<()> {
        let mut memory = SymbolicMemory::new();
        memory.write(0x10, 32, word(U256::ONE))?;
        memory.write(0x00, 32, word(U256::from(2u8)))?;

        let infos = memory.get_data_alias(0x00, 32)?;
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].symbol.value(), U256::from(2u8));

        Ok(())
    }

    #[test]
    fn misaligned_reads_shift_and_mask_each_write() -> anyhow::Result<()> {
        let mut memory = SymbolicMemory::new();
        let y = U256::from_words(0x1111_1111_1111_1111_2222_2222_2222_2222, 0x3333);
        let x = U256::from_words(0x4444_4444_4444_4444_5555_5555_5555_5555, 0x6666);
        memory.write(0x00, 32, word(y))?;
        memory.write(0x10, 32, word(x))?;

        // The read covers bytes 0x08..0x28: the last 8 bytes of `y` that are not
        // overwritten, then the first 24 bytes of `x`.
        let infos = memory.get_data_alias(0x08, 32)?;
        assert_eq!(infos.len(), 2);

        let y_info = &infos[0];
        assert_eq!(y_info.symbol.value(), y);
        assert_eq!(y_info.shift, 64);
        assert_eq!(y_info.masker, byte_mask(8) << 192u32);
        assert!(y_info.needs_mask());

        let x_info = &infos[1];
        assert_eq!(x_info.symbol.value(), x);
        assert_eq!(x_info.shift, -64);
        assert_eq!(x_info.masker, byte_mask(24));
        assert!(!x_info.needs_mask());

        Ok(())
    }

    #[test]
    fn single_byte_writes_land_on_their_byte() -> anyhow::Result<()> {
        let mut memory = SymbolicMemory::new();
        memory.write(0x00, 32, word(U256::MAX))?;
        memory.write(0x01, 1, DataPt::word(U256::from(0xabu8)))?;

        let infos = memory.get_data_alias(0x00, 32)?;
        let cleared = U256::MAX & !(U256::from(0xffu8) << 240u32);
        let expected = cleared | (U256::from(0xabu8) << 240u32);
        assert_eq!(read_value(&infos), expected);

        Ok(())
    }

    #[test]
    fn rejects_invalid_sizes_and_wide_symbols() {
        let mut memory = SymbolicMemory::new();
        assert_eq!(
            memory.write(0, 0, word(U256::ZERO)),
            Err(Error::InvalidReadSize { size: 0 })
        );
        assert_eq!(
            memory.write(0, 1, word(U256::from(0x100u16))),
            Err(Error::SymbolTooWide {
                value: U256::from(0x100u16),
                size:  1,
            })
        );
        assert_eq!(
            memory.get_data_alias(0, 33),
            Err(Error::InvalidReadSize { size: 33 })
        );
    }

    #[test]
    fn reads_match_a_flat_memory_model() -> anyhow::Result<()> {
        let mut rng = thread_rng();
        for _ in 0..50 {
            let mut memory = SymbolicMemory::new();
            let mut flat = vec![0u8; 160];

            for _ in 0..rng.gen_range(1..8) {
                let offset = rng.gen_range(0..128);
                let size = if rng.gen_bool(0.2) { 1 } else { 32 };
                let bytes: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
                flat[offset..offset + size].copy_from_slice(&bytes);
                let value = word_from_be_slice(&bytes);
                let symbol = if rng.gen_bool(0.5) {
                    DataPt::literal(value, size)
                } else {
                    word(value)
                };
                memory.write(offset, size, symbol)?;
            }

            let offset = rng.gen_range(0..128);
            let size = if rng.gen_bool(0.5) { 32 } else { rng.gen_range(1..=32) };
            let infos = memory.get_data_alias(offset, size)?;
            let expected = word_from_be_slice(&flat[offset..offset + size]);
            assert_eq!(read_value(&infos), expected);

            // The resolved symbol is as wide as the read unless it is an exact
            // earlier write, and it must survive finalization as an operand.
            let mut registry = StateRegistry::default();
            let resolved = memory_manager::resolve(&mut registry, &memory, offset, size, 0)?;
            assert_eq!(resolved.value(), expected);
            if size == WORD_SIZE_BYTES {
                assert_eq!(resolved.source_size(), WORD_SIZE_BYTES);
            }
            place_arith(&mut registry, ArithOp::Add, &[resolved, word(U256::ONE)], 1)?;
            finalize(registry, &NativeBackend)?;
        }

        Ok(())
    }
}
