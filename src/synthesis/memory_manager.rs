//! This module contains the memory manager, which turns the aliasing
//! information computed by [`SymbolicMemory`] into the placements that rebuild
//! a memory region as a single symbol.

use ethnum::U256;
use tracing::debug;

use crate::{
    arith::ArithOp,
    constant::WORD_SIZE_BYTES,
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    synthesis::{
        memory::{DataAliasInfo, SymbolicMemory},
        operation::place_arith,
        registry::StateRegistry,
        symbol::DataPt,
    },
};

/// Reads the `size` bytes at `offset` from `memory` as one symbol.
///
/// Virgin memory reads as a literal zero and a read that lines up exactly with
/// a single earlier write reuses that write's symbol. Neither creates any
/// placements. Otherwise every contributing write is shifted into position,
/// masked down to its visible bytes where needed, and the fragments are
/// combined with `OR`.
///
/// # Errors
///
/// Returns [`Err`] if `size` is not between one and a word, or if a placement
/// cannot be recorded.
pub fn resolve(
    registry: &mut StateRegistry,
    memory: &SymbolicMemory,
    offset: usize,
    size: usize,
    instruction_pointer: u32,
) -> Result<DataPt> {
    let infos = memory.get_data_alias(offset, size).locate(instruction_pointer)?;
    if let [info] = infos.as_slice() {
        if info.covers(size) {
            return Ok(info.symbol.clone());
        }
    }
    let first_placement = registry.next_id();

    // A lone fragment always goes through a placement, so that a write narrower
    // than the read comes out at the full width of the read.
    let alone = infos.len() == 1;
    let mut fragments = Vec::with_capacity(infos.len());
    for info in &infos {
        fragments.push(isolate(registry, info, alone, instruction_pointer)?);
    }

    let mut fragments = fragments.into_iter();
    let Some(mut result) = fragments.next() else {
        return Ok(DataPt::literal(U256::ZERO, size));
    };
    for fragment in fragments {
        result = place_arith(registry, ArithOp::Or, &[result, fragment], instruction_pointer)?;
    }

    debug!(
        offset,
        size,
        fragments = infos.len(),
        placements = registry.next_id().0 - first_placement.0,
        "Resolved memory read"
    );

    Ok(result)
}

/// Shifts and masks a single contributing write so that it holds exactly the
/// bits it provides to the read.
///
/// When `must_place` is set, an unshifted write that needs no mask is still
/// masked so that the fragment is the output of a placement.
fn isolate(
    registry: &mut StateRegistry,
    info: &DataAliasInfo,
    must_place: bool,
    instruction_pointer: u32,
) -> Result<DataPt> {
    let amount = DataPt::word(U256::from(info.shift.unsigned_abs()));
    let shifted = match info.shift {
        0 => info.symbol.clone(),
        s if s > 0 => place_arith(
            registry,
            ArithOp::Shl,
            &[amount, info.symbol.clone()],
            instruction_pointer,
        )?,
        _ => place_arith(
            registry,
            ArithOp::Shr,
            &[amount, info.symbol.clone()],
            instruction_pointer,
        )?,
    };

    if !info.needs_mask() && !(must_place && info.shift == 0) {
        return Ok(shifted);
    }

    place_arith(
        registry,
        ArithOp::And,
        &[shifted, DataPt::word(info.masker)],
        instruction_pointer,
    )
}

/// Splits the region of `size` bytes at `offset` into consecutive word-sized
/// windows, the last of which may be shorter, as `(offset, size)` pairs.
pub fn windows(offset: usize, size: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..size)
        .step_by(WORD_SIZE_BYTES)
        .map(move |start| (offset + start, (size - start).min(WORD_SIZE_BYTES)))
}

/// Reads the `size` bytes at `offset` from `memory` as one symbol per window
/// produced by [`windows`].
///
/// # Errors
///
/// Returns [`Err`] if a window cannot be resolved.
pub fn load_memory_chunks(
    registry: &mut StateRegistry,
    memory: &SymbolicMemory,
    offset: usize,
    size: usize,
    instruction_pointer: u32,
) -> Result<Vec<DataPt>> {
    windows(offset, size)
        .map(|(start, len)| resolve(registry, memory, start, len, instruction_pointer))
        .collect()
}

/// Writes `chunks` into `memory` at consecutive windows starting at `offset`,
/// as returned by [`load_memory_chunks`] for a region of `size` bytes.
///
/// # Errors
///
/// Returns [`Err`] if the number of chunks does not match the region or if a
/// chunk does not fit its window.
pub fn store_memory_chunks(
    memory: &mut SymbolicMemory,
    offset: usize,
    size: usize,
    chunks: Vec<DataPt>,
    instruction_pointer: u32,
) -> Result<()> {
    let window_count = size.div_ceil(WORD_SIZE_BYTES);
    if chunks.len() != window_count {
        return Err(Error::InvalidOperandCount {
            name:     "memory write".into(),
            expected: window_count,
            actual:   chunks.len(),
        }
        .locate(instruction_pointer));
    }

    for ((start, len), chunk) in windows(offset, size).zip(chunks) {
        memory.write(start, len, chunk).locate(instruction_pointer)?;
    }

    Ok(())
}
