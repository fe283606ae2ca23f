//! This module manages the four buffer placements, the only boundary between
//! external values and symbols.
//!
//! Input buffers mint a fresh symbol for every raw value they are given.
//! Output buffers record existing symbols together with the value that is
//! observed outside the circuit, and never create symbols for further use.

use ethnum::U256;
use tracing::debug;

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    synthesis::{
        placement::PlacementId,
        registry::StateRegistry,
        symbol::{DataPt, External},
    },
};

/// Converts the raw external `value` of `size` bytes into a new symbol carried
/// by the next wire of the input `buffer`.
///
/// # Errors
///
/// Returns [`Err`] if `buffer` is not an input buffer.
pub fn add_wire_to_in_buffer(
    registry: &mut StateRegistry,
    buffer: PlacementId,
    value: U256,
    size: usize,
    external: Option<External>,
    instruction_pointer: u32,
) -> Result<DataPt> {
    if !buffer.is_input_buffer() {
        return Err(Error::InvalidBuffer {
            placement: buffer.0,
        }
        .locate(instruction_pointer));
    }
    let placement = registry.buffer_mut(buffer).ok_or(
        Error::InvalidBuffer {
            placement: buffer.0,
        }
        .locate(instruction_pointer),
    )?;

    let wire = placement.out_pts().len();
    let raw = DataPt::raw(value, size, external);
    let symbol = DataPt::output(buffer, wire, value, size).with_external(external);
    placement.push_wire(raw, symbol.clone());

    debug!(buffer = buffer.0, wire, %value, "Minted buffer wire");

    Ok(symbol)
}

/// Exports the existing `symbol` through the next wire of the output `buffer`,
/// returning the wire's observed output.
///
/// # Errors
///
/// Returns [`Err`] if `buffer` is not an output buffer or if `symbol` refers
/// to a wire that does not exist.
pub fn add_wire_to_out_buffer(
    registry: &mut StateRegistry,
    buffer: PlacementId,
    symbol: &DataPt,
    external: Option<External>,
    instruction_pointer: u32,
) -> Result<DataPt> {
    if !buffer.is_output_buffer() {
        return Err(Error::InvalidBuffer {
            placement: buffer.0,
        }
        .locate(instruction_pointer));
    }
    registry.validate_symbol(symbol).locate(instruction_pointer)?;
    let placement = registry.buffer_mut(buffer).ok_or(
        Error::InvalidBuffer {
            placement: buffer.0,
        }
        .locate(instruction_pointer),
    )?;

    let wire = placement.out_pts().len();
    let observed =
        DataPt::output(buffer, wire, symbol.value(), symbol.source_size()).with_external(external);
    placement.push_wire(symbol.clone(), observed.clone());

    debug!(buffer = buffer.0, wire, value = %symbol.value(), "Exported buffer wire");

    Ok(observed)
}
