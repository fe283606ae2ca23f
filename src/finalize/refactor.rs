//! This module rewrites the recorded placements into their field-sized form.
//!
//! Two things happen here. Input buffer wires that nothing consumes are
//! dropped, with the surviving wires renumbered densely. Then every symbol is
//! cut into 128-bit limbs, so that a word occupies two wires and a bit one, and
//! every consumed limb is linked to the exact output limb that produces it.
//! Narrow inputs of a template are padded with zero limbs to fill their port.

use std::{
    collections::{HashMap, HashSet},
    iter,
};

use ethnum::U256;
use tracing::debug;

use crate::{
    constant::LIMB_SIZE_BYTES,
    error::{
        container::Locatable,
        finalize::{Error, Result},
    },
    synthesis::{
        placement::{Placement, PlacementId},
        subcircuit,
        symbol::DataPt,
    },
    utility::{fits_in_limb, split_limbs},
};

/// A reference to a single output limb of a placement.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WireRef {
    pub placement: PlacementId,
    pub wire:      usize,
}

/// A single input limb of a placement, together with the output limb that
/// produces it.
///
/// Limbs of literals and of raw external values have no producer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Wire {
    pub value:    U256,
    pub producer: Option<WireRef>,
}

impl Wire {
    /// A zero limb with no producer.
    pub const ZERO: Self = Self {
        value:    U256::ZERO,
        producer: None,
    };
}

/// A placement whose inputs and outputs have been cut into limbs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LimbPlacement {
    pub id:                  PlacementId,
    pub subcircuit:          String,
    pub usage:               String,
    pub instruction_pointer: u32,
    pub inputs:              Vec<Wire>,
    pub outputs:             Vec<U256>,
}

impl LimbPlacement {
    /// Gets the values of the input limbs in order.
    #[must_use]
    pub fn input_values(&self) -> Vec<U256> {
        self.inputs.iter().map(|w| w.value).collect()
    }
}

/// Where the limbs of one symbolic output wire live among the output limbs of
/// its placement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct LimbSpan {
    offset: usize,
    count:  usize,
}

/// Prunes unused input buffer wires from `placements` and cuts every remaining
/// wire into limbs.
///
/// The placements must be given in id order, which is also the order of the
/// result.
///
/// # Errors
///
/// Returns [`Err`] if a narrow wire carries a value wider than a limb, or if a
/// placement consumes a wire that does not exist.
pub fn refactor(placements: Vec<Placement>) -> Result<Vec<LimbPlacement>> {
    let consumed: HashSet<(PlacementId, usize)> = placements
        .iter()
        .flat_map(Placement::in_pts)
        .filter_map(|pt| Some((pt.placement()?, pt.wire_index()?)))
        .collect();

    // Remaps the surviving wires of the input buffers to their dense indices.
    let mut renumbered: HashMap<(PlacementId, usize), usize> = HashMap::new();
    let mut pruned = Vec::with_capacity(placements.len());
    for placement in placements {
        if !placement.id().is_input_buffer() {
            pruned.push(placement);
            continue;
        }
        let before = placement.out_pts().len();
        let placement = prune_input_buffer(placement, &consumed, &mut renumbered);
        debug!(
            buffer = placement.id().0,
            before,
            after = placement.out_pts().len(),
            "Pruned input buffer"
        );
        pruned.push(placement);
    }

    let mut spans: HashMap<PlacementId, Vec<LimbSpan>> = HashMap::new();
    let mut limb_outputs = Vec::with_capacity(pruned.len());
    for placement in &pruned {
        let mut offset = 0;
        let mut placement_spans = Vec::with_capacity(placement.out_pts().len());
        let mut outputs = Vec::new();
        for out_pt in placement.out_pts() {
            let limbs = limbs_of(out_pt, placement)?;
            placement_spans.push(LimbSpan {
                offset,
                count: limbs.len(),
            });
            offset += limbs.len();
            outputs.extend(limbs);
        }
        spans.insert(placement.id(), placement_spans);
        limb_outputs.push(outputs);
    }

    pruned
        .into_iter()
        .zip(limb_outputs)
        .map(|(placement, outputs)| {
            let mut inputs = Vec::new();
            for (index, in_pt) in placement.in_pts().iter().enumerate() {
                let limbs = limbs_of(in_pt, &placement)?;
                let padding = match subcircuit::input_port_limbs(placement.subcircuit(), index) {
                    Some(port) if limbs.len() > port => {
                        return Err(Error::PortOverflow {
                            placement: placement.id().0,
                            input: index,
                            limbs: limbs.len(),
                            port,
                        }
                        .locate(placement.instruction_pointer()));
                    }
                    Some(port) => port - limbs.len(),
                    None => 0,
                };
                let producer = match (in_pt.placement(), in_pt.wire_index()) {
                    (Some(source), Some(wire)) => {
                        let wire = renumbered.get(&(source, wire)).copied().unwrap_or(wire);
                        let dangling = || {
                            Error::DanglingWire {
                                placement: placement.id().0,
                                source_placement: source.0,
                                wire,
                            }
                            .locate(placement.instruction_pointer())
                        };
                        let span = spans
                            .get(&source)
                            .and_then(|s| s.get(wire))
                            .copied()
                            .ok_or_else(dangling)?;
                        if span.count != limbs.len() {
                            return Err(dangling());
                        }
                        Some((source, span.offset))
                    }
                    _ => None,
                };

                inputs.extend(limbs.into_iter().enumerate().map(|(i, value)| Wire {
                    value,
                    producer: producer.map(|(placement, offset)| WireRef {
                        placement,
                        wire: offset + i,
                    }),
                }));
                // Narrow values sit in the low limbs of a wider port.
                inputs.extend(iter::repeat(Wire::ZERO).take(padding));
            }

            Ok(LimbPlacement {
                id: placement.id(),
                subcircuit: placement.subcircuit().to_string(),
                usage: placement.usage().to_string(),
                instruction_pointer: placement.instruction_pointer(),
                inputs,
                outputs,
            })
        })
        .collect()
}

/// Drops the wires of the input buffer `placement` whose symbols are not in
/// `consumed`, recording the new index of every surviving wire.
fn prune_input_buffer(
    placement: Placement,
    consumed: &HashSet<(PlacementId, usize)>,
    renumbered: &mut HashMap<(PlacementId, usize), usize>,
) -> Placement {
    let id = placement.id();
    let (in_pts, out_pts): (Vec<DataPt>, Vec<DataPt>) = placement
        .in_pts()
        .iter()
        .zip(placement.out_pts())
        .enumerate()
        .filter(|(wire, _)| consumed.contains(&(id, *wire)))
        .map(|(_, (in_pt, out_pt))| (in_pt.clone(), out_pt.clone()))
        .unzip();

    let mut new_index = 0;
    for wire in 0..placement.out_pts().len() {
        if consumed.contains(&(id, wire)) {
            renumbered.insert((id, wire), new_index);
            new_index += 1;
        }
    }

    let mut result = placement;
    result.set_wires(in_pts, out_pts);
    result
}

/// Cuts the value of `symbol` into limbs, low limb first.
///
/// Symbols wider than a limb always take two limbs, even when their value
/// would fit in one, so that the wire layout follows the declared width.
fn limbs_of(symbol: &DataPt, placement: &Placement) -> Result<Vec<U256>> {
    let value = symbol.value();
    if symbol.source_size() > LIMB_SIZE_BYTES {
        let (low, high) = split_limbs(value);
        Ok(vec![low, high])
    } else if fits_in_limb(value) {
        Ok(vec![value])
    } else {
        Err(Error::LimbOverflow {
            placement: placement.id().0,
            value,
        }
        .locate(placement.instruction_pointer()))
    }
}
