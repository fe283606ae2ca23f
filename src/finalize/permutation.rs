//! This module builds the wire-equality argument over the refactored
//! placements.
//!
//! Each placement is a row, and each of its wires is a column laid out as the
//! subcircuit templates expect: the constant one at column zero, the outputs
//! next, and the inputs after the template's full set of outputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{
        container::Locatable,
        finalize::{Error, Result},
    },
    finalize::refactor::{LimbPlacement, WireRef},
    synthesis::subcircuit::{SubcircuitInfo, SubcircuitLibrary},
};

/// A single wire of the circuit, as a placement row and a wire column.
#[derive(Copy, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Coordinate {
    pub row:    usize,
    pub column: usize,
}

/// A closed list of coordinates whose wires all carry the same value.
///
/// The first coordinate is the producing output wire and is repeated at the
/// end.
pub type Cycle = Vec<Coordinate>;

/// Gets the column at which the inputs of `placement` start.
///
/// Templates with fixed outputs reserve their full output width, even when the
/// placement only uses part of it. Buffers are as wide as their contents.
#[must_use]
pub fn input_column(placement: &LimbPlacement, info: &SubcircuitInfo) -> usize {
    1 + info.out_wires.unwrap_or(placement.outputs.len())
}

/// Looks up the template instantiated by `placement` in `library`.
///
/// # Errors
///
/// Returns [`Err`] if the library has no template of that name.
pub fn template<'a>(
    placement: &LimbPlacement,
    library: &'a SubcircuitLibrary,
) -> Result<&'a SubcircuitInfo> {
    library.get(&placement.subcircuit).ok_or_else(|| {
        Error::UnknownSubcircuit {
            placement: placement.id.0,
            name:      placement.subcircuit.clone(),
        }
        .locate(placement.instruction_pointer)
    })
}

/// Builds one cycle for every output limb that is consumed at least once.
///
/// Cycles are ordered by their producing wire, and consumers within a cycle by
/// placement and then column.
///
/// # Errors
///
/// Returns [`Err`] if a placement instantiates an unknown template.
pub fn build(placements: &[LimbPlacement], library: &SubcircuitLibrary) -> Result<Vec<Cycle>> {
    let mut consumers: BTreeMap<WireRef, Vec<Coordinate>> = BTreeMap::new();
    for placement in placements {
        let info = template(placement, library)?;
        let first_input = input_column(placement, info);
        for (i, wire) in placement.inputs.iter().enumerate() {
            if let Some(producer) = wire.producer {
                consumers.entry(producer).or_default().push(Coordinate {
                    row:    placement.id.0,
                    column: first_input + i,
                });
            }
        }
    }

    let cycles = consumers
        .into_iter()
        .map(|(producer, consumers)| {
            let start = Coordinate {
                row:    producer.placement.0,
                column: 1 + producer.wire,
            };
            let mut cycle = Vec::with_capacity(consumers.len() + 2);
            cycle.push(start);
            cycle.extend(consumers);
            cycle.push(start);
            cycle
        })
        .collect();

    Ok(cycles)
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        error::finalize::Error,
        finalize::{
            permutation::{build, Coordinate},
            refactor::refactor,
        },
        synthesis::{
            buffer::{add_wire_to_in_buffer, add_wire_to_out_buffer},
            operation::{place_exp, ExpIterations},
            placement::PlacementId,
            registry::StateRegistry,
            subcircuit::SubcircuitLibrary,
            symbol::DataPt,
        },
    };

    #[test]
    fn every_cycle_closes_on_its_start() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let (three, five) = (U256::from(3u8), U256::from(5u8));
        let base = add_wire_to_in_buffer(&mut registry, PlacementId::PUB_IN, three, 32, None, 0)?;
        let exponent =
            add_wire_to_in_buffer(&mut registry, PlacementId::PRV_IN, five, 32, None, 0)?;
        let result = place_exp(&mut registry, &base, &exponent, ExpIterations::BitLength, 10)?;
        add_wire_to_out_buffer(&mut registry, PlacementId::PUB_OUT, &result, None, 10)?;

        let library = registry.library().clone();
        let placements = refactor(registry.into_placements())?;
        let cycles = build(&placements, &library)?;

        assert!(!cycles.is_empty());
        for cycle in &cycles {
            assert!(cycle.len() >= 3);
            assert_eq!(cycle.first(), cycle.last());
        }

        Ok(())
    }

    #[test]
    fn bit_inputs_start_after_the_full_output_width() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let base = DataPt::word(U256::from(2u8));
        let one = U256::ONE;
        let exponent = add_wire_to_in_buffer(&mut registry, PlacementId::PRV_IN, one, 32, None, 0)?;
        place_exp(&mut registry, &base, &exponent, ExpIterations::BitLength, 0)?;

        let library = registry.library().clone();
        let placements = refactor(registry.into_placements())?;
        let cycles = build(&placements, &library)?;

        // The exponent's two limbs feed the bit decomposition at placement 4.
        assert_eq!(cycles[0], vec![
            Coordinate { row: 2, column: 1 },
            Coordinate { row: 4, column: 257 },
            Coordinate { row: 2, column: 1 },
        ]);
        assert_eq!(cycles[1][1], Coordinate { row: 4, column: 258 });

        // The single bit feeds the last input of the step at placement 5,
        // after its four output limbs and four word limbs.
        assert_eq!(cycles[2], vec![
            Coordinate { row: 4, column: 1 },
            Coordinate { row: 5, column: 9 },
            Coordinate { row: 4, column: 1 },
        ]);

        Ok(())
    }

    #[test]
    fn unknown_templates_are_reported() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let a = add_wire_to_in_buffer(&mut registry, PlacementId::PRV_IN, U256::ONE, 32, None, 0)?;
        registry.place("AND", "AND", None, vec![a.clone(), a], &[(U256::ONE, 32)], 12)?;
        let placements = refactor(registry.into_placements())?;

        let library = SubcircuitLibrary::new(vec![]);
        let error = build(&placements, &library).expect_err("empty library");
        assert_eq!(error.location, 0);
        assert!(matches!(error.payload, Error::UnknownSubcircuit { placement: 0, .. }));

        Ok(())
    }
}
