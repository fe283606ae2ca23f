//! This module turns the placements recorded during execution into the
//! artifacts consumed by the prover.
//!
//! Finalization runs in three phases, each of which sees the complete output
//! of the one before it:
//!
//! 1. [`refactor`] prunes unused input wires and cuts every wire into 128-bit
//!    limbs.
//! 2. [`permutation`] links every consumed limb to the limb that produces it.
//! 3. [`witness`] computes and checks the wire vector of every placement.

pub mod output;
pub mod permutation;
pub mod refactor;
pub mod witness;

use tracing::info;

use crate::{
    error::finalize::Result,
    finalize::{output::Artifacts, witness::WitnessBackend},
    synthesis::registry::StateRegistry,
};

/// Consumes `registry` to produce the prover's artifacts, computing witnesses
/// with `backend`.
///
/// # Errors
///
/// Returns [`Err`] if the placements cannot be refactored, reference unknown
/// templates, or have witnesses that disagree with their recorded outputs.
pub fn finalize(registry: StateRegistry, backend: &dyn WitnessBackend) -> Result<Artifacts> {
    let library = registry.library().clone();
    let recorded = registry.placement_count();

    let placements = refactor::refactor(registry.into_placements())?;
    let wire_count: usize = placements.iter().map(|p| p.outputs.len()).sum();
    info!(placements = recorded, output_limbs = wire_count, "Refactored placements");

    let cycles = permutation::build(&placements, &library)?;
    info!(cycles = cycles.len(), "Built wire permutation");

    let witnesses = witness::compute_all(&placements, &library, backend)?;
    info!(witnesses = witnesses.len(), "Computed witnesses");

    Ok(Artifacts::assemble(&placements, witnesses, cycles))
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        arith::ArithOp,
        finalize::{finalize, witness::NativeBackend},
        synthesis::{
            buffer::{add_wire_to_in_buffer, add_wire_to_out_buffer},
            operation::place_arith,
            placement::PlacementId,
            registry::StateRegistry,
            symbol::DataPt,
        },
        utility::U256W,
    };

    #[test]
    fn finalizes_a_small_computation() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let (ten, five) = (U256::from(10u8), U256::from(5u8));
        let a = add_wire_to_in_buffer(&mut registry, PlacementId::PUB_IN, ten, 32, None, 0)?;
        let b = add_wire_to_in_buffer(&mut registry, PlacementId::PRV_IN, five, 32, None, 0)?;
        let unused = U256::from(99u8);
        add_wire_to_in_buffer(&mut registry, PlacementId::PRV_IN, unused, 32, None, 0)?;
        let sum = place_arith(&mut registry, ArithOp::Add, &[a, b], 4)?;
        add_wire_to_out_buffer(&mut registry, PlacementId::PUB_OUT, &sum, None, 6)?;

        let artifacts = finalize(registry, &NativeBackend)?;

        assert_eq!(artifacts.io.public_input, vec![U256W::from(ten), U256W::default()]);
        assert_eq!(artifacts.io.private_input.len(), 2);
        assert_eq!(artifacts.io.public_output[0], U256W::from(U256::from(15u8)));

        // Two limbs for each input buffer wire into the ALU and two for the sum
        // into the output buffer.
        assert_eq!(artifacts.topology.cycles.len(), 6);

        let alu = &artifacts.witness.placements[4];
        assert_eq!(alu.subcircuit, "ALU1");
        assert_eq!(alu.wires[1], U256W::from(U256::from(15u8)));

        Ok(())
    }

    #[test]
    fn narrow_operands_keep_their_words_apart() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let data = U256::from(0x0102_0304u32);
        let narrow = add_wire_to_in_buffer(&mut registry, PlacementId::PUB_IN, data, 4, None, 0)?;
        let sum = place_arith(&mut registry, ArithOp::Add, &[DataPt::word(U256::ONE), narrow], 3)?;
        add_wire_to_out_buffer(&mut registry, PlacementId::PUB_OUT, &sum, None, 4)?;

        let artifacts = finalize(registry, &NativeBackend)?;

        let alu = &artifacts.witness.placements[4];
        assert_eq!(alu.wires[1], U256W::from(data + U256::ONE));
        assert_eq!(artifacts.io.public_output[0], U256W::from(data + U256::ONE));

        Ok(())
    }
}
