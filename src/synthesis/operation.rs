//! This module contains the operation handler, which records arithmetic,
//! comparison and bitwise operations as subcircuit placements.

use ethnum::U256;

use crate::{
    arith::{self, ArithOp},
    constant::{EXPONENT_BIT_COUNT, WORD_SIZE_BYTES},
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    synthesis::{
        registry::StateRegistry,
        subcircuit::{self, DEC_TO_BIT, SUB_EXP},
        symbol::{DataPt, BIT_SYMBOL_SIZE},
    },
    utility::bits_le,
};

/// The number of `SubEXP` placements used to compute an exponentiation.
///
/// The chain only needs one iteration per significant bit of the exponent,
/// which is the default. A fixed chain of 256 iterations yields the same
/// circuit shape for every exponent, matching worst-case size estimates at the
/// cost of many redundant placements.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum ExpIterations {
    /// One iteration per significant bit of the exponent.
    #[default]
    BitLength,

    /// One iteration per bit of a word.
    WorstCase,
}

impl ExpIterations {
    /// Gets the number of iterations to run for `exponent`.
    #[must_use]
    pub fn count(&self, exponent: U256) -> usize {
        match self {
            Self::BitLength => arith::bit_length(exponent),
            Self::WorstCase => EXPONENT_BIT_COUNT,
        }
    }
}

/// Records the operation `op` applied to `in_pts`, given in stack-pop order,
/// and returns the symbol for its result.
///
/// The placement receives the operation's selector as its first input when its
/// subcircuit performs more than one operation. [`ArithOp::Exp`] is recorded
/// as a composite using [`ExpIterations::BitLength`].
///
/// # Errors
///
/// Returns [`Err`] if the number of operands does not match the operation or
/// if the placement cannot be recorded.
pub fn place_arith(
    registry: &mut StateRegistry,
    op: ArithOp,
    in_pts: &[DataPt],
    instruction_pointer: u32,
) -> Result<DataPt> {
    let values: Vec<U256> = in_pts.iter().map(DataPt::value).collect();
    let result = op
        .evaluate(&values)
        .ok_or_else(|| Error::InvalidOperandCount {
            name:     op.name().into(),
            expected: op.arity(),
            actual:   in_pts.len(),
        })
        .locate(instruction_pointer)?;

    let Some((name, selector)) = subcircuit::operation_subcircuit(op) else {
        return place_exp(
            registry,
            &in_pts[0],
            &in_pts[1],
            ExpIterations::BitLength,
            instruction_pointer,
        );
    };

    let mut inputs = Vec::with_capacity(in_pts.len() + 1);
    if let Some(selector) = selector {
        inputs.push(DataPt::word(selector));
    }
    inputs.extend_from_slice(in_pts);

    let outputs = registry.place(
        name,
        op.name(),
        selector,
        inputs,
        &[(result, WORD_SIZE_BYTES)],
        instruction_pointer,
    )?;

    single_output(outputs, op.name(), instruction_pointer)
}

/// Records `base ** exponent` as a bit decomposition of the exponent followed
/// by a chain of square-and-multiply steps, and returns the symbol for the
/// result.
///
/// A zero exponent yields a literal one without any placements.
///
/// # Errors
///
/// Returns [`Err`] if a placement cannot be recorded.
pub fn place_exp(
    registry: &mut StateRegistry,
    base: &DataPt,
    exponent: &DataPt,
    iterations: ExpIterations,
    instruction_pointer: u32,
) -> Result<DataPt> {
    let exponent_value = exponent.value();
    if exponent_value == U256::ZERO {
        return Ok(DataPt::word(U256::ONE));
    }

    let iteration_count = iterations.count(exponent_value);
    let bit_values: Vec<(U256, usize)> = bits_le(exponent_value)
        .iter()
        .take(iteration_count)
        .map(|bit| (if *bit { U256::ONE } else { U256::ZERO }, BIT_SYMBOL_SIZE))
        .collect();
    let bits = registry.place(
        DEC_TO_BIT,
        "EXP",
        None,
        vec![exponent.clone()],
        &bit_values,
        instruction_pointer,
    )?;

    let mut result = DataPt::word(U256::ONE);
    let mut power = base.clone();
    for bit in bits {
        let (next_result, next_power) =
            arith::exp_step(result.value(), power.value(), bit.value() == U256::ONE);
        let outputs = registry.place(
            SUB_EXP,
            "EXP",
            None,
            vec![result, power, bit],
            &[(next_result, WORD_SIZE_BYTES), (next_power, WORD_SIZE_BYTES)],
            instruction_pointer,
        )?;
        let mut outputs = outputs.into_iter();
        match (outputs.next(), outputs.next()) {
            (Some(r), Some(p)) => {
                result = r;
                power = p;
            }
            _ => {
                return Err(Error::InvalidOperandCount {
                    name:     SUB_EXP.into(),
                    expected: 2,
                    actual:   0,
                }
                .locate(instruction_pointer))
            }
        }
    }

    Ok(result)
}

/// Extracts the only output of a placement.
fn single_output(outputs: Vec<DataPt>, name: &str, instruction_pointer: u32) -> Result<DataPt> {
    let actual = outputs.len();
    outputs.into_iter().next().ok_or_else(|| {
        Error::InvalidOperandCount {
            name: name.into(),
            expected: 1,
            actual,
        }
        .locate(instruction_pointer)
    })
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        arith::ArithOp,
        error::execution::Error,
        synthesis::{
            operation::{place_arith, place_exp, ExpIterations},
            placement::PlacementId,
            registry::StateRegistry,
            subcircuit,
            symbol::DataPt,
        },
    };

    fn word(value: u64) -> DataPt {
        DataPt::word(U256::from(value))
    }

    #[test]
    fn add_is_placed_on_alu1_with_its_selector() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let result = place_arith(&mut registry, ArithOp::Add, &[word(10), word(5)], 0)?;
        assert_eq!(result.value(), U256::from(15u8));
        assert_eq!(result.placement(), Some(PlacementId(4)));

        let placement = registry.placement(PlacementId(4)).expect("Placement exists");
        assert_eq!(placement.subcircuit(), subcircuit::ALU1);
        assert_eq!(placement.selector(), Some(U256::ONE << 1u32));
        let inputs: Vec<U256> = placement.in_pts().iter().map(DataPt::value).collect();
        assert_eq!(inputs, vec![U256::ONE << 1u32, U256::from(10u8), U256::from(5u8)]);
        assert_eq!(placement.out_pts(), &[result]);

        Ok(())
    }

    #[test]
    fn bitwise_operations_have_no_selector() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let result = place_arith(&mut registry, ArithOp::And, &[word(0b110), word(0b011)], 0)?;
        assert_eq!(result.value(), U256::from(0b010u8));

        let placement = registry.placement(PlacementId(4)).expect("Placement exists");
        assert_eq!(placement.subcircuit(), subcircuit::AND);
        assert_eq!(placement.selector(), None);
        assert_eq!(placement.in_pts().len(), 2);

        Ok(())
    }

    #[test]
    fn division_by_zero_is_placed_not_raised() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let result = place_arith(&mut registry, ArithOp::Div, &[word(10), word(0)], 0)?;
        assert_eq!(result.value(), U256::ZERO);
        assert_eq!(registry.next_id(), PlacementId(5));

        Ok(())
    }

    #[test]
    fn wrong_operand_counts_are_rejected() {
        let mut registry = StateRegistry::default();
        let result = place_arith(&mut registry, ArithOp::AddMod, &[word(1), word(2)], 4);
        let error = result.expect_err("Missing operand was accepted");
        assert_eq!(error.location, 4);
        assert!(matches!(error.payload, Error::InvalidOperandCount { expected: 3, .. }));
    }

    #[test]
    fn exponentiation_chains_one_step_per_bit() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let result = place_exp(&mut registry, &word(3), &word(5), ExpIterations::BitLength, 0)?;
        assert_eq!(result.value(), U256::from(243u8));

        // One decomposition plus one step for each of the three bits of `5`.
        assert_eq!(registry.next_id(), PlacementId(8));
        let bits = registry.placement(PlacementId(4)).expect("Placement exists");
        assert_eq!(bits.subcircuit(), subcircuit::DEC_TO_BIT);
        let bit_values: Vec<U256> = bits.out_pts().iter().map(DataPt::value).collect();
        assert_eq!(bit_values, vec![U256::ONE, U256::ZERO, U256::ONE]);
        assert!(bits.out_pts().iter().all(|bit| bit.source_size() == 1));

        let last = registry.placement(PlacementId(7)).expect("Placement exists");
        assert_eq!(last.subcircuit(), subcircuit::SUB_EXP);
        assert_eq!(last.out_pts()[0], result);

        Ok(())
    }

    #[test]
    fn worst_case_exponentiation_always_runs_every_bit() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let result = place_exp(&mut registry, &word(2), &word(10), ExpIterations::WorstCase, 0)?;
        assert_eq!(result.value(), U256::from(1024u16));
        assert_eq!(registry.next_id(), PlacementId(4 + 1 + 256));

        Ok(())
    }

    #[test]
    fn zero_exponent_is_a_literal_one() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let result = place_arith(&mut registry, ArithOp::Exp, &[word(9), word(0)], 0)?;
        assert_eq!(result.value(), U256::ONE);
        assert!(result.is_literal());
        assert_eq!(registry.next_id(), PlacementId(4));

        Ok(())
    }
}
