//! This module computes the full wire assignment of every placement.
//!
//! The computation itself is delegated to a [`WitnessBackend`], which stands in
//! for the witness generators compiled alongside the subcircuit templates. The
//! [`NativeBackend`] evaluates the standard templates directly.

use std::fmt::Debug;

use ethnum::U256;
use thiserror::Error;
use tracing::debug;

use crate::{
    arith::{self, ArithOp},
    error::{
        container::Locatable,
        finalize::{Error, Result},
    },
    finalize::{permutation, refactor::LimbPlacement},
    synthesis::subcircuit::{self, SubcircuitInfo, SubcircuitLibrary},
    utility::{bits_le, join_limbs, split_limbs},
};

/// Errors reported by a [`WitnessBackend`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum BackendError {
    #[error("Subcircuit `{_0}` is not supported by this backend")]
    UnsupportedSubcircuit(String),

    #[error("Expected at most {expected} input wires but got {actual}")]
    TooManyInputs { expected: usize, actual: usize },

    #[error("{actual} input wires end partway through a port of a {expected}-wire template")]
    PartialPort { expected: usize, actual: usize },

    #[error("Selector {_0:#x} does not choose an operation of this subcircuit")]
    UnknownSelector(U256),

    #[error("Witness generation failed: {_0}")]
    Other(String),
}

/// A generator of witnesses for subcircuit templates.
///
/// Given a template and the values of its input wires, a backend returns the
/// template's full wire vector: the constant one, then the outputs, then the
/// inputs, then any internal signals.
pub trait WitnessBackend
where
    Self: Debug,
{
    /// Computes the wire vector of `subcircuit` for the input limbs `inputs`.
    ///
    /// # Errors
    ///
    /// If the backend cannot compute a witness for these inputs.
    fn compute(
        &self,
        subcircuit: &SubcircuitInfo,
        inputs: &[U256],
    ) -> std::result::Result<Vec<U256>, BackendError>;
}

/// A backend that evaluates the standard templates natively.
///
/// The standard templates have no internal signals, so the wire vector consists
/// of the constant, the outputs and the inputs alone. Whole trailing ports may
/// be left out and are padded with zero limbs, but every port that is given
/// must carry all of its limbs.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NativeBackend;

impl WitnessBackend for NativeBackend {
    fn compute(
        &self,
        subcircuit: &SubcircuitInfo,
        inputs: &[U256],
    ) -> std::result::Result<Vec<U256>, BackendError> {
        let mut inputs = inputs.to_vec();
        if let Some(expected) = subcircuit.in_wires {
            if inputs.len() > expected {
                return Err(BackendError::TooManyInputs {
                    expected,
                    actual: inputs.len(),
                });
            }
            if !ends_on_port(&subcircuit.name, inputs.len()) {
                return Err(BackendError::PartialPort {
                    expected,
                    actual: inputs.len(),
                });
            }
            inputs.resize(expected, U256::ZERO);
        }

        let outputs = if subcircuit.is_buffer() {
            inputs.clone()
        } else {
            evaluate(&subcircuit.name, &inputs)?
        };

        let mut wires = Vec::with_capacity(1 + outputs.len() + inputs.len());
        wires.push(U256::ONE);
        wires.extend(outputs);
        wires.extend(inputs);
        Ok(wires)
    }
}

/// Checks that `count` input limbs fill whole ports of the template `name`.
///
/// Templates without a known port layout accept any count.
fn ends_on_port(name: &str, count: usize) -> bool {
    let mut filled = 0;
    for index in 0.. {
        if filled >= count {
            break;
        }
        match subcircuit::input_port_limbs(name, index) {
            Some(port) => filled += port,
            None => return true,
        }
    }
    filled == count
}

/// Evaluates the standard template `name` on the padded input limbs `inputs`.
fn evaluate(name: &str, inputs: &[U256]) -> std::result::Result<Vec<U256>, BackendError> {
    let words: Vec<U256> = inputs
        .chunks(2)
        .map(|c| join_limbs(c[0], c.get(1).copied().unwrap_or_default()))
        .collect();
    let word = |i: usize| words.get(i).copied().unwrap_or_default();

    let outputs = match name {
        subcircuit::ALU1
        | subcircuit::ALU2
        | subcircuit::ALU3
        | subcircuit::ALU4
        | subcircuit::ALU5 => {
            let selector = word(0);
            let op = ArithOp::from_selector(selector)
                .filter(|op| {
                    subcircuit::operation_subcircuit(*op).map(|(n, _)| n) == Some(name)
                })
                .ok_or(BackendError::UnknownSelector(selector))?;
            let operands: Vec<U256> = (1..=op.arity()).map(word).collect();
            let result = op
                .evaluate(&operands)
                .ok_or_else(|| BackendError::Other(format!("bad operands for {op}")))?;
            limbs(result)
        }
        subcircuit::AND => limbs(word(0) & word(1)),
        subcircuit::OR => limbs(word(0) | word(1)),
        subcircuit::XOR => limbs(word(0) ^ word(1)),
        subcircuit::DEC_TO_BIT => {
            let bits = bits_le(word(0));
            bits.iter().map(|bit| if *bit { U256::ONE } else { U256::ZERO }).collect()
        }
        subcircuit::SUB_EXP => {
            // The bit is a single limb after the two words.
            let bit = inputs.get(4).copied().unwrap_or_default();
            let (result, power) = arith::exp_step(word(0), word(1), bit == U256::ONE);
            let mut outputs = limbs(result);
            outputs.extend(limbs(power));
            outputs
        }
        other => return Err(BackendError::UnsupportedSubcircuit(other.to_string())),
    };

    Ok(outputs)
}

fn limbs(value: U256) -> Vec<U256> {
    let (low, high) = split_limbs(value);
    vec![low, high]
}

/// The computed wire vector of one placement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlacementWitness {
    pub placement:     usize,
    pub subcircuit_id: usize,
    pub subcircuit:    String,
    pub wires:         Vec<U256>,
}

/// Computes the witness of every placement in `placements` using `backend`.
///
/// The output wires returned by the backend are checked against the outputs
/// recorded during execution. Templates may declare more outputs than a
/// placement uses, in which case only the recorded prefix is checked.
///
/// # Errors
///
/// Returns [`Err`] if a placement uses an unknown template, if the backend
/// fails, or if its outputs disagree with the recorded ones.
pub fn compute_all(
    placements: &[LimbPlacement],
    library: &SubcircuitLibrary,
    backend: &dyn WitnessBackend,
) -> Result<Vec<PlacementWitness>> {
    placements
        .iter()
        .map(|placement| {
            let info = permutation::template(placement, library)?;
            let failure = |reason: String| {
                Error::WitnessComputation {
                    placement: placement.id.0,
                    subcircuit: placement.subcircuit.clone(),
                    reason,
                }
                .locate(placement.instruction_pointer)
            };

            let wires = backend
                .compute(info, &placement.input_values())
                .map_err(|e| failure(e.to_string()))?;
            let computed = wires.get(1..=placement.outputs.len()).ok_or_else(|| {
                failure(format!("backend returned only {} wires", wires.len()))
            })?;
            if let Some((wire, (expected, actual))) = placement
                .outputs
                .iter()
                .zip(computed)
                .enumerate()
                .find(|(_, (expected, actual))| expected != actual)
            {
                return Err(failure(format!(
                    "output wire {wire} is {actual:#x} but {expected:#x} was recorded"
                )));
            }

            debug!(
                placement = placement.id.0,
                subcircuit = %placement.subcircuit,
                wires = wires.len(),
                "Computed witness"
            );

            Ok(PlacementWitness {
                placement: placement.id.0,
                subcircuit_id: info.id,
                subcircuit: info.name.clone(),
                wires,
            })
        })
        .collect()
}
