//! Errors raised while turning the recorded placements into the artifacts
//! consumed by the prover.

use ethnum::U256;
use thiserror::Error;

use crate::error::container;

/// Errors that occur during finalization.
///
/// These are located at the byte offset of the instruction whose execution
/// created the offending placement, or at zero for the buffer placements.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Witness computation failed for placement {placement} ({subcircuit}): {reason}")]
    WitnessComputation {
        placement:  usize,
        subcircuit: String,
        reason:     String,
    },

    #[error("Placement {placement} uses unknown subcircuit `{name}`")]
    UnknownSubcircuit { placement: usize, name: String },

    #[error("Placement {placement} consumes wire {wire} of placement {source_placement} which does not exist")]
    DanglingWire {
        placement:        usize,
        source_placement: usize,
        wire:             usize,
    },

    #[error("Wire of placement {placement} is declared narrow but carries {value}")]
    LimbOverflow { placement: usize, value: U256 },

    #[error("Input {input} of placement {placement} needs {limbs} limbs but its port has {port}")]
    PortOverflow {
        placement: usize,
        input:     usize,
        limbs:     usize,
        port:      usize,
    },

    #[error("Could not serialize artifacts: {_0}")]
    Serialization(String),
}

/// A finalization error with an associated location in the bytecode.
pub type LocatedError = container::Located<Error>;

/// The result type for functions that may return finalization errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, instruction_pointer: u32) -> Self::Located {
        container::Located {
            location: instruction_pointer,
            payload:  self,
        }
    }
}
