//! This module contains errors pertaining to the dual execution of the
//! bytecode, covering both the concrete and the symbolic halves of each step.

use ethnum::U256;
use thiserror::Error;

use crate::{error::container, provider::ProviderError};

/// Errors that occur during the execution of the bytecode by the
/// [`crate::vm::VM`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error(
        "Instruction pointer {requested:?} is out of bounds in bytecode of length {available:?}"
    )]
    InstructionPointerOutOfBounds { requested: usize, available: usize },

    #[error("Maximum stack depth exceeded with request for {requested:?} frames")]
    StackDepthExceeded { requested: usize },

    #[error("A stack frame at depth {depth:?} was requested but none was available")]
    NoSuchStackFrame { depth: i64 },

    #[error("Tried to step the virtual machine when no target instruction exists")]
    InvalidStep,

    #[error("The opcode at {offset:?} is not a valid jump destination")]
    InvalidJumpTarget { offset: u32 },

    #[error("No opcode exists at {offset:?}")]
    NonExistentJumpTarget { offset: u32 },

    #[error("Gas limit exceeded")]
    GasLimitExceeded,

    #[error("Step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: usize },

    #[error("Execution was stopped by the watchdog")]
    StoppedByWatchdog,

    #[error("Invalid instruction {byte:#04x} executed")]
    InvalidInstruction { byte: u8 },

    #[error("The `{name}` opcode is not supported")]
    UnsupportedOpcode { name: String },

    #[error("Concrete stack has {concrete} items but symbolic stack has {symbolic}")]
    StackLengthMismatch { concrete: usize, symbolic: usize },

    #[error(
        "Stack item at depth {depth} is {concrete} concretely but {symbolic} symbolically"
    )]
    ConsistencyViolation {
        depth:    usize,
        concrete: U256,
        symbolic: U256,
    },

    #[error("External state query failed: {message}")]
    ExternalDependency { message: String },

    #[error("Memory access of {requested} bytes exceeds the limit of {limit} bytes")]
    MemoryLimitExceeded { requested: U256, limit: usize },

    #[error("Return data access at {offset} of size {size} exceeds {available} available bytes")]
    ReturnDataOutOfBounds {
        offset:    U256,
        size:      U256,
        available: usize,
    },

    #[error("Placement {placement} is not a buffer usable for this direction")]
    InvalidBuffer { placement: usize },

    #[error("Symbol refers to wire {wire:?} of placement {placement} which does not produce it")]
    DanglingSymbol { placement: usize, wire: Option<usize> },

    #[error("No subcircuit named `{name}` exists in the subcircuit library")]
    UnknownSubcircuit { name: String },

    #[error("No subcircuit mapping exists for the operation `{name}`")]
    UnknownOperation { name: String },

    #[error("Operation `{name}` expects {expected} operands but received {actual}")]
    InvalidOperandCount {
        name:     String,
        expected: usize,
        actual:   usize,
    },

    #[error("Symbol with value {value} does not fit in a {size} byte memory container")]
    SymbolTooWide { value: U256, size: usize },

    #[error("Cannot read {size} bytes from memory as a single word")]
    InvalidReadSize { size: usize },
}

impl Error {
    /// Gets the category of the error, allowing consumers to tell internal
    /// faults apart from failures of external collaborators and from
    /// deliberately unsupported behaviour.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::StackLengthMismatch { .. } | Self::ConsistencyViolation { .. } => {
                Category::Consistency
            }
            Self::UnsupportedOpcode { .. } => Category::Unsupported,
            Self::ExternalDependency { .. } => Category::ExternalDependency,
            _ => Category::Internal,
        }
    }
}

/// The broad classification of execution errors.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Category {
    /// The concrete and symbolic executions disagree.
    Consistency,

    /// The transaction uses functionality that cannot be synthesized.
    Unsupported,

    /// A query to the external state provider failed.
    ExternalDependency,

    /// Any other failure, including invalid programs and bookkeeping faults.
    Internal,
}

impl From<ProviderError> for Error {
    fn from(value: ProviderError) -> Self {
        Self::ExternalDependency {
            message: value.to_string(),
        }
    }
}

/// An execution error with an associated location in the bytecode.
pub type LocatedError = container::Located<Error>;

/// A container of execution errors.
pub type Errors = container::Errors<LocatedError>;

/// The result type for methods that may have execution errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, instruction_pointer: u32) -> Self::Located {
        container::Located {
            location: instruction_pointer,
            payload:  self,
        }
    }
}
