//! This module contains the primary error type for the synthesizer's
//! interface. It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod container;
pub mod disassembly;
pub mod execution;
pub mod finalize;

use thiserror::Error;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
pub type Result<T> = std::result::Result<T, Errors>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by the
/// clients of the library) should be members of this enum.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// Errors that come from the disassembly process.
    #[error(transparent)]
    Disassembly(#[from] disassembly::Error),

    /// Errors from the dual execution of the bytecode.
    #[error(transparent)]
    Execution(#[from] execution::Error),

    /// Errors from finalizing the recorded placements.
    #[error(transparent)]
    Finalize(#[from] finalize::Error),

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Gets the execution error wrapped by this error, if it is one.
    #[must_use]
    pub fn as_execution(&self) -> Option<&execution::Error> {
        match self {
            Self::Execution(e) => Some(e),
            _ => None,
        }
    }

    /// Gets the finalization error wrapped by this error, if it is one.
    #[must_use]
    pub fn as_finalize(&self) -> Option<&finalize::Error> {
        match self {
            Self::Finalize(e) => Some(e),
            _ => None,
        }
    }
}

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

/// A library error with an associated bytecode location.
pub type LocatedError = container::Located<Error>;

/// A container of errors that may occur in the synthesizer.
pub type Errors = container::Errors<LocatedError>;

/// Allow simple conversions from located disassembly errors by re-wrapping the
/// located error around the more general payload.
impl From<disassembly::LocatedError> for LocatedError {
    fn from(value: disassembly::LocatedError) -> Self {
        value.map(Error::from)
    }
}

/// Allow simple conversions from located disassembly errors into the Errors
/// container.
impl From<disassembly::LocatedError> for Errors {
    fn from(value: disassembly::LocatedError) -> Self {
        let re_wrapped: LocatedError = value.into();
        re_wrapped.into()
    }
}

/// Allow simple conversions from located execution errors by re-wrapping the
/// located error around the more general payload.
impl From<execution::LocatedError> for LocatedError {
    fn from(value: execution::LocatedError) -> Self {
        value.map(Error::from)
    }
}

/// Allow simple conversions from located execution errors into the Errors
/// container.
impl From<execution::LocatedError> for Errors {
    fn from(value: execution::LocatedError) -> Self {
        let re_wrapped: LocatedError = value.into();
        re_wrapped.into()
    }
}

/// Allow simple conversions from located finalization errors by re-wrapping
/// the located error around the more general payload.
impl From<finalize::LocatedError> for LocatedError {
    fn from(value: finalize::LocatedError) -> Self {
        value.map(Error::from)
    }
}

/// Allow simple conversions from located finalization errors into the Errors
/// container.
impl From<finalize::LocatedError> for Errors {
    fn from(value: finalize::LocatedError) -> Self {
        let re_wrapped: LocatedError = value.into();
        re_wrapped.into()
    }
}
