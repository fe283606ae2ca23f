//! This module contains the generic error containers used throughout the
//! library, allowing errors to carry the bytecode offset at which they arose.

use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular byte-offset location in the
/// bytecode being synthesized.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The byte offset in the bytecode where the error occurred.
    pub location: u32,

    /// The error data
    pub payload: E,
}

impl<E> Located<E>
where
    E: Clone,
{
    /// Converts the payload of the located error using `f`, keeping the
    /// location intact.
    pub fn map<F: Clone>(self, f: impl FnOnce(E) -> F) -> Located<F> {
        Located {
            location: self.location,
            payload:  f(self.payload),
        }
    }
}

/// Displays the error prefixed by the hexadecimal byte offset at which it
/// occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:#06x}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have a byte-offset location attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached byte-offset location.
    type Located;

    /// Attach the location described by `instruction_pointer` (a byte offset in
    /// the bytecode) to the error.
    fn locate(self, instruction_pointer: u32) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, instruction_pointer: u32) -> Self::Located {
        self.map_err(|e| Located {
            location: instruction_pointer,
            payload:  e,
        })
    }
}

/// An error that is a collection of errors.
///
/// Synthesis is fatal on the first error, so in practice the container holds a
/// single entry, but the pipeline stages share the type so that callers only
/// ever handle one error shape.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Errors<E> {
    payloads: Vec<E>,
}

impl<E> Errors<E> {
    /// Creates a new container for errors.
    #[must_use]
    pub fn new() -> Self {
        let payloads = vec![];
        Self { payloads }
    }

    /// Gets the errors contained within this error.
    #[must_use]
    pub fn payloads(&self) -> &[E] {
        self.payloads.as_slice()
    }

    /// Gets the first error in the container, if any.
    #[must_use]
    pub fn first(&self) -> Option<&E> {
        self.payloads.first()
    }

    /// Gets the length of the errors container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Checks if the errors container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Errors<E>
where
    E: std::error::Error,
{
    /// Adds the provided `error` to the container.
    pub fn add(&mut self, error: E) {
        self.payloads.push(error);
    }
}

/// The default errors container is one containing no errors.
impl<E> Default for Errors<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allow conversion from any error type to a container of errors.
impl<E> From<E> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: E) -> Self {
        let mut errors = Self::default();
        errors.add(value);
        errors
    }
}

/// Allow conversion from the errors container to a vector of errors.
impl<E> From<Errors<E>> for Vec<E>
where
    E: std::error::Error,
{
    fn from(value: Errors<E>) -> Self {
        value.payloads
    }
}

/// Displays the errors in the sequence in which they occur in the container.
///
/// It has a header specifying how many errors occurred, and then prints one
/// error per line after that.
impl<E> std::fmt::Display for Errors<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.payloads.is_empty() {
            write!(f, "Encountered no errors")?;
        } else {
            writeln!(f, "Encountered {} errors:", self.payloads.len())?;
            for error in &self.payloads {
                writeln!(f, "{error}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::error::{
        container::{Errors, Locatable},
        execution,
    };

    #[test]
    fn locates_errors_at_the_instruction_pointer() {
        let result: Result<(), execution::Error> = Err(execution::Error::InvalidStep);
        let located = result.locate(0x2a).unwrap_err();

        assert_eq!(located.location, 0x2a);
        assert_eq!(located.payload, execution::Error::InvalidStep);
        assert!(located.to_string().starts_with("[0x002a]"));
    }

    #[test]
    fn container_reports_its_contents() {
        let error = execution::Error::GasLimitExceeded.locate(3);
        let errors: Errors<execution::LocatedError> = error.clone().into();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first(), Some(&error));
        assert!(errors.to_string().contains("Gas limit exceeded"));
    }
}
