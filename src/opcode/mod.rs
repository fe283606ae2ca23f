//! This module contains the [`Opcode`] trait, and the implementation of each
//! of the EVM's [opcodes](https://ethereum.org/en/developers/docs/evm/opcodes/)
//! that the synthesizer supports.
//!
//! Every opcode carries two semantics. The concrete semantics in
//! [`Opcode::execute`] compute the ground-truth values, exactly as an EVM
//! would. The symbolic semantics in [`Opcode::synthesize`] then mirror the same
//! stack effect on the symbolic stack, recording the placements that produce
//! each new symbol.

pub mod arithmetic;
pub mod control;
pub mod environment;
pub mod logic;
pub mod macros;
pub mod memory;
#[cfg(test)]
pub(crate) mod test_util;
pub mod util;

use std::{fmt::Debug, rc::Rc};

use downcast_rs::{impl_downcast, Downcast};

use crate::{
    error::execution,
    vm::{Step, VM},
};

/// This trait forms the core of the `Opcode` representation. It provides the
/// basic set of operations that are required of all opcodes, and is implemented
/// by each of the concrete opcodes.
///
/// # Object Safety
///
/// This trait must remain
/// [object safe](https://doc.rust-lang.org/reference/items/traits.html#object-safety)
/// as the implementors of the trait will be used in dynamic dispatch.
///
/// # Self Bounds
///
/// The bounds on `Self` are required by these traits for the following reasons:
///
/// - [`Downcast`] allows downcasting to concrete implementations of `Opcode`
///   if needed.
/// - [`Debug`] to provide representations to aid in debugging. It is
///   recommended to use the derive feature for this.
///
/// # Terminology
///
/// When referring to stack slots in documentation, we treat index 1 as being
/// the top of the stack.
pub trait Opcode
where
    Self: Debug + Downcast,
{
    /// Executes the concrete semantics of the opcode, modifying the concrete
    /// state of the [`VM`] appropriately.
    ///
    /// # Errors
    ///
    /// If the state of the virtual machine does not allow execution of the
    /// opcode, or if execution would yield an invalid state in the virtual
    /// machine.
    fn execute(&self, vm: &mut VM) -> ExecuteResult;

    /// Executes the symbolic semantics of the opcode, modifying the symbolic
    /// state of the [`VM`] and recording any placements.
    ///
    /// It runs after [`Self::execute`], and `step` describes the concrete
    /// operands the opcode consumed and the values it produced.
    ///
    /// # Errors
    ///
    /// If the symbolic state does not allow execution of the opcode, or if a
    /// placement cannot be recorded.
    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult;

    /// Gets the static cost of the opcode in gas.
    fn min_gas_cost(&self) -> usize;

    /// Gets the number of arguments that the opcode reads from the stack.
    fn arg_count(&self) -> usize;

    /// Gets the number of items at the top of the stack that hold the
    /// opcode's results once it has executed.
    fn ret_count(&self) -> usize;

    /// Gets a textual representation of the opcode to aid in debugging.
    fn as_text_code(&self) -> String;

    /// Gets the byte representation of the opcode.
    fn as_byte(&self) -> u8;

    /// Gets the bytes that encode the opcode in the bytecode.
    ///
    /// For most opcodes this is the single byte given by [`Self::as_byte`], but
    /// opcodes that carry immediates encode those as well.
    fn encode(&self) -> Vec<u8> {
        vec![self.as_byte()]
    }
}

impl_downcast!(Opcode);

/// A type for an [`Opcode`] that is dynamically dispatched.
pub type DynOpcode = Rc<dyn Opcode>;

/// The result of executing either half of an opcode.
pub type ExecuteResult = execution::Result<()>;
