//! This module contains the symbolic half of the dual execution.
//!
//! Every value the virtual machine handles has a counterpart [`symbol::DataPt`]
//! that records which placement produced it. Operations are recorded as
//! placements in the [`registry::StateRegistry`], external values enter and
//! leave through the four buffer placements, and memory keeps its full write
//! history so that misaligned reads can be rebuilt from earlier writes.

pub mod buffer;
pub mod loader;
pub mod memory;
pub mod memory_manager;
pub mod operation;
pub mod placement;
pub mod registry;
pub mod subcircuit;
pub mod symbol;

use crate::{
    synthesis::{memory::SymbolicMemory, symbol::DataPt},
    vm::state::stack::Stack,
};

/// The symbolic counterpart of the concrete stack and memory.
///
/// The symbolic stack always has the same shape as the concrete stack, with
/// each symbol carrying the value of the concrete item at the same depth.
#[derive(Clone, Debug, Default)]
pub struct SymbolicState {
    stack:  Stack<DataPt>,
    memory: SymbolicMemory,
}

impl SymbolicState {
    /// Creates a state with an empty stack and unwritten memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the symbolic stack.
    #[must_use]
    pub fn stack(&self) -> &Stack<DataPt> {
        &self.stack
    }

    /// Gets the symbolic stack.
    pub fn stack_mut(&mut self) -> &mut Stack<DataPt> {
        &mut self.stack
    }

    /// Gets the symbolic memory.
    #[must_use]
    pub fn memory(&self) -> &SymbolicMemory {
        &self.memory
    }

    /// Gets the symbolic memory.
    pub fn memory_mut(&mut self) -> &mut SymbolicMemory {
        &mut self.memory
    }
}
