//! The concrete state representation for the virtual machine, and utilities
//! for dealing with said representation.

pub mod memory;
pub mod stack;
pub mod storage;

use ethnum::U256;

use crate::{
    provider::DynProvider,
    transaction::Address,
    vm::state::{memory::Memory, stack::Stack, storage::Storage},
};

/// A log emitted by one of the `LOG` opcodes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Log {
    pub topics: Vec<U256>,
    pub data:   Vec<u8>,
}

/// The concrete state of the [`super::VM`], holding the ground-truth values
/// that the symbols are checked against.
#[derive(Clone, Debug)]
pub struct VMState {
    stack:    Stack<U256>,
    memory:   Memory,
    storage:  Storage,
    logs:     Vec<Log>,
    gas_used: usize,
}

impl VMState {
    /// Creates the state at the start of executing the code of `address`.
    #[must_use]
    pub fn new(address: Address, provider: DynProvider, memory_size_limit: usize) -> Self {
        let stack = Stack::new();
        let memory = Memory::new(memory_size_limit);
        let storage = Storage::new(address, provider);
        let logs = Vec::new();
        Self {
            stack,
            memory,
            storage,
            logs,
            gas_used: 0,
        }
    }

    /// Gets the stack.
    #[must_use]
    pub fn stack(&self) -> &Stack<U256> {
        &self.stack
    }

    /// Gets the stack.
    pub fn stack_mut(&mut self) -> &mut Stack<U256> {
        &mut self.stack
    }

    /// Gets the memory.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Gets the memory.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Gets the storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Gets the storage.
    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Gets the logs emitted so far, in order.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Records an emitted log.
    pub fn push_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    /// Gets the gas consumed so far.
    #[must_use]
    pub fn gas_used(&self) -> usize {
        self.gas_used
    }

    /// Consumes `amount` gas.
    pub fn consume_gas(&mut self, amount: usize) {
        self.gas_used += amount;
    }
}
