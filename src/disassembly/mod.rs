//! This module contains the implementation of the [`InstructionStream`], a type
//! that represents a sequence of bytecode instructions and provides utilities
//! for implementing it.

mod disassembler;

use std::rc::Rc;

use hex::FromHexError;

use crate::{
    error::{container::Locatable, disassembly, disassembly::Error, execution},
    opcode::DynOpcode,
};

/// The maximum size of an instruction stream, in bytes.
pub const INSTRUCTION_STREAM_MAX_SIZE: u32 = u32::MAX;

/// The instruction stream is a representation of a sequence of [`Opcode`](crate::opcode::Opcode)s that
/// implements some program.
///
/// # Non-Emptiness
///
/// The instruction stream is required to contain _at least one_ instruction.
/// This is validated at construction time.
///
/// # Stream Validity
///
/// This `InstructionStream` is a pure representation of the sequence of
/// instructions and performs no validation that the instruction stream is a
/// valid one. Such validation is up to the [`crate::vm::VM`] that utilises the
/// instruction stream.
///
/// To that end, it is _perfectly_ possible, and allowable, to construct an
/// instruction stream containing invalid instructions.
///
/// # Byte-Instruction Correspondence
///
/// Where most [`Opcode`](crate::opcode::Opcode)s occupy a single byte, the
/// [`crate::opcode::memory::PushN`] opcode is followed in the instruction
/// stream by the data (of size `N` bytes) that needs to be pushed onto the
/// stack.
///
/// To that end, construction of the `InstructionStream` must maintain that
/// correspondence by inserting `N` [`crate::opcode::control::Nop`] opcodes
/// after each instance of `PushN`. They are ignored during execution.
///
/// # Size Limits
///
/// The instruction stream cannot contain more than
/// [`INSTRUCTION_STREAM_MAX_SIZE`] [`crate::opcode::Opcode`]s. This is fine, as
/// the maximum size of a deployed contract's bytecode is 24576 bytes (see
/// [`crate::constant::CONTRACT_MAXIMUM_SIZE_BYTES`]). Even accounting for the
/// analysis of non-deployable contracts, 2^32 bytes should be more than enough
/// to contain the instruction stream of any contract.
///
/// This limit is validated upon construction of the instruction stream, but the
/// stream makes _no guarantees_ as to being able to allocate sufficient memory
/// to contain that many opcodes.
#[derive(Clone, Debug)]
pub struct InstructionStream {
    /// The sequence of [`Opcode`](crate::opcode::Opcode)s.
    instructions: Rc<Vec<DynOpcode>>,
}

impl InstructionStream {
    /// Gets a new thread of execution as a view on the instruction stream.
    ///
    /// Each view has its independent `instruction_pointer` and can represent a
    /// different thread of execution over the bytecode.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the requested `instruction_pointer` is out of range for
    /// the instruction stream.
    pub fn new_thread(&self, instruction_pointer: u32) -> execution::Result<ExecutionThread> {
        if instruction_pointer as usize >= self.instructions.len() {
            return Err(execution::Error::InstructionPointerOutOfBounds {
                requested: instruction_pointer as usize,
                available: self.instructions.len(),
            }
            .locate(instruction_pointer));
        }
        let instructions = self.instructions.clone();
        Ok(ExecutionThread {
            instruction_pointer,
            instructions,
        })
    }

    /// Gets the length of the instruction stream in bytes.
    #[allow(clippy::len_without_is_empty)] // The structure cannot be empty.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Gets the instruction at the specified `instruction_pointer` location, if
    /// it exists.
    #[must_use]
    pub fn instruction(&self, instruction_pointer: u32) -> Option<DynOpcode> {
        self.instructions.get(instruction_pointer as usize).cloned()
    }

    /// Converts the instructions in the instruction stream to their
    /// corresponding bytecode.
    ///
    /// This should always result in the same bytecode as the input to the
    /// disassembly process.
    #[must_use]
    pub fn as_bytecode(&self) -> Vec<u8> {
        self.instructions.iter().flat_map(|opcode| opcode.encode()).collect()
    }
}

/// An [`InstructionStream`] is usually created from a byte array of bytecode.
impl<'a> TryFrom<&'a [u8]> for InstructionStream {
    type Error = disassembly::LocatedError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        let instructions = Rc::new(disassembler::disassemble(value)?);
        let result = Self { instructions };

        // Disabled in production builds, but a good sanity check that disassembly
        // didn't go wrong
        debug_assert_eq!(result.as_bytecode().as_slice(), value);
        Ok(result)
    }
}

/// An [`InstructionStream`] can be created from a string as long as that string
/// is a hexadecimal encoding of the equivalent bytes.
impl TryFrom<&str> for InstructionStream {
    type Error = disassembly::LocatedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = match hex::decode(value) {
            Ok(b) => b,
            Err(e) => {
                let locate =
                    |val| u32::try_from(val).map_err(|_| Error::BytecodeTooLarge.locate(u32::MAX));

                let error = if let FromHexError::InvalidHexCharacter { c, index } = e {
                    let location = locate(index);
                    Error::InvalidHexCharacter(c, index).locate(location?)
                } else {
                    let location = locate(value.len());
                    Error::InvalidHexLength.locate(location?)
                };

                return Err(error);
            }
        };
        InstructionStream::try_from(bytes.as_slice())
    }
}

/// Allows converting the [`InstructionStream`] back to the corresponding
/// bytecode representation.
///
/// This should always result in the same bytecode as the input to the
/// disassembly process.
impl From<InstructionStream> for Vec<u8> {
    fn from(value: InstructionStream) -> Self {
        value.instructions.iter().flat_map(|opcode| opcode.encode()).collect()
    }
}

/// A view into the [`InstructionStream`] that allows tracking and manipulation
/// of the instruction pointer. It represents a given stream of execution.
///
/// # Invariants
///
/// The current execution position, as represented by the `instruction_pointer`
/// is guaranteed to always point to an instruction in the stream.
#[derive(Clone, Debug)]
pub struct ExecutionThread {
    /// The current position of execution, represented as a reference to a slot
    /// in the sequence of instructions.
    instruction_pointer: u32,

    /// The sequence of [`Opcode`](crate::opcode::Opcode)s.
    instructions: Rc<Vec<DynOpcode>>,
}

impl ExecutionThread {
    /// Gets the current value of the instruction pointer for this thread of
    /// execution.
    #[must_use]
    pub fn instruction_pointer(&self) -> u32 {
        self.instruction_pointer
    }

    /// Gets the opcode at the current execution position.
    #[must_use]
    pub fn current(&self) -> DynOpcode {
        self.instructions[self.instruction_pointer as usize].clone()
    }

    /// Jumps by `jump` bytes in the instruction stream.
    ///
    /// If the jump target is not an instruction within the bounds of the
    /// instruction stream, returns [`None`] and leaves the instruction pointer
    /// unchanged.
    pub fn jump_by(&mut self, jump: i64) -> Option<DynOpcode> {
        let new_pointer: u32 = if i64::from(self.instruction_pointer) + jump < 0 {
            return None;
        } else if let Ok(ptr) = u32::try_from(i64::from(self.instruction_pointer) + jump) {
            ptr
        } else {
            return None;
        };

        if let Some(opcode) = self.instructions.get(new_pointer as usize) {
            self.instruction_pointer = new_pointer;
            Some(opcode.clone())
        } else {
            None
        }
    }

    /// Jumps to the opcode at an offset of `target` bytes in the instruction
    /// stream.
    ///
    /// Returns [`None`] if the `target` is not within the bounds of the
    /// instruction stream, and leaves the pointer unchanged.
    pub fn jump(&mut self, target: u32) -> Option<DynOpcode> {
        if (target as usize) < self.len() {
            self.instruction_pointer = target;
            Some(self.current())
        } else {
            None
        }
    }

    /// Gets the length of the instruction stream in bytes.
    #[allow(clippy::len_without_is_empty)] // The structure cannot be empty.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}

#[cfg(test)]
impl ExecutionThread {
    /// Gets the instruction at the specified `instruction_pointer` location, if
    /// it exists. Test-only accessor used by the unit tests below.
    #[must_use]
    pub fn instruction(&self, instruction_pointer: u32) -> Option<DynOpcode> {
        self.instructions.get(instruction_pointer as usize).cloned()
    }
}
