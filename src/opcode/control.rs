//! Opcodes that perform control(-flow) operations on the EVM.

use ethnum::U256;

use crate::{
    error::{container::Locatable, execution::Error},
    opcode::{util, ExecuteResult, Opcode},
    synthesis::{loader, memory_manager, symbol::LoadKind},
    vm::{Halt, Step, VM},
};

/// The `STOP` opcode halts execution on the EVM, exiting the current call
/// context.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stop;

impl Opcode for Stop {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        vm.halt_with(Halt::Stop);
        Ok(())
    }

    fn synthesize(&self, _vm: &mut VM, _step: &Step) -> ExecuteResult {
        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        0
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "STOP".into()
    }

    fn as_byte(&self) -> u8 {
        0x00
    }
}

/// The `JUMP` opcode unconditionally moves execution to a `JUMPDEST`.
///
/// # Semantics
///
/// | Stack Index | Input     | Output |
/// | :---------: | :-------: | :----: |
/// | 1           | `counter` |        |
///
/// where:
///
/// - `counter` is the byte offset in the code at which execution continues
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if `counter` is not
/// the offset of a [`JumpDest`].
///
/// # Synthesis
///
/// Control flow is resolved concretely, so the target symbol is discarded
/// without constraining it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Jump;

impl Opcode for Jump {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let target = vm.stack_handle().pop()?;
        let target = util::validate_jump_destination(vm, target)?;
        vm.jump_to(target);
        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, _step: &Step) -> ExecuteResult {
        vm.symbolic_stack_handle().pop()?;
        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        8
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "JUMP".into()
    }

    fn as_byte(&self) -> u8 {
        0x56
    }
}

/// The `JUMPI` opcode moves execution to a `JUMPDEST` if a condition holds.
///
/// # Semantics
///
/// | Stack Index | Input     | Output |
/// | :---------: | :-------: | :----: |
/// | 1           | `counter` |        |
/// | 2           | `b`       |        |
///
/// where:
///
/// - `counter` is the byte offset in the code at which execution continues if
///   `b` is non-zero
/// - `b` is the condition
///
/// # Errors
///
/// Fails if there are not enough operands on the stack, or if the jump is
/// taken and `counter` is not the offset of a [`JumpDest`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct JumpI;

impl Opcode for JumpI {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let mut stack = vm.stack_handle();
        let target = stack.pop()?;
        let condition = stack.pop()?;

        if condition != U256::ZERO {
            let target = util::validate_jump_destination(vm, target)?;
            vm.jump_to(target);
        }

        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, _step: &Step) -> ExecuteResult {
        vm.symbolic_stack_handle().pop_many(2)?;
        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        10
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "JUMPI".into()
    }

    fn as_byte(&self) -> u8 {
        0x57
    }
}

/// The `PC` opcode gets the value of the program counter before it is
/// incremented past this instruction.
///
/// # Semantics
///
/// | Stack Index | Input | Output    |
/// | :---------: | :---: | :-------: |
/// | 1           |       | `counter` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PC;

impl Opcode for PC {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let counter = U256::from(vm.instruction_pointer());
        vm.stack_handle().push(counter)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let key = U256::from(step.instruction_pointer);
        util::synthesize_load(vm, step, LoadKind::ProgramCounter, address, key)
    }

    fn min_gas_cost(&self) -> usize {
        2
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "PC".into()
    }

    fn as_byte(&self) -> u8 {
        0x58
    }
}

/// The `JUMPDEST` opcode marks a valid destination for jumps, and has no
/// effect when executed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct JumpDest;

impl Opcode for JumpDest {
    fn execute(&self, _vm: &mut VM) -> ExecuteResult {
        Ok(())
    }

    fn synthesize(&self, _vm: &mut VM, _step: &Step) -> ExecuteResult {
        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        1
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "JUMPDEST".into()
    }

    fn as_byte(&self) -> u8 {
        0x5b
    }
}

/// The `RETURN` opcode halts execution, returning a region of memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `size`   |        |
///
/// where:
///
/// - `offset` is the byte offset in memory of the data to return
/// - `size` is the size in bytes of the data to return
///
/// # Errors
///
/// Fails if there are not enough operands on the stack or if memory would grow
/// past its limit.
///
/// # Synthesis
///
/// Each word-sized window of the returned region is resolved from symbolic
/// memory and exported as a public output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Return;

impl Opcode for Return {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let mut stack = vm.stack_handle();
        let offset = stack.pop()?;
        let size = stack.pop()?;

        let data = vm
            .state_mut()
            .memory_mut()
            .read(offset, size)
            .locate(instruction_pointer)?;
        vm.halt_with(Halt::Return { data });

        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        vm.symbolic_stack_handle().pop_many(2)?;
        let size = util::to_offset(util::input(step, 1)?, instruction_pointer)?;
        if size == 0 {
            return Ok(());
        }
        let offset = util::to_offset(util::input(step, 0)?, instruction_pointer)?;

        let address = vm.address();
        let (registry, symbolic) = vm.synthesis_parts_mut();
        let chunks = memory_manager::load_memory_chunks(
            registry,
            symbolic.memory(),
            offset,
            size,
            instruction_pointer,
        )?;
        loader::store_return(registry, address, &chunks, instruction_pointer)
    }

    fn min_gas_cost(&self) -> usize {
        0
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "RETURN".into()
    }

    fn as_byte(&self) -> u8 {
        0xf3
    }
}

/// The `INVALID` opcode, and any byte that does not decode to a known opcode.
///
/// # Errors
///
/// Always fails when executed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Invalid {
    byte: u8,
}

impl Invalid {
    /// Constructs an invalid instruction that was decoded from `byte`.
    #[must_use]
    pub fn new(byte: u8) -> Self {
        Self { byte }
    }
}

impl Default for Invalid {
    fn default() -> Self {
        Self::new(0xfe)
    }
}

impl Opcode for Invalid {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        Err(Error::InvalidInstruction { byte: self.byte }.locate(vm.instruction_pointer()))
    }

    fn synthesize(&self, vm: &mut VM, _step: &Step) -> ExecuteResult {
        Err(Error::InvalidInstruction { byte: self.byte }.locate(vm.instruction_pointer()))
    }

    fn min_gas_cost(&self) -> usize {
        0
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        format!("INVALID({:#04x})", self.byte)
    }

    fn as_byte(&self) -> u8 {
        self.byte
    }
}

/// A placeholder occupying the bytes of a `PUSH` immediate, so that the index
/// of each instruction equals its byte offset.
///
/// It encodes to no bytes and is never executed, as execution steps over the
/// whole of a `PUSH` instruction at once.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Nop;

impl Opcode for Nop {
    fn execute(&self, _vm: &mut VM) -> ExecuteResult {
        Ok(())
    }

    fn synthesize(&self, _vm: &mut VM, _step: &Step) -> ExecuteResult {
        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        0
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "NOP".into()
    }

    fn as_byte(&self) -> u8 {
        0x00
    }

    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }
}

crate::opcode::macros::unsupported_opcodes! {
    /// The `CALL` opcode creates a new sub-context and executes the code of
    /// the given account.
    Call => ("CALL", 0xf1, 100, 7, 1),

    /// The `CALLCODE` opcode executes the code of another account in the
    /// current context.
    CallCode => ("CALLCODE", 0xf2, 100, 7, 1),

    /// The `DELEGATECALL` opcode executes the code of another account in the
    /// current context, keeping the current sender and value.
    DelegateCall => ("DELEGATECALL", 0xf4, 100, 6, 1),

    /// The `STATICCALL` opcode calls another account without allowing it to
    /// modify state.
    StaticCall => ("STATICCALL", 0xfa, 100, 6, 1),

    /// The `REVERT` opcode halts execution, reverting all state changes.
    Revert => ("REVERT", 0xfd, 0, 2, 0),
}
