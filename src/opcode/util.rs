//! This file contains utilities for implementing the concrete and symbolic
//! executable semantics of the opcodes.

use ethnum::U256;

use crate::{
    arith::ArithOp,
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    opcode::{control::JumpDest, ExecuteResult},
    synthesis::{
        loader,
        memory_manager::windows,
        operation::{place_arith, place_exp},
        symbol::LoadKind,
    },
    transaction::Address,
    utility::{to_usize, word_from_be_slice},
    vm::{Step, VM},
};

/// Executes the concrete semantics of the arithmetic operation `op`, popping
/// its operands and pushing its result.
///
/// # Errors
///
/// If the stack does not hold enough operands.
pub fn execute_arith(vm: &mut VM, op: ArithOp) -> ExecuteResult {
    let instruction_pointer = vm.instruction_pointer();
    let mut stack = vm.stack_handle();
    let operands = stack.pop_many(op.arity())?;
    let result = op
        .evaluate(&operands)
        .ok_or_else(|| Error::InvalidOperandCount {
            name:     op.name().into(),
            expected: op.arity(),
            actual:   operands.len(),
        })
        .locate(instruction_pointer)?;
    stack.push(result)
}

/// Executes the symbolic semantics of the arithmetic operation `op`, popping
/// the operand symbols and pushing the symbol of the placement that computes
/// the result.
///
/// # Errors
///
/// If the symbolic stack does not hold enough operands or the placement cannot
/// be recorded.
pub fn synthesize_arith(vm: &mut VM, op: ArithOp, step: &Step) -> ExecuteResult {
    let instruction_pointer = step.instruction_pointer;
    let operands = vm.symbolic_stack_handle().pop_many(op.arity())?;
    let iterations = vm.config().exp_iterations;
    let result = if op == ArithOp::Exp {
        place_exp(
            vm.registry_mut(),
            &operands[0],
            &operands[1],
            iterations,
            instruction_pointer,
        )?
    } else {
        place_arith(vm.registry_mut(), op, &operands, instruction_pointer)?
    };
    vm.symbolic_stack_handle().push(result)
}

/// Executes the symbolic semantics of an opcode that reads an external value,
/// discarding its operand symbols and pushing a symbol loaded through the data
/// loader.
///
/// The loaded value is the concrete result of the opcode.
///
/// # Errors
///
/// If the symbolic stack does not hold the operands or the load fails.
pub fn synthesize_load(
    vm: &mut VM,
    step: &Step,
    kind: LoadKind,
    address: Address,
    key: U256,
) -> ExecuteResult {
    let instruction_pointer = step.instruction_pointer;
    vm.symbolic_stack_handle().pop_many(step.inputs.len())?;
    let value = output(step)?;
    let symbol = loader::load(
        vm.registry_mut(),
        kind,
        address,
        key,
        value,
        instruction_pointer,
    )?;
    vm.symbolic_stack_handle().push(symbol)
}

/// Executes the symbolic semantics of an opcode that copies external bytes
/// into memory, given the `destination` region in memory and the offset of the
/// `source` in the external data.
///
/// Each word-sized window of the copied region is loaded through the data
/// loader as a symbol of `kind(window_size)`, taking the bytes now in concrete
/// memory as the value, and is then written to symbolic memory. A window whose
/// source offset overflows a word is loaded without caching.
///
/// # Errors
///
/// If the load fails or the region is out of bounds.
pub fn synthesize_copy(
    vm: &mut VM,
    step: &Step,
    kind: impl Fn(usize) -> LoadKind,
    address: Address,
    destination: U256,
    source: U256,
    size: U256,
) -> ExecuteResult {
    let instruction_pointer = step.instruction_pointer;
    vm.symbolic_stack_handle().pop_many(step.inputs.len())?;
    let size = to_offset(size, instruction_pointer)?;
    if size == 0 {
        return Ok(());
    }
    let destination = to_offset(destination, instruction_pointer)?;

    for (start, len) in windows(destination, size) {
        let value = word_from_be_slice(&vm.state().memory().peek(start, len));
        // Windows past the end of the address space read as zero and have no
        // offset of their own to be cached under.
        let symbol = match source.checked_add(U256::from((start - destination) as u64)) {
            Some(key) => loader::load(
                vm.registry_mut(),
                kind(len),
                address,
                key,
                value,
                instruction_pointer,
            )?,
            None => loader::load_uncached(
                vm.registry_mut(),
                kind(len),
                address,
                U256::MAX,
                value,
                instruction_pointer,
            )?,
        };
        vm.symbolic_mut()
            .memory_mut()
            .write(start, len, symbol)
            .locate(instruction_pointer)?;
    }

    Ok(())
}

/// Fails execution of the opcode called `name`, which cannot be synthesized.
///
/// # Errors
///
/// Always.
pub fn unsupported(vm: &VM, name: &str) -> ExecuteResult {
    Err(Error::UnsupportedOpcode { name: name.into() }.locate(vm.instruction_pointer()))
}

/// Gets the concrete operand at `index` of the step, where zero is the top of
/// the stack.
///
/// # Errors
///
/// If the step does not have such an operand.
pub fn input(step: &Step, index: usize) -> Result<U256> {
    step.inputs
        .get(index)
        .copied()
        .ok_or(Error::NoSuchStackFrame {
            depth: i64::try_from(index).unwrap_or(i64::MAX),
        })
        .locate(step.instruction_pointer)
}

/// Gets the value the step left on the top of the stack.
///
/// # Errors
///
/// If the step produced no value.
pub fn output(step: &Step) -> Result<U256> {
    step.outputs
        .first()
        .copied()
        .ok_or(Error::NoSuchStackFrame { depth: 0 })
        .locate(step.instruction_pointer)
}

/// Converts a memory offset or size that the concrete execution has already
/// accepted into a `usize`.
///
/// # Errors
///
/// If `value` cannot be represented as a `usize`.
pub fn to_offset(value: U256, instruction_pointer: u32) -> Result<usize> {
    to_usize(value)
        .ok_or(Error::MemoryLimitExceeded {
            requested: value,
            limit:     usize::MAX,
        })
        .locate(instruction_pointer)
}

/// Validates that the provided `target` is a valid jump destination in the
/// provided `vm`, returning it as an instruction pointer.
///
/// # Errors
///
/// This returns [`Err`] in the following situations:
///
/// - When the jump target destination is not in bounds in the instruction
///   stream.
/// - When the jump target is not a valid [`JumpDest`] instruction. Bytes that
///   are the immediate of a `PUSH` never are.
pub fn validate_jump_destination(vm: &VM, target: U256) -> Result<u32> {
    let instruction_pointer = vm.instruction_pointer();
    let offset = to_usize(target)
        .and_then(|t| u32::try_from(t).ok())
        .unwrap_or(u32::MAX);
    let target_instruction = vm
        .instructions()
        .instruction(offset)
        .ok_or(Error::NonExistentJumpTarget { offset })
        .locate(instruction_pointer)?;

    if !target_instruction.is::<JumpDest>() {
        return Err(Error::InvalidJumpTarget { offset }.locate(instruction_pointer));
    }

    Ok(offset)
}
