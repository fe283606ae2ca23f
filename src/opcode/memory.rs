//! Opcodes that perform operations on memory or stack on the EVM.

use ethnum::U256;

use crate::{
    arith::ArithOp,
    constant::{
        DUP_OPCODE_BASE_VALUE,
        PUSH_OPCODE_BASE_VALUE,
        PUSH_OPCODE_MAX_BYTES,
        SWAP_OPCODE_BASE_VALUE,
        WORD_SIZE_BYTES,
    },
    error::{container::Locatable, disassembly, execution::Error},
    opcode::{util, ExecuteResult, Opcode},
    synthesis::{
        loader,
        memory_manager,
        operation::place_arith,
        symbol::{DataPt, EnvironmentField, LoadKind},
    },
    transaction,
    utility::word_from_be_slice,
    vm::{state::memory::padded_slice, Step, VM},
};

/// The `CALLDATALOAD` opcode gets the input data for the current environment.
///
/// # Semantics
///
/// | Stack Index | Input    | Output                                   |
/// | :---------: | :------: | :--------------------------------------: |
/// | 1           | `offset` | `result := msg.data\[offset:offset+32\]` |
///
/// where:
///
/// - `offset` is the byte offset in the call data from which to start loading
/// - `result` is the result of the specified load, with any bytes after the end
///   of the calldata set to zero
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CallDataLoad;

impl Opcode for CallDataLoad {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let offset = vm.stack_handle().pop()?;
        let bytes = padded_slice(&vm.context().transaction.calldata, offset, WORD_SIZE_BYTES);
        vm.stack_handle().push(word_from_be_slice(&bytes))
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let offset = util::input(step, 0)?;
        let kind = LoadKind::CallData {
            size: WORD_SIZE_BYTES,
        };
        util::synthesize_load(vm, step, kind, address, offset)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "CALLDATALOAD".into()
    }

    fn as_byte(&self) -> u8 {
        0x35
    }
}

/// The `CALLDATASIZE` opcode gets the size of the call data in the current
/// environment.
///
/// # Semantics
///
/// | Stack Index | Input | Output                   |
/// | :---------: | :---: | :----------------------: |
/// | 1           |       | `size := msg.data.size`  |
///
/// # Errors
///
/// Execution is reverted if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CallDataSize;

impl Opcode for CallDataSize {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let size = vm.context().transaction.calldata.len();
        vm.stack_handle().push(U256::from(size as u64))
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::CallDataSize);
        util::synthesize_load(vm, step, kind, address, U256::ZERO)
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
        "CALLDATASIZE".into()
    }

    fn as_byte(&self) -> u8 {
        0x36
    }
}

/// The `CALLDATACOPY` opcode copies the input data in the current environment
/// into memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
///
/// where:
///
/// - `destOffset` is the byte offset in memory where the result will be copied
/// - `offset` is the byte offset in the call data from which to copy
/// - `size` is the number of bytes to copy, with bytes past the end of the call
///   data reading as zero
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// memory would grow past its limit.
///
/// # Synthesis
///
/// Every word-sized window of the destination becomes a public input keyed by
/// its offset in the call data.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CallDataCopy;

impl Opcode for CallDataCopy {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let mut stack = vm.stack_handle();
        let operands = stack.pop_many(3)?;
        let calldata = vm.context().transaction.calldata.clone();
        copy_into_memory(vm, &calldata, operands[0], operands[1], operands[2])
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let (destination, source, size) = copy_operands(step, 0)?;
        util::synthesize_copy(
            vm,
            step,
            |size| LoadKind::CallData { size },
            address,
            destination,
            source,
            size,
        )
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        3
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "CALLDATACOPY".into()
    }

    fn as_byte(&self) -> u8 {
        0x37
    }
}

/// The `CODESIZE` opcode gets the size of the code running in the current
/// environment.
///
/// # Semantics
///
/// | Stack Index | Input | Output                           |
/// | :---------: | :---: | :------------------------------: |
/// | 1           |       | `size := address(this).code.size` |
///
/// # Errors
///
/// Execution is reverted if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CodeSize;

impl Opcode for CodeSize {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let size = vm.code().len();
        vm.stack_handle().push(U256::from(size as u64))
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::CodeSize);
        util::synthesize_load(vm, step, kind, address, U256::ZERO)
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
        "CODESIZE".into()
    }

    fn as_byte(&self) -> u8 {
        0x38
    }
}

/// The `CODECOPY` opcode copies the code running in the current environment
/// to memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
///
/// where:
///
/// - `destOffset` is the byte offset in memory where the result will be copied
/// - `offset` is the byte offset in the code from which to copy
/// - `size` is the number of bytes to copy, with bytes past the end of the code
///   reading as zero
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// memory would grow past its limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CodeCopy;

impl Opcode for CodeCopy {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let operands = vm.stack_handle().pop_many(3)?;
        let code = vm.code().to_vec();
        copy_into_memory(vm, &code, operands[0], operands[1], operands[2])
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let (destination, source, size) = copy_operands(step, 0)?;
        util::synthesize_copy(
            vm,
            step,
            |size| LoadKind::Code { size },
            address,
            destination,
            source,
            size,
        )
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        3
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "CODECOPY".into()
    }

    fn as_byte(&self) -> u8 {
        0x39
    }
}

/// The `EXTCODESIZE` opcode gets the size of an account's code.
///
/// # Semantics
///
/// | Stack Index | Input     | Output                      |
/// | :---------: | :-------: | :-------------------------: |
/// | 1           | `address` | `size := address.code.size` |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// the code cannot be fetched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtCodeSize;

impl Opcode for ExtCodeSize {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let address = transaction::Address::from_word(vm.stack_handle().pop()?);
        let code = fetch_code(vm, address, instruction_pointer)?;
        vm.stack_handle().push(U256::from(code.len() as u64))
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = transaction::Address::from_word(util::input(step, 0)?);
        let kind = LoadKind::Environment(EnvironmentField::ExtCodeSize);
        util::synthesize_load(vm, step, kind, address, U256::ZERO)
    }

    fn min_gas_cost(&self) -> usize {
        100
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "EXTCODESIZE".into()
    }

    fn as_byte(&self) -> u8 {
        0x3b
    }
}

/// The `EXTCODECOPY` opcode copies an account's code to memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `address`    |        |
/// | 2           | `destOffset` |        |
/// | 3           | `offset`     |        |
/// | 4           | `size`       |        |
///
/// where:
///
/// - `address` is the address of the account whose code is copied
/// - `destOffset` is the byte offset in memory where the result will be copied
/// - `offset` is the byte offset in the code from which to copy
/// - `size` is the number of bytes to copy
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack, if the
/// code cannot be fetched, or if memory would grow past its limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtCodeCopy;

impl Opcode for ExtCodeCopy {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let operands = vm.stack_handle().pop_many(4)?;
        let address = transaction::Address::from_word(operands[0]);
        let code = fetch_code(vm, address, instruction_pointer)?;
        copy_into_memory(vm, &code, operands[1], operands[2], operands[3])
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = transaction::Address::from_word(util::input(step, 0)?);
        let (destination, source, size) = copy_operands(step, 1)?;
        util::synthesize_copy(
            vm,
            step,
            |size| LoadKind::Code { size },
            address,
            destination,
            source,
            size,
        )
    }

    fn min_gas_cost(&self) -> usize {
        100
    }

    fn arg_count(&self) -> usize {
        4
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "EXTCODECOPY".into()
    }

    fn as_byte(&self) -> u8 {
        0x3c
    }
}

/// The `RETURNDATASIZE` opcode gets the size of the output data from the
/// previous call.
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           |       | `size` |
///
/// No message calls are made, so `size` is always zero.
///
/// # Errors
///
/// Execution is reverted if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReturnDataSize;

impl Opcode for ReturnDataSize {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        vm.stack_handle().push(U256::ZERO)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::ReturnDataSize);
        util::synthesize_load(vm, step, kind, address, U256::ZERO)
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
        "RETURNDATASIZE".into()
    }

    fn as_byte(&self) -> u8 {
        0x3d
    }
}

/// The `RETURNDATACOPY` opcode copies output data from the previous call to
/// memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// `offset + size` is past the end of the return data, which is always empty.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReturnDataCopy;

impl Opcode for ReturnDataCopy {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let operands = vm.stack_handle().pop_many(3)?;
        let (offset, size) = (operands[1], operands[2]);
        if offset.checked_add(size) != Some(U256::ZERO) {
            return Err(Error::ReturnDataOutOfBounds {
                offset,
                size,
                available: 0,
            }
            .locate(instruction_pointer));
        }

        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, _: &Step) -> ExecuteResult {
        vm.symbolic_stack_handle().pop_many(3)?;
        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        3
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "RETURNDATACOPY".into()
    }

    fn as_byte(&self) -> u8 {
        0x3e
    }
}

/// The `POP` opcode removes an item from the stack.
///
/// # Semantics
///
/// | Stack Index | Input  | Output |
/// | :---------: | :----: | :----: |
/// | 1           | `item` |        |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pop;

impl Opcode for Pop {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        vm.stack_handle().pop()?;
        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, _: &Step) -> ExecuteResult {
        vm.symbolic_stack_handle().pop()?;
        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        2
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "POP".into()
    }

    fn as_byte(&self) -> u8 {
        0x50
    }
}

/// The `MLOAD` opcode loads a word from memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output                               |
/// | :---------: | :------: | :----------------------------------: |
/// | 1           | `offset` | `value := memory\[offset:offset+32\]` |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// memory would grow past its limit.
///
/// # Synthesis
///
/// The loaded symbol is assembled from the writes that cover the word.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MLoad;

impl Opcode for MLoad {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let offset = vm.stack_handle().pop()?;
        let value = vm
            .state_mut()
            .memory_mut()
            .load_word(offset)
            .locate(instruction_pointer)?;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        vm.symbolic_stack_handle().pop()?;
        let offset = util::to_offset(util::input(step, 0)?, instruction_pointer)?;

        let (registry, symbolic) = vm.synthesis_parts_mut();
        let symbol = memory_manager::resolve(
            registry,
            symbolic.memory(),
            offset,
            WORD_SIZE_BYTES,
            instruction_pointer,
        )?;
        vm.symbolic_stack_handle().push(symbol)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "MLOAD".into()
    }

    fn as_byte(&self) -> u8 {
        0x51
    }
}

/// The `MSTORE` opcode saves a word to memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `value`  |        |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// memory would grow past its limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MStore;

impl Opcode for MStore {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let mut stack = vm.stack_handle();
        let offset = stack.pop()?;
        let value = stack.pop()?;
        vm.state_mut()
            .memory_mut()
            .store_word(offset, value)
            .locate(instruction_pointer)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        let mut operands = vm.symbolic_stack_handle().pop_many(2)?;
        let value = operands.remove(1);
        let offset = util::to_offset(util::input(step, 0)?, instruction_pointer)?;
        vm.symbolic_mut()
            .memory_mut()
            .write(offset, WORD_SIZE_BYTES, value)
            .locate(instruction_pointer)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "MSTORE".into()
    }

    fn as_byte(&self) -> u8 {
        0x52
    }
}

/// The `MSTORE8` opcode saves a byte to memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `value`  |        |
///
/// where:
///
/// - only the least significant byte of `value` is written
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// memory would grow past its limit.
///
/// # Synthesis
///
/// The written byte is cut out of the value with an `AND` placement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MStore8;

impl Opcode for MStore8 {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let mut stack = vm.stack_handle();
        let offset = stack.pop()?;
        let value = stack.pop()?;
        let byte = value.to_be_bytes()[WORD_SIZE_BYTES - 1];
        vm.state_mut()
            .memory_mut()
            .store_byte(offset, byte)
            .locate(instruction_pointer)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        let mut operands = vm.symbolic_stack_handle().pop_many(2)?;
        let value = operands.remove(1);
        let offset = util::to_offset(util::input(step, 0)?, instruction_pointer)?;

        let mask = DataPt::word(U256::from(0xffu8));
        let byte = place_arith(
            vm.registry_mut(),
            ArithOp::And,
            &[value, mask],
            instruction_pointer,
        )?;
        vm.symbolic_mut()
            .memory_mut()
            .write(offset, 1, byte)
            .locate(instruction_pointer)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "MSTORE8".into()
    }

    fn as_byte(&self) -> u8 {
        0x53
    }
}

/// The `SLOAD` opcode loads a word from storage.
///
/// # Semantics
///
/// | Stack Index | Input | Output                 |
/// | :---------: | :---: | :--------------------: |
/// | 1           | `key` | `value := storage[key]` |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// the slot cannot be fetched.
///
/// # Synthesis
///
/// Storage is private, and repeated reads of a slot share their symbol until
/// the slot is written.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SLoad;

impl Opcode for SLoad {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let key = vm.stack_handle().pop()?;
        let value = vm
            .state()
            .storage()
            .load(key)
            .map_err(Error::from)
            .locate(instruction_pointer)?;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let key = util::input(step, 0)?;
        util::synthesize_load(vm, step, LoadKind::Storage, address, key)
    }

    fn min_gas_cost(&self) -> usize {
        100
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "SLOAD".into()
    }

    fn as_byte(&self) -> u8 {
        0x54
    }
}

/// The `SSTORE` opcode saves a word to storage.
///
/// # Semantics
///
/// | Stack Index | Input   | Output |
/// | :---------: | :-----: | :----: |
/// | 1           | `key`   |        |
/// | 2           | `value` |        |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack.
///
/// # Synthesis
///
/// The value symbol is exported as a private output, and the next read of the
/// slot is cold.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SStore;

impl Opcode for SStore {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let mut stack = vm.stack_handle();
        let key = stack.pop()?;
        let value = stack.pop()?;
        vm.state_mut().storage_mut().store(key, value);

        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        let operands = vm.symbolic_stack_handle().pop_many(2)?;
        let key = util::input(step, 0)?;
        let address = vm.address();
        loader::store_storage(
            vm.registry_mut(),
            address,
            key,
            &operands[1],
            instruction_pointer,
        )
    }

    fn min_gas_cost(&self) -> usize {
        100
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "SSTORE".into()
    }

    fn as_byte(&self) -> u8 {
        0x55
    }
}

/// The `MSIZE` opcode gets the size of active memory in bytes.
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           |       | `size` |
///
/// # Errors
///
/// Execution is reverted if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MSize;

impl Opcode for MSize {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let size = vm.state().memory().size();
        vm.stack_handle().push(U256::from(size as u64))
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let key = U256::from(step.instruction_pointer);
        util::synthesize_load(vm, step, LoadKind::MemorySize, address, key)
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
        "MSIZE".into()
    }

    fn as_byte(&self) -> u8 {
        0x59
    }
}

/// The `TLOAD` opcode loads a word from transient storage.
///
/// # Semantics
///
/// | Stack Index | Input | Output                          |
/// | :---------: | :---: | :-----------------------------: |
/// | 1           | `key` | `value := transientStorage[key]` |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TLoad;

impl Opcode for TLoad {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let key = vm.stack_handle().pop()?;
        let value = vm.state().storage().load_transient(key);
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        vm.symbolic_stack_handle().pop()?;
        let key = util::input(step, 0)?;
        let symbol = loader::load_transient(vm.registry(), vm.address(), key);
        vm.symbolic_stack_handle().push(symbol)
    }

    fn min_gas_cost(&self) -> usize {
        100
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "TLOAD".into()
    }

    fn as_byte(&self) -> u8 {
        0x5c
    }
}

/// The `TSTORE` opcode saves a word to transient storage.
///
/// # Semantics
///
/// | Stack Index | Input   | Output |
/// | :---------: | :-----: | :----: |
/// | 1           | `key`   |        |
/// | 2           | `value` |        |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack.
///
/// # Synthesis
///
/// Transient storage never leaves the transaction, so no wires are exported.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TStore;

impl Opcode for TStore {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let mut stack = vm.stack_handle();
        let key = stack.pop()?;
        let value = stack.pop()?;
        vm.state_mut().storage_mut().store_transient(key, value);

        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let mut operands = vm.symbolic_stack_handle().pop_many(2)?;
        let value = operands.remove(1);
        let key = util::input(step, 0)?;
        let address = vm.address();
        loader::store_transient(vm.registry_mut(), address, key, value);

        Ok(())
    }

    fn min_gas_cost(&self) -> usize {
        100
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "TSTORE".into()
    }

    fn as_byte(&self) -> u8 {
        0x5d
    }
}

/// The `MCOPY` opcode copies a region of memory to another, possibly
/// overlapping, region.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack or if
/// memory would grow past its limit.
///
/// # Synthesis
///
/// The source windows are all resolved before any of them is written at the
/// destination.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MCopy;

impl Opcode for MCopy {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let operands = vm.stack_handle().pop_many(3)?;
        vm.state_mut()
            .memory_mut()
            .copy_within(operands[0], operands[1], operands[2])
            .locate(instruction_pointer)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        vm.symbolic_stack_handle().pop_many(3)?;
        let (destination, source, size) = copy_operands(step, 0)?;
        let size = util::to_offset(size, instruction_pointer)?;
        if size == 0 {
            return Ok(());
        }
        let destination = util::to_offset(destination, instruction_pointer)?;
        let source = util::to_offset(source, instruction_pointer)?;

        let (registry, symbolic) = vm.synthesis_parts_mut();
        let chunks = memory_manager::load_memory_chunks(
            registry,
            symbolic.memory(),
            source,
            size,
            instruction_pointer,
        )?;
        memory_manager::store_memory_chunks(
            symbolic.memory_mut(),
            destination,
            size,
            chunks,
            instruction_pointer,
        )
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        3
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        "MCOPY".into()
    }

    fn as_byte(&self) -> u8 {
        0x5e
    }
}

/// The `PUSH0` opcode places the value 0 on the top of the stack.
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           |       | `0`    |
///
/// # Errors
///
/// Execution is reverted if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Push0;

impl Opcode for Push0 {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        vm.stack_handle().push(U256::ZERO)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        synthesize_literal(vm, step)
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
        "PUSH0".into()
    }

    fn as_byte(&self) -> u8 {
        0x5f
    }
}

/// The `PUSHN` opcodes push an `N`-byte item onto the stack, where `0 < N <=
/// 32`. The item is specified as the next `N` bytes of the instruction stream.
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           |       | `item` |
///
/// where:
///
/// - `item` is the next `N` bytes of the instruction stream; the value to push
///   onto the stack
///
/// # Errors
///
/// Execution is reverted if the stack is full.
///
/// # Synthesis
///
/// The item is loaded as a public input keyed by the offset of the opcode, so
/// a loop that pushes the same item again reuses its symbol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PushN {
    byte_count: u8,
    bytes:      Vec<u8>,
}

impl PushN {
    /// Construct a new instance of the `PUSHN` opcode for some `n`.
    ///
    /// The `bytes` are assumed to be in big-endian byte ordering, and are
    /// converted to be stored in little endian ordering.
    ///
    /// # Errors
    ///
    /// If `n` is not in the specified range or `bytes` is not `n` bytes long.
    pub fn new(n: u8, bytes: impl Into<Vec<u8>>) -> Result<Self, disassembly::Error> {
        let mut bytes: Vec<u8> = bytes.into();
        bytes.reverse();
        if n > 0 && n <= PUSH_OPCODE_MAX_BYTES && bytes.len() == n as usize {
            Ok(Self {
                byte_count: n,
                bytes,
            })
        } else {
            Err(disassembly::Error::InvalidPushSize(n))
        }
    }

    /// Get the number of bytes this `PUSHN` opcode pushes onto the stack.
    #[must_use]
    pub fn byte_size(&self) -> u8 {
        self.byte_count
    }

    /// Get the data to be pushed onto the stack by this opcode. It is
    /// guaranteed that `bytes_data.len() == byte_size()`.
    #[must_use]
    pub fn bytes_data(&self) -> &[u8] {
        &self.bytes
    }

    /// Gets the bytes that are pushed as a word.
    #[must_use]
    pub fn bytes_as_word(&self) -> U256 {
        let mut buffer = [0u8; WORD_SIZE_BYTES];
        buffer[..self.bytes.len()].copy_from_slice(&self.bytes);
        U256::from_le_bytes(buffer)
    }
}

impl Opcode for PushN {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        vm.stack_handle().push(self.bytes_as_word())
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        synthesize_literal(vm, step)
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        format!("PUSH{}", self.byte_count)
    }

    fn as_byte(&self) -> u8 {
        PUSH_OPCODE_BASE_VALUE + self.byte_count
    }

    fn encode(&self) -> Vec<u8> {
        let mut data = vec![self.as_byte()];
        data.extend(self.bytes_data().iter().rev());
        data
    }
}

/// The `DUPN` opcode duplicates the `N`th item on the stack, where `0 < N <=
/// 16`, pushing it on the top of the stack. This makes the duplicated item the
/// `N+1`th item.
///
/// # Semantics
///
/// | Stack Index | Input  | Output |
/// | :---------: | :----: | :----: |
/// | 1           |        | `item` |
/// | ...         |        |        |
/// | `N+1`       | `item` | `item` |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DupN {
    item: u8,
}

impl DupN {
    /// Constructs a new instance of the `DUPN` opcode.
    ///
    /// # Errors
    ///
    /// If the provided `n` is not in the specified range.
    pub fn new(n: u8) -> Result<Self, disassembly::Error> {
        if 0 < n && n <= 16 {
            Ok(Self { item: n })
        } else {
            Err(disassembly::Error::InvalidStackItem {
                item: n,
                name: "DUP".into(),
            })
        }
    }

    /// Gets the item on the stack that this opcode is duplicating.
    #[must_use]
    pub fn n(&self) -> u8 {
        self.item
    }

    /// Gets the dup frame, converting from EVM to internal semantics.
    fn frame(self) -> u32 {
        // Always safe as `DupN` is guaranteed to have `item >= 1`
        u32::from(self.item) - 1
    }
}

impl Opcode for DupN {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        vm.stack_handle().dup(self.frame())
    }

    fn synthesize(&self, vm: &mut VM, _: &Step) -> ExecuteResult {
        vm.symbolic_stack_handle().dup(self.frame())
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        self.item as usize
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        format!("DUP{}", self.item)
    }

    fn as_byte(&self) -> u8 {
        DUP_OPCODE_BASE_VALUE + self.item
    }
}

/// The `SWAPN` opcode exchanges the first and `N+1`th stack items, where `0 < N
/// <= 16`.
///
/// # Semantics
///
/// | Stack Index | Input   | Output  |
/// | :---------: | :-----: | :-----: |
/// | 1           | `item1` | `item2` |
/// | ...         |         |         |
/// | `N+1`       | `item2` | `item1` |
///
/// # Errors
///
/// Execution is reverted if there are not enough operands on the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SwapN {
    item: u8,
}

impl SwapN {
    /// Constructs a new instance of the `SWAPN` opcode.
    ///
    /// # Errors
    ///
    /// If the provided `n` is not in the specified range.
    pub fn new(n: u8) -> Result<Self, disassembly::Error> {
        if 0 < n && n <= 16 {
            Ok(Self { item: n })
        } else {
            Err(disassembly::Error::InvalidStackItem {
                item: n,
                name: "SWAP".into(),
            })
        }
    }

    /// Gets the item on the stack that this opcode is swapping with.
    #[must_use]
    pub fn n(&self) -> u8 {
        self.item
    }
}

impl Opcode for SwapN {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        vm.stack_handle().swap(u32::from(self.item))
    }

    fn synthesize(&self, vm: &mut VM, _: &Step) -> ExecuteResult {
        vm.symbolic_stack_handle().swap(u32::from(self.item))
    }

    fn min_gas_cost(&self) -> usize {
        3
    }

    fn arg_count(&self) -> usize {
        self.item as usize + 1
    }

    fn ret_count(&self) -> usize {
        self.item as usize + 1
    }

    fn as_text_code(&self) -> String {
        format!("SWAP{}", self.item)
    }

    fn as_byte(&self) -> u8 {
        SWAP_OPCODE_BASE_VALUE + self.item
    }
}

/// Loads the value pushed by a `PUSH` opcode as an immediate of the executing
/// code.
fn synthesize_literal(vm: &mut VM, step: &Step) -> ExecuteResult {
    let address = vm.address();
    let key = U256::from(step.instruction_pointer);
    util::synthesize_load(vm, step, LoadKind::Bytecode, address, key)
}

/// Gets the `(destOffset, offset, size)` operands of a copying opcode, which
/// start at stack index `first`.
fn copy_operands(step: &Step, first: usize) -> crate::error::execution::Result<(U256, U256, U256)> {
    Ok((
        util::input(step, first)?,
        util::input(step, first + 1)?,
        util::input(step, first + 2)?,
    ))
}

/// Copies `size` bytes of `data` from `offset` into memory at `destination`,
/// with bytes past the end of `data` reading as zero.
fn copy_into_memory(
    vm: &mut VM,
    data: &[u8],
    destination: U256,
    offset: U256,
    size: U256,
) -> ExecuteResult {
    let instruction_pointer = vm.instruction_pointer();
    let memory = vm.state_mut().memory_mut();
    let (_, size) = memory.expand(destination, size).locate(instruction_pointer)?;
    memory
        .write(destination, &padded_slice(data, offset, size))
        .locate(instruction_pointer)
}

/// Fetches the code of the account at `address` from the provider.
fn fetch_code(
    vm: &VM,
    address: transaction::Address,
    instruction_pointer: u32,
) -> crate::error::execution::Result<Vec<u8>> {
    vm.provider()
        .code(address)
        .map_err(Error::from)
        .locate(instruction_pointer)
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        bytecode,
        error::execution::Error,
        opcode::{memory, test_util as util, Opcode},
        provider::InMemoryProvider,
        synthesis::{
            placement::PlacementId,
            subcircuit::AND,
            symbol::{External, LoadKind},
        },
    };

    fn wire_count(vm: &crate::vm::VM, buffer: PlacementId) -> usize {
        vm.registry().placement(buffer).expect("Buffer missing").out_pts().len()
    }

    #[test]
    fn push_loads_its_immediate_from_the_bytecode() -> anyhow::Result<()> {
        let push = memory::PushN::new(2, vec![0x12, 0x34])?;
        assert_eq!(push.encode(), vec![0x61, 0x12, 0x34]);

        let mut vm = util::new_vm_with_code(&bytecode![push], InMemoryProvider::new())?;
        vm.execute()?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(0x1234u16));
        assert_eq!(
            symbol.external(),
            Some(&External::Source {
                kind:    LoadKind::Bytecode,
                address: util::code_address(),
                key:     U256::ZERO,
            })
        );

        Ok(())
    }

    #[test]
    fn push_rejects_mismatched_immediates() {
        assert!(memory::PushN::new(2, vec![0x12]).is_err());
        assert!(memory::PushN::new(33, vec![0; 33]).is_err());
    }

    #[test]
    fn loads_reuse_the_symbol_that_was_stored() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![])?;
        let value = util::push_input(&mut vm, U256::from(0x2au8))?;
        util::push_input(&mut vm, U256::from(0x40u8))?;
        vm.dispatch(&memory::MStore)?;

        util::push_input(&mut vm, U256::from(0x40u8))?;
        vm.dispatch(&memory::MLoad)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(0x2au8));
        assert_eq!(symbol, value);
        assert_eq!(vm.registry().placement_count(), 4);
        assert_eq!(vm.state().memory().size(), 0x60);

        Ok(())
    }

    #[test]
    fn single_byte_stores_are_masked() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![
            U256::from(0x1234u16), // The value
            U256::from(31u8),      // The offset
        ])?;
        vm.dispatch(&memory::MStore8)?;

        assert_eq!(vm.state().memory().peek(30, 2), vec![0x00, 0x34]);
        let placement = vm.registry().placement(PlacementId(4)).expect("Placement missing");
        assert_eq!(placement.subcircuit(), AND);

        util::push_input(&mut vm, U256::ZERO)?;
        vm.dispatch(&memory::MLoad)?;
        assert_eq!(util::top(&vm)?.1.value(), U256::from(0x34u8));

        Ok(())
    }

    #[test]
    fn storage_writes_are_exported_and_force_a_fresh_read() -> anyhow::Result<()> {
        let provider =
            InMemoryProvider::new().with_storage(util::code_address(), U256::ONE, U256::from(42u8));
        let mut vm = util::new_vm_with_code(&bytecode![memory::Push0], provider)?;

        util::push_input(&mut vm, U256::ONE)?;
        vm.dispatch(&memory::SLoad)?;
        let (concrete, first) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(42u8));
        assert_eq!(first.placement(), Some(PlacementId::PRV_IN));

        util::push_input(&mut vm, U256::from(7u8))?;
        util::push_input(&mut vm, U256::ONE)?;
        vm.dispatch(&memory::SStore)?;
        assert_eq!(wire_count(&vm, PlacementId::PRV_OUT), 1);

        util::push_input(&mut vm, U256::ONE)?;
        vm.dispatch(&memory::SLoad)?;
        let (concrete, second) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(7u8));
        assert_ne!(first, second);
        assert_eq!(wire_count(&vm, PlacementId::PRV_IN), 2);

        Ok(())
    }

    #[test]
    fn transient_storage_holds_symbols_without_wires() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ONE])?;
        vm.dispatch(&memory::TLoad)?;
        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::ZERO);
        assert!(symbol.is_literal());

        let value = util::push_input(&mut vm, U256::from(9u8))?;
        util::push_input(&mut vm, U256::ONE)?;
        vm.dispatch(&memory::TStore)?;
        util::push_input(&mut vm, U256::ONE)?;
        vm.dispatch(&memory::TLoad)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(9u8));
        assert_eq!(symbol, value);

        Ok(())
    }

    #[test]
    fn call_data_loads_are_padded_with_zeroes() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::from(2u8)])?;
        vm.dispatch(&memory::CallDataLoad)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(0x3344u16) << 240);
        assert_eq!(
            symbol.external(),
            Some(&External::Source {
                kind:    LoadKind::CallData { size: 32 },
                address: util::code_address(),
                key:     U256::from(2u8),
            })
        );

        Ok(())
    }

    #[test]
    fn call_data_copies_mint_one_symbol_per_window() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![
            U256::from(4u8), // The size
            U256::ZERO,      // The offset in the call data
            U256::ZERO,      // The offset in memory
        ])?;
        vm.dispatch(&memory::CallDataCopy)?;

        assert_eq!(vm.state().memory().peek(0, 4), vec![0x11, 0x22, 0x33, 0x44]);
        let entries = vm.symbolic().memory().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size(), 4);
        assert_eq!(entries[0].symbol().value(), U256::from(0x1122_3344u32));
        assert_eq!(wire_count(&vm, PlacementId::PUB_IN), 4);

        Ok(())
    }

    #[test]
    fn memory_copies_resolve_the_source_first() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![])?;
        let value = util::push_input(&mut vm, U256::from(0xabu8))?;
        util::push_input(&mut vm, U256::ZERO)?;
        vm.dispatch(&memory::MStore)?;

        util::push_input(&mut vm, U256::from(32u8))?; // The size
        util::push_input(&mut vm, U256::ZERO)?; // The source
        util::push_input(&mut vm, U256::from(16u8))?; // The destination
        vm.dispatch(&memory::MCopy)?;

        let entries = vm.symbolic().memory().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].offset(), 16);
        assert_eq!(entries[1].symbol(), &value);
        assert_eq!(vm.state().memory().peek(47, 1), vec![0xab]);

        Ok(())
    }

    #[test]
    fn return_data_is_always_empty() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ZERO; 3])?;
        vm.dispatch(&memory::ReturnDataCopy)?;

        vm.dispatch(&memory::ReturnDataSize)?;
        assert_eq!(util::top(&vm)?.0, U256::ZERO);

        util::push_input(&mut vm, U256::ONE)?;
        util::push_input(&mut vm, U256::ZERO)?;
        util::push_input(&mut vm, U256::ZERO)?;
        let error = vm.dispatch(&memory::ReturnDataCopy).expect_err("Copy succeeded");
        assert_eq!(
            error.payload,
            Error::ReturnDataOutOfBounds {
                offset:    U256::ZERO,
                size:      U256::ONE,
                available: 0,
            }
        );

        Ok(())
    }

    #[test]
    fn stack_shuffles_mirror_the_concrete_stack() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ONE, U256::from(2u8)])?;
        vm.dispatch(&memory::DupN::new(2)?)?;
        assert_eq!(util::top(&vm)?.0, U256::ONE);

        vm.dispatch(&memory::SwapN::new(2)?)?;
        assert_eq!(util::top(&vm)?.0, U256::ONE);
        assert_eq!(*vm.state().stack().read(2)?, U256::ONE);

        vm.dispatch(&memory::Pop)?;
        assert_eq!(vm.symbolic().stack().depth(), 2);
        assert_eq!(vm.registry().placement_count(), 4);

        Ok(())
    }

    #[test]
    fn memory_size_reads_are_never_reused() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![])?;
        vm.dispatch(&memory::MSize)?;
        vm.dispatch(&memory::MSize)?;

        assert_eq!(util::top(&vm)?.0, U256::ZERO);
        assert_eq!(wire_count(&vm, PlacementId::PUB_IN), 2);

        Ok(())
    }
}
