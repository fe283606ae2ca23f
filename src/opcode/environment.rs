//! Opcodes that interact with the external environment on the EVM.
//!
//! Values that come from outside the bytecode are minted into the input
//! buffers through the data loader. Account state is private to the prover,
//! while the message and block environment are public.

use ethnum::U256;

use crate::{
    constant::{BLOCK_HASH_HISTORY, LOG_OPCODE_BASE_VALUE},
    error::{
        container::Locatable,
        disassembly,
        execution::Error,
    },
    opcode::{util, ExecuteResult, Opcode},
    provider::keccak256,
    synthesis::{
        loader,
        memory_manager,
        symbol::{BlockField, EnvironmentField, LoadKind},
    },
    transaction,
    vm::{state::Log, Step, VM},
};

/// The `KECCAK256` opcode computes the keccak256 hash of a region of memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output                                 |
/// | :---------: | :------: | :------------------------------------: |
/// | 1           | `offset` | `keccak256(mem\[offset:offset+size\])` |
/// | 2           | `size`   |                                        |
///
/// where:
///
/// - `offset` is the byte offset in memory where the data to be hashed starts
/// - `size` is the number of bytes in the data to be hashed
///
/// # Errors
///
/// Fails if there are not enough operands on the stack or if memory would grow
/// past its limit.
///
/// # Synthesis
///
/// The digest is not computed in the circuit. The hashed windows are exported
/// as public outputs and the digest is minted as a public input, so that the
/// verifier can check the pair outside the circuit. Hashing the same symbols
/// twice yields the same digest symbol.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Sha3;

impl Opcode for Sha3 {
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
        vm.stack_handle().push(keccak256(&data))
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        vm.symbolic_stack_handle().pop_many(2)?;
        let size = util::to_offset(util::input(step, 1)?, instruction_pointer)?;
        let inputs = read_memory_chunks(vm, step, 0, 1)?;
        let digest = util::output(step)?;

        let address = vm.address();
        let symbol = loader::load_keccak(
            vm.registry_mut(),
            address,
            size,
            inputs,
            digest,
            instruction_pointer,
        )?;
        vm.symbolic_stack_handle().push(symbol)
    }

    fn min_gas_cost(&self) -> usize {
        30
    }

    fn arg_count(&self) -> usize {
        2
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "KECCAK256".into()
    }

    fn as_byte(&self) -> u8 {
        0x20
    }
}

/// The `BALANCE` opcode gets the balance of the target account.
///
/// # Semantics
///
/// | Stack Index | Input     | Output                       |
/// | :---------: | :-------: | :--------------------------: |
/// | 1           | `address` | `balance := address.balance` |
///
/// where:
///
/// - `address` is the address of the account to check the balance for
/// - `balance` is the balance in WEI
///
/// # Errors
///
/// Fails if there are not enough operands on the stack or if the balance
/// cannot be fetched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Balance;

impl Opcode for Balance {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let address = transaction::Address::from_word(vm.stack_handle().pop()?);
        let balance = vm
            .provider()
            .balance(address)
            .map_err(Error::from)
            .locate(instruction_pointer)?;
        vm.stack_handle().push(balance)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = transaction::Address::from_word(util::input(step, 0)?);
        util::synthesize_load(vm, step, LoadKind::Balance, address, U256::ZERO)
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
        "BALANCE".into()
    }

    fn as_byte(&self) -> u8 {
        0x31
    }
}

/// The `EXTCODEHASH` opcode gets the hash of the code of an account.
///
/// # Semantics
///
/// | Stack Index | Input     | Output                   |
/// | :---------: | :-------: | :----------------------: |
/// | 1           | `address` | `hash := address.codehash` |
///
/// where:
///
/// - `hash` is zero for an account without code
///
/// # Errors
///
/// Fails if there are not enough operands on the stack or if the code cannot
/// be fetched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtCodeHash;

impl Opcode for ExtCodeHash {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let address = transaction::Address::from_word(vm.stack_handle().pop()?);
        let hash = vm
            .provider()
            .code_hash(address)
            .map_err(Error::from)
            .locate(instruction_pointer)?;
        vm.stack_handle().push(hash)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = transaction::Address::from_word(util::input(step, 0)?);
        let kind = LoadKind::Environment(EnvironmentField::ExtCodeHash);
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
        "EXTCODEHASH".into()
    }

    fn as_byte(&self) -> u8 {
        0x3f
    }
}

/// The `BLOCKHASH` opcode gets the hash of one of the 256 most recent complete
/// blocks.
///
/// # Semantics
///
/// | Stack Index | Input         | Output |
/// | :---------: | :-----------: | :----: |
/// | 1           | `blockNumber` | `hash` |
///
/// where:
///
/// - `hash` is zero when `blockNumber` is not one of the 256 blocks preceding
///   the current one
///
/// # Errors
///
/// Fails if there are not enough operands on the stack or if the hash cannot
/// be fetched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockHash;

impl Opcode for BlockHash {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let number = vm.stack_handle().pop()?;
        let current = vm.context().block.number;
        let history = U256::from(BLOCK_HASH_HISTORY as u64);
        let visible = number < current && current - number <= history;

        let hash = if visible {
            vm.provider()
                .block_hash(number)
                .map_err(Error::from)
                .locate(instruction_pointer)?
        } else {
            U256::ZERO
        };
        vm.stack_handle().push(hash)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let number = util::input(step, 0)?;
        let kind = LoadKind::Block(BlockField::BlockHash);
        util::synthesize_load(vm, step, kind, address, number)
    }

    fn min_gas_cost(&self) -> usize {
        20
    }

    fn arg_count(&self) -> usize {
        1
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "BLOCKHASH".into()
    }

    fn as_byte(&self) -> u8 {
        0x40
    }
}

/// The `SELFBALANCE` opcode gets the balance of the currently executing
/// account.
///
/// # Semantics
///
/// | Stack Index | Input | Output                 |
/// | :---------: | :---: | :--------------------: |
/// | 1           |       | `address(this).balance` |
///
/// # Errors
///
/// Fails if the stack is full or if the balance cannot be fetched.
///
/// # Synthesis
///
/// Shares its symbol with `BALANCE` of the executing account.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SelfBalance;

impl Opcode for SelfBalance {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let balance = vm
            .provider()
            .balance(vm.address())
            .map_err(Error::from)
            .locate(instruction_pointer)?;
        vm.stack_handle().push(balance)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        util::synthesize_load(vm, step, LoadKind::Balance, address, U256::ZERO)
    }

    fn min_gas_cost(&self) -> usize {
        5
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn ret_count(&self) -> usize {
        1
    }

    fn as_text_code(&self) -> String {
        "SELFBALANCE".into()
    }

    fn as_byte(&self) -> u8 {
        0x47
    }
}

/// The `GAS` opcode gets the amount of gas remaining after this instruction.
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           |       | `gas`  |
///
/// # Errors
///
/// Fails if the stack is full.
///
/// # Synthesis
///
/// The remaining gas changes between any two reads, so every read mints a new
/// public input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Gas;

impl Opcode for Gas {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let remaining = vm.gas_remaining().saturating_sub(self.min_gas_cost());
        vm.stack_handle().push(U256::from(remaining as u64))
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let key = U256::from(step.instruction_pointer);
        util::synthesize_load(vm, step, LoadKind::Gas, address, key)
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
        "GAS".into()
    }

    fn as_byte(&self) -> u8 {
        0x5a
    }
}

/// The `ADDRESS` opcode gets the address of the currently executing account.
///
/// # Semantics
///
/// | Stack Index | Input | Output          |
/// | :---------: | :---: | :-------------: |
/// | 1           |       | `address(this)` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Address;

impl Opcode for Address {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.address().to_word();
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::Address);
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
        "ADDRESS".into()
    }

    fn as_byte(&self) -> u8 {
        0x30
    }
}

/// The `ORIGIN` opcode gets the address of the account that signed the
/// transaction.
///
/// # Semantics
///
/// | Stack Index | Input | Output      |
/// | :---------: | :---: | :---------: |
/// | 1           |       | `tx.origin` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Origin;

impl Opcode for Origin {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().transaction.origin.to_word();
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::Origin);
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
        "ORIGIN".into()
    }

    fn as_byte(&self) -> u8 {
        0x32
    }
}

/// The `CALLER` opcode gets the address of the immediate caller.
///
/// # Semantics
///
/// | Stack Index | Input | Output       |
/// | :---------: | :---: | :----------: |
/// | 1           |       | `msg.sender` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Caller;

impl Opcode for Caller {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().transaction.caller.to_word();
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::Caller);
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
        "CALLER".into()
    }

    fn as_byte(&self) -> u8 {
        0x33
    }
}

/// The `CALLVALUE` opcode gets the value in wei sent with the call.
///
/// # Semantics
///
/// | Stack Index | Input | Output      |
/// | :---------: | :---: | :---------: |
/// | 1           |       | `msg.value` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CallValue;

impl Opcode for CallValue {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().transaction.value;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::CallValue);
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
        "CALLVALUE".into()
    }

    fn as_byte(&self) -> u8 {
        0x34
    }
}

/// The `GASPRICE` opcode gets the gas price of the transaction.
///
/// # Semantics
///
/// | Stack Index | Input | Output        |
/// | :---------: | :---: | :-----------: |
/// | 1           |       | `tx.gasprice` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GasPrice;

impl Opcode for GasPrice {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().transaction.gas_price;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Environment(EnvironmentField::GasPrice);
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
        "GASPRICE".into()
    }

    fn as_byte(&self) -> u8 {
        0x3a
    }
}

/// The `COINBASE` opcode gets the address of the block's beneficiary.
///
/// # Semantics
///
/// | Stack Index | Input | Output           |
/// | :---------: | :---: | :--------------: |
/// | 1           |       | `block.coinbase` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CoinBase;

impl Opcode for CoinBase {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().block.coinbase.to_word();
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Block(BlockField::Coinbase);
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
        "COINBASE".into()
    }

    fn as_byte(&self) -> u8 {
        0x41
    }
}

/// The `TIMESTAMP` opcode gets the timestamp of the block.
///
/// # Semantics
///
/// | Stack Index | Input | Output            |
/// | :---------: | :---: | :---------------: |
/// | 1           |       | `block.timestamp` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timestamp;

impl Opcode for Timestamp {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().block.timestamp;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Block(BlockField::Timestamp);
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
        "TIMESTAMP".into()
    }

    fn as_byte(&self) -> u8 {
        0x42
    }
}

/// The `NUMBER` opcode gets the number of the block.
///
/// # Semantics
///
/// | Stack Index | Input | Output         |
/// | :---------: | :---: | :------------: |
/// | 1           |       | `block.number` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Number;

impl Opcode for Number {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().block.number;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Block(BlockField::Number);
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
        "NUMBER".into()
    }

    fn as_byte(&self) -> u8 {
        0x43
    }
}

/// The `PREVRANDAO` opcode gets the randomness beacon output of the previous
/// block.
///
/// # Semantics
///
/// | Stack Index | Input | Output             |
/// | :---------: | :---: | :----------------: |
/// | 1           |       | `block.prevrandao` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Prevrandao;

impl Opcode for Prevrandao {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().block.prevrandao;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Block(BlockField::Prevrandao);
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
        "PREVRANDAO".into()
    }

    fn as_byte(&self) -> u8 {
        0x44
    }
}

/// The `GASLIMIT` opcode gets the gas limit of the block.
///
/// # Semantics
///
/// | Stack Index | Input | Output           |
/// | :---------: | :---: | :--------------: |
/// | 1           |       | `block.gaslimit` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GasLimit;

impl Opcode for GasLimit {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().block.gas_limit;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Block(BlockField::GasLimit);
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
        "GASLIMIT".into()
    }

    fn as_byte(&self) -> u8 {
        0x45
    }
}

/// The `CHAINID` opcode gets the identifier of the chain.
///
/// # Semantics
///
/// | Stack Index | Input | Output     |
/// | :---------: | :---: | :--------: |
/// | 1           |       | `chain_id` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChainId;

impl Opcode for ChainId {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().block.chain_id;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Block(BlockField::ChainId);
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
        "CHAINID".into()
    }

    fn as_byte(&self) -> u8 {
        0x46
    }
}

/// The `BASEFEE` opcode gets the base fee of the block.
///
/// # Semantics
///
/// | Stack Index | Input | Output          |
/// | :---------: | :---: | :-------------: |
/// | 1           |       | `block.basefee` |
///
/// # Errors
///
/// Fails if the stack is full.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BaseFee;

impl Opcode for BaseFee {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let value = vm.context().block.base_fee;
        vm.stack_handle().push(value)
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let address = vm.address();
        let kind = LoadKind::Block(BlockField::BaseFee);
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
        "BASEFEE".into()
    }

    fn as_byte(&self) -> u8 {
        0x48
    }
}

/// The `LOGN` opcodes append log records with `N` topics, where `0 <= N <= 4`.
///
/// # Semantics
///
/// | Stack Index      | Input    | Output |
/// | :--------------: | :------: | :----: |
/// | 1                | `offset` |        |
/// | 2                | `size`   |        |
/// | `i` in `3..=2+N` | `t(i)`   |        |
///
/// where:
///
/// - `offset` is the byte offset in memory where the log data begins
/// - `size` is the size of the log data in bytes
/// - `t(i)` is the `i`th topic for the log message
///
/// # Errors
///
/// Fails if there are not enough operands on the stack or if memory would grow
/// past its limit.
///
/// # Synthesis
///
/// The topic symbols and then the symbols of each word-sized window of the data
/// are exported as public outputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LogN {
    topic_count: u8,
}

impl LogN {
    /// Constructs a new instance of the `LOGN` opcode.
    ///
    /// # Errors
    ///
    /// If the provided `n` is not in the specified range.
    pub fn new(n: u8) -> Result<Self, disassembly::Error> {
        if n <= 4 {
            Ok(Self { topic_count: n })
        } else {
            Err(disassembly::Error::InvalidTopicCount(n))
        }
    }

    /// Gets the number of topics passed to this log call.
    #[must_use]
    pub fn n(&self) -> u8 {
        self.topic_count
    }
}

impl Opcode for LogN {
    fn execute(&self, vm: &mut VM) -> ExecuteResult {
        let instruction_pointer = vm.instruction_pointer();
        let mut operands = vm.stack_handle().pop_many(self.arg_count())?.into_iter();
        let offset = operands.next().unwrap_or_default();
        let size = operands.next().unwrap_or_default();
        let topics: Vec<U256> = operands.collect();

        let data = vm
            .state_mut()
            .memory_mut()
            .read(offset, size)
            .locate(instruction_pointer)?;
        vm.state_mut().push_log(Log { topics, data });

        Ok(())
    }

    fn synthesize(&self, vm: &mut VM, step: &Step) -> ExecuteResult {
        let instruction_pointer = step.instruction_pointer;
        let operands = vm.symbolic_stack_handle().pop_many(self.arg_count())?;
        let topics = operands.into_iter().skip(2).collect();
        let data = read_memory_chunks(vm, step, 0, 1)?;

        let address = vm.address();
        loader::store_log(
            vm.registry_mut(),
            address,
            topics,
            data,
            instruction_pointer,
        )
    }

    fn min_gas_cost(&self) -> usize {
        375 * (self.topic_count as usize + 1)
    }

    fn arg_count(&self) -> usize {
        2 + self.topic_count as usize
    }

    fn ret_count(&self) -> usize {
        0
    }

    fn as_text_code(&self) -> String {
        format!("LOG{}", self.topic_count)
    }

    fn as_byte(&self) -> u8 {
        LOG_OPCODE_BASE_VALUE + self.topic_count
    }
}

crate::opcode::macros::unsupported_opcodes! {
    /// The `CREATE` opcode creates a contract and returns the address of the
    /// created contract.
    Create => ("CREATE", 0xf0, 32000, 3, 1),

    /// The `CREATE2` opcode creates a contract at a predictable address.
    Create2 => ("CREATE2", 0xf5, 32000, 4, 1),

    /// The `SELFDESTRUCT` opcode halts execution and registers the account for
    /// deletion.
    SelfDestruct => ("SELFDESTRUCT", 0xff, 5000, 1, 0),
}

/// Resolves the memory region described by the step's operands at
/// `offset_index` and `size_index` as one symbol per word-sized window.
///
/// An empty region has no windows, whatever its offset.
fn read_memory_chunks(
    vm: &mut VM,
    step: &Step,
    offset_index: usize,
    size_index: usize,
) -> crate::error::execution::Result<Vec<crate::synthesis::symbol::DataPt>> {
    let instruction_pointer = step.instruction_pointer;
    let size = util::to_offset(util::input(step, size_index)?, instruction_pointer)?;
    if size == 0 {
        return Ok(Vec::new());
    }
    let offset = util::to_offset(util::input(step, offset_index)?, instruction_pointer)?;

    let (registry, symbolic) = vm.synthesis_parts_mut();
    memory_manager::load_memory_chunks(
        registry,
        symbolic.memory(),
        offset,
        size,
        instruction_pointer,
    )
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        bytecode,
        error::{disassembly, execution::Error},
        opcode::{
            environment::{self, LogN},
            memory::{MStore, Push0, PushN},
            test_util as util,
        },
        provider::{keccak256, InMemoryProvider},
        synthesis::{
            placement::PlacementId,
            symbol::{EnvironmentField, External, LoadKind},
        },
        transaction::Address,
    };

    #[test]
    fn environment_values_are_public_inputs() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![])?;
        vm.dispatch(&environment::Caller)?;
        vm.dispatch(&environment::Caller)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, Address::from(0xbbbb_u64).to_word());
        assert_eq!(
            symbol.external(),
            Some(&External::Source {
                kind:    LoadKind::Environment(EnvironmentField::Caller),
                address: util::code_address(),
                key:     U256::ZERO,
            })
        );

        // The second read is warm, so both stack items are the same wire
        assert_eq!(vm.symbolic().stack().read(1)?, &symbol);
        let pub_in = vm.registry().placement(PlacementId::PUB_IN).expect("Buffer missing");
        assert_eq!(pub_in.out_pts().len(), 1);

        vm.dispatch(&environment::ChainId)?;
        assert_eq!(util::top(&vm)?.0, U256::ONE);

        Ok(())
    }

    #[test]
    fn balances_are_private_inputs() -> anyhow::Result<()> {
        let account = Address::from(0x1234_u64);
        let provider = InMemoryProvider::new().with_balance(account, U256::from(500u16));
        let mut vm = util::new_vm_with_code(&bytecode![Push0], provider)?;
        util::push_input(&mut vm, account.to_word())?;
        vm.dispatch(&environment::Balance)?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, U256::from(500u16));
        assert_eq!(symbol.placement(), Some(PlacementId::PRV_IN));

        Ok(())
    }

    #[test]
    fn block_hashes_are_only_visible_for_recent_blocks() -> anyhow::Result<()> {
        let hash = U256::from(0xfeedu16);
        let provider = InMemoryProvider::new().with_block_hash(U256::from(99u8), hash);
        let mut vm = util::new_vm_with_code(&bytecode![Push0], provider)?;

        util::push_input(&mut vm, U256::from(99u8))?;
        vm.dispatch(&environment::BlockHash)?;
        assert_eq!(util::top(&vm)?.0, hash);

        util::push_input(&mut vm, U256::from(100u8))?;
        vm.dispatch(&environment::BlockHash)?;
        assert_eq!(util::top(&vm)?.0, U256::ZERO);

        Ok(())
    }

    #[test]
    fn keccak_exports_its_input_and_mints_the_digest() -> anyhow::Result<()> {
        let bytes = bytecode![
            PushN::new(1, vec![0x2a])?, // The value to hash
            Push0,                      // The offset to store it at
            MStore,
            PushN::new(1, vec![0x20])?, // The size of the data to hash
            Push0,                      // The offset of the data to hash
            environment::Sha3
        ];
        let mut vm = util::new_vm_with_code(&bytes, InMemoryProvider::new())?;
        vm.execute()?;

        let (concrete, symbol) = util::top(&vm)?;
        assert_eq!(concrete, keccak256(&U256::from(0x2au8).to_be_bytes()));
        assert_eq!(symbol.value(), concrete);

        let records = vm.registry().keccak_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].inputs.len(), 1);
        assert_eq!(records[0].inputs[0].value(), U256::from(0x2au8));
        assert_eq!(records[0].output, symbol);

        let pub_out = vm.registry().placement(PlacementId::PUB_OUT).expect("Buffer missing");
        assert_eq!(pub_out.out_pts().len(), 1);

        Ok(())
    }

    #[test]
    fn logs_export_topics_and_data() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![
            U256::from(0x77u8), // The topic
            U256::ZERO,         // The size of the data
            U256::ZERO,         // The offset of the data
        ])?;
        vm.dispatch(&LogN::new(1)?)?;

        let logs = vm.state().logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].topics, vec![U256::from(0x77u8)]);
        assert!(logs[0].data.is_empty());

        assert_eq!(vm.registry().logs().len(), 1);
        let pub_out = vm.registry().placement(PlacementId::PUB_OUT).expect("Buffer missing");
        assert_eq!(pub_out.in_pts()[0].value(), U256::from(0x77u8));

        assert_eq!(LogN::new(5), Err(disassembly::Error::InvalidTopicCount(5)));

        Ok(())
    }

    #[test]
    fn gas_reads_are_never_reused() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![])?;
        vm.dispatch(&environment::Gas)?;
        vm.dispatch(&environment::Gas)?;

        assert_eq!(util::top(&vm)?.0, U256::from(1_000_000u32 - 2));
        let pub_in = vm.registry().placement(PlacementId::PUB_IN).expect("Buffer missing");
        assert_eq!(pub_in.out_pts().len(), 2);

        Ok(())
    }

    #[test]
    fn contract_creation_is_unsupported() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![U256::ZERO; 3])?;
        let error = vm.dispatch(&environment::Create).expect_err("CREATE was supported");
        assert_eq!(
            error.payload,
            Error::UnsupportedOpcode {
                name: "CREATE".into(),
            }
        );

        Ok(())
    }
}
