//! Utilities for testing the opcodes against a prepared virtual machine.

use ethnum::U256;

use crate::{
    disassembly::InstructionStream,
    opcode::control::Stop,
    provider::InMemoryProvider,
    synthesis::{
        buffer::add_wire_to_in_buffer,
        placement::PlacementId,
        registry::StateRegistry,
        symbol::DataPt,
    },
    transaction::{Address, BlockInfo, Transaction, TransactionContext},
    vm::{Config, VM},
    watchdog::{DynWatchdog, LazyWatchdog},
};

/// Gets the address of the account whose code the test virtual machines run.
pub fn code_address() -> Address {
    Address::from(0xc0de_u64)
}

/// Gets the transaction context used by the test virtual machines.
pub fn context() -> TransactionContext {
    let transaction = Transaction {
        origin: Address::from(0xaaaa_u64),
        caller: Address::from(0xbbbb_u64),
        to: code_address(),
        value: U256::from(7u8),
        calldata: vec![0x11, 0x22, 0x33, 0x44],
        gas_price: U256::from(10u8),
        gas_limit: 1_000_000,
        ..Transaction::default()
    };
    let block = BlockInfo {
        number: U256::from(100u8),
        chain_id: U256::ONE,
        ..BlockInfo::default()
    };
    TransactionContext::new(transaction, block)
}

/// Constructs a new virtual machine over `code`, reading external state from
/// `provider`.
pub fn new_vm_with_code(code: &[u8], provider: InMemoryProvider) -> anyhow::Result<VM> {
    new_vm(code, provider, Config::default(), LazyWatchdog.in_rc())
}

/// Constructs a new virtual machine over `code` with the provided `config`
/// and `watchdog`.
pub fn new_vm(
    code: &[u8],
    provider: InMemoryProvider,
    config: Config,
    watchdog: DynWatchdog,
) -> anyhow::Result<VM> {
    let instructions = InstructionStream::try_from(code)?;
    let vm = VM::new(
        instructions,
        context(),
        provider.in_rc(),
        StateRegistry::default(),
        config,
        watchdog,
    )?;

    Ok(vm)
}

/// Constructs a new virtual machine with the provided `values` on both stacks,
/// where the last value is the top of the stack.
///
/// Each value enters the symbolic stack as a fresh public input.
pub fn new_vm_with_values_on_stack(values: Vec<U256>) -> anyhow::Result<VM> {
    let code = crate::bytecode![Stop];
    let mut vm = new_vm_with_code(&code, InMemoryProvider::new())?;
    for value in values {
        push_input(&mut vm, value)?;
    }

    Ok(vm)
}

/// Pushes `value` onto both stacks, minting its symbol as a public input.
pub fn push_input(vm: &mut VM, value: U256) -> anyhow::Result<DataPt> {
    let symbol = add_wire_to_in_buffer(vm.registry_mut(), PlacementId::PUB_IN, value, 32, None, 0)?;
    vm.state_mut().stack_mut().push(value)?;
    vm.symbolic_mut().stack_mut().push(symbol.clone())?;

    Ok(symbol)
}

/// Gets the top of the concrete and symbolic stacks.
pub fn top(vm: &VM) -> anyhow::Result<(U256, DataPt)> {
    let concrete = *vm.state().stack().read(0)?;
    let symbolic = vm.symbolic().stack().read(0)?.clone();

    Ok((concrete, symbolic))
}
