//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use anyhow::anyhow;
use ethnum::U256;
use evm_synthesizer as synth;
use evm_synthesizer::{
    provider::InMemoryProvider,
    synthesizer::InitialSynthesizer,
    transaction::{Address, BlockInfo, Transaction, TransactionContext},
    vm,
    watchdog::LazyWatchdog,
};

/// The account whose code every test transaction calls.
#[allow(unused)] // It is actually
pub const CONTRACT: u64 = 0xc0de;

/// Installs a subscriber that prints the library's logs when a test fails.
#[allow(unused)] // It is actually
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Builds the context of a transaction calling [`CONTRACT`] with `value` and
/// `calldata`.
#[allow(unused)] // It is actually
pub fn context(value: U256, calldata: Vec<u8>) -> TransactionContext {
    let transaction = Transaction {
        origin: Address::from(0xeeu64),
        caller: Address::from(0xca11u64),
        to: Address::from(CONTRACT),
        value,
        calldata,
        gas_limit: 10_000_000,
        ..Default::default()
    };
    let block = BlockInfo {
        number: U256::from(1_000u16),
        chain_id: U256::ONE,
        ..Default::default()
    };
    TransactionContext::new(transaction, block)
}

/// Constructs a new synthesizer for a call to [`CONTRACT`] whose code is the
/// hex-encoded (with or without the `0x` prefix) string `code`, with the state
/// in `provider`.
///
/// It uses the default configurations for the synthesizer.
#[allow(unused)] // It is actually
pub fn new_synthesizer_from_bytecode(
    code: impl Into<String>,
    provider: InMemoryProvider,
    context: TransactionContext,
) -> anyhow::Result<InitialSynthesizer> {
    let bytecode = get_bytecode_from_string(code)?;
    new_synthesizer(bytecode, provider, context)
}

/// Constructs a new synthesizer for a call to [`CONTRACT`] whose code is
/// `bytecode`, with the state in `provider`.
#[allow(unused)] // It is actually
pub fn new_synthesizer(
    bytecode: Vec<u8>,
    provider: InMemoryProvider,
    context: TransactionContext,
) -> anyhow::Result<InitialSynthesizer> {
    init_logging();
    let provider = provider.with_code(Address::from(CONTRACT), bytecode).in_rc();
    Ok(synth::new(
        context,
        provider,
        vm::Config::default(),
        LazyWatchdog.in_rc(),
    ))
}

/// Gets the contract bytecode from the provided hex-encoded string `code`.
///
/// This hex-encoded string may or may not start with the `0x` prefix. Both
/// cases will be handled.
pub fn get_bytecode_from_string(code: impl Into<String>) -> anyhow::Result<Vec<u8>> {
    let bytecode_string = code.into();
    // Remove the 0x if it is present
    let no_0x_prefix = match bytecode_string.strip_prefix("0x") {
        Some(no_0x_prefix) => no_0x_prefix,
        None => &bytecode_string,
    };

    let bytecode = hex::decode(no_0x_prefix).map_err(|_| anyhow!("Could not decode hex"))?;
    Ok(bytecode)
}
