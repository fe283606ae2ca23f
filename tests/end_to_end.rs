//! This module is an integration test that synthesizes small, hand-assembled
//! transactions from beginning to end and inspects the recorded placements and
//! the final artifacts.
#![cfg(test)]

use ethnum::U256;
use evm_synthesizer as synth;
use evm_synthesizer::{
    arith::ArithOp,
    bytecode,
    error::execution::Category,
    finalize::{output::Artifacts, witness::NativeBackend},
    opcode::{control::*, environment::*, memory::*},
    provider::InMemoryProvider,
    synthesis::{operation::ExpIterations, placement::PlacementId, subcircuit},
    synthesizer::InitialSynthesizer,
    transaction::Address,
    vm,
    vm::ExecutionResult,
    watchdog::LazyWatchdog,
};

mod common;

/// Runs `code` up to the end of execution, returning the execution result.
fn execute(code: Vec<u8>, provider: InMemoryProvider) -> anyhow::Result<ExecutionResult> {
    let synthesizer =
        common::new_synthesizer(code, provider, common::context(U256::ZERO, vec![]))?;
    let synthesizer = synthesizer.disassemble()?.prepare_vm()?.execute()?;
    Ok(synthesizer.execution_result().clone())
}

/// Creates a synthesizer for a call to `code` without value, call data or
/// storage.
fn plain_synthesizer(code: Vec<u8>) -> anyhow::Result<InitialSynthesizer> {
    common::new_synthesizer(code, InMemoryProvider::new(), common::context(U256::ZERO, vec![]))
}

/// Creates a synthesizer for a call to `code` with `calldata` and no value or
/// storage.
fn call_synthesizer(code: &str, calldata: Vec<u8>) -> anyhow::Result<InitialSynthesizer> {
    common::new_synthesizer_from_bytecode(
        code,
        InMemoryProvider::new(),
        common::context(U256::ZERO, calldata),
    )
}

/// Gets the output of the last `ALU1` placement in `artifacts`.
fn last_alu1_output(artifacts: &Artifacts) -> Option<U256> {
    artifacts
        .witness
        .placements
        .iter()
        .rev()
        .find(|p| p.subcircuit == subcircuit::ALU1)
        .map(|p| p.wires[1].0)
}

/// Gets the values on the concrete stack after execution, from the top.
fn concrete_stack(result: &ExecutionResult) -> Vec<U256> {
    result.state.stack().iter_from_top().copied().collect()
}

#[test]
fn records_an_addition_as_one_alu_placement() -> anyhow::Result<()> {
    // PUSH1 5, PUSH1 10, ADD, STOP
    let code = common::get_bytecode_from_string("0x6005600a0100")?;
    let result = execute(code, InMemoryProvider::new())?;

    assert_eq!(concrete_stack(&result), vec![U256::from(15u8)]);
    assert_eq!(result.registry.placement_count(), 5);

    let add = result.registry.placement(PlacementId(4)).expect("placement was recorded");
    assert_eq!(add.subcircuit(), subcircuit::ALU1);
    assert_eq!(add.selector(), Some(U256::ONE << 1u32));
    assert_eq!(add.selector(), Some(ArithOp::Add.selector()));
    let inputs: Vec<U256> = add.in_pts().iter().map(|pt| pt.value()).collect();
    assert_eq!(inputs, vec![U256::from(2u8), U256::from(10u8), U256::from(5u8)]);
    assert_eq!(add.out_pts().len(), 1);
    assert_eq!(add.out_pts()[0].value(), U256::from(15u8));

    Ok(())
}

#[test]
fn repeated_storage_reads_reuse_one_private_input() -> anyhow::Result<()> {
    // PUSH1 0, SLOAD, PUSH1 0, SLOAD, STOP
    let code = common::get_bytecode_from_string("600054600054")?;
    let provider = InMemoryProvider::new().with_storage(
        Address::from(common::CONTRACT),
        U256::ZERO,
        U256::from(21u8),
    );
    let result = execute(code, provider)?;

    let symbols: Vec<_> = result.symbolic.stack().iter_from_top().collect();
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0], symbols[1]);
    assert_eq!(symbols[0].value(), U256::from(21u8));

    let private_inputs = result.registry.placement(PlacementId::PRV_IN).expect("buffer exists");
    assert_eq!(private_inputs.out_pts().len(), 1);

    Ok(())
}

#[test]
fn loading_untouched_memory_places_nothing() -> anyhow::Result<()> {
    // PUSH1 0x40, MLOAD, STOP
    let code = common::get_bytecode_from_string("60405100")?;
    let result = execute(code, InMemoryProvider::new())?;

    assert_eq!(concrete_stack(&result), vec![U256::ZERO]);
    assert_eq!(result.registry.placement_count(), 4);

    Ok(())
}

#[test]
fn covered_writes_pass_the_latest_symbol_through() -> anyhow::Result<()> {
    let x = U256::from_be_bytes([0xaa; 32]);
    let y = U256::from_be_bytes([0xbb; 32]);
    let code = bytecode![
        PushN::new(32, x.to_be_bytes().to_vec())?,
        PushN::new(1, vec![0x10])?,
        MStore,
        PushN::new(32, y.to_be_bytes().to_vec())?,
        PushN::new(1, vec![0x00])?,
        MStore,
        PushN::new(1, vec![0x00])?,
        MLoad,
        Stop
    ];
    let result = execute(code, InMemoryProvider::new())?;

    assert_eq!(concrete_stack(&result), vec![y]);
    assert_eq!(result.registry.placement_count(), 4);

    Ok(())
}

#[test]
fn misaligned_reads_combine_overlapping_writes() -> anyhow::Result<()> {
    let y_bytes: [u8; 32] = std::array::from_fn(|i| i as u8 + 1);
    let x_bytes: [u8; 32] = std::array::from_fn(|i| i as u8 + 0xa1);
    let code = bytecode![
        PushN::new(32, y_bytes.to_vec())?,
        PushN::new(1, vec![0x00])?,
        MStore,
        PushN::new(32, x_bytes.to_vec())?,
        PushN::new(1, vec![0x10])?,
        MStore,
        PushN::new(1, vec![0x08])?,
        MLoad,
        Stop
    ];

    let mut flat = [0u8; 0x30];
    flat[0x00..0x20].copy_from_slice(&y_bytes);
    flat[0x10..0x30].copy_from_slice(&x_bytes);
    let mut expected = [0u8; 32];
    expected.copy_from_slice(&flat[0x08..0x28]);

    let synthesizer = plain_synthesizer(code)?;
    let synthesizer = synthesizer.disassemble()?.prepare_vm()?.execute()?;
    let result = synthesizer.execution_result();
    assert_eq!(concrete_stack(result), vec![U256::from_be_bytes(expected)]);

    // Two shifts, a mask and a combination at least.
    assert!(result.registry.placement_count() >= 4 + 4);

    // The reconstruction must also be provable.
    let synthesizer = synthesizer.finalize(&NativeBackend)?;
    assert!(!synthesizer.artifacts().topology.cycles.is_empty());

    Ok(())
}

#[test]
fn produces_consistent_artifacts() -> anyhow::Result<()> {
    let code = bytecode![
        PushN::new(1, vec![0x00])?,
        SLoad,
        CallValue,
        evm_synthesizer::opcode::arithmetic::Add,
        PushN::new(1, vec![0x00])?,
        MStore,
        PushN::new(1, vec![0x20])?,
        PushN::new(1, vec![0x00])?,
        Return
    ];
    let provider = InMemoryProvider::new().with_storage(
        Address::from(common::CONTRACT),
        U256::ZERO,
        U256::from(40u8),
    );
    let synthesizer =
        common::new_synthesizer(code, provider, common::context(U256::from(2u8), vec![]))?;
    let artifacts = synthesizer.synthesize(&NativeBackend)?;

    // The sum is returned through two public output limbs.
    assert_eq!(artifacts.io.public_output.len(), 2);
    assert_eq!(artifacts.io.public_output[0].0, U256::from(42u8));
    assert_eq!(artifacts.io.public_output[1].0, U256::ZERO);
    assert_eq!(artifacts.io.private_input.len(), 2);
    assert_eq!(artifacts.io.private_input[0].0, U256::from(40u8));

    for cycle in &artifacts.topology.cycles {
        assert!(cycle.len() >= 3);
        assert_eq!(cycle.first(), cycle.last());
    }
    for placement in &artifacts.witness.placements {
        assert_eq!(placement.wires[0].0, U256::ONE);
    }

    let json = artifacts.to_json()?;
    assert_eq!(Artifacts::from_json(&json)?, artifacts);

    Ok(())
}

#[test]
fn division_by_zero_is_not_an_error() -> anyhow::Result<()> {
    // PUSH1 0, PUSH1 7, DIV, STOP
    let code = common::get_bytecode_from_string("600060070400")?;
    let result = execute(code, InMemoryProvider::new())?;
    assert_eq!(concrete_stack(&result), vec![U256::ZERO]);

    Ok(())
}

#[test]
fn reverting_is_reported_as_unsupported() -> anyhow::Result<()> {
    // PUSH1 0, PUSH1 0, REVERT
    let code = common::get_bytecode_from_string("60006000fd")?;
    let synthesizer = plain_synthesizer(code)?;

    let errors = synthesizer.synthesize(&NativeBackend).err().expect("REVERT is unsupported");
    let error = errors.first().expect("one error");
    let error = error.payload.as_execution().expect("execution error");
    assert_eq!(error.category(), Category::Unsupported);

    Ok(())
}

#[test]
fn exponent_chains_follow_the_configured_length() -> anyhow::Result<()> {
    // PUSH1 3, PUSH1 2, EXP, STOP
    let code = common::get_bytecode_from_string("600360020a00")?;

    let result = execute(code.clone(), InMemoryProvider::new())?;
    assert_eq!(concrete_stack(&result), vec![U256::from(8u8)]);
    // One decomposition and one step per significant bit.
    assert_eq!(result.registry.placement_count(), 4 + 1 + 2);

    let context = common::context(U256::ZERO, vec![]);
    let provider = InMemoryProvider::new()
        .with_code(Address::from(common::CONTRACT), code)
        .in_rc();
    let config = vm::Config::default().with_exp_iterations(ExpIterations::WorstCase);
    let synthesizer = synth::new(context, provider, config, LazyWatchdog.in_rc())
        .disassemble()?
        .prepare_vm()?
        .execute()?;
    let registry = &synthesizer.execution_result().registry;
    assert_eq!(registry.placement_count(), 4 + 1 + 256);

    let synthesizer = synthesizer.finalize(&NativeBackend)?;
    assert_eq!(synthesizer.artifacts().witness.placements.len(), 4 + 1 + 256);

    Ok(())
}

#[test]
fn custom_libraries_constrain_synthesis() -> anyhow::Result<()> {
    let library = subcircuit::SubcircuitLibrary::from_json(
        r#"[
            { "id": 0, "name": "bufferPubIn" },
            { "id": 1, "name": "bufferPubOut" },
            { "id": 2, "name": "bufferPrvIn" },
            { "id": 3, "name": "bufferPrvOut" }
        ]"#,
    )?;
    assert_eq!(library.subcircuits().len(), 4);

    // PUSH1 5, PUSH1 10, ADD, STOP
    let code = common::get_bytecode_from_string("6005600a0100")?;
    let synthesizer = plain_synthesizer(code)?.with_library(library);

    let errors = synthesizer.synthesize(&NativeBackend).err().expect("ALU1 is missing");
    let error = errors.first().expect("one error");
    assert_eq!(error.location, 4);
    assert!(error.payload.as_execution().is_some());

    Ok(())
}

#[test]
fn public_environment_reaches_the_artifacts() -> anyhow::Result<()> {
    let code = bytecode![Caller, ChainId, evm_synthesizer::opcode::logic::Xor, Pop, Stop];
    let synthesizer = plain_synthesizer(code)?;
    let artifacts = synthesizer.synthesize(&NativeBackend)?;

    let public: Vec<U256> = artifacts.io.public_input.iter().map(|v| v.0).collect();
    assert_eq!(public, vec![
        U256::from(0xca11u16),
        U256::ZERO,
        U256::ONE,
        U256::ZERO
    ]);
    assert!(artifacts.io.private_input.is_empty());

    Ok(())
}

#[test]
fn short_calldata_windows_are_word_operands() -> anyhow::Result<()> {
    // PUSH1 1, CALLDATACOPY(0x1c, 0, 4), MLOAD(0), ADD, STOP
    let code = "0x600160046000601c376000510100";
    let artifacts = call_synthesizer(code, vec![1, 2, 3, 4])?.synthesize(&NativeBackend)?;

    assert_eq!(last_alu1_output(&artifacts), Some(U256::from(0x0102_0305u32)));

    Ok(())
}

#[test]
fn short_code_windows_are_word_operands() -> anyhow::Result<()> {
    // CODECOPY(0x1c, 0, 4), MLOAD(0), PUSH1 1, ADD, STOP
    let code = "0x60046000601c3960005160010100";
    let artifacts = call_synthesizer(code, vec![])?.synthesize(&NativeBackend)?;

    assert_eq!(last_alu1_output(&artifacts), Some(U256::from(0x6004_6001u32)));

    Ok(())
}

#[test]
fn single_bytes_stored_then_loaded_are_provable() -> anyhow::Result<()> {
    // MSTORE8(0x1f, 0xab), MLOAD(0), PUSH1 1, ADD, STOP
    let code = "0x60ab601f5360005160010100";
    let artifacts = call_synthesizer(code, vec![])?.synthesize(&NativeBackend)?;

    assert_eq!(last_alu1_output(&artifacts), Some(U256::from(0xacu8)));

    Ok(())
}

#[test]
fn hashes_of_different_lengths_over_one_byte_differ() -> anyhow::Result<()> {
    // MSTORE8(0x1f, 0xab), KECCAK256(0, 32), KECCAK256(0x1f, 1), STOP
    let code = "0x60ab601f5360206000206001601f2000";
    let synthesizer = call_synthesizer(code, vec![])?;
    let synthesizer = synthesizer.disassemble()?.prepare_vm()?.execute()?;

    let stack = concrete_stack(synthesizer.execution_result());
    assert_eq!(stack.len(), 2);
    assert_ne!(stack[0], stack[1]);
    let symbols: Vec<_> = synthesizer.execution_result().symbolic.stack().iter_from_top().collect();
    assert_eq!(symbols[0].value(), stack[0]);
    assert_eq!(symbols[1].value(), stack[1]);

    let synthesizer = synthesizer.finalize(&NativeBackend)?;
    assert!(!synthesizer.artifacts().witness.placements.is_empty());

    Ok(())
}

#[test]
fn copies_past_the_end_of_calldata_do_not_shadow_real_reads() -> anyhow::Result<()> {
    // CALLDATACOPY(0, 2^256 - 1, 64), CALLDATACOPY(0x40, 0x1f, 32), MLOAD(0x40), STOP
    let code = format!("0x60407f{}6000376020601f60403760405100", "ff".repeat(32));
    let calldata: Vec<u8> = (1..=80).collect();
    let synthesizer = call_synthesizer(&code, calldata.clone())?;
    let synthesizer = synthesizer.disassemble()?.prepare_vm()?.execute()?;

    let expected = U256::from_be_bytes(calldata[0x1f..0x3f].try_into()?);
    assert_eq!(concrete_stack(synthesizer.execution_result()), vec![expected]);
    let loaded = synthesizer.execution_result().symbolic.stack().iter_from_top().next().cloned();
    assert_eq!(loaded.map(|s| s.value()), Some(expected));

    let synthesizer = synthesizer.finalize(&NativeBackend)?;
    assert!(!synthesizer.artifacts().witness.placements.is_empty());

    Ok(())
}
