//! This module contains the state tracking functionality for the synthesizer.

use std::fmt::Debug;

use crate::{
    disassembly::InstructionStream,
    finalize::output::Artifacts,
    provider::DynProvider,
    synthesis::subcircuit::SubcircuitLibrary,
    vm,
    vm::{ExecutionResult, Halt, VM},
    watchdog::DynWatchdog,
};

/// A marker trait that says that the type implementing it is a synthesizer
/// state.
///
/// Synthesizer states can be transitioned between as part of the
/// [`crate::synthesizer::Synthesizer`] state machine, and are intended to
/// enforce that correct state transitions take place.
pub trait State
where
    Self: Debug + Sized,
{
}

/// The initial state for the synthesizer.
#[derive(Debug)]
pub struct HasTransaction {
    /// The source of the code and of all external state.
    pub provider: DynProvider,

    /// The virtual machine configuration.
    pub vm_config: vm::Config,

    /// The subcircuit templates that placements are checked against.
    pub library: SubcircuitLibrary,

    /// The watchdog that is monitoring the progress of the synthesizer.
    pub watchdog: DynWatchdog,
}
impl State for HasTransaction {}

/// The state for a synthesizer that has successfully disassembled the code of
/// the called account.
#[derive(Debug)]
pub struct DisassemblyComplete {
    /// The disassembled code of the called account.
    pub bytecode: InstructionStream,

    /// The source of all external state.
    pub provider: DynProvider,

    /// The configuration for the synthesizer's virtual machine.
    pub vm_config: vm::Config,

    /// The subcircuit templates that placements are checked against.
    pub library: SubcircuitLibrary,

    /// The watchdog that is monitoring the progress of the synthesizer.
    pub watchdog: DynWatchdog,
}
impl State for DisassemblyComplete {}

/// The synthesizer has prepared the virtual machine to co-execute the
/// transaction.
#[derive(Debug)]
pub struct VMReady {
    /// The virtual machine, prepared with the transaction and ready to
    /// execute.
    pub vm: VM,
}
impl State for VMReady {}

#[derive(Debug)]
pub struct ExecutionComplete {
    /// The result from executing the transaction.
    pub execution_result: ExecutionResult,
}
impl State for ExecutionComplete {}

/// The synthesizer has finalized the recorded placements into the artifacts
/// for the prover.
#[derive(Debug)]
pub struct Finalized {
    /// The prover's artifacts.
    pub artifacts: Artifacts,

    /// How execution halted.
    pub halt: Option<Halt>,

    /// The number of instructions that were executed.
    pub steps: usize,
}
impl State for Finalized {}
