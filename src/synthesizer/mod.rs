//! This module contains the definition of the synthesizer itself.

pub mod state;

use ethnum::U256;
use tracing::info;

use crate::{
    disassembly::InstructionStream,
    error,
    error::{container::Locatable, execution},
    finalize,
    finalize::{output::Artifacts, witness::WitnessBackend},
    provider::DynProvider,
    synthesis::{registry::StateRegistry, subcircuit::SubcircuitLibrary},
    synthesizer::state::State,
    transaction::TransactionContext,
    vm,
    vm::{ExecutionResult, Halt, VM},
    watchdog::DynWatchdog,
};

/// Creates a new synthesizer for the transaction described by `context`,
/// reading external state from `provider` and with the provided `vm_config`.
///
/// The synthesizer starts out with the standard subcircuit library, which can
/// be replaced using [`Synthesizer::with_library`].
#[must_use]
pub fn new(
    context: TransactionContext,
    provider: DynProvider,
    vm_config: vm::Config,
    watchdog: DynWatchdog,
) -> Synthesizer<state::HasTransaction> {
    let state = state::HasTransaction {
        provider,
        vm_config,
        library: SubcircuitLibrary::standard(),
        watchdog,
    };
    Synthesizer { context, state }
}

/// Creates a new synthesizer for the transaction identified by `hash`, which is
/// resolved through `provider`.
///
/// # Errors
///
/// Returns [`Err`] if the provider cannot resolve the transaction.
pub fn from_hash(
    hash: U256,
    provider: DynProvider,
    vm_config: vm::Config,
    watchdog: DynWatchdog,
) -> error::Result<Synthesizer<state::HasTransaction>> {
    let context = provider
        .transaction(hash)
        .map_err(|e| execution::Error::from(e).locate(0))?;
    info!(%hash, to = %context.transaction.to, "Resolved transaction");

    Ok(new(context, provider, vm_config, watchdog))
}

/// The core of the circuit synthesis, the `Synthesizer` is responsible for
/// ingesting a transaction and outputting the artifacts that the prover needs
/// to prove its execution.
///
/// # Enforcing Valid State Transitions
///
/// The synthesizer enforces that only correct state transitions can occur
/// through use of structs that implement the exact state required by it at any
/// given point.
///
/// There is the [`Self::state`] function that provides access to the state data
/// of whichever state the synthesizer is currently in.
pub struct Synthesizer<S: State> {
    /// The transaction that is being synthesized.
    context: TransactionContext,

    /// The internal state of the synthesizer.
    state: S,
}

/// The safe operations available in all states.
impl<S: State> Synthesizer<S> {
    /// Gets a reference to the transaction being synthesized.
    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    /// Gets an immutable reference to the current state of the synthesizer.
    pub fn state(&self) -> &S {
        &self.state
    }
}

/// Unsafe operations available in all states.
///
/// These operations are capable of **violating the state invariants** of the
/// synthesizer, and must be used with the _utmost_ care.
impl<S: State> Synthesizer<S> {
    /// Gets a mutable reference to the current state of the synthesizer.
    ///
    /// # Safety
    ///
    /// Do not mutate the state instance unless you totally understand the
    /// state that the synthesizer is in, and the implications of doing so.
    pub unsafe fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Forces the synthesizer into the state `NS`, with the value of the state
    /// created by applying `transform` to the synthesizer's current state and
    /// disregarding any safety with regard to state transitions.
    ///
    /// # Safety
    ///
    /// Do not force a state transition for the synthesizer unless you totally
    /// understand the state that the synthesizer is in, and the implications
    /// of doing so.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the provided `transform` returns [`Err`].
    pub unsafe fn transform_state<NS: State>(
        self,
        transform: impl FnOnce(S) -> error::Result<NS>,
    ) -> error::Result<Synthesizer<NS>> {
        let state = transform(self.state)?;
        let context = self.context;

        Ok(Synthesizer { context, state })
    }
}

/// A type that allows the user to easily name the initial state of the
/// synthesizer.
pub type InitialSynthesizer = Synthesizer<state::HasTransaction>;

/// Operations available on a newly-created synthesizer.
impl Synthesizer<state::HasTransaction> {
    /// Replaces the subcircuit library that placements are checked against.
    #[must_use]
    pub fn with_library(mut self, library: SubcircuitLibrary) -> Self {
        self.state.library = library;
        self
    }

    /// Executes the synthesis process from beginning to end, performing all the
    /// intermediate steps automatically and returning the artifacts, with
    /// witnesses computed by `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any step in the process fails.
    pub fn synthesize(self, backend: &dyn WitnessBackend) -> error::Result<Artifacts> {
        let synthesizer = self.disassemble()?;
        let synthesizer = synthesizer.prepare_vm()?;
        let synthesizer = synthesizer.execute()?;
        let synthesizer = synthesizer.finalize(backend)?;

        Ok(synthesizer.into_artifacts())
    }

    /// Fetches the code of the called account and disassembles it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the code cannot be fetched or disassembly fails.
    pub fn disassemble(self) -> error::Result<Synthesizer<state::DisassemblyComplete>> {
        let to = self.context.transaction.to;
        unsafe {
            self.transform_state(|old_state| {
                let code = old_state
                    .provider
                    .code(to)
                    .map_err(|e| execution::Error::from(e).locate(0))?;
                let bytecode = InstructionStream::try_from(code.as_slice())?;
                info!(%to, bytes = code.len(), "Disassembled code");

                Ok(state::DisassemblyComplete {
                    bytecode,
                    provider: old_state.provider,
                    vm_config: old_state.vm_config,
                    library: old_state.library,
                    watchdog: old_state.watchdog,
                })
            })
        }
    }
}

/// Operations available on a synthesizer that has completed the disassembly of
/// the code.
impl Synthesizer<state::DisassemblyComplete> {
    /// Prepares the virtual machine for the co-execution of the transaction,
    /// with a fresh registry over the configured library.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the virtual machine cannot be constructed for some
    /// reason.
    pub fn prepare_vm(self) -> error::Result<Synthesizer<state::VMReady>> {
        let context = self.context.clone();
        unsafe {
            self.transform_state(|old_state| {
                let registry = StateRegistry::new(old_state.library);
                let vm = VM::new(
                    old_state.bytecode,
                    context,
                    old_state.provider,
                    registry,
                    old_state.vm_config,
                    old_state.watchdog,
                )?;
                Ok(state::VMReady { vm })
            })
        }
    }
}

/// Operations available on a synthesizer that has a virtual machine ready to
/// execute the transaction.
impl Synthesizer<state::VMReady> {
    /// Co-executes the transaction on the [`VM`], recording a placement for
    /// every operation whose result is derived from external data.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if execution in the virtual machine fails for any
    /// reason, in which case all recorded placements are discarded.
    pub fn execute(self) -> error::Result<Synthesizer<state::ExecutionComplete>> {
        unsafe {
            self.transform_state(|mut old_state| {
                old_state.vm.execute()?;
                let execution_result = old_state.vm.consume();
                info!(
                    steps = execution_result.steps,
                    placements = execution_result.registry.placement_count(),
                    "Executed transaction"
                );
                Ok(state::ExecutionComplete { execution_result })
            })
        }
    }
}

/// Operations available on a synthesizer whose VM has completed execution of
/// the transaction.
impl Synthesizer<state::ExecutionComplete> {
    /// Gets the results of execution.
    #[must_use]
    pub fn execution_result(&self) -> &ExecutionResult {
        &self.state.execution_result
    }

    /// Turns the recorded placements into the prover's artifacts, computing
    /// witnesses with `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if finalization fails.
    pub fn finalize(
        self,
        backend: &dyn WitnessBackend,
    ) -> error::Result<Synthesizer<state::Finalized>> {
        unsafe {
            self.transform_state(|old_state| {
                let result = old_state.execution_result;
                let artifacts = finalize::finalize(result.registry, backend)?;
                Ok(state::Finalized {
                    artifacts,
                    halt: result.halt,
                    steps: result.steps,
                })
            })
        }
    }
}

/// Operations available on a synthesizer that has finalized its artifacts.
impl Synthesizer<state::Finalized> {
    /// Gets the artifacts for the prover.
    #[must_use]
    pub fn artifacts(&self) -> &Artifacts {
        &self.state.artifacts
    }

    /// Gets how execution halted.
    #[must_use]
    pub fn halt(&self) -> Option<&Halt> {
        self.state.halt.as_ref()
    }

    /// Gets the number of instructions that were executed.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.state.steps
    }

    /// Consumes the synthesizer, returning the artifacts for the prover.
    #[must_use]
    pub fn into_artifacts(self) -> Artifacts {
        self.state.artifacts
    }
}
