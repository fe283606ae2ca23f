//! This module contains the dual virtual machine, which executes each
//! instruction twice: once concretely to obtain the ground-truth values, and
//! once symbolically to record the placements that compute them.

pub mod state;

use ethnum::U256;
use itertools::Itertools;
use tracing::{trace, warn};

use crate::{
    constant::{BLOCK_GAS_LIMIT, DEFAULT_MAXIMUM_STEPS, MAX_MEMORY_SIZE_BYTES},
    disassembly::{ExecutionThread, InstructionStream},
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    opcode::Opcode,
    provider::DynProvider,
    synthesis::{
        operation::ExpIterations,
        registry::StateRegistry,
        symbol::DataPt,
        SymbolicState,
    },
    transaction::{Address, TransactionContext},
    vm::state::{stack::LocatedStackHandle, VMState},
    watchdog::DynWatchdog,
};

/// The virtual machine used to co-execute the transaction concretely and
/// symbolically.
///
/// After every instruction the symbolic stack has the same depth as the
/// concrete stack, and the symbol at each position carries the value at the
/// same position of the concrete stack. Any divergence is reported as an
/// error.
#[derive(Clone, Debug)]
pub struct VM {
    /// The instructions that are being executed by this virtual machine.
    instructions: InstructionStream,

    /// The position of execution in `instructions`.
    thread: ExecutionThread,

    /// The transaction being executed.
    context: TransactionContext,

    /// The source of external state.
    provider: DynProvider,

    /// The bytes of the code being executed.
    code: Vec<u8>,

    /// The ground-truth state.
    state: VMState,

    /// The symbols mirroring `state`.
    symbolic: SymbolicState,

    /// The owner of every placement recorded during execution.
    registry: StateRegistry,

    /// The configuration of the virtual machine.
    config: Config,

    /// A watchdog that gets polled at intervals to check whether execution
    /// needs to stop.
    watchdog: DynWatchdog,

    /// The destination of a jump taken by the current instruction.
    pending_jump: Option<u32>,

    /// How execution halted, once it has.
    halt: Option<Halt>,

    /// The number of instructions executed so far.
    steps: usize,
}

impl VM {
    /// Constructs a new virtual machine that executes the provided
    /// `instructions` as the code of the account called by `context`.
    ///
    /// All placements are recorded into `registry`, which must not have been
    /// used for any other transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the virtual machine could not be constructed.
    pub fn new(
        instructions: InstructionStream,
        context: TransactionContext,
        provider: DynProvider,
        registry: StateRegistry,
        config: Config,
        watchdog: DynWatchdog,
    ) -> Result<Self> {
        let thread = instructions.new_thread(0)?;
        let code = instructions.as_bytecode();
        let state = VMState::new(
            context.transaction.to,
            provider.clone(),
            config.memory_size_limit,
        );
        let symbolic = SymbolicState::new();

        Ok(Self {
            instructions,
            thread,
            context,
            provider,
            code,
            state,
            symbolic,
            registry,
            config,
            watchdog,
            pending_jump: None,
            halt: None,
            steps: 0,
        })
    }

    /// Executes the transaction until it halts.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] at the first instruction that fails to execute on
    /// either side, when the concrete and symbolic states diverge, when a
    /// gas or step limit is exceeded, or when the watchdog requests a stop.
    /// Execution cannot be resumed after an error.
    pub fn execute(&mut self) -> Result<()> {
        let poll_interval = self.watchdog.poll_every().max(1);
        let gas_limit = self.gas_limit();
        let mut counter: usize = 0;

        while self.halt.is_none() {
            let instruction_pointer = self.instruction_pointer();

            // If we have been told to stop, stop and return an error.
            if counter % poll_interval == 0 && self.watchdog.should_stop() {
                warn!(instruction_pointer, steps = self.steps, "Stopped by the watchdog");
                return Err(Error::StoppedByWatchdog.locate(instruction_pointer));
            }
            if self.steps >= self.config.maximum_steps {
                return Err(Error::StepLimitExceeded {
                    limit: self.config.maximum_steps,
                }
                .locate(instruction_pointer));
            }

            let instruction = self.thread.current();
            let cost = instruction.min_gas_cost();
            if self.state.gas_used().saturating_add(cost) > gas_limit {
                return Err(Error::GasLimitExceeded.locate(instruction_pointer));
            }

            self.dispatch(instruction.as_ref())?;
            self.state.consume_gas(cost);
            self.steps += 1;
            counter += 1;

            trace!(
                instruction_pointer,
                opcode = %instruction.as_text_code(),
                gas_used = self.state.gas_used(),
                stack_depth = self.state.stack().depth(),
                "Executed instruction"
            );

            if self.halt.is_none() {
                self.advance(instruction.as_ref())?;
            }
        }

        Ok(())
    }

    /// Executes both halves of `opcode` at the current instruction pointer,
    /// and checks that the concrete and symbolic stacks still agree.
    ///
    /// This neither moves the instruction pointer nor charges gas.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either half fails, or if the stacks disagree
    /// afterwards.
    pub fn dispatch(&mut self, opcode: &dyn Opcode) -> Result<Step> {
        let instruction_pointer = self.instruction_pointer();
        let inputs = self
            .state
            .stack()
            .peek_many(opcode.arg_count())
            .locate(instruction_pointer)?;

        opcode.execute(self)?;

        let outputs = self
            .state
            .stack()
            .peek_many(opcode.ret_count())
            .locate(instruction_pointer)?;
        let step = Step {
            instruction_pointer,
            inputs,
            outputs,
        };

        opcode.synthesize(self, &step)?;
        self.check_consistency(instruction_pointer)?;

        Ok(step)
    }

    /// Checks that the symbolic stack mirrors the concrete stack exactly.
    fn check_consistency(&self, instruction_pointer: u32) -> Result<()> {
        let concrete = self.state.stack();
        let symbolic = self.symbolic.stack();
        if concrete.depth() != symbolic.depth() {
            return Err(Error::StackLengthMismatch {
                concrete: concrete.depth(),
                symbolic: symbolic.depth(),
            }
            .locate(instruction_pointer));
        }

        let pairs = concrete.iter_from_top().zip_eq(symbolic.iter_from_top());
        for (depth, (value, symbol)) in pairs.enumerate() {
            if *value != symbol.value() {
                return Err(Error::ConsistencyViolation {
                    depth,
                    concrete: *value,
                    symbolic: symbol.value(),
                }
                .locate(instruction_pointer));
            }
        }

        Ok(())
    }

    /// Moves to the next instruction, or to the destination of a jump taken
    /// by the instruction that just executed.
    ///
    /// Running off the end of the code halts execution as if by `STOP`.
    fn advance(&mut self, instruction: &dyn Opcode) -> Result<()> {
        let instruction_pointer = self.instruction_pointer();
        if let Some(target) = self.pending_jump.take() {
            let available = self.instructions.len();
            return self
                .thread
                .jump(target)
                .map(|_| ())
                .ok_or(Error::InstructionPointerOutOfBounds {
                    requested: target as usize,
                    available,
                })
                .locate(instruction_pointer);
        }

        // Immediates are padded with no-ops, so this skips straight past them.
        let width = i64::try_from(instruction.encode().len().max(1)).unwrap_or(i64::MAX);
        if self.thread.jump_by(width).is_none() {
            self.halt = Some(Halt::Stop);
        }

        Ok(())
    }

    /// Gets a handle for the concrete stack that locates any errors at the
    /// current instruction pointer.
    pub fn stack_handle(&mut self) -> LocatedStackHandle<'_, U256> {
        let instruction_pointer = self.instruction_pointer();
        self.state.stack_mut().new_located(instruction_pointer)
    }

    /// Gets a handle for the symbolic stack that locates any errors at the
    /// current instruction pointer.
    pub fn symbolic_stack_handle(&mut self) -> LocatedStackHandle<'_, DataPt> {
        let instruction_pointer = self.instruction_pointer();
        self.symbolic.stack_mut().new_located(instruction_pointer)
    }

    /// Gets the byte offset of the instruction being executed.
    #[must_use]
    pub fn instruction_pointer(&self) -> u32 {
        self.thread.instruction_pointer()
    }

    /// Gets the concrete state.
    #[must_use]
    pub fn state(&self) -> &VMState {
        &self.state
    }

    /// Gets the concrete state.
    pub fn state_mut(&mut self) -> &mut VMState {
        &mut self.state
    }

    /// Gets the symbolic state.
    #[must_use]
    pub fn symbolic(&self) -> &SymbolicState {
        &self.symbolic
    }

    /// Gets the symbolic state.
    pub fn symbolic_mut(&mut self) -> &mut SymbolicState {
        &mut self.symbolic
    }

    /// Gets the registry of placements.
    #[must_use]
    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Gets the registry of placements.
    pub fn registry_mut(&mut self) -> &mut StateRegistry {
        &mut self.registry
    }

    /// Gets the registry and the symbolic state at once, for operations that
    /// read symbolic memory while recording placements.
    pub fn synthesis_parts_mut(&mut self) -> (&mut StateRegistry, &mut SymbolicState) {
        (&mut self.registry, &mut self.symbolic)
    }

    /// Gets the transaction being executed.
    #[must_use]
    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    /// Gets the source of external state.
    #[must_use]
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Gets the address of the account whose code is executing.
    #[must_use]
    pub fn address(&self) -> Address {
        self.context.transaction.to
    }

    /// Gets the bytes of the code being executed.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Gets a reference to the virtual machine's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the gas available to execution.
    ///
    /// This is the configured override if there is one, and otherwise the gas
    /// limit of the transaction, where a limit of zero means the block gas
    /// limit.
    #[must_use]
    pub fn gas_limit(&self) -> usize {
        match (self.config.gas_limit_override, self.context.transaction.gas_limit) {
            (Some(limit), _) => limit,
            (None, 0) => BLOCK_GAS_LIMIT,
            (None, limit) => limit,
        }
    }

    /// Gets the gas that remains after the instructions executed so far.
    #[must_use]
    pub fn gas_remaining(&self) -> usize {
        self.gas_limit().saturating_sub(self.state.gas_used())
    }

    /// Gets a reference to the virtual machine's watchdog instance.
    #[must_use]
    pub fn watchdog(&self) -> &DynWatchdog {
        &self.watchdog
    }

    /// Directs execution to continue at `target` after the current
    /// instruction. The target must already have been validated.
    pub fn jump_to(&mut self, target: u32) {
        self.pending_jump = Some(target);
    }

    /// Halts execution after the current instruction.
    pub fn halt_with(&mut self, halt: Halt) {
        self.halt = Some(halt);
    }

    /// Gets how execution halted, if it has.
    #[must_use]
    pub fn halt(&self) -> Option<&Halt> {
        self.halt.as_ref()
    }

    /// Gets the instruction stream associated with this virtual machine.
    #[must_use]
    pub fn instructions(&self) -> &InstructionStream {
        &self.instructions
    }

    /// Gets the number of instructions executed so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Consumes the virtual machine to convert it into the data necessary for
    /// finalization.
    #[must_use]
    pub fn consume(self) -> ExecutionResult {
        ExecutionResult {
            instructions: self.instructions,
            registry:     self.registry,
            state:        self.state,
            symbolic:     self.symbolic,
            halt:         self.halt,
            steps:        self.steps,
        }
    }
}

/// The concrete effect of executing a single instruction, as seen by its
/// symbolic half.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Step {
    /// The byte offset of the instruction.
    pub instruction_pointer: u32,

    /// The operands of the instruction before it executed, starting from the
    /// top of the stack.
    pub inputs: Vec<U256>,

    /// The items that the instruction left at the top of the stack, starting
    /// from the top.
    pub outputs: Vec<U256>,
}

/// The ways in which execution halts successfully.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Halt {
    /// Execution stopped without returning data.
    Stop,

    /// Execution returned `data`.
    Return { data: Vec<u8> },
}

/// The outcome of a complete execution.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// The instructions that were executed.
    pub instructions: InstructionStream,

    /// Every placement recorded during execution.
    pub registry: StateRegistry,

    /// The concrete state at the point of halting.
    pub state: VMState,

    /// The symbolic state at the point of halting.
    pub symbolic: SymbolicState,

    /// How execution halted, which is [`None`] if it never did.
    pub halt: Option<Halt>,

    /// The number of instructions executed.
    pub steps: usize,
}

/// The configuration for the virtual machine instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum amount of gas that execution can consume, overriding the
    /// limit given by the transaction.
    ///
    /// Only the static cost of each opcode is charged.
    ///
    /// Defaults to [`None`].
    pub gas_limit_override: Option<usize>,

    /// The maximum number of instructions that will be executed.
    ///
    /// Defaults to [`DEFAULT_MAXIMUM_STEPS`].
    pub maximum_steps: usize,

    /// The maximum size in bytes that memory may grow to.
    ///
    /// Defaults to [`MAX_MEMORY_SIZE_BYTES`].
    pub memory_size_limit: usize,

    /// How many square-and-multiply steps to record for `EXP`.
    ///
    /// Defaults to [`ExpIterations::BitLength`].
    pub exp_iterations: ExpIterations,
}

impl Config {
    /// Sets the `gas_limit_override` config parameter to `value`.
    #[must_use]
    pub fn with_gas_limit(mut self, value: usize) -> Self {
        self.gas_limit_override = Some(value);
        self
    }

    /// Sets the `maximum_steps` config parameter to `value`.
    #[must_use]
    pub fn with_maximum_steps(mut self, value: usize) -> Self {
        self.maximum_steps = value;
        self
    }

    /// Sets the `memory_size_limit` config parameter to `value`.
    #[must_use]
    pub fn with_memory_size_limit(mut self, value: usize) -> Self {
        self.memory_size_limit = value;
        self
    }

    /// Sets the `exp_iterations` config parameter to `value`.
    #[must_use]
    pub fn with_exp_iterations(mut self, value: ExpIterations) -> Self {
        self.exp_iterations = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let gas_limit_override = None;
        let maximum_steps = DEFAULT_MAXIMUM_STEPS;
        let memory_size_limit = MAX_MEMORY_SIZE_BYTES;
        let exp_iterations = ExpIterations::default();
        Self {
            gas_limit_override,
            maximum_steps,
            memory_size_limit,
            exp_iterations,
        }
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        bytecode,
        error::execution::{Error, LocatedError},
        opcode::{
            control::{Invalid, Jump, JumpDest, JumpI, Return, Stop},
            memory::{DupN, MStore, Push0, PushN},
            test_util as util,
        },
        provider::InMemoryProvider,
        synthesis::{placement::PlacementId, symbol::DataPt},
        vm::{Config, Halt},
        watchdog::{LazyWatchdog, PollCountWatchdog},
    };

    #[test]
    fn executes_straight_line_code() -> anyhow::Result<()> {
        let bytes = bytecode![
            PushN::new(1, vec![0x2a])?, // The value to store
            PushN::new(1, vec![0x00])?, // The offset to store it at
            MStore,                     // Store it to memory
            PushN::new(1, vec![0x20])?, // The size of the data to return
            PushN::new(1, vec![0x00])?, // The offset of the data to return
            Return                      // Return the stored word
        ];
        let mut vm = util::new_vm_with_code(&bytes, InMemoryProvider::new())?;
        vm.execute()?;

        let mut expected = vec![0u8; 32];
        expected[31] = 0x2a;
        assert_eq!(vm.halt(), Some(&Halt::Return { data: expected }));
        assert_eq!(vm.steps(), 6);
        assert_eq!(vm.state().gas_used(), 3 * 5);

        // Four distinct immediates go in and one word comes out, and the read
        // of the stored word needs no placements.
        let pub_in = vm.registry().placement(PlacementId::PUB_IN).expect("Buffer missing");
        assert_eq!(pub_in.out_pts().len(), 4);
        let pub_out = vm.registry().placement(PlacementId::PUB_OUT).expect("Buffer missing");
        assert_eq!(pub_out.out_pts().len(), 1);
        assert_eq!(pub_out.in_pts()[0].value(), U256::from(0x2au8));
        assert_eq!(vm.registry().placement_count(), 4);

        Ok(())
    }

    #[test]
    fn takes_conditional_jumps() -> anyhow::Result<()> {
        let bytes = bytecode![
            PushN::new(1, vec![0x01])?, // The condition
            PushN::new(1, vec![0x06])?, // The jump destination
            JumpI,                      // Jump as the condition holds
            Invalid::default(),         // Skipped
            JumpDest,                   // The destination of the jump
            Stop
        ];
        let mut vm = util::new_vm_with_code(&bytes, InMemoryProvider::new())?;
        vm.execute()?;

        assert_eq!(vm.halt(), Some(&Halt::Stop));
        assert_eq!(vm.steps(), 5);
        assert!(vm.state().stack().is_empty());
        assert!(vm.symbolic().stack().is_empty());

        Ok(())
    }

    #[test]
    fn rejects_jumps_into_push_data() -> anyhow::Result<()> {
        let bytes = bytecode![
            PushN::new(1, vec![0x01])?, // The jump destination is push data
            Jump,
            JumpDest
        ];
        let mut vm = util::new_vm_with_code(&bytes, InMemoryProvider::new())?;
        let error = vm.execute().expect_err("Jumped into push data");
        assert_eq!(
            error,
            LocatedError {
                location: 2,
                payload:  Error::InvalidJumpTarget { offset: 1 },
            }
        );

        Ok(())
    }

    #[test]
    fn running_off_the_end_stops() -> anyhow::Result<()> {
        let bytes = bytecode![PushN::new(1, vec![0x01])?];
        let mut vm = util::new_vm_with_code(&bytes, InMemoryProvider::new())?;
        vm.execute()?;

        assert_eq!(vm.halt(), Some(&Halt::Stop));
        assert_eq!(vm.state().stack().depth(), 1);

        Ok(())
    }

    #[test]
    fn invalid_instructions_are_errors() -> anyhow::Result<()> {
        let bytes = bytecode![Push0, Invalid::new(0xef)];
        let mut vm = util::new_vm_with_code(&bytes, InMemoryProvider::new())?;
        let error = vm.execute().expect_err("Executed an invalid instruction");
        assert_eq!(error.location, 1);
        assert_eq!(error.payload, Error::InvalidInstruction { byte: 0xef });

        Ok(())
    }

    #[test]
    fn enforces_the_gas_limit() -> anyhow::Result<()> {
        let bytes = bytecode![Push0, Push0, Push0];
        let config = Config::default().with_gas_limit(5);
        let mut vm = util::new_vm(&bytes, InMemoryProvider::new(), config, LazyWatchdog.in_rc())?;

        let error = vm.execute().expect_err("Gas limit was not enforced");
        assert_eq!(error.location, 2);
        assert_eq!(error.payload, Error::GasLimitExceeded);
        assert_eq!(vm.gas_remaining(), 1);

        Ok(())
    }

    #[test]
    fn enforces_the_step_limit() -> anyhow::Result<()> {
        let bytes = bytecode![JumpDest, Push0, Jump];
        let config = Config::default().with_maximum_steps(10);
        let mut vm = util::new_vm(&bytes, InMemoryProvider::new(), config, LazyWatchdog.in_rc())?;

        let error = vm.execute().expect_err("Step limit was not enforced");
        assert_eq!(error.payload, Error::StepLimitExceeded { limit: 10 });
        assert_eq!(vm.steps(), 10);

        Ok(())
    }

    #[test]
    fn stops_when_the_watchdog_asks() -> anyhow::Result<()> {
        let bytes = bytecode![JumpDest, Push0, Jump];
        let watchdog = PollCountWatchdog::new(4).in_rc();
        let mut vm = util::new_vm(&bytes, InMemoryProvider::new(), Config::default(), watchdog)?;

        let error = vm.execute().expect_err("Watchdog was not polled");
        assert_eq!(error.payload, Error::StoppedByWatchdog);
        assert_eq!(vm.steps(), 4);

        Ok(())
    }

    #[test]
    fn detects_divergent_stacks() -> anyhow::Result<()> {
        let mut vm = util::new_vm_with_values_on_stack(vec![])?;
        vm.state_mut().stack_mut().push(U256::ONE)?;
        vm.symbolic_mut().stack_mut().push(DataPt::word(U256::from(2u8)))?;
        let error = vm.dispatch(&DupN::new(1)?).expect_err("Divergence was missed");
        assert_eq!(
            error.payload,
            Error::ConsistencyViolation {
                depth:    0,
                concrete: U256::ONE,
                symbolic: U256::from(2u8),
            }
        );

        let mut vm = util::new_vm_with_values_on_stack(vec![])?;
        vm.state_mut().stack_mut().push(U256::ONE)?;
        let error = vm.dispatch(&Push0).expect_err("Divergence was missed");
        assert_eq!(
            error.payload,
            Error::StackLengthMismatch {
                concrete: 2,
                symbolic: 1,
            }
        );

        Ok(())
    }
}
