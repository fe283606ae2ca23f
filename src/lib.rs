//! This library synthesizes the arithmetic circuit that proves the execution
//! of an [EVM](https://ethereum.org/en/developers/docs/evm/) transaction, and
//! computes the witness that satisfies it.
//!
//! It does not prove anything itself. Its output is the set of artifacts that a
//! PLONK-style prover consumes: the placements of subcircuit templates, the
//! wire-equality permutation that connects them, and the values on every wire.
//!
//! # How it Works
//!
//! From a very high level, synthesis is performed as follows:
//!
//! 1. The code of the called account is fetched from a
//!    [`provider::StateProvider`] and turned into a
//!    [`disassembly::InstructionStream`]. This is a sequence of
//!    [`opcode::Opcode`]s that is equivalent to the bytecode.
//! 2. The instructions are co-executed on the [`vm::VM`]. Each instruction runs
//!    concretely to obtain the real values, and then symbolically to record a
//!    [`synthesis::placement::Placement`] for every operation on values that
//!    entered the circuit through one of the four buffers. After every
//!    instruction the two stacks are checked to agree.
//! 3. The [`finalize`] module cuts every wire into 128-bit limbs, builds the
//!    wire permutation, and computes the witness of every placement with a
//!    [`finalize::witness::WitnessBackend`].
//! 4. The result is a set of [`finalize::output::Artifacts`] that can be
//!    serialized for the prover.
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, it is sufficient to construct a
//! `Synthesizer` and call the `.synthesize` method, passing a witness backend.
//!
//! ```
//! use ethnum::U256;
//! use evm_synthesizer as synth;
//! use evm_synthesizer::{
//!     bytecode,
//!     finalize::witness::NativeBackend,
//!     opcode::{arithmetic::*, control::*, environment::*, memory::*},
//!     provider::InMemoryProvider,
//!     transaction::{Address, BlockInfo, Transaction, TransactionContext},
//!     vm,
//!     watchdog::LazyWatchdog,
//! };
//!
//! let to = Address::from(0x1234u64);
//! let code = bytecode![
//!     PushN::new(1, vec![0x00]).unwrap(), // The storage slot to read
//!     SLoad,                              // A private input
//!     CallValue,                          // A public input
//!     Add,                                // One placement of ALU1
//!     PushN::new(1, vec![0x00]).unwrap(), // The offset in memory to store it at
//!     MStore,                             // Store to memory
//!     PushN::new(1, vec![0x20]).unwrap(), // The size of the data to return
//!     PushN::new(1, vec![0x00]).unwrap(), // The location in memory to return
//!     Return                              // Export the sum as a public output
//! ];
//!
//! let provider = InMemoryProvider::new()
//!     .with_code(to, code)
//!     .with_storage(to, U256::ZERO, U256::from(40u8))
//!     .in_rc();
//! let transaction = Transaction {
//!     to,
//!     value: U256::from(2u8),
//!     gas_limit: 1_000_000,
//!     ..Default::default()
//! };
//! let context = TransactionContext::new(transaction, BlockInfo::default());
//!
//! let artifacts = synth::new(context, provider, vm::Config::default(), LazyWatchdog.in_rc())
//!     .synthesize(&NativeBackend)
//!     .unwrap();
//!
//! assert_eq!(artifacts.io.public_output[0].0, U256::from(42u8));
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod arith;
pub mod constant;
pub mod disassembly;
pub mod error;
pub mod finalize;
pub mod opcode;
pub mod provider;
pub mod synthesis;
pub mod synthesizer;
pub mod transaction;
pub mod utility;
pub mod vm;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use synthesizer::{from_hash, new, Synthesizer};
