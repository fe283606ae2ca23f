//! This module contains constants that are needed throughout the codebase.

/// The maximum size that a contract can have when being deployed on the
/// blockchain.
///
/// This is specified in [EIP-170](https://eips.ethereum.org/EIPS/eip-170).
pub const CONTRACT_MAXIMUM_SIZE_BYTES: usize = 24_576;

/// The maximum amount of gas that can be spent in a given block on the EVM.
pub const BLOCK_GAS_LIMIT: usize = 30_000_000;

/// The maximum size that memory can be within the block gas limit.
///
/// Obtained by solving:
///
/// ```text
/// 3 * a + (a^2 / 512) = 30,000,000
/// ```
pub const MAX_MEMORY_SIZE_WORDS: usize = 123_170;

/// The maximum memory size within the block limit in bytes.
pub const MAX_MEMORY_SIZE_BYTES: usize = MAX_MEMORY_SIZE_WORDS * WORD_SIZE_BYTES;

/// The base byte value for the `PUSH` opcode, for `N > 0`.
///
/// This is constructed such that for `PUSHN`, `PUSH_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `PUSH` opcode.
pub const PUSH_OPCODE_BASE_VALUE: u8 = 0x5f;

/// The base byte value for the `DUP` opcode.
///
/// This is constructed such that for `DUPN`, `DUP_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `DUP` opcode.
pub const DUP_OPCODE_BASE_VALUE: u8 = 0x7f;

/// The base byte value for the `SWAP` opcode.
///
/// This is constructed such that for `SWAPN`, `SWAP_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `SWAP` opcode.
pub const SWAP_OPCODE_BASE_VALUE: u8 = 0x8f;

/// The base byte value for the `LOG` opcode.
///
/// This is constructed such that for `LOGN`, `LOG_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `LOG` opcode.
pub const LOG_OPCODE_BASE_VALUE: u8 = 0xa0;

/// The maximum number of bytes that can be pushed at once using the `PUSH`
/// opcode.
pub const PUSH_OPCODE_MAX_BYTES: u8 = 32;

/// The maximum stack depth for the EVM.
pub const MAXIMUM_STACK_DEPTH: usize = 1024;

/// The width of word on the EVM in bits.
pub const WORD_SIZE_BITS: usize = 256;

/// The width of a byte on the EVM (and most other places) in bits.
pub const BYTE_SIZE_BITS: usize = 8;

/// The width of a word on the EVM in bytes.
pub const WORD_SIZE_BYTES: usize = WORD_SIZE_BITS / BYTE_SIZE_BITS;

/// The number of most-recent blocks whose hashes are visible to `BLOCKHASH`.
pub const BLOCK_HASH_HISTORY: usize = 256;

/// The width of a single wire in the target constraint field, in bits.
///
/// Word-sized values are carried as two limbs of this width after
/// finalization.
pub const LIMB_SIZE_BITS: u32 = 128;

/// The width of a single wire in the target constraint field, in bytes.
pub const LIMB_SIZE_BYTES: usize = LIMB_SIZE_BITS as usize / BYTE_SIZE_BITS;

/// The number of limbs that carry a word.
pub const LIMBS_PER_WORD: usize = WORD_SIZE_BYTES / LIMB_SIZE_BYTES;

/// The number of placement identifiers reserved for the four buffer
/// placements.
///
/// Placements created during execution are numbered from this value onwards.
pub const RESERVED_PLACEMENT_COUNT: usize = 4;

/// The number of bits produced by the bit decomposition used for `EXP`.
pub const EXPONENT_BIT_COUNT: usize = WORD_SIZE_BITS;

/// The default maximum number of instructions that the virtual machine will
/// execute for a single transaction.
pub const DEFAULT_MAXIMUM_STEPS: usize = 10_000_000;

/// The default number of loop iterations the synthesizer will wait before
/// polling the watchdog.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 100;
