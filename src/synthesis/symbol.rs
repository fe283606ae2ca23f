//! This module contains the definition of [`DataPt`], the symbol that tracks a
//! value through the circuit along with the wire that produces it.

use ethnum::U256;

use crate::{
    constant::WORD_SIZE_BYTES,
    synthesis::placement::PlacementId,
    transaction::Address,
};

/// The byte width of a symbol that carries a single bit.
pub const BIT_SYMBOL_SIZE: usize = 1;

/// Where the value carried by a [`DataPt`] comes from.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Source {
    /// The value is a constant baked into the circuit.
    Literal,

    /// The value is produced by an output wire of the given placement.
    Placement(PlacementId),
}

/// The kind of external value that a symbol was loaded from.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum LoadKind {
    /// An immediate of a `PUSH` opcode, keyed by its byte offset.
    Bytecode,

    /// The program counter read by `PC`, keyed by its byte offset.
    ProgramCounter,

    /// A window of `size` bytes of call data, keyed by its start offset.
    CallData { size: usize },

    /// A window of `size` bytes of account code, keyed by its start offset.
    Code { size: usize },

    /// A value from the message environment.
    Environment(EnvironmentField),

    /// A value from the block environment.
    Block(BlockField),

    /// A persistent storage slot.
    Storage,

    /// The balance of an account.
    Balance,

    /// A keccak digest supplied as an oracle.
    Keccak,

    /// The remaining gas.
    Gas,

    /// The current size of memory.
    MemorySize,
}

impl LoadKind {
    /// Gets the input buffer that values of this kind are minted into.
    ///
    /// Account state is private to the prover, while everything else is
    /// revealed to the verifier.
    #[must_use]
    pub fn buffer(&self) -> PlacementId {
        match self {
            Self::Storage | Self::Balance => PlacementId::PRV_IN,
            _ => PlacementId::PUB_IN,
        }
    }

    /// Checks whether repeated loads of the same key may reuse an earlier
    /// symbol.
    ///
    /// Gas and memory size change between any two reads, and digests are
    /// cached by their input symbols instead.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Self::Gas | Self::MemorySize | Self::Keccak)
    }

    /// Gets the byte width of the symbols loaded for this kind.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::CallData { size } | Self::Code { size } => *size,
            _ => WORD_SIZE_BYTES,
        }
    }
}

/// Fields of the message environment.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum EnvironmentField {
    Address,
    Origin,
    Caller,
    CallValue,
    CallDataSize,
    CodeSize,
    GasPrice,
    ExtCodeSize,
    ExtCodeHash,
    ReturnDataSize,
}

/// Fields of the block environment.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum BlockField {
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Prevrandao,
    GasLimit,
    ChainId,
    BaseFee,
}

/// The kind of external destination that a symbol was written to.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum StoreKind {
    /// A persistent storage slot.
    Storage,

    /// A topic or data word of the `index`th log emitted by the transaction.
    Log { index: usize },

    /// A word of the data returned by the transaction.
    ReturnData,

    /// A word of input to a keccak digest.
    KeccakInput,
}

impl StoreKind {
    /// Gets the output buffer that values of this kind are written to.
    #[must_use]
    pub fn buffer(&self) -> PlacementId {
        match self {
            Self::Storage => PlacementId::PRV_OUT,
            _ => PlacementId::PUB_OUT,
        }
    }
}

/// The external provenance of a symbol.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum External {
    /// The symbol was read from outside the circuit.
    Source {
        kind:    LoadKind,
        address: Address,
        key:     U256,
    },

    /// The symbol was written to outside the circuit.
    Destination {
        kind:    StoreKind,
        address: Address,
        key:     U256,
    },
}

/// A symbol: a value tracked through the circuit together with the wire that
/// carries it.
///
/// Symbols are immutable once created. The value of a symbol on the symbolic
/// stack always equals the value at the same position of the concrete stack.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DataPt {
    value:       U256,
    source:      Source,
    wire_index:  Option<usize>,
    source_size: usize,
    external:    Option<External>,
}

impl DataPt {
    /// Creates a constant symbol of `size` bytes.
    #[must_use]
    pub fn literal(value: U256, size: usize) -> Self {
        Self {
            value,
            source: Source::Literal,
            wire_index: None,
            source_size: size,
            external: None,
        }
    }

    /// Creates a constant word symbol.
    #[must_use]
    pub fn word(value: U256) -> Self {
        Self::literal(value, WORD_SIZE_BYTES)
    }

    /// Creates the symbol carried by output wire `wire` of `placement`.
    #[must_use]
    pub fn output(placement: PlacementId, wire: usize, value: U256, size: usize) -> Self {
        Self {
            value,
            source: Source::Placement(placement),
            wire_index: Some(wire),
            source_size: size,
            external: None,
        }
    }

    /// Creates the raw form of an external value, as it enters an input buffer.
    #[must_use]
    pub fn raw(value: U256, size: usize, external: Option<External>) -> Self {
        Self {
            value,
            source: Source::Literal,
            wire_index: None,
            source_size: size,
            external,
        }
    }

    /// Attaches the external provenance `external` to the symbol.
    #[must_use]
    pub fn with_external(mut self, external: Option<External>) -> Self {
        self.external = external;
        self
    }

    /// Gets the value carried by the symbol.
    #[must_use]
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Gets where the value of the symbol comes from.
    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    /// Gets the placement producing the symbol, if any.
    #[must_use]
    pub fn placement(&self) -> Option<PlacementId> {
        match self.source {
            Source::Placement(id) => Some(id),
            Source::Literal => None,
        }
    }

    /// Checks if the symbol is a constant.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.source == Source::Literal
    }

    /// Gets the index of the output wire carrying the symbol in its producing
    /// placement.
    #[must_use]
    pub fn wire_index(&self) -> Option<usize> {
        self.wire_index
    }

    /// Gets the byte width of the symbol's value.
    #[must_use]
    pub fn source_size(&self) -> usize {
        self.source_size
    }

    /// Gets the external provenance of the symbol.
    #[must_use]
    pub fn external(&self) -> Option<&External> {
        self.external.as_ref()
    }
}
