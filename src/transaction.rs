//! This module contains the types that describe the transaction being
//! synthesized and the block it executes in.

use std::fmt::{Debug, Display, Formatter};

use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The number of bytes in an account address.
pub const ADDRESS_SIZE_BYTES: usize = 20;

/// A 160-bit account address.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address([u8; ADDRESS_SIZE_BYTES]);

impl Address {
    /// Constructs an address from its raw big-endian bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_SIZE_BYTES]) -> Self {
        Self(bytes)
    }

    /// Gets the raw big-endian bytes of the address.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE_BYTES] {
        &self.0
    }

    /// Converts the address into a word, as it would appear on the stack.
    #[must_use]
    pub fn to_word(&self) -> U256 {
        let mut buffer = [0u8; 32];
        buffer[32 - ADDRESS_SIZE_BYTES..].copy_from_slice(&self.0);
        U256::from_be_bytes(buffer)
    }

    /// Takes the low 160 bits of `word` as an address, as the EVM does for
    /// address-typed stack operands.
    #[must_use]
    pub fn from_word(word: U256) -> Self {
        let bytes = word.to_be_bytes();
        let mut address = [0u8; ADDRESS_SIZE_BYTES];
        address.copy_from_slice(&bytes[32 - ADDRESS_SIZE_BYTES..]);
        Self(address)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::from_word(U256::from(value))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(digits).map_err(serde::de::Error::custom)?;
        let bytes: [u8; ADDRESS_SIZE_BYTES] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("an address must be 20 bytes"))?;
        Ok(Self(bytes))
    }
}

/// The message-level data of the transaction being synthesized.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Transaction {
    /// The hash identifying the transaction, where it is known.
    pub hash: Option<U256>,

    /// The externally-owned account that signed the transaction.
    pub origin: Address,

    /// The immediate caller of the executing code.
    pub caller: Address,

    /// The account whose code is executed.
    pub to: Address,

    /// The value transferred with the call, in wei.
    pub value: U256,

    /// The input data of the call.
    pub calldata: Vec<u8>,

    /// The gas price of the transaction.
    pub gas_price: U256,

    /// The gas available to execution.
    pub gas_limit: usize,
}

/// The block-level environment that the transaction executes in.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockInfo {
    pub coinbase:   Address,
    pub timestamp:  U256,
    pub number:     U256,
    pub prevrandao: U256,
    pub gas_limit:  U256,
    pub chain_id:   U256,
    pub base_fee:   U256,
}

/// A transaction together with the block it executes in.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransactionContext {
    pub transaction: Transaction,
    pub block:       BlockInfo,
}

impl TransactionContext {
    /// Creates a new context from its parts.
    #[must_use]
    pub fn new(transaction: Transaction, block: BlockInfo) -> Self {
        Self { transaction, block }
    }
}
