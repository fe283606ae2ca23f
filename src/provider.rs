//! This module defines the interface to the external state that a transaction
//! reads during execution.
//!
//! The synthesizer never talks to a node directly. Everything it needs from
//! the chain (the transaction itself, account storage, balances, code and
//! historical block hashes) is requested through a [`StateProvider`]. A failed
//! query surfaces as [`crate::error::execution::Error::ExternalDependency`] and
//! is never retried here.
//!
//! # Synchronous Interface
//!
//! The provider is queried synchronously from inside the execution loop. A
//! provider that talks to a remote endpoint is expected to block until the
//! answer is available, applying whatever timeout and retry policy it sees fit.

use std::{collections::HashMap, fmt::Debug, rc::Rc};

use ethnum::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::transaction::{Address, TransactionContext};

/// A dynamically dispatched [`StateProvider`] instance.
pub type DynProvider = Rc<dyn StateProvider>;

/// Failures of the external state provider.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProviderError {
    #[error("{_0} was not found")]
    NotFound(String),

    #[error("State provider unavailable: {_0}")]
    Unavailable(String),
}

/// The result type for state provider queries.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// The interface to the external state that a transaction reads.
pub trait StateProvider
where
    Self: Debug,
{
    /// Resolves the transaction identified by `hash` into its full execution
    /// context.
    ///
    /// # Errors
    ///
    /// If the transaction is unknown or cannot be fetched.
    fn transaction(&self, hash: U256) -> Result<TransactionContext>;

    /// Reads the storage slot `key` of the account at `address`.
    ///
    /// # Errors
    ///
    /// If the state cannot be fetched.
    fn storage(&self, address: Address, key: U256) -> Result<U256>;

    /// Reads the balance of the account at `address`.
    ///
    /// # Errors
    ///
    /// If the state cannot be fetched.
    fn balance(&self, address: Address) -> Result<U256>;

    /// Reads the code of the account at `address`.
    ///
    /// # Errors
    ///
    /// If the state cannot be fetched.
    fn code(&self, address: Address) -> Result<Vec<u8>>;

    /// Gets the keccak hash of the code of the account at `address`, or zero
    /// for an account without code.
    ///
    /// # Errors
    ///
    /// If the state cannot be fetched.
    fn code_hash(&self, address: Address) -> Result<U256> {
        let code = self.code(address)?;
        if code.is_empty() {
            return Ok(U256::ZERO);
        }
        Ok(keccak256(&code))
    }

    /// Gets the hash of the block with the given `number`.
    ///
    /// # Errors
    ///
    /// If the state cannot be fetched.
    fn block_hash(&self, number: U256) -> Result<U256>;
}

/// Computes the keccak-256 digest of `data` as a word.
#[must_use]
pub fn keccak256(data: &[u8]) -> U256 {
    let digest = Keccak256::digest(data);
    let mut buffer = [0u8; 32];
    buffer.copy_from_slice(&digest);
    U256::from_be_bytes(buffer)
}

/// An account in the [`InMemoryProvider`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Account {
    pub balance: U256,
    pub code:    Vec<u8>,
    pub storage: HashMap<U256, U256>,
}

/// A [`StateProvider`] that answers every query from data held in memory.
///
/// Accounts that have not been registered read as empty. Transactions and
/// block hashes that have not been registered are reported as not found.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProvider {
    accounts:     HashMap<Address, Account>,
    transactions: HashMap<U256, TransactionContext>,
    block_hashes: HashMap<U256, U256>,
}

impl InMemoryProvider {
    /// Creates a provider with no state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the code of the account at `address`.
    #[must_use]
    pub fn with_code(mut self, address: Address, code: impl Into<Vec<u8>>) -> Self {
        self.accounts.entry(address).or_default().code = code.into();
        self
    }

    /// Sets the balance of the account at `address`.
    #[must_use]
    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.accounts.entry(address).or_default().balance = balance;
        self
    }

    /// Sets the storage slot `key` of the account at `address` to `value`.
    #[must_use]
    pub fn with_storage(mut self, address: Address, key: U256, value: U256) -> Self {
        self.accounts.entry(address).or_default().storage.insert(key, value);
        self
    }

    /// Registers `context` under `hash`.
    #[must_use]
    pub fn with_transaction(mut self, hash: U256, context: TransactionContext) -> Self {
        self.transactions.insert(hash, context);
        self
    }

    /// Registers the `hash` of block `number`.
    #[must_use]
    pub fn with_block_hash(mut self, number: U256, hash: U256) -> Self {
        self.block_hashes.insert(number, hash);
        self
    }

    /// Wraps the provider into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynProvider {
        Rc::new(self)
    }
}

impl StateProvider for InMemoryProvider {
    fn transaction(&self, hash: U256) -> Result<TransactionContext> {
        self.transactions
            .get(&hash)
            .map(|context| {
                let mut context = context.clone();
                context.transaction.hash = Some(hash);
                context
            })
            .ok_or_else(|| ProviderError::NotFound(format!("Transaction {hash:#x}")))
    }

    fn storage(&self, address: Address, key: U256) -> Result<U256> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key).copied())
            .unwrap_or_default())
    }

    fn balance(&self, address: Address) -> Result<U256> {
        Ok(self.accounts.get(&address).map(|account| account.balance).unwrap_or_default())
    }

    fn code(&self, address: Address) -> Result<Vec<u8>> {
        Ok(self.accounts.get(&address).map(|account| account.code.clone()).unwrap_or_default())
    }

    fn block_hash(&self, number: U256) -> Result<U256> {
        self.block_hashes
            .get(&number)
            .copied()
            .ok_or_else(|| ProviderError::NotFound(format!("Block {number}")))
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        provider::{keccak256, InMemoryProvider, ProviderError, StateProvider},
        transaction::Address,
    };

    #[test]
    fn unregistered_accounts_read_as_empty() -> anyhow::Result<()> {
        let provider = InMemoryProvider::new();
        let address = Address::from(7);

        assert_eq!(provider.storage(address, U256::ONE)?, U256::ZERO);
        assert_eq!(provider.balance(address)?, U256::ZERO);
        assert!(provider.code(address)?.is_empty());
        assert_eq!(provider.code_hash(address)?, U256::ZERO);

        Ok(())
    }

    #[test]
    fn code_hash_is_keccak_of_code() -> anyhow::Result<()> {
        let address = Address::from(7);
        let provider = InMemoryProvider::new().with_code(address, vec![0x00]);

        assert_eq!(provider.code_hash(address)?, keccak256(&[0x00]));

        Ok(())
    }

    #[test]
    fn keccak_of_empty_input_is_well_known() {
        let expected = U256::from_str_hex(
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
        )
        .unwrap();
        assert_eq!(keccak256(&[]), expected);
    }

    #[test]
    fn missing_transactions_are_not_found() {
        let provider = InMemoryProvider::new();
        let result = provider.transaction(U256::ONE);
        assert!(matches!(result, Err(ProviderError::NotFound(_))));
    }
}
