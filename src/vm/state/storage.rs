//! This module contains the definition of the virtual machine's storage
//! containers.

use std::collections::HashMap;

use ethnum::U256;

use crate::{
    provider::{DynProvider, Result},
    transaction::Address,
};

/// A representation of the persistent and transient storage of the account
/// whose code is executing.
///
/// Persistent storage is a write overlay on top of the [`DynProvider`]: slots
/// that have not been written during the transaction are read from the
/// provider, and written slots are served from the overlay.
///
/// # Generational Storage
///
/// Each written slot keeps the total history of writes made to it during the
/// transaction. You can call the `generations` method to get at these for a
/// given key.
#[derive(Clone, Debug)]
pub struct Storage {
    /// The account that owns the storage.
    address: Address,

    /// The source of values for unwritten slots.
    provider: DynProvider,

    /// The write history of each written slot.
    written: HashMap<U256, Vec<U256>>,

    /// The transient storage, which starts out zeroed for every transaction.
    transient: HashMap<U256, U256>,
}

impl Storage {
    /// Creates a new storage for the account at `address` that reads unwritten
    /// slots through `provider`.
    #[must_use]
    pub fn new(address: Address, provider: DynProvider) -> Self {
        let written = HashMap::new();
        let transient = HashMap::new();
        Self {
            address,
            provider,
            written,
            transient,
        }
    }

    /// Loads the value at `key`.
    ///
    /// This always returns the _most-recently written_ value where one exists.
    ///
    /// # Errors
    ///
    /// If the slot has not been written and the provider cannot supply it.
    pub fn load(&self, key: U256) -> Result<U256> {
        match self.written.get(&key).and_then(|generations| generations.last()) {
            Some(value) => Ok(*value),
            None => self.provider.storage(self.address, key),
        }
    }

    /// Stores `value` at `key`, overwriting any existing value.
    pub fn store(&mut self, key: U256, value: U256) {
        self.written.entry(key).or_default().push(value);
    }

    /// Gets all of the stores that were made at the provided `key` during
    /// the course of execution.
    ///
    /// Returns [`Some`] for keys that have seen at least one write, and
    /// otherwise returns [`None`].
    #[must_use]
    pub fn generations(&self, key: U256) -> Option<&[U256]> {
        self.written.get(&key).map(Vec::as_slice)
    }

    /// Gets the number of slots that have been written.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.written.len()
    }

    /// Loads the value at `key` in transient storage.
    #[must_use]
    pub fn load_transient(&self, key: U256) -> U256 {
        self.transient.get(&key).copied().unwrap_or(U256::ZERO)
    }

    /// Stores `value` at `key` in transient storage.
    pub fn store_transient(&mut self, key: U256, value: U256) {
        self.transient.insert(key, value);
    }

    /// Gets the account that owns the storage.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        provider::InMemoryProvider,
        transaction::Address,
        vm::state::storage::Storage,
    };

    #[test]
    fn unwritten_slots_are_read_from_the_provider() -> anyhow::Result<()> {
        let address = Address::from(7u64);
        let provider = InMemoryProvider::new()
            .with_storage(address, U256::ONE, U256::from(42u8))
            .in_rc();
        let storage = Storage::new(address, provider);

        assert_eq!(storage.load(U256::ONE)?, U256::from(42u8));
        assert_eq!(storage.load(U256::from(2u8))?, U256::ZERO);

        Ok(())
    }

    #[test]
    fn writes_shadow_the_provider_and_keep_history() -> anyhow::Result<()> {
        let address = Address::from(7u64);
        let provider = InMemoryProvider::new()
            .with_storage(address, U256::ONE, U256::from(42u8))
            .in_rc();
        let mut storage = Storage::new(address, provider);

        storage.store(U256::ONE, U256::from(1u8));
        storage.store(U256::ONE, U256::from(2u8));

        assert_eq!(storage.load(U256::ONE)?, U256::from(2u8));
        assert_eq!(
            storage.generations(U256::ONE),
            Some([U256::from(1u8), U256::from(2u8)].as_slice())
        );
        assert_eq!(storage.entry_count(), 1);

        Ok(())
    }

    #[test]
    fn transient_storage_starts_zeroed() {
        let mut storage = Storage::new(Address::from(1u64), InMemoryProvider::new().in_rc());
        assert_eq!(storage.load_transient(U256::ONE), U256::ZERO);

        storage.store_transient(U256::ONE, U256::from(9u8));
        assert_eq!(storage.load_transient(U256::ONE), U256::from(9u8));
    }
}
