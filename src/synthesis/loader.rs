//! This module contains the data loader, which turns external reads into
//! symbols and exports written symbols, reusing warm reads where possible.

use ethnum::U256;
use tracing::debug;

use crate::{
    constant::WORD_SIZE_BYTES,
    error::execution::Result,
    synthesis::{
        buffer::{add_wire_to_in_buffer, add_wire_to_out_buffer},
        registry::{LoadKey, LogRecord, StateRegistry},
        symbol::{DataPt, External, LoadKind, StoreKind},
    },
    transaction::Address,
};

/// Loads the external `value` of `kind` read from `key` at `address`.
///
/// A warm read of a cacheable kind returns the symbol issued by the first read
/// without touching any buffer. A cold read mints a new symbol in the input
/// buffer for the kind.
///
/// # Errors
///
/// Returns [`Err`] if the buffer cannot be written.
pub fn load(
    registry: &mut StateRegistry,
    kind: LoadKind,
    address: Address,
    key: U256,
    value: U256,
    instruction_pointer: u32,
) -> Result<DataPt> {
    let cache_key = LoadKey { address, kind, key };
    if kind.is_cacheable() {
        if let Some(symbol) = registry.cached_load(&cache_key) {
            debug!(?kind, %address, %key, "Warm load");
            return Ok(symbol.clone());
        }
    }

    let symbol = load_uncached(registry, kind, address, key, value, instruction_pointer)?;
    if kind.is_cacheable() {
        registry.cache_load(cache_key, symbol.clone());
    }

    Ok(symbol)
}

/// Loads the external `value` of `kind` as a cold read that is never cached,
/// for reads whose location cannot be named by `key`.
///
/// # Errors
///
/// Returns [`Err`] if the buffer cannot be written.
pub fn load_uncached(
    registry: &mut StateRegistry,
    kind: LoadKind,
    address: Address,
    key: U256,
    value: U256,
    instruction_pointer: u32,
) -> Result<DataPt> {
    let external = External::Source { kind, address, key };
    add_wire_to_in_buffer(
        registry,
        kind.buffer(),
        value,
        kind.size(),
        Some(external),
        instruction_pointer,
    )
}

/// Exports `symbol` as the new value of storage slot `key` at `address`.
///
/// Any warm read of the slot is forgotten, so the next read of it is cold.
///
/// # Errors
///
/// Returns [`Err`] if `symbol` does not refer to an existing wire.
pub fn store_storage(
    registry: &mut StateRegistry,
    address: Address,
    key: U256,
    symbol: &DataPt,
    instruction_pointer: u32,
) -> Result<()> {
    let kind = StoreKind::Storage;
    let external = External::Destination { kind, address, key };
    add_wire_to_out_buffer(
        registry,
        kind.buffer(),
        symbol,
        Some(external),
        instruction_pointer,
    )?;

    registry.evict_load(&LoadKey {
        address,
        kind: LoadKind::Storage,
        key,
    });

    Ok(())
}

/// Exports the topics and data words of a log emitted by `address`, and
/// records the log.
///
/// # Errors
///
/// Returns [`Err`] if a symbol does not refer to an existing wire.
pub fn store_log(
    registry: &mut StateRegistry,
    address: Address,
    topics: Vec<DataPt>,
    data: Vec<DataPt>,
    instruction_pointer: u32,
) -> Result<()> {
    let kind = StoreKind::Log {
        index: registry.logs().len(),
    };
    export_all(registry, kind, address, topics.iter().chain(&data), instruction_pointer)?;
    registry.record_log(LogRecord { topics, data });

    Ok(())
}

/// Exports the words of data returned by the transaction.
///
/// # Errors
///
/// Returns [`Err`] if a symbol does not refer to an existing wire.
pub fn store_return(
    registry: &mut StateRegistry,
    address: Address,
    data: &[DataPt],
    instruction_pointer: u32,
) -> Result<()> {
    export_all(registry, StoreKind::ReturnData, address, data.iter(), instruction_pointer)
}

/// Loads the oracle `digest` of the `size` bytes carried by `inputs`.
///
/// The inputs are exported so that the hashed data is bound to the circuit,
/// and the digest is minted as a new public input. Hashing the same number of
/// bytes from the same input symbols again reuses the earlier digest symbol.
///
/// # Errors
///
/// Returns [`Err`] if a symbol does not refer to an existing wire.
pub fn load_keccak(
    registry: &mut StateRegistry,
    address: Address,
    size: usize,
    inputs: Vec<DataPt>,
    digest: U256,
    instruction_pointer: u32,
) -> Result<DataPt> {
    if let Some(symbol) = registry.cached_keccak(size, &inputs) {
        debug!(size, inputs = inputs.len(), "Warm keccak");
        return Ok(symbol.clone());
    }

    export_all(registry, StoreKind::KeccakInput, address, inputs.iter(), instruction_pointer)?;

    let kind = LoadKind::Keccak;
    let external = External::Source {
        kind,
        address,
        key: U256::from(registry.keccak_records().len() as u64),
    };
    let output = add_wire_to_in_buffer(
        registry,
        kind.buffer(),
        digest,
        WORD_SIZE_BYTES,
        Some(external),
        instruction_pointer,
    )?;
    registry.record_keccak(size, inputs, output.clone());

    Ok(output)
}

/// Reads transient storage slot `key` at `address`.
///
/// Transient storage starts empty in every transaction, so an untouched slot
/// reads as a literal zero.
#[must_use]
pub fn load_transient(registry: &StateRegistry, address: Address, key: U256) -> DataPt {
    registry
        .transient(address, key)
        .cloned()
        .unwrap_or_else(|| DataPt::word(U256::ZERO))
}

/// Writes `symbol` to transient storage slot `key` at `address`.
pub fn store_transient(registry: &mut StateRegistry, address: Address, key: U256, symbol: DataPt) {
    registry.set_transient(address, key, symbol);
}

/// Exports each of `symbols` through the output buffer for `kind`, keyed by
/// their position.
fn export_all<'a>(
    registry: &mut StateRegistry,
    kind: StoreKind,
    address: Address,
    symbols: impl Iterator<Item = &'a DataPt>,
    instruction_pointer: u32,
) -> Result<()> {
    for (position, symbol) in symbols.enumerate() {
        let external = External::Destination {
            kind,
            address,
            key: U256::from(position as u64),
        };
        add_wire_to_out_buffer(
            registry,
            kind.buffer(),
            symbol,
            Some(external),
            instruction_pointer,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        synthesis::{
            loader,
            placement::PlacementId,
            registry::StateRegistry,
            symbol::{DataPt, LoadKind},
        },
        transaction::Address,
    };

    fn wire_count(registry: &StateRegistry, buffer: PlacementId) -> usize {
        registry.placement(buffer).expect("Buffer exists").out_pts().len()
    }

    #[test]
    fn warm_storage_reads_reuse_the_symbol() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let address = Address::from(0xc0ffee);
        let key = U256::from(7u8);

        let first = loader::load(&mut registry, LoadKind::Storage, address, key, U256::ONE, 0)?;
        assert_eq!(wire_count(&registry, PlacementId::PRV_IN), 1);

        let second = loader::load(&mut registry, LoadKind::Storage, address, key, U256::ONE, 5)?;
        assert_eq!(first, second);
        assert_eq!(wire_count(&registry, PlacementId::PRV_IN), 1);

        // A different slot is a separate cold read.
        loader::load(&mut registry, LoadKind::Storage, address, U256::ONE, U256::ZERO, 6)?;
        assert_eq!(wire_count(&registry, PlacementId::PRV_IN), 2);

        Ok(())
    }

    #[test]
    fn storage_writes_evict_the_warm_read() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let address = Address::from(1);
        let key = U256::ZERO;

        let before = loader::load(&mut registry, LoadKind::Storage, address, key, U256::ONE, 0)?;
        let written = DataPt::word(U256::from(2u8));
        loader::store_storage(&mut registry, address, key, &written, 1)?;
        assert_eq!(wire_count(&registry, PlacementId::PRV_OUT), 1);

        let after =
            loader::load(&mut registry, LoadKind::Storage, address, key, U256::from(2u8), 2)?;
        assert_ne!(before, after);
        assert_eq!(after.value(), U256::from(2u8));
        assert_eq!(wire_count(&registry, PlacementId::PRV_IN), 2);

        Ok(())
    }

    #[test]
    fn volatile_reads_are_always_cold() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let address = Address::default();
        loader::load(&mut registry, LoadKind::Gas, address, U256::ZERO, U256::from(100u8), 0)?;
        loader::load(&mut registry, LoadKind::Gas, address, U256::ZERO, U256::from(100u8), 1)?;
        assert_eq!(wire_count(&registry, PlacementId::PUB_IN), 2);

        Ok(())
    }

    #[test]
    fn digests_of_the_same_inputs_are_reused() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let address = Address::default();
        let inputs = vec![DataPt::word(U256::ONE)];

        let first =
            loader::load_keccak(&mut registry, address, 32, inputs.clone(), U256::MAX, 0)?;
        let second = loader::load_keccak(&mut registry, address, 32, inputs, U256::MAX, 1)?;
        assert_eq!(first, second);
        assert_eq!(registry.keccak_records().len(), 1);
        assert_eq!(wire_count(&registry, PlacementId::PUB_OUT), 1);
        assert_eq!(wire_count(&registry, PlacementId::PUB_IN), 1);

        Ok(())
    }

    #[test]
    fn digests_of_different_lengths_are_distinct() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let address = Address::default();
        let inputs = vec![DataPt::word(U256::from(0xabu8))];

        let word = loader::load_keccak(&mut registry, address, 32, inputs.clone(), U256::ONE, 0)?;
        let byte = loader::load_keccak(&mut registry, address, 1, inputs, U256::MAX, 1)?;
        assert_ne!(word, byte);
        assert_eq!(byte.value(), U256::MAX);
        assert_eq!(registry.keccak_records().len(), 2);
        assert_eq!(registry.keccak_records()[1].size, 1);

        Ok(())
    }

    #[test]
    fn logs_export_topics_then_data() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let topic = DataPt::word(U256::from(0xaau8));
        let data = DataPt::word(U256::from(0xbbu8));
        loader::store_log(
            &mut registry,
            Address::default(),
            vec![topic.clone()],
            vec![data.clone()],
            0,
        )?;

        let buffer = registry.placement(PlacementId::PUB_OUT).expect("Buffer exists");
        assert_eq!(buffer.in_pts(), &[topic, data]);
        assert_eq!(registry.logs().len(), 1);

        Ok(())
    }

    #[test]
    fn untouched_transient_slots_read_as_zero() {
        let mut registry = StateRegistry::default();
        let address = Address::default();
        let empty = loader::load_transient(&registry, address, U256::ONE);
        assert_eq!(empty.value(), U256::ZERO);
        assert!(empty.is_literal());

        let symbol = DataPt::word(U256::from(3u8));
        loader::store_transient(&mut registry, address, U256::ONE, symbol.clone());
        assert_eq!(loader::load_transient(&registry, address, U256::ONE), symbol);
    }
}
