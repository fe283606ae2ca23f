//! This module contains the [`StateRegistry`], the single owner of every
//! placement recorded while synthesizing a transaction.

use std::collections::{BTreeMap, HashMap};

use derivative::Derivative;
use ethnum::U256;
use tracing::debug;

use crate::{
    constant::{LIMB_SIZE_BYTES, RESERVED_PLACEMENT_COUNT},
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    synthesis::{
        placement::{Placement, PlacementId},
        subcircuit::{self, SubcircuitInfo, SubcircuitLibrary},
        symbol::{DataPt, LoadKind, Source},
    },
    transaction::Address,
};

/// The key under which warm external reads are cached.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct LoadKey {
    pub address: Address,
    pub kind:    LoadKind,
    pub key:     U256,
}

/// A keccak digest taken as an oracle, with the symbols that were hashed.
///
/// `size` is the number of bytes hashed, which the symbols alone do not fix as
/// the last window may be shorter than a word.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeccakRecord {
    pub size:   usize,
    pub inputs: Vec<DataPt>,
    pub output: DataPt,
}

/// A log emitted by the transaction, as symbols.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogRecord {
    pub topics: Vec<DataPt>,
    pub data:   Vec<DataPt>,
}

/// The owner of all placements for one transaction, together with the caches
/// of warm external reads.
///
/// Placement ids are handed out in strictly increasing order starting after the
/// four reserved buffers, and are never reused. A registry must not be shared
/// between transactions.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct StateRegistry {
    placements: BTreeMap<PlacementId, Placement>,
    next_id:    usize,

    #[derivative(Debug = "ignore")]
    library: SubcircuitLibrary,

    #[derivative(Debug = "ignore")]
    load_cache: HashMap<LoadKey, DataPt>,

    #[derivative(Debug = "ignore")]
    keccak_cache: HashMap<(usize, Vec<DataPt>), DataPt>,

    keccak_records: Vec<KeccakRecord>,
    logs:           Vec<LogRecord>,
    transient:      HashMap<(Address, U256), DataPt>,
}

impl StateRegistry {
    /// Creates a registry over `library`, with the four buffer placements
    /// already present.
    #[must_use]
    pub fn new(library: SubcircuitLibrary) -> Self {
        let mut placements = BTreeMap::new();
        for id in PlacementId::BUFFERS {
            let name = subcircuit::buffer_subcircuit(id).unwrap_or_default();
            placements.insert(id, Placement::buffer(id, name));
        }

        Self {
            placements,
            next_id: RESERVED_PLACEMENT_COUNT,
            library,
            load_cache: HashMap::new(),
            keccak_cache: HashMap::new(),
            keccak_records: Vec::new(),
            logs: Vec::new(),
            transient: HashMap::new(),
        }
    }

    /// Records a new placement of `subcircuit` performing `usage`, returning
    /// its output symbols.
    ///
    /// Each entry of `outputs` is the value and byte width of one output
    /// symbol.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the subcircuit is unknown, if the inputs or outputs
    /// do not fit the template, or if an input symbol does not refer to an
    /// existing wire.
    pub fn place(
        &mut self,
        subcircuit: &str,
        usage: &str,
        selector: Option<U256>,
        in_pts: Vec<DataPt>,
        outputs: &[(U256, usize)],
        instruction_pointer: u32,
    ) -> Result<Vec<DataPt>> {
        let info = self.subcircuit(subcircuit).locate(instruction_pointer)?;
        let in_limbs: usize = in_pts.iter().map(|pt| limb_count(pt.source_size())).sum();
        let out_limbs: usize = outputs.iter().map(|(_, size)| limb_count(*size)).sum();
        check_wire_count(usage, info.in_wires, in_limbs).locate(instruction_pointer)?;
        check_wire_count(usage, info.out_wires, out_limbs).locate(instruction_pointer)?;

        for in_pt in &in_pts {
            self.validate_symbol(in_pt).locate(instruction_pointer)?;
        }

        let id = PlacementId(self.next_id);
        self.next_id += 1;

        let out_pts: Vec<DataPt> = outputs
            .iter()
            .enumerate()
            .map(|(wire, (value, size))| DataPt::output(id, wire, *value, *size))
            .collect();

        debug!(
            placement = id.0,
            subcircuit,
            usage,
            inputs = in_pts.len(),
            outputs = out_pts.len(),
            "Recorded placement"
        );

        let placement = Placement::new(
            id,
            subcircuit,
            usage,
            selector,
            in_pts,
            out_pts.clone(),
            instruction_pointer,
        );
        self.placements.insert(id, placement);

        Ok(out_pts)
    }

    /// Checks that `symbol` is a literal or is carried by an existing output
    /// wire with the same value.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the symbol refers to a wire that does not exist.
    pub fn validate_symbol(&self, symbol: &DataPt) -> std::result::Result<(), Error> {
        let Source::Placement(id) = symbol.source() else {
            return Ok(());
        };
        let dangling = || Error::DanglingSymbol {
            placement: id.0,
            wire:      symbol.wire_index(),
        };

        let placement = self.placements.get(&id).ok_or_else(dangling)?;
        let wire = symbol.wire_index().ok_or_else(dangling)?;
        match placement.out_pts().get(wire) {
            Some(out) if out.value() == symbol.value() => Ok(()),
            _ => Err(dangling()),
        }
    }

    /// Gets the template called `name` from the library.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such template.
    pub fn subcircuit(&self, name: &str) -> std::result::Result<&SubcircuitInfo, Error> {
        self.library.get(name).ok_or_else(|| Error::UnknownSubcircuit { name: name.into() })
    }

    /// Gets the placement with the provided `id`, if it exists.
    #[must_use]
    pub fn placement(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.get(&id)
    }

    /// Gets all placements in id order.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.values()
    }

    /// Gets the number of placements, including the buffers.
    #[must_use]
    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    /// Gets the id that will be assigned to the next placement.
    #[must_use]
    pub fn next_id(&self) -> PlacementId {
        PlacementId(self.next_id)
    }

    /// Gets the subcircuit library that placements are checked against.
    #[must_use]
    pub fn library(&self) -> &SubcircuitLibrary {
        &self.library
    }

    /// Gets the keccak digests taken during execution.
    #[must_use]
    pub fn keccak_records(&self) -> &[KeccakRecord] {
        &self.keccak_records
    }

    /// Gets the logs emitted during execution.
    #[must_use]
    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    /// Consumes the registry, returning its placements in id order.
    #[must_use]
    pub fn into_placements(self) -> Vec<Placement> {
        self.placements.into_values().collect()
    }

    pub(crate) fn buffer_mut(&mut self, id: PlacementId) -> Option<&mut Placement> {
        if id.is_buffer() {
            self.placements.get_mut(&id)
        } else {
            None
        }
    }

    pub(crate) fn cached_load(&self, key: &LoadKey) -> Option<&DataPt> {
        self.load_cache.get(key)
    }

    pub(crate) fn cache_load(&mut self, key: LoadKey, symbol: DataPt) {
        self.load_cache.insert(key, symbol);
    }

    pub(crate) fn evict_load(&mut self, key: &LoadKey) -> Option<DataPt> {
        self.load_cache.remove(key)
    }

    pub(crate) fn cached_keccak(&self, size: usize, inputs: &[DataPt]) -> Option<&DataPt> {
        self.keccak_cache.get(&(size, inputs.to_vec()))
    }

    pub(crate) fn record_keccak(&mut self, size: usize, inputs: Vec<DataPt>, output: DataPt) {
        self.keccak_cache.insert((size, inputs.clone()), output.clone());
        self.keccak_records.push(KeccakRecord {
            size,
            inputs,
            output,
        });
    }

    pub(crate) fn record_log(&mut self, log: LogRecord) {
        self.logs.push(log);
    }

    pub(crate) fn transient(&self, address: Address, key: U256) -> Option<&DataPt> {
        self.transient.get(&(address, key))
    }

    pub(crate) fn set_transient(&mut self, address: Address, key: U256, symbol: DataPt) {
        self.transient.insert((address, key), symbol);
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new(SubcircuitLibrary::standard())
    }
}

/// Gets the number of limb wires needed to carry a value of `size` bytes.
#[must_use]
pub fn limb_count(size: usize) -> usize {
    size.div_ceil(LIMB_SIZE_BYTES).max(1)
}

/// Checks that `actual` wires fit within the `declared` count of a template.
///
/// Templates may leave trailing inputs unused, in which case they are padded
/// with zeroes when computing the witness.
fn check_wire_count(
    usage: &str,
    declared: Option<usize>,
    actual: usize,
) -> std::result::Result<(), Error> {
    match declared {
        Some(expected) if actual > expected => Err(Error::InvalidOperandCount {
            name: usage.into(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        error::execution::Error,
        synthesis::{
            placement::PlacementId,
            registry::{limb_count, StateRegistry},
            subcircuit,
            symbol::DataPt,
        },
    };

    #[test]
    fn starts_with_the_buffer_placements() {
        let registry = StateRegistry::default();
        assert_eq!(registry.placement_count(), 4);
        assert_eq!(registry.next_id(), PlacementId(4));
        for id in PlacementId::BUFFERS {
            assert!(registry.placement(id).is_some());
        }
    }

    #[test]
    fn assigns_increasing_ids() -> anyhow::Result<()> {
        let mut registry = StateRegistry::default();
        let inputs = vec![DataPt::word(U256::ONE), DataPt::word(U256::ONE)];

        let mut last = None;
        for _ in 0..5 {
            let outs = registry.place(
                subcircuit::AND,
                "AND",
                None,
                inputs.clone(),
                &[(U256::ONE, 32)],
                0,
            )?;
            let id = outs[0].placement().expect("Output has a producer");
            assert!(id.0 >= 4);
            if let Some(last) = last {
                assert!(id > last);
            }
            last = Some(id);
        }
        assert_eq!(registry.next_id(), PlacementId(9));

        Ok(())
    }

    #[test]
    fn rejects_dangling_inputs() {
        let mut registry = StateRegistry::default();
        let dangling = DataPt::output(PlacementId(40), 0, U256::ONE, 32);
        let result = registry.place(
            subcircuit::AND,
            "AND",
            None,
            vec![dangling, DataPt::word(U256::ONE)],
            &[(U256::ONE, 32)],
            3,
        );

        let error = result.expect_err("Dangling symbol was accepted");
        assert_eq!(error.location, 3);
        assert_eq!(
            error.payload,
            Error::DanglingSymbol {
                placement: 40,
                wire:      Some(0),
            }
        );
    }

    #[test]
    fn rejects_unknown_subcircuits_and_overfull_templates() {
        let mut registry = StateRegistry::default();
        let unknown = registry.place("MUX", "MUX", None, vec![], &[], 0);
        assert!(matches!(
            unknown.map_err(|e| e.payload),
            Err(Error::UnknownSubcircuit { .. })
        ));

        let too_many = vec![DataPt::word(U256::ONE); 3];
        let overfull = registry.place(subcircuit::OR, "OR", None, too_many, &[(U256::ONE, 32)], 0);
        assert!(matches!(
            overfull.map_err(|e| e.payload),
            Err(Error::InvalidOperandCount {
                expected: 4,
                actual: 6,
                ..
            })
        ));
    }

    #[test]
    fn counts_limbs_by_width() {
        assert_eq!(limb_count(32), 2);
        assert_eq!(limb_count(17), 2);
        assert_eq!(limb_count(16), 1);
        assert_eq!(limb_count(1), 1);
        assert_eq!(limb_count(0), 1);
    }
}
