//! This module contains the description of the subcircuit templates that
//! placements instantiate, and the mapping from EVM operations to them.
//!
//! # Wire Counts
//!
//! All wire counts are given in 128-bit limbs, the width of a field element in
//! the target proving system. A word therefore occupies two wires and a bit
//! occupies one. Templates that leave their wire counts unset are buffers,
//! whose width follows their contents.

use ethnum::U256;
use serde::{Deserialize, Serialize};

use crate::{arith::ArithOp, constant::LIMBS_PER_WORD, synthesis::placement::PlacementId};

pub const BUFFER_PUB_IN: &str = "bufferPubIn";
pub const BUFFER_PUB_OUT: &str = "bufferPubOut";
pub const BUFFER_PRV_IN: &str = "bufferPrvIn";
pub const BUFFER_PRV_OUT: &str = "bufferPrvOut";
pub const ALU1: &str = "ALU1";
pub const ALU2: &str = "ALU2";
pub const ALU3: &str = "ALU3";
pub const ALU4: &str = "ALU4";
pub const ALU5: &str = "ALU5";
pub const AND: &str = "AND";
pub const OR: &str = "OR";
pub const XOR: &str = "XOR";
pub const DEC_TO_BIT: &str = "DecToBit";
pub const SUB_EXP: &str = "SubEXP";

/// The declared shape of a subcircuit template.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcircuitInfo {
    /// The numeric identifier of the template.
    pub id: usize,

    /// The name of the template.
    pub name: String,

    /// The number of output wires, or [`None`] for a buffer.
    pub out_wires: Option<usize>,

    /// The number of input wires, or [`None`] for a buffer.
    pub in_wires: Option<usize>,

    /// The number of constraints, where known.
    pub n_constraints: Option<usize>,
}

impl SubcircuitInfo {
    /// Creates a template description without a known constraint count.
    #[must_use]
    pub fn new(
        id: usize,
        name: impl Into<String>,
        out_wires: Option<usize>,
        in_wires: Option<usize>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            out_wires,
            in_wires,
            n_constraints: None,
        }
    }

    /// Checks if the template is a buffer with a dynamic width.
    #[must_use]
    pub fn is_buffer(&self) -> bool {
        self.out_wires.is_none() || self.in_wires.is_none()
    }
}

/// The set of subcircuit templates available to placements.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubcircuitLibrary {
    subcircuits: Vec<SubcircuitInfo>,
}

impl SubcircuitLibrary {
    /// Creates a library from the provided template descriptions.
    #[must_use]
    pub fn new(subcircuits: Vec<SubcircuitInfo>) -> Self {
        Self { subcircuits }
    }

    /// Creates the standard library of templates understood by the
    /// [`crate::finalize::witness::NativeBackend`].
    #[must_use]
    pub fn standard() -> Self {
        let word = LIMBS_PER_WORD;
        let subcircuits = vec![
            SubcircuitInfo::new(0, BUFFER_PUB_IN, None, None),
            SubcircuitInfo::new(1, BUFFER_PUB_OUT, None, None),
            SubcircuitInfo::new(2, BUFFER_PRV_IN, None, None),
            SubcircuitInfo::new(3, BUFFER_PRV_OUT, None, None),
            SubcircuitInfo::new(4, ALU1, Some(word), Some(3 * word)),
            SubcircuitInfo::new(5, ALU2, Some(word), Some(4 * word)),
            SubcircuitInfo::new(6, ALU3, Some(word), Some(3 * word)),
            SubcircuitInfo::new(7, ALU4, Some(word), Some(3 * word)),
            SubcircuitInfo::new(8, ALU5, Some(word), Some(3 * word)),
            SubcircuitInfo::new(9, AND, Some(word), Some(2 * word)),
            SubcircuitInfo::new(10, OR, Some(word), Some(2 * word)),
            SubcircuitInfo::new(11, XOR, Some(word), Some(2 * word)),
            SubcircuitInfo::new(12, DEC_TO_BIT, Some(256), Some(word)),
            SubcircuitInfo::new(13, SUB_EXP, Some(2 * word), Some(2 * word + 1)),
        ];
        Self::new(subcircuits)
    }

    /// Reads a library from a JSON list of template descriptions, as emitted by
    /// the constraint compiler.
    ///
    /// # Errors
    ///
    /// If `json` is not a valid list of template descriptions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let subcircuits: Vec<SubcircuitInfo> = serde_json::from_str(json)?;
        Ok(Self::new(subcircuits))
    }

    /// Gets the template called `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SubcircuitInfo> {
        self.subcircuits.iter().find(|info| info.name == name)
    }

    /// Gets the template with the numeric identifier `id`, if present.
    #[must_use]
    pub fn by_id(&self, id: usize) -> Option<&SubcircuitInfo> {
        self.subcircuits.iter().find(|info| info.id == id)
    }

    /// Gets all templates in the library.
    #[must_use]
    pub fn subcircuits(&self) -> &[SubcircuitInfo] {
        &self.subcircuits
    }
}

impl Default for SubcircuitLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

/// Gets the number of limbs taken by input port `index` of the standard
/// template `name`.
///
/// Every port is a word except the bit that [`SUB_EXP`] takes last. Buffers
/// and templates outside the standard set give [`None`], as their ports follow
/// the width of whatever they carry.
#[must_use]
pub fn input_port_limbs(name: &str, index: usize) -> Option<usize> {
    match name {
        SUB_EXP if index == 2 => Some(1),
        ALU1 | ALU2 | ALU3 | ALU4 | ALU5 | AND | OR | XOR | DEC_TO_BIT | SUB_EXP => {
            Some(LIMBS_PER_WORD)
        }
        _ => None,
    }
}

/// Gets the name of the buffer template for the buffer placement `id`.
#[must_use]
pub fn buffer_subcircuit(id: PlacementId) -> Option<&'static str> {
    match id {
        PlacementId::PUB_IN => Some(BUFFER_PUB_IN),
        PlacementId::PUB_OUT => Some(BUFFER_PUB_OUT),
        PlacementId::PRV_IN => Some(BUFFER_PRV_IN),
        PlacementId::PRV_OUT => Some(BUFFER_PRV_OUT),
        _ => None,
    }
}

/// Gets the template and selector that implement `op` as a single placement.
///
/// Returns [`None`] for [`ArithOp::Exp`], which is a composite of
/// [`DEC_TO_BIT`] and a chain of [`SUB_EXP`] placements.
#[must_use]
pub fn operation_subcircuit(op: ArithOp) -> Option<(&'static str, Option<U256>)> {
    let name = match op {
        ArithOp::Add
        | ArithOp::Mul
        | ArithOp::Sub
        | ArithOp::Eq
        | ArithOp::IsZero
        | ArithOp::Not => ALU1,
        ArithOp::Div
        | ArithOp::SDiv
        | ArithOp::Mod
        | ArithOp::SMod
        | ArithOp::AddMod
        | ArithOp::MulMod => ALU2,
        ArithOp::Shl | ArithOp::Shr | ArithOp::Sar => ALU3,
        ArithOp::Lt | ArithOp::Gt | ArithOp::SLt | ArithOp::SGt => ALU4,
        ArithOp::SignExtend | ArithOp::Byte => ALU5,
        ArithOp::And => return Some((AND, None)),
        ArithOp::Or => return Some((OR, None)),
        ArithOp::Xor => return Some((XOR, None)),
        ArithOp::Exp => return None,
    };

    Some((name, Some(op.selector())))
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        arith::ArithOp,
        synthesis::{
            placement::PlacementId,
            subcircuit::{self, SubcircuitLibrary},
        },
    };

    #[test]
    fn standard_library_covers_every_mapped_operation() {
        let library = SubcircuitLibrary::standard();
        for op in ArithOp::ALL {
            if let Some((name, _)) = subcircuit::operation_subcircuit(op) {
                assert!(library.get(name).is_some(), "{name} is missing");
            }
        }
        assert!(library.get(subcircuit::DEC_TO_BIT).is_some());
        assert!(library.get(subcircuit::SUB_EXP).is_some());
        for id in PlacementId::BUFFERS {
            let name = subcircuit::buffer_subcircuit(id).expect("Buffer has a template");
            assert!(library.get(name).expect("Buffer template exists").is_buffer());
        }
    }

    #[test]
    fn alu_operations_carry_opcode_selectors() {
        assert_eq!(
            subcircuit::operation_subcircuit(ArithOp::Add),
            Some((subcircuit::ALU1, Some(U256::ONE << 1u32)))
        );
        assert_eq!(
            subcircuit::operation_subcircuit(ArithOp::Sar),
            Some((subcircuit::ALU3, Some(U256::ONE << 0x1du32)))
        );
        assert_eq!(
            subcircuit::operation_subcircuit(ArithOp::Xor),
            Some((subcircuit::XOR, None))
        );
        assert_eq!(subcircuit::operation_subcircuit(ArithOp::Exp), None);
    }

    #[test]
    fn reads_libraries_from_json() -> anyhow::Result<()> {
        let json = r#"[
            {"id": 0, "name": "bufferPubIn", "outWires": null, "inWires": null},
            {"id": 4, "name": "ALU1", "outWires": 2, "inWires": 6, "nConstraints": 803}
        ]"#;
        let library = SubcircuitLibrary::from_json(json)?;

        let alu = library.by_id(4).expect("ALU1 was read");
        assert_eq!(alu.name, "ALU1");
        assert_eq!(alu.n_constraints, Some(803));
        assert!(library.get("bufferPubIn").expect("Buffer was read").is_buffer());

        Ok(())
    }
}
