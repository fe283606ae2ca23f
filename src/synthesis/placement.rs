//! This module contains the definition of a [`Placement`], one instance of a
//! subcircuit template wired to concrete input and output symbols.

use std::fmt::{Display, Formatter};

use ethnum::U256;
use serde::{Deserialize, Serialize};

use crate::synthesis::symbol::DataPt;

/// The identifier of a placement, and its row in the circuit.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct PlacementId(pub usize);

impl PlacementId {
    /// The buffer carrying public values into the circuit.
    pub const PUB_IN: Self = Self(0);

    /// The buffer carrying public values out of the circuit.
    pub const PUB_OUT: Self = Self(1);

    /// The buffer carrying private values into the circuit.
    pub const PRV_IN: Self = Self(2);

    /// The buffer carrying private values out of the circuit.
    pub const PRV_OUT: Self = Self(3);

    /// The four buffer placements, in id order.
    pub const BUFFERS: [Self; 4] = [Self::PUB_IN, Self::PUB_OUT, Self::PRV_IN, Self::PRV_OUT];

    /// Checks if the placement is one of the four reserved buffers.
    #[must_use]
    pub fn is_buffer(&self) -> bool {
        Self::BUFFERS.contains(self)
    }

    /// Checks if the placement is a buffer that mints symbols from external
    /// values.
    #[must_use]
    pub fn is_input_buffer(&self) -> bool {
        *self == Self::PUB_IN || *self == Self::PRV_IN
    }

    /// Checks if the placement is a buffer that exports symbols as external
    /// values.
    #[must_use]
    pub fn is_output_buffer(&self) -> bool {
        *self == Self::PUB_OUT || *self == Self::PRV_OUT
    }

    /// Checks if the placement is a buffer whose contents are revealed to the
    /// verifier.
    #[must_use]
    pub fn is_public_buffer(&self) -> bool {
        *self == Self::PUB_IN || *self == Self::PUB_OUT
    }
}

impl Display for PlacementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of the circuit DAG.
///
/// The inputs of a placement are symbols produced by earlier placements, or
/// literals. Its outputs are symbols whose source is the placement itself, with
/// wire indices matching their positions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Placement {
    id:                  PlacementId,
    subcircuit:          String,
    usage:               String,
    selector:            Option<U256>,
    in_pts:              Vec<DataPt>,
    out_pts:             Vec<DataPt>,
    instruction_pointer: u32,
}

impl Placement {
    /// Creates a new placement.
    #[must_use]
    pub fn new(
        id: PlacementId,
        subcircuit: impl Into<String>,
        usage: impl Into<String>,
        selector: Option<U256>,
        in_pts: Vec<DataPt>,
        out_pts: Vec<DataPt>,
        instruction_pointer: u32,
    ) -> Self {
        Self {
            id,
            subcircuit: subcircuit.into(),
            usage: usage.into(),
            selector,
            in_pts,
            out_pts,
            instruction_pointer,
        }
    }

    /// Creates an empty buffer placement.
    #[must_use]
    pub fn buffer(id: PlacementId, subcircuit: impl Into<String>) -> Self {
        Self::new(id, subcircuit, "buffer", None, vec![], vec![], 0)
    }

    #[must_use]
    pub fn id(&self) -> PlacementId {
        self.id
    }

    /// Gets the name of the subcircuit template that the placement
    /// instantiates.
    #[must_use]
    pub fn subcircuit(&self) -> &str {
        &self.subcircuit
    }

    /// Gets the name of the operation that the placement performs.
    #[must_use]
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Gets the selector flag choosing the operation of a multi-operation
    /// subcircuit.
    #[must_use]
    pub fn selector(&self) -> Option<U256> {
        self.selector
    }

    #[must_use]
    pub fn in_pts(&self) -> &[DataPt] {
        &self.in_pts
    }

    #[must_use]
    pub fn out_pts(&self) -> &[DataPt] {
        &self.out_pts
    }

    /// Gets the byte offset of the instruction whose execution created the
    /// placement.
    #[must_use]
    pub fn instruction_pointer(&self) -> u32 {
        self.instruction_pointer
    }

    /// Appends a wire pair to a buffer placement.
    pub(crate) fn push_wire(&mut self, in_pt: DataPt, out_pt: DataPt) {
        self.in_pts.push(in_pt);
        self.out_pts.push(out_pt);
    }

    /// Replaces the wires of the placement.
    pub(crate) fn set_wires(&mut self, in_pts: Vec<DataPt>, out_pts: Vec<DataPt>) {
        self.in_pts = in_pts;
        self.out_pts = out_pts;
    }
}

#[cfg(test)]
mod test {
    use crate::synthesis::placement::PlacementId;

    #[test]
    fn classifies_buffers() {
        assert!(PlacementId::PUB_IN.is_input_buffer());
        assert!(PlacementId::PRV_IN.is_input_buffer());
        assert!(PlacementId::PUB_OUT.is_output_buffer());
        assert!(PlacementId::PRV_OUT.is_output_buffer());
        assert!(PlacementId::PUB_OUT.is_public_buffer());
        assert!(!PlacementId::PRV_IN.is_public_buffer());
        assert!(!PlacementId(4).is_buffer());
    }
}
