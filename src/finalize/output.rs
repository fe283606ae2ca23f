//! This module contains the artifacts handed to the prover, and their
//! serialized form.

use serde::{Deserialize, Serialize};

use crate::{
    error::{
        container::Locatable,
        finalize::{Error, Result},
    },
    finalize::{
        permutation::Cycle,
        refactor::LimbPlacement,
        witness::PlacementWitness,
    },
    synthesis::placement::PlacementId,
    utility::U256W,
};

/// The wire-equality cycles of the circuit.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    pub cycles: Vec<Cycle>,
}

/// The contents of the four buffers, together with the flattened witnesses of
/// the public and private parts of the circuit.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IoArtifact {
    pub public_input:    Vec<U256W>,
    pub public_output:   Vec<U256W>,
    pub private_input:   Vec<U256W>,
    pub private_output:  Vec<U256W>,
    pub public_witness:  Vec<U256W>,
    pub private_witness: Vec<U256W>,
}

/// The full wire vector of a single placement.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementWires {
    pub placement:     usize,
    pub subcircuit_id: usize,
    pub subcircuit:    String,
    pub wires:         Vec<U256W>,
}

/// The wire vectors of every placement, in id order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessArtifact {
    pub placements: Vec<PlacementWires>,
}

/// Everything produced by finalization.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    pub topology: Topology,
    pub io:       IoArtifact,
    pub witness:  WitnessArtifact,
}

impl Artifacts {
    /// Assembles the artifacts from the refactored `placements`, their
    /// `witnesses` in the same order, and the permutation `cycles`.
    #[must_use]
    pub fn assemble(
        placements: &[LimbPlacement],
        witnesses: Vec<PlacementWitness>,
        cycles: Vec<Cycle>,
    ) -> Self {
        let mut io = IoArtifact::default();
        for placement in placements {
            let values = placement.outputs.iter().map(U256W::from).collect();
            match placement.id {
                PlacementId::PUB_IN => io.public_input = values,
                PlacementId::PUB_OUT => io.public_output = values,
                PlacementId::PRV_IN => io.private_input = values,
                PlacementId::PRV_OUT => io.private_output = values,
                _ => {}
            }
        }

        let placements: Vec<PlacementWires> = witnesses
            .into_iter()
            .map(|w| PlacementWires {
                placement:     w.placement,
                subcircuit_id: w.subcircuit_id,
                subcircuit:    w.subcircuit,
                wires:         w.wires.into_iter().map(U256W::from).collect(),
            })
            .collect();

        for placement in &placements {
            let target = if PlacementId(placement.placement).is_public_buffer() {
                &mut io.public_witness
            } else {
                &mut io.private_witness
            };
            target.extend_from_slice(&placement.wires);
        }

        Self {
            topology: Topology { cycles },
            io,
            witness: WitnessArtifact { placements },
        }
    }

    /// Serializes the artifacts as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// If serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()).locate(0))
    }

    /// Reads artifacts back from their JSON form.
    ///
    /// # Errors
    ///
    /// If `json` does not describe a set of artifacts.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()).locate(0))
    }
}
