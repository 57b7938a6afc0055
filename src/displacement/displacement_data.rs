//! Displacement data types.

use glam::DVec3;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// One retained per-vertex displacement in normalized DAZ space.
///
/// Serializes as the `[index, dx, dy, dz]` tuple the morph descriptor's
/// `deltas.values` array expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementRecord {
    pub index: u32,
    pub delta: DVec3,
}

impl Serialize for DisplacementRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(4))?;
        seq.serialize_element(&self.index)?;
        seq.serialize_element(&self.delta.x)?;
        seq.serialize_element(&self.delta.y)?;
        seq.serialize_element(&self.delta.z)?;
        seq.end()
    }
}

/// Ordered sparse set of displacement records, ascending by vertex index.
///
/// Records below the extractor's minimum-magnitude threshold are omitted
/// on purpose; sparsity is not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplacementSet {
    records: Vec<DisplacementRecord>,
}

impl DisplacementSet {
    pub fn new(records: Vec<DisplacementRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DisplacementRecord] {
        &self.records
    }

    /// Record count, the value written to the descriptor's `deltas.count`.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The `deltas.values` JSON array.
    pub fn values_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.records).expect("displacement records are always serializable")
    }
}
