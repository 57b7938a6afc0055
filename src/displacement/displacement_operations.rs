//! Displacement extraction - pure functions over immutable snapshots.

use glam::DVec3;

use crate::coords::normalize_delta;
use crate::displacement::{DisplacementRecord, DisplacementSet};
use crate::error::{MorphError, MorphResult};

/// Compute the sparse normalized displacement set between two
/// vertex-aligned position arrays.
///
/// Records whose normalized magnitude is at or below `min_len` are
/// dropped (strictly-greater test). Output order follows input index
/// order, so the set is always ascending by vertex index.
pub fn extract(
    base_positions: &[DVec3],
    morphed_positions: &[DVec3],
    unit_scale: f64,
    min_len: f64,
) -> MorphResult<DisplacementSet> {
    if base_positions.len() != morphed_positions.len() {
        return Err(MorphError::ShapeMismatch {
            expected: base_positions.len(),
            found: morphed_positions.len(),
        });
    }

    let mut records = Vec::new();
    for (i, (base, morphed)) in base_positions.iter().zip(morphed_positions).enumerate() {
        let delta = normalize_delta(*morphed - *base, unit_scale);
        if delta.length() > min_len {
            records.push(DisplacementRecord {
                index: i as u32,
                delta,
            });
        }
    }

    log::debug!(
        "[Extractor] retained {} of {} vertex displacements (min_len {})",
        records.len(),
        base_positions.len(),
        min_len
    );
    Ok(DisplacementSet::new(records))
}
