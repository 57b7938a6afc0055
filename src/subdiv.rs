//! Subdivision-level bookkeeping.
//!
//! The effective level of an HD mesh comes either from an explicit
//! subdivision modifier record or from comparing polygon counts under
//! uniform Catmull-Clark quadrupling. Non-integral or non-positive
//! results are rejected rather than guessed: a silently wrong level
//! corrupts every displacement downstream.

use crate::error::{MorphError, MorphResult};

/// Kind of subdivision modifier reported by the Mesh Host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    /// Uniform subdivision surface modifier.
    Subsurf,
    /// Multiresolution modifier carrying sculpt levels.
    Multires,
    /// Armature deformation.
    Armature,
    /// Anything else on the stack.
    Other,
}

impl ModifierKind {
    pub fn is_subdivision(self) -> bool {
        matches!(self, ModifierKind::Subsurf | ModifierKind::Multires)
    }
}

/// One modifier on a host mesh's stack, as reported by the host.
#[derive(Debug, Clone)]
pub struct ModifierRecord {
    pub kind: ModifierKind,
    /// Current viewport level for subdivision kinds.
    pub levels: u32,
    /// Highest sculpted level for multires; equals `levels` otherwise.
    pub total_levels: u32,
}

/// Validate a level declared by an explicit modifier record.
pub fn level_from_modifier(declared_level: u32) -> MorphResult<u32> {
    if declared_level == 0 {
        return Err(MorphError::invalid_subdivision(
            "hd mesh is not subdivided (modifier level is 0)",
        ));
    }
    Ok(declared_level)
}

/// Derive the subdivision level from polygon counts, assuming uniform
/// quadrupling per level. Only valid for meshes of triangles and quads;
/// n-gons break the 4x-per-level assumption.
pub fn level_from_polygon_counts(base_polygons: usize, hd_polygons: usize) -> MorphResult<u32> {
    if base_polygons == 0 || hd_polygons == 0 {
        return Err(MorphError::invalid_subdivision(format!(
            "polygon counts must be non-zero (base {}, hd {})",
            base_polygons, hd_polygons
        )));
    }
    let ratio = hd_polygons as f64 / base_polygons as f64;
    let level = (ratio.ln() / 4f64.ln()).round();
    if level < 1.0 {
        return Err(MorphError::invalid_subdivision(format!(
            "hd mesh polygon count {} is not above base mesh's {}",
            hd_polygons, base_polygons
        )));
    }
    let level = level as u32;
    // The rounded level must reproduce the hd count exactly; anything else
    // means the hd mesh is not a uniform subdivision of the base.
    let expected = 4usize
        .checked_pow(level)
        .and_then(|quad| base_polygons.checked_mul(quad));
    if expected != Some(hd_polygons) {
        return Err(MorphError::invalid_subdivision(format!(
            "hd polygon count {} is not a power-of-4 multiple of base count {}",
            hd_polygons, base_polygons
        )));
    }
    Ok(level)
}

/// Find the single subdivision modifier on a stack. More than one is an
/// error; none returns `Ok(None)`.
pub fn find_subdivision_modifier(
    modifiers: &[ModifierRecord],
) -> MorphResult<Option<&ModifierRecord>> {
    let mut found = None;
    for m in modifiers {
        if m.kind.is_subdivision() {
            if found.is_some() {
                return Err(MorphError::invalid_subdivision(
                    "hd mesh has more than 1 subdivision modifier",
                ));
            }
            found = Some(m);
        }
    }
    Ok(found)
}
