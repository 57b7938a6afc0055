//! Correspondence matcher with a match-quality gate.

use glam::DVec3;

use crate::config::EngineConfig;
use crate::error::{MorphError, MorphResult};
use crate::matching::KdTree;

/// Dense mapping from candidate vertex index to reference vertex index.
/// Immutable once built; persisted via the matching-file codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrespondenceMap {
    map: Vec<u32>,
}

impl CorrespondenceMap {
    pub fn new(map: Vec<u32>) -> Self {
        Self { map }
    }

    /// Reference index matched to candidate vertex `j`.
    pub fn reference_of(&self, candidate: usize) -> u32 {
        self.map[candidate]
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.map
    }
}

/// Matcher thresholds, normally taken from [`EngineConfig`].
#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    pub max_dist: f64,
    pub max_non_optimal: u32,
    pub warn_print_cap: u32,
}

impl From<&EngineConfig> for MatchParams {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_dist: config.max_match_dist,
            max_non_optimal: config.max_non_optimal,
            warn_print_cap: config.warn_print_cap,
        }
    }
}

impl Default for MatchParams {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Match every candidate vertex to its nearest reference vertex.
///
/// A match farther than `max_dist` is non-optimal: it is counted (and the
/// first `warn_print_cap` are logged), and once the count exceeds
/// `max_non_optimal` the whole operation fails without returning a
/// partial map. Ties at equal distance go to the lowest reference index,
/// so the result is bit-identical across runs for identical input.
pub fn match_meshes(
    reference_positions: &[DVec3],
    candidate_positions: &[DVec3],
    params: MatchParams,
) -> MorphResult<CorrespondenceMap> {
    let tree = KdTree::build(reference_positions.to_vec());
    log::info!(
        "[Matcher] matching {} candidate vertices against {} reference vertices",
        candidate_positions.len(),
        reference_positions.len()
    );

    let mut non_optimal: u32 = 0;
    let mut map = Vec::with_capacity(candidate_positions.len());
    for (j, &position) in candidate_positions.iter().enumerate() {
        let (i, dist) = tree.nearest(position).ok_or(MorphError::ShapeMismatch {
            expected: candidate_positions.len(),
            found: 0,
        })?;
        if dist > params.max_dist {
            non_optimal += 1;
            if non_optimal <= params.warn_print_cap {
                log::warn!(
                    "[Matcher] vertex matching wasn't optimal (candidate {}, distance = {})",
                    j,
                    dist
                );
            }
            if non_optimal > params.max_non_optimal {
                return Err(MorphError::MatchQuality {
                    non_optimal,
                    max_non_optimal: params.max_non_optimal,
                });
            }
        }
        map.push(i);
    }

    if non_optimal > 0 {
        log::warn!(
            "[Matcher] {} non-optimal matches (threshold {})",
            non_optimal,
            params.max_dist
        );
    }
    Ok(CorrespondenceMap::new(map))
}
