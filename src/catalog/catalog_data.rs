//! Catalog data types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{MorphError, MorphResult};
use crate::mesh::Fingerprint;

/// How the reference HD mesh for a correspondence map was produced.
///
/// The tag is part of the matching-file name: maps built against the
/// host's direct multires subdivision (`mr`) do not align with maps built
/// against a reconstructed multires mesh (`mrr`), so the two never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubdivMethod {
    Multires,
    MultiresRec,
}

impl SubdivMethod {
    pub const ALL: [SubdivMethod; 2] = [SubdivMethod::Multires, SubdivMethod::MultiresRec];

    /// Filename tag.
    pub fn suffix(self) -> &'static str {
        match self {
            SubdivMethod::Multires => "mr",
            SubdivMethod::MultiresRec => "mrr",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "mr" => Some(SubdivMethod::Multires),
            "mrr" => Some(SubdivMethod::MultiresRec),
            _ => None,
        }
    }
}

impl fmt::Display for SubdivMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Matching files known for one base-mesh fingerprint, grouped by
/// subdivision method and level. Rebuilt by a directory scan each
/// session; never updated incrementally.
#[derive(Debug, Clone)]
pub struct MatchingCatalog {
    fingerprint: Fingerprint,
    entries: BTreeMap<SubdivMethod, BTreeMap<u32, PathBuf>>,
}

impl MatchingCatalog {
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            entries: BTreeMap::new(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn insert(&mut self, method: SubdivMethod, level: u32, path: PathBuf) {
        self.entries.entry(method).or_default().insert(level, path);
    }

    pub fn path_for(&self, method: SubdivMethod, level: u32) -> Option<&Path> {
        self.entries
            .get(&method)
            .and_then(|levels| levels.get(&level))
            .map(PathBuf::as_path)
    }

    /// Levels in `1..=max_level` with no catalog entry for `method`. A
    /// method absent entirely means every level is missing.
    pub fn missing_levels(&self, max_level: u32, method: SubdivMethod) -> Vec<u32> {
        (1..=max_level)
            .filter(|level| self.path_for(method, *level).is_none())
            .collect()
    }

    /// Ordered level-1..max_level paths. Fails with the full list of
    /// absent levels; checked before any expensive displacement work.
    pub fn paths_for(&self, max_level: u32, method: SubdivMethod) -> MorphResult<Vec<PathBuf>> {
        let missing = self.missing_levels(max_level, method);
        if !missing.is_empty() {
            return Err(MorphError::MissingMatchFiles {
                method,
                levels: missing,
            });
        }
        Ok((1..=max_level)
            .map(|level| {
                self.path_for(method, level)
                    .expect("levels verified present above")
                    .to_path_buf()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with_levels(levels: &[u32]) -> MatchingCatalog {
        let mut catalog = MatchingCatalog::new(Fingerprint {
            vertices: 8,
            edges: 12,
            polygons: 6,
        });
        for &level in levels {
            catalog.insert(
                SubdivMethod::Multires,
                level,
                PathBuf::from(format!("f8-12-6_div{}_mr.json", level)),
            );
        }
        catalog
    }

    #[test]
    fn test_missing_levels() {
        let catalog = catalog_with_levels(&[1, 2]);
        assert_eq!(catalog.missing_levels(3, SubdivMethod::Multires), vec![3]);
        // Method absent entirely: everything is missing.
        assert_eq!(
            catalog.missing_levels(2, SubdivMethod::MultiresRec),
            vec![1, 2]
        );
    }

    #[test]
    fn test_paths_for_complete_catalog() {
        let catalog = catalog_with_levels(&[1, 2, 3]);
        let paths = catalog.paths_for(3, SubdivMethod::Multires).expect("paths");
        assert_eq!(paths.len(), 3);
        assert!(paths[2].to_string_lossy().contains("div3"));
    }

    #[test]
    fn test_paths_for_incomplete_catalog_fails() {
        let catalog = catalog_with_levels(&[1, 3]);
        match catalog.paths_for(3, SubdivMethod::Multires) {
            Err(MorphError::MissingMatchFiles { method, levels }) => {
                assert_eq!(method, SubdivMethod::Multires);
                assert_eq!(levels, vec![2]);
            }
            other => panic!("expected MissingMatchFiles, got {:?}", other),
        }
    }

    #[test]
    fn test_suffix_round_trip() {
        for method in SubdivMethod::ALL {
            assert_eq!(SubdivMethod::from_suffix(method.suffix()), Some(method));
        }
        assert_eq!(SubdivMethod::from_suffix("sd"), None);
    }
}
