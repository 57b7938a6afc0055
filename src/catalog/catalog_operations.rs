//! Catalog construction by directory scan.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::catalog::{MatchingCatalog, SubdivMethod};
use crate::error::{IoResultExt, MorphResult};
use crate::mesh::Fingerprint;

lazy_static! {
    /// `f<V>-<E>-<F>_div<level>_<method>.json`
    static ref MATCHING_FILENAME: Regex =
        Regex::new(r"^f(\d+)-(\d+)-(\d+)_div(\d+)_(mr|mrr)\.json$")
            .expect("matching filename pattern is valid");
}

/// Canonical file name for a persisted correspondence map.
pub fn matching_filename(fingerprint: Fingerprint, level: u32, method: SubdivMethod) -> String {
    format!("f{}_div{}_{}.json", fingerprint, level, method.suffix())
}

/// Parse a matching-file name into its catalog key. Returns `None` for
/// anything that does not follow the pattern.
fn parse_filename(name: &str) -> Option<(Fingerprint, u32, SubdivMethod)> {
    let captures = MATCHING_FILENAME.captures(name)?;
    let fingerprint = Fingerprint {
        vertices: captures[1].parse().ok()?,
        edges: captures[2].parse().ok()?,
        polygons: captures[3].parse().ok()?,
    };
    let level: u32 = captures[4].parse().ok()?;
    let method = SubdivMethod::from_suffix(&captures[5])?;
    Some((fingerprint, level, method))
}

/// Build the catalog for `fingerprint` by scanning `dir` (non-recursive).
/// Files with a different fingerprint or a foreign name are ignored, not
/// errors.
pub fn scan_catalog(dir: &Path, fingerprint: Fingerprint) -> MorphResult<MatchingCatalog> {
    let mut catalog = MatchingCatalog::new(fingerprint);
    for entry in std::fs::read_dir(dir).at_path(dir)? {
        let entry = entry.at_path(dir)?;
        if !entry.file_type().at_path(entry.path())?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some((file_fingerprint, level, method)) = parse_filename(name) else {
            continue;
        };
        if file_fingerprint == fingerprint {
            catalog.insert(method, level, entry.path());
        }
    }
    Ok(catalog)
}
