//! Error handling for the HD morph engine.
//!
//! Every failure mode maps to exactly one variant with the diagnostic
//! detail embedded in its message. Nothing here is retried: each variant
//! reflects bad input geometry, a bad cached file, or a failed external
//! collaborator, and the calling operation aborts without leaving a
//! partially written output file.

use std::path::PathBuf;

use crate::catalog::SubdivMethod;

/// Result alias used throughout the engine.
pub type MorphResult<T> = Result<T, MorphError>;

#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    /// Two meshes that must be vertex-aligned are not.
    #[error("vertex count mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    /// Too many candidate vertices matched a reference vertex beyond the
    /// distance gate. No partial correspondence map is returned.
    #[error("canceled: more than {max_non_optimal} non-optimal matches ({non_optimal} total)")]
    MatchQuality {
        non_optimal: u32,
        max_non_optimal: u32,
    },

    /// The matching-file catalog is missing required levels. Checked before
    /// any displacement work begins.
    #[error("matching files for levels {levels:?} ({method}) missing; generate them first")]
    MissingMatchFiles {
        method: SubdivMethod,
        levels: Vec<u32>,
    },

    /// A subdivision level could not be derived for the HD mesh.
    #[error("invalid subdivision: {reason}")]
    InvalidSubdivision { reason: String },

    /// A persisted binary displacement file is malformed.
    #[error("corrupt displacement file header in \"{}\": {reason}", .path.display())]
    CorruptHeader { path: PathBuf, reason: String },

    /// A morph descriptor document lacks the expected structure.
    #[error("invalid descriptor template: {reason}")]
    InvalidTemplate { reason: String },

    /// A persisted correspondence map could not be parsed.
    #[error("corrupt matching file \"{}\": {reason}", .path.display())]
    CorruptMatchingFile { path: PathBuf, reason: String },

    /// A configuration or request field failed validation before any work.
    #[error("invalid {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Filesystem failure while reading or writing an artifact.
    #[error("io error for \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The external native library call failed.
    #[error("native call {call}() failed: {reason}")]
    Native { call: &'static str, reason: String },

    /// Opaque failure from the Mesh Host collaborator.
    #[error("mesh host error: {0}")]
    Host(#[from] anyhow::Error),
}

impl MorphError {
    /// Attach a path to an io error. `std::io::Error` carries no path of
    /// its own, and every message here must name the file involved.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MorphError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        MorphError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_subdivision(reason: impl Into<String>) -> Self {
        MorphError::InvalidSubdivision {
            reason: reason.into(),
        }
    }
}

/// Extension trait pinning a path onto bare io results.
pub trait IoResultExt<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> MorphResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> MorphResult<T> {
        self.map_err(|e| MorphError::io(path, e))
    }
}
