//! External native subdivision/export library boundary.
//!
//! The native library regenerates HD meshes with its own subdivision
//! algorithm and encodes the `.dhdm` payload. It is invoked through
//! [`NativeSubdivider`]; the [`worker::SingleFlight`] wrapper guarantees
//! at most one concurrent invocation, each isolated on a dedicated
//! worker thread.

pub mod ffi;
pub mod worker;

use std::path::{Path, PathBuf};

use crate::error::MorphResult;

/// Operations the external native library provides. Implementations
/// receive file paths, never live mesh objects: interchange happens
/// through exported OBJ files on disk.
pub trait NativeSubdivider {
    /// Subdivide the exported base mesh to `hd_level` with the native
    /// algorithm and write `<output_name>.obj` into `output_dir`.
    /// Returns the written path.
    fn generate_hd_mesh(
        &self,
        unit_scale: f64,
        base_export: &Path,
        hd_level: u32,
        output_dir: &Path,
        output_name: &str,
    ) -> MorphResult<PathBuf>;

    /// Compute and encode the `.dhdm` displacement payload for the
    /// exported base/HD mesh pair, translating vertex order through the
    /// given matching files (one per level, ascending). Returns the
    /// written `.dhdm` path.
    fn generate_dhdm_file(
        &self,
        unit_scale: f64,
        base_export: &Path,
        hd_level: u32,
        matching_paths: &[PathBuf],
        output_dir: &Path,
        output_name: &str,
    ) -> MorphResult<PathBuf>;
}

pub use ffi::DhdmLibrary;
pub use worker::SingleFlight;
