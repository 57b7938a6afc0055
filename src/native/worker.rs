//! Single-flight execution of native calls.
//!
//! The native library is not reentrant and a crash inside it must not
//! take down the caller's thread state mid-operation. Every call is
//! therefore serialized behind a mutex and executed on a fresh dedicated
//! worker thread, with the caller blocked until the result comes back. A
//! panic on the worker surfaces as a `Native` error, not a caller panic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::error::{MorphError, MorphResult};
use crate::native::NativeSubdivider;

/// Wraps any [`NativeSubdivider`] with strict one-at-a-time invocation.
/// The wrapper implements the trait itself, so pipelines never know
/// whether they hold the raw library or the serialized one.
pub struct SingleFlight<N> {
    native: Arc<N>,
    gate: Mutex<()>,
}

impl<N> SingleFlight<N>
where
    N: NativeSubdivider + Send + Sync + 'static,
{
    pub fn new(native: N) -> Self {
        Self {
            native: Arc::new(native),
            gate: Mutex::new(()),
        }
    }

    fn run<T, F>(&self, call: &'static str, f: F) -> MorphResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&N) -> MorphResult<T> + Send + 'static,
    {
        let _guard = self.gate.lock();
        let native = Arc::clone(&self.native);
        let handle = thread::Builder::new()
            .name("native-worker".to_string())
            .spawn(move || f(&native))
            .map_err(|e| MorphError::Native {
                call,
                reason: format!("failed to spawn worker thread: {}", e),
            })?;
        handle.join().map_err(|_| MorphError::Native {
            call,
            reason: "worker thread panicked".to_string(),
        })?
    }
}

impl<N> NativeSubdivider for SingleFlight<N>
where
    N: NativeSubdivider + Send + Sync + 'static,
{
    fn generate_hd_mesh(
        &self,
        unit_scale: f64,
        base_export: &Path,
        hd_level: u32,
        output_dir: &Path,
        output_name: &str,
    ) -> MorphResult<PathBuf> {
        let base_export = base_export.to_path_buf();
        let output_dir = output_dir.to_path_buf();
        let output_name = output_name.to_string();
        self.run("generate_hd_mesh", move |native| {
            native.generate_hd_mesh(unit_scale, &base_export, hd_level, &output_dir, &output_name)
        })
    }

    fn generate_dhdm_file(
        &self,
        unit_scale: f64,
        base_export: &Path,
        hd_level: u32,
        matching_paths: &[PathBuf],
        output_dir: &Path,
        output_name: &str,
    ) -> MorphResult<PathBuf> {
        let base_export = base_export.to_path_buf();
        let matching_paths = matching_paths.to_vec();
        let output_dir = output_dir.to_path_buf();
        let output_name = output_name.to_string();
        self.run("generate_dhdm_file", move |native| {
            native.generate_dhdm_file(
                unit_scale,
                &base_export,
                hd_level,
                &matching_paths,
                &output_dir,
                &output_name,
            )
        })
    }
}
