//! Dynamic-library implementation of [`NativeSubdivider`].
//!
//! Mirrors the native library's C ABI: both entry points take a
//! `MeshInfo` describing the exported base mesh and return zero on
//! success. All strings cross the boundary as NUL-terminated UTF-8.

use std::ffi::{c_char, c_int, CString};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use crate::error::{MorphError, MorphResult};
use crate::native::NativeSubdivider;

#[repr(C)]
struct MeshInfo {
    g_scale: f32,
    base_exported: *const c_char,
    hd_level: u16,
    load_uv_layers: i16,
}

#[repr(C)]
struct FilepathsInfo {
    filepaths: *const *const c_char,
    fps_count: u16,
}

type GenerateHdMeshFn = unsafe extern "C" fn(
    mesh_info: *const MeshInfo,
    output_dir: *const c_char,
    output_name: *const c_char,
) -> c_int;

type GenerateDhdmFileFn = unsafe extern "C" fn(
    mesh_info: *const MeshInfo,
    fps_info: *const FilepathsInfo,
    output_dir: *const c_char,
    output_name: *const c_char,
) -> c_int;

/// Loaded native library handle.
pub struct DhdmLibrary {
    library: Library,
}

impl DhdmLibrary {
    /// Load the native library from `path`.
    pub fn load(path: &Path) -> MorphResult<Self> {
        // SAFETY: loading runs the library's initialization; the library
        // is the project's own native companion, not arbitrary input.
        let library = unsafe { Library::new(path) }.map_err(|e| MorphError::Native {
            call: "load",
            reason: format!("failed to load \"{}\": {}", path.display(), e),
        })?;
        log::info!("[Native] loaded \"{}\"", path.display());
        Ok(Self { library })
    }

    fn c_string(value: &str, call: &'static str) -> MorphResult<CString> {
        CString::new(value).map_err(|_| MorphError::Native {
            call,
            reason: format!("argument contains a NUL byte: {:?}", value),
        })
    }

    fn c_path(path: &Path, call: &'static str) -> MorphResult<CString> {
        let text = path.to_str().ok_or_else(|| MorphError::Native {
            call,
            reason: format!("path is not valid UTF-8: {:?}", path),
        })?;
        Self::c_string(text, call)
    }
}

impl NativeSubdivider for DhdmLibrary {
    fn generate_hd_mesh(
        &self,
        unit_scale: f64,
        base_export: &Path,
        hd_level: u32,
        output_dir: &Path,
        output_name: &str,
    ) -> MorphResult<PathBuf> {
        const CALL: &str = "generate_hd_mesh";
        let base = Self::c_path(base_export, CALL)?;
        let out_dir = Self::c_path(output_dir, CALL)?;
        let out_name = Self::c_string(output_name, CALL)?;
        let mesh_info = MeshInfo {
            g_scale: unit_scale as f32,
            base_exported: base.as_ptr(),
            hd_level: hd_level as u16,
            load_uv_layers: -1,
        };

        log::info!("[Native] {}: level {}", CALL, hd_level);
        // SAFETY: pointers stay alive for the duration of the call; the
        // signature matches the library's exported ABI.
        let status = unsafe {
            let function: Symbol<GenerateHdMeshFn> =
                self.library.get(CALL.as_bytes()).map_err(|e| MorphError::Native {
                    call: CALL,
                    reason: e.to_string(),
                })?;
            function(&mesh_info, out_dir.as_ptr(), out_name.as_ptr())
        };
        if status != 0 {
            return Err(MorphError::Native {
                call: CALL,
                reason: format!("returned status {}", status),
            });
        }
        Ok(output_dir.join(format!("{}.obj", output_name)))
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
        const CALL: &str = "generate_dhdm_file";
        let base = Self::c_path(base_export, CALL)?;
        let out_dir = Self::c_path(output_dir, CALL)?;
        let out_name = Self::c_string(output_name, CALL)?;

        let matching: Vec<CString> = matching_paths
            .iter()
            .map(|p| Self::c_path(p, CALL))
            .collect::<MorphResult<_>>()?;
        let matching_ptrs: Vec<*const c_char> = matching.iter().map(|s| s.as_ptr()).collect();
        let fps_info = FilepathsInfo {
            filepaths: matching_ptrs.as_ptr(),
            fps_count: matching_ptrs.len() as u16,
        };
        let mesh_info = MeshInfo {
            g_scale: unit_scale as f32,
            base_exported: base.as_ptr(),
            hd_level: hd_level as u16,
            load_uv_layers: -1,
        };

        log::info!(
            "[Native] {}: level {}, {} matching files",
            CALL,
            hd_level,
            matching_ptrs.len()
        );
        // SAFETY: as above; the filepaths array outlives the call.
        let status = unsafe {
            let function: Symbol<GenerateDhdmFileFn> =
                self.library.get(CALL.as_bytes()).map_err(|e| MorphError::Native {
                    call: CALL,
                    reason: e.to_string(),
                })?;
            function(&mesh_info, &fps_info, out_dir.as_ptr(), out_name.as_ptr())
        };
        if status != 0 {
            return Err(MorphError::Native {
                call: CALL,
                reason: format!("returned status {}", status),
            });
        }
        Ok(output_dir.join(format!("{}.dhdm", output_name)))
    }
}
