//! Matching-file generation pipeline.
//!
//! For every requested subdivision level this builds two HD meshes of
//! the same base: a reference from the host's own multires subdivision
//! and a candidate regenerated by the native library, then persists the
//! vertex correspondence between them into the matching-file catalog.

use std::path::PathBuf;

use crate::catalog::{matching_filename, scan_catalog, SubdivMethod};
use crate::error::{MorphError, MorphResult};
use crate::matching::{match_meshes, write_matching_file, MatchParams};
use crate::mesh::{Fingerprint, MeshSnapshot};
use crate::native::NativeSubdivider;
use crate::workflow::request::{temporary_subdir, MatchingRequest};
use crate::workflow::{MeshHandle, MeshHost};

/// What a matching run produced.
#[derive(Debug)]
pub struct MatchingOutcome {
    /// Matching files written, in generation order.
    pub written: Vec<PathBuf>,
}

impl MatchingOutcome {
    /// True when every requested level already had a compatible file.
    pub fn is_up_to_date(&self) -> bool {
        self.written.is_empty()
    }
}

/// Generate matching files for levels `1..=max_level` of the request's
/// base mesh, for both subdivision methods. Levels with an existing
/// compatible file are skipped unless `force_new` is set.
pub fn generate_matching_files<H: MeshHost, N: NativeSubdivider>(
    host: &mut H,
    native: &N,
    request: &MatchingRequest,
) -> MorphResult<MatchingOutcome> {
    request.validate()?;

    let fingerprint = host.snapshot_raw(request.base)?.fingerprint();
    let catalog = scan_catalog(&request.matching_dir, fingerprint)?;

    let missing = |method: SubdivMethod| -> Vec<u32> {
        if request.force_new {
            (1..=request.max_level).collect()
        } else {
            catalog.missing_levels(request.max_level, method)
        }
    };
    let missing_mr = missing(SubdivMethod::Multires);
    let missing_mrr = missing(SubdivMethod::MultiresRec);

    if missing_mr.is_empty() && missing_mrr.is_empty() {
        log::info!("[Matching] matching files already exist up to level {}", request.max_level);
        return Ok(MatchingOutcome { written: Vec::new() });
    }

    let mut scratch = Vec::new();
    let result = run_levels(
        host,
        native,
        request,
        fingerprint,
        &missing_mr,
        &missing_mrr,
        &mut scratch,
    );
    // Scratch meshes left over from a failed run.
    for handle in scratch {
        if let Err(e) = host.delete_mesh(handle) {
            log::warn!("[Matching] failed to delete scratch mesh {:?}: {}", handle, e);
        }
    }
    result.map(|written| MatchingOutcome { written })
}

fn run_levels<H: MeshHost, N: NativeSubdivider>(
    host: &mut H,
    native: &N,
    request: &MatchingRequest,
    fingerprint: Fingerprint,
    missing_mr: &[u32],
    missing_mrr: &[u32],
    scratch: &mut Vec<MeshHandle>,
) -> MorphResult<Vec<PathBuf>> {
    let temp_dir = temporary_subdir(&request.working_dir)?;
    let params = MatchParams::from(&request.config);

    let base_copy = host.copy_mesh(request.base)?;
    scratch.push(base_copy);
    host.clear_modifiers(base_copy)?;
    host.remove_shape_keys(base_copy)?;
    host.strip_for_export(base_copy)?;

    let base_export = temp_dir.join("base.obj");
    host.export_obj(base_copy, &base_export, false)?;
    host.add_multires(base_copy)?;

    let mut written = Vec::new();
    for level in 1..=request.max_level {
        host.subdivide_catmull_clark(base_copy)?;
        let want_mr = missing_mr.contains(&level);
        let want_mrr = missing_mrr.contains(&level);
        if !want_mr && !want_mrr {
            continue;
        }
        log::info!("[Matching] performing matching for level {}", level);

        let candidate_path = native.generate_hd_mesh(
            request.config.unit_scale,
            &base_export,
            level,
            &temp_dir,
            &format!("hd-div{}", level),
        )?;
        let candidate = host.import_obj(&candidate_path)?;
        scratch.push(candidate);
        let candidate_snapshot = host.snapshot_raw(candidate)?;

        if want_mr {
            let reference = host.snapshot_evaluated(base_copy)?;
            written.push(persist_map(
                request,
                fingerprint,
                level,
                SubdivMethod::Multires,
                &reference,
                &candidate_snapshot,
                params,
            )?);
        }

        if want_mrr {
            // The reconstructed reference: multires rebuilt from the
            // candidate's own dense geometry.
            let rebuilt = host.copy_mesh(candidate)?;
            scratch.push(rebuilt);
            host.rebuild_multires(rebuilt)?;
            let reference = host.snapshot_evaluated(rebuilt)?;
            written.push(persist_map(
                request,
                fingerprint,
                level,
                SubdivMethod::MultiresRec,
                &reference,
                &candidate_snapshot,
                params,
            )?);
            delete_tracked(host, scratch, rebuilt)?;
        }

        delete_tracked(host, scratch, candidate)?;
    }

    delete_tracked(host, scratch, base_copy)?;
    Ok(written)
}

fn persist_map(
    request: &MatchingRequest,
    fingerprint: Fingerprint,
    level: u32,
    method: SubdivMethod,
    reference: &MeshSnapshot,
    candidate: &MeshSnapshot,
    params: MatchParams,
) -> MorphResult<PathBuf> {
    if candidate.vertex_count() != reference.vertex_count() {
        return Err(MorphError::ShapeMismatch {
            expected: reference.vertex_count(),
            found: candidate.vertex_count(),
        });
    }
    log::info!("[Matching] matching vertices by distance ({})...", method);
    let map = match_meshes(reference.positions(), candidate.positions(), params)?;

    let path = request
        .matching_dir
        .join(matching_filename(fingerprint, level, method));
    write_matching_file(&path, &map)?;
    Ok(path)
}

fn delete_tracked<H: MeshHost>(
    host: &mut H,
    scratch: &mut Vec<MeshHandle>,
    handle: MeshHandle,
) -> MorphResult<()> {
    host.delete_mesh(handle)?;
    scratch.retain(|&h| h != handle);
    Ok(())
}
