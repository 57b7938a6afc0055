//! Morph-file generation pipeline: one `.dsf` descriptor plus its
//! companion `.dhdm` displacement container.
//!
//! Order of operations is deliberate: every validation (level, vertex
//! counts, catalog completeness, template structure) runs before any
//! output is produced, so a failed run leaves nothing behind.

use std::path::{Path, PathBuf};

use crate::catalog::{scan_catalog, SubdivMethod};
use crate::codec::dsf::{
    asset_url_stem, descriptor_asset_id, descriptor_id, inject_deltas, load_descriptor,
    relabel_channels, rename_identifier, set_hd_url, uniquify_scene_modifier_ids,
    validate_template_vertex_count, write_descriptor,
};
use crate::displacement::{extract, DisplacementSet};
use crate::error::{MorphError, MorphResult};
use crate::mesh::MeshSnapshot;
use crate::native::NativeSubdivider;
use crate::subdiv::{find_subdivision_modifier, level_from_modifier, ModifierKind, ModifierRecord};
use crate::workflow::request::{new_morphs_subdir, temporary_subdir, MorphRequest, OutputKind};
use crate::workflow::{MeshHandle, MeshHost};

/// What a morph run produced.
#[derive(Debug)]
pub struct MorphOutcome {
    pub dsf: Option<PathBuf>,
    pub dhdm: PathBuf,
    pub level: u32,
    pub delta_count: usize,
}

/// Generate the morph files for the request's base/HD mesh pair.
pub fn generate_morph_files<H: MeshHost, N: NativeSubdivider>(
    host: &mut H,
    native: &N,
    request: &MorphRequest,
) -> MorphResult<MorphOutcome> {
    request.validate()?;

    let base_snapshot = host.snapshot_raw(request.base)?;
    let (level, subdiv_modifier) = derive_hd_level(host, request.hd)?;

    let hd_base = host.snapshot_raw(request.hd)?;
    if hd_base.vertex_count() != base_snapshot.vertex_count() {
        return Err(MorphError::ShapeMismatch {
            expected: base_snapshot.vertex_count(),
            found: hd_base.vertex_count(),
        });
    }

    // Catalog completeness is a hard precondition; fail before any
    // displacement work or file output.
    let catalog = scan_catalog(&request.matching_dir, base_snapshot.fingerprint())?;
    let matching_paths = catalog.paths_for(level, request.method)?;

    let mut scratch = Vec::new();
    let result = run(
        host,
        native,
        request,
        level,
        &subdiv_modifier,
        &base_snapshot,
        &matching_paths,
        &mut scratch,
    );
    for handle in scratch {
        if let Err(e) = host.delete_mesh(handle) {
            log::warn!("[MorphGen] failed to delete scratch mesh {:?}: {}", handle, e);
        }
    }
    result
}

/// The HD mesh's effective subdivision level: from its single multires
/// modifier, which must exist and be subdivided.
fn derive_hd_level<H: MeshHost>(
    host: &H,
    hd: MeshHandle,
) -> MorphResult<(u32, ModifierRecord)> {
    let stack = host.modifiers(hd)?;
    let modifier = find_subdivision_modifier(&stack)?.ok_or_else(|| {
        MorphError::invalid_subdivision("hd mesh has no multiresolution modifier")
    })?;
    if modifier.kind != ModifierKind::Multires {
        return Err(MorphError::invalid_subdivision(
            "hd mesh has no multiresolution modifier",
        ));
    }
    let level = level_from_modifier(modifier.total_levels)?;
    Ok((level, modifier.clone()))
}

#[allow(clippy::too_many_arguments)]
fn run<H: MeshHost, N: NativeSubdivider>(
    host: &mut H,
    native: &N,
    request: &MorphRequest,
    level: u32,
    subdiv_modifier: &ModifierRecord,
    base_snapshot: &MeshSnapshot,
    matching_paths: &[PathBuf],
    scratch: &mut Vec<MeshHandle>,
) -> MorphResult<MorphOutcome> {
    let temp_dir = temporary_subdir(&request.working_dir)?;
    let out_dir = new_morphs_subdir(&request.working_dir)?;

    // The morphed base cage: an explicit morphed mesh with its shape
    // keys applied, or the HD mesh's own cage with them removed.
    let morphed_source = request.morphed_base.unwrap_or(request.hd);
    let morphed_copy = host.copy_mesh(morphed_source)?;
    scratch.push(morphed_copy);
    if request.morphed_base.is_some() {
        host.apply_shape_keys(morphed_copy)?;
    } else {
        host.remove_shape_keys(morphed_copy)?;
    }
    host.clear_modifiers(morphed_copy)?;
    host.strip_for_export(morphed_copy)?;

    let morphed_snapshot = host.snapshot_raw(morphed_copy)?;
    let deltas = extract(
        base_snapshot.positions(),
        morphed_snapshot.positions(),
        request.config.unit_scale,
        request.config.min_delta_len,
    )?;
    log::info!(
        "[MorphGen] level {} morph \"{}\": {} deltas",
        level,
        request.morph_name,
        deltas.count()
    );

    let dsf = match &request.output {
        OutputKind::DhdmOnly => None,
        OutputKind::DsfFromTemplate { template } => {
            let path = out_dir.join(format!("{}.dsf", request.morph_name));
            build_descriptor(
                template,
                &request.morph_name,
                base_snapshot.vertex_count(),
                &deltas,
                &path,
            )?;
            Some(path)
        }
    };

    // Native interchange: the three conventional exports the payload
    // encoder reads next to each other.
    let base_export = temp_dir.join("base.obj");
    host.export_obj(morphed_copy, &base_export, false)?;

    let hd_no_edit = temp_dir.join("base_hd_no_edit.obj");
    match request.method {
        SubdivMethod::Multires => {
            host.subdivide_like(morphed_copy, subdiv_modifier, level)?;
            host.export_obj(morphed_copy, &hd_no_edit, true)?;
        }
        SubdivMethod::MultiresRec => {
            let generated = native.generate_hd_mesh(
                request.config.unit_scale,
                &base_export,
                level,
                &temp_dir,
                "base_hd",
            )?;
            let rebuilt = host.import_obj(&generated)?;
            scratch.push(rebuilt);
            host.rebuild_multires(rebuilt)?;
            host.export_obj(rebuilt, &hd_no_edit, true)?;
            delete_tracked(host, scratch, rebuilt)?;
        }
    }
    delete_tracked(host, scratch, morphed_copy)?;

    let hd_edit = temp_dir.join("base_hd_edit.obj");
    let hd = request.hd;
    host.with_modifiers_enabled(hd, &|m| m.kind.is_subdivision(), |h| {
        h.export_obj(hd, &hd_edit, true).map_err(MorphError::from)
    })?;

    let dhdm = native.generate_dhdm_file(
        request.config.unit_scale,
        &base_export,
        level,
        matching_paths,
        &out_dir,
        &request.morph_name,
    )?;
    log::info!("[MorphGen] finished generating \"{}\"", dhdm.display());

    Ok(MorphOutcome {
        dsf,
        dhdm,
        level,
        delta_count: deltas.count(),
    })
}

/// Build the output descriptor from a template: validate, inject the
/// displacement payload, point at the companion `.dhdm` and rename the
/// template's identifiers to the new morph name throughout, including
/// inside cross-reference strings.
fn build_descriptor(
    template: &Path,
    morph_name: &str,
    base_vertex_count: usize,
    deltas: &DisplacementSet,
    out_path: &Path,
) -> MorphResult<()> {
    let mut document = load_descriptor(template)?;
    let orig_id = descriptor_id(&document)
        .ok_or_else(|| MorphError::InvalidTemplate {
            reason: "no modifier_library[0].id entry".to_string(),
        })?
        .to_string();
    let orig_asset_id = descriptor_asset_id(&document).ok_or_else(|| MorphError::InvalidTemplate {
        reason: "no asset_info.id entry".to_string(),
    })?;
    validate_template_vertex_count(&document, base_vertex_count)?;

    let hd_url = format!(
        "{}.dhdm",
        asset_url_stem(&document).unwrap_or_else(|| orig_id.clone())
    );
    set_hd_url(&mut document, &hd_url)?;
    inject_deltas(&mut document, deltas)?;
    uniquify_scene_modifier_ids(&mut document, &[&orig_id, &orig_asset_id]);
    relabel_channels(&mut document, &[&orig_id, &orig_asset_id], morph_name);

    // The identifiers also appear inside URL strings across the
    // document, so the rename runs over the serialized text.
    let text = serde_json::to_string(&document).map_err(|e| MorphError::InvalidTemplate {
        reason: format!("descriptor serialization failed: {}", e),
    })?;
    let text = rename_identifier(&text, &orig_id, morph_name);
    let text = rename_identifier(&text, &orig_asset_id, morph_name);
    let document: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| MorphError::InvalidTemplate {
            reason: format!("descriptor invalid after identifier rename: {}", e),
        })?;

    write_descriptor(out_path, &document, true)?;
    log::info!("[MorphGen] finished generating \"{}\"", out_path.display());
    Ok(())
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
