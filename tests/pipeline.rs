//! End-to-end pipeline tests against an in-memory Mesh Host and a fake
//! native library. The fake subdivision is linear midpoint refinement,
//! shared between host and native so reference and candidate meshes
//! coincide exactly; the native side permutes vertex order to make the
//! correspondence non-trivial.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use glam::DVec3;

use hdmorph_engine::codec::dsf::load_descriptor;
use hdmorph_engine::matching::{read_matching_file, write_matching_file, CorrespondenceMap};
use hdmorph_engine::subdiv::{ModifierKind, ModifierRecord};
use hdmorph_engine::{
    generate_matching_files, generate_morph_files, read_dhdm_level, write_dhdm, EngineConfig,
    MatchingRequest, MeshHandle, MeshHost, MeshSnapshot, MorphError, MorphRequest, MorphResult,
    NativeSubdivider, OutputKind, SubdivMethod,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------
// Shared fake geometry
// ---------------------------------------------------------------------

fn unit_quad() -> (Vec<DVec3>, Vec<Vec<u32>>) {
    (
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ],
        vec![vec![0, 1, 2, 3]],
    )
}

/// One level of linear midpoint subdivision: originals, then edge
/// midpoints in sorted edge order, then face centers.
fn subdivide_once(positions: &[DVec3], polygons: &[Vec<u32>]) -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let mut new_positions = positions.to_vec();
    let mut edge_mid: BTreeMap<(u32, u32), u32> = BTreeMap::new();
    for polygon in polygons {
        let n = polygon.len();
        for k in 0..n {
            let a = polygon[k];
            let b = polygon[(k + 1) % n];
            let key = (a.min(b), a.max(b));
            edge_mid.entry(key).or_insert_with(|| {
                let mid = (positions[a as usize] + positions[b as usize]) * 0.5;
                new_positions.push(mid);
                (new_positions.len() - 1) as u32
            });
        }
    }
    let mut new_polygons = Vec::new();
    for polygon in polygons {
        let n = polygon.len();
        let center: DVec3 =
            polygon.iter().map(|&v| positions[v as usize]).sum::<DVec3>() / n as f64;
        new_positions.push(center);
        let center_idx = (new_positions.len() - 1) as u32;
        for k in 0..n {
            let a = polygon[k];
            let prev = polygon[(k + n - 1) % n];
            let next = polygon[(k + 1) % n];
            let m_prev = edge_mid[&(a.min(prev), a.max(prev))];
            let m_next = edge_mid[&(a.min(next), a.max(next))];
            new_polygons.push(vec![a, m_next, center_idx, m_prev]);
        }
    }
    (new_positions, new_polygons)
}

fn subdivide_levels(
    positions: &[DVec3],
    polygons: &[Vec<u32>],
    levels: u32,
) -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let mut state = (positions.to_vec(), polygons.to_vec());
    for _ in 0..levels {
        state = subdivide_once(&state.0, &state.1);
    }
    state
}

// ---------------------------------------------------------------------
// OBJ interchange used by the fake host and fake native library
// ---------------------------------------------------------------------

fn write_obj(path: &Path, positions: &[DVec3], polygons: &[Vec<u32>]) {
    let mut text = String::new();
    for p in positions {
        text.push_str(&format!("v {} {} {}\n", p.x, p.y, p.z));
    }
    for polygon in polygons {
        text.push('f');
        for &v in polygon {
            text.push_str(&format!(" {}", v + 1));
        }
        text.push('\n');
    }
    std::fs::write(path, text).expect("write obj");
}

fn read_obj(path: &Path) -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let text = std::fs::read_to_string(path).expect("read obj");
    let mut positions = Vec::new();
    let mut polygons = Vec::new();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let coords: Vec<f64> = parts.map(|p| p.parse().expect("coord")).collect();
                positions.push(DVec3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                polygons.push(parts.map(|p| p.parse::<u32>().expect("index") - 1).collect());
            }
            _ => {}
        }
    }
    (positions, polygons)
}

// ---------------------------------------------------------------------
// Fake Mesh Host
// ---------------------------------------------------------------------

#[derive(Clone)]
struct FakeMesh {
    positions: Vec<DVec3>,
    polygons: Vec<Vec<u32>>,
    modifiers: Vec<ModifierRecord>,
    visibility: Vec<bool>,
    shape_offsets: Option<Vec<DVec3>>,
}

struct FakeHost {
    meshes: HashMap<u64, FakeMesh>,
    next_id: u64,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            meshes: HashMap::new(),
            next_id: 1,
        }
    }

    fn add(&mut self, mesh: FakeMesh) -> MeshHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.meshes.insert(id, mesh);
        MeshHandle(id)
    }

    fn mesh(&self, handle: MeshHandle) -> anyhow::Result<&FakeMesh> {
        self.meshes
            .get(&handle.0)
            .ok_or_else(|| anyhow::anyhow!("unknown mesh {:?}", handle))
    }

    fn mesh_mut(&mut self, handle: MeshHandle) -> anyhow::Result<&mut FakeMesh> {
        self.meshes
            .get_mut(&handle.0)
            .ok_or_else(|| anyhow::anyhow!("unknown mesh {:?}", handle))
    }

    fn evaluated(&self, mesh: &FakeMesh) -> (Vec<DVec3>, Vec<Vec<u32>>) {
        let mut levels = 0;
        for (m, &visible) in mesh.modifiers.iter().zip(&mesh.visibility) {
            if visible && m.kind.is_subdivision() {
                levels += m.total_levels;
            }
        }
        subdivide_levels(&mesh.positions, &mesh.polygons, levels)
    }
}

impl MeshHost for FakeHost {
    fn snapshot_raw(&self, handle: MeshHandle) -> anyhow::Result<MeshSnapshot> {
        let mesh = self.mesh(handle)?;
        Ok(MeshSnapshot::new(mesh.positions.clone(), mesh.polygons.clone())?)
    }

    fn snapshot_evaluated(&self, handle: MeshHandle) -> anyhow::Result<MeshSnapshot> {
        let mesh = self.mesh(handle)?;
        let (positions, polygons) = self.evaluated(mesh);
        Ok(MeshSnapshot::new(positions, polygons)?)
    }

    fn copy_mesh(&mut self, handle: MeshHandle) -> anyhow::Result<MeshHandle> {
        let mesh = self.mesh(handle)?.clone();
        Ok(self.add(mesh))
    }

    fn delete_mesh(&mut self, handle: MeshHandle) -> anyhow::Result<()> {
        self.meshes
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("unknown mesh {:?}", handle))
    }

    fn clear_modifiers(&mut self, handle: MeshHandle) -> anyhow::Result<()> {
        let mesh = self.mesh_mut(handle)?;
        mesh.modifiers.clear();
        mesh.visibility.clear();
        Ok(())
    }

    fn apply_shape_keys(&mut self, handle: MeshHandle) -> anyhow::Result<()> {
        let mesh = self.mesh_mut(handle)?;
        if let Some(offsets) = mesh.shape_offsets.take() {
            for (p, o) in mesh.positions.iter_mut().zip(offsets) {
                *p += o;
            }
        }
        Ok(())
    }

    fn remove_shape_keys(&mut self, handle: MeshHandle) -> anyhow::Result<()> {
        self.mesh_mut(handle)?.shape_offsets = None;
        Ok(())
    }

    fn strip_for_export(&mut self, _handle: MeshHandle) -> anyhow::Result<()> {
        Ok(())
    }

    fn modifiers(&self, handle: MeshHandle) -> anyhow::Result<Vec<ModifierRecord>> {
        Ok(self.mesh(handle)?.modifiers.clone())
    }

    fn modifier_visibility(&self, handle: MeshHandle) -> anyhow::Result<Vec<bool>> {
        Ok(self.mesh(handle)?.visibility.clone())
    }

    fn set_modifier_visibility(
        &mut self,
        handle: MeshHandle,
        visible: &[bool],
    ) -> anyhow::Result<()> {
        self.mesh_mut(handle)?.visibility = visible.to_vec();
        Ok(())
    }

    fn add_multires(&mut self, handle: MeshHandle) -> anyhow::Result<()> {
        let mesh = self.mesh_mut(handle)?;
        mesh.modifiers.push(ModifierRecord {
            kind: ModifierKind::Multires,
            levels: 0,
            total_levels: 0,
        });
        mesh.visibility.push(true);
        Ok(())
    }

    fn subdivide_catmull_clark(&mut self, handle: MeshHandle) -> anyhow::Result<()> {
        let mesh = self.mesh_mut(handle)?;
        let multires = mesh
            .modifiers
            .iter_mut()
            .find(|m| m.kind == ModifierKind::Multires)
            .ok_or_else(|| anyhow::anyhow!("no multires modifier"))?;
        multires.levels += 1;
        multires.total_levels += 1;
        Ok(())
    }

    fn subdivide_like(
        &mut self,
        handle: MeshHandle,
        template: &ModifierRecord,
        levels: u32,
    ) -> anyhow::Result<()> {
        let mesh = self.mesh_mut(handle)?;
        mesh.modifiers.push(ModifierRecord {
            kind: template.kind,
            levels,
            total_levels: levels,
        });
        mesh.visibility.push(true);
        Ok(())
    }

    fn rebuild_multires(&mut self, _handle: MeshHandle) -> anyhow::Result<()> {
        // Dense fake geometry already equals its rebuilt evaluation.
        Ok(())
    }

    fn export_obj(
        &mut self,
        handle: MeshHandle,
        path: &Path,
        apply_modifiers: bool,
    ) -> anyhow::Result<()> {
        let mesh = self.mesh(handle)?;
        let (positions, polygons) = if apply_modifiers {
            self.evaluated(mesh)
        } else {
            (mesh.positions.clone(), mesh.polygons.clone())
        };
        write_obj(path, &positions, &polygons);
        Ok(())
    }

    fn import_obj(&mut self, path: &Path) -> anyhow::Result<MeshHandle> {
        let (positions, polygons) = read_obj(path);
        Ok(self.add(FakeMesh {
            positions,
            polygons,
            modifiers: Vec::new(),
            visibility: Vec::new(),
            shape_offsets: None,
        }))
    }
}

// ---------------------------------------------------------------------
// Fake native library
// ---------------------------------------------------------------------

/// Subdivides with the shared midpoint scheme, then reverses vertex
/// order so the correspondence is a non-trivial permutation.
struct FakeNative;

impl NativeSubdivider for FakeNative {
    fn generate_hd_mesh(
        &self,
        _unit_scale: f64,
        base_export: &Path,
        hd_level: u32,
        output_dir: &Path,
        output_name: &str,
    ) -> MorphResult<PathBuf> {
        let (positions, polygons) = read_obj(base_export);
        let (positions, polygons) = subdivide_levels(&positions, &polygons, hd_level);
        let count = positions.len() as u32;
        let reversed: Vec<DVec3> = positions.into_iter().rev().collect();
        let remapped: Vec<Vec<u32>> = polygons
            .into_iter()
            .map(|polygon| polygon.into_iter().map(|v| count - 1 - v).collect())
            .collect();
        let path = output_dir.join(format!("{}.obj", output_name));
        write_obj(&path, &reversed, &remapped);
        Ok(path)
    }

    fn generate_dhdm_file(
        &self,
        _unit_scale: f64,
        base_export: &Path,
        hd_level: u32,
        matching_paths: &[PathBuf],
        output_dir: &Path,
        output_name: &str,
    ) -> MorphResult<PathBuf> {
        assert!(base_export.exists(), "base export must precede the native call");
        assert_eq!(matching_paths.len(), hd_level as usize);
        for p in matching_paths {
            assert!(p.exists(), "matching file {:?} must exist", p);
        }
        let path = output_dir.join(format!("{}.dhdm", output_name));
        write_dhdm(&path, hd_level, &[0u8; 32])?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------
// Matching pipeline
// ---------------------------------------------------------------------

fn matching_request(base: MeshHandle, dir: &Path, max_level: u32) -> MatchingRequest {
    MatchingRequest {
        base,
        max_level,
        force_new: false,
        working_dir: dir.to_path_buf(),
        matching_dir: dir.to_path_buf(),
        config: EngineConfig::default(),
    }
}

fn quad_host() -> (FakeHost, MeshHandle) {
    let mut host = FakeHost::new();
    let (positions, polygons) = unit_quad();
    let base = host.add(FakeMesh {
        positions,
        polygons,
        modifiers: Vec::new(),
        visibility: Vec::new(),
        shape_offsets: None,
    });
    (host, base)
}

#[test]
fn test_generate_matching_files_both_methods() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut host, base) = quad_host();
    let request = matching_request(base, dir.path(), 2);

    let outcome = generate_matching_files(&mut host, &FakeNative, &request).expect("generate");
    assert_eq!(outcome.written.len(), 4);

    // Unit quad fingerprint is 4-4-1.
    for name in [
        "f4-4-1_div1_mr.json",
        "f4-4-1_div1_mrr.json",
        "f4-4-1_div2_mr.json",
        "f4-4-1_div2_mrr.json",
    ] {
        assert!(dir.path().join(name).is_file(), "missing {}", name);
    }

    // Native reversed the vertex order: level-1 subdivision of a quad
    // has 9 vertices, so candidate j maps to reference 8-j.
    let map = read_matching_file(&dir.path().join("f4-4-1_div1_mr.json")).expect("read map");
    assert_eq!(map.len(), 9);
    for j in 0..9 {
        assert_eq!(map.reference_of(j), (8 - j) as u32);
    }

    // The reconstructed-reference map is built against the candidate's
    // own rebuilt geometry, so it is the identity.
    let map = read_matching_file(&dir.path().join("f4-4-1_div1_mrr.json")).expect("read map");
    for j in 0..9 {
        assert_eq!(map.reference_of(j), j as u32);
    }

    // Scratch meshes are cleaned up: only the base remains in the host.
    assert_eq!(host.meshes.len(), 1);
}

#[test]
fn test_matching_skips_existing_levels() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut host, base) = quad_host();

    let request = matching_request(base, dir.path(), 1);
    let first = generate_matching_files(&mut host, &FakeNative, &request).expect("generate");
    assert_eq!(first.written.len(), 2);

    let second = generate_matching_files(&mut host, &FakeNative, &request).expect("rescan");
    assert!(second.is_up_to_date());

    let mut forced = matching_request(base, dir.path(), 1);
    forced.force_new = true;
    let third = generate_matching_files(&mut host, &FakeNative, &forced).expect("force");
    assert_eq!(third.written.len(), 2);
}

// ---------------------------------------------------------------------
// Morph pipeline
// ---------------------------------------------------------------------

fn descriptor_template() -> serde_json::Value {
    serde_json::json!({
        "asset_info": { "id": "/data/DAZ/base_shape.dsf" },
        "scene": { "modifiers": [ { "id": "base_shape", "url": "#base_shape" } ] },
        "modifier_library": [{
            "id": "base_shape",
            "channel": { "id": "value", "label": "base_shape" },
            "morph": {
                "vertex_count": -1,
                "deltas": { "count": 0, "values": [] }
            }
        }]
    })
}

/// Host with a base quad and an HD mesh whose cage carries a sculpted
/// offset on vertex 2 plus a level-1 multires modifier.
fn morph_host() -> (FakeHost, MeshHandle, MeshHandle) {
    let (mut host, base) = quad_host();
    let (mut positions, polygons) = unit_quad();
    positions[2] += DVec3::new(0.0, 0.0, 0.5);
    let hd = host.add(FakeMesh {
        positions,
        polygons,
        modifiers: vec![ModifierRecord {
            kind: ModifierKind::Multires,
            levels: 1,
            total_levels: 1,
        }],
        visibility: vec![true],
        shape_offsets: None,
    });
    (host, base, hd)
}

fn morph_request(
    base: MeshHandle,
    hd: MeshHandle,
    dir: &Path,
    output: OutputKind,
) -> MorphRequest {
    MorphRequest {
        base,
        hd,
        morphed_base: None,
        morph_name: "TestMorph".to_string(),
        method: SubdivMethod::Multires,
        output,
        working_dir: dir.to_path_buf(),
        matching_dir: dir.to_path_buf(),
        config: EngineConfig::default(),
    }
}

fn write_identity_matching_file(dir: &Path, level: u32) {
    // Level-1 midpoint subdivision of a quad has 9 vertices.
    let map = CorrespondenceMap::new((0..9).collect());
    let path = dir.join(format!("f4-4-1_div{}_mr.json", level));
    write_matching_file(&path, &map).expect("write matching file");
}

#[test]
fn test_generate_morph_files_with_descriptor() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut host, base, hd) = morph_host();
    write_identity_matching_file(dir.path(), 1);

    let template_path = dir.path().join("template.dsf");
    std::fs::write(
        &template_path,
        serde_json::to_string_pretty(&descriptor_template()).expect("template json"),
    )
    .expect("write template");

    let request = morph_request(
        base,
        hd,
        dir.path(),
        OutputKind::DsfFromTemplate {
            template: template_path,
        },
    );
    let outcome = generate_morph_files(&mut host, &FakeNative, &request).expect("generate");

    assert_eq!(outcome.level, 1);
    assert_eq!(outcome.delta_count, 1);
    assert_eq!(read_dhdm_level(&outcome.dhdm).expect("dhdm level"), 1);

    let dsf = outcome.dsf.expect("descriptor path");
    assert!(dsf.ends_with("new_morphs/TestMorph.dsf"));
    let document = load_descriptor(&dsf).expect("load descriptor");

    // Identifiers renamed everywhere, including cross-reference URLs.
    assert_eq!(document["modifier_library"][0]["id"], "TestMorph");
    assert_eq!(document["modifier_library"][0]["channel"]["label"], "TestMorph");
    assert_eq!(document["asset_info"]["id"], "/data/DAZ/TestMorph.dsf");
    assert_eq!(document["scene"]["modifiers"][0]["url"], "#TestMorph");
    assert_eq!(
        document["modifier_library"][0]["morph"]["hd_url"],
        "/data/DAZ/TestMorph.dhdm"
    );

    // The single sculpted cage vertex, host +0.5 Z at unit scale 0.01:
    // DAZ delta (0, 50, 0) on vertex 2.
    let deltas = &document["modifier_library"][0]["morph"]["deltas"];
    assert_eq!(deltas["count"], 1);
    assert_eq!(deltas["values"][0][0], 2);
    assert_eq!(deltas["values"][0][2], 50.0);

    // Scratch meshes cleaned up; base and hd remain.
    assert_eq!(host.meshes.len(), 2);
}

#[test]
fn test_morph_fails_early_on_missing_matching_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut host, base, hd) = morph_host();
    // No matching file on disk.

    let request = morph_request(base, hd, dir.path(), OutputKind::DhdmOnly);
    match generate_morph_files(&mut host, &FakeNative, &request) {
        Err(MorphError::MissingMatchFiles { method, levels }) => {
            assert_eq!(method, SubdivMethod::Multires);
            assert_eq!(levels, vec![1]);
        }
        other => panic!("expected MissingMatchFiles, got {:?}", other),
    }
    // Failed precondition leaves no output behind.
    assert!(!dir.path().join("new_morphs").join("TestMorph.dhdm").exists());
}

#[test]
fn test_morph_rejects_unsubdivided_hd_mesh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut host, base) = quad_host();
    let (positions, polygons) = unit_quad();
    let hd = host.add(FakeMesh {
        positions,
        polygons,
        modifiers: Vec::new(),
        visibility: Vec::new(),
        shape_offsets: None,
    });

    let request = morph_request(base, hd, dir.path(), OutputKind::DhdmOnly);
    match generate_morph_files(&mut host, &FakeNative, &request) {
        Err(MorphError::InvalidSubdivision { reason }) => {
            assert!(reason.contains("multiresolution"));
        }
        other => panic!("expected InvalidSubdivision, got {:?}", other),
    }
}

#[test]
fn test_morph_rejects_vertex_count_mismatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut host, base) = quad_host();
    // HD cage with an extra loose polygon's worth of vertices.
    let (mut positions, mut polygons) = unit_quad();
    positions.extend([
        DVec3::new(2.0, 0.0, 0.0),
        DVec3::new(3.0, 0.0, 0.0),
        DVec3::new(3.0, 1.0, 0.0),
    ]);
    polygons.push(vec![4, 5, 6]);
    let hd = host.add(FakeMesh {
        positions,
        polygons,
        modifiers: vec![ModifierRecord {
            kind: ModifierKind::Multires,
            levels: 1,
            total_levels: 1,
        }],
        visibility: vec![true],
        shape_offsets: None,
    });

    let request = morph_request(base, hd, dir.path(), OutputKind::DhdmOnly);
    match generate_morph_files(&mut host, &FakeNative, &request) {
        Err(MorphError::ShapeMismatch { expected, found }) => {
            assert_eq!(expected, 4);
            assert_eq!(found, 7);
        }
        other => panic!("expected ShapeMismatch, got {:?}", other),
    }
}

#[test]
fn test_morphed_base_shape_keys_applied() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut host, base, hd) = morph_host();
    write_identity_matching_file(dir.path(), 1);

    // Flatten the HD cage back to the base shape; the morph comes from
    // an explicit morphed mesh whose shape key moves vertex 1.
    host.meshes.get_mut(&hd.0).expect("hd").positions = unit_quad().0;
    let (positions, polygons) = unit_quad();
    let morphed = host.add(FakeMesh {
        positions,
        polygons,
        modifiers: Vec::new(),
        visibility: Vec::new(),
        shape_offsets: Some(vec![
            DVec3::ZERO,
            DVec3::new(0.0, 0.0, 0.25),
            DVec3::ZERO,
            DVec3::ZERO,
        ]),
    });

    let mut request = morph_request(base, hd, dir.path(), OutputKind::DhdmOnly);
    request.morphed_base = Some(morphed);
    let outcome = generate_morph_files(&mut host, &FakeNative, &request).expect("generate");
    assert_eq!(outcome.delta_count, 1);
    assert!(outcome.dsf.is_none());
}
