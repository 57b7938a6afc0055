//! Immutable mesh snapshots.
//!
//! A snapshot is an ordered vertex position array plus a polygon list,
//! captured from the Mesh Host. Vertex index order is stable across
//! snapshots of the same underlying mesh unless the host explicitly
//! regenerates it.

use glam::DVec3;
use rustc_hash::FxHashSet;

use crate::error::{MorphError, MorphResult};
use crate::mesh::Fingerprint;

/// Read-only mesh geometry: positions and polygon connectivity.
#[derive(Debug, Clone)]
pub struct MeshSnapshot {
    positions: Vec<DVec3>,
    polygons: Vec<Vec<u32>>,
}

impl MeshSnapshot {
    /// Build a snapshot, validating connectivity: polygons must be
    /// triangles or quads and may only reference existing vertices.
    pub fn new(positions: Vec<DVec3>, polygons: Vec<Vec<u32>>) -> MorphResult<Self> {
        let vertex_count = positions.len();
        for (i, polygon) in polygons.iter().enumerate() {
            if polygon.len() != 3 && polygon.len() != 4 {
                return Err(MorphError::invalid_config(
                    "polygon",
                    format!("polygon {} has {} vertices; expected 3 or 4", i, polygon.len()),
                ));
            }
            for &v in polygon {
                if v as usize >= vertex_count {
                    return Err(MorphError::invalid_config(
                        "polygon",
                        format!("polygon {} references vertex {} of {}", i, v, vertex_count),
                    ));
                }
            }
        }
        Ok(Self { positions, polygons })
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn polygons(&self) -> &[Vec<u32>] {
        &self.polygons
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Count distinct undirected edges over all polygon boundaries.
    pub fn edge_count(&self) -> usize {
        let mut edges: FxHashSet<(u32, u32)> = FxHashSet::default();
        for polygon in &self.polygons {
            let n = polygon.len();
            for k in 0..n {
                let a = polygon[k];
                let b = polygon[(k + 1) % n];
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.len()
    }

    /// Structural fingerprint of the mesh at this resolution.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            vertices: self.vertex_count() as u32,
            edges: self.edge_count() as u32,
            polygons: self.polygon_count() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit quad split into two triangles: 4 vertices, 5 edges, 2 polygons.
    fn two_triangles() -> MeshSnapshot {
        MeshSnapshot::new(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2], vec![0, 2, 3]],
        )
        .expect("valid snapshot")
    }

    #[test]
    fn test_counts() {
        let mesh = two_triangles();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.polygon_count(), 2);
        // Shared diagonal 0-2 is counted once.
        assert_eq!(mesh.edge_count(), 5);
    }

    #[test]
    fn test_fingerprint() {
        let fp = two_triangles().fingerprint();
        assert_eq!(fp.to_string(), "4-5-2");
    }

    #[test]
    fn test_rejects_ngon() {
        let r = MeshSnapshot::new(
            vec![DVec3::ZERO; 5],
            vec![vec![0, 1, 2, 3, 4]],
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let r = MeshSnapshot::new(vec![DVec3::ZERO; 3], vec![vec![0, 1, 3]]);
        assert!(r.is_err());
    }
}
