//! Balanced k-d tree over vertex positions.
//!
//! Determinism is the point of this structure: nearest-neighbor ties are
//! broken by the lowest point index, never by traversal order, so a
//! correspondence map built from identical input is bit-identical across
//! runs. Axis cycles with depth; the median split is selected with a
//! comparator that orders equal coordinates by index.

use glam::DVec3;

/// Balanced k-d tree. Stores a permutation of point indices; the tree
/// shape is implicit in the (lo, hi) recursion over the permutation with
/// the median as the node.
pub struct KdTree {
    points: Vec<DVec3>,
    items: Vec<u32>,
}

/// Running best candidate during a nearest query.
#[derive(Clone, Copy)]
struct Best {
    dist_sq: f64,
    index: u32,
}

impl KdTree {
    /// Build a balanced tree over `points`. O(n log n).
    pub fn build(points: Vec<DVec3>) -> Self {
        let mut items: Vec<u32> = (0..points.len() as u32).collect();
        if !items.is_empty() {
            build_range(&points, &mut items, 0);
        }
        Self { points, items }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Exact nearest neighbor of `query`: `(point_index, distance)`.
    /// Equal distances resolve to the lowest point index. Returns `None`
    /// only for an empty tree.
    pub fn nearest(&self, query: DVec3) -> Option<(u32, f64)> {
        if self.items.is_empty() {
            return None;
        }
        let mut best = Best {
            dist_sq: f64::INFINITY,
            index: u32::MAX,
        };
        self.nearest_in(query, 0, self.items.len(), 0, &mut best);
        Some((best.index, best.dist_sq.sqrt()))
    }

    fn nearest_in(&self, query: DVec3, lo: usize, hi: usize, depth: usize, best: &mut Best) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let index = self.items[mid];
        let point = self.points[index as usize];

        let dist_sq = query.distance_squared(point);
        if dist_sq < best.dist_sq || (dist_sq == best.dist_sq && index < best.index) {
            *best = Best { dist_sq, index };
        }

        let axis = depth % 3;
        let diff = query[axis] - point[axis];
        let (near_lo, near_hi, far_lo, far_hi) = if diff < 0.0 {
            (lo, mid, mid + 1, hi)
        } else {
            (mid + 1, hi, lo, mid)
        };

        self.nearest_in(query, near_lo, near_hi, depth + 1, best);
        // The far half may still hold an equal-distance, lower-index
        // point, so the plane test must not prune on equality.
        if diff * diff <= best.dist_sq {
            self.nearest_in(query, far_lo, far_hi, depth + 1, best);
        }
    }
}

fn build_range(points: &[DVec3], items: &mut [u32], depth: usize) {
    if items.len() <= 1 {
        return;
    }
    let axis = depth % 3;
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |&a, &b| {
        points[a as usize][axis]
            .partial_cmp(&points[b as usize][axis])
            .expect("vertex coordinates are never NaN")
            .then(a.cmp(&b))
    });
    let (left, rest) = items.split_at_mut(mid);
    build_range(points, left, depth + 1);
    build_range(points, &mut rest[1..], depth + 1);
}
