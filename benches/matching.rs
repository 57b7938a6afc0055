//! Matcher hot-path benchmarks: k-d tree construction and full-mesh
//! nearest-neighbor correspondence at HD vertex counts.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec3;

use hdmorph_engine::matching::{match_meshes, KdTree, MatchParams};

/// Deterministic pseudo-random point cloud.
fn scatter(n: usize, seed: u64) -> Vec<DVec3> {
    let mut state = seed | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..n).map(|_| DVec3::new(next(), next(), next())).collect()
}

fn bench_kdtree_build(c: &mut Criterion) {
    let points = scatter(65_536, 0x9e37_79b9);
    c.bench_function("kdtree_build_64k", |b| {
        b.iter(|| KdTree::build(black_box(points.clone())))
    });
}

fn bench_match_meshes(c: &mut Criterion) {
    let reference = scatter(65_536, 0x9e37_79b9);
    let mut candidate = reference.clone();
    candidate.reverse();
    let params = MatchParams {
        max_dist: 3e-3,
        max_non_optimal: 50,
        warn_print_cap: 0,
    };
    c.bench_function("match_meshes_64k", |b| {
        b.iter(|| match_meshes(black_box(&reference), black_box(&candidate), params))
    });
}

criterion_group!(benches, bench_kdtree_build, bench_match_meshes);
criterion_main!(benches);
