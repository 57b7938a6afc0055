//! Coordinate normalization between the host's axis convention and DAZ's.
//!
//! The host is Z-up; DAZ is Y-up. The conversion is the fixed
//! permutation/sign matrix mapping `(x, y, z) -> (x, z, -y)`, followed by
//! division by the unit scale (host meters to DAZ centimeters at the
//! default scale of 0.01). Pure functions, exact in floating point up to
//! standard rounding.

use glam::{DMat3, DVec3};

/// Host-to-DAZ axis conversion, row mapping `(x, y, z) -> (x, z, -y)`.
/// glam matrices are column-major.
pub const HOST_TO_DAZ: DMat3 = DMat3::from_cols(
    DVec3::new(1.0, 0.0, 0.0),
    DVec3::new(0.0, 0.0, -1.0),
    DVec3::new(0.0, 1.0, 0.0),
);

/// Convert a raw host-space position delta into DAZ's normalized
/// unit/axis convention. `unit_scale` must be positive; the pipelines
/// validate it at configuration time.
#[inline]
pub fn normalize_delta(delta: DVec3, unit_scale: f64) -> DVec3 {
    (1.0 / unit_scale) * (HOST_TO_DAZ * delta)
}
