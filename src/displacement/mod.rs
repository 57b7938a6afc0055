//! Per-vertex displacement extraction.

pub mod displacement_data;
pub mod displacement_operations;

pub use displacement_data::{DisplacementRecord, DisplacementSet};
pub use displacement_operations::extract;
