//! Fingerprint-keyed catalog of persisted matching files.

pub mod catalog_data;
pub mod catalog_operations;

pub use catalog_data::{MatchingCatalog, SubdivMethod};
pub use catalog_operations::{matching_filename, scan_catalog};
