//! File codecs for the two interoperating morph formats.
//!
//! `dhdm` owns the binary displacement container's 8-byte header; the
//! payload past it belongs to the native library and is treated as
//! opaque bytes. `dsf` owns the JSON morph-descriptor document.

pub mod dhdm;
pub mod dsf;

pub use dhdm::{read_dhdm_level, write_dhdm};
pub use dsf::{
    descriptor_id, descriptor_level, descriptor_vertex_count, inject_deltas, load_descriptor,
    rename_identifier, write_descriptor,
};
