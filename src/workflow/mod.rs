//! Pipeline orchestration against the Mesh Host and native boundaries.

pub mod host;
pub mod match_gen;
pub mod morph_gen;
pub mod request;

pub use host::{MeshHandle, MeshHost};
pub use match_gen::{generate_matching_files, MatchingOutcome};
pub use morph_gen::{generate_morph_files, MorphOutcome};
pub use request::{MatchingRequest, MorphRequest, OutputKind};
