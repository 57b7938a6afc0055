//! Vertex correspondence between independently generated HD meshes.
//!
//! The reference mesh comes from the host's own subdivision; the
//! candidate mesh from the native generator. Same geometry, different
//! vertex order, slightly different positions: the matcher aligns them
//! by exact nearest-neighbor search with a fixed tie-break rule.

pub mod kdtree;
pub mod map_io;
pub mod matcher;

pub use kdtree::KdTree;
pub use map_io::{read_matching_file, write_matching_file};
pub use matcher::{match_meshes, CorrespondenceMap, MatchParams};
