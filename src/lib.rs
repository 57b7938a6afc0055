//! HD displacement morph engine.
//!
//! Derives a high-detail displacement morph for a base mesh from a
//! subdivided/sculpted counterpart and packages it as a binary
//! displacement container (`.dhdm`) plus a JSON morph descriptor
//! (`.dsf`). The engine owns the geometry correspondence and
//! displacement-encoding core:
//!
//! - `coords` / `displacement`: normalized per-vertex displacement
//!   extraction between vertex-aligned meshes
//! - `matching`: deterministic nearest-neighbor correspondence between
//!   independently generated HD meshes
//! - `catalog`: fingerprint-keyed cache of persisted correspondence maps
//! - `subdiv`: subdivision-level bookkeeping
//! - `codec`: the `.dhdm` header and `.dsf` descriptor formats
//!
//! Mesh storage and modifier evaluation belong to an external Mesh Host
//! (`workflow::MeshHost`); the native subdivision/export library is
//! invoked through `native::NativeSubdivider`, strictly serialized.

// Constants module
pub mod constants;

// Core engine modules
pub mod config;
pub mod coords;
pub mod error;
pub mod mesh;
pub mod subdiv;

// Geometry pipeline
pub mod displacement;
pub mod matching;

// Persistence
pub mod catalog;
pub mod codec;

// External collaborators
pub mod native;
pub mod workflow;

pub use config::EngineConfig;
pub use error::{IoResultExt, MorphError, MorphResult};
pub use mesh::{Fingerprint, MeshSnapshot};

// === Core pipeline types ===
pub use catalog::{matching_filename, scan_catalog, MatchingCatalog, SubdivMethod};
pub use displacement::{extract, DisplacementRecord, DisplacementSet};
pub use matching::{match_meshes, CorrespondenceMap, MatchParams};
pub use subdiv::{
    find_subdivision_modifier, level_from_modifier, level_from_polygon_counts, ModifierKind,
    ModifierRecord,
};

// === File formats ===
pub use codec::{read_dhdm_level, write_dhdm};

// === Orchestration ===
pub use native::{DhdmLibrary, NativeSubdivider, SingleFlight};
pub use workflow::{
    generate_matching_files, generate_morph_files, MatchingOutcome, MatchingRequest, MeshHandle,
    MeshHost, MorphOutcome, MorphRequest, OutputKind,
};

// Re-export glam for callers building snapshots
pub use glam;
