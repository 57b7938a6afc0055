//! Mesh snapshots and structural fingerprints.
//!
//! The engine never owns live host meshes; it works on immutable
//! snapshots handed across the Mesh Host boundary.

pub mod fingerprint;
pub mod snapshot;

pub use fingerprint::Fingerprint;
pub use snapshot::MeshSnapshot;
