//! Engine-wide constants: file-format markers, default thresholds and
//! working-directory naming shared across the pipelines.

/// First four bytes of a `.dhdm` displacement container, little-endian.
/// The marker is never reinterpreted beyond an equality check on write.
pub const DHDM_MAGIC: u32 = 0xd0d0_d0d0;

/// Total header size of a `.dhdm` file: 4-byte marker + 4-byte level.
pub const DHDM_HEADER_LEN: usize = 8;

/// Two-byte magic prefix of a gzip stream, used to sniff compressed
/// descriptor and matching files.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default host-unit to DAZ-unit scale (host meters, DAZ centimeters).
pub const DEFAULT_UNIT_SCALE: f64 = 0.01;

/// Default minimum displacement magnitude kept by the extractor. Call
/// sites in the field range from 0.001 to 0.03; this is only the default.
pub const DEFAULT_MIN_DELTA_LEN: f64 = 0.01;

/// Default distance above which a nearest-neighbor match counts as
/// non-optimal.
pub const DEFAULT_MAX_MATCH_DIST: f64 = 3e-3;

/// Default number of non-optimal matches tolerated before the matcher
/// aborts.
pub const DEFAULT_MAX_NON_OPTIMAL: u32 = 50;

/// Default cap on logged non-optimal warnings. Matches past the cap are
/// still counted.
pub const DEFAULT_WARN_PRINT_CAP: u32 = 20;

/// Subdirectory of the working directory holding intermediate exports.
pub const TEMPORARY_SUBDIR: &str = "_temporary";

/// Subdirectory of the working directory receiving generated morph files.
pub const NEW_MORPHS_SUBDIR: &str = "new_morphs";
