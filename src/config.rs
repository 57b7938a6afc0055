//! Engine configuration.
//!
//! All tuning knobs the pipelines consume live here: the host-unit scale,
//! the extractor's minimum displacement length and the matcher's quality
//! gates. Values observed in the field vary by call site (minimum lengths
//! from 0.001 to 0.03), so everything is overridable; the defaults below
//! are only the documented starting point.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_MATCH_DIST, DEFAULT_MAX_NON_OPTIMAL, DEFAULT_MIN_DELTA_LEN, DEFAULT_UNIT_SCALE,
    DEFAULT_WARN_PRINT_CAP,
};
use crate::error::{IoResultExt, MorphError, MorphResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Host-unit to DAZ-unit scale factor. Must be > 0.
    pub unit_scale: f64,
    /// Minimum displacement magnitude retained by the extractor
    /// (strictly-greater test).
    pub min_delta_len: f64,
    /// Nearest-neighbor distance above which a match counts as non-optimal.
    pub max_match_dist: f64,
    /// Number of non-optimal matches tolerated before matching aborts.
    pub max_non_optimal: u32,
    /// Cap on logged non-optimal warnings; matches past it are counted
    /// silently.
    pub warn_print_cap: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unit_scale: DEFAULT_UNIT_SCALE,
            min_delta_len: DEFAULT_MIN_DELTA_LEN,
            max_match_dist: DEFAULT_MAX_MATCH_DIST,
            max_non_optimal: DEFAULT_MAX_NON_OPTIMAL,
            warn_print_cap: DEFAULT_WARN_PRINT_CAP,
        }
    }
}

impl EngineConfig {
    /// Validate configuration-time contracts. Called by the pipelines
    /// before any work starts.
    pub fn validate(&self) -> MorphResult<()> {
        if !(self.unit_scale > 0.0) || !self.unit_scale.is_finite() {
            return Err(MorphError::invalid_config(
                "unit_scale",
                format!("must be a positive finite number, got {}", self.unit_scale),
            ));
        }
        if self.min_delta_len < 0.0 || !self.min_delta_len.is_finite() {
            return Err(MorphError::invalid_config(
                "min_delta_len",
                format!("must be non-negative, got {}", self.min_delta_len),
            ));
        }
        if !(self.max_match_dist > 0.0) || !self.max_match_dist.is_finite() {
            return Err(MorphError::invalid_config(
                "max_match_dist",
                format!("must be positive, got {}", self.max_match_dist),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file. Missing fields fall back to
    /// defaults; the result is validated before being returned.
    pub fn from_toml_file(path: &Path) -> MorphResult<Self> {
        let text = fs::read_to_string(path).at_path(path)?;
        let config: EngineConfig =
            toml::from_str(&text).map_err(|e| MorphError::invalid_config("config file", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
