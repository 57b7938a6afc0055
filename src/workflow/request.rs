//! Immutable pipeline requests.
//!
//! Everything a pipeline run needs travels in one request value built up
//! front; stages hand results forward instead of mutating shared state,
//! so each stage stays independently testable.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::catalog::SubdivMethod;
use crate::config::EngineConfig;
use crate::constants::{NEW_MORPHS_SUBDIR, TEMPORARY_SUBDIR};
use crate::error::{IoResultExt, MorphError, MorphResult};
use crate::workflow::MeshHandle;

lazy_static! {
    static ref MORPH_NAME: Regex = Regex::new(r"^\w+$").expect("morph name pattern is valid");
}

/// What `generate_morph_files` produces.
#[derive(Debug, Clone)]
pub enum OutputKind {
    /// Only the binary displacement container.
    DhdmOnly,
    /// Descriptor built from a template file, plus the container.
    DsfFromTemplate { template: PathBuf },
}

/// Request for matching-file generation.
#[derive(Debug, Clone)]
pub struct MatchingRequest {
    pub base: MeshHandle,
    /// Generate maps for levels `1..=max_level`.
    pub max_level: u32,
    /// Regenerate files that already exist.
    pub force_new: bool,
    pub working_dir: PathBuf,
    pub matching_dir: PathBuf,
    pub config: EngineConfig,
}

/// Request for morph-file (.dsf/.dhdm) generation.
#[derive(Debug, Clone)]
pub struct MorphRequest {
    pub base: MeshHandle,
    pub hd: MeshHandle,
    /// Sculpted base cage carrying the morph at base resolution. When
    /// absent, the HD mesh's own base cage (shape keys removed) is used.
    pub morphed_base: Option<MeshHandle>,
    pub morph_name: String,
    pub method: SubdivMethod,
    pub output: OutputKind,
    pub working_dir: PathBuf,
    pub matching_dir: PathBuf,
    pub config: EngineConfig,
}

impl MatchingRequest {
    pub fn validate(&self) -> MorphResult<()> {
        self.config.validate()?;
        if self.max_level == 0 {
            return Err(MorphError::invalid_config("max_level", "must be at least 1"));
        }
        validate_dirs(&self.working_dir, &self.matching_dir)
    }
}

impl MorphRequest {
    pub fn validate(&self) -> MorphResult<()> {
        self.config.validate()?;
        if !MORPH_NAME.is_match(&self.morph_name) {
            return Err(MorphError::invalid_config(
                "morph_name",
                format!("\"{}\" is not a valid identifier", self.morph_name),
            ));
        }
        if let OutputKind::DsfFromTemplate { template } = &self.output {
            if template.extension().and_then(|e| e.to_str()) != Some("dsf") {
                return Err(MorphError::invalid_config(
                    "template",
                    format!("\"{}\" is not a .dsf file", template.display()),
                ));
            }
            if !template.is_file() {
                return Err(MorphError::invalid_config(
                    "template",
                    format!("\"{}\" not found", template.display()),
                ));
            }
        }
        validate_dirs(&self.working_dir, &self.matching_dir)
    }
}

fn validate_dirs(working_dir: &Path, matching_dir: &Path) -> MorphResult<()> {
    if !working_dir.is_dir() {
        return Err(MorphError::invalid_config(
            "working_dir",
            format!("\"{}\" is not a directory", working_dir.display()),
        ));
    }
    if !matching_dir.is_dir() {
        return Err(MorphError::invalid_config(
            "matching_dir",
            format!("\"{}\" is not a directory", matching_dir.display()),
        ));
    }
    Ok(())
}

/// Create (if needed) and return the working directory's temporary
/// subdirectory for intermediate exports.
pub(crate) fn temporary_subdir(working_dir: &Path) -> MorphResult<PathBuf> {
    let dir = working_dir.join(TEMPORARY_SUBDIR);
    if !dir.is_dir() {
        std::fs::create_dir(&dir).at_path(&dir)?;
    }
    Ok(dir)
}

/// Create (if needed) and return the subdirectory receiving generated
/// morph files.
pub(crate) fn new_morphs_subdir(working_dir: &Path) -> MorphResult<PathBuf> {
    let dir = working_dir.join(NEW_MORPHS_SUBDIR);
    if !dir.is_dir() {
        std::fs::create_dir(&dir).at_path(&dir)?;
    }
    Ok(dir)
}
