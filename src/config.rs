//! Pipeline settings, loaded from a RON file.
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```ron
//! (
//!     output_dir: "canonical",
//!     batch_size: 5,
//!     improvements: Some("review/improved-names.json"),
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::naming::MAX_NAME_LEN;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where decoded and reconciliation artifacts are written.
    pub output_dir: PathBuf,
    pub live_rooms: PathBuf,
    pub live_objects: PathBuf,
    pub backup_dir: PathBuf,
    pub batch_size: usize,
    pub name_max_len: usize,
    /// JSON map of canonical id to improved display name.
    pub improvements: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("canonical"),
            live_rooms: PathBuf::from("data/rooms.json"),
            live_objects: PathBuf::from("data/objects.json"),
            backup_dir: PathBuf::from("backups"),
            batch_size: 10,
            name_max_len: MAX_NAME_LEN,
            improvements: None,
        }
    }
}

impl PipelineConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// Load `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_from_ron(p),
            None => Ok(Self::default()),
        }
    }
}
