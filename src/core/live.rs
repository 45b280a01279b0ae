//! The hand-curated live dataset, and JSON artifact I/O shared by every stage.

use chrono::Local;
use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::core::reconcile::ReconcileError;

/// One live entity. Kept as a raw JSON object so hand-edited fields the
/// pipeline knows nothing about survive a rewrite in their original order.
pub type LiveEntity = serde_json::Map<String, serde_json::Value>;

/// Timestamp embedded in backup file names.
pub const BACKUP_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Read a JSON artifact. A missing file is [`ReconcileError::MissingArtifact`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReconcileError> {
    if !path.is_file() {
        return Err(ReconcileError::MissingArtifact(path.to_path_buf()));
    }
    let file = fs::File::open(path).map_err(|source| ReconcileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ReconcileError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write pretty-printed JSON with a trailing newline, creating parent
/// directories as needed.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReconcileError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| ReconcileError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReconcileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, bytes).map_err(|source| ReconcileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A live rooms or objects file, loaded whole.
#[derive(Debug, Clone)]
pub struct LiveDataset {
    path: PathBuf,
    pub entities: Vec<LiveEntity>,
}

impl LiveDataset {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ReconcileError> {
        let path = path.into();
        let entities: Vec<LiveEntity> = read_json(&path)?;
        log::debug!("loaded {} live entities from {}", entities.len(), path.display());
        Ok(Self { path, entities })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every `id` string present.
    pub fn ids(&self) -> FxHashSet<String> {
        self.entities
            .iter()
            .filter_map(|e| e.get("id").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect()
    }

    /// Every `name`, lower-cased and trimmed for case-insensitive matching.
    pub fn names(&self) -> FxHashSet<String> {
        self.entities
            .iter()
            .filter_map(|e| e.get("name").and_then(|v| v.as_str()))
            .map(normalize_name)
            .collect()
    }

    /// Copy the file as it currently sits on disk into `dir` as
    /// `<stem>.<YYYYmmdd-HHMMSS>.bak.json`.
    pub fn backup(&self, dir: &Path) -> Result<PathBuf, ReconcileError> {
        fs::create_dir_all(dir).map_err(|source| ReconcileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "live".to_string());
        let stamp = Local::now().format(BACKUP_TIME_FORMAT).to_string();

        let mut target = dir.join(format!("{}.{}.bak.json", stem, stamp));
        let mut n = 2;
        while target.exists() {
            target = dir.join(format!("{}.{}-{}.bak.json", stem, stamp, n));
            n += 1;
        }

        fs::copy(&self.path, &target).map_err(|source| ReconcileError::Io {
            path: target.clone(),
            source,
        })?;
        log::info!("backed up {} to {}", self.path.display(), target.display());
        Ok(target)
    }

    pub fn save(&self) -> Result<(), ReconcileError> {
        write_json(&self.path, &self.entities)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
