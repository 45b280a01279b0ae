//! The decode pipeline: data file bytes → canonical entities and artifacts.
//!
//! Wires together the section parser, text decryption, message assembly
//! and entity conversion, then writes every artifact as pretty JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::core::convert::Converter;
use crate::core::datafile;
use crate::core::live;
use crate::core::messages::MessageTable;
use crate::core::naming::MAX_NAME_LEN;
use crate::core::reader::FormatError;
use crate::core::reconcile::ReconcileError;
use crate::schema::entity::{CanonicalObject, CanonicalRoom};
use crate::schema::message::Message;
use crate::schema::raw::{RawDataFile, TravelRecord};
use crate::schema::report::{ConversionReport, HeaderSummary};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("artifact error: {0}")]
    Artifact(#[from] ReconcileError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One room's run of travel records, as written to `travel.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTravel {
    pub room: usize,
    pub pointer: i16,
    pub records: Vec<TravelRecord>,
}

/// Everything decoded from one data file.
#[derive(Debug, Clone)]
pub struct CanonicalSet {
    pub header: HeaderSummary,
    pub rooms: Vec<CanonicalRoom>,
    pub objects: Vec<CanonicalObject>,
    pub messages: Vec<Message>,
    pub travel: Vec<RoomTravel>,
    pub report: ConversionReport,
}

/// Artifact file names inside the output directory.
pub mod artifacts {
    pub const HEADER: &str = "header.json";
    pub const ROOMS: &str = "rooms.json";
    pub const OBJECTS: &str = "objects.json";
    pub const MESSAGES: &str = "messages.json";
    pub const TRAVEL: &str = "travel.json";
    pub const REPORT: &str = "conversion-report.json";
    pub const NEW_ROOMS: &str = "new-rooms.json";
    pub const NEW_OBJECTS: &str = "new-objects.json";
    pub const EXTRACTION_STATS: &str = "extraction-stats.json";
    pub const CATEGORIES: &str = "categories.json";
}

/// Decoder with its tunables. Built via `Pipeline::builder()`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    max_name_len: usize,
}

pub struct PipelineBuilder {
    max_name_len: usize,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder {
            max_name_len: MAX_NAME_LEN,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::builder().max_name_len(config.name_max_len).build()
    }

    pub fn decode_file(&self, path: &Path) -> Result<CanonicalSet, PipelineError> {
        let bytes = std::fs::read(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("read {} bytes from {}", bytes.len(), path.display());
        self.decode(&bytes)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<CanonicalSet, PipelineError> {
        let file = datafile::parse(bytes)?;
        Ok(self.convert(&file))
    }

    /// Convert an already parsed file.
    pub fn convert(&self, file: &RawDataFile) -> CanonicalSet {
        let header = HeaderSummary::from_file(file);
        if header.printable_ratio < 0.9 {
            log::warn!(
                "decrypted text is only {:.1}% printable; offsets may be wrong",
                header.printable_ratio * 100.0
            );
        }

        let table = MessageTable::build(file.text.clone(), &file.message_refs);
        let converted = Converter::new(file, &table)
            .with_max_name_len(self.max_name_len)
            .run();

        let travel = file
            .rooms
            .iter()
            .filter(|r| r.exit_pointer > 0)
            .map(|r| RoomTravel {
                room: r.index,
                pointer: r.exit_pointer,
                records: file.travel_run(r.exit_pointer),
            })
            .collect();

        CanonicalSet {
            header,
            rooms: converted.rooms,
            objects: converted.objects,
            messages: table.messages().to_vec(),
            travel,
            report: converted.report,
        }
    }
}

impl PipelineBuilder {
    pub fn max_name_len(mut self, max_name_len: usize) -> Self {
        self.max_name_len = max_name_len;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            max_name_len: self.max_name_len,
        }
    }
}

impl CanonicalSet {
    /// Write every artifact into `dir`, returning the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let mut written = Vec::new();
        put(dir, artifacts::HEADER, &self.header, &mut written)?;
        put(dir, artifacts::ROOMS, &self.rooms, &mut written)?;
        put(dir, artifacts::OBJECTS, &self.objects, &mut written)?;
        put(dir, artifacts::MESSAGES, &self.messages, &mut written)?;
        put(dir, artifacts::TRAVEL, &self.travel, &mut written)?;
        put(dir, artifacts::REPORT, &self.report, &mut written)?;
        Ok(written)
    }

    /// Reload rooms and objects written by [`CanonicalSet::write_to`].
    pub fn load_entities(
        dir: &Path,
    ) -> Result<(Vec<CanonicalRoom>, Vec<CanonicalObject>), PipelineError> {
        let rooms = live::read_json(&dir.join(artifacts::ROOMS))?;
        let objects = live::read_json(&dir.join(artifacts::OBJECTS))?;
        Ok((rooms, objects))
    }
}

fn put<T: Serialize>(
    dir: &Path,
    name: &str,
    value: &T,
    written: &mut Vec<PathBuf>,
) -> Result<(), PipelineError> {
    let path = dir.join(name);
    live::write_json(&path, value)?;
    written.push(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reader::Writer;

    #[test]
    fn truncated_file_is_a_format_error() {
        let mut w = Writer::new();
        w.write_i16(2);
        w.write_i16(7);
        let err = Pipeline::builder().build().decode(&w.into_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Format(FormatError::TruncatedBuffer { .. })));
    }

    #[test]
    fn missing_input_names_the_path() {
        let err = Pipeline::builder()
            .build()
            .decode_file(Path::new("/nonexistent/dtextc.dat"))
            .unwrap_err();
        assert!(err.to_string().contains("dtextc.dat"));
    }

    #[test]
    fn config_sets_name_bound() {
        let config = PipelineConfig {
            name_max_len: 12,
            ..PipelineConfig::default()
        };
        assert_eq!(Pipeline::from_config(&config).max_name_len, 12);
    }
}
