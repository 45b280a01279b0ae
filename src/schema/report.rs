//! Summaries and reports written alongside the canonical data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::raw::{Header, RawDataFile};

/// A description reference that points outside the decrypted text or past
/// the end of the message table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    /// Which record field held the reference, e.g. `room 12 desc1`.
    pub owner: String,
    pub reference: i16,
    pub offset: Option<usize>,
}

/// An exit whose destination is not a known room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedExit {
    pub room: usize,
    pub direction: String,
    pub destination: i16,
    pub fallback_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub rooms: usize,
    pub objects: usize,
    pub placeholder_rooms: usize,
    pub unnamed_objects: usize,
    pub truncated_names: usize,
    /// Ids that needed a numeric suffix to stay unique.
    pub id_collisions: usize,
    pub unknown_directions: usize,
    /// Travel entries whose destination is zero or negative.
    pub blocked_exits: usize,
    pub unresolved_exits: Vec<UnresolvedExit>,
    pub dangling_references: Vec<DanglingReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCounts {
    pub rooms: usize,
    pub travel: usize,
    pub objects: usize,
    pub room2: usize,
    pub clock_events: usize,
    pub villains: usize,
    pub adventurers: usize,
    pub messages: usize,
}

/// Header plus parse statistics, written as `header.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSummary {
    pub version: String,
    #[serde(flatten)]
    pub header: Header,
    pub message_base: i16,
    pub counts: SectionCounts,
    pub text_offset: usize,
    pub text_bytes: usize,
    /// Share of decrypted bytes that look like text; near 1.0 when the key
    /// and offsets are right.
    pub printable_ratio: f64,
}

impl HeaderSummary {
    pub fn from_file(file: &RawDataFile) -> Self {
        Self {
            version: file.header.version(),
            header: file.header,
            message_base: file.message_base,
            counts: SectionCounts {
                rooms: file.rooms.len(),
                travel: file.travel.len(),
                objects: file.objects.len(),
                room2: file.room2.len(),
                clock_events: file.clock_events.len(),
                villains: file.villains.len(),
                adventurers: file.adventurers.len(),
                messages: file.message_refs.len(),
            },
            text_offset: file.text_offset,
            text_bytes: file.text.len(),
            printable_ratio: crate::core::cipher::printable_ratio(&file.text),
        }
    }
}

/// Counts from one extraction run, written as `extraction-stats.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    pub canonical_rooms: usize,
    pub canonical_objects: usize,
    pub live_rooms: usize,
    pub live_objects: usize,
    pub existing_rooms: usize,
    pub existing_objects: usize,
    pub new_rooms: usize,
    pub new_objects: usize,
    pub skipped_placeholder_rooms: usize,
    pub skipped_unnamed_objects: usize,
    pub room_categories: BTreeMap<String, usize>,
    pub object_categories: BTreeMap<String, usize>,
}

/// Outcome of merging one batch into a live file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub added: Vec<String>,
    pub skipped_duplicates: Vec<String>,
    pub renamed: usize,
    pub total_after: usize,
    pub backup: Option<String>,
}
