//! Reconciling canonical entities with the live dataset.
//!
//! Three steps, each usable on its own:
//!
//! 1. [`extract`] finds canonical entities the live dataset lacks and drops
//!    placeholders.
//! 2. [`categorize_rooms`] / [`categorize_objects`] group the new entities
//!    and split each group into review batches.
//! 3. [`merge_batch`] appends one reviewed batch to a live file, after a
//!    backup, skipping anything whose id is already taken.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::live::{self, LiveDataset, LiveEntity};
use crate::core::naming;
use crate::schema::entity::{CanonicalObject, CanonicalRoom, EntityId, EntityKind, Value};
use crate::schema::report::{ExtractionStats, MergeReport};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Canonical id → hand-improved display name.
pub type Improvements = BTreeMap<String, String>;

/// Load an improvements map; no path means no improvements.
pub fn load_improvements(path: Option<&Path>) -> Result<Improvements, ReconcileError> {
    match path {
        Some(p) => live::read_json(p),
        None => Ok(Improvements::new()),
    }
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

/// New entities plus the numbers behind them.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub new_rooms: Vec<CanonicalRoom>,
    pub new_objects: Vec<CanonicalObject>,
    pub stats: ExtractionStats,
}

/// True for rooms whose name says nothing: equal to the description, or
/// exactly `Room <n>`.
pub fn is_placeholder_room(room: &CanonicalRoom) -> bool {
    if room.name == room.description {
        return true;
    }
    room.name
        .strip_prefix("Room ")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Names and ids a live file already holds.
struct Present {
    names: FxHashSet<String>,
    ids: FxHashSet<String>,
}

impl Present {
    fn of(live: &LiveDataset) -> Self {
        Self {
            names: live.names(),
            ids: live.ids(),
        }
    }

    /// Matched by case-insensitive canonical name, or by the name and id the
    /// entity would be merged under.
    fn contains<T: Mergeable>(&self, entity: &T, improvements: &Improvements) -> bool {
        let (id, improved) = merged_identity(entity, improvements);
        self.names.contains(&live::normalize_name(entity.name()))
            || improved.is_some_and(|name| self.names.contains(&live::normalize_name(name)))
            || self.ids.contains(&id)
    }
}

/// The id and improved name `entity` is merged under.
///
/// Without a usable improvement the canonical id is kept; with one the id is
/// re-derived from the improved name.
fn merged_identity<'a, T: Mergeable>(
    entity: &T,
    improvements: &'a Improvements,
) -> (String, Option<&'a str>) {
    let canonical_id = entity.id().to_string();
    let improved = improvements
        .get(&canonical_id)
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && *n != entity.name());
    let id = match improved {
        Some(name) => {
            let base = naming::id_base(name, T::KIND, entity.index());
            EntityId { base, suffix: None }.to_string()
        }
        None => canonical_id,
    };
    (id, improved)
}

/// Partition canonical entities into those the live dataset already has and
/// new ones, dropping placeholders.
///
/// An entity is present when a live entity shares its name (case-insensitive)
/// or holds the id it would be merged under, so entities merged under an
/// improved name are not extracted again.
pub fn extract(
    rooms: &[CanonicalRoom],
    objects: &[CanonicalObject],
    live_rooms: &LiveDataset,
    live_objects: &LiveDataset,
    improvements: &Improvements,
) -> Extraction {
    let present_rooms = Present::of(live_rooms);
    let present_objects = Present::of(live_objects);
    let mut out = Extraction::default();
    let stats = &mut out.stats;

    stats.canonical_rooms = rooms.len();
    stats.canonical_objects = objects.len();
    stats.live_rooms = live_rooms.len();
    stats.live_objects = live_objects.len();

    for room in rooms {
        if present_rooms.contains(room, improvements) {
            stats.existing_rooms += 1;
        } else if is_placeholder_room(room) {
            log::debug!("skipping placeholder room {} ({:?})", room.id, room.name);
            stats.skipped_placeholder_rooms += 1;
        } else {
            out.new_rooms.push(room.clone());
        }
    }

    for object in objects {
        if object.name.trim().is_empty() {
            log::debug!("skipping unnamed object {}", object.id);
            stats.skipped_unnamed_objects += 1;
        } else if present_objects.contains(object, improvements) {
            stats.existing_objects += 1;
        } else {
            out.new_objects.push(object.clone());
        }
    }

    stats.new_rooms = out.new_rooms.len();
    stats.new_objects = out.new_objects.len();
    for room in &out.new_rooms {
        *stats
            .room_categories
            .entry(RoomCategory::of(room).name().to_string())
            .or_default() += 1;
    }
    for object in &out.new_objects {
        *stats
            .object_categories
            .entry(ObjectCategory::of(object).name().to_string())
            .or_default() += 1;
    }

    log::info!(
        "extracted {} new rooms and {} new objects",
        stats.new_rooms,
        stats.new_objects
    );
    out
}

// ---------------------------------------------------------------------------
// Categorize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoomCategory {
    Endgame,
    Sacred,
    Terrain,
    Regular,
}

impl RoomCategory {
    pub const ALL: [RoomCategory; 4] = [Self::Endgame, Self::Sacred, Self::Terrain, Self::Regular];

    /// First match wins, in declaration order.
    pub fn of(room: &CanonicalRoom) -> Self {
        if room.has("isEndgame") {
            Self::Endgame
        } else if room.has("isSacred") {
            Self::Sacred
        } else if room.has("isWater") || room.has("isAir") {
            Self::Terrain
        } else {
            Self::Regular
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Endgame => "endgame",
            Self::Sacred => "sacred",
            Self::Terrain => "terrain",
            Self::Regular => "regular",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectCategory {
    Npc,
    Light,
    Container,
    Consumable,
    Treasure,
    Regular,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 6] = [
        Self::Npc,
        Self::Light,
        Self::Container,
        Self::Consumable,
        Self::Treasure,
        Self::Regular,
    ];

    pub fn of(object: &CanonicalObject) -> Self {
        let positive = |key: &str| matches!(object.properties.get(key), Some(Value::Int(n)) if *n > 0);
        if object.has("isNpc") {
            Self::Npc
        } else if object.has("isLight") {
            Self::Light
        } else if object.has("isContainer") {
            Self::Container
        } else if object.has("consumable") {
            Self::Consumable
        } else if positive("treasureValue") || positive("value") {
            Self::Treasure
        } else {
            Self::Regular
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Npc => "npc",
            Self::Light => "light",
            Self::Container => "container",
            Self::Consumable => "consumable",
            Self::Treasure => "treasure",
            Self::Regular => "regular",
        }
    }
}

/// A bounded slice of one category, reviewed and merged as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub category: String,
    /// 1-based within the category.
    pub number: usize,
    pub ids: Vec<String>,
}

/// Batches for every new room and object, written as `categories.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    pub rooms: Vec<Batch>,
    pub objects: Vec<Batch>,
}

impl Categories {
    /// Reload the reviewed batches written by extraction.
    pub fn load(path: &Path) -> Result<Self, ReconcileError> {
        live::read_json(path)
    }

    /// Batch `number` of `category` for the given kind.
    pub fn batch(&self, kind: EntityKind, category: &str, number: usize) -> Option<&Batch> {
        let batches = match kind {
            EntityKind::Room => &self.rooms,
            EntityKind::Object => &self.objects,
        };
        batches
            .iter()
            .find(|b| b.category == category && b.number == number)
    }
}

fn split(category: &str, ids: Vec<String>, batch_size: usize) -> Vec<Batch> {
    ids.chunks(batch_size.max(1))
        .enumerate()
        .map(|(i, chunk)| Batch {
            category: category.to_string(),
            number: i + 1,
            ids: chunk.to_vec(),
        })
        .collect()
}

pub fn categorize_rooms(rooms: &[CanonicalRoom], batch_size: usize) -> Vec<Batch> {
    RoomCategory::ALL
        .iter()
        .flat_map(|category| {
            let ids = rooms
                .iter()
                .filter(|r| RoomCategory::of(r) == *category)
                .map(|r| r.id.to_string())
                .collect();
            split(category.name(), ids, batch_size)
        })
        .collect()
}

pub fn categorize_objects(objects: &[CanonicalObject], batch_size: usize) -> Vec<Batch> {
    ObjectCategory::ALL
        .iter()
        .flat_map(|category| {
            let ids = objects
                .iter()
                .filter(|o| ObjectCategory::of(o) == *category)
                .map(|o| o.id.to_string())
                .collect();
            split(category.name(), ids, batch_size)
        })
        .collect()
}

pub fn categorize(extraction: &Extraction, batch_size: usize) -> Categories {
    Categories {
        rooms: categorize_rooms(&extraction.new_rooms, batch_size),
        objects: categorize_objects(&extraction.new_objects, batch_size),
    }
}

/// Entities whose id is listed in `batch`, in batch order.
pub fn select<'a, T: Mergeable>(entities: &'a [T], batch: &Batch) -> Vec<&'a T> {
    batch
        .ids
        .iter()
        .filter_map(|id| entities.iter().find(|e| e.id().to_string() == *id))
        .collect()
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// A canonical entity that can be appended to a live file.
pub trait Mergeable: Serialize {
    const KIND: EntityKind;

    fn id(&self) -> &EntityId;
    fn name(&self) -> &str;
    fn index(&self) -> usize;

    /// Rewrite name-derived fields after an improved name was applied.
    fn rename(&self, record: &mut LiveEntity, name: &str) {
        record.insert("name".to_string(), name.into());
    }
}

impl Mergeable for CanonicalRoom {
    const KIND: EntityKind = EntityKind::Room;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn index(&self) -> usize {
        self.source.index
    }
}

impl Mergeable for CanonicalObject {
    const KIND: EntityKind = EntityKind::Object;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn index(&self) -> usize {
        self.source.index
    }

    fn rename(&self, record: &mut LiveEntity, name: &str) {
        record.insert("name".to_string(), name.into());
        record.insert("aliases".to_string(), naming::aliases(name).into());
    }
}

/// Append `batch` to `live`.
///
/// Entities are skipped when their final id is already in the live file or
/// earlier in the batch. When anything survives, the live file is backed up
/// into `backup_dir` and then rewritten; when nothing does, no file is
/// touched.
pub fn merge_batch<T: Mergeable>(
    live: &mut LiveDataset,
    batch: &[&T],
    improvements: &Improvements,
    backup_dir: &Path,
) -> Result<MergeReport, ReconcileError> {
    let mut taken = live.ids();
    let mut report = MergeReport::default();
    let mut additions = Vec::new();

    for entity in batch {
        let (id, improved) = merged_identity(*entity, improvements);

        if !taken.insert(id.clone()) {
            log::warn!("duplicate identifier {}, skipping", id);
            report.skipped_duplicates.push(id);
            continue;
        }

        let mut record = match serde_json::to_value(entity) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => LiveEntity::new(),
            Err(source) => {
                return Err(ReconcileError::Json {
                    path: live.path().to_path_buf(),
                    source,
                })
            }
        };
        record.remove("source");
        record.insert("id".to_string(), id.clone().into());
        if let Some(name) = improved {
            log::debug!("{} renamed to {:?} as {}", entity.id(), name, id);
            entity.rename(&mut record, name);
            report.renamed += 1;
        }

        additions.push(record);
        report.added.push(id);
    }

    if additions.is_empty() {
        log::info!("nothing to merge into {}", live.path().display());
        report.total_after = live.len();
        return Ok(report);
    }

    let backup = live.backup(backup_dir)?;
    report.backup = Some(backup.display().to_string());
    live.entities.extend(additions);
    live.save()?;
    report.total_after = live.len();

    log::info!(
        "merged {} entities into {} ({} skipped)",
        report.added.len(),
        live.path().display(),
        report.skipped_duplicates.len()
    );
    Ok(report)
}
