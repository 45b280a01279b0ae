//! Raw records → canonical rooms and objects.
//!
//! Conversion runs in two passes. The first resolves text and assigns every
//! id; the second builds exits, locations and containment against the
//! finished index → id tables, so an exit may point at a room that comes
//! later in the file.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

use crate::core::flags;
use crate::core::messages::MessageTable;
use crate::core::naming::{self, IdAllocator, MAX_NAME_LEN};
use crate::schema::entity::{
    CanonicalObject, CanonicalRoom, EntityId, EntityKind, IdBase, ObjectLocation, Traceability,
    Value,
};
use crate::schema::raw::{RawDataFile, RawObjectRecord, RawRoomRecord};
use crate::schema::report::{ConversionReport, UnresolvedExit};

/// Travel direction codes. Each is a multiple of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Up,
    Down,
    Launch,
    Land,
    Enter,
    Exit,
    Travel,
}

impl Direction {
    const ALL: [Direction; 15] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
        Self::Up,
        Self::Down,
        Self::Launch,
        Self::Land,
        Self::Enter,
        Self::Exit,
        Self::Travel,
    ];

    pub fn code(&self) -> i16 {
        (Self::ALL.iter().position(|d| d == self).unwrap_or(0) as i16 + 1) * 1024
    }

    pub fn from_code(code: i16) -> Option<Self> {
        if code <= 0 || code % 1024 != 0 {
            return None;
        }
        Self::ALL.get(code as usize / 1024 - 1).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::NorthEast => "northeast",
            Self::East => "east",
            Self::SouthEast => "southeast",
            Self::South => "south",
            Self::SouthWest => "southwest",
            Self::West => "west",
            Self::NorthWest => "northwest",
            Self::Up => "up",
            Self::Down => "down",
            Self::Launch => "launch",
            Self::Land => "land",
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::Travel => "travel",
        }
    }
}

/// Index → id lookups produced by the first pass.
#[derive(Debug, Default)]
pub struct IdTable {
    rooms: FxHashMap<usize, EntityId>,
    objects: FxHashMap<usize, EntityId>,
}

impl IdTable {
    pub fn room(&self, index: i16) -> Option<&EntityId> {
        usize::try_from(index).ok().and_then(|i| self.rooms.get(&i))
    }

    pub fn object(&self, index: i16) -> Option<&EntityId> {
        usize::try_from(index).ok().and_then(|i| self.objects.get(&i))
    }
}

/// Text resolved for one record during the first pass.
#[derive(Debug, Clone, Default)]
struct EntityText {
    name: String,
    truncated: bool,
    description: String,
    message_index: Option<usize>,
}

/// Output of a full conversion.
#[derive(Debug, Clone)]
pub struct Converted {
    pub rooms: Vec<CanonicalRoom>,
    pub objects: Vec<CanonicalObject>,
    pub report: ConversionReport,
}

pub struct Converter<'a> {
    file: &'a RawDataFile,
    messages: &'a MessageTable,
    max_name_len: usize,
    report: ConversionReport,
    room_text: Vec<EntityText>,
    object_text: Vec<EntityText>,
}

impl<'a> Converter<'a> {
    pub fn new(file: &'a RawDataFile, messages: &'a MessageTable) -> Self {
        Self {
            file,
            messages,
            max_name_len: MAX_NAME_LEN,
            report: ConversionReport::default(),
            room_text: Vec::new(),
            object_text: Vec::new(),
        }
    }

    pub fn with_max_name_len(mut self, max_name_len: usize) -> Self {
        self.max_name_len = max_name_len;
        self
    }

    /// Run both passes over every room and object.
    pub fn run(mut self) -> Converted {
        let file = self.file;
        let ids = self.assign_ids();

        let rooms: Vec<CanonicalRoom> = file
            .rooms
            .iter()
            .map(|raw| self.convert_room(raw, &ids))
            .collect();
        let objects: Vec<CanonicalObject> = file
            .objects
            .iter()
            .map(|raw| self.convert_object(raw, &ids))
            .collect();

        self.report.rooms = rooms.len();
        self.report.objects = objects.len();
        log::info!(
            "converted {} rooms and {} objects ({} dangling references)",
            rooms.len(),
            objects.len(),
            self.report.dangling_references.len()
        );

        Converted {
            rooms,
            objects,
            report: self.report,
        }
    }

    /// First pass: resolve text and allocate ids, rooms before objects.
    pub fn assign_ids(&mut self) -> IdTable {
        let file = self.file;
        let mut allocator = IdAllocator::new();
        let mut ids = IdTable::default();

        let room_text: Vec<EntityText> = file
            .rooms
            .iter()
            .map(|raw| self.resolve_room_text(raw))
            .collect();
        self.room_text = room_text;
        for (raw, text) in file.rooms.iter().zip(&self.room_text) {
            let base = if text.name == placeholder_room_name(raw.index) {
                IdBase::Index {
                    kind: EntityKind::Room,
                    index: raw.index,
                }
            } else {
                naming::id_base(&text.name, EntityKind::Room, raw.index)
            };
            ids.rooms.insert(raw.index, allocator.allocate(base));
        }

        let object_text: Vec<EntityText> = file
            .objects
            .iter()
            .map(|raw| self.resolve_object_text(raw))
            .collect();
        self.object_text = object_text;
        for (raw, text) in file.objects.iter().zip(&self.object_text) {
            let base = naming::id_base(&text.name, EntityKind::Object, raw.index);
            ids.objects.insert(raw.index, allocator.allocate(base));
        }

        self.report.id_collisions = allocator.collisions();
        ids
    }

    /// Second pass for one room. Requires [`Converter::assign_ids`] first.
    pub fn convert_room(&mut self, raw: &RawRoomRecord, ids: &IdTable) -> CanonicalRoom {
        let text = self
            .room_text
            .get(raw.index.wrapping_sub(1))
            .cloned()
            .unwrap_or_default();
        let id = ids
            .rooms
            .get(&raw.index)
            .cloned()
            .unwrap_or_else(|| EntityId::fallback(EntityKind::Room, raw.index));

        let mut exits = BTreeMap::new();
        let mut conditional = Vec::new();
        for record in self.file.travel_run(raw.exit_pointer) {
            let Some(direction) = Direction::from_code(record.direction) else {
                log::debug!(
                    "room {}: unknown direction code {} at travel {}",
                    raw.index,
                    record.direction,
                    record.pointer
                );
                self.report.unknown_directions += 1;
                continue;
            };
            if exits.contains_key(direction.name()) {
                continue;
            }
            if record.destination <= 0 {
                self.report.blocked_exits += 1;
                continue;
            }
            let destination = match ids.room(record.destination) {
                Some(dest) => dest.clone(),
                None => {
                    let fallback =
                        EntityId::fallback(EntityKind::Room, record.destination as usize);
                    log::warn!(
                        "room {}: {} leads to unknown room {}, using {}",
                        raw.index,
                        direction.name(),
                        record.destination,
                        fallback
                    );
                    self.report.unresolved_exits.push(UnresolvedExit {
                        room: raw.index,
                        direction: direction.name().to_string(),
                        destination: record.destination,
                        fallback_id: fallback.to_string(),
                    });
                    fallback
                }
            };
            if record.condition != 0 {
                conditional.push(direction.name().to_string());
            }
            exits.insert(direction.name().to_string(), destination);
        }

        let mut properties = flags::room_properties(raw);
        if !conditional.is_empty() {
            properties.insert("conditionalExits".to_string(), Value::List(conditional));
        }

        if text.name == placeholder_room_name(raw.index) || text.name == text.description {
            self.report.placeholder_rooms += 1;
        }
        if text.truncated {
            self.report.truncated_names += 1;
        }

        CanonicalRoom {
            id,
            name: text.name,
            description: text.description,
            exits,
            properties,
            source: Traceability {
                index: raw.index,
                message_index: text.message_index,
                flags: flags::room_flag_names(raw),
                name_truncated: text.truncated,
            },
        }
    }

    /// Second pass for one object. Requires [`Converter::assign_ids`] first.
    pub fn convert_object(&mut self, raw: &RawObjectRecord, ids: &IdTable) -> CanonicalObject {
        let text = self
            .object_text
            .get(raw.index.wrapping_sub(1))
            .cloned()
            .unwrap_or_default();
        let id = ids
            .objects
            .get(&raw.index)
            .cloned()
            .unwrap_or_else(|| EntityId::fallback(EntityKind::Object, raw.index));

        let location = match raw.room {
            0 => ObjectLocation::Void,
            r if r < 0 => ObjectLocation::Inventory,
            r => ObjectLocation::Room(
                ids.room(r)
                    .cloned()
                    .unwrap_or_else(|| EntityId::fallback(EntityKind::Room, r as usize)),
            ),
        };

        let mut properties = flags::object_properties(raw);
        if let Some(container) = raw.container.filter(|&c| c > 0) {
            let holder = ids
                .object(container)
                .cloned()
                .unwrap_or_else(|| EntityId::fallback(EntityKind::Object, container as usize));
            properties.insert("containedIn".to_string(), Value::String(holder.to_string()));
        }

        if text.name.is_empty() {
            self.report.unnamed_objects += 1;
        }
        if text.truncated {
            self.report.truncated_names += 1;
        }

        CanonicalObject {
            id,
            aliases: naming::aliases(&text.name),
            name: text.name,
            description: text.description,
            location,
            properties,
            source: Traceability {
                index: raw.index,
                message_index: text.message_index,
                flags: flags::object_flag_names(raw),
                name_truncated: text.truncated,
            },
        }
    }

    fn resolve_room_text(&mut self, raw: &RawRoomRecord) -> EntityText {
        let owner = format!("room {}", raw.index);
        let (long, message_index) = self.text(&owner, "desc1", raw.desc1);
        let (short, _) = self.text(&owner, "desc2", raw.desc2);

        let source = if short.trim().is_empty() { &long } else { &short };
        match naming::extract_name(source, self.max_name_len) {
            Some(extracted) => EntityText {
                name: extracted.name,
                truncated: extracted.truncated,
                description: long,
                message_index,
            },
            None => EntityText {
                name: placeholder_room_name(raw.index),
                truncated: false,
                description: long,
                message_index,
            },
        }
    }

    fn resolve_object_text(&mut self, raw: &RawObjectRecord) -> EntityText {
        let owner = format!("object {}", raw.index);
        let (long, message_index) = self.text(&owner, "desc1", raw.desc1);
        let (short, _) = self.text(&owner, "desc2", raw.desc2);
        let description = if long.trim().is_empty() {
            match raw.original_desc {
                Some(r) => self.text(&owner, "odesco", r).0,
                None => long,
            }
        } else {
            long
        };

        let source = if short.trim().is_empty() {
            &description
        } else {
            &short
        };
        let extracted = naming::extract_name(source, self.max_name_len);
        EntityText {
            name: extracted.as_ref().map(|e| e.name.clone()).unwrap_or_default(),
            truncated: extracted.is_some_and(|e| e.truncated),
            description,
            message_index,
        }
    }

    /// Resolve a reference, recording it if it dangles.
    fn text(&mut self, owner: &str, field: &str, reference: i16) -> (String, Option<usize>) {
        match self.messages.resolve(reference) {
            Ok(Some(resolved)) => (resolved.text, resolved.message_index),
            Ok(None) => (String::new(), None),
            Err(mut dangling) => {
                dangling.owner = format!("{} {}", owner, field);
                log::debug!(
                    "{} references text outside the data file ({})",
                    dangling.owner,
                    reference
                );
                self.report.dangling_references.push(dangling);
                (String::new(), None)
            }
        }
    }
}

/// Name given to rooms whose descriptions yield nothing usable.
pub fn placeholder_room_name(index: usize) -> String {
    format!("Room {}", index)
}

/// Convert every room and object in `file`.
pub fn convert_all(file: &RawDataFile, messages: &MessageTable, max_name_len: usize) -> Converted {
    Converter::new(file, messages)
        .with_max_name_len(max_name_len)
        .run()
}
