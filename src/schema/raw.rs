//! Raw records exactly as the data file lays them out.

use serde::{Deserialize, Serialize};

/// File header: version triple plus global game parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub major: i16,
    pub minor: i16,
    pub edit: i16,
    pub max_score: i16,
    pub strength_bit: i16,
    pub endgame_max_score: i16,
}

impl Header {
    /// Version string such as `2.7A`; the edit letter is omitted unless it is
    /// a printable ASCII character.
    pub fn version(&self) -> String {
        match u8::try_from(self.edit) {
            Ok(c) if c.is_ascii_graphic() => {
                format!("{}.{}{}", self.major, self.minor, c as char)
            }
            _ => format!("{}.{}", self.major, self.minor),
        }
    }
}

/// One room. `index` is 1-based, matching how travel records and object
/// locations refer to rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoomRecord {
    pub index: usize,
    /// Long description reference.
    pub desc1: i16,
    /// Short description reference.
    pub desc2: i16,
    /// 1-based pointer into the travel array, 0 when the room has no exits.
    pub exit_pointer: i16,
    pub action: Option<i16>,
    pub value: Option<i16>,
    pub flags: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObjectRecord {
    pub index: usize,
    pub desc1: i16,
    pub desc2: i16,
    /// Description shown before the object is first touched.
    pub original_desc: Option<i16>,
    pub action: Option<i16>,
    pub flags1: i16,
    pub flags2: Option<i16>,
    pub find_value: Option<i16>,
    pub treasure_value: Option<i16>,
    pub size: i16,
    pub capacity: Option<i16>,
    /// 0 = nowhere, negative = carried, positive = 1-based room index.
    pub room: i16,
    pub adventurer: Option<i16>,
    /// 1-based index of the containing object.
    pub container: Option<i16>,
    pub read_text: Option<i16>,
}

/// Direction, destination room and condition for one exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelRecord {
    /// 1-based position of the record's first value in the travel array.
    pub pointer: usize,
    pub direction: i16,
    pub destination: i16,
    pub condition: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room2Entry {
    pub object: i16,
    pub room: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockEvent {
    pub tick: i16,
    pub action: i16,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Villain {
    pub object: i16,
    pub probability: Option<i16>,
    pub opponent: Option<i16>,
    pub best_weapon: i16,
    pub melee: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adventurer {
    pub room: i16,
    pub score: Option<i16>,
    pub vehicle: Option<i16>,
    pub object: i16,
    pub action: i16,
    pub strength: i16,
    pub flags: Option<i16>,
}

/// Everything the parser recovers from one data file.
#[derive(Debug, Clone)]
pub struct RawDataFile {
    pub header: Header,
    pub rooms: Vec<RawRoomRecord>,
    /// Flat travel array; runs are addressed by `RawRoomRecord::exit_pointer`.
    pub travel: Vec<i16>,
    pub objects: Vec<RawObjectRecord>,
    pub room2: Vec<Room2Entry>,
    pub clock_events: Vec<ClockEvent>,
    pub villains: Vec<Villain>,
    pub adventurers: Vec<Adventurer>,
    pub message_base: i16,
    /// Message table entries in table order, each an rtext value.
    pub message_refs: Vec<i16>,
    /// Absolute file offset where the encrypted text begins.
    pub text_offset: usize,
    /// Decrypted text section.
    pub text: Vec<u8>,
}

impl RawDataFile {
    /// Travel records starting at 1-based `pointer`, up to (not including)
    /// the first record whose direction is non-positive.
    ///
    /// A run that falls off the end of the array stops there.
    pub fn travel_run(&self, pointer: i16) -> Vec<TravelRecord> {
        let mut records = Vec::new();
        if pointer <= 0 {
            return records;
        }
        let mut at = pointer as usize - 1;
        while at + 2 < self.travel.len() {
            let direction = self.travel[at];
            if direction <= 0 {
                break;
            }
            records.push(TravelRecord {
                pointer: at + 1,
                direction,
                destination: self.travel[at + 1],
                condition: self.travel[at + 2],
            });
            at += 3;
        }
        records
    }
}
