//! A small hand-built dungeon shared by the integration tests.

#![allow(dead_code)]

use dungeon_canon::core::convert::Direction;
use dungeon_canon::core::datafile;
use dungeon_canon::core::flags::{object, room};
use dungeon_canon::schema::message::rtext_for_offset;
use dungeon_canon::schema::raw::{Header, RawDataFile, RawObjectRecord, RawRoomRecord};

/// Lays strings out NUL-terminated on 8-byte boundaries.
#[derive(Default)]
pub struct TextBuilder {
    pub bytes: Vec<u8>,
}

impl TextBuilder {
    /// Append `s` and return its rtext reference.
    pub fn add(&mut self, s: &str) -> i16 {
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        while self.bytes.len() % 8 != 0 {
            self.bytes.push(0);
        }
        rtext_for_offset(offset)
    }
}

pub fn room_record(index: usize, desc1: i16, desc2: i16, exit_pointer: i16, flags: u16) -> RawRoomRecord {
    RawRoomRecord {
        index,
        desc1,
        desc2,
        exit_pointer,
        action: None,
        value: None,
        flags: flags as i16,
    }
}

pub fn object_record(index: usize, desc1: i16, desc2: i16, flags1: u16, room: i16) -> RawObjectRecord {
    RawObjectRecord {
        index,
        desc1,
        desc2,
        original_desc: None,
        action: None,
        flags1: flags1 as i16,
        flags2: None,
        find_value: None,
        treasure_value: None,
        size: 5,
        capacity: None,
        room,
        adventurer: None,
        container: None,
        read_text: None,
    }
}

/// Five rooms and five objects:
///
/// 1. Kitchen (lit, house): north → 2, down → 2, west → 7 (no such room),
///    plus one unknown direction code.
/// 2. Dark cellar: north → itself, up → 1 behind condition 5.
/// 3. No text at all.
/// 4. Temple altar (lit, sacred).
/// 5. Round room (lit).
///
/// Objects: brass lamp in the kitchen, sword carried, troll in the void,
/// bag of coins in room 5 holding nothing, and one with no text.
/// Message table entry 2 is the `#`-marked welcome banner.
pub fn dungeon() -> RawDataFile {
    let mut t = TextBuilder::default();
    let kitchen_long = t.add("You are in the kitchen of the white house. A table seems to have been used recently.");
    let kitchen_short = t.add("Kitchen");
    let cellar_long = t.add("You are in a dark and damp cellar.");
    let altar_long = t.add("This is the temple altar. Candles burn on it.");
    let round_short = t.add("Round Room");
    let lamp_long = t.add("There is a brass lantern (battery-powered) here.");
    let lamp_short = t.add("brass lantern");
    let sword_short = t.add("sword");
    // sword is referenced by table position 1 below
    let troll_short = t.add("troll");
    let bag_short = t.add("bag of coins");
    let welcome = t.add("WELCOME TO ZORK!#");

    let north = Direction::North.code();
    let down = Direction::Down.code();
    let west = Direction::West.code();
    let up = Direction::Up.code();
    let travel = vec![
        // room 1, pointer 1
        north, 2, 0, down, 2, 0, west, 7, 0, 999, 3, 0, 0, 0, 0,
        // room 2, pointer 16
        north, 2, 0, up, 1, 5, 0, 0, 0,
    ];

    let mut sword = object_record(2, 0, 1, object::TAKEABLE, -1);
    sword.flags2 = Some(object::WEAPON as i16);
    let mut bag = object_record(4, 0, bag_short, object::CONTAINER | object::TAKEABLE, 5);
    bag.capacity = Some(10);
    bag.treasure_value = Some(10);

    RawDataFile {
        header: Header {
            major: 2,
            minor: 7,
            edit: b'A' as i16,
            max_score: 585,
            strength_bit: 0x4000,
            endgame_max_score: 100,
        },
        rooms: vec![
            room_record(1, kitchen_long, kitchen_short, 1, room::LIT | room::HOUSE),
            room_record(2, cellar_long, 0, 16, 0),
            room_record(3, 0, 0, 0, room::LIT),
            room_record(4, altar_long, 0, 0, room::LIT | room::SACRED),
            room_record(5, 0, round_short, 0, room::LIT),
        ],
        travel,
        objects: vec![
            object_record(1, lamp_long, lamp_short, object::LIGHT | object::TAKEABLE, 1),
            sword,
            object_record(3, 0, troll_short, object::VICTIM, 0),
            bag,
            object_record(5, 0, 0, 0, 3),
        ],
        room2: Vec::new(),
        clock_events: Vec::new(),
        villains: Vec::new(),
        adventurers: Vec::new(),
        message_base: 0,
        message_refs: vec![sword_short, welcome],
        text_offset: 0,
        text: t.bytes,
    }
}

/// The dungeon as it sits on disk.
pub fn dungeon_bytes() -> Vec<u8> {
    datafile::encode(&dungeon())
}
