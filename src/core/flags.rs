//! Flag bitmasks and the semantic properties derived from them.

use crate::schema::entity::{Properties, Value};
use crate::schema::raw::{RawObjectRecord, RawRoomRecord};

/// A set of `(bit, name)` pairs for one 16-bit flag word.
pub type FlagTable = &'static [(u16, &'static str)];

pub mod room {
    pub const SEEN: u16 = 0x8000;
    pub const LIT: u16 = 0x4000;
    pub const LAND: u16 = 0x2000;
    pub const WATER: u16 = 0x1000;
    pub const AIR: u16 = 0x0800;
    pub const SACRED: u16 = 0x0400;
    pub const FILLABLE: u16 = 0x0200;
    pub const MUNGED: u16 = 0x0100;
    pub const BUCKET: u16 = 0x0080;
    pub const HOUSE: u16 = 0x0040;
    pub const NOWALL: u16 = 0x0020;
    pub const ENDGAME: u16 = 0x0010;
}

pub mod object {
    // first flag word
    pub const VISIBLE: u16 = 0x8000;
    pub const READABLE: u16 = 0x4000;
    pub const TAKEABLE: u16 = 0x2000;
    pub const DOOR: u16 = 0x1000;
    pub const TRANSPARENT: u16 = 0x0800;
    pub const FOOD: u16 = 0x0400;
    pub const NODESCRIBE: u16 = 0x0200;
    pub const DRINK: u16 = 0x0100;
    pub const CONTAINER: u16 = 0x0080;
    pub const LIGHT: u16 = 0x0040;
    pub const VICTIM: u16 = 0x0020;
    pub const BURNABLE: u16 = 0x0010;
    pub const FLAME: u16 = 0x0008;
    pub const TOOL: u16 = 0x0004;
    pub const TURNABLE: u16 = 0x0002;
    pub const ON: u16 = 0x0001;

    // second flag word
    pub const FINDABLE: u16 = 0x8000;
    pub const SLEEPING: u16 = 0x4000;
    pub const SCORED: u16 = 0x2000;
    pub const TIEABLE: u16 = 0x1000;
    pub const CLIMBABLE: u16 = 0x0800;
    pub const ACTOR: u16 = 0x0400;
    pub const WEAPON: u16 = 0x0200;
    pub const FIGHTING: u16 = 0x0100;
    pub const VILLAIN: u16 = 0x0080;
    pub const STAGGERED: u16 = 0x0040;
    pub const TRIED: u16 = 0x0020;
    pub const NOCHECK: u16 = 0x0010;
    pub const OPEN: u16 = 0x0008;
    pub const TOUCHED: u16 = 0x0004;
    pub const VEHICLE: u16 = 0x0002;
    pub const SEARCHED: u16 = 0x0001;
}

pub const ROOM_FLAGS: FlagTable = &[
    (room::SEEN, "seen"),
    (room::LIT, "lit"),
    (room::LAND, "land"),
    (room::WATER, "water"),
    (room::AIR, "air"),
    (room::SACRED, "sacred"),
    (room::FILLABLE, "fillable"),
    (room::MUNGED, "munged"),
    (room::BUCKET, "bucket"),
    (room::HOUSE, "house"),
    (room::NOWALL, "nowall"),
    (room::ENDGAME, "endgame"),
];

pub const OBJECT_FLAGS_1: FlagTable = &[
    (object::VISIBLE, "visible"),
    (object::READABLE, "readable"),
    (object::TAKEABLE, "takeable"),
    (object::DOOR, "door"),
    (object::TRANSPARENT, "transparent"),
    (object::FOOD, "food"),
    (object::NODESCRIBE, "nodescribe"),
    (object::DRINK, "drink"),
    (object::CONTAINER, "container"),
    (object::LIGHT, "light"),
    (object::VICTIM, "victim"),
    (object::BURNABLE, "burnable"),
    (object::FLAME, "flame"),
    (object::TOOL, "tool"),
    (object::TURNABLE, "turnable"),
    (object::ON, "on"),
];

pub const OBJECT_FLAGS_2: FlagTable = &[
    (object::FINDABLE, "findable"),
    (object::SLEEPING, "sleeping"),
    (object::SCORED, "scored"),
    (object::TIEABLE, "tieable"),
    (object::CLIMBABLE, "climbable"),
    (object::ACTOR, "actor"),
    (object::WEAPON, "weapon"),
    (object::FIGHTING, "fighting"),
    (object::VILLAIN, "villain"),
    (object::STAGGERED, "staggered"),
    (object::TRIED, "tried"),
    (object::NOCHECK, "nocheck"),
    (object::OPEN, "open"),
    (object::TOUCHED, "touched"),
    (object::VEHICLE, "vehicle"),
    (object::SEARCHED, "searched"),
];

/// Turns a freshly lit light source gets when the data file says nothing.
pub const DEFAULT_BATTERY_LIFE: i64 = 350;

/// Names of the bits set in `bits`, in table order. Unknown bits are ignored.
pub fn decode(bits: i16, table: FlagTable) -> Vec<&'static str> {
    let bits = bits as u16;
    table
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

pub fn is_set(bits: i16, bit: u16) -> bool {
    (bits as u16) & bit != 0
}

pub fn room_flag_names(raw: &RawRoomRecord) -> Vec<String> {
    decode(raw.flags, ROOM_FLAGS)
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn object_flag_names(raw: &RawObjectRecord) -> Vec<String> {
    let mut names = decode(raw.flags1, OBJECT_FLAGS_1);
    names.extend(decode(raw.flags2.unwrap_or(0), OBJECT_FLAGS_2));
    names.into_iter().map(str::to_string).collect()
}

fn set_true(props: &mut Properties, key: &str, on: bool) {
    if on {
        props.insert(key.to_string(), Value::Bool(true));
    }
}

fn set_int(props: &mut Properties, key: &str, value: Option<i16>) {
    if let Some(v) = value {
        props.insert(key.to_string(), Value::Int(v as i64));
    }
}

/// Semantic properties for a room.
pub fn room_properties(raw: &RawRoomRecord) -> Properties {
    let f = raw.flags;
    let mut props = Properties::new();
    props.insert("isDark".to_string(), Value::Bool(!is_set(f, room::LIT)));
    set_true(&mut props, "isSacred", is_set(f, room::SACRED));
    set_true(&mut props, "isEndgame", is_set(f, room::ENDGAME));
    set_true(&mut props, "isWater", is_set(f, room::WATER));
    set_true(&mut props, "isAir", is_set(f, room::AIR));
    set_true(&mut props, "isLand", is_set(f, room::LAND));
    set_true(&mut props, "isHouse", is_set(f, room::HOUSE));
    set_true(&mut props, "isFillable", is_set(f, room::FILLABLE));
    set_int(&mut props, "value", raw.value);
    set_int(&mut props, "actionRoutine", raw.action);
    props
}

/// Semantic properties for an object.
pub fn object_properties(raw: &RawObjectRecord) -> Properties {
    let f1 = raw.flags1;
    let f2 = raw.flags2.unwrap_or(0);
    let mut props = Properties::new();

    if is_set(f1, object::CONTAINER) {
        props.insert("isContainer".to_string(), Value::Bool(true));
        set_int(&mut props, "capacity", raw.capacity);
    }

    if is_set(f1, object::LIGHT) {
        let lit = is_set(f1, object::ON);
        props.insert("isLight".to_string(), Value::Bool(true));
        props.insert("isLit".to_string(), Value::Bool(lit));
        if lit {
            props.insert("batteryLife".to_string(), Value::Int(DEFAULT_BATTERY_LIFE));
        }
    }

    let edible = is_set(f1, object::FOOD);
    let drinkable = is_set(f1, object::DRINK);
    if edible || drinkable {
        props.insert("consumable".to_string(), Value::Bool(true));
        set_true(&mut props, "edible", edible);
        set_true(&mut props, "drinkable", drinkable);
    }

    if is_set(f1, object::VICTIM) {
        props.insert("isNpc".to_string(), Value::Bool(true));
        props.insert("npcState".to_string(), Value::String("idle".to_string()));
    }

    set_true(&mut props, "isVisible", is_set(f1, object::VISIBLE));
    set_true(&mut props, "isTakeable", is_set(f1, object::TAKEABLE));
    set_true(&mut props, "isReadable", is_set(f1, object::READABLE));
    set_true(&mut props, "isDoor", is_set(f1, object::DOOR));
    set_true(&mut props, "isTransparent", is_set(f1, object::TRANSPARENT));
    set_true(&mut props, "isFlammable", is_set(f1, object::BURNABLE));
    set_true(&mut props, "isTool", is_set(f1, object::TOOL));
    set_true(&mut props, "isActor", is_set(f2, object::ACTOR));
    set_true(&mut props, "isVillain", is_set(f2, object::VILLAIN));
    set_true(&mut props, "isWeapon", is_set(f2, object::WEAPON));
    set_true(&mut props, "isClimbable", is_set(f2, object::CLIMBABLE));
    set_true(&mut props, "isVehicle", is_set(f2, object::VEHICLE));
    set_true(&mut props, "isOpen", is_set(f2, object::OPEN));

    set_int(&mut props, "value", raw.find_value);
    set_int(&mut props, "treasureValue", raw.treasure_value);
    props.insert("size".to_string(), Value::Int(raw.size as i64));
    set_int(&mut props, "actionRoutine", raw.action);
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with(flags: i16) -> RawRoomRecord {
        RawRoomRecord {
            index: 1,
            desc1: -1,
            desc2: 0,
            exit_pointer: 0,
            action: None,
            value: None,
            flags,
        }
    }

    fn object_with(flags1: i16, flags2: Option<i16>) -> RawObjectRecord {
        RawObjectRecord {
            index: 1,
            desc1: 0,
            desc2: 0,
            original_desc: None,
            action: None,
            flags1,
            flags2,
            find_value: None,
            treasure_value: None,
            size: 5,
            capacity: Some(20),
            room: 0,
            adventurer: None,
            container: None,
            read_text: None,
        }
    }

    #[test]
    fn decode_treats_word_as_unsigned() {
        let names = decode(0x8000u16 as i16 | 0x4000, ROOM_FLAGS);
        assert_eq!(names, vec!["seen", "lit"]);
    }

    #[test]
    fn decode_ignores_unknown_bits() {
        // low nibble has no room flag
        assert_eq!(decode(0x000f, ROOM_FLAGS), Vec::<&str>::new());
        assert_eq!(decode(0x0013, ROOM_FLAGS), vec!["endgame"]);
    }

    #[test]
    fn room_without_light_is_dark() {
        let props = room_properties(&room_with(room::SEEN as i16));
        assert_eq!(props.get("isDark"), Some(&Value::Bool(true)));
        let props = room_properties(&room_with(room::LIT as i16));
        assert_eq!(props.get("isDark"), Some(&Value::Bool(false)));
    }

    #[test]
    fn sparse_zero_value_is_kept() {
        let mut raw = room_with(0);
        raw.value = Some(0);
        let props = room_properties(&raw);
        assert_eq!(props.get("value"), Some(&Value::Int(0)));
        assert!(!room_properties(&room_with(0)).contains_key("value"));
    }

    #[test]
    fn container_carries_capacity() {
        let props = object_properties(&object_with(object::CONTAINER as i16, None));
        assert_eq!(props.get("isContainer"), Some(&Value::Bool(true)));
        assert_eq!(props.get("capacity"), Some(&Value::Int(20)));
        let props = object_properties(&object_with(0, None));
        assert!(!props.contains_key("capacity"));
    }

    #[test]
    fn lit_lamp_gets_battery() {
        let lamp = object_with((object::LIGHT | object::ON) as i16, None);
        let props = object_properties(&lamp);
        assert_eq!(props.get("isLit"), Some(&Value::Bool(true)));
        assert_eq!(
            props.get("batteryLife"),
            Some(&Value::Int(DEFAULT_BATTERY_LIFE))
        );

        let unlit = object_properties(&object_with(object::LIGHT as i16, None));
        assert_eq!(unlit.get("isLit"), Some(&Value::Bool(false)));
        assert!(!unlit.contains_key("batteryLife"));
    }

    #[test]
    fn food_and_drink_are_consumable() {
        let props = object_properties(&object_with((object::FOOD | object::DRINK) as i16, None));
        assert_eq!(props.get("consumable"), Some(&Value::Bool(true)));
        assert_eq!(props.get("edible"), Some(&Value::Bool(true)));
        assert_eq!(props.get("drinkable"), Some(&Value::Bool(true)));
    }

    #[test]
    fn victim_is_idle_npc() {
        let props = object_properties(&object_with(object::VICTIM as i16, None));
        assert_eq!(props.get("isNpc"), Some(&Value::Bool(true)));
        assert_eq!(
            props.get("npcState"),
            Some(&Value::String("idle".to_string()))
        );
    }

    #[test]
    fn second_word_names_follow_first() {
        let raw = object_with(object::TAKEABLE as i16, Some((object::WEAPON | object::OPEN) as i16));
        assert_eq!(object_flag_names(&raw), vec!["takeable", "weapon", "open"]);
        let props = object_properties(&raw);
        assert!(props.contains_key("isWeapon"));
        assert!(props.contains_key("isOpen"));
    }
}
