//! Section-by-section parser for the data file, and its inverse.
//!
//! Layout (every value a big-endian i16 unless noted):
//!
//! ```text
//! header      major minor edit | max_score strength_bit endgame_max
//! rooms       count | desc1[] desc2[] exit[] action{} value{} flags[]
//! travel      count | travel[]
//! objects     count | desc1[] desc2[] odesco{} action{} flags1[] flags2{}
//!                     fval{} tval{} size[] capacity{} room[] adv{} can{} read{}
//! room2       count | object[] room[]
//! clock       count | tick[] action[] enabled<bytes>
//! villains    count | object[] prob{} opps{} best[] melee[]
//! adventurers count | room[] score{} vehicle{} object[] action[] strength[] flags{}
//! messages    base count | rtext[]
//! text        encrypted bytes to end of file
//! ```
//!
//! `[]` is a fixed array, `{}` a sparse array, `<bytes>` one flag byte each.

use crate::core::cipher;
use crate::core::reader::{Reader, Result, Writer};
use crate::schema::raw::{
    Adventurer, ClockEvent, Header, RawDataFile, RawObjectRecord, RawRoomRecord, Room2Entry,
    Villain,
};

/// Parse a complete data file. Any structural failure aborts the parse.
pub fn parse(data: &[u8]) -> Result<RawDataFile> {
    let mut r = Reader::new(data);

    let header = Header {
        major: r.read_i16()?,
        minor: r.read_i16()?,
        edit: r.read_i16()?,
        max_score: r.read_i16()?,
        strength_bit: r.read_i16()?,
        endgame_max_score: r.read_i16()?,
    };
    log::debug!("header: version {}", header.version());

    let rooms = read_rooms(&mut r)?;
    log::debug!("{} rooms, next offset {:#x}", rooms.len(), r.position());

    let travel_count = r.read_count("travel")?;
    let travel = r.read_fixed_array(travel_count)?;

    let objects = read_objects(&mut r)?;
    log::debug!("{} objects, next offset {:#x}", objects.len(), r.position());

    let room2_count = r.read_count("room2")?;
    let room2_objects = r.read_fixed_array(room2_count)?;
    let room2_rooms = r.read_fixed_array(room2_count)?;
    let room2 = room2_objects
        .into_iter()
        .zip(room2_rooms)
        .map(|(object, room)| Room2Entry { object, room })
        .collect();

    let clock_count = r.read_count("clock events")?;
    let ticks = r.read_fixed_array(clock_count)?;
    let actions = r.read_fixed_array(clock_count)?;
    let enabled = r.read_flag_bytes(clock_count)?;
    let clock_events = (0..clock_count)
        .map(|i| ClockEvent {
            tick: ticks[i],
            action: actions[i],
            enabled: enabled[i],
        })
        .collect();

    let villains = read_villains(&mut r)?;
    let adventurers = read_adventurers(&mut r)?;

    let message_base = r.read_i16()?;
    let message_count = r.read_count("messages")?;
    let message_refs = r.read_fixed_array(message_count)?;

    let text_offset = r.position();
    let text = cipher::decrypt(r.rest(), 0);
    log::debug!(
        "{} message refs, {} text bytes at offset {:#x}",
        message_refs.len(),
        text.len(),
        text_offset
    );

    Ok(RawDataFile {
        header,
        rooms,
        travel,
        objects,
        room2,
        clock_events,
        villains,
        adventurers,
        message_base,
        message_refs,
        text_offset,
        text,
    })
}

/// Where the text section starts and what the message table holds, found by
/// skipping every record section without materializing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLocation {
    pub header: Header,
    pub text_offset: usize,
    pub message_base: i16,
    pub message_refs: Vec<i16>,
}

/// Skip straight to the message table and text section.
pub fn locate_text(data: &[u8]) -> Result<TextLocation> {
    use crate::core::reader::ArrayKind::{Fixed, Flags, Sparse};

    let mut r = Reader::new(data);
    let header = Header {
        major: r.read_i16()?,
        minor: r.read_i16()?,
        edit: r.read_i16()?,
        max_score: r.read_i16()?,
        strength_bit: r.read_i16()?,
        endgame_max_score: r.read_i16()?,
    };
    r.skip_section("rooms", &[Fixed, Fixed, Fixed, Sparse, Sparse, Fixed])?;
    r.skip_section("travel", &[Fixed])?;
    r.skip_section(
        "objects",
        &[
            Fixed, Fixed, Sparse, Sparse, Fixed, Sparse, Sparse, Sparse, Fixed, Sparse, Fixed,
            Sparse, Sparse, Sparse,
        ],
    )?;
    r.skip_section("room2", &[Fixed, Fixed])?;
    r.skip_section("clock events", &[Fixed, Fixed, Flags])?;
    r.skip_section("villains", &[Fixed, Sparse, Sparse, Fixed, Fixed])?;
    r.skip_section(
        "adventurers",
        &[Fixed, Sparse, Sparse, Fixed, Fixed, Fixed, Sparse],
    )?;
    let message_base = r.read_i16()?;
    let count = r.read_count("messages")?;
    let message_refs = r.read_fixed_array(count)?;

    Ok(TextLocation {
        header,
        text_offset: r.position(),
        message_base,
        message_refs,
    })
}

fn read_rooms(r: &mut Reader<'_>) -> Result<Vec<RawRoomRecord>> {
    let n = r.read_count("rooms")?;
    let desc1 = r.read_fixed_array(n)?;
    let desc2 = r.read_fixed_array(n)?;
    let exits = r.read_fixed_array(n)?;
    let actions = r.read_sparse_array(n)?;
    let values = r.read_sparse_array(n)?;
    let flags = r.read_fixed_array(n)?;

    Ok((0..n)
        .map(|i| RawRoomRecord {
            index: i + 1,
            desc1: desc1[i],
            desc2: desc2[i],
            exit_pointer: exits[i],
            action: actions[i],
            value: values[i],
            flags: flags[i],
        })
        .collect())
}

fn read_objects(r: &mut Reader<'_>) -> Result<Vec<RawObjectRecord>> {
    let n = r.read_count("objects")?;
    let desc1 = r.read_fixed_array(n)?;
    let desc2 = r.read_fixed_array(n)?;
    let original = r.read_sparse_array(n)?;
    let actions = r.read_sparse_array(n)?;
    let flags1 = r.read_fixed_array(n)?;
    let flags2 = r.read_sparse_array(n)?;
    let find_values = r.read_sparse_array(n)?;
    let treasure_values = r.read_sparse_array(n)?;
    let sizes = r.read_fixed_array(n)?;
    let capacities = r.read_sparse_array(n)?;
    let rooms = r.read_fixed_array(n)?;
    let adventurers = r.read_sparse_array(n)?;
    let containers = r.read_sparse_array(n)?;
    let reads = r.read_sparse_array(n)?;

    Ok((0..n)
        .map(|i| RawObjectRecord {
            index: i + 1,
            desc1: desc1[i],
            desc2: desc2[i],
            original_desc: original[i],
            action: actions[i],
            flags1: flags1[i],
            flags2: flags2[i],
            find_value: find_values[i],
            treasure_value: treasure_values[i],
            size: sizes[i],
            capacity: capacities[i],
            room: rooms[i],
            adventurer: adventurers[i],
            container: containers[i],
            read_text: reads[i],
        })
        .collect())
}

fn read_villains(r: &mut Reader<'_>) -> Result<Vec<Villain>> {
    let n = r.read_count("villains")?;
    let objects = r.read_fixed_array(n)?;
    let probabilities = r.read_sparse_array(n)?;
    let opponents = r.read_sparse_array(n)?;
    let best = r.read_fixed_array(n)?;
    let melee = r.read_fixed_array(n)?;
    Ok((0..n)
        .map(|i| Villain {
            object: objects[i],
            probability: probabilities[i],
            opponent: opponents[i],
            best_weapon: best[i],
            melee: melee[i],
        })
        .collect())
}

fn read_adventurers(r: &mut Reader<'_>) -> Result<Vec<Adventurer>> {
    let n = r.read_count("adventurers")?;
    let rooms = r.read_fixed_array(n)?;
    let scores = r.read_sparse_array(n)?;
    let vehicles = r.read_sparse_array(n)?;
    let objects = r.read_fixed_array(n)?;
    let actions = r.read_fixed_array(n)?;
    let strengths = r.read_fixed_array(n)?;
    let flags = r.read_sparse_array(n)?;
    Ok((0..n)
        .map(|i| Adventurer {
            room: rooms[i],
            score: scores[i],
            vehicle: vehicles[i],
            object: objects[i],
            action: actions[i],
            strength: strengths[i],
            flags: flags[i],
        })
        .collect())
}

/// Serialize `file` back into the on-disk layout, encrypting `file.text`.
///
/// Counts are taken from the vector lengths; `text_offset` is ignored and
/// recomputed by the next [`parse`].
pub fn encode(file: &RawDataFile) -> Vec<u8> {
    let mut w = Writer::new();
    let h = &file.header;
    w.write_fixed_array(&[
        h.major,
        h.minor,
        h.edit,
        h.max_score,
        h.strength_bit,
        h.endgame_max_score,
    ]);

    let rooms = &file.rooms;
    w.write_i16(rooms.len() as i16);
    w.write_fixed_array(&column(rooms, |r| r.desc1));
    w.write_fixed_array(&column(rooms, |r| r.desc2));
    w.write_fixed_array(&column(rooms, |r| r.exit_pointer));
    w.write_sparse_array(&column(rooms, |r| r.action));
    w.write_sparse_array(&column(rooms, |r| r.value));
    w.write_fixed_array(&column(rooms, |r| r.flags));

    w.write_i16(file.travel.len() as i16);
    w.write_fixed_array(&file.travel);

    let objects = &file.objects;
    w.write_i16(objects.len() as i16);
    w.write_fixed_array(&column(objects, |o| o.desc1));
    w.write_fixed_array(&column(objects, |o| o.desc2));
    w.write_sparse_array(&column(objects, |o| o.original_desc));
    w.write_sparse_array(&column(objects, |o| o.action));
    w.write_fixed_array(&column(objects, |o| o.flags1));
    w.write_sparse_array(&column(objects, |o| o.flags2));
    w.write_sparse_array(&column(objects, |o| o.find_value));
    w.write_sparse_array(&column(objects, |o| o.treasure_value));
    w.write_fixed_array(&column(objects, |o| o.size));
    w.write_sparse_array(&column(objects, |o| o.capacity));
    w.write_fixed_array(&column(objects, |o| o.room));
    w.write_sparse_array(&column(objects, |o| o.adventurer));
    w.write_sparse_array(&column(objects, |o| o.container));
    w.write_sparse_array(&column(objects, |o| o.read_text));

    w.write_i16(file.room2.len() as i16);
    w.write_fixed_array(&column(&file.room2, |e| e.object));
    w.write_fixed_array(&column(&file.room2, |e| e.room));

    let clock = &file.clock_events;
    w.write_i16(clock.len() as i16);
    w.write_fixed_array(&column(clock, |c| c.tick));
    w.write_fixed_array(&column(clock, |c| c.action));
    w.write_flag_bytes(&column(clock, |c| c.enabled));

    let villains = &file.villains;
    w.write_i16(villains.len() as i16);
    w.write_fixed_array(&column(villains, |v| v.object));
    w.write_sparse_array(&column(villains, |v| v.probability));
    w.write_sparse_array(&column(villains, |v| v.opponent));
    w.write_fixed_array(&column(villains, |v| v.best_weapon));
    w.write_fixed_array(&column(villains, |v| v.melee));

    let advs = &file.adventurers;
    w.write_i16(advs.len() as i16);
    w.write_fixed_array(&column(advs, |a| a.room));
    w.write_sparse_array(&column(advs, |a| a.score));
    w.write_sparse_array(&column(advs, |a| a.vehicle));
    w.write_fixed_array(&column(advs, |a| a.object));
    w.write_fixed_array(&column(advs, |a| a.action));
    w.write_fixed_array(&column(advs, |a| a.strength));
    w.write_sparse_array(&column(advs, |a| a.flags));

    w.write_i16(file.message_base);
    w.write_i16(file.message_refs.len() as i16);
    w.write_fixed_array(&file.message_refs);

    w.write_bytes(&cipher::encrypt(&file.text, 0));
    w.into_bytes()
}

fn column<T, V>(items: &[T], f: impl Fn(&T) -> V) -> Vec<V> {
    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reader::FormatError;

    fn sample() -> RawDataFile {
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
                RawRoomRecord {
                    index: 1,
                    desc1: -1,
                    desc2: 0,
                    exit_pointer: 1,
                    action: None,
                    value: Some(0),
                    flags: 0x4000,
                },
                RawRoomRecord {
                    index: 2,
                    desc1: -3,
                    desc2: 2,
                    exit_pointer: 0,
                    action: Some(12),
                    value: None,
                    flags: 0,
                },
            ],
            travel: vec![1024, 2, 0, 0, 0, 0],
            objects: vec![RawObjectRecord {
                index: 1,
                desc1: -3,
                desc2: 1,
                original_desc: None,
                action: Some(3),
                flags1: 0x40,
                flags2: None,
                find_value: Some(0),
                treasure_value: None,
                size: 15,
                capacity: None,
                room: 1,
                adventurer: None,
                container: None,
                read_text: None,
            }],
            room2: vec![Room2Entry { object: 1, room: 2 }],
            clock_events: vec![ClockEvent {
                tick: 0,
                action: 4,
                enabled: true,
            }],
            villains: vec![Villain {
                object: 1,
                probability: Some(30),
                opponent: None,
                best_weapon: 0,
                melee: 1,
            }],
            adventurers: vec![Adventurer {
                room: 1,
                score: None,
                vehicle: None,
                object: 0,
                action: 0,
                strength: 0,
                flags: None,
            }],
            message_base: 0,
            message_refs: vec![-1, -3],
            text_offset: 0,
            text: b"Kitchen\0\0\0\0\0\0\0\0lamp\0".to_vec(),
        }
    }

    #[test]
    fn parse_inverts_encode() {
        let original = sample();
        let bytes = encode(&original);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.header, original.header);
        assert_eq!(parsed.rooms, original.rooms);
        assert_eq!(parsed.travel, original.travel);
        assert_eq!(parsed.objects, original.objects);
        assert_eq!(parsed.room2, original.room2);
        assert_eq!(parsed.clock_events, original.clock_events);
        assert_eq!(parsed.villains, original.villains);
        assert_eq!(parsed.adventurers, original.adventurers);
        assert_eq!(parsed.message_refs, original.message_refs);
        assert_eq!(parsed.text, original.text);
        assert_eq!(parsed.text_offset, bytes.len() - original.text.len());
    }

    #[test]
    fn locate_text_agrees_with_full_parse() {
        let bytes = encode(&sample());
        let parsed = parse(&bytes).unwrap();
        let located = locate_text(&bytes).unwrap();
        assert_eq!(located.text_offset, parsed.text_offset);
        assert_eq!(located.message_refs, parsed.message_refs);
        assert_eq!(located.header, parsed.header);
    }

    #[test]
    fn text_is_encrypted_on_disk() {
        let original = sample();
        let bytes = encode(&original);
        let tail = &bytes[bytes.len() - original.text.len()..];
        assert_ne!(tail, original.text.as_slice());
    }

    #[test]
    fn truncation_anywhere_before_text_is_fatal() {
        let bytes = encode(&sample());
        let header_only = &bytes[..12];
        assert!(matches!(
            parse(header_only),
            Err(FormatError::TruncatedBuffer { offset: 12, .. })
        ));
        assert!(parse(&bytes[..40]).is_err());
    }
}
