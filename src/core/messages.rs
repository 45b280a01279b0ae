//! Message assembly from 8-byte decrypted chunks and the message table.

use rustc_hash::FxHashMap;

use crate::schema::message::{offset_for_rtext, Message, TextRef, CHUNK_SIZE};
use crate::schema::report::DanglingReference;

/// Marks a spot where the runtime splices in a substitution string.
pub const SUBSTITUTION_MARKER: u8 = b'#';

/// Text assembled from consecutive chunks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assembled {
    pub text: String,
    pub chunks: Vec<usize>,
    pub has_substitutions: bool,
}

/// Assemble the null-terminated string that starts at `offset`.
///
/// Consumes whole chunks until one contains a NUL, keeping the bytes before
/// it. Running off the end of `text` ends the string there. A marker
/// anywhere in a consumed chunk sets `has_substitutions`, including after
/// the terminator.
pub fn assemble(text: &[u8], offset: usize) -> Assembled {
    let mut bytes = Vec::new();
    let mut chunks = Vec::new();
    let mut has_substitutions = false;
    let mut pos = offset;

    while pos < text.len() {
        let end = (pos + CHUNK_SIZE).min(text.len());
        let chunk = &text[pos..end];
        chunks.push(pos / CHUNK_SIZE + 1);

        let (kept, terminated) = match chunk.iter().position(|&b| b == 0) {
            Some(nul) => (&chunk[..nul], true),
            None => (chunk, false),
        };
        has_substitutions |= chunk.contains(&SUBSTITUTION_MARKER);
        bytes.extend_from_slice(kept);
        if terminated {
            break;
        }
        pos += CHUNK_SIZE;
    }

    Assembled {
        text: String::from_utf8_lossy(&bytes).into_owned(),
        chunks,
        has_substitutions,
    }
}

/// A reference resolved to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    /// Table position of the message, when the table lists it.
    pub message_index: Option<usize>,
    pub has_substitutions: bool,
}

/// Decrypted text plus the table of messages it holds.
pub struct MessageTable {
    text: Vec<u8>,
    messages: Vec<Message>,
    by_rtext: FxHashMap<i16, usize>,
}

impl MessageTable {
    /// Build the table from decrypted text and the file's rtext entries.
    ///
    /// Entries whose offset falls outside the text are kept with empty text.
    pub fn build(text: Vec<u8>, refs: &[i16]) -> Self {
        let mut messages = Vec::with_capacity(refs.len());
        let mut by_rtext = FxHashMap::default();

        for (i, &rtext) in refs.iter().enumerate() {
            let index = i + 1;
            let offset = offset_for_rtext(rtext);
            let assembled = match offset {
                Some(off) if off < text.len() => assemble(&text, off),
                _ => {
                    log::debug!("message {} has dangling rtext {}", index, rtext);
                    Assembled::default()
                }
            };
            by_rtext.entry(rtext).or_insert(index);
            messages.push(Message {
                index,
                rtext,
                offset,
                text: assembled.text,
                chunks: assembled.chunks,
                has_substitutions: assembled.has_substitutions,
            });
        }

        Self {
            text,
            messages,
            by_rtext,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message at 1-based table position.
    pub fn by_index(&self, index: usize) -> Option<&Message> {
        index.checked_sub(1).and_then(|i| self.messages.get(i))
    }

    /// Message whose table entry holds `rtext`.
    pub fn by_rtext(&self, rtext: i16) -> Option<&Message> {
        self.by_rtext.get(&rtext).and_then(|&i| self.by_index(i))
    }

    /// Resolve a signed description reference.
    ///
    /// `Ok(None)` means the record has no text. Offsets outside the text and
    /// table positions past the end are reported as dangling.
    pub fn resolve(&self, reference: i16) -> Result<Option<Resolved>, DanglingReference> {
        let dangling = |offset| DanglingReference {
            owner: String::new(),
            reference,
            offset,
        };
        match TextRef::decode(reference) {
            TextRef::None => Ok(None),
            TextRef::Table(index) => {
                let msg = self.by_index(index).ok_or_else(|| dangling(None))?;
                match msg.offset {
                    Some(off) if off < self.text.len() => Ok(Some(Resolved {
                        text: msg.text.clone(),
                        message_index: Some(index),
                        has_substitutions: msg.has_substitutions,
                    })),
                    other => Err(dangling(other)),
                }
            }
            TextRef::Offset(offset) => {
                if offset >= self.text.len() {
                    return Err(dangling(Some(offset)));
                }
                if let Some(msg) = self.by_rtext(reference) {
                    return Ok(Some(Resolved {
                        text: msg.text.clone(),
                        message_index: Some(msg.index),
                        has_substitutions: msg.has_substitutions,
                    }));
                }
                let assembled = assemble(&self.text, offset);
                Ok(Some(Resolved {
                    text: assembled.text,
                    message_index: None,
                    has_substitutions: assembled.has_substitutions,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(parts: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for p in parts {
            out.extend_from_slice(p);
            while out.len() % CHUNK_SIZE != 0 {
                out.push(0);
            }
        }
        out
    }

    #[test]
    fn short_message_in_one_chunk() {
        let text = padded(&[b"Hello\0"]);
        let a = assemble(&text, 0);
        assert_eq!(a.text, "Hello");
        assert_eq!(a.chunks, vec![1]);
        assert!(!a.has_substitutions);
    }

    #[test]
    fn message_spanning_chunks() {
        let text = padded(&[b"x\0", b"West of House\0"]);
        let a = assemble(&text, 8);
        assert_eq!(a.text, "West of House");
        assert_eq!(a.chunks, vec![2, 3]);
    }

    #[test]
    fn exact_chunk_multiple_needs_terminator_chunk() {
        let text = padded(&[b"ABCDEFGH", b"\0"]);
        let a = assemble(&text, 0);
        assert_eq!(a.text, "ABCDEFGH");
        assert_eq!(a.chunks, vec![1, 2]);
    }

    #[test]
    fn unterminated_message_stops_at_buffer_end() {
        let a = assemble(b"ABCDEFGHIJ", 0);
        assert_eq!(a.text, "ABCDEFGHIJ");
        assert_eq!(a.chunks, vec![1, 2]);
    }

    #[test]
    fn substitution_marker_detected() {
        let text = padded(&[b"WELCOME TO ZORK!#\0"]);
        let a = assemble(&text, 0);
        assert!(a.has_substitutions);
        assert_eq!(a.chunks, vec![1, 2, 3]);
    }

    #[test]
    fn marker_after_terminator_in_consumed_chunk_counts() {
        let a = assemble(b"ok\0#####", 0);
        assert_eq!(a.text, "ok");
        assert_eq!(a.chunks, vec![1]);
        assert!(a.has_substitutions);
    }

    #[test]
    fn marker_in_unconsumed_chunk_ignored() {
        let a = assemble(b"ok\0\0\0\0\0\0#######", 0);
        assert_eq!(a.chunks, vec![1]);
        assert!(!a.has_substitutions);
    }

    #[test]
    fn table_and_rtext_lookups_agree() {
        let text = padded(&[b"first\0", b"second message\0"]);
        let table = MessageTable::build(text, &[-1, -2]);
        assert_eq!(table.len(), 2);
        let by_pos = table.resolve(2).unwrap().unwrap();
        let by_ref = table.resolve(-2).unwrap().unwrap();
        assert_eq!(by_pos, by_ref);
        assert_eq!(by_pos.text, "second message");
        assert_eq!(by_pos.message_index, Some(2));
        assert_eq!(table.by_rtext(-1).map(|m| m.index), Some(1));
    }

    #[test]
    fn offset_outside_table_still_assembles() {
        let text = padded(&[b"first\0", b"loose\0"]);
        let table = MessageTable::build(text, &[-1]);
        let r = table.resolve(-2).unwrap().unwrap();
        assert_eq!(r.text, "loose");
        assert_eq!(r.message_index, None);
    }

    #[test]
    fn dangling_references() {
        let text = padded(&[b"only\0"]);
        let table = MessageTable::build(text, &[-1, -50]);
        assert_eq!(table.by_index(2).unwrap().text, "");
        assert!(table.resolve(-50).is_err());
        assert!(table.resolve(2).is_err());
        assert!(table.resolve(9).is_err());
        assert_eq!(table.resolve(0).unwrap(), None);
    }
}
