use serde::{Deserialize, Serialize};

/// Size of one decrypted text unit.
pub const CHUNK_SIZE: usize = 8;

/// One entry of the message table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// 1-based position in the message table.
    pub index: usize,
    /// Signed reference as stored in the file.
    pub rtext: i16,
    /// Byte offset into the decrypted text; `None` when `rtext` cannot
    /// encode an offset.
    pub offset: Option<usize>,
    pub text: String,
    /// 1-based chunk numbers consumed while assembling, ascending.
    pub chunks: Vec<usize>,
    pub has_substitutions: bool,
}

/// How a signed description reference addresses a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRef {
    None,
    /// 1-based message table position.
    Table(usize),
    /// Byte offset into the decrypted text.
    Offset(usize),
}

impl TextRef {
    pub fn decode(reference: i16) -> Self {
        match reference {
            0 => TextRef::None,
            r if r > 0 => TextRef::Table(r as usize),
            r => TextRef::Offset(offset_for_rtext(r).unwrap_or_default()),
        }
    }
}

/// `rtext = -(offset / 8 + 1)`; `None` for non-negative values.
pub fn offset_for_rtext(rtext: i16) -> Option<usize> {
    if rtext < 0 {
        Some((-(rtext as i32) - 1) as usize * CHUNK_SIZE)
    } else {
        None
    }
}

pub fn rtext_for_offset(offset: usize) -> i16 {
    -((offset / CHUNK_SIZE) as i32 + 1) as i16
}
