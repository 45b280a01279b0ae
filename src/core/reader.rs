//! Forward-only cursor over the big-endian data file, plus the matching writer.
//!
//! The file carries no field lengths or tags: every value's meaning depends on
//! how many bytes the reads before it consumed. The cursor therefore has no
//! way to seek backwards.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("truncated buffer at offset {offset:#x} (need {need} bytes, have {have})")]
    TruncatedBuffer {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("negative count {count} for {section} at offset {offset:#x}")]
    NegativeCount {
        section: &'static str,
        count: i16,
        offset: usize,
    },
}

pub type Result<T> = std::result::Result<T, FormatError>;

/// Sparse arrays shorter than this use a 1-byte index and sentinel 255.
pub const WIDE_INDEX_THRESHOLD: usize = 255;

const NARROW_SENTINEL: u8 = 255;
const WIDE_SENTINEL: i16 = -1;

/// Shape of one parallel array inside a counted section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Fixed,
    Sparse,
    Flags,
}

/// Read cursor over a byte slice. All multi-byte reads are big-endian.
#[derive(Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current absolute byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Everything not yet consumed. Does not advance.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        let v = i16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    /// Read a section count. Negative counts are structural corruption.
    pub fn read_count(&mut self, section: &'static str) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i16()?;
        if count < 0 {
            return Err(FormatError::NegativeCount {
                section,
                count,
                offset,
            });
        }
        Ok(count as usize)
    }

    pub fn read_fixed_array(&mut self, count: usize) -> Result<Vec<i16>> {
        self.ensure(count * 2)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_i16()?);
        }
        Ok(values)
    }

    /// Read an index/value stream into an array of `max_count` slots.
    ///
    /// Indices are 0-based. Below [`WIDE_INDEX_THRESHOLD`] each index is one
    /// byte and the stream ends at 255; otherwise indices are 16-bit and the
    /// stream ends at -1. Out-of-range indices still consume their value but
    /// are dropped.
    pub fn read_sparse_array(&mut self, max_count: usize) -> Result<Vec<Option<i16>>> {
        let mut values = vec![None; max_count];
        loop {
            let index = if max_count < WIDE_INDEX_THRESHOLD {
                let i = self.read_u8()?;
                if i == NARROW_SENTINEL {
                    break;
                }
                i as i32
            } else {
                let i = self.read_i16()?;
                if i == WIDE_SENTINEL {
                    break;
                }
                i as i32
            };
            let value = self.read_i16()?;
            match usize::try_from(index) {
                Ok(slot) if slot < max_count => values[slot] = Some(value),
                _ => log::debug!(
                    "dropping sparse index {} (max {}) before offset {:#x}",
                    index,
                    max_count,
                    self.pos
                ),
            }
        }
        Ok(values)
    }

    /// One byte per entry, nonzero meaning set.
    pub fn read_flag_bytes(&mut self, count: usize) -> Result<Vec<bool>> {
        self.ensure(count)?;
        let flags = self.data[self.pos..self.pos + count]
            .iter()
            .map(|&b| b != 0)
            .collect();
        self.pos += count;
        Ok(flags)
    }

    pub fn skip_fixed(&mut self, count: usize) -> Result<()> {
        self.ensure(count * 2)?;
        self.pos += count * 2;
        Ok(())
    }

    pub fn skip_sparse(&mut self, max_count: usize) -> Result<()> {
        self.read_sparse_array(max_count).map(|_| ())
    }

    pub fn skip_flags(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        self.pos += count;
        Ok(())
    }

    /// Read a section count, then discard one array of each `layout` kind.
    /// Returns the count that was read.
    pub fn skip_section(&mut self, section: &'static str, layout: &[ArrayKind]) -> Result<usize> {
        let count = self.read_count(section)?;
        for kind in layout {
            match kind {
                ArrayKind::Fixed => self.skip_fixed(count)?,
                ArrayKind::Sparse => self.skip_sparse(count)?,
                ArrayKind::Flags => self.skip_flags(count)?,
            }
        }
        Ok(count)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos + n > self.data.len() {
            return Err(FormatError::TruncatedBuffer {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Builds a buffer in the same encoding the [`Reader`] consumes.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_fixed_array(&mut self, values: &[i16]) {
        for &v in values {
            self.write_i16(v);
        }
    }

    /// Encode the present slots of `values`; the array length picks the encoding.
    pub fn write_sparse_array(&mut self, values: &[Option<i16>]) {
        let entries: Vec<(i32, i16)> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as i32, v)))
            .collect();
        self.write_sparse_entries(values.len(), &entries);
    }

    /// Encode raw `(index, value)` pairs, including indices a reader would drop.
    pub fn write_sparse_entries(&mut self, max_count: usize, entries: &[(i32, i16)]) {
        let narrow = max_count < WIDE_INDEX_THRESHOLD;
        for &(index, value) in entries {
            if narrow {
                self.write_u8(index as u8);
            } else {
                self.write_i16(index as i16);
            }
            self.write_i16(value);
        }
        if narrow {
            self.write_u8(NARROW_SENTINEL);
        } else {
            self.write_i16(WIDE_SENTINEL);
        }
    }

    pub fn write_flag_bytes(&mut self, flags: &[bool]) {
        self.buf.extend(flags.iter().map(|&f| u8::from(f)));
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_signed() {
        let mut r = Reader::new(&[0x01, 0x02, 0xff, 0xfe]);
        assert_eq!(r.read_i16().unwrap(), 0x0102);
        assert_eq!(r.read_i16().unwrap(), -2);
        assert!(r.is_empty());
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut r = Reader::new(&[0x00, 0x01, 0x02]);
        r.read_i16().unwrap();
        match r.read_i16() {
            Err(FormatError::TruncatedBuffer { offset, need, have }) => {
                assert_eq!(offset, 2);
                assert_eq!(need, 2);
                assert_eq!(have, 1);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn narrow_sparse_array() {
        let mut w = Writer::new();
        w.write_sparse_entries(5, &[(0, 7), (3, 0), (9, 42)]);
        w.write_i16(0x7777);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let values = r.read_sparse_array(5).unwrap();
        assert_eq!(values, vec![Some(7), None, None, Some(0), None]);
        // cursor lands right after the sentinel
        assert_eq!(r.read_i16().unwrap(), 0x7777);
    }

    #[test]
    fn wide_sparse_array_drops_negative_and_large_indices() {
        let mut w = Writer::new();
        w.write_sparse_entries(300, &[(-5, 1), (299, 2), (300, 3), (10, -4)]);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let values = r.read_sparse_array(300).unwrap();
        assert_eq!(values.len(), 300);
        assert_eq!(values[299], Some(2));
        assert_eq!(values[10], Some(-4));
        assert_eq!(values.iter().filter(|v| v.is_some()).count(), 2);
        assert!(r.is_empty());
    }

    #[test]
    fn sparse_array_without_sentinel_is_fatal() {
        let bytes = [0x01, 0x00, 0x05];
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            r.read_sparse_array(4),
            Err(FormatError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn flag_bytes_nonzero_is_true() {
        let mut r = Reader::new(&[0, 1, 2, 0]);
        assert_eq!(
            r.read_flag_bytes(4).unwrap(),
            vec![false, true, true, false]
        );
    }

    #[test]
    fn skip_section_preserves_position() {
        let mut w = Writer::new();
        w.write_i16(3);
        w.write_fixed_array(&[1, 2, 3]);
        w.write_sparse_array(&[None, Some(9), None]);
        w.write_flag_bytes(&[true, false, true]);
        let after = w.position();
        w.write_i16(-123);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let count = r
            .skip_section(
                "clock",
                &[ArrayKind::Fixed, ArrayKind::Sparse, ArrayKind::Flags],
            )
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(r.position(), after);
        assert_eq!(r.read_i16().unwrap(), -123);
    }

    #[test]
    fn negative_count_is_rejected() {
        let mut r = Reader::new(&[0xff, 0xff]);
        assert!(matches!(
            r.read_count("rooms"),
            Err(FormatError::NegativeCount { count: -1, .. })
        ));
    }
}
