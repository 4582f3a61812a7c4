pub mod encoding;

use std::fmt;

use crate::error::{Error, Result};
use crate::types::{End, Value};
use encoding::{
    EntryHeader, HEADER_SIZE, PrevLen, Payload, END, decode_int, decode_prevlen, parse_canonical_i64,
    prevlen_size_for, try_decode_prevlen,
};

pub use encoding::{Encoding, try_numeric_encode};

const TOTAL_BYTES_AT: usize = 0;
const TAIL_OFFSET_AT: usize = 4;
const COUNT_AT: usize = 8;

/// Count value meaning "too many to track, walk the buffer".
const COUNT_SATURATED: u16 = u16::MAX;

/// A memory-efficient list stored in one contiguous buffer.
///
/// Layout:
/// ```text
/// ┌────────────────┬────────────────┬───────────┬─────────┬─────┬─────────┬──────┐
/// │ total_bytes 4B │ tail_offset 4B │ count 2B  │ entry 0 │ ... │ entry N │ 0xFF │
/// └────────────────┴────────────────┴───────────┴─────────┴─────┴─────────┴──────┘
/// ```
///
/// Entries are variable length, so there is no random access: `index` walks
/// from whichever end is named. Each entry records the size of the entry
/// before it, which is what makes walking backwards possible.
///
/// Invariants kept after every mutation:
///   - the terminator is the final byte and `total_bytes == buf.len()`
///   - `tail_offset` points at the last entry (or the terminator when empty)
///   - every entry's prevlen equals the encoded size of its predecessor
#[derive(Clone, PartialEq, Eq)]
pub struct CompactList {
    buf: Vec<u8>,
}

/// Position of one entry inside a [`CompactList`].
///
/// A plain byte offset: it stays meaningful when the buffer is resized or
/// moved, but any mutation at or before it may shift the entry it names.
/// Mutating methods hand back fresh cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(usize);

impl Cursor {
    /// Byte offset of the entry from the start of the buffer.
    pub fn offset(self) -> usize {
        self.0
    }
}

/// A decoded entry payload, borrowed from the buffer where possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryValue<'a> {
    Str(&'a [u8]),
    Int(i64),
}

impl EntryValue<'_> {
    /// The value as bytes. Integers come back in canonical decimal form,
    /// which is exactly the text they were stored from.
    pub fn to_vec(&self) -> Value {
        match *self {
            EntryValue::Str(s) => s.to_vec(),
            EntryValue::Int(v) => v.to_string().into_bytes(),
        }
    }
}

impl Default for CompactList {
    fn default() -> Self {
        Self::new()
    }
}

impl CompactList {
    /// Create an empty list: header + terminator, 11 bytes.
    pub fn new() -> Self {
        let mut buf = vec![0u8; HEADER_SIZE + 1];
        buf[HEADER_SIZE] = END;
        let mut list = CompactList { buf };
        list.set_tail_offset(HEADER_SIZE);
        list.sync_total_bytes();
        list
    }

    /// Adopt a raw buffer after checking every structural invariant.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        let list = CompactList { buf };
        list.check()?;
        Ok(list)
    }

    /// The raw encoded buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Total encoded size in bytes.
    pub fn blob_len(&self) -> usize {
        self.buf.len()
    }

    /// Number of entries. O(1) unless the header count has saturated.
    pub fn len(&self) -> usize {
        let count = self.count();
        if count < COUNT_SATURATED {
            return count as usize;
        }
        let mut n = 0;
        let mut cur = self.first();
        while let Some(c) = cur {
            n += 1;
            cur = self.next(c);
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.buf[HEADER_SIZE] == END
    }

    // --- header fields -------------------------------------------------

    fn read_u32(&self, at: usize) -> usize {
        u32::from_le_bytes([self.buf[at], self.buf[at + 1], self.buf[at + 2], self.buf[at + 3]])
            as usize
    }

    fn write_u32(&mut self, at: usize, v: usize) {
        self.buf[at..at + 4].copy_from_slice(&(v as u32).to_le_bytes());
    }

    fn tail_offset(&self) -> usize {
        self.read_u32(TAIL_OFFSET_AT)
    }

    fn set_tail_offset(&mut self, offset: usize) {
        self.write_u32(TAIL_OFFSET_AT, offset);
    }

    fn sync_total_bytes(&mut self) {
        let len = self.buf.len();
        self.write_u32(TOTAL_BYTES_AT, len);
    }

    fn count(&self) -> u16 {
        u16::from_le_bytes([self.buf[COUNT_AT], self.buf[COUNT_AT + 1]])
    }

    fn set_count(&mut self, count: u16) {
        self.buf[COUNT_AT..COUNT_AT + 2].copy_from_slice(&count.to_le_bytes());
    }

    /// Adjust the stored count. Once saturated it stays saturated; `len`
    /// falls back to walking the buffer.
    fn add_count(&mut self, delta: isize) {
        let count = self.count();
        if count == COUNT_SATURATED {
            return;
        }
        let next = (count as isize + delta).clamp(0, COUNT_SATURATED as isize);
        self.set_count(next as u16);
    }

    fn end_offset(&self) -> usize {
        self.buf.len() - 1
    }

    fn entry_size(&self, offset: usize) -> usize {
        EntryHeader::decode(&self.buf, offset).total_size()
    }

    // --- navigation ----------------------------------------------------

    pub fn first(&self) -> Option<Cursor> {
        if self.is_empty() { None } else { Some(Cursor(HEADER_SIZE)) }
    }

    pub fn last(&self) -> Option<Cursor> {
        if self.is_empty() { None } else { Some(Cursor(self.tail_offset())) }
    }

    /// Entry after `c`, or `None` at the tail.
    pub fn next(&self, c: Cursor) -> Option<Cursor> {
        let next = c.0 + self.entry_size(c.0);
        if self.buf[next] == END { None } else { Some(Cursor(next)) }
    }

    /// Entry before `c`, or `None` at the head.
    pub fn prev(&self, c: Cursor) -> Option<Cursor> {
        if c.0 == HEADER_SIZE {
            return None;
        }
        let (_, prevlen) = decode_prevlen(&self.buf, c.0);
        Some(Cursor(c.0 - prevlen))
    }

    /// Cursor to the i-th entry; negative indexes count from the tail
    /// (`-1` is the last entry). O(n).
    pub fn index(&self, i: isize) -> Option<Cursor> {
        if i < 0 {
            let mut steps = -(i + 1);
            let mut c = self.last()?;
            while steps > 0 {
                c = self.prev(c)?;
                steps -= 1;
            }
            Some(c)
        } else {
            let mut steps = i;
            let mut c = self.first()?;
            while steps > 0 {
                c = self.next(c)?;
                steps -= 1;
            }
            Some(c)
        }
    }

    /// Decode the payload at `c` without copying strings.
    pub fn get(&self, c: Cursor) -> EntryValue<'_> {
        let h = EntryHeader::decode(&self.buf, c.0);
        let p = c.0 + h.prevlen_size;
        if h.encoding.is_int() {
            EntryValue::Int(decode_int(&self.buf, p, h.encoding))
        } else {
            let start = c.0 + h.header_size();
            EntryValue::Str(&self.buf[start..start + h.len])
        }
    }

    /// Encoding the entry at `c` was stored with.
    pub fn encoding_at(&self, c: Cursor) -> Encoding {
        EntryHeader::decode(&self.buf, c.0).encoding
    }

    /// Whether the entry at `c` equals `value`.
    ///
    /// Integer entries only match candidates that are themselves canonical
    /// integers; the numbers are compared, not the encodings.
    pub fn compare(&self, c: Cursor, value: &[u8]) -> bool {
        match self.get(c) {
            EntryValue::Str(s) => s == value,
            EntryValue::Int(v) => parse_canonical_i64(value) == Some(v),
        }
    }

    /// First entry from `start` onwards equal to `value`, comparing only
    /// every `skip + 1`-th entry.
    pub fn find(&self, start: Cursor, value: &[u8], skip: usize) -> Option<Cursor> {
        // Parsed at most once for the whole scan.
        let mut numeric: Option<Option<i64>> = None;
        let mut skipped = 0;
        let mut cur = Some(start);
        while let Some(c) = cur {
            if skipped == 0 {
                let hit = match self.get(c) {
                    EntryValue::Str(s) => s == value,
                    EntryValue::Int(v) => {
                        *numeric.get_or_insert_with(|| parse_canonical_i64(value)) == Some(v)
                    }
                };
                if hit {
                    return Some(c);
                }
                skipped = skip;
            } else {
                skipped -= 1;
            }
            cur = self.next(c);
        }
        None
    }

    /// Forward iterator over decoded payloads.
    pub fn iter(&self) -> Iter<'_> {
        Iter { list: self, cur: self.first() }
    }

    // --- mutation ------------------------------------------------------

    /// Add `value` at the head or tail.
    pub fn push(&mut self, value: &[u8], end: End) {
        let at = match end {
            End::Head => HEADER_SIZE,
            End::Tail => self.end_offset(),
        };
        self.insert_at(at, value);
    }

    /// Insert `value` so it takes the place of the entry at `c`, which moves
    /// one position back. Returns the new entry's cursor.
    pub fn insert_before(&mut self, c: Cursor, value: &[u8]) -> Cursor {
        self.insert_at(c.0, value);
        c
    }

    /// Insert `value` right after the entry at `c`. Returns the new entry's cursor.
    pub fn insert_after(&mut self, c: Cursor, value: &[u8]) -> Cursor {
        let at = c.0 + self.entry_size(c.0);
        self.insert_at(at, value);
        Cursor(at)
    }

    /// Remove the entry at `c`. Returns the cursor of the entry that
    /// followed it, or `None` if it was the tail.
    pub fn delete(&mut self, c: Cursor) -> Option<Cursor> {
        self.delete_at(c.0, 1);
        if self.buf[c.0] == END { None } else { Some(c) }
    }

    /// Remove up to `count` consecutive entries starting at `c`.
    pub fn delete_count(&mut self, c: Cursor, count: usize) -> usize {
        self.delete_at(c.0, count)
    }

    /// Remove up to `count` consecutive entries starting at `index`.
    /// Returns how many were removed.
    pub fn delete_range(&mut self, index: isize, count: usize) -> usize {
        match self.index(index) {
            Some(c) => self.delete_count(c, count),
            None => 0,
        }
    }

    /// Overwrite the entry at `c` with `value`.
    pub fn replace(&mut self, c: Cursor, value: &[u8]) -> Cursor {
        self.delete_at(c.0, 1);
        self.insert_at(c.0, value);
        c
    }

    /// Insert a new entry at byte offset `p` (an entry start or the terminator).
    ///
    /// 1. Encode the entry with a prevlen describing whatever precedes `p`.
    /// 2. Re-encode the follower's prevlen to describe the new entry. It may
    ///    need to grow from 1 to 5 bytes; it is never shrunk, a 5-byte field
    ///    that only needs one byte is rewritten in 5-byte form.
    /// 3. Splice both into the buffer in one move.
    /// 4. If the follower grew, its own size changed: cascade.
    fn insert_at(&mut self, p: usize, value: &[u8]) {
        let at_end = self.buf[p] == END;
        let prevlen = if !at_end {
            decode_prevlen(&self.buf, p).1
        } else {
            let tail = self.tail_offset();
            if self.buf[tail] == END { 0 } else { self.entry_size(tail) }
        };

        let payload = Payload::from_bytes(value);
        let own_prevlen = PrevLen::encode(prevlen, false);
        let reqlen = own_prevlen.size() + payload.encoded_len();

        let mut bytes = Vec::with_capacity(reqlen + 5);
        bytes.extend_from_slice(own_prevlen.as_slice());
        payload.write_to(&mut bytes);
        debug_assert_eq!(bytes.len(), reqlen);

        let old_tail = self.tail_offset();
        let (replace_to, nextdiff) = if at_end {
            (p, 0)
        } else {
            let (old_size, _) = decode_prevlen(&self.buf, p);
            let force_large = old_size > prevlen_size_for(reqlen);
            let follower_prevlen = PrevLen::encode(reqlen, force_large);
            bytes.extend_from_slice(follower_prevlen.as_slice());
            (p + old_size, follower_prevlen.size() - old_size)
        };

        self.buf.splice(p..replace_to, bytes);

        let new_tail = if at_end {
            p
        } else if old_tail == p {
            // The follower was the tail; it now starts right after us.
            p + reqlen
        } else {
            old_tail + reqlen + nextdiff
        };
        self.set_tail_offset(new_tail);
        self.add_count(1);
        self.sync_total_bytes();

        if nextdiff != 0 {
            self.cascade_update(p + reqlen);
        }
    }

    /// Remove up to `num` entries starting at offset `p`. Returns how many went.
    fn delete_at(&mut self, p: usize, num: usize) -> usize {
        let (_, first_prevlen) = decode_prevlen(&self.buf, p);
        let mut q = p;
        let mut deleted = 0;
        while deleted < num && self.buf[q] != END {
            q += self.entry_size(q);
            deleted += 1;
        }
        if deleted == 0 {
            return 0;
        }

        let totlen = q - p;
        let old_tail = self.tail_offset();
        let mut nextdiff = 0;
        if self.buf[q] != END {
            // The follower now sits after the first deleted entry's predecessor.
            let (old_size, _) = decode_prevlen(&self.buf, q);
            let force_large = old_size > prevlen_size_for(first_prevlen);
            let follower_prevlen = PrevLen::encode(first_prevlen, force_large);
            nextdiff = follower_prevlen.size() - old_size;
            self.buf.splice(p..q + old_size, follower_prevlen.as_slice().iter().copied());
            let new_tail = if old_tail == q { p } else { old_tail - totlen + nextdiff };
            self.set_tail_offset(new_tail);
        } else {
            self.buf.drain(p..q);
            self.set_tail_offset(p - first_prevlen);
        }
        self.add_count(-(deleted as isize));
        self.sync_total_bytes();

        if nextdiff != 0 {
            self.cascade_update(p);
        }
        deleted
    }

    /// Propagate a size change of the entry at `p` forward.
    ///
    /// Each follower's prevlen is rewritten to the new predecessor size. If
    /// the follower needs a wider field it grows, which changes its own size,
    /// and the walk continues. It stops at the first follower that already
    /// has enough width; a field wider than needed keeps its 5-byte form.
    ///
    /// Worst case O(n) grown entries each costing an O(n) move, only when
    /// consecutive entries all sit just under the 254-byte boundary.
    fn cascade_update(&mut self, mut p: usize) {
        while self.buf[p] != END {
            let rawlen = self.entry_size(p);
            let next = p + rawlen;
            if self.buf[next] == END {
                break;
            }
            let (next_size, next_prevlen) = decode_prevlen(&self.buf, next);
            if next_prevlen == rawlen {
                break;
            }

            let needed = prevlen_size_for(rawlen);
            if next_size < needed {
                let grown = PrevLen::encode(rawlen, false);
                let extra = grown.size() - next_size;
                let tail = self.tail_offset();
                self.buf.splice(next..next + next_size, grown.as_slice().iter().copied());
                if tail != next {
                    self.set_tail_offset(tail + extra);
                }
                self.sync_total_bytes();
                p = next;
            } else {
                let same_width = PrevLen::encode(rawlen, next_size > needed);
                self.buf[next..next + same_width.size()].copy_from_slice(same_width.as_slice());
                break;
            }
        }
    }

    // --- integrity -----------------------------------------------------

    /// Walk the whole buffer and check every invariant.
    pub fn validate(&self) -> bool {
        self.check().is_ok()
    }

    fn check(&self) -> Result<()> {
        let corrupt = |msg: String| Err(Error::Corruption(msg));
        if self.buf.len() < HEADER_SIZE + 1 {
            return corrupt("buffer shorter than header".into());
        }
        if self.read_u32(TOTAL_BYTES_AT) != self.buf.len() {
            return corrupt(format!(
                "total_bytes {} != buffer length {}",
                self.read_u32(TOTAL_BYTES_AT),
                self.buf.len()
            ));
        }
        if self.buf[self.buf.len() - 1] != END {
            return corrupt("missing terminator".into());
        }

        let mut p = HEADER_SIZE;
        let mut prev_size = 0;
        let mut last = HEADER_SIZE;
        let mut n = 0usize;
        while self.buf[p] != END {
            let Some(h) = EntryHeader::try_decode(&self.buf, p) else {
                return corrupt(format!("undecodable entry at offset {p}"));
            };
            if h.prevlen != prev_size {
                return corrupt(format!(
                    "prevlen {} at offset {p}, predecessor is {prev_size} bytes",
                    h.prevlen
                ));
            }
            if p + h.total_size() >= self.buf.len() {
                return corrupt(format!("entry at offset {p} runs past the terminator"));
            }
            prev_size = h.total_size();
            last = p;
            p += h.total_size();
            n += 1;
        }
        if p != self.buf.len() - 1 {
            return corrupt(format!("terminator at offset {p} is not the last byte"));
        }
        if self.tail_offset() != last {
            return corrupt(format!("tail_offset {} != last entry {last}", self.tail_offset()));
        }
        let count = self.count();
        if count != COUNT_SATURATED && count as usize != n {
            return corrupt(format!("count {count} != {n} entries"));
        }
        Ok(())
    }

    // Used by the prevlen invariant tests to inspect raw headers.
    #[doc(hidden)]
    pub fn prevlen_at(&self, c: Cursor) -> (usize, usize) {
        try_decode_prevlen(&self.buf, c.0).unwrap_or((0, 0))
    }

    #[doc(hidden)]
    pub fn entry_len_at(&self, c: Cursor) -> usize {
        self.entry_size(c.0)
    }
}

impl fmt::Debug for CompactList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompactList")
            .field("bytes", &self.buf.len())
            .field("len", &self.len())
            .field("tail", &self.tail_offset())
            .finish()
    }
}

/// Forward iterator over a [`CompactList`].
pub struct Iter<'a> {
    list: &'a CompactList,
    cur: Option<Cursor>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = EntryValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.cur?;
        self.cur = self.list.next(c);
        Some(self.list.get(c))
    }
}
