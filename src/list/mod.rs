pub mod iter;

use tracing::debug;

use crate::compact::CompactList;
use crate::config::ListLimits;
use crate::linked::LinkedList;
use crate::types::{End, Position, Value};

pub use iter::{ListEntry, ListIter};

/// Which representation a [`ListValue`] currently uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEncoding {
    Compact,
    Linked,
}

/// A list stored under one key.
///
/// Starts out compact and moves to the linked representation the first
/// time it grows past [`ListLimits`]. The move is one way: nothing converts
/// a linked list back.
///
/// ```text
///   Compact ──(value too long | too many entries)──► Linked
/// ```
#[derive(Debug, Clone)]
pub enum ListValue {
    Compact(CompactList),
    Linked(LinkedList),
}

impl Default for ListValue {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve an inclusive `[start, end]` pair (negative = from the tail)
/// against a list of `len` elements. `None` when the range is empty.
pub(crate) fn normalize_range(start: isize, end: isize, len: usize) -> Option<(usize, usize)> {
    let len = len as isize;
    let mut start = if start < 0 { len + start } else { start };
    let mut end = if end < 0 { len + end } else { end };
    if start < 0 {
        start = 0;
    }
    if start > end || start >= len {
        return None;
    }
    if end >= len {
        end = len - 1;
    }
    Some((start as usize, end as usize))
}

impl ListValue {
    pub fn new() -> Self {
        ListValue::Compact(CompactList::new())
    }

    pub fn encoding(&self) -> ListEncoding {
        match self {
            ListValue::Compact(_) => ListEncoding::Compact,
            ListValue::Linked(_) => ListEncoding::Linked,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ListValue::Compact(c) => c.len(),
            ListValue::Linked(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ListValue::Compact(c) => c.is_empty(),
            ListValue::Linked(l) => l.is_empty(),
        }
    }

    /// Rebuild as a linked list, in order. Returns false if already linked.
    pub fn convert_to_linked(&mut self) -> bool {
        let ListValue::Compact(compact) = self else {
            return false;
        };
        let linked: LinkedList = compact.iter().map(|v| v.to_vec()).collect();
        debug!(
            entries = linked.len(),
            bytes = compact.blob_len(),
            "list converted to linked encoding"
        );
        *self = ListValue::Linked(linked);
        true
    }

    /// Convert ahead of storing `value` if it is too long for the compact form.
    fn convert_for_value(&mut self, value: &[u8], limits: &ListLimits) {
        if matches!(self, ListValue::Compact(_)) && value.len() > limits.max_compact_value {
            self.convert_to_linked();
        }
    }

    /// Convert after growth if the compact form holds too many entries.
    fn convert_for_len(&mut self, limits: &ListLimits) {
        let too_many =
            matches!(self, ListValue::Compact(c) if c.len() > limits.max_compact_entries);
        if too_many {
            self.convert_to_linked();
        }
    }

    pub fn push(&mut self, value: &[u8], end: End, limits: &ListLimits) {
        self.convert_for_value(value, limits);
        match self {
            ListValue::Compact(c) => c.push(value, end),
            ListValue::Linked(l) => {
                l.push(value.to_vec(), end);
            }
        }
        self.convert_for_len(limits);
    }

    pub fn pop(&mut self, end: End) -> Option<Value> {
        match self {
            ListValue::Compact(c) => {
                let cursor = match end {
                    End::Head => c.first()?,
                    End::Tail => c.last()?,
                };
                let value = c.get(cursor).to_vec();
                c.delete(cursor);
                Some(value)
            }
            ListValue::Linked(l) => l.pop(end),
        }
    }

    /// Copy of the element at `i` (negative = from the tail).
    pub fn index(&self, i: isize) -> Option<Value> {
        match self {
            ListValue::Compact(c) => c.index(i).map(|cur| c.get(cur).to_vec()),
            ListValue::Linked(l) => l.index(i).map(|id| l.get(id).to_vec()),
        }
    }

    /// Overwrite the element at `i`. Returns false, changing nothing, when
    /// `i` is out of range.
    pub fn set(&mut self, i: isize, value: &[u8], limits: &ListLimits) -> bool {
        let in_range = match self {
            ListValue::Compact(c) => c.index(i).is_some(),
            ListValue::Linked(l) => l.index(i).is_some(),
        };
        if !in_range {
            return false;
        }
        self.convert_for_value(value, limits);
        match self {
            ListValue::Compact(c) => {
                if let Some(cur) = c.index(i) {
                    c.replace(cur, value);
                }
            }
            ListValue::Linked(l) => {
                if let Some(id) = l.index(i) {
                    l.set(id, value.to_vec());
                }
            }
        }
        true
    }

    /// Position of the first element equal to `value`, scanning from the head.
    pub fn position(&mut self, value: &[u8]) -> Option<usize> {
        let mut it = self.iter(End::Head);
        let mut idx = 0;
        while let Some(entry) = it.next() {
            if it.equals(&entry, value) {
                return Some(idx);
            }
            idx += 1;
        }
        None
    }

    /// Insert `value` before or after the first element equal to `pivot`.
    /// Returns false, changing nothing, when the pivot is absent.
    pub fn insert_at_pivot(
        &mut self,
        pivot: &[u8],
        value: &[u8],
        at: Position,
        limits: &ListLimits,
    ) -> bool {
        let Some(idx) = self.position(pivot) else {
            return false;
        };
        self.convert_for_value(value, limits);
        {
            let mut it = ListIter::starting_at(self, idx as isize, End::Head);
            if let Some(entry) = it.next() {
                it.insert(entry, value, at);
            }
        }
        self.convert_for_len(limits);
        true
    }

    /// Elements in the inclusive range `[start, end]`. Out of range or
    /// inverted bounds give an empty vector.
    pub fn range(&self, start: isize, end: isize) -> Vec<Value> {
        let len = self.len();
        let Some((start, end)) = normalize_range(start, end, len) else {
            return Vec::new();
        };
        let count = end - start + 1;
        let mut out = Vec::with_capacity(count);
        match self {
            ListValue::Compact(c) => {
                let mut cur = c.index(start as isize);
                while let Some(p) = cur {
                    if out.len() == count {
                        break;
                    }
                    out.push(c.get(p).to_vec());
                    cur = c.next(p);
                }
            }
            ListValue::Linked(l) => {
                // Walk from whichever end is closer to `start`.
                let first = if start > len / 2 {
                    l.index(start as isize - len as isize)
                } else {
                    l.index(start as isize)
                };
                let mut cur = first;
                while let Some(id) = cur {
                    if out.len() == count {
                        break;
                    }
                    out.push(l.get(id).to_vec());
                    cur = l.next(id);
                }
            }
        }
        out
    }

    /// Keep only the inclusive range `[start, end]`. An empty range empties
    /// the list; the owner is expected to drop it then.
    pub fn trim(&mut self, start: isize, end: isize) {
        let len = self.len();
        let (ltrim, rtrim) = match normalize_range(start, end, len) {
            Some((start, end)) => (start, len - end - 1),
            None => (len, 0),
        };
        match self {
            ListValue::Compact(c) => {
                c.delete_range(0, ltrim);
                if rtrim > 0 {
                    c.delete_range(-(rtrim as isize), rtrim);
                }
            }
            ListValue::Linked(l) => {
                for _ in 0..ltrim {
                    l.pop(End::Head);
                }
                for _ in 0..rtrim {
                    l.pop(End::Tail);
                }
            }
        }
    }

    /// Remove occurrences of `value`: up to `count` from the head when
    /// positive, up to `-count` from the tail when negative, all when zero.
    pub fn remove(&mut self, count: isize, value: &[u8]) -> usize {
        let from = if count < 0 { End::Tail } else { End::Head };
        let limit = count.unsigned_abs();
        let mut removed = 0;
        let mut it = self.iter(from);
        while let Some(entry) = it.next() {
            if it.equals(&entry, value) {
                it.delete(entry);
                removed += 1;
                if limit != 0 && removed == limit {
                    break;
                }
            }
        }
        removed
    }

    /// Iterate starting at `from`, moving toward the other end. The
    /// iterator holds the list mutably, so the encoding cannot change
    /// underneath it.
    pub fn iter(&mut self, from: End) -> ListIter<'_> {
        ListIter::new(self, from)
    }

    /// All elements, head to tail.
    pub fn to_vec(&self) -> Vec<Value> {
        match self {
            ListValue::Compact(c) => c.iter().map(|v| v.to_vec()).collect(),
            ListValue::Linked(l) => l.iter().map(|v| v.to_vec()).collect(),
        }
    }
}
