use crate::compact::Cursor;
use crate::linked::NodeId;
use crate::list::{ListEncoding, ListValue};
use crate::types::{End, Position, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pos {
    Compact(Cursor),
    Linked(NodeId),
}

/// One element yielded by a [`ListIter`].
///
/// A position token, only meaningful to the iterator that produced it and
/// only until the next mutation through that iterator. `delete` and
/// `insert` consume it.
#[derive(Debug)]
pub struct ListEntry {
    pos: Pos,
}

/// Directional cursor over a [`ListValue`].
///
/// `from` names the end iteration starts at: `End::Head` walks head to
/// tail, `End::Tail` walks tail to head.
///
/// The iterator keeps the list mutably borrowed for its whole life, so the
/// list cannot be converted to another encoding while positions into the
/// current one are outstanding. Convert first, then iterate.
///
/// Mutation through the iterator keeps it positioned:
///   - `delete` removes the entry; iteration continues with the element
///     that followed it in iteration order.
///   - `insert` adds a value next to the entry; iteration continues as if
///     the new value were not there.
pub struct ListIter<'a> {
    list: &'a mut ListValue,
    from: End,
    next: Option<Pos>,
}

impl<'a> ListIter<'a> {
    pub(crate) fn new(list: &'a mut ListValue, from: End) -> Self {
        let next = match &*list {
            ListValue::Compact(c) => match from {
                End::Head => c.first(),
                End::Tail => c.last(),
            }
            .map(Pos::Compact),
            ListValue::Linked(l) => match from {
                End::Head => l.head(),
                End::Tail => l.tail(),
            }
            .map(Pos::Linked),
        };
        ListIter { list, from, next }
    }

    /// Start at element `index` (negative = from the tail) instead of at `from`.
    pub fn starting_at(list: &'a mut ListValue, index: isize, from: End) -> Self {
        let next = match &*list {
            ListValue::Compact(c) => c.index(index).map(Pos::Compact),
            ListValue::Linked(l) => l.index(index).map(Pos::Linked),
        };
        ListIter { list, from, next }
    }

    pub fn encoding(&self) -> ListEncoding {
        self.list.encoding()
    }

    fn step(&self, pos: Pos) -> Option<Pos> {
        match (&*self.list, pos) {
            (ListValue::Compact(c), Pos::Compact(cur)) => match self.from {
                End::Head => c.next(cur),
                End::Tail => c.prev(cur),
            }
            .map(Pos::Compact),
            (ListValue::Linked(l), Pos::Linked(id)) => match self.from {
                End::Head => l.next(id),
                End::Tail => l.prev(id),
            }
            .map(Pos::Linked),
            _ => unreachable!("list encoding changed under an iterator"),
        }
    }

    /// Copy of the element's value.
    pub fn value(&self, entry: &ListEntry) -> Value {
        match (&*self.list, entry.pos) {
            (ListValue::Compact(c), Pos::Compact(cur)) => c.get(cur).to_vec(),
            (ListValue::Linked(l), Pos::Linked(id)) => l.get(id).to_vec(),
            _ => unreachable!("list encoding changed under an iterator"),
        }
    }

    /// Whether the element equals `value`.
    pub fn equals(&self, entry: &ListEntry, value: &[u8]) -> bool {
        match (&*self.list, entry.pos) {
            (ListValue::Compact(c), Pos::Compact(cur)) => c.compare(cur, value),
            (ListValue::Linked(l), Pos::Linked(id)) => l.get(id) == value,
            _ => unreachable!("list encoding changed under an iterator"),
        }
    }

    /// Remove the element.
    pub fn delete(&mut self, entry: ListEntry) {
        match (&mut *self.list, entry.pos) {
            (ListValue::Compact(c), Pos::Compact(cur)) => {
                let follower = c.delete(cur);
                // Walking backwards the pending position sits before the
                // deleted bytes and did not move.
                if self.from == End::Head {
                    self.next = follower.map(Pos::Compact);
                }
            }
            (ListValue::Linked(l), Pos::Linked(id)) => {
                l.remove(id);
            }
            _ => unreachable!("list encoding changed under an iterator"),
        }
    }

    /// Insert `value` before or after the element. The caller is in charge
    /// of any encoding conversion, before creating the iterator.
    pub fn insert(&mut self, entry: ListEntry, value: &[u8], at: Position) {
        match (&mut *self.list, entry.pos) {
            (ListValue::Compact(c), Pos::Compact(cur)) => {
                let inserted = match at {
                    Position::Before => c.insert_before(cur, value),
                    Position::After => c.insert_after(cur, value),
                };
                // Bytes from the insertion point on have moved. Walking
                // backwards the pending position is in front of them.
                if self.from == End::Head {
                    self.next = match at {
                        Position::Before => c.next(inserted).and_then(|current| c.next(current)),
                        Position::After => c.next(inserted),
                    }
                    .map(Pos::Compact);
                }
            }
            (ListValue::Linked(l), Pos::Linked(id)) => {
                match at {
                    Position::Before => l.insert_before(id, value.to_vec()),
                    Position::After => l.insert_after(id, value.to_vec()),
                };
            }
            _ => unreachable!("list encoding changed under an iterator"),
        }
    }
}

impl Iterator for ListIter<'_> {
    type Item = ListEntry;

    /// Yield the current position and advance.
    fn next(&mut self) -> Option<ListEntry> {
        let pos = self.next?;
        self.next = self.step(pos);
        Some(ListEntry { pos })
    }
}
