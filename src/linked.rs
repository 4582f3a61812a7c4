use crate::types::{End, Value};

/// Handle to a node of a [`LinkedList`].
///
/// An index into the list's node arena. It stays valid until that node is
/// removed, no matter what happens to other nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    value: Value,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Doubly linked list of owned values, used once a list outgrows the
/// compact encoding.
///
/// Nodes live in an arena (`Vec<Option<Node>>`) and link to each other by
/// index, so there is no unsafe pointer juggling and removed slots are
/// recycled through a free list.
///
/// ```text
///  head                                  tail
///   │                                     │
///   ▼                                     ▼
/// ┌────┐ next ┌────┐ next ┌────┐ next ┌────┐
/// │ a  │─────►│ b  │─────►│ c  │─────►│ d  │
/// │    │◄─────│    │◄─────│    │◄─────│    │
/// └────┘ prev └────┘ prev └────┘ prev └────┘
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinkedList {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl LinkedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0].as_ref().expect("stale NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0].as_mut().expect("stale NodeId")
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev
    }

    pub fn get(&self, id: NodeId) -> &[u8] {
        &self.node(id).value
    }

    pub fn set(&mut self, id: NodeId, value: Value) {
        self.node_mut(id).value = value;
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    pub fn push(&mut self, value: Value, end: End) -> NodeId {
        match end {
            End::Head => self.push_front(value),
            End::Tail => self.push_back(value),
        }
    }

    pub fn push_front(&mut self, value: Value) -> NodeId {
        let id = self.alloc(Node { value, prev: None, next: self.head });
        match self.head {
            Some(old) => self.node_mut(old).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    pub fn push_back(&mut self, value: Value) -> NodeId {
        let id = self.alloc(Node { value, prev: self.tail, next: None });
        match self.tail {
            Some(old) => self.node_mut(old).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    pub fn pop(&mut self, end: End) -> Option<Value> {
        let id = match end {
            End::Head => self.head?,
            End::Tail => self.tail?,
        };
        Some(self.remove(id))
    }

    /// Insert `value` directly before `at`.
    pub fn insert_before(&mut self, at: NodeId, value: Value) -> NodeId {
        let prev = self.node(at).prev;
        let id = self.alloc(Node { value, prev, next: Some(at) });
        self.node_mut(at).prev = Some(id);
        match prev {
            Some(p) => self.node_mut(p).next = Some(id),
            None => self.head = Some(id),
        }
        id
    }

    /// Insert `value` directly after `at`.
    pub fn insert_after(&mut self, at: NodeId, value: Value) -> NodeId {
        let next = self.node(at).next;
        let id = self.alloc(Node { value, prev: Some(at), next });
        self.node_mut(at).next = Some(id);
        match next {
            Some(n) => self.node_mut(n).prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    /// Unlink `id` and hand back its value. The slot is recycled.
    pub fn remove(&mut self, id: NodeId) -> Value {
        let node = self.nodes[id.0].take().expect("stale NodeId");
        match node.prev {
            Some(p) => self.node_mut(p).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.node_mut(n).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        node.value
    }

    /// Node at position `i`; negative indexes count from the tail.
    pub fn index(&self, i: isize) -> Option<NodeId> {
        if i < 0 {
            let mut steps = -(i + 1);
            let mut cur = self.tail?;
            while steps > 0 {
                cur = self.prev(cur)?;
                steps -= 1;
            }
            Some(cur)
        } else {
            let mut steps = i;
            let mut cur = self.head?;
            while steps > 0 {
                cur = self.next(cur)?;
                steps -= 1;
            }
            Some(cur)
        }
    }

    /// Values from head to tail.
    pub fn iter(&self) -> Iter<'_> {
        Iter { list: self, cur: self.head }
    }
}

pub struct Iter<'a> {
    list: &'a LinkedList,
    cur: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        self.cur = self.list.next(id);
        Some(self.list.get(id))
    }
}

impl<'a> FromIterator<&'a [u8]> for LinkedList {
    fn from_iter<I: IntoIterator<Item = &'a [u8]>>(iter: I) -> Self {
        let mut list = LinkedList::new();
        for v in iter {
            list.push_back(v.to_vec());
        }
        list
    }
}

impl FromIterator<Value> for LinkedList {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut list = LinkedList::new();
        for v in iter {
            list.push_back(v);
        }
        list
    }
}
