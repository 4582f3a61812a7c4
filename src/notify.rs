use crate::types::{DbIndex, End};

/// A successful mutation, reported for external change propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    LPush,
    RPush,
    LPop,
    RPop,
    LInsert,
    LSet,
    LTrim,
    LRem,
    /// The key was removed because its list became empty.
    Del,
}

impl Event {
    pub fn push(end: End) -> Event {
        match end {
            End::Head => Event::LPush,
            End::Tail => Event::RPush,
        }
    }

    pub fn pop(end: End) -> Event {
        match end {
            End::Head => Event::LPop,
            End::Tail => Event::RPop,
        }
    }

    /// Name as used in keyspace notifications.
    pub fn name(self) -> &'static str {
        match self {
            Event::LPush => "lpush",
            Event::RPush => "rpush",
            Event::LPop => "lpop",
            Event::RPop => "rpop",
            Event::LInsert => "linsert",
            Event::LSet => "lset",
            Event::LTrim => "ltrim",
            Event::LRem => "lrem",
            Event::Del => "del",
        }
    }
}

/// Receives "key mutated" notifications after every successful mutation.
pub trait KeyspaceObserver {
    fn notify(&self, event: Event, db: DbIndex, key: &[u8]);
}

/// Observer that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl KeyspaceObserver for NoopObserver {
    fn notify(&self, _event: Event, _db: DbIndex, _key: &[u8]) {}
}
