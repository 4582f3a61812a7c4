use std::time::Instant;

use tracing::{debug, trace};

use crate::blocking::{BlockedClient, Coordinator, DbKey};
use crate::config::{ListLimits, Options};
use crate::error::{Error, Result};
use crate::keyspace::{Keyspace, Object, ObjectKind};
use crate::list::ListEncoding;
use crate::notify::{Event, KeyspaceObserver, NoopObserver};
use crate::types::{ClientId, DbIndex, End, Key, Position, Value};

/// The caller of a blocking operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Client {
    pub id: ClientId,
    pub db: DbIndex,
    /// Inside a transaction or script a blocking pop on an empty key
    /// answers empty instead of blocking.
    pub in_transaction: bool,
}

impl Client {
    pub fn new(id: ClientId, db: DbIndex) -> Self {
        Client {
            id,
            db,
            in_transaction: false,
        }
    }

    pub fn in_transaction(mut self) -> Self {
        self.in_transaction = true;
        self
    }
}

/// Result of a blocking pop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopOutcome {
    /// An element was available right away.
    Served { key: Key, value: Value },
    /// The client is now blocked; the value arrives as a [`Delivery`].
    Blocked,
    /// Nothing to pop and blocking is not allowed here.
    Empty,
}

/// Result of an insert relative to a pivot element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Inserted; the list now has this many elements.
    Inserted(usize),
    PivotNotFound,
    NoSuchKey,
}

/// A value handed to a previously blocked client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub client: ClientId,
    /// Key the value was popped from.
    pub key: Key,
    pub value: Value,
}

/// Engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Lists converted from compact to linked.
    pub conversions: u64,
    /// Clients blocked right now.
    pub blocked_clients: usize,
    /// Blocked clients served through the ready-key drain.
    pub served_clients: u64,
    /// Blocked clients dropped by the deadline sweep.
    pub timed_out_clients: u64,
    /// Keys across all databases.
    pub keys: usize,
}

/// The list store: numbered databases of keys, list operations over them,
/// and the blocking pop protocol.
///
/// Single threaded by contract: one operation (or one group of them) runs
/// to completion, then the caller runs [`DB::serve_ready_keys`] once to
/// hand elements to blocked clients, and periodically
/// [`DB::expire_blocked`] to time them out.
///
/// ```text
///  push ──► list ──► key has waiters? ──► ready queue
///                                            │
///  (end of unit of work) serve_ready_keys ◄──┘
///        │  oldest waiter first, one element each
///        ▼
///     Delivery { client, key, value }
/// ```
pub struct DB {
    options: Options,
    dbs: Vec<Keyspace>,
    blocking: Coordinator,
    observer: Box<dyn KeyspaceObserver>,
    conversions: u64,
    served_clients: u64,
    timed_out_clients: u64,
}

impl DB {
    pub fn new(options: Options) -> Self {
        Self::with_observer(options, Box::new(NoopObserver))
    }

    /// Create a store that reports every mutation to `observer`.
    pub fn with_observer(options: Options, observer: Box<dyn KeyspaceObserver>) -> Self {
        let dbs = (0..options.databases.max(1)).map(|_| Keyspace::new()).collect();
        DB {
            options,
            dbs,
            blocking: Coordinator::new(),
            observer,
            conversions: 0,
            served_clients: 0,
            timed_out_clients: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn stats(&self) -> Stats {
        Stats {
            conversions: self.conversions,
            blocked_clients: self.blocking.blocked_count(),
            served_clients: self.served_clients,
            timed_out_clients: self.timed_out_clients,
            keys: self.dbs.iter().map(Keyspace::len).sum(),
        }
    }

    /// Blocking bookkeeping, for inspection.
    pub fn coordinator(&self) -> &Coordinator {
        &self.blocking
    }

    pub fn is_blocked(&self, client: ClientId) -> bool {
        self.blocking.is_blocked(client)
    }

    fn limits(&self) -> ListLimits {
        self.options.list_limits
    }

    fn keyspace(&self, db: DbIndex) -> Result<&Keyspace> {
        self.dbs.get(db).ok_or(Error::InvalidDb(db))
    }

    fn keyspace_mut(&mut self, db: DbIndex) -> Result<&mut Keyspace> {
        self.dbs.get_mut(db).ok_or(Error::InvalidDb(db))
    }

    fn notify(&self, event: Event, db: DbIndex, key: &[u8]) {
        self.observer.notify(event, db, key);
    }

    /// Remove `key` if its list is now empty; lists are never kept empty.
    fn drop_if_empty(&mut self, db: DbIndex, key: &[u8]) {
        if self.dbs[db].remove_if_empty_list(key) {
            self.notify(Event::Del, db, key);
        }
    }

    // --- namespace helpers ---------------------------------------------

    /// Store a non-list value, replacing whatever was there.
    pub fn set_string(&mut self, db: DbIndex, key: &[u8], value: &[u8]) -> Result<()> {
        self.keyspace_mut(db)?.insert(key.to_vec(), Object::Str(value.to_vec()));
        Ok(())
    }

    pub fn get_string(&self, db: DbIndex, key: &[u8]) -> Result<Option<Value>> {
        match self.keyspace(db)?.get(key) {
            None => Ok(None),
            Some(Object::Str(v)) => Ok(Some(v.clone())),
            Some(_) => Err(Error::WrongType),
        }
    }

    /// Remove `key` whatever it holds. Returns whether it existed.
    pub fn delete(&mut self, db: DbIndex, key: &[u8]) -> Result<bool> {
        let existed = self.keyspace_mut(db)?.remove(key).is_some();
        if existed {
            self.notify(Event::Del, db, key);
        }
        Ok(existed)
    }

    pub fn exists(&self, db: DbIndex, key: &[u8]) -> Result<bool> {
        Ok(self.keyspace(db)?.contains(key))
    }

    pub fn kind_of(&self, db: DbIndex, key: &[u8]) -> Result<Option<ObjectKind>> {
        Ok(self.keyspace(db)?.kind(key))
    }

    /// Representation of the list under `key`.
    pub fn encoding_of(&self, db: DbIndex, key: &[u8]) -> Result<Option<ListEncoding>> {
        Ok(self.keyspace(db)?.list(key)?.map(|l| l.encoding()))
    }

    // --- list operations -----------------------------------------------

    /// Push `values` one by one at `end`, creating the list if needed.
    /// Returns the new length.
    pub fn push(&mut self, db: DbIndex, key: &[u8], values: &[&[u8]], end: End) -> Result<usize> {
        if values.is_empty() {
            return self.len(db, key);
        }
        let limits = self.limits();
        let list = self.keyspace_mut(db)?.list_or_create(key)?;
        let before = list.encoding();
        for value in values {
            list.push(value, end, &limits);
        }
        let len = list.len();
        if list.encoding() != before {
            self.conversions += 1;
        }
        self.blocking.signal_ready(db, key);
        self.notify(Event::push(end), db, key);
        Ok(len)
    }

    /// Push only if `key` already holds a list. Returns the new length, or
    /// 0 when the key is absent.
    pub fn push_existing(&mut self, db: DbIndex, key: &[u8], value: &[u8], end: End) -> Result<usize> {
        if self.keyspace(db)?.list(key)?.is_none() {
            return Ok(0);
        }
        self.push(db, key, &[value], end)
    }

    /// Pop one element; the key goes away with its last element.
    pub fn pop(&mut self, db: DbIndex, key: &[u8], end: End) -> Result<Option<Value>> {
        let Some(list) = self.keyspace_mut(db)?.list_mut(key)? else {
            return Ok(None);
        };
        let value = list.pop(end);
        if value.is_some() {
            self.notify(Event::pop(end), db, key);
            self.drop_if_empty(db, key);
        }
        Ok(value)
    }

    pub fn len(&self, db: DbIndex, key: &[u8]) -> Result<usize> {
        Ok(self.keyspace(db)?.list(key)?.map_or(0, |l| l.len()))
    }

    pub fn index(&self, db: DbIndex, key: &[u8], index: isize) -> Result<Option<Value>> {
        Ok(self.keyspace(db)?.list(key)?.and_then(|l| l.index(index)))
    }

    /// Overwrite the element at `index`.
    pub fn set(&mut self, db: DbIndex, key: &[u8], index: isize, value: &[u8]) -> Result<()> {
        let limits = self.limits();
        let list = self.keyspace_mut(db)?.list_mut(key)?.ok_or(Error::NoSuchKey)?;
        let before = list.encoding();
        if !list.set(index, value, &limits) {
            return Err(Error::OutOfRange);
        }
        if list.encoding() != before {
            self.conversions += 1;
        }
        self.notify(Event::LSet, db, key);
        Ok(())
    }

    /// Insert `value` next to the first element equal to `pivot`.
    pub fn insert(
        &mut self,
        db: DbIndex,
        key: &[u8],
        at: Position,
        pivot: &[u8],
        value: &[u8],
    ) -> Result<InsertOutcome> {
        let limits = self.limits();
        let Some(list) = self.keyspace_mut(db)?.list_mut(key)? else {
            return Ok(InsertOutcome::NoSuchKey);
        };
        let before = list.encoding();
        if !list.insert_at_pivot(pivot, value, at, &limits) {
            return Ok(InsertOutcome::PivotNotFound);
        }
        let len = list.len();
        if list.encoding() != before {
            self.conversions += 1;
        }
        self.notify(Event::LInsert, db, key);
        Ok(InsertOutcome::Inserted(len))
    }

    /// Elements in the inclusive range `[start, end]`; negative indexes
    /// count from the tail.
    pub fn range(&self, db: DbIndex, key: &[u8], start: isize, end: isize) -> Result<Vec<Value>> {
        Ok(self
            .keyspace(db)?
            .list(key)?
            .map(|l| l.range(start, end))
            .unwrap_or_default())
    }

    /// Keep only `[start, end]`. A list trimmed to nothing is deleted.
    pub fn trim(&mut self, db: DbIndex, key: &[u8], start: isize, end: isize) -> Result<()> {
        let Some(list) = self.keyspace_mut(db)?.list_mut(key)? else {
            return Ok(());
        };
        list.trim(start, end);
        self.notify(Event::LTrim, db, key);
        self.drop_if_empty(db, key);
        Ok(())
    }

    /// Remove occurrences of `value` (see [`crate::ListValue::remove`]).
    pub fn remove(&mut self, db: DbIndex, key: &[u8], count: isize, value: &[u8]) -> Result<usize> {
        let Some(list) = self.keyspace_mut(db)?.list_mut(key)? else {
            return Ok(0);
        };
        let removed = list.remove(count, value);
        if removed > 0 {
            self.notify(Event::LRem, db, key);
            self.drop_if_empty(db, key);
        }
        Ok(removed)
    }

    /// Atomically pop the tail of `src` and push it onto the head of `dst`.
    ///
    /// Both keys are type checked before anything moves, so a `dst` holding
    /// a non-list fails the whole operation with no mutation.
    pub fn pop_push(&mut self, db: DbIndex, src: &[u8], dst: &[u8]) -> Result<Option<Value>> {
        let ks = self.keyspace(db)?;
        if ks.list(src)?.is_none() {
            return Ok(None);
        }
        ks.list(dst)?;

        let Some(value) = self.dbs[db].list_mut(src)?.and_then(|l| l.pop(End::Tail)) else {
            return Ok(None);
        };
        self.notify(Event::RPop, db, src);
        self.push(db, dst, &[value.as_slice()], End::Head)?;
        self.drop_if_empty(db, src);
        Ok(Some(value))
    }

    // --- blocking ------------------------------------------------------

    /// Pop from the first non-empty key in `keys`, or block on all of them.
    ///
    /// A key holding a non-list value fails the call when reached. Inside a
    /// transaction nothing blocks and an empty answer comes back instead.
    pub fn blocking_pop(
        &mut self,
        client: &Client,
        keys: &[Key],
        end: End,
        deadline: Option<Instant>,
    ) -> Result<PopOutcome> {
        let db = client.db;
        self.keyspace(db)?;
        for key in keys {
            if let Some(value) = self.pop(db, key, end)? {
                return Ok(PopOutcome::Served {
                    key: key.clone(),
                    value,
                });
            }
        }
        if client.in_transaction || keys.is_empty() {
            return Ok(PopOutcome::Empty);
        }
        self.blocking.block(client.id, db, keys, deadline, end, None);
        Ok(PopOutcome::Blocked)
    }

    /// Blocking form of [`DB::pop_push`]: waits on `src` while it is empty.
    pub fn blocking_pop_push(
        &mut self,
        client: &Client,
        src: &[u8],
        dst: &[u8],
        deadline: Option<Instant>,
    ) -> Result<PopOutcome> {
        let db = client.db;
        if self.keyspace(db)?.list(src)?.is_none() {
            if client.in_transaction {
                return Ok(PopOutcome::Empty);
            }
            self.blocking
                .block(client.id, db, &[src.to_vec()], deadline, End::Tail, Some(dst.to_vec()));
            return Ok(PopOutcome::Blocked);
        }
        Ok(match self.pop_push(db, src, dst)? {
            Some(value) => PopOutcome::Served {
                key: src.to_vec(),
                value,
            },
            None => PopOutcome::Empty,
        })
    }

    /// Serve blocked clients on every key that became ready.
    ///
    /// Runs to a fixed point: serving a pop-and-push client can make its
    /// destination ready, which is served in the same call. Per key, waiters
    /// are served oldest first, one element each, until either runs out.
    pub fn serve_ready_keys(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Some(DbKey { db, key }) = self.blocking.pop_ready() {
            for client in self.blocking.waiters(db, &key) {
                let Some(blocked) = self.blocking.blocked_client(client).cloned() else {
                    continue;
                };
                let popped = match self.dbs[db].list_mut(&key) {
                    Ok(Some(list)) => list.pop(blocked.end),
                    _ => None,
                };
                let Some(value) = popped else {
                    break;
                };
                match self.serve_client(client, db, &key, &blocked, value) {
                    Ok(delivery) => deliveries.push(delivery),
                    Err(value) => self.undo_pop(db, &key, value, blocked.end),
                }
            }
            self.drop_if_empty(db, &key);
        }
        deliveries
    }

    /// Hand `value`, just popped from `key`, to `client`. When the client
    /// waits to push it somewhere that is not a list, the value comes back
    /// as the error and the client stays blocked.
    fn serve_client(
        &mut self,
        client: ClientId,
        db: DbIndex,
        key: &[u8],
        blocked: &BlockedClient,
        value: Value,
    ) -> std::result::Result<Delivery, Value> {
        if let Some(target) = &blocked.target {
            if self.dbs[db].list(target).is_err() {
                debug!(client, "blocked pop-and-push target holds a non-list, serve skipped");
                return Err(value);
            }
        }

        self.blocking.unblock(client);
        self.served_clients += 1;
        self.notify(Event::pop(blocked.end), db, key);
        if let Some(target) = &blocked.target {
            // Type checked above; this cannot hit a non-list.
            if let Err(err) = self.push(db, target, &[value.as_slice()], End::Head) {
                debug!(client, %err, "push to pop-and-push target failed");
            }
        }
        trace!(client, db, "served blocked client");
        Ok(Delivery {
            client,
            key: key.to_vec(),
            value,
        })
    }

    /// Put back a value whose delivery failed, at the end it came from.
    fn undo_pop(&mut self, db: DbIndex, key: &[u8], value: Value, end: End) {
        let limits = self.limits();
        if let Ok(list) = self.dbs[db].list_or_create(key) {
            list.push(&value, end, &limits);
        }
    }

    /// Time out every client whose deadline has passed. Returns them in the
    /// order they blocked; each should get an empty reply.
    pub fn expire_blocked(&mut self, now: Instant) -> Vec<ClientId> {
        let expired = self.blocking.expired(now);
        for &client in &expired {
            self.blocking.unblock(client);
            self.timed_out_clients += 1;
            debug!(client, "blocked client timed out");
        }
        expired
    }

    /// Cancel a client's wait, e.g. on disconnect. Returns whether it was blocked.
    pub fn disconnect(&mut self, client: ClientId) -> bool {
        self.blocking.unblock(client).is_some()
    }
}
