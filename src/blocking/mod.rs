//! Bookkeeping for clients blocked on list keys.
//!
//! Blocking is not thread suspension. A blocked client is a record here,
//! parked until one of three things happens:
//!
//! ```text
//!            block()
//!   Active ───────────► Blocked(keys, deadline, end, target?)
//!                           │
//!        ┌──────────────────┼─────────────────────┐
//!        ▼                  ▼                     ▼
//!     Served            TimedOut              Unblocked
//!  (ready-key drain)  (deadline sweep)   (explicit cancel)
//! ```
//!
//! A push to a key with waiters marks it ready ([`Coordinator::signal_ready`]).
//! After each unit of work the owner drains the ready queue and serves
//! waiters oldest first. The coordinator only tracks who waits on what; the
//! popping and pushing is done by [`crate::DB`] through the list API.

pub mod timeout;

use std::collections::VecDeque;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::types::{ClientId, DbIndex, End, Key};

/// A key qualified by the database that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbKey {
    pub db: DbIndex,
    pub key: Key,
}

impl DbKey {
    pub fn new(db: DbIndex, key: &[u8]) -> Self {
        DbKey { db, key: key.to_vec() }
    }
}

/// A key that received a push while clients were waiting on it.
pub type ReadyKey = DbKey;

/// What a blocked client is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedClient {
    pub db: DbIndex,
    /// Keys waited on, without duplicates.
    pub keys: Vec<Key>,
    /// `None` waits forever.
    pub deadline: Option<Instant>,
    /// End to pop from when served.
    pub end: End,
    /// Pop-and-push destination.
    pub target: Option<Key>,
    /// Order in which clients blocked, for deterministic sweeps.
    seq: u64,
}

/// Waiter lists, blocked clients and the ready-key queue of one engine.
///
/// Owned state, not globals: every [`crate::DB`] has its own, and tests can
/// build one in isolation.
#[derive(Debug, Default)]
pub struct Coordinator {
    /// Per key, clients in the order they blocked.
    waiters: FxHashMap<DbKey, VecDeque<ClientId>>,
    clients: FxHashMap<ClientId, BlockedClient>,
    ready: VecDeque<ReadyKey>,
    /// Keys currently in `ready`. A key is queued at most once.
    queued: FxHashSet<ReadyKey>,
    next_seq: u64,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `client` on `keys`. Duplicate keys are registered once. A client
    /// that was already blocked is first unblocked.
    pub fn block(
        &mut self,
        client: ClientId,
        db: DbIndex,
        keys: &[Key],
        deadline: Option<Instant>,
        end: End,
        target: Option<Key>,
    ) {
        if self.clients.contains_key(&client) {
            self.unblock(client);
        }

        let mut unique: Vec<Key> = Vec::with_capacity(keys.len());
        for key in keys {
            if unique.contains(key) {
                continue;
            }
            self.waiters
                .entry(DbKey::new(db, key))
                .or_default()
                .push_back(client);
            unique.push(key.clone());
        }

        debug!(client, db, keys = unique.len(), ?end, "client blocked");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.clients.insert(
            client,
            BlockedClient {
                db,
                keys: unique,
                deadline,
                end,
                target,
                seq,
            },
        );
    }

    /// Remove `client` from every waiter list it is on, in one pass.
    pub fn unblock(&mut self, client: ClientId) -> Option<BlockedClient> {
        let blocked = self.clients.remove(&client)?;
        for key in &blocked.keys {
            let id = DbKey::new(blocked.db, key);
            if let Some(list) = self.waiters.get_mut(&id) {
                list.retain(|&c| c != client);
                if list.is_empty() {
                    self.waiters.remove(&id);
                }
            }
        }
        debug!(client, "client unblocked");
        Some(blocked)
    }

    pub fn is_blocked(&self, client: ClientId) -> bool {
        self.clients.contains_key(&client)
    }

    pub fn blocked_client(&self, client: ClientId) -> Option<&BlockedClient> {
        self.clients.get(&client)
    }

    pub fn blocked_count(&self) -> usize {
        self.clients.len()
    }

    pub fn has_waiters(&self, db: DbIndex, key: &[u8]) -> bool {
        self.waiters.contains_key(&DbKey::new(db, key))
    }

    /// Snapshot of the clients waiting on `key`, oldest first.
    pub fn waiters(&self, db: DbIndex, key: &[u8]) -> Vec<ClientId> {
        self.waiters
            .get(&DbKey::new(db, key))
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Queue `key` for service if anyone waits on it and it is not queued
    /// already. Returns true if it was added now.
    pub fn signal_ready(&mut self, db: DbIndex, key: &[u8]) -> bool {
        let id = DbKey::new(db, key);
        if !self.waiters.contains_key(&id) || self.queued.contains(&id) {
            return false;
        }
        trace!(db, key = ?String::from_utf8_lossy(key), "key ready");
        self.queued.insert(id.clone());
        self.ready.push_back(id);
        true
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Take the oldest ready key. Once taken it may be queued again, which
    /// is how serving one key can make another (or the same) key ready.
    pub fn pop_ready(&mut self) -> Option<ReadyKey> {
        let id = self.ready.pop_front()?;
        self.queued.remove(&id);
        Some(id)
    }

    /// Clients whose deadline is at or before `now`, in blocking order.
    pub fn expired(&self, now: Instant) -> Vec<ClientId> {
        let mut expired: Vec<(u64, ClientId)> = self
            .clients
            .iter()
            .filter(|(_, b)| b.deadline.is_some_and(|d| d <= now))
            .map(|(&id, b)| (b.seq, id))
            .collect();
        expired.sort_unstable();
        expired.into_iter().map(|(_, id)| id).collect()
    }
}
