//! # List Engine
//!
//! The list value layer of an in-memory key-value engine.
//!
//! ## Core idea
//! Small lists live in one contiguous, variable-length encoded buffer
//! ([`compact::CompactList`]): no per-element allocation, integers stored
//! as integers, O(1) push/pop at both ends. Once a list grows past the
//! configured thresholds it moves, for good, to a doubly linked node list
//! ([`linked::LinkedList`]). [`ListValue`] hides which one is in use.
//!
//! On top sits the blocking pop protocol: clients wait on keys that are
//! empty, pushes mark those keys ready, and [`DB::serve_ready_keys`] hands
//! elements to the waiters in the order they blocked.

pub mod blocking;
pub mod compact;
pub mod config;
pub mod db;
pub mod error;
pub mod keyspace;
pub mod linked;
pub mod list;
pub mod notify;
pub mod types;

// Public re-exports for the top-level API
pub use config::{ListLimits, Options};
pub use db::{Client, DB, Delivery, InsertOutcome, PopOutcome, Stats};
pub use error::{Error, Result};
pub use list::{ListEncoding, ListValue};
pub use types::{ClientId, DbIndex, End, Key, Position, Value};
