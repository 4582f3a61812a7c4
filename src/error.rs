use thiserror::Error;

use crate::types::DbIndex;

/// Unified error type for the list engine.
///
/// Only conditions caused by bad input land here. A compact buffer whose
/// encoding bytes are outside the known tag set is a broken invariant and
/// panics instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The key holds a value of another kind.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    /// The key does not exist (index-set on a missing list).
    #[error("no such key")]
    NoSuchKey,
    /// Index outside the list.
    #[error("index out of range")]
    OutOfRange,
    /// Blocking timeout below zero.
    #[error("timeout is negative")]
    NegativeTimeout,
    /// Blocking timeout that is not an integer.
    #[error("timeout is not an integer or out of range")]
    InvalidTimeout,
    /// Database index outside the configured range.
    #[error("invalid database index {0}")]
    InvalidDb(DbIndex),
    /// Unknown configuration option or unparsable value.
    #[error("config error: {0}")]
    Config(String),
    /// A raw compact buffer failed validation on load.
    #[error("Corruption: {0}")]
    Corruption(String),
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
