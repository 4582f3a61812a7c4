use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::list::ListValue;
use crate::types::{Key, Value};

/// A value stored under a key.
#[derive(Debug, Clone)]
pub enum Object {
    List(ListValue),
    /// Any non-list value. Lists only need to know that it is not a list.
    Str(Value),
}

/// Kind of value held by a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    List,
    Str,
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::List(_) => ObjectKind::List,
            Object::Str(_) => ObjectKind::Str,
        }
    }
}

/// One numbered database: key → object.
///
/// Lists are never stored empty. Whoever empties one removes the key.
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: FxHashMap<Key, Object>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn kind(&self, key: &[u8]) -> Option<ObjectKind> {
        self.entries.get(key).map(Object::kind)
    }

    /// The list under `key`, `None` if absent, `WrongType` if not a list.
    pub fn list(&self, key: &[u8]) -> Result<Option<&ListValue>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Object::List(list)) => Ok(Some(list)),
            Some(_) => Err(Error::WrongType),
        }
    }

    pub fn list_mut(&mut self, key: &[u8]) -> Result<Option<&mut ListValue>> {
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(Object::List(list)) => Ok(Some(list)),
            Some(_) => Err(Error::WrongType),
        }
    }

    /// The list under `key`, created empty if the key is absent.
    pub fn list_or_create(&mut self, key: &[u8]) -> Result<&mut ListValue> {
        let object = self
            .entries
            .entry(key.to_vec())
            .or_insert_with(|| Object::List(ListValue::new()));
        match object {
            Object::List(list) => Ok(list),
            _ => Err(Error::WrongType),
        }
    }

    pub fn insert(&mut self, key: Key, object: Object) -> Option<Object> {
        self.entries.insert(key, object)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.entries.remove(key)
    }

    /// Drop `key` if it holds an empty list. Returns true if it did.
    pub fn remove_if_empty_list(&mut self, key: &[u8]) -> bool {
        let empty = matches!(self.entries.get(key), Some(Object::List(list)) if list.is_empty());
        if empty {
            self.entries.remove(key);
        }
        empty
    }
}
