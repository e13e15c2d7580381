//! Backing stores.
//!
//! A backend is a flat string-to-string table; one entry per root key. The
//! engine above it decides what the strings contain. Backends are synchronous
//! and report write failures (quota, I/O) immediately.

use std::cell::RefCell;

use indexmap::IndexMap;

use crate::error::BackendError;

/// A flat persistent key-value table.
pub trait StorageBackend {
    /// Stored text for `key`, `None` when absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes `key`. Failures (quota exhaustion, I/O) surface synchronously.
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Removes `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Every stored key, in backend order.
    fn keys(&self) -> Vec<String>;
}

/// In-memory backend, insertion-ordered. The default, and the test double.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RefCell<IndexMap<String, String>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().shift_remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

/// Optional namespace applied to backend keys, so several stores can share
/// one backend without colliding. A prefixed store only ever sees (and
/// clears) its own keys.
pub(crate) struct Keyspace {
    prefix: Option<String>,
}

impl Keyspace {
    pub(crate) fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Logical root key to physical backend key.
    pub(crate) fn wrap(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    /// Physical backend key back to the logical root key; `None` for keys
    /// outside this namespace.
    pub(crate) fn unwrap<'a>(&self, full: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => full
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':')),
            None => Some(full),
        }
    }
}
