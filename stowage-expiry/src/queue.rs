//! The pending-expiration queue.

use std::rc::Weak;

use stowage_pipeline::RootAccess;
use stowage_types::{Key, Path};

/// One pending expiration.
///
/// Lifecycle: created when a value is written under an active expiry
/// context; leaves the queue when the value is overwritten (superseded),
/// explicitly deleted (cancelled), or reaped.
pub struct ExpiryEntry {
    /// Absolute deadline, milliseconds since the Unix epoch.
    pub expires_at: u64,
    /// Path of the container owning the annotated field.
    pub owner: Path,
    /// The annotated field.
    pub key: Key,
    /// Store handle used by the reap action. Weak: the queue never keeps a
    /// store alive.
    pub root: Weak<dyn RootAccess>,
}

impl ExpiryEntry {
    /// True when `other` addresses the same logical field.
    #[must_use]
    pub fn same_field(&self, owner: &Path, key: &Key) -> bool {
        self.owner == *owner && self.key == *key
    }
}

/// Pending expirations ordered ascending by deadline.
///
/// At most one live entry exists per `(owner, key)` — inserting a duplicate
/// replaces it.
#[derive(Default)]
pub struct ExpiryQueue {
    entries: Vec<ExpiryEntry>,
}

impl ExpiryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered insertion; an existing entry for the same field is removed
    /// first (superseded).
    pub fn insert(&mut self, entry: ExpiryEntry) {
        self.remove(&entry.owner, &entry.key);
        let at = self
            .entries
            .partition_point(|e| e.expires_at <= entry.expires_at);
        self.entries.insert(at, entry);
    }

    /// Removes the entry for a field. Returns true iff one existed.
    pub fn remove(&mut self, owner: &Path, key: &Key) -> bool {
        match self.entries.iter().position(|e| e.same_field(owner, key)) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Drops every entry at or beneath `prefix` (used when a root key is
    /// reloaded and its subtree replaced).
    pub fn remove_under(&mut self, prefix: &Path) {
        self.entries.retain(|e| !e.owner.starts_with(prefix));
    }

    /// The nearest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.first().map(|e| e.expires_at)
    }

    /// Removes and returns every entry with `expires_at <= now`.
    pub fn pop_due(&mut self, now: u64) -> Vec<ExpiryEntry> {
        let split = self.entries.partition_point(|e| e.expires_at <= now);
        self.entries.drain(..split).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
