//! Flush policy and the deferred persistence queue.

use std::cell::RefCell;

/// When a dirty root key reaches the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushMode {
    /// Persist at commit time, inside the mutating call.
    #[default]
    Sync,
    /// Queue the root key; persist at the next explicit `flush()`. Repeat
    /// mutations of one key between flushes collapse into a single write of
    /// whatever the value is at flush time.
    Deferred,
}

/// Dirty root keys awaiting a deferred flush, first-enqueue order, one slot
/// per key.
#[derive(Default)]
pub(crate) struct FlushQueue {
    keys: RefCell<Vec<String>>,
}

impl FlushQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a key. Returns false when it was already pending.
    pub(crate) fn enqueue(&self, key: &str) -> bool {
        let mut keys = self.keys.borrow_mut();
        if keys.iter().any(|k| k == key) {
            return false;
        }
        keys.push(key.to_string());
        true
    }

    /// Cancels a pending save for `key`. Returns true iff one was pending.
    pub(crate) fn invalidate(&self, key: &str) -> bool {
        let mut keys = self.keys.borrow_mut();
        match keys.iter().position(|k| k == key) {
            Some(i) => {
                keys.remove(i);
                true
            }
            None => false,
        }
    }

    /// Takes every pending key, leaving the queue empty.
    pub(crate) fn drain(&self) -> Vec<String> {
        self.keys.borrow_mut().drain(..).collect()
    }

    pub(crate) fn clear(&self) {
        self.keys.borrow_mut().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.borrow().len()
    }
}
