//! The expiry scheduler.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use stowage_types::{envelope, Clock, Key, Path};
use tracing::debug;

use crate::queue::{ExpiryEntry, ExpiryQueue};

/// Metadata concern under which the expiry deadline is stored.
pub const EXPIRES_CONCERN: &str = "expires";

/// How expired entries are revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInterval {
    /// No timer: expiry is enforced on access only.
    Lazy,
    /// Proactive: a coalesced timer wakes at
    /// `min(now + interval, nearest pending deadline)`.
    Every(Duration),
}

/// Orders pending expirations and performs reaps.
///
/// Single-threaded (`Rc`/`RefCell`); share it between the expires plugin
/// and a [`crate::drive`] task on the same local task set.
pub struct ExpiryScheduler {
    queue: RefCell<ExpiryQueue>,
    interval: CheckInterval,
    clock: Rc<dyn Clock>,
    concern: String,
    /// Set by inserts, consumed by the driver: multiple inserts between two
    /// polls coalesce into a single rearm.
    rearm_pending: Cell<bool>,
}

impl ExpiryScheduler {
    #[must_use]
    pub fn new(interval: CheckInterval, clock: Rc<dyn Clock>) -> Self {
        Self {
            queue: RefCell::new(ExpiryQueue::new()),
            interval,
            clock,
            concern: EXPIRES_CONCERN.to_string(),
            rearm_pending: Cell::new(false),
        }
    }

    /// Uses a custom metadata concern key instead of [`EXPIRES_CONCERN`].
    #[must_use]
    pub fn with_concern(mut self, concern: impl Into<String>) -> Self {
        self.concern = concern.into();
        self
    }

    #[must_use]
    pub fn interval(&self) -> CheckInterval {
        self.interval
    }

    #[must_use]
    pub fn is_proactive(&self) -> bool {
        matches!(self.interval, CheckInterval::Every(_))
    }

    #[must_use]
    pub fn concern(&self) -> &str {
        &self.concern
    }

    #[must_use]
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Schedules (or supersedes) an entry.
    pub fn insert(&self, entry: ExpiryEntry) {
        self.queue.borrow_mut().insert(entry);
        if self.is_proactive() {
            self.rearm_pending.set(true);
        }
    }

    /// Cancels the entry for a field. Returns true iff one existed.
    pub fn remove(&self, owner: &Path, key: &Key) -> bool {
        self.queue.borrow_mut().remove(owner, key)
    }

    /// Drops all entries at or beneath `prefix`.
    pub fn remove_under(&self, prefix: &Path) {
        self.queue.borrow_mut().remove_under(prefix);
    }

    /// Consumes the coalesced rearm request, if one is pending.
    pub fn take_rearm(&self) -> bool {
        self.rearm_pending.replace(false)
    }

    /// When the next timer should fire: `min(now + interval, nearest
    /// deadline)`. `None` in lazy mode or when nothing is pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        let CheckInterval::Every(interval) = self.interval else {
            return None;
        };
        let head = self.queue.borrow().next_deadline()?;
        let tick = self.now_millis() + interval.as_millis() as u64;
        Some(head.min(tick))
    }

    /// Reaps every entry whose deadline has passed. Returns the number of
    /// fields actually deleted.
    pub fn run_due(&self) -> usize {
        let now = self.now_millis();
        let due = self.queue.borrow_mut().pop_due(now);
        due.into_iter().filter(|entry| self.reap(entry, now)).count()
    }

    /// Executes one reap action, re-verifying the stored metadata first.
    ///
    /// Skips (without touching data) when: the store is gone, the owning
    /// container is gone, the field carries no expiry metadata anymore, or
    /// the deadline was pushed into the future by a later write.
    fn reap(&self, entry: &ExpiryEntry, now: u64) -> bool {
        let Some(root) = entry.root.upgrade() else {
            return false;
        };
        let raw = root.read_raw(&entry.owner, &entry.key);
        match envelope::concern(&raw, &self.concern).and_then(|v| v.as_u64()) {
            Some(at) if at <= now => {
                debug!(owner = %entry.owner, key = %entry.key, "reaping expired entry");
                root.delete_at(&entry.owner, &entry.key)
            }
            _ => false,
        }
    }
}
