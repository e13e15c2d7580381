//! Expiry scheduling for Stowage.
//!
//! Values annotated with a lifetime enter an [`ExpiryQueue`] ordered by
//! deadline. The [`ExpiryScheduler`] reaps them either lazily (on access
//! only, [`CheckInterval::Lazy`]) or proactively
//! ([`CheckInterval::Every`]), where [`drive`] runs a coalesced timer that
//! wakes at `min(configured interval, nearest pending deadline)`.
//!
//! A reap re-verifies the stored metadata before deleting anything, so an
//! entry superseded by a plain overwrite cancels itself instead of deleting
//! fresh data, and a reap whose owning container has disappeared is a
//! silent no-op.

mod driver;
mod queue;
mod scheduler;

pub use driver::drive;
pub use queue::{ExpiryEntry, ExpiryQueue};
pub use scheduler::{CheckInterval, ExpiryScheduler, EXPIRES_CONCERN};
