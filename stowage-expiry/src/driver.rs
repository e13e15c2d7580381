//! Proactive reaping loop.

use std::rc::Weak;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::scheduler::{CheckInterval, ExpiryScheduler};

/// Drives a proactive scheduler: sleeps until the next coalesced deadline,
/// reaps whatever is due, rearms. Exits when the scheduler is dropped (the
/// handle is weak) or immediately for a lazy scheduler.
///
/// The scheduler is not `Send`; spawn this on a local task set
/// (`tokio::task::spawn_local`), matching the store's single-threaded
/// cooperative model.
pub async fn drive(scheduler: Weak<ExpiryScheduler>) {
    let interval = {
        let Some(scheduler) = scheduler.upgrade() else {
            return;
        };
        match scheduler.interval() {
            CheckInterval::Every(interval) => interval,
            CheckInterval::Lazy => {
                warn!("expiry driver started on a lazy scheduler; nothing to drive");
                return;
            }
        }
    };

    loop {
        let wait = match scheduler.upgrade() {
            Some(scheduler) => {
                scheduler.take_rearm();
                match scheduler.next_deadline() {
                    Some(deadline) => {
                        Duration::from_millis(deadline.saturating_sub(scheduler.now_millis()))
                    }
                    // Nothing pending: poll at the configured interval to
                    // pick up rearms.
                    None => interval,
                }
            }
            None => return,
        };

        sleep(wait).await;

        match scheduler.upgrade() {
            Some(scheduler) => {
                scheduler.run_due();
            }
            None => return,
        }
    }
}
