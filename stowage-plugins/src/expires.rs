//! Value expiry.
//!
//! Writes made inside an [`ExpiresHandle::with_expires`] (or
//! `with_expires_at`) scope are wrapped in an envelope carrying the
//! `expires` concern and tracked by an [`ExpiryScheduler`]. An expired field
//! reads as `Undefined` and its backing data is deleted on the spot; in
//! proactive mode a driver task reaps deadlines without waiting for an
//! access.

use std::rc::Rc;

use stowage_expiry::{CheckInterval, ExpiryEntry, ExpiryScheduler};
use stowage_pipeline::{HookResult, OpContext, Plugin, PluginDef, ScopedStack};
use stowage_types::{envelope, Clock, Key, Path, SystemClock, Value};

/// Milliseconds in one day, the default unit for relative lifetimes.
pub const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

pub struct ExpiresOptions {
    /// Reaping mode. Lazy by default: expiry is enforced on access only.
    pub interval: CheckInterval,
    /// Unit-to-milliseconds factor for [`ExpiresHandle::with_expires`].
    pub multiplier: u64,
    pub clock: Rc<dyn Clock>,
}

impl Default for ExpiresOptions {
    fn default() -> Self {
        Self {
            interval: CheckInterval::Lazy,
            multiplier: DAY_MILLIS,
            clock: Rc::new(SystemClock),
        }
    }
}

/// Builds the expires plugin. The returned [`ExpiresHandle`] scopes expiry
/// contexts and exposes the scheduler (for the proactive driver); the
/// [`PluginDef`] goes into the store's plugin list.
pub fn expires_plugin(options: ExpiresOptions) -> (ExpiresHandle, PluginDef) {
    let scheduler = Rc::new(ExpiryScheduler::new(
        options.interval,
        Rc::clone(&options.clock),
    ));
    let context: Rc<ScopedStack<u64>> = Rc::new(ScopedStack::new());
    let handle = ExpiresHandle {
        context: Rc::clone(&context),
        scheduler: Rc::clone(&scheduler),
        multiplier: options.multiplier,
        clock: options.clock,
    };
    let plugin = ExpiresPlugin { scheduler, context };
    (handle, PluginDef::spec(plugin))
}

/// User-facing side of the expires plugin.
pub struct ExpiresHandle {
    context: Rc<ScopedStack<u64>>,
    scheduler: Rc<ExpiryScheduler>,
    multiplier: u64,
    clock: Rc<dyn Clock>,
}

impl ExpiresHandle {
    /// Runs `f` with a relative lifetime active: every value assigned inside
    /// expires `units * multiplier` milliseconds from now. Scopes nest; the
    /// innermost wins.
    pub fn with_expires<R>(&self, units: u64, f: impl FnOnce() -> R) -> R {
        let deadline = self
            .clock
            .now_millis()
            .saturating_add(units.saturating_mul(self.multiplier));
        self.context.scope(deadline, f)
    }

    /// Runs `f` with an absolute deadline active (milliseconds since the
    /// Unix epoch).
    pub fn with_expires_at<R>(&self, at_millis: u64, f: impl FnOnce() -> R) -> R {
        self.context.scope(at_millis, f)
    }

    /// The scheduler, to hand to [`stowage_expiry::drive`] in proactive
    /// mode.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<ExpiryScheduler> {
        &self.scheduler
    }
}

struct ExpiresPlugin {
    scheduler: Rc<ExpiryScheduler>,
    context: Rc<ScopedStack<u64>>,
}

impl Plugin for ExpiresPlugin {
    fn name(&self) -> &str {
        "expires"
    }

    /// Only the directly-assigned field is annotated; nested containers of
    /// the assigned value pass through untouched.
    fn setter(
        &self,
        cx: &OpContext<'_>,
        _target: &Value,
        key: &Key,
        value: Value,
    ) -> HookResult<Value> {
        if !cx.at_walk_root() {
            return Ok(value);
        }
        match self.context.top() {
            Some(deadline) => {
                let wrapped = envelope::wrap(value, self.scheduler.concern(), Value::from(deadline));
                self.scheduler.insert(ExpiryEntry {
                    expires_at: deadline,
                    owner: cx.path().clone(),
                    key: key.clone(),
                    root: cx.root_weak(),
                });
                Ok(wrapped)
            }
            None => {
                // Plain overwrite: whatever deadline the field carried is
                // superseded.
                self.scheduler.remove(cx.path(), key);
                Ok(value)
            }
        }
    }

    fn getter(
        &self,
        cx: &OpContext<'_>,
        target: &Value,
        key: &Key,
        value: Value,
    ) -> HookResult<Value> {
        let Some(deadline) = envelope::concern_of(target, key, self.scheduler.concern())
            .and_then(|v| v.as_u64())
        else {
            return Ok(value);
        };
        if deadline <= cx.now_millis() {
            self.scheduler.remove(cx.path(), key);
            cx.root().delete_at(cx.path(), key);
            return Ok(Value::Undefined);
        }
        if self.scheduler.is_proactive() {
            // First sight of a loaded deadline: put it under the timer.
            self.scheduler.insert(ExpiryEntry {
                expires_at: deadline,
                owner: cx.path().clone(),
                key: key.clone(),
                root: cx.root_weak(),
            });
        }
        Ok(value)
    }

    /// Observes deletions to cancel tracking, then defers so the default
    /// removal proceeds.
    fn delete_property(&self, cx: &OpContext<'_>, _target: &Value, key: &Key) -> Option<bool> {
        self.scheduler.remove(cx.path(), key);
        None
    }

    /// A (re)loaded root key replaces its subtree; entries addressing the
    /// old containers are dropped.
    fn after_parse(&self, cx: &OpContext<'_>) -> HookResult<()> {
        self.scheduler.remove_under(cx.path());
        if cx.path().len() == 1 {
            if let Some(root_key) = cx.path().first() {
                self.scheduler.remove(&Path::new(), root_key);
            }
        }
        Ok(())
    }
}
