//! Per-operation context and scoped ambient state.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use stowage_types::{Clock, Key, Path, Value};

/// Capability handle over the store root, implemented by the store engine.
///
/// Plugins never hold the store directly; they address logical fields by
/// `(owner path, key)` through this trait, which is all the original
/// receiver/parent walk was used for.
pub trait RootAccess {
    /// Raw (pre-getter-chain) value of `owner[key]`, `Undefined` when the
    /// owner container no longer exists.
    fn read_raw(&self, owner: &Path, key: &Key) -> Value;

    /// Deletes `owner[key]` and marks the owning root key dirty for
    /// persistence. A missing ancestor is a silent no-op returning false.
    fn delete_at(&self, owner: &Path, key: &Key) -> bool;

    /// Schedules persistence of a root key according to the store's flush
    /// policy.
    fn mark_dirty(&self, root_key: &str);
}

/// Context of one interception operation.
///
/// Constructed fresh for every get/set/delete/parse/stringify, including
/// each frame of a setter walk, so nested and re-entrant operations always
/// carry the correct path.
pub struct OpContext<'a> {
    path: &'a Path,
    root: &'a Rc<dyn RootAccess>,
    clock: &'a Rc<dyn Clock>,
    at_walk_root: bool,
}

impl<'a> OpContext<'a> {
    pub fn new(path: &'a Path, root: &'a Rc<dyn RootAccess>, clock: &'a Rc<dyn Clock>) -> Self {
        Self {
            path,
            root,
            clock,
            at_walk_root: true,
        }
    }

    #[must_use]
    pub fn with_walk_root(mut self, at_walk_root: bool) -> Self {
        self.at_walk_root = at_walk_root;
        self
    }

    /// Path of the target container, from the root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path
    }

    #[must_use]
    pub fn root(&self) -> &Rc<dyn RootAccess> {
        self.root
    }

    /// Weak root handle, for state that outlives the operation (e.g. expiry
    /// entries).
    #[must_use]
    pub fn root_weak(&self) -> Weak<dyn RootAccess> {
        Rc::downgrade(self.root)
    }

    #[must_use]
    pub fn clock(&self) -> &Rc<dyn Clock> {
        self.clock
    }

    #[must_use]
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// True only for the directly-assigned field of a setter walk (the walk
    /// root), false for its nested descendants and for non-walk operations'
    /// nested frames.
    #[must_use]
    pub fn at_walk_root(&self) -> bool {
        self.at_walk_root
    }
}

/// An ambient stack scoped to a closure: pushed on entry, popped on every
/// exit path including unwinding.
///
/// Used by plugins that expose `with_x(value, f)` scoping (the expiry
/// context). Per-instance, so independent stores cannot cross-contaminate.
pub struct ScopedStack<T> {
    items: RefCell<Vec<T>>,
}

impl<T> ScopedStack<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
        }
    }

    /// Runs `f` with `item` as the innermost value.
    pub fn scope<R>(&self, item: T, f: impl FnOnce() -> R) -> R {
        self.items.borrow_mut().push(item);
        let _guard = PopGuard { items: &self.items };
        f()
    }

    /// The innermost value, if any scope is active.
    #[must_use]
    pub fn top(&self) -> Option<T>
    where
        T: Clone,
    {
        self.items.borrow().last().cloned()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.items.borrow().len()
    }
}

impl<T> Default for ScopedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct PopGuard<'a, T> {
    items: &'a RefCell<Vec<T>>,
}

impl<T> Drop for PopGuard<'_, T> {
    fn drop(&mut self) {
        self.items.borrow_mut().pop();
    }
}
