//! The persistence façade.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use stowage_pipeline::{ExtraPlugin, OpContext, Pipeline, PluginDef, RootAccess};
use stowage_types::{envelope, Clock, Key, Path, SystemClock, Value};
use tracing::warn;

use crate::backend::{Keyspace, MemoryBackend, StorageBackend};
use crate::codec::{Codec, JsonCodec};
use crate::error::StoreResult;
use crate::flush::{FlushMode, FlushQueue};
use crate::node::{Node, NodeInner};

/// Configuration for a [`Storage`] instance.
pub struct StorageOptions {
    backend: Rc<dyn StorageBackend>,
    codec: Box<dyn Codec>,
    plugins: Vec<PluginDef>,
    prefix: Option<String>,
    flush: FlushMode,
    clock: Rc<dyn Clock>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            backend: Rc::new(MemoryBackend::new()),
            codec: Box::new(JsonCodec),
            plugins: Vec::new(),
            prefix: None,
            flush: FlushMode::Sync,
            clock: Rc::new(SystemClock),
        }
    }
}

impl StorageOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn backend(mut self, backend: Rc<impl StorageBackend + 'static>) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Appends a plugin. Declaration order is chain order (see
    /// `stowage_pipeline`).
    #[must_use]
    pub fn plugin(mut self, def: PluginDef) -> Self {
        self.plugins.push(def);
        self
    }

    /// Namespaces this store's backend keys, so several stores can share one
    /// backend without colliding.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn flush(mut self, mode: FlushMode) -> Self {
        self.flush = mode;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn open(self) -> Storage {
        Storage::open(self)
    }
}

/// The storage engine behind a [`Storage`] handle and every [`Node`].
pub(crate) struct StoreInner {
    /// Self-reference, for handing out `Rc<dyn RootAccess>` from `&self`.
    weak: Weak<StoreInner>,
    backend: Rc<dyn StorageBackend>,
    codec: Box<dyn Codec>,
    pipeline: Pipeline,
    keyspace: Keyspace,
    flush_mode: FlushMode,
    queue: FlushQueue,
    clock: Rc<dyn Clock>,
    /// The in-memory root container: root key to hydrated value.
    root: Value,
    /// Wrapper identity cache, container `ptr_id` to live node.
    nodes: RefCell<HashMap<usize, Weak<NodeInner>>>,
    /// Suppresses commits while a reload replaces a subtree.
    reloading: Cell<bool>,
}

/// Root key a mutation of `container[key]` is attributed to, where
/// `container` sits at `path`. `None` when the path is unattributable (an
/// index at the root, which mutating operations reject up front).
pub(crate) fn root_key_of(path: &Path, key: &Key) -> Option<String> {
    match path.root_key() {
        Some(name) => Some(name.to_string()),
        None if path.is_empty() => key.as_name().map(str::to_string),
        None => None,
    }
}

impl StoreInner {
    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub(crate) fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn as_root_access(&self) -> Rc<dyn RootAccess> {
        self.weak
            .upgrade()
            .map(|rc| rc as Rc<dyn RootAccess>)
            .expect("self-reference upgrades while the store is alive")
    }

    /// The container at `owner`, walked from the root. Each step unwraps a
    /// metadata envelope, so paths resolve through annotated containers.
    /// `Undefined` when any step is missing.
    fn container_at(&self, owner: &Path) -> Value {
        owner
            .segments()
            .iter()
            .fold(self.root.clone(), |v, k| envelope::unwrap(v.get(k)))
    }

    /// Identity-cached wrapper for a container.
    pub(crate) fn node_for(&self, container: Value, path: Path) -> Node {
        let id = container.ptr_id();
        if let Some(id) = id {
            if let Some(existing) = self.nodes.borrow().get(&id).and_then(Weak::upgrade) {
                return Node::from_inner(existing);
            }
        }
        let inner = Rc::new(NodeInner {
            store: self.weak.clone(),
            container,
            path,
        });
        if let Some(id) = id {
            let mut nodes = self.nodes.borrow_mut();
            nodes.retain(|_, node| node.strong_count() > 0);
            nodes.insert(id, Rc::downgrade(&inner));
        }
        Node::from_inner(inner)
    }

    /// Ensures a root key read finds whatever the backend holds. Presence in
    /// the root container is the hydration marker; a backend miss is not
    /// cached, and malformed stored text downgrades to a warning (the read
    /// then sees `Undefined`).
    pub(crate) fn hydrate(&self, name: &str) {
        let key = Key::Name(name.to_string());
        if self.root.contains_key(&key) {
            return;
        }
        match self.load(name) {
            Ok(Some(value)) => {
                self.root.set_entry(&key, value);
            }
            Ok(None) => {}
            Err(e) => warn!(key = name, error = %e, "failed to hydrate stored value"),
        }
    }

    /// Reads and parses one root key from the backend. `Ok(None)` when the
    /// backend has no entry (distinct from a stored `null`).
    fn load(&self, root_key: &str) -> StoreResult<Option<Value>> {
        let Some(text) = self.backend.get(&self.keyspace.wrap(root_key)) else {
            return Ok(None);
        };
        let path: Path = [Key::Name(root_key.to_string())].into_iter().collect();
        let root_access = self.as_root_access();
        let cx = OpContext::new(&path, &root_access, &self.clock);

        self.pipeline.before_parse(&cx);
        let value = self.codec.parse(&text, &self.pipeline)?;
        self.pipeline.after_parse(&cx);
        Ok(Some(value))
    }

    /// Serializes and writes one root key. An in-memory `Undefined` (or a
    /// value the writer chain reduces to `Undefined`) removes the backing
    /// entry instead.
    pub(crate) fn persist_root(&self, root_key: &str) -> StoreResult<()> {
        let value = self.root.get(&Key::Name(root_key.to_string()));
        let path: Path = [Key::Name(root_key.to_string())].into_iter().collect();
        let root_access = self.as_root_access();
        let cx = OpContext::new(&path, &root_access, &self.clock);

        self.pipeline.before_stringify(&cx);
        let text = self.codec.stringify(&value, &self.pipeline)?;
        self.pipeline.after_stringify(&cx);

        let wrapped = self.keyspace.wrap(root_key);
        match text {
            Some(text) => self.backend.set(&wrapped, &text)?,
            None => self.backend.remove(&wrapped),
        }
        Ok(())
    }

    /// Commits a dirty root key per the flush policy.
    pub(crate) fn commit(&self, root_key: &str) -> StoreResult<()> {
        if self.reloading.get() {
            return Ok(());
        }
        match self.flush_mode {
            FlushMode::Sync => self.persist_root(root_key),
            FlushMode::Deferred => {
                self.queue.enqueue(root_key);
                Ok(())
            }
        }
    }

    fn reload(&self, root_key: &str) -> StoreResult<()> {
        self.queue.invalidate(root_key);
        self.reloading.set(true);
        let result = self.load(root_key);
        self.reloading.set(false);

        let key = Key::Name(root_key.to_string());
        match result? {
            Some(value) => {
                self.root.set_entry(&key, value);
            }
            None => {
                self.root.remove_entry(&key);
            }
        }
        Ok(())
    }

    /// Logical root keys: everything in the backend's namespace plus
    /// in-memory keys not yet flushed.
    pub(crate) fn root_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .backend
            .keys()
            .into_iter()
            .filter_map(|k| self.keyspace.unwrap(&k).map(str::to_string))
            .collect();
        for key in self.root.entry_keys() {
            if let Key::Name(name) = key {
                if !names.contains(&name) && !self.root.get(&Key::Name(name.clone())).is_undefined()
                {
                    names.push(name);
                }
            }
        }
        names
    }

    fn clear(&self) {
        for name in self.root_names() {
            self.backend.remove(&self.keyspace.wrap(&name));
        }
        for key in self.root.entry_keys() {
            self.root.remove_entry(&key);
        }
        self.queue.clear();
    }

    /// Setter walk: visits `value`'s nested containers children-first (with
    /// a visited set, so self-referential structures terminate), running the
    /// setter chain on every pair. Object children the chain revives to
    /// `Undefined` are dropped; array items keep their slot.
    pub(crate) fn walk_assign(
        &self,
        target: &Value,
        path: &Path,
        key: &Key,
        value: Value,
        visited: &mut Vec<usize>,
        at_walk_root: bool,
    ) -> StoreResult<Value> {
        if let Some(id) = value.ptr_id() {
            if visited.contains(&id) {
                return Ok(value);
            }
            visited.push(id);
            let child_path = path.child(key.clone());
            for child_key in value.entry_keys() {
                let child = value.get(&child_key);
                let walked =
                    self.walk_assign(&value, &child_path, &child_key, child, visited, false)?;
                if walked.is_undefined() && !value.is_array() {
                    value.remove_entry(&child_key);
                } else {
                    value.set_entry(&child_key, walked);
                }
            }
        }
        let root_access = self.as_root_access();
        let cx = OpContext::new(path, &root_access, &self.clock).with_walk_root(at_walk_root);
        Ok(self.pipeline.set(&cx, target, key, value)?)
    }
}

impl RootAccess for StoreInner {
    fn read_raw(&self, owner: &Path, key: &Key) -> Value {
        self.container_at(owner).get(key)
    }

    fn delete_at(&self, owner: &Path, key: &Key) -> bool {
        let removed = self.container_at(owner).remove_entry(key);
        if removed {
            if let Some(root_key) = root_key_of(owner, key) {
                self.mark_dirty(&root_key);
            }
        }
        removed
    }

    fn mark_dirty(&self, root_key: &str) {
        // Plugin-initiated: nowhere to propagate, so log and move on.
        if let Err(e) = self.commit(root_key) {
            warn!(key = root_key, error = %e, "persistence of dirty root key failed");
        }
    }
}

/// A persistent key-value store with interceptor plugins.
///
/// Root-level fields map one-to-one to backing-store entries; nested values
/// are addressed through [`Node`] handles. However deep a mutation, only the
/// owning root key is persisted.
///
/// Single-threaded by design (`Rc`/`RefCell` throughout). Independent
/// handles over one backend are eventually consistent: a handle sees
/// another's writes only after an explicit [`Storage::reload`].
pub struct Storage {
    inner: Rc<StoreInner>,
}

impl Storage {
    #[must_use]
    pub fn open(options: StorageOptions) -> Storage {
        let mut defs = options.plugins;
        // Appended last, so it runs first on the reverse getter chain and
        // user getters always see unwrapped values.
        defs.push(PluginDef::spec(ExtraPlugin));
        let inner = Rc::new_cyclic(|weak| StoreInner {
            weak: weak.clone(),
            backend: options.backend,
            codec: options.codec,
            pipeline: Pipeline::build(&defs),
            keyspace: Keyspace::new(options.prefix),
            flush_mode: options.flush,
            queue: FlushQueue::new(),
            clock: options.clock,
            root: Value::object(),
            nodes: RefCell::new(HashMap::new()),
            reloading: Cell::new(false),
        });
        Storage { inner }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Node {
        self.inner.node_for(self.inner.root.clone(), Path::new())
    }

    /// Reads a root field through the getter chain, hydrating it from the
    /// backend on first access.
    pub fn get(&self, key: &str) -> StoreResult<Value> {
        self.root().get(&Key::from(key))
    }

    /// Assigns a root field and persists it per the flush policy.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> StoreResult<()> {
        self.root().set(&Key::from(key), value.into())
    }

    /// Deletes a root field. Returns true iff something was removed.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.root().delete(&Key::from(key))
    }

    /// Node handle over a root container field, `None` for non-containers.
    pub fn child(&self, key: &str) -> StoreResult<Option<Node>> {
        self.root().child(&Key::from(key))
    }

    /// Every logical root key (persisted or pending).
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.root_names()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.root_names().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every root key in this store's namespace, in memory and in
    /// the backend.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Re-reads one root key from the backend, replacing the in-memory
    /// subtree. Cancels any pending deferred save for the key first, so the
    /// freshly loaded state cannot be clobbered by a stale flush.
    pub fn reload(&self, key: &str) -> StoreResult<()> {
        self.inner.reload(key)
    }

    /// Persists one root key now, regardless of flush policy.
    pub fn save(&self, key: &str) -> StoreResult<()> {
        self.inner.persist_root(key)
    }

    /// Persists every pending deferred key, first-enqueue order.
    pub fn flush(&self) -> StoreResult<()> {
        for key in self.inner.queue.drain() {
            self.inner.persist_root(&key)?;
        }
        Ok(())
    }

    /// Number of keys awaiting a deferred flush.
    #[must_use]
    pub fn pending_flushes(&self) -> usize {
        self.inner.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_identity_cache_entries_are_swept() {
        let store = StorageOptions::new().open();
        store.set("a", Value::object()).unwrap();
        store.set("b", Value::object()).unwrap();

        let a = store.child("a").unwrap().unwrap();
        let a_id = store
            .inner
            .root
            .get(&Key::from("a"))
            .ptr_id()
            .unwrap();
        assert!(store.inner.nodes.borrow().contains_key(&a_id));

        drop(a);
        let _b = store.child("b").unwrap().unwrap();
        assert!(!store.inner.nodes.borrow().contains_key(&a_id));
    }
}
