//! Path-tracked container handles.

use std::rc::{Rc, Weak};

use stowage_pipeline::OpContext;
use stowage_types::{Key, Path, Value};

use crate::error::{StoreError, StoreResult};
use crate::store::{root_key_of, StoreInner};

pub(crate) struct NodeInner {
    pub(crate) store: Weak<StoreInner>,
    pub(crate) container: Value,
    pub(crate) path: Path,
}

/// A handle over one container in the store's tree, carrying the path from
/// the root by which it was first reached.
///
/// Handles are identity-cached per container: reaching the same object or
/// array twice through one store yields the same handle
/// ([`Node::same_handle`]). Every read runs the getter chain; every write
/// runs the setter walk and marks the owning root key dirty.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

impl Node {
    pub(crate) fn from_inner(inner: Rc<NodeInner>) -> Node {
        Node { inner }
    }

    fn store(&self) -> StoreResult<Rc<StoreInner>> {
        self.inner.store.upgrade().ok_or(StoreError::Detached)
    }

    fn is_root(&self) -> bool {
        self.inner.path.is_empty()
    }

    /// Path from the root to this container.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// True when both handles wrap the same cached node.
    #[must_use]
    pub fn same_handle(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reads a field through the getter chain. At the root, an in-memory
    /// miss first hydrates the key from the backend.
    pub fn get(&self, key: &Key) -> StoreResult<Value> {
        let store = self.store()?;
        if self.is_root() {
            if let Key::Name(name) = key {
                store.hydrate(name);
            }
        }
        let raw = self.inner.container.get(key);
        let root_access = store.as_root_access();
        let cx = OpContext::new(&self.inner.path, &root_access, store.clock());
        Ok(store
            .pipeline()
            .get(&cx, &self.inner.container, key, raw)?)
    }

    /// Child handle for a container field, `None` when the field reads as a
    /// non-container.
    pub fn child(&self, key: &Key) -> StoreResult<Option<Node>> {
        let value = self.get(key)?;
        if !value.is_container() {
            return Ok(None);
        }
        let store = self.store()?;
        Ok(Some(store.node_for(value, self.inner.path.child(key.clone()))))
    }

    /// Assigns a field: setter walk, commit, then persistence of the owning
    /// root key per the flush policy.
    pub fn set(&self, key: &Key, value: Value) -> StoreResult<()> {
        let store = self.store()?;
        if self.is_root() {
            if let Key::Index(i) = key {
                return Err(StoreError::UnsupportedKey(*i));
            }
        }
        let mut visited = Vec::new();
        let walked = store.walk_assign(
            &self.inner.container,
            &self.inner.path,
            key,
            value,
            &mut visited,
            true,
        )?;
        self.inner.container.set_entry(key, walked);
        if let Some(root_key) = root_key_of(&self.inner.path, key) {
            store.commit(&root_key)?;
        }
        Ok(())
    }

    /// Deletes a field. The plugin deletion chain runs first; if every
    /// plugin defers, the entry is removed directly. At the root the key is
    /// hydrated first, so deleting a persisted-but-never-read key still
    /// removes its backing entry.
    pub fn delete(&self, key: &Key) -> StoreResult<bool> {
        let store = self.store()?;
        if self.is_root() {
            if let Key::Name(name) = key {
                store.hydrate(name);
            }
        }
        let root_access = store.as_root_access();
        let cx = OpContext::new(&self.inner.path, &root_access, store.clock());
        let removed = match store
            .pipeline()
            .delete_property(&cx, &self.inner.container, key)
        {
            Some(handled) => handled,
            None => self.inner.container.remove_entry(key),
        };
        if removed {
            if let Some(root_key) = root_key_of(&self.inner.path, key) {
                store.commit(&root_key)?;
            }
        }
        Ok(removed)
    }

    /// Keys of this container. At the root this is the union of persisted
    /// and pending root keys.
    pub fn keys(&self) -> StoreResult<Vec<Key>> {
        let store = self.store()?;
        if self.is_root() {
            Ok(store.root_names().into_iter().map(Key::Name).collect())
        } else {
            Ok(self.inner.container.entry_keys())
        }
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.keys()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.keys()?.is_empty())
    }
}
