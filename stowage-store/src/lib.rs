//! The Stowage storage engine.
//!
//! A [`Storage`] instance maps root-level fields one-to-one to entries of a
//! flat [`StorageBackend`], serializing each through a [`Codec`] whose
//! writer/reader passes thread every key-value pair through the interceptor
//! pipeline. Nested values are reached through path-tracked [`Node`]
//! handles; a mutation at any depth persists exactly its owning root key,
//! either synchronously or through the deferred flush queue
//! ([`FlushMode`]).
//!
//! Root keys hydrate lazily: the backend is read the first time a key is
//! accessed, and the parsed tree stays live in memory from then on.

mod backend;
mod codec;
mod error;
mod flush;
mod node;
mod store;

pub use backend::{MemoryBackend, StorageBackend};
pub use codec::{Codec, JsonCodec};
pub use error::{BackendError, CodecError, CodecResult, StoreError, StoreResult};
pub use flush::FlushMode;
pub use node::Node;
pub use store::{Storage, StorageOptions};
