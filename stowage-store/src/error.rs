//! Error types for the storage engine.

use stowage_pipeline::PipelineError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by [`crate::Storage`] and [`crate::Node`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Root-level fields are backing-store entries and must be named.
    #[error("root keys must be strings, got index {0}")]
    UnsupportedKey(usize),

    /// The owning storage instance was dropped while this handle survived.
    #[error("store handle is no longer attached to a storage instance")]
    Detached,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Errors raised by a [`crate::StorageBackend`] write.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("storage quota exceeded writing key '{key}'")]
    QuotaExceeded { key: String },

    #[error("backend I/O failure: {0}")]
    Io(String),

    #[error("backend failure: {0}")]
    Other(String),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while serializing or parsing a stored value.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed stored text: {0}")]
    Json(#[from] serde_json::Error),

    /// A value with no JSON representation survived the writer chain.
    #[error("value at '{path}' is not JSON-serializable")]
    UnsupportedValue { path: String },

    #[error("circular reference at '{path}'")]
    CircularReference { path: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
