//! Core type definitions for Stowage.
//!
//! This crate defines the fundamental, plugin-agnostic types used throughout
//! the store engine:
//! - [`Value`] — the in-memory value tree (JSON-like, reference-semantics
//!   containers)
//! - [`Key`] and [`Path`] — structural addresses from a root key down to a
//!   nested field
//! - [`Stored`] / envelope helpers — the tagged metadata envelope used by
//!   value-annotating plugins (expiry, type tags, user extras)
//! - [`Clock`] — millisecond wall-clock abstraction (swappable in tests)
//!
//! Everything store-, pipeline-, or plugin-specific belongs in the
//! respective crates, not here.

pub mod envelope;
mod path;
mod time;
mod value;

pub use envelope::{Stored, META_KEY, VALUE_KEY};
pub use path::{Key, Path};
pub use time::{now_millis, Clock, ManualClock, SystemClock};
pub use value::{Map, Value};
