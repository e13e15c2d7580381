//! Interceptor pipeline for Stowage.
//!
//! An ordered list of [`Plugin`]s composes into one [`Pipeline`] with four
//! data-transform chains — writer (pre-serialize), reader
//! (post-deserialize), getter (post-read), setter (pre-write) — plus a
//! deletion-override chain and fire-and-forget lifecycle hooks around
//! parse/stringify.
//!
//! Chain ordering is fixed at build time: writer-side chains run in
//! declaration order, reader-side chains in reverse. Getters unwrap outer to
//! inner (the last-declared plugin sees the rawest value); setters wrap
//! inner to outer (the first-declared plugin sees the rawest value).
//!
//! Plugins observe the store through [`OpContext`] (current path, root
//! capability handle, clock) — an explicit per-operation object, never
//! process-global state, so re-entrant plugin calls always see the correct
//! innermost context.

mod context;
mod error;
pub mod extra;
mod pipeline;
mod plugin;

pub use context::{OpContext, RootAccess, ScopedStack};
pub use error::{PipelineError, PipelineResult};
pub use extra::ExtraPlugin;
pub use pipeline::Pipeline;
pub use plugin::{HookResult, Plugin, PluginDef};
