//! Chain composition.

use std::rc::Rc;

use stowage_types::{Key, Value};
use tracing::warn;

use crate::context::OpContext;
use crate::error::{PipelineError, PipelineResult};
use crate::plugin::{Plugin, PluginDef};

/// The composed interceptor chains, immutable once built.
///
/// Writer-side chains (writer, setter, before/after_stringify,
/// delete_property) run in declaration order; reader-side chains (reader,
/// getter, before/after_parse) run in reverse declaration order. An empty
/// plugin list yields identity behavior throughout.
pub struct Pipeline {
    /// Declaration order.
    forward: Vec<Rc<dyn Plugin>>,
    /// Reverse declaration order.
    reverse: Vec<Rc<dyn Plugin>>,
}

impl Pipeline {
    /// Instantiates every definition (invoking factories) and freezes the
    /// chain order.
    #[must_use]
    pub fn build(defs: &[PluginDef]) -> Pipeline {
        let forward: Vec<Rc<dyn Plugin>> = defs.iter().map(PluginDef::instantiate).collect();
        let reverse = forward.iter().rev().map(Rc::clone).collect();
        Pipeline { forward, reverse }
    }

    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.forward.len()
    }

    // ── Data-transform chains ────────────────────────────────────

    /// Writer chain, declaration order: the first-declared plugin sees the
    /// rawest value.
    pub fn write(&self, holder: &Value, key: &Key, mut value: Value) -> PipelineResult<Value> {
        for plugin in &self.forward {
            value = plugin
                .writer(holder, key, value)
                .map_err(|e| PipelineError::hook(plugin.name(), "writer", e))?;
        }
        Ok(value)
    }

    /// Reader chain, reverse declaration order.
    pub fn read(&self, holder: &Value, key: &Key, mut value: Value) -> PipelineResult<Value> {
        for plugin in &self.reverse {
            value = plugin
                .reader(holder, key, value)
                .map_err(|e| PipelineError::hook(plugin.name(), "reader", e))?;
        }
        Ok(value)
    }

    /// Getter chain, reverse declaration order: the last-declared plugin
    /// sees the rawest value, the first-declared the most post-processed.
    pub fn get(
        &self,
        cx: &OpContext<'_>,
        target: &Value,
        key: &Key,
        mut value: Value,
    ) -> PipelineResult<Value> {
        for plugin in &self.reverse {
            value = plugin
                .getter(cx, target, key, value)
                .map_err(|e| PipelineError::hook(plugin.name(), "getter", e))?;
        }
        Ok(value)
    }

    /// Setter chain, declaration order.
    pub fn set(
        &self,
        cx: &OpContext<'_>,
        target: &Value,
        key: &Key,
        mut value: Value,
    ) -> PipelineResult<Value> {
        for plugin in &self.forward {
            value = plugin
                .setter(cx, target, key, value)
                .map_err(|e| PipelineError::hook(plugin.name(), "setter", e))?;
        }
        Ok(value)
    }

    /// Deletion chain: stops at the first plugin returning a definite bool.
    /// `None` means every plugin deferred — fall back to default removal.
    #[must_use]
    pub fn delete_property(&self, cx: &OpContext<'_>, target: &Value, key: &Key) -> Option<bool> {
        for plugin in &self.forward {
            if let Some(handled) = plugin.delete_property(cx, target, key) {
                return Some(handled);
            }
        }
        None
    }

    // ── Lifecycle hooks (fire-and-forget) ────────────────────────

    pub fn before_parse(&self, cx: &OpContext<'_>) {
        for plugin in &self.reverse {
            if let Err(e) = plugin.before_parse(cx) {
                warn!(plugin = plugin.name(), error = %e, "before_parse hook failed");
            }
        }
    }

    pub fn after_parse(&self, cx: &OpContext<'_>) {
        for plugin in &self.reverse {
            if let Err(e) = plugin.after_parse(cx) {
                warn!(plugin = plugin.name(), error = %e, "after_parse hook failed");
            }
        }
    }

    pub fn before_stringify(&self, cx: &OpContext<'_>) {
        for plugin in &self.forward {
            if let Err(e) = plugin.before_stringify(cx) {
                warn!(plugin = plugin.name(), error = %e, "before_stringify hook failed");
            }
        }
    }

    pub fn after_stringify(&self, cx: &OpContext<'_>) {
        for plugin in &self.forward {
            if let Err(e) = plugin.after_stringify(cx) {
                warn!(plugin = plugin.name(), error = %e, "after_stringify hook failed");
            }
        }
    }
}
