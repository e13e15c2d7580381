//! The plugin contract.

use std::rc::Rc;

use stowage_types::{Key, Value};

use crate::context::OpContext;

/// Result type for plugin hooks. Hooks surface arbitrary author errors;
/// the pipeline attributes them to a stage.
pub type HookResult<T> = anyhow::Result<T>;

/// A bundle of optional interception callbacks.
///
/// Every method has a pass-through default, so a plugin implements only the
/// hooks it cares about. Plugins are stateless from the pipeline's point of
/// view; per-instance private state (a scheduler, a dictionary) lives inside
/// the implementing type, created per pipeline via [`PluginDef::factory`].
///
/// Data-transform hooks (`writer`/`reader`/`getter`/`setter`) propagate
/// errors to the caller of the triggering operation. Lifecycle hooks
/// (`before_parse` etc.) are isolated: a failure is logged and the remaining
/// hooks still run.
pub trait Plugin {
    /// Name used in log attribution.
    fn name(&self) -> &str {
        "plugin"
    }

    /// Pre-serialize transform, applied to every `(key, value)` pair while
    /// stringifying. `holder` is the container owning `key`, so a plugin may
    /// inspect sibling fields.
    fn writer(&self, holder: &Value, key: &Key, value: Value) -> HookResult<Value> {
        let _ = (holder, key);
        Ok(value)
    }

    /// Post-deserialize transform, applied bottom-up while parsing.
    fn reader(&self, holder: &Value, key: &Key, value: Value) -> HookResult<Value> {
        let _ = (holder, key);
        Ok(value)
    }

    /// Post-read transform, applied on every field access. `target` is the
    /// raw container; the logical field is `(cx.path(), key)`.
    fn getter(&self, cx: &OpContext<'_>, target: &Value, key: &Key, value: Value) -> HookResult<Value> {
        let _ = (cx, target, key);
        Ok(value)
    }

    /// Pre-write transform, applied during the setter walk before a value
    /// is committed.
    fn setter(&self, cx: &OpContext<'_>, target: &Value, key: &Key, value: Value) -> HookResult<Value> {
        let _ = (cx, target, key);
        Ok(value)
    }

    /// Deletion override. Returning `Some(handled)` stops the chain and
    /// skips the default removal; `None` defers.
    fn delete_property(&self, cx: &OpContext<'_>, target: &Value, key: &Key) -> Option<bool> {
        let _ = (cx, target, key);
        None
    }

    fn before_parse(&self, cx: &OpContext<'_>) -> HookResult<()> {
        let _ = cx;
        Ok(())
    }

    fn after_parse(&self, cx: &OpContext<'_>) -> HookResult<()> {
        let _ = cx;
        Ok(())
    }

    fn before_stringify(&self, cx: &OpContext<'_>) -> HookResult<()> {
        let _ = cx;
        Ok(())
    }

    fn after_stringify(&self, cx: &OpContext<'_>) -> HookResult<()> {
        let _ = cx;
        Ok(())
    }
}

/// A plugin registration: a ready instance shared across pipelines, or a
/// zero-argument factory invoked once per pipeline so each pipeline gets
/// private plugin state.
pub enum PluginDef {
    Spec(Rc<dyn Plugin>),
    Factory(Box<dyn Fn() -> Rc<dyn Plugin>>),
}

impl PluginDef {
    pub fn spec(plugin: impl Plugin + 'static) -> Self {
        PluginDef::Spec(Rc::new(plugin))
    }

    pub fn shared(plugin: Rc<dyn Plugin>) -> Self {
        PluginDef::Spec(plugin)
    }

    pub fn factory(f: impl Fn() -> Rc<dyn Plugin> + 'static) -> Self {
        PluginDef::Factory(Box::new(f))
    }

    pub(crate) fn instantiate(&self) -> Rc<dyn Plugin> {
        match self {
            PluginDef::Spec(plugin) => Rc::clone(plugin),
            PluginDef::Factory(f) => f(),
        }
    }
}
