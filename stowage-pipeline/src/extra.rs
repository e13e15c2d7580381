//! User-facing metadata helpers and the built-in envelope unwrapper.
//!
//! The store appends [`ExtraPlugin`] after every user plugin, so on the
//! reversed getter chain it runs first: user getters always see the inner
//! value of an annotated field, while the envelope itself stays intact in
//! the raw tree (and therefore in the serialized form).

use stowage_types::envelope::{self, Stored};
use stowage_types::{Key, Value};

use crate::context::OpContext;
use crate::plugin::{HookResult, Plugin};

/// Attaches arbitrary metadata concerns to a value before assignment.
///
/// Wrapping an already-annotated value merges into its shared metadata map.
pub fn use_extra<K: Into<String>>(
    value: Value,
    extras: impl IntoIterator<Item = (K, Value)>,
) -> Value {
    extras
        .into_iter()
        .fold(value, |v, (concern, data)| envelope::wrap(v, &concern.into(), data))
}

/// The full metadata map of the raw child `container[key]`, if annotated.
#[must_use]
pub fn get_extra(container: &Value, key: &Key) -> Option<Value> {
    match Stored::classify(&container.get(key)) {
        Stored::Annotated { meta, .. } => Some(meta),
        Stored::Plain(_) => None,
    }
}

/// Built-in getter that unwraps annotated values on access.
pub struct ExtraPlugin;

impl Plugin for ExtraPlugin {
    fn name(&self) -> &str {
        "extra"
    }

    fn getter(
        &self,
        _cx: &OpContext<'_>,
        _target: &Value,
        _key: &Key,
        value: Value,
    ) -> HookResult<Value> {
        Ok(envelope::unwrap(value))
    }
}
