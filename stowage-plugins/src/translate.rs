//! Type-tagged translation of values with no JSON representation.
//!
//! A dictionary of named codecs runs at serialization time: the writer tags
//! a matching value by encoding it into an envelope under the `type`
//! concern, the reader finds the tag while parsing and decodes bottom-up.
//! Other concerns sharing the envelope survive untouched.
//!
//! The built-in dictionary handles `bigint` (decimal-string encoding,
//! bit-for-bit round-trip). Consumers register further entries (dates,
//! regexps, whatever their model needs) with [`TranslateEntry`].

use anyhow::anyhow;
use stowage_pipeline::{HookResult, Plugin, PluginDef};
use stowage_types::envelope::{self, Stored};
use stowage_types::{Key, Value, VALUE_KEY};
use tracing::warn;

/// Metadata concern under which the codec name is stored.
pub const TYPE_CONCERN: &str = "type";

/// One named codec of the translation dictionary.
pub struct TranslateEntry {
    /// Tag written into the `type` concern.
    pub name: String,
    /// Whether this entry handles a value.
    pub test: Box<dyn Fn(&Value) -> bool>,
    /// To a JSON-representable form.
    pub encode: Box<dyn Fn(&Value) -> HookResult<Value>>,
    /// Back from the stored form.
    pub decode: Box<dyn Fn(&Value) -> HookResult<Value>>,
}

/// Builds the translate plugin: the built-in `bigint` entry plus any custom
/// ones. Earlier entries win when several match.
pub fn translate_plugin(custom: Vec<TranslateEntry>) -> PluginDef {
    let mut entries = vec![bigint_entry()];
    entries.extend(custom);
    PluginDef::spec(TranslatePlugin { entries })
}

fn bigint_entry() -> TranslateEntry {
    TranslateEntry {
        name: "bigint".to_string(),
        test: Box::new(|v| matches!(v, Value::BigInt(_))),
        encode: Box::new(|v| match v.as_bigint() {
            Some(i) => Ok(Value::String(i.to_string())),
            None => Err(anyhow!("bigint codec applied to a non-bigint value")),
        }),
        decode: Box::new(|v| match v.as_str() {
            Some(s) => Ok(Value::BigInt(s.parse::<i128>()?)),
            None => Err(anyhow!("bigint payload must be a decimal string")),
        }),
    }
}

struct TranslatePlugin {
    entries: Vec<TranslateEntry>,
}

impl Plugin for TranslatePlugin {
    fn name(&self) -> &str {
        "translate"
    }

    fn writer(&self, _holder: &Value, _key: &Key, value: Value) -> HookResult<Value> {
        for entry in &self.entries {
            if (entry.test)(&value) {
                let encoded = (entry.encode)(&value)?;
                return Ok(envelope::wrap(
                    encoded,
                    TYPE_CONCERN,
                    Value::from(entry.name.as_str()),
                ));
            }
        }
        Ok(value)
    }

    fn reader(&self, _holder: &Value, _key: &Key, value: Value) -> HookResult<Value> {
        let Some(tag) = envelope::concern(&value, TYPE_CONCERN) else {
            return Ok(value);
        };
        let Some(name) = tag.as_str() else {
            return Ok(value);
        };
        let Some(entry) = self.entries.iter().find(|e| e.name == name) else {
            warn!(codec = name, "no translate entry for stored type tag");
            return Ok(value);
        };
        let decoded = (entry.decode)(&envelope::unwrap(value.clone()))?;

        let remainder = envelope::strip_concern(&value, TYPE_CONCERN);
        match Stored::classify(&remainder) {
            // Other concerns share the envelope; swap the decoded value in
            // under them.
            Stored::Annotated { .. } => {
                remainder.set_entry(&Key::Name(VALUE_KEY.to_string()), decoded);
                Ok(remainder)
            }
            Stored::Plain(_) => Ok(decoded),
        }
    }
}
