//! The tagged metadata envelope.
//!
//! Value-annotating plugins (expiry, type tags, arbitrary user extras)
//! attach side-channel metadata to a stored value without polluting its
//! shape by wrapping it:
//!
//! ```json
//! { "__s_meta": { "expires": 1735689600000, "type": "bigint" }, "value": ... }
//! ```
//!
//! One shared metadata object lives under the single marker key
//! [`META_KEY`]; each concern owns a disjoint sub-key inside it. Rewriting
//! or stripping one concern never disturbs another, and unwrapping is
//! lossless.
//!
//! A raw value is statically either [`Stored::Plain`] or
//! [`Stored::Annotated`]; plugin boundaries pattern-match on the
//! classification instead of probing shapes ad hoc.

use crate::path::Key;
use crate::value::Value;

/// Marker key of an envelope's metadata object.
pub const META_KEY: &str = "__s_meta";

/// Key of an envelope's inner value.
pub const VALUE_KEY: &str = "value";

/// Classification of a raw value at a plugin boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Stored {
    /// An ordinary value, no metadata attached.
    Plain(Value),
    /// An envelope: shared metadata object plus the inner value.
    Annotated { meta: Value, value: Value },
}

impl Stored {
    /// Classifies a raw value. A value is annotated iff it is an object
    /// carrying both [`META_KEY`] (itself an object) and [`VALUE_KEY`].
    #[must_use]
    pub fn classify(value: &Value) -> Stored {
        if let Value::Object(_) = value {
            let meta = value.get(&Key::Name(META_KEY.to_string()));
            if meta.is_object() && value.contains_key(&Key::Name(VALUE_KEY.to_string())) {
                return Stored::Annotated {
                    meta,
                    value: value.get(&Key::Name(VALUE_KEY.to_string())),
                };
            }
        }
        Stored::Plain(value.clone())
    }

    /// The inner value either way.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Stored::Plain(value) | Stored::Annotated { value, .. } => value,
        }
    }
}

/// True iff `value` is an envelope.
#[must_use]
pub fn is_annotated(value: &Value) -> bool {
    matches!(Stored::classify(value), Stored::Annotated { .. })
}

/// Wraps `value` in an envelope carrying `concern => data`.
///
/// If `value` is already an envelope its metadata is copied and merged, so
/// wrapping concern A over an envelope holding concern B yields one envelope
/// with both — never nested envelopes.
#[must_use]
pub fn wrap(value: Value, concern: &str, data: Value) -> Value {
    let (meta, inner) = match Stored::classify(&value) {
        Stored::Annotated { meta, value } => (meta.deep_clone(), value),
        Stored::Plain(value) => (Value::object(), value),
    };
    meta.set_entry(&Key::Name(concern.to_string()), data);
    Value::object_from([(META_KEY, meta), (VALUE_KEY, inner)])
}

/// The inner value of an envelope, or the value itself when plain.
#[must_use]
pub fn unwrap(value: Value) -> Value {
    Stored::classify(&value).into_value()
}

/// Metadata for one concern of an annotated value.
#[must_use]
pub fn concern(value: &Value, concern: &str) -> Option<Value> {
    match Stored::classify(value) {
        Stored::Annotated { meta, .. } => {
            let data = meta.get(&Key::Name(concern.to_string()));
            (!data.is_undefined()).then_some(data)
        }
        Stored::Plain(_) => None,
    }
}

/// Side-channel read: metadata for one concern of the raw child
/// `container[key]`, without unwrapping it.
#[must_use]
pub fn concern_of(container: &Value, key: &Key, name: &str) -> Option<Value> {
    concern(&container.get(key), name)
}

/// Returns `value` with one concern removed. When that was the last concern
/// the envelope dissolves and the inner value is returned plain.
///
/// The input envelope is not mutated.
#[must_use]
pub fn strip_concern(value: &Value, name: &str) -> Value {
    match Stored::classify(value) {
        Stored::Annotated { meta, value: inner } => {
            let meta = meta.deep_clone();
            meta.remove_entry(&Key::Name(name.to_string()));
            if meta.entry_len() == 0 {
                inner
            } else {
                Value::object_from([(META_KEY, meta), (VALUE_KEY, inner)])
            }
        }
        Stored::Plain(plain) => plain,
    }
}
