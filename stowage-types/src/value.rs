//! The in-memory value tree.
//!
//! [`Value`] is JSON-shaped but carries two deliberate deviations from
//! `serde_json::Value`:
//!
//! - Containers are `Rc<RefCell<..>>`, so clones of an object or array alias
//!   the same storage. Nested mutation through a wrapper handle is visible to
//!   every other handle over the same container, and container identity
//!   ([`Value::ptr_id`]) is stable — both are required by the path-tracked
//!   node tree.
//! - `Undefined` is a first-class variant, distinct from `Null`. An absent
//!   field reads as `Undefined`; a stored JSON `null` reads as `Null`.
//!
//! `BigInt` exists for codec plugins: it is not JSON-representable and the
//! default codec rejects it, the same way `JSON.stringify` throws on a
//! bigint. The translate plugin round-trips it through a tagged envelope.

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::path::Key;

/// Insertion-ordered map used for object fields.
pub type Map = IndexMap<String, Value>;

/// A value in the store's in-memory tree.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent. Never stored; serializing a root-level `Undefined` removes
    /// the backing entry instead.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Arbitrary-precision integer (up to i128). Not JSON-representable.
    BigInt(i128),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Map>>),
}

impl Value {
    /// Creates an empty object.
    #[must_use]
    pub fn object() -> Self {
        Value::Object(Rc::new(RefCell::new(Map::new())))
    }

    /// Creates an empty array.
    #[must_use]
    pub fn array() -> Self {
        Value::Array(Rc::new(RefCell::new(Vec::new())))
    }

    /// Creates an object from `(name, value)` pairs.
    pub fn object_from<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map: Map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Object(Rc::new(RefCell::new(map)))
    }

    /// Creates an array from values.
    pub fn array_from<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// True for objects and arrays — the node kinds the tree wraps.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bigint(&self) -> Option<i128> {
        match self {
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Stable identity of the underlying container storage, if any.
    ///
    /// Two `Value`s with the same `ptr_id` alias the same object or array.
    #[must_use]
    pub fn ptr_id(&self) -> Option<usize> {
        match self {
            Value::Array(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as usize),
            _ => None,
        }
    }

    /// True when both values are containers aliasing the same storage.
    #[must_use]
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self.ptr_id(), other.ptr_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Reads a field/element. Non-containers and missing entries yield
    /// `Undefined`.
    #[must_use]
    pub fn get(&self, key: &Key) -> Value {
        match (self, key) {
            (Value::Object(map), Key::Name(name)) => {
                map.borrow().get(name.as_str()).cloned().unwrap_or_default()
            }
            (Value::Object(map), Key::Index(i)) => map
                .borrow()
                .get(i.to_string().as_str())
                .cloned()
                .unwrap_or_default(),
            (Value::Array(items), Key::Index(i)) => {
                items.borrow().get(*i).cloned().unwrap_or_default()
            }
            (Value::Array(items), Key::Name(name)) => match name.parse::<usize>() {
                Ok(i) => items.borrow().get(i).cloned().unwrap_or_default(),
                Err(_) => Value::Undefined,
            },
            _ => Value::Undefined,
        }
    }

    /// Writes a field/element in place. Returns false when the target is not
    /// a container or the key does not address it (e.g. a name on an array).
    ///
    /// Array writes past the end pad the gap with `Null`, matching how JSON
    /// serializes sparse arrays.
    pub fn set_entry(&self, key: &Key, value: Value) -> bool {
        match (self, key) {
            (Value::Object(map), Key::Name(name)) => {
                map.borrow_mut().insert(name.clone(), value);
                true
            }
            (Value::Object(map), Key::Index(i)) => {
                map.borrow_mut().insert(i.to_string(), value);
                true
            }
            (Value::Array(items), Key::Index(i)) => {
                let mut items = items.borrow_mut();
                if *i < items.len() {
                    items[*i] = value;
                } else {
                    while items.len() < *i {
                        items.push(Value::Null);
                    }
                    items.push(value);
                }
                true
            }
            (Value::Array(_), Key::Name(name)) => match name.parse::<usize>() {
                Ok(i) => self.set_entry(&Key::Index(i), value),
                Err(_) => false,
            },
            _ => false,
        }
    }

    /// Removes a field/element in place. Array removal splices (shifts later
    /// elements down). Returns true iff an entry was removed.
    pub fn remove_entry(&self, key: &Key) -> bool {
        match (self, key) {
            (Value::Object(map), Key::Name(name)) => {
                map.borrow_mut().shift_remove(name.as_str()).is_some()
            }
            (Value::Object(map), Key::Index(i)) => map
                .borrow_mut()
                .shift_remove(i.to_string().as_str())
                .is_some(),
            (Value::Array(items), Key::Index(i)) => {
                let mut items = items.borrow_mut();
                if *i < items.len() {
                    items.remove(*i);
                    true
                } else {
                    false
                }
            }
            (Value::Array(_), Key::Name(name)) => match name.parse::<usize>() {
                Ok(i) => self.remove_entry(&Key::Index(i)),
                Err(_) => false,
            },
            _ => false,
        }
    }

    /// True iff the container currently holds an entry for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        match (self, key) {
            (Value::Object(map), Key::Name(name)) => map.borrow().contains_key(name.as_str()),
            (Value::Object(map), Key::Index(i)) => {
                map.borrow().contains_key(i.to_string().as_str())
            }
            (Value::Array(items), Key::Index(i)) => *i < items.borrow().len(),
            (Value::Array(items), Key::Name(name)) => match name.parse::<usize>() {
                Ok(i) => i < items.borrow().len(),
                Err(_) => false,
            },
            _ => false,
        }
    }

    /// Keys of a container in iteration order. Empty for non-containers.
    #[must_use]
    pub fn entry_keys(&self) -> Vec<Key> {
        match self {
            Value::Object(map) => map
                .borrow()
                .keys()
                .map(|k| Key::Name(k.clone()))
                .collect(),
            Value::Array(items) => (0..items.borrow().len()).map(Key::Index).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of entries of a container.
    #[must_use]
    pub fn entry_len(&self) -> usize {
        match self {
            Value::Object(map) => map.borrow().len(),
            Value::Array(items) => items.borrow().len(),
            _ => 0,
        }
    }

    /// Recursively copies the tree into fresh containers.
    ///
    /// Cycles are not followed; a container encountered twice on one branch
    /// is replaced by `Undefined` in the copy.
    #[must_use]
    pub fn deep_clone(&self) -> Value {
        fn go(value: &Value, seen: &mut Vec<usize>) -> Value {
            match value {
                Value::Array(items) => {
                    let id = Rc::as_ptr(items) as usize;
                    if seen.contains(&id) {
                        return Value::Undefined;
                    }
                    seen.push(id);
                    let copy = items.borrow().iter().map(|v| go(v, seen)).collect();
                    seen.pop();
                    Value::Array(Rc::new(RefCell::new(copy)))
                }
                Value::Object(map) => {
                    let id = Rc::as_ptr(map) as usize;
                    if seen.contains(&id) {
                        return Value::Undefined;
                    }
                    seen.push(id);
                    let copy = map
                        .borrow()
                        .iter()
                        .map(|(k, v)| (k.clone(), go(v, seen)))
                        .collect();
                    seen.pop();
                    Value::Object(Rc::new(RefCell::new(copy)))
                }
                other => other.clone(),
            }
        }
        go(self, &mut Vec::new())
    }
}

impl PartialEq for Value {
    /// Deep structural equality. Containers compare element-wise; aliased
    /// containers short-circuit equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::BigInt(i) => write!(f, "{i}n"),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(map) => f.debug_map().entries(map.borrow().iter()).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(Number::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::from(i))
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Number(Number::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Number(Number::from(i))
    }
}

impl From<f64> for Value {
    /// Non-finite floats become `Null`, the way JSON serializes them.
    fn from(v: f64) -> Self {
        Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::BigInt(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::array_from(items.into_iter().map(Value::from))
            }
            serde_json::Value::Object(map) => {
                Value::object_from(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl Serialize for Value {
    /// Serializes as JSON shape: `Undefined` members of objects are
    /// skipped, `Undefined` elsewhere becomes null. `BigInt` is rejected —
    /// use the translate plugin to tag it first.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::BigInt(_) => Err(S::Error::custom("bigint is not JSON-serializable")),
            Value::Array(items) => {
                let items = items.borrow();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let map = map.borrow();
                let mut out = serializer.serialize_map(None)?;
                for (k, v) in map.iter() {
                    if v.is_undefined() {
                        continue;
                    }
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
