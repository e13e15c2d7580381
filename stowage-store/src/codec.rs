//! Text codecs.
//!
//! A codec turns one root value into stored text and back, threading every
//! `(holder, key, value)` pair through the pipeline's writer and reader
//! chains on the way.

use stowage_pipeline::Pipeline;
use stowage_types::{Key, Path, Value};

use crate::error::{CodecError, CodecResult};

/// Serialization of one root value.
pub trait Codec {
    /// Serializes `value`. `Ok(None)` means "no representation": the
    /// backing entry should be removed rather than written.
    fn stringify(&self, value: &Value, pipeline: &Pipeline) -> CodecResult<Option<String>>;

    /// Parses stored text back into a value tree.
    fn parse(&self, text: &str, pipeline: &Pipeline) -> CodecResult<Value>;
}

/// The default JSON codec.
///
/// Stringify applies the writer chain top-down, starting with a synthetic
/// top-level pair whose holder is `{ "": value }`, then serializes the
/// transformed copy: `Undefined` object members are omitted, `Undefined`
/// array items become `null`, values with no JSON form (bigint) are
/// rejected, and cycles are detected. The stored tree itself is never
/// mutated.
///
/// Parse revives bottom-up: children first, then each pair through the
/// reader chain, with the synthetic top-level pair last. A member revived to
/// `Undefined` is deleted (array items keep their slot as `Undefined`).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn stringify(&self, value: &Value, pipeline: &Pipeline) -> CodecResult<Option<String>> {
        let top_key = Key::Name(String::new());
        let holder = Value::object_from([("", value.clone())]);
        let top = pipeline.write(&holder, &top_key, value.clone())?;

        let mut path = Path::new();
        let mut on_branch = Vec::new();
        let out = write_walk(top, pipeline, &mut on_branch, &mut path)?;
        if out.is_undefined() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(&out)?))
    }

    fn parse(&self, text: &str, pipeline: &Pipeline) -> CodecResult<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        let root = read_walk(Value::from(json), pipeline)?;

        let top_key = Key::Name(String::new());
        let holder = Value::object_from([("", root.clone())]);
        Ok(pipeline.read(&holder, &top_key, root)?)
    }
}

/// Top-down writer pass producing a transformed copy.
///
/// `on_branch` holds the container identities of the current branch only, so
/// shared (diamond) references serialize fine while true cycles error.
fn write_walk(
    value: Value,
    pipeline: &Pipeline,
    on_branch: &mut Vec<usize>,
    path: &mut Path,
) -> CodecResult<Value> {
    let Some(id) = value.ptr_id() else {
        if value.as_bigint().is_some() {
            return Err(CodecError::UnsupportedValue {
                path: path.to_string(),
            });
        }
        return Ok(value);
    };
    if on_branch.contains(&id) {
        return Err(CodecError::CircularReference {
            path: path.to_string(),
        });
    }
    on_branch.push(id);

    let copy = if value.is_array() {
        Value::array()
    } else {
        Value::object()
    };
    for key in value.entry_keys() {
        let child = pipeline.write(&value, &key, value.get(&key))?;
        path.push(key.clone());
        let child = write_walk(child, pipeline, on_branch, path)?;
        path.pop();
        copy.set_entry(&key, child);
    }

    on_branch.pop();
    Ok(copy)
}

/// Bottom-up reader pass, mutating the freshly parsed tree in place.
fn read_walk(value: Value, pipeline: &Pipeline) -> CodecResult<Value> {
    if value.is_container() {
        for key in value.entry_keys() {
            let child = read_walk(value.get(&key), pipeline)?;
            let revived = pipeline.read(&value, &key, child)?;
            if revived.is_undefined() && !value.is_array() {
                value.remove_entry(&key);
            } else {
                value.set_entry(&key, revived);
            }
        }
    }
    Ok(value)
}
