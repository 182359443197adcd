use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Accept only JSON objects as patches.
pub(crate) fn as_object(patch: Value) -> Result<Map<String, Value>> {
    match patch {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidPatch(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Shallow merge: every key in `patch` overwrites (or adds) the same key of
/// `current`'s serialized form, then the result is decoded back into `T`.
/// Nested objects such as `metadata` are replaced wholesale, so a key left out
/// of a full replacement is deleted.
pub(crate) fn merge<T>(current: &T, patch: &Map<String, Value>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut object = match serde_json::to_value(current)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in patch {
        object.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(object)).map_err(|e| Error::InvalidPatch(e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
