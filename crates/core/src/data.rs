//! Form data document and dot-path access.
//!
//! Form data is an arbitrary JSON document. Paths are dot-separated keys;
//! a numeric segment indexes into an array (`dependents.0.fullName`).

use serde_json::{Map, Value};

/// The user's in-progress answers.
pub type FormData = Value;

/// An empty form data document (`{}`).
pub fn empty() -> FormData {
    Value::Object(Map::new())
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

/// Look up the value at `path`. Returns `None` for missing keys,
/// out-of-range indices, and traversal through scalars.
pub fn get_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for seg in segments(path) {
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set the value at `path`, creating intermediate objects as needed.
///
/// Returns `false` without modifying anything when the path runs through a
/// scalar or an out-of-range array index.
pub fn set_path(data: &mut Value, path: &str, value: Value) -> bool {
    let segs: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        *data = value;
        return true;
    };

    let mut current = data;
    for seg in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => match seg.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(item) => item,
                None => return false,
            },
            _ => return false,
        };
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Remove and return the value at `path`. Array elements are not removed
/// (indices would shift); only object keys are.
pub fn take_path(data: &mut Value, path: &str) -> Option<Value> {
    let segs: Vec<&str> = segments(path).collect();
    let (last, parents) = segs.split_last()?;

    let mut current = data;
    for seg in parents {
        current = match current {
            Value::Object(map) => map.get_mut(*seg)?,
            Value::Array(items) => items.get_mut(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.remove(*last),
        _ => None,
    }
}

/// JS-style truthiness: `null`, `false`, `0`, `""` are falsy; everything
/// else (including empty objects and arrays) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Partial deep match: every key in `pattern` must be present in `value`
/// with a matching value. Objects match partially, arrays element-wise as
/// partial matches, scalars by equality.
pub fn partial_match(value: &Value, pattern: &Value) -> bool {
    match (value, pattern) {
        (Value::Object(v), Value::Object(p)) => p
            .iter()
            .all(|(k, pv)| v.get(k).map(|vv| partial_match(vv, pv)).unwrap_or(false)),
        (Value::Array(v), Value::Array(p)) => p
            .iter()
            .all(|pv| v.iter().any(|vv| partial_match(vv, pv))),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == pattern,
    }
}

/// Deep-merge `other` into `base`. Objects merge key by key; any other
/// value in `other` replaces the one in `base`.
pub fn deep_merge(base: &mut Value, other: &Value) {
    match (base, other) {
        (Value::Object(b), Value::Object(o)) => {
            for (k, ov) in o {
                match b.get_mut(k) {
                    Some(bv) => deep_merge(bv, ov),
                    None => {
                        b.insert(k.clone(), ov.clone());
                    }
                }
            }
        }
        (b, o) => *b = o.clone(),
    }
}
