//! Shape-tolerant access to loosely typed JSON.
//!
//! Upstream records and run input both arrive with overlapping, aliased
//! keys. Aliases are declared as ordered key lists and resolved here, so
//! adding one is a change to a table rather than to control flow.

use serde_json::{Map, Value};

/// True for values that count as "not provided": null, empty or
/// whitespace-only strings, empty arrays.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// First non-blank value among `keys`, in order.
pub fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !is_blank(value))
}

/// First non-blank string among `keys`. Numbers are rendered to text.
pub fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(as_text)
}

/// Count lookup. The first alias holding a non-empty value decides: null,
/// `false`, `""` and `0` fall through to the next alias, while a present
/// value that is not numeric yields `None` without consulting later aliases.
pub fn first_number(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let value = keys
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !is_empty_count(value))?;
    coerce_f64(value)
}

fn is_empty_count(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Numeric coercion for counts and settings. Accepts numbers and numeric
/// strings (surrounding whitespace ignored); anything else is `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Whole, non-negative number. Fractions are truncated.
pub fn coerce_u64(value: &Value) -> Option<u64> {
    let n = coerce_f64(value)?;
    (n >= 0.0).then_some(n.trunc() as u64)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A list of strings from either a JSON array or a comma-separated string.
/// Entries are trimmed; empty ones are dropped.
pub fn string_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items.iter().filter_map(as_text).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
