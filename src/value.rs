//! Fact values: dynamically typed, JSON-shaped.
//!
//! Beliefs, world variables and message payloads all carry a [`Value`].
//! The helpers here give the kernel a single definition of truthiness and
//! ordering so that rule conditions and plan preconditions agree.

use std::cmp::Ordering;
use std::collections::BTreeMap;

pub use serde_json::Value;

/// A set of named facts, ordered by key for deterministic iteration.
pub type Facts = BTreeMap<String, Value>;

/// Whether a value counts as "holding".
///
/// `false`, `null`, zero, the empty string and empty collections are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Order two values of the same scalar kind.
///
/// Numbers compare numerically, strings lexically, booleans `false < true`.
/// Mixed kinds and non-scalars have no order and yield `None`.
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Equality with numeric normalisation (`1` equals `1.0`).
pub fn loosely_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

/// Plain-text rendering of a scalar, used for `key=value` predicates.
///
/// Returns `None` for null, arrays and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
