//! Coercion between `serde_json::Value` and the typed property model.
//!
//! Bareword `true`/`false` map to bool; an integer literal maps to i64;
//! anything with a `.` or exponent maps to f64 (`serde_json` already
//! distinguishes these at parse time via its internal number
//! representation, so we lean on `Number::as_i64`/`as_f64` rather than
//! re-parsing the source text); quoted strings map to string; a
//! homogeneous array of primitives maps to the matching list kind.
//! Nested objects and heterogeneous arrays are recognized by
//! `serde_json` but have no `PropertyKind` to coerce into, so they never
//! match here — that's intentional, not an oversight (see SPEC_FULL §6).

use crate::value::{PropertyKind, TypedValue};
use serde_json::Value;

/// Coerces a JSON text payload into the given schema kind, returning
/// `None` if the text doesn't parse or the value's kind can't coerce.
pub fn parse_and_coerce(json_text: &str, kind: PropertyKind) -> Option<TypedValue> {
    let value: Value = serde_json::from_str(json_text).ok()?;
    coerce(&value, kind)
}

/// Coerces an already-parsed JSON value into the given schema kind.
pub fn coerce(value: &Value, kind: PropertyKind) -> Option<TypedValue> {
    match (kind, value) {
        (PropertyKind::Bool, Value::Bool(b)) => Some(TypedValue::Bool(*b)),
        (PropertyKind::I64, Value::Number(n)) => n.as_i64().map(TypedValue::I64),
        (PropertyKind::F64, Value::Number(n)) => n.as_f64().map(TypedValue::F64),
        (PropertyKind::Str, Value::String(s)) => Some(TypedValue::Str(s.clone())),
        (PropertyKind::BoolList, Value::Array(items)) => {
            coerce_list(items, Value::as_bool).map(TypedValue::BoolList)
        }
        (PropertyKind::I64List, Value::Array(items)) => {
            coerce_list(items, Value::as_i64).map(TypedValue::I64List)
        }
        (PropertyKind::F64List, Value::Array(items)) => {
            coerce_list(items, Value::as_f64).map(TypedValue::F64List)
        }
        (PropertyKind::StrList, Value::Array(items)) => {
            coerce_list(items, |v| v.as_str().map(str::to_string)).map(TypedValue::StrList)
        }
        _ => None,
    }
}

fn coerce_list<T>(
    items: &[Value],
    extract: impl Fn(&Value) -> Option<T>,
) -> Option<Vec<T>> {
    items.iter().map(extract).collect()
}

/// Renders a typed value back out to JSON, the inverse of [`coerce`].
pub fn render(value: &TypedValue) -> Value {
    match value {
        TypedValue::Bool(b) => Value::Bool(*b),
        TypedValue::I64(n) => Value::from(*n),
        TypedValue::F64(n) => Value::from(*n),
        TypedValue::Str(s) => Value::String(s.clone()),
        TypedValue::BoolList(v) => Value::from(v.clone()),
        TypedValue::I64List(v) => Value::from(v.clone()),
        TypedValue::F64List(v) => Value::from(v.clone()),
        TypedValue::StrList(v) => Value::from(v.clone()),
    }
}
