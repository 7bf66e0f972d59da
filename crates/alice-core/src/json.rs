//! Defensive accessors over loosely-typed JSON objects.
//!
//! The remote service's payloads vary by endpoint and change independently
//! of this codebase, so responses are kept as plain JSON objects and read
//! through these helpers. Every accessor returns `None` on a missing key or
//! a type mismatch; none of them fail.

use serde_json::{Map, Value};

/// A JSON object as returned by the remote service.
pub type JsonObject = Map<String, Value>;

/// Typed, optional field access on a [`JsonObject`].
pub trait JsonObjectExt {
    /// String field, if present and a string.
    fn str_field(&self, key: &str) -> Option<&str>;

    /// String field that is present, a string, and not blank.
    fn non_empty_str(&self, key: &str) -> Option<&str>;

    /// Numeric field as `f64`. Strings holding numbers are NOT coerced.
    fn f64_field(&self, key: &str) -> Option<f64>;

    /// Numeric field as `i32`. Floats are truncated, out-of-range values yield `None`.
    fn i32_field(&self, key: &str) -> Option<i32>;

    /// Nested object field.
    fn object_field(&self, key: &str) -> Option<&JsonObject>;

    /// Array field whose elements are strings. Non-string elements are dropped.
    fn string_list(&self, key: &str) -> Option<Vec<String>>;

    /// Array field whose elements are objects. Non-object elements are dropped.
    fn object_list(&self, key: &str) -> Option<Vec<JsonObject>>;
}

impl JsonObjectExt for JsonObject {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.str_field(key).filter(|s| !s.trim().is_empty())
    }

    fn f64_field(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    fn i32_field(&self, key: &str) -> Option<i32> {
        let value = self.get(key)?;
        if let Some(i) = value.as_i64() {
            return i32::try_from(i).ok();
        }
        let f = value.as_f64()?;
        if f.is_finite() && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
            Some(f.trunc() as i32)
        } else {
            None
        }
    }

    fn object_field(&self, key: &str) -> Option<&JsonObject> {
        self.get(key).and_then(Value::as_object)
    }

    fn string_list(&self, key: &str) -> Option<Vec<String>> {
        let items = self.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }

    fn object_list(&self, key: &str) -> Option<Vec<JsonObject>> {
        let items = self.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
        )
    }
}

/// Convert a decoded JSON value into an object.
///
/// `null` (an empty 2xx body decodes to it) becomes an empty object; any
/// other non-object value is rejected.
pub fn into_object(value: Value) -> crate::Result<JsonObject> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(JsonObject::new()),
        other => Err(crate::Error::Serialization(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
