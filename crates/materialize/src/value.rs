//! Raw row representation shared by connectors, the normalizer and the factory

use serde_json::Value as JsonValue;

use crate::error::{MaterializeError, MaterializeResult};

/// An untyped row: column or property name to JSON value
pub type Row = serde_json::Map<String, JsonValue>;

/// Bookkeeping key some connectors leave on rows for relation caching.
/// It is never a property or relation of any model.
pub const RELATION_CACHE_KEY: &str = "__cachedRelations";

/// Borrow a JSON value as a row, rejecting scalars and arrays
pub fn as_row<'a>(value: &'a JsonValue, model_name: &str) -> MaterializeResult<&'a Row> {
    value.as_object().ok_or_else(|| {
        MaterializeError::malformed(format!(
            "expected an object row for model '{}', got {}",
            model_name,
            json_kind(value)
        ))
    })
}

/// Loose truthiness: `null`, `false`, zero and `""` are falsy, containers never are
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Short name of a JSON value's kind, for error messages
pub fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
