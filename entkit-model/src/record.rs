use serde_json::{Map, Value};

/// A raw record: attribute name to value, as loaded from storage.
///
/// Summary rows, full records and revision rows all share this shape.
/// Field storage is attached under the field's name.
pub type RawRecord = Map<String, Value>;

/// Renders a scalar attribute the way it appears inside identity strings.
///
/// Strings are used verbatim, `null` and `false` render empty.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// True for values a summary row uses to mean "not filled in".
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty() || s == "0",
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
