use crate::{column, configuration};
use entkit_fields::{FieldCall, FieldValueHandler};
use entkit_model::FieldValue;
use serde_json::Value;

const TYPES: &[(&str, &str)] = &[
    ("number_integer", "integer"),
    ("number_decimal", "decimal"),
    ("number_float", "float"),
];

/// Decodes numeric fields. Integers and floats become JSON numbers;
/// decimals stay strings so their scale survives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberProvider;

impl FieldValueHandler for NumberProvider {
    fn name(&self) -> &str {
        "number"
    }

    fn configuration(&self) -> Vec<(String, String)> {
        configuration(TYPES)
    }

    fn has_method(&self, method: &str) -> bool {
        matches!(method, "integer" | "decimal" | "float")
    }

    fn call(&self, method: &str, call: &FieldCall<'_>) -> Option<FieldValue> {
        let value = column(call.item, "value")?;
        let decoded = match method {
            "integer" => Value::from(integer(value)?),
            "float" => serde_json::Number::from_f64(float(value)?).map(Value::Number)?,
            "decimal" => {
                float(value)?;
                match value {
                    Value::String(s) => Value::String(s.trim().to_string()),
                    other => Value::String(other.to_string()),
                }
            }
            _ => return None,
        };
        Some(FieldValue::Scalar(decoded))
    }
}

pub(crate) fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
