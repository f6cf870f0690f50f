use crate::number::integer;
use crate::{column, configuration};
use entkit_fields::{FieldCall, FieldValueHandler};
use entkit_model::{FieldValue, is_blank, scalar_string};
use serde_json::Value;

/// Decodes `list_boolean` items to `true`/`false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanProvider;

impl FieldValueHandler for BooleanProvider {
    fn name(&self) -> &str {
        "boolean"
    }

    fn configuration(&self) -> Vec<(String, String)> {
        configuration(&[("list_boolean", "boolean")])
    }

    fn has_method(&self, method: &str) -> bool {
        method == "boolean"
    }

    fn call(&self, method: &str, call: &FieldCall<'_>) -> Option<FieldValue> {
        if method != "boolean" {
            return None;
        }
        let value = column(call.item, "value")?;
        Some(FieldValue::Scalar(Value::Bool(!is_blank(value))))
    }
}

/// Decodes list fields to their selected key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListProvider;

impl FieldValueHandler for ListProvider {
    fn name(&self) -> &str {
        "list"
    }

    fn configuration(&self) -> Vec<(String, String)> {
        configuration(&[("list_text", "text_key"), ("list_integer", "integer_key")])
    }

    fn has_method(&self, method: &str) -> bool {
        matches!(method, "text_key" | "integer_key")
    }

    fn call(&self, method: &str, call: &FieldCall<'_>) -> Option<FieldValue> {
        let value = column(call.item, "value")?;
        match method {
            "text_key" => Some(FieldValue::Scalar(Value::String(scalar_string(value)))),
            "integer_key" => integer(value).map(|key| FieldValue::Scalar(Value::from(key))),
            _ => None,
        }
    }
}
