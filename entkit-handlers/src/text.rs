use crate::{column, configuration};
use entkit_fields::{FieldCall, FieldValueHandler};
use entkit_model::{FieldValue, scalar_string};
use serde_json::Value;

const TYPES: &[(&str, &str)] = &[
    ("text", "text"),
    ("text_long", "text"),
    ("text_with_summary", "text"),
];

/// Decodes text fields to their `value` column, keeping `summary` and
/// `format` when stored. Empty text has no value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextProvider;

impl FieldValueHandler for TextProvider {
    fn name(&self) -> &str {
        "text"
    }

    fn configuration(&self) -> Vec<(String, String)> {
        configuration(TYPES)
    }

    fn has_method(&self, method: &str) -> bool {
        method == "text"
    }

    fn call(&self, method: &str, call: &FieldCall<'_>) -> Option<FieldValue> {
        if method != "text" {
            return None;
        }
        let value = column(call.item, "value").map(scalar_string)?;
        if value.is_empty() {
            return None;
        }
        Some(FieldValue::Text {
            value,
            summary: optional_text(call.item, "summary"),
            format: optional_text(call.item, "format"),
        })
    }
}

fn optional_text(item: &Value, name: &str) -> Option<String> {
    column(item, name)
        .map(scalar_string)
        .filter(|s| !s.is_empty())
}
