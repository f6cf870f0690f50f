//! Standard field value handlers for entkit.
//!
//! Each provider decodes the storage columns of a family of field types:
//!
//! | Provider    | Field types                                                   |
//! |-------------|---------------------------------------------------------------|
//! | `text`      | `text`, `text_long`, `text_with_summary`                      |
//! | `number`    | `number_integer`, `number_decimal`, `number_float`            |
//! | `boolean`   | `list_boolean`                                                |
//! | `list`      | `list_text`, `list_integer`                                   |
//! | `reference` | `entityreference`, `taxonomy_term_reference`, `node_reference`, `user_reference` |
//!
//! Items may be column objects (`{"value": ...}`) or bare scalars.

mod list;
mod number;
mod reference;
mod text;

pub use list::{BooleanProvider, ListProvider};
pub use number::NumberProvider;
pub use reference::ReferenceProvider;
pub use text::TextProvider;

use entkit_fields::{FieldValueHandler, HandlerRegistry};
use serde_json::Value;
use std::sync::Arc;

/// All standard providers, in registration order.
pub fn standard_providers() -> Vec<Arc<dyn FieldValueHandler>> {
    vec![
        Arc::new(TextProvider),
        Arc::new(NumberProvider),
        Arc::new(BooleanProvider),
        Arc::new(ListProvider),
        Arc::new(ReferenceProvider),
    ]
}

/// A registry holding [`standard_providers`].
pub fn standard_registry() -> HandlerRegistry {
    HandlerRegistry::new(standard_providers())
}

/// Reads storage column `name` off an item. Bare scalar items stand for
/// their `value` column.
pub(crate) fn column<'a>(item: &'a Value, name: &str) -> Option<&'a Value> {
    let value = match item {
        Value::Object(columns) => columns.get(name),
        Value::Null | Value::Array(_) => None,
        scalar if name == "value" => Some(scalar),
        _ => None,
    };
    value.filter(|v| !v.is_null())
}

/// Builds a configuration table from static `(field type, method)` pairs.
pub(crate) fn configuration(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(field_type, method)| ((*field_type).to_string(), (*method).to_string()))
        .collect()
}
