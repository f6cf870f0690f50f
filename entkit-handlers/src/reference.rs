use crate::{column, configuration};
use entkit_fields::{FieldCall, FieldValueHandler};
use entkit_model::{EntityId, EntityReference, FieldValue};
use serde_json::Value;

const TYPES: &[(&str, &str)] = &[
    ("entityreference", "reference"),
    ("taxonomy_term_reference", "reference"),
    ("node_reference", "reference"),
    ("user_reference", "reference"),
];

/// Decodes reference fields to [`EntityReference`]s.
///
/// The target entity type is the first extra argument when one is given,
/// otherwise the type the field type conventionally points at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceProvider;

impl ReferenceProvider {
    /// Storage column holding the target id and the default target type.
    fn target(field_type: &str) -> Option<(&'static str, &'static str)> {
        match field_type {
            "entityreference" => Some(("target_id", "node")),
            "taxonomy_term_reference" => Some(("tid", "taxonomy_term")),
            "node_reference" => Some(("nid", "node")),
            "user_reference" => Some(("uid", "user")),
            _ => None,
        }
    }
}

impl FieldValueHandler for ReferenceProvider {
    fn name(&self) -> &str {
        "reference"
    }

    fn configuration(&self) -> Vec<(String, String)> {
        configuration(TYPES)
    }

    fn has_method(&self, method: &str) -> bool {
        method == "reference"
    }

    fn call(&self, method: &str, call: &FieldCall<'_>) -> Option<FieldValue> {
        if method != "reference" {
            return None;
        }
        let (id_column, default_type) = Self::target(call.field_type)?;
        let id = column(call.item, id_column)
            .or_else(|| column(call.item, "value"))
            .and_then(EntityId::from_value)?;
        let entity_type = call
            .args
            .first()
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(default_type);
        Some(FieldValue::Reference(EntityReference::new(entity_type, id)))
    }
}
