//! Decoded field values.

use crate::ids::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A pointer from a field item to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    pub entity_type: String,
    pub entity_id: EntityId,
}

impl EntityReference {
    pub fn new(entity_type: &str, entity_id: EntityId) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

/// One decoded field item, as produced by a field value handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// A plain scalar (number, boolean, list key, ...).
    Scalar(Value),
    /// Text with its optional summary and input format.
    Text {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    /// A reference to another entity.
    Reference(EntityReference),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
            summary: None,
            format: None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text { value, .. } => Some(value),
            Self::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Scalar(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&EntityReference> {
        match self {
            Self::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// The value's plain JSON form (text without summary/format, references
    /// as `{entity_type, entity_id}`).
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Text { value, .. } => Value::String(value.clone()),
            Self::Reference(r) => serde_json::json!({
                "entity_type": r.entity_type,
                "entity_id": r.entity_id.get(),
            }),
        }
    }
}

/// Decoded values of one field, indexed by the item's delta.
///
/// Items a handler declined to decode leave a hole, so deltas are not
/// necessarily contiguous. A collection is never handed out empty: the
/// accessor reports an empty or all-null result as "no values" instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValueCollection {
    items: BTreeMap<usize, FieldValue>,
}

impl FieldValueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the decoded value for `delta`; `None` leaves a hole.
    pub fn set(&mut self, delta: usize, value: Option<FieldValue>) {
        match value {
            Some(value) => {
                self.items.insert(delta, value);
            }
            None => {
                self.items.remove(&delta);
            }
        }
    }

    pub fn get(&self, delta: usize) -> Option<&FieldValue> {
        self.items.get(&delta)
    }

    /// The value at the lowest delta.
    pub fn first(&self) -> Option<&FieldValue> {
        self.items.values().next()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn deltas(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FieldValue)> {
        self.items.iter().map(|(delta, value)| (*delta, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.items.values()
    }

    /// `None` when the collection holds no values.
    pub fn into_non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// JSON array of the values in delta order.
    pub fn to_json(&self) -> Value {
        Value::Array(self.values().map(FieldValue::to_json).collect())
    }
}

impl FromIterator<(usize, FieldValue)> for FieldValueCollection {
    fn from_iter<T: IntoIterator<Item = (usize, FieldValue)>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FieldValueCollection {
    type Item = (usize, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<usize, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
