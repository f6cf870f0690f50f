//! The metadata collaborator: which entity types and fields exist.

use crate::error::{EntityError, EntityResult};
use crate::keys::EntityInfo;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Structural description of a field, independent of where it is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub field_name: String,
    /// Declared field type; selects the handler that decodes the field.
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<u64>,
    /// Maximum number of items; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<u32>,
}

impl FieldInfo {
    pub fn new(field_name: &str, field_type: &str) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: field_type.into(),
            field_id: None,
            cardinality: None,
        }
    }
}

/// A field attached to one bundle of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInstanceInfo {
    pub field_name: String,
    pub entity_type: String,
    pub bundle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Describes entity types and their fields.
///
/// Implementations are read-mostly and shared across records, so they must
/// be `Send + Sync`. Returned [`EntityInfo`] values are reference counted so
/// callers can hold them without copying key sets around.
pub trait MetadataService: Send + Sync {
    /// Entity info for `entity_type`, or `None` if the type is unknown.
    fn entity_info(&self, entity_type: &str) -> Option<Arc<EntityInfo>>;

    /// Every known entity type, in a stable order.
    fn entity_types(&self) -> Vec<String>;

    /// Field structure for `field_name`.
    fn field_info(&self, field_name: &str) -> Option<FieldInfo>;

    /// The field's instance on `bundle` of `entity_type`.
    fn field_instance_info(
        &self,
        entity_type: &str,
        field_name: &str,
        bundle: &str,
    ) -> Option<FieldInstanceInfo>;

    /// Names of all fields attached to `bundle` of `entity_type`.
    fn field_instances(&self, entity_type: &str, bundle: &str) -> Vec<String>;
}

/// Looks up `entity_type`, failing with [`EntityError::InvalidType`] when
/// the type is unknown or has no base table.
pub fn require_entity_info(
    metadata: &dyn MetadataService,
    entity_type: &str,
) -> EntityResult<Arc<EntityInfo>> {
    match metadata.entity_info(entity_type) {
        Some(info) if !info.base_table.is_empty() => Ok(info),
        _ => Err(EntityError::InvalidType(entity_type.to_string())),
    }
}
