//! TOML configuration.
//!
//! ```toml
//! [database]
//! path = "site.db"
//!
//! [logging]
//! filter = "entkit=debug"
//!
//! [uuid]
//! enabled = true
//!
//! [entity_types.node]
//! base_table = "node"
//! revision_table = "node_revision"
//! bundles = ["article", "page"]
//! keys = { id = "nid", bundle = "type", uuid = "uuid", revision = "vid", revision_uuid = "vuuid" }
//!
//! [fields.field_tags]
//! type = "taxonomy_term_reference"
//! instances = [{ entity_type = "node", bundle = "article" }]
//! ```

use crate::error::{SchemaError, SchemaResult};
use entkit_model::{EntityKey, EntityKeySet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Logging defaults, overridden by `RUST_LOG`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Whether the UUID subsystem is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UuidConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// One entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeConfig {
    pub base_table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_table: Option<String>,
    pub keys: EntityKeySet,
    #[serde(default)]
    pub bundles: Vec<String>,
}

/// Attachment of a field to a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInstanceConfig {
    pub entity_type: String,
    /// Defaults to the entity type name for types without bundles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<u32>,
    #[serde(default)]
    pub instances: Vec<FieldInstanceConfig>,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntkitConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub uuid: UuidConfig,
    #[serde(default)]
    pub entity_types: BTreeMap<String, EntityTypeConfig>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

impl EntkitConfig {
    /// Reads and validates a config file.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "loaded schema from {} ({} entity types, {} fields)",
            path.display(),
            config.entity_types.len(),
            config.fields.len()
        );
        Ok(config)
    }

    /// Parses and validates a config document.
    pub fn from_toml_str(content: &str) -> SchemaResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every entity type has a base table and an id key, and
    /// that every field instance names a declared entity type.
    pub fn validate(&self) -> SchemaResult<()> {
        for (name, entity_type) in &self.entity_types {
            if entity_type.base_table.trim().is_empty() {
                return Err(SchemaError::Invalid(format!("entity type {name} has no base table")));
            }
            if !entity_type.keys.supports(EntityKey::Id) {
                return Err(SchemaError::Invalid(format!("entity type {name} has no id key")));
            }
        }
        for (field_name, field) in &self.fields {
            if field.field_type.trim().is_empty() {
                return Err(SchemaError::Invalid(format!("field {field_name} has no type")));
            }
            for instance in &field.instances {
                if !self.entity_types.contains_key(&instance.entity_type) {
                    return Err(SchemaError::Invalid(format!(
                        "field {field_name} is attached to unknown entity type {}",
                        instance.entity_type
                    )));
                }
            }
        }
        Ok(())
    }
}
