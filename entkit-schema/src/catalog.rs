//! In-memory metadata catalog.

use crate::config::EntkitConfig;
use crate::error::{SchemaError, SchemaResult};
use entkit_model::{EntityInfo, FieldInfo, FieldInstanceInfo, MetadataService};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A [`MetadataService`] over a fixed set of entity types and fields.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entity_types: BTreeMap<String, Arc<EntityInfo>>,
    fields: BTreeMap<String, FieldInfo>,
    instances: Vec<FieldInstanceInfo>,
}

impl SchemaCatalog {
    pub fn builder() -> SchemaCatalogBuilder {
        SchemaCatalogBuilder::default()
    }

    /// Builds the catalog from the entity and field sections of `config`.
    ///
    /// Fields without an explicit id are numbered after the highest
    /// explicit id, in field name order.
    pub fn from_config(config: &EntkitConfig) -> SchemaResult<Self> {
        config.validate()?;
        let mut builder = Self::builder();
        for (name, entity_type) in &config.entity_types {
            let mut info = EntityInfo::new(name, &entity_type.base_table, entity_type.keys.clone())
                .with_bundles(entity_type.bundles.iter().cloned());
            info.revision_table = entity_type.revision_table.clone();
            builder = builder.entity_type(info);
        }

        let mut next_id = config.fields.values().filter_map(|f| f.id).max().unwrap_or(0) + 1;
        for (name, field) in &config.fields {
            let field_id = field.id.unwrap_or_else(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            builder = builder.field(FieldInfo {
                field_name: name.clone(),
                field_type: field.field_type.clone(),
                field_id: Some(field_id),
                cardinality: field.cardinality,
            });
            for instance in &field.instances {
                let bundle = instance.bundle.as_deref().unwrap_or(&instance.entity_type);
                builder = builder.instance_with_label(&instance.entity_type, name, bundle, instance.label.clone());
            }
        }
        builder.build()
    }
}

impl MetadataService for SchemaCatalog {
    fn entity_info(&self, entity_type: &str) -> Option<Arc<EntityInfo>> {
        self.entity_types.get(entity_type).cloned()
    }

    fn entity_types(&self) -> Vec<String> {
        self.entity_types.keys().cloned().collect()
    }

    fn field_info(&self, field_name: &str) -> Option<FieldInfo> {
        self.fields.get(field_name).cloned()
    }

    fn field_instance_info(&self, entity_type: &str, field_name: &str, bundle: &str) -> Option<FieldInstanceInfo> {
        self.instances
            .iter()
            .find(|i| i.entity_type == entity_type && i.field_name == field_name && i.bundle == bundle)
            .cloned()
    }

    fn field_instances(&self, entity_type: &str, bundle: &str) -> Vec<String> {
        self.instances
            .iter()
            .filter(|i| i.entity_type == entity_type && i.bundle == bundle)
            .map(|i| i.field_name.clone())
            .collect()
    }
}

/// Builder for [`SchemaCatalog`].
#[derive(Debug, Default)]
pub struct SchemaCatalogBuilder {
    entity_types: Vec<EntityInfo>,
    fields: Vec<FieldInfo>,
    instances: Vec<(String, String, String, Option<String>)>,
}

impl SchemaCatalogBuilder {
    /// Declares an entity type.
    pub fn entity_type(mut self, info: EntityInfo) -> Self {
        self.entity_types.push(info);
        self
    }

    /// Declares a field.
    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Attaches `field_name` to `bundle` of `entity_type`.
    pub fn instance(self, entity_type: &str, field_name: &str, bundle: &str) -> Self {
        self.instance_with_label(entity_type, field_name, bundle, None)
    }

    fn instance_with_label(mut self, entity_type: &str, field_name: &str, bundle: &str, label: Option<String>) -> Self {
        self.instances
            .push((entity_type.into(), field_name.into(), bundle.into(), label));
        self
    }

    /// Validates cross references and builds the catalog.
    pub fn build(self) -> SchemaResult<SchemaCatalog> {
        let entity_types: BTreeMap<String, Arc<EntityInfo>> = self
            .entity_types
            .into_iter()
            .map(|info| (info.entity_type.clone(), Arc::new(info)))
            .collect();
        let fields: BTreeMap<String, FieldInfo> = self
            .fields
            .into_iter()
            .map(|field| (field.field_name.clone(), field))
            .collect();

        let mut instances = Vec::with_capacity(self.instances.len());
        for (entity_type, field_name, bundle, label) in self.instances {
            if !entity_types.contains_key(&entity_type) {
                return Err(SchemaError::Invalid(format!(
                    "field {field_name} is attached to unknown entity type {entity_type}"
                )));
            }
            let Some(field) = fields.get(&field_name) else {
                return Err(SchemaError::Invalid(format!("instance of undeclared field {field_name}")));
            };
            instances.push(FieldInstanceInfo {
                field_name,
                entity_type,
                bundle,
                field_id: field.field_id,
                label,
            });
        }

        Ok(SchemaCatalog {
            entity_types,
            fields,
            instances,
        })
    }
}
