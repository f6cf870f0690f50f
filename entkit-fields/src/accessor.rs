//! Field accessor: field name on a raw record to decoded values.

use crate::items::field_items;
use crate::registry::{FieldCall, HandlerRegistry};
use entkit_model::{
    EntityId, EntityInfo, EntityKey, EntityStorage, FieldInfo, FieldInstanceInfo, FieldSelector,
    FieldValueCollection, MetadataService, RawRecord, scalar_string,
};
use serde_json::Value;
use tracing::debug;

/// Outcome of a field lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLookup {
    /// The field decoded to at least one value.
    Values(FieldValueCollection),
    /// The field exists and is decodable but holds no values.
    Empty,
    /// The field does not exist on the record's bundle, has no handler, or
    /// has no storage that could be attached.
    NotFound,
}

impl FieldLookup {
    /// True unless the lookup is [`FieldLookup::NotFound`].
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub fn values(&self) -> Option<&FieldValueCollection> {
        match self {
            Self::Values(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_values(self) -> Option<FieldValueCollection> {
        match self {
            Self::Values(values) => Some(values),
            _ => None,
        }
    }
}

/// A single field lookup.
#[derive(Debug, Clone, Copy)]
pub struct FieldRequest<'a> {
    pub field_name: &'a str,
    /// Attach field storage when the record does not carry it yet.
    pub autoload: bool,
    /// Extra arguments passed through to the handler.
    pub args: &'a [Value],
}

impl<'a> FieldRequest<'a> {
    pub fn new(field_name: &'a str) -> Self {
        Self {
            field_name,
            autoload: true,
            args: &[],
        }
    }

    #[must_use]
    pub fn autoload(mut self, autoload: bool) -> Self {
        self.autoload = autoload;
        self
    }

    #[must_use]
    pub fn args(mut self, args: &'a [Value]) -> Self {
        self.args = args;
        self
    }
}

/// Resolves fields against metadata, storage and the handler registry.
pub struct FieldAccessor<'a> {
    metadata: &'a dyn MetadataService,
    storage: &'a dyn EntityStorage,
    registry: &'a HandlerRegistry,
}

impl<'a> FieldAccessor<'a> {
    pub fn new(
        metadata: &'a dyn MetadataService,
        storage: &'a dyn EntityStorage,
        registry: &'a HandlerRegistry,
    ) -> Self {
        Self {
            metadata,
            storage,
            registry,
        }
    }

    /// Looks up and decodes `request.field_name` on `record`.
    ///
    /// May attach the field's storage to `record` in place; the attached
    /// storage stays on the record for later lookups.
    pub fn get(&self, info: &EntityInfo, record: &mut RawRecord, request: &FieldRequest<'_>) -> FieldLookup {
        let name = request.field_name;
        let Some(field) = self.metadata.field_info(name) else {
            return FieldLookup::NotFound;
        };
        let bundle = record_bundle(info, record);
        let Some(instance) = self.metadata.field_instance_info(&info.entity_type, name, &bundle) else {
            return FieldLookup::NotFound;
        };
        let Some(handler) = self.registry.resolve(&field.field_type) else {
            debug!("field {} has undecodable type {}", name, field.field_type);
            return FieldLookup::NotFound;
        };

        if !record.contains_key(name) {
            if !request.autoload {
                return FieldLookup::NotFound;
            }
            if !self.attach(info, record, &field, &instance) || !record.contains_key(name) {
                return FieldLookup::NotFound;
            }
        }

        let language = info
            .key(EntityKey::Language)
            .and_then(|column| record.get(column))
            .map(scalar_string)
            .filter(|lang| !lang.is_empty());
        let Some(items) = field_items(record, name, language.as_deref()) else {
            return FieldLookup::Empty;
        };

        let mut values = FieldValueCollection::new();
        for (delta, item) in items.iter().enumerate() {
            let call = FieldCall {
                field_type: &field.field_type,
                item,
                field_name: name,
                delta,
                args: request.args,
            };
            values.set(delta, handler.invoke(&call));
        }

        match values.into_non_empty() {
            Some(values) => FieldLookup::Values(values),
            None => FieldLookup::Empty,
        }
    }

    /// Attaches the field's storage to `record`. A failure means the record
    /// has nothing stored for the field (typically because it was never
    /// saved), so it is logged and reported as `false`.
    fn attach(&self, info: &EntityInfo, record: &mut RawRecord, field: &FieldInfo, instance: &FieldInstanceInfo) -> bool {
        let Some(id) = info
            .key(EntityKey::Id)
            .and_then(|column| record.get(column))
            .and_then(EntityId::from_value)
        else {
            debug!("record has no id; no stored value for field {}", field.field_name);
            return false;
        };

        let selector = FieldSelector {
            field_name: field.field_name.clone(),
            field_id: instance.field_id.or(field.field_id),
        };
        let mut batch = [(id, &mut *record)];
        match self.storage.load_field_storage(info, &mut batch, &selector) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    "could not attach field {} to {} {}: {}",
                    field.field_name, info.entity_type, id, e
                );
                false
            }
        }
    }
}

/// The record's bundle. Types without a bundle key have a single bundle
/// named after the type.
pub fn record_bundle(info: &EntityInfo, record: &RawRecord) -> String {
    match info.key(EntityKey::Bundle) {
        Some(column) => record.get(column).map(scalar_string).unwrap_or_default(),
        None => info.entity_type.clone(),
    }
}
