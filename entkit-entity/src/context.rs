//! Shared collaborators for records and loaders.

use crate::revision::{RevisionCache, RevisionResolver};
use entkit_fields::{FieldAccessor, HandlerRegistry};
use entkit_model::{
    EntityInfo, EntityResult, EntityStorage, MetadataService, ModifiedOracle, UuidService,
    require_entity_info,
};
use std::fmt;
use std::sync::Arc;

/// Everything a record needs to reach outside itself.
///
/// Built once per process (or per unit of work) and shared by reference
/// count; the handler catalog and the revision cache live here rather than
/// in globals.
pub struct EntityContext {
    metadata: Arc<dyn MetadataService>,
    storage: Arc<dyn EntityStorage>,
    registry: Arc<HandlerRegistry>,
    uuid: Option<Arc<dyn UuidService>>,
    modified: Option<Arc<dyn ModifiedOracle>>,
    revision_cache: RevisionCache,
}

impl EntityContext {
    pub fn builder(metadata: Arc<dyn MetadataService>, storage: Arc<dyn EntityStorage>) -> EntityContextBuilder {
        EntityContextBuilder {
            metadata,
            storage,
            registry: None,
            uuid: None,
            modified: None,
        }
    }

    pub fn metadata(&self) -> &dyn MetadataService {
        self.metadata.as_ref()
    }

    pub fn storage(&self) -> &dyn EntityStorage {
        self.storage.as_ref()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn uuid_service(&self) -> Option<&dyn UuidService> {
        self.uuid.as_deref()
    }

    /// Whether the UUID subsystem is active.
    pub fn uuid_active(&self) -> bool {
        self.uuid.is_some()
    }

    pub fn modified_oracle(&self) -> Option<&dyn ModifiedOracle> {
        self.modified.as_deref()
    }

    pub fn revision_cache(&self) -> &RevisionCache {
        &self.revision_cache
    }

    pub fn revisions(&self) -> RevisionResolver<'_> {
        RevisionResolver::new(self)
    }

    pub fn field_accessor(&self) -> FieldAccessor<'_> {
        FieldAccessor::new(self.metadata(), self.storage(), self.registry())
    }

    /// Entity info for `entity_type`, failing with `InvalidType`.
    pub fn entity_info(&self, entity_type: &str) -> EntityResult<Arc<EntityInfo>> {
        require_entity_info(self.metadata(), entity_type)
    }
}

impl fmt::Debug for EntityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityContext")
            .field("registry", &self.registry)
            .field("uuid_active", &self.uuid_active())
            .field("modified_oracle", &self.modified.is_some())
            .field("revision_cache", &self.revision_cache)
            .finish()
    }
}

/// Builder for [`EntityContext`].
pub struct EntityContextBuilder {
    metadata: Arc<dyn MetadataService>,
    storage: Arc<dyn EntityStorage>,
    registry: Option<Arc<HandlerRegistry>>,
    uuid: Option<Arc<dyn UuidService>>,
    modified: Option<Arc<dyn ModifiedOracle>>,
}

impl EntityContextBuilder {
    /// Handler registry used for field decoding. Defaults to an empty one.
    pub fn registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Activates the UUID subsystem.
    pub fn uuid_service(mut self, uuid: Arc<dyn UuidService>) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn modified_oracle(mut self, oracle: Arc<dyn ModifiedOracle>) -> Self {
        self.modified = Some(oracle);
        self
    }

    pub fn build(self) -> Arc<EntityContext> {
        Arc::new(EntityContext {
            metadata: self.metadata,
            storage: self.storage,
            registry: self.registry.unwrap_or_default(),
            uuid: self.uuid,
            modified: self.modified,
            revision_cache: RevisionCache::default(),
        })
    }
}
