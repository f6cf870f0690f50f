//! Revision support: capability checks, the latest-revision cache and
//! revision switching.

use crate::context::EntityContext;
use crate::record::EntityRecord;
use entkit_model::{EntityError, EntityId, EntityKey, EntityResult, Identifier, RevisionId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Latest revision ids keyed by `(entity_type, entity_id)`.
///
/// `None` entries record that an entity has no revision rows. Invalidation
/// is coarse: a forced refresh of any entry clears the whole cache.
#[derive(Debug, Default)]
pub struct RevisionCache {
    entries: Mutex<HashMap<(String, EntityId), Option<RevisionId>>>,
}

impl RevisionCache {
    pub fn get(&self, entity_type: &str, id: EntityId) -> Option<Option<RevisionId>> {
        self.lock().get(&(entity_type.to_string(), id)).copied()
    }

    pub fn insert(&self, entity_type: &str, id: EntityId, revision: Option<RevisionId>) {
        self.lock().insert((entity_type.to_string(), id), revision);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, EntityId), Option<RevisionId>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Revision operations over one [`EntityContext`].
#[derive(Debug, Clone, Copy)]
pub struct RevisionResolver<'a> {
    ctx: &'a EntityContext,
}

impl<'a> RevisionResolver<'a> {
    pub fn new(ctx: &'a EntityContext) -> Self {
        Self { ctx }
    }

    /// A type supports revisions when it has a revision table and a
    /// revision key, plus a revision-uuid key while the UUID subsystem is
    /// active.
    pub fn type_supports_revisions(&self, entity_type: &str) -> bool {
        let Some(info) = self.ctx.metadata().entity_info(entity_type) else {
            return false;
        };
        info.revision_table().is_some()
            && info.key(EntityKey::Revision).is_some()
            && (!self.ctx.uuid_active() || info.key(EntityKey::RevisionUuid).is_some())
    }

    /// Latest revision id of `id`, cached per entity.
    ///
    /// `force_refresh` invalidates every cached pointer, not just this one,
    /// even when `entity_type` has no revisions.
    /// Storage failures are logged and not cached.
    pub fn latest_revision_id(&self, entity_type: &str, id: EntityId, force_refresh: bool) -> Option<RevisionId> {
        let cache = self.ctx.revision_cache();
        if force_refresh {
            debug!("clearing {} cached revision pointers", cache.len());
            cache.clear();
        }
        if !self.type_supports_revisions(entity_type) {
            return None;
        }
        if !force_refresh && let Some(cached) = cache.get(entity_type, id) {
            return cached;
        }

        let info = self.ctx.metadata().entity_info(entity_type)?;
        match self.ctx.storage().latest_revision_id(&info, id) {
            Ok(latest) => {
                cache.insert(entity_type, id, latest);
                latest
            }
            Err(e) => {
                warn!("latest revision of {} {} unavailable: {}", entity_type, id, e);
                None
            }
        }
    }

    /// Switches `record` to the revision identified by `revision`.
    ///
    /// Returns `Ok(false)` and leaves the record untouched when no matching
    /// revision row exists, which includes numbers that are not revision
    /// ids (`"-3"`, `"1.5"`).
    pub fn set_revision(&self, record: &mut EntityRecord, revision: &Identifier) -> EntityResult<bool> {
        let entity_type = record.entity_type().to_string();
        let info = self.ctx.entity_info(&entity_type)?;
        if !self.type_supports_revisions(&entity_type) {
            return Err(EntityError::UnsupportedOperation(format!(
                "{entity_type} does not support revisions"
            )));
        }
        if !revision.is_numeric() && !self.ctx.uuid_active() {
            if revision.is_number_like() {
                debug!("{} has no revision {}", entity_type, revision);
                return Ok(false);
            }
            return Err(EntityError::InvalidIdentifier(format!(
                "revision {revision} is not numeric and uuid support is inactive"
            )));
        }
        let Some(id) = record.id() else {
            return Ok(false);
        };

        let row = match self.ctx.storage().load_revision_row(&info, id, revision) {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!("{} {} has no revision {}", entity_type, id, revision);
                return Ok(false);
            }
            Err(e) => {
                warn!("revision {} of {} {} unavailable: {}", revision, entity_type, id, e);
                return Ok(false);
            }
        };
        record.apply_revision_row(row);
        debug!("switched {} {} to revision {}", entity_type, id, revision);
        Ok(true)
    }
}
