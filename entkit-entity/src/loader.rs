//! Loading records from storage.

use crate::context::EntityContext;
use crate::kind::EntityKind;
use crate::record::EntityRecord;
use entkit_model::{
    EntityError, EntityId, EntityInfo, EntityKey, EntityReference, EntityResult, Identifier,
    RawRecord, RevisionId, is_blank, scalar_string,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ids already selected by an external query, grouped by entity type in
/// result order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub entries: Vec<(String, Vec<EntityId>)>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends ids for `entity_type`, merging with an existing entry.
    #[must_use]
    pub fn with<I>(mut self, entity_type: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = EntityId>,
    {
        match self.entries.iter_mut().find(|(t, _)| t == entity_type) {
            Some((_, existing)) => existing.extend(ids),
            None => self.entries.push((entity_type.to_string(), ids.into_iter().collect())),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Records produced from a [`QueryResult`].
#[derive(Debug, Clone)]
pub enum QueryMapping {
    /// The result held a single entity type.
    Single(Vec<EntityRecord>),
    /// Per-type record lists, in result order.
    ByType(Vec<(String, Vec<EntityRecord>)>),
}

impl QueryMapping {
    /// All records, flattened in result order.
    pub fn into_records(self) -> Vec<EntityRecord> {
        match self {
            Self::Single(records) => records,
            Self::ByType(groups) => groups.into_iter().flat_map(|(_, records)| records).collect(),
        }
    }
}

/// Produces [`EntityRecord`]s from ids, uuids and query results.
///
/// Unknown entity types fail with `InvalidType`. Missing rows and storage
/// read failures come back as absent records.
#[derive(Debug, Clone)]
pub struct Loader {
    ctx: Arc<EntityContext>,
}

impl Loader {
    pub fn new(ctx: Arc<EntityContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<EntityContext> {
        &self.ctx
    }

    // ── Singular ─────────────────────────────────────────────────

    /// Loads the summary row of `id`.
    pub fn by_id(&self, entity_type: &str, id: EntityId) -> EntityResult<Option<EntityRecord>> {
        let info = self.ctx.entity_info(entity_type)?;
        let row = match self.ctx.storage().load_summary_row(&info, id) {
            Ok(row) => row,
            Err(e) => {
                warn!("summary row of {} {} unavailable: {}", entity_type, id, e);
                None
            }
        };
        Ok(row.map(|row| self.record_from_row(&info, id, row)))
    }

    /// Loads `id` and wraps it as kind `K`.
    pub fn by_id_as<K: EntityKind>(&self, entity_type: &str, id: EntityId) -> EntityResult<Option<K>> {
        check_kind::<K>(entity_type)?;
        Ok(self.by_id(entity_type, id)?.map(K::from_record))
    }

    /// Loads `id` of the entity type `K` is bound to.
    pub fn load_kind<K: EntityKind>(&self, id: EntityId) -> EntityResult<Option<K>> {
        let Some(entity_type) = K::ENTITY_TYPE else {
            return Err(EntityError::UnsupportedOperation(
                "kind is not bound to an entity type".into(),
            ));
        };
        self.by_id_as::<K>(entity_type, id)
    }

    /// Loads the entity with `uuid`. Always absent without the UUID
    /// subsystem.
    pub fn by_uuid(&self, entity_type: &str, uuid: &str) -> EntityResult<Option<EntityRecord>> {
        let info = self.ctx.entity_info(entity_type)?;
        let Some(service) = self.ctx.uuid_service() else {
            return Ok(None);
        };
        let ids = match service.resolve_ids_by_uuid(&info, &[uuid.to_string()]) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("uuid lookup of {} {} failed: {}", entity_type, uuid, e);
                return Ok(None);
            }
        };
        match ids.first() {
            Some(id) => self.by_id(entity_type, *id),
            None => Ok(None),
        }
    }

    /// Whether an entity with `identifier` exists. Non-numeric identifiers
    /// are matched against the uuid key while the UUID subsystem is
    /// active, and against the id key otherwise.
    pub fn exists(&self, entity_type: &str, identifier: &Identifier) -> bool {
        let Some(info) = self.ctx.metadata().entity_info(entity_type) else {
            return false;
        };
        let key = if identifier.is_numeric() || !self.ctx.uuid_active() {
            EntityKey::Id
        } else {
            EntityKey::Uuid
        };
        let Some(column) = info.key(key) else {
            return false;
        };
        match self.ctx.storage().count_matching(&info, column, &identifier.to_value()) {
            Ok(count) => count > 0,
            Err(e) => {
                warn!("existence check of {} {} failed: {}", entity_type, identifier, e);
                false
            }
        }
    }

    // ── Batch ────────────────────────────────────────────────────

    /// Loads several entities in one storage round trip.
    ///
    /// The result follows `ids` order, duplicates included; ids with no
    /// row are left out.
    pub fn by_ids(&self, entity_type: &str, ids: &[EntityId]) -> EntityResult<Vec<EntityRecord>> {
        let info = self.ctx.entity_info(entity_type)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = match self.ctx.storage().load_summary_rows(&info, ids) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("summary rows of {} unavailable: {}", entity_type, e);
                return Ok(Vec::new());
            }
        };

        let mut by_id: HashMap<EntityId, RawRecord> = HashMap::with_capacity(rows.len());
        for row in rows {
            match record_id(&info, &row) {
                Some(id) => {
                    by_id.insert(id, row);
                }
                None => debug!("dropping {} row without id", entity_type),
            }
        }

        let mut built: HashMap<EntityId, EntityRecord> = HashMap::new();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = built.get(id) {
                records.push(record.clone());
                continue;
            }
            let Some(row) = by_id.remove(id) else {
                continue;
            };
            let record = self.record_from_row(&info, *id, row);
            built.insert(*id, record.clone());
            records.push(record);
        }
        Ok(records)
    }

    pub fn by_ids_as<K: EntityKind>(&self, entity_type: &str, ids: &[EntityId]) -> EntityResult<Vec<K>> {
        check_kind::<K>(entity_type)?;
        Ok(self
            .by_ids(entity_type, ids)?
            .into_iter()
            .map(K::from_record)
            .collect())
    }

    /// One singular load per id, keeping a `None` for each miss.
    pub fn map(&self, entity_type: &str, ids: &[EntityId]) -> EntityResult<Vec<Option<EntityRecord>>> {
        ids.iter().map(|id| self.by_id(entity_type, *id)).collect()
    }

    /// Loads the ids of an already executed single-column query.
    pub fn from_id_column(&self, entity_type: &str, ids: &[EntityId]) -> EntityResult<Vec<EntityRecord>> {
        self.by_ids(entity_type, ids)
    }

    /// Loads the records of a multi-type query result.
    ///
    /// With `type_filter`, only that type is loaded and a result without it
    /// is `None`. A single remaining type yields a flat list; several types
    /// yield one list per type. An empty result is `None`.
    pub fn from_query_result(
        &self,
        result: &QueryResult,
        type_filter: Option<&str>,
    ) -> EntityResult<Option<QueryMapping>> {
        let entries: Vec<&(String, Vec<EntityId>)> = match type_filter {
            Some(wanted) => match result.entries.iter().find(|(t, _)| t == wanted) {
                Some(entry) => vec![entry],
                None => return Ok(None),
            },
            None => result.entries.iter().collect(),
        };
        match entries.as_slice() {
            [] => Ok(None),
            [(entity_type, ids)] => Ok(Some(QueryMapping::Single(self.by_ids(entity_type, ids)?))),
            many => {
                let mut groups = Vec::with_capacity(many.len());
                for (entity_type, ids) in many {
                    groups.push((entity_type.clone(), self.by_ids(entity_type, ids)?));
                }
                Ok(Some(QueryMapping::ByType(groups)))
            }
        }
    }

    // ── Import ───────────────────────────────────────────────────

    /// Wraps an already complete raw record without touching storage.
    pub fn import_full(&self, entity_type: &str, raw: RawRecord) -> EntityResult<EntityRecord> {
        self.ctx.entity_info(entity_type)?;
        Ok(EntityRecord::new(Arc::clone(&self.ctx), entity_type, raw, true))
    }

    /// Finds the stored entity a foreign raw record describes.
    ///
    /// Every known type whose id key is present on `raw` is tried in
    /// order. While the UUID subsystem is active the loaded entity's uuid
    /// must also match.
    pub fn import(&self, raw: &RawRecord) -> Option<EntityRecord> {
        for entity_type in self.ctx.metadata().entity_types() {
            let Some(info) = self.ctx.metadata().entity_info(&entity_type) else {
                continue;
            };
            let Some(id) = record_id(&info, raw) else {
                continue;
            };
            let loaded = match self.by_id(&entity_type, id) {
                Ok(Some(loaded)) => loaded,
                Ok(None) => continue,
                Err(e) => {
                    debug!("skipping {} during import: {}", entity_type, e);
                    continue;
                }
            };
            if !self.ctx.uuid_active() {
                return Some(loaded);
            }
            let expected = info
                .key(EntityKey::Uuid)
                .and_then(|column| raw.get(column))
                .filter(|v| !v.is_null())
                .map(scalar_string);
            if expected == loaded.uuid() {
                return Some(loaded);
            }
        }
        None
    }

    /// Loads the entity a decoded reference points to, as kind `K`.
    ///
    /// Unlike [`EntityRecord::promote`], which reuses an already loaded
    /// record, a reference holds only the target's type and id: promoting
    /// it costs one summary row load.
    pub fn promote_reference<K: EntityKind>(&self, reference: &EntityReference) -> EntityResult<Option<K>> {
        self.by_id_as::<K>(&reference.entity_type, reference.entity_id)
    }

    // ── Writes and revisions ─────────────────────────────────────

    pub fn delete(&self, entity_type: &str, id: EntityId) -> EntityResult<bool> {
        let info = self.ctx.entity_info(entity_type)?;
        Ok(self.ctx.storage().delete(&info, id)?)
    }

    pub fn latest_revision_id(&self, entity_type: &str, id: EntityId, force_refresh: bool) -> Option<RevisionId> {
        self.ctx.revisions().latest_revision_id(entity_type, id, force_refresh)
    }

    pub fn type_supports_revisions(&self, entity_type: &str) -> bool {
        self.ctx.revisions().type_supports_revisions(entity_type)
    }

    // ── Internals ────────────────────────────────────────────────

    /// Builds a partial record from a summary row. Rows with a blank
    /// bundle are replaced by a full load since the bundle decides which
    /// fields exist.
    fn record_from_row(&self, info: &EntityInfo, id: EntityId, row: RawRecord) -> EntityRecord {
        let blank_bundle = info
            .key(EntityKey::Bundle)
            .is_some_and(|column| row.get(column).is_none_or(is_blank));
        if !blank_bundle {
            return EntityRecord::new(Arc::clone(&self.ctx), &info.entity_type, row, false);
        }

        debug!("{} {} has no bundle on its summary row; loading in full", info.entity_type, id);
        match self.ctx.storage().load_full_record(info, id) {
            Ok(Some(full)) => EntityRecord::new(Arc::clone(&self.ctx), &info.entity_type, full, true),
            Ok(None) => {
                warn!("{} {} vanished before its full load", info.entity_type, id);
                EntityRecord::new(Arc::clone(&self.ctx), &info.entity_type, row, false)
            }
            Err(e) => {
                warn!("full load of {} {} failed: {}", info.entity_type, id, e);
                EntityRecord::new(Arc::clone(&self.ctx), &info.entity_type, row, false)
            }
        }
    }
}

fn record_id(info: &EntityInfo, row: &RawRecord) -> Option<EntityId> {
    info.key(EntityKey::Id)
        .and_then(|column| row.get(column))
        .and_then(EntityId::from_value)
}

fn check_kind<K: EntityKind>(entity_type: &str) -> EntityResult<()> {
    match K::ENTITY_TYPE {
        Some(bound) if bound != entity_type => Err(EntityError::InvalidType(entity_type.to_string())),
        _ => Ok(()),
    }
}
