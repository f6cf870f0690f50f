use entkit_model::{
    EntityId, EntityInfo, EntityKey, EntityStorage, FieldSelector, Identifier, RawRecord, RevisionId,
    StorageError, StorageResult, UuidService, scalar_string,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Number of calls made to each storage operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub summary_rows: usize,
    pub summary_batches: usize,
    pub full_loads: usize,
    pub field_loads: usize,
    pub latest_revision: usize,
    pub revision_rows: usize,
    pub saves: usize,
    pub deletes: usize,
    pub counts: usize,
    pub uuid_lookups: usize,
}

type FieldKey = (EntityId, Option<RevisionId>);

#[derive(Debug, Default)]
struct TypeTables {
    /// Summary (base table) rows.
    rows: BTreeMap<EntityId, RawRecord>,
    /// Attributes only present on a full load.
    details: BTreeMap<EntityId, RawRecord>,
    revisions: BTreeMap<EntityId, BTreeMap<RevisionId, RawRecord>>,
    /// Field storage per entity and revision, keyed by field name.
    fields: BTreeMap<FieldKey, RawRecord>,
}

/// Map-backed entity storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, TypeTables>>,
    calls: Mutex<CallCounts>,
    reverse_batches: AtomicBool,
    fail_field_loads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Fixtures ────────────────────────────────────────────────

    /// Stores the summary row of `id`.
    pub fn insert_row(&self, entity_type: &str, id: EntityId, row: RawRecord) {
        self.tables().entry(entity_type.into()).or_default().rows.insert(id, row);
    }

    /// Stores attributes that only a full load returns.
    pub fn insert_details(&self, entity_type: &str, id: EntityId, details: RawRecord) {
        self.tables()
            .entry(entity_type.into())
            .or_default()
            .details
            .insert(id, details);
    }

    /// Stores one revision row of `id`.
    pub fn insert_revision(&self, entity_type: &str, id: EntityId, revision: RevisionId, row: RawRecord) {
        self.tables()
            .entry(entity_type.into())
            .or_default()
            .revisions
            .entry(id)
            .or_default()
            .insert(revision, row);
    }

    /// Stores a field's storage for `id`, optionally scoped to a revision.
    pub fn set_field(
        &self,
        entity_type: &str,
        id: EntityId,
        revision: Option<RevisionId>,
        field_name: &str,
        storage: Value,
    ) {
        self.tables()
            .entry(entity_type.into())
            .or_default()
            .fields
            .entry((id, revision))
            .or_default()
            .insert(field_name.into(), storage);
    }

    /// Returns batch results in reverse id order.
    pub fn reverse_batches(&self, on: bool) {
        self.reverse_batches.store(on, Ordering::SeqCst);
    }

    /// Makes every field storage load fail.
    pub fn fail_field_loads(&self, on: bool) {
        self.fail_field_loads.store(on, Ordering::SeqCst);
    }

    pub fn calls(&self) -> CallCounts {
        self.counts().clone()
    }

    pub fn reset_calls(&self) {
        *self.counts() = CallCounts::default();
    }

    /// Whether a summary row exists for `id`.
    pub fn contains(&self, entity_type: &str, id: EntityId) -> bool {
        self.tables()
            .get(entity_type)
            .is_some_and(|t| t.rows.contains_key(&id))
    }

    // ── Internals ───────────────────────────────────────────────

    fn tables(&self) -> MutexGuard<'_, HashMap<String, TypeTables>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn counts(&self) -> MutexGuard<'_, CallCounts> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count(&self, bump: impl FnOnce(&mut CallCounts)) {
        bump(&mut *self.counts());
    }
}

/// Revision a record's field storage is keyed by: the record's revision
/// id for revisioned types, none otherwise.
fn storage_revision(info: &EntityInfo, record: &RawRecord) -> Option<RevisionId> {
    info.revision_table()?;
    info.key(EntityKey::Revision)
        .and_then(|column| record.get(column))
        .and_then(RevisionId::from_value)
}

fn same_value(a: &Value, b: &Value) -> bool {
    a == b || (!a.is_null() && !b.is_null() && scalar_string(a) == scalar_string(b))
}

impl EntityStorage for MemoryStore {
    fn load_summary_row(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RawRecord>> {
        self.count(|c| c.summary_rows += 1);
        Ok(self
            .tables()
            .get(&info.entity_type)
            .and_then(|t| t.rows.get(&id))
            .cloned())
    }

    fn load_summary_rows(&self, info: &EntityInfo, ids: &[EntityId]) -> StorageResult<Vec<RawRecord>> {
        self.count(|c| c.summary_batches += 1);
        let tables = self.tables();
        let Some(table) = tables.get(&info.entity_type) else {
            return Ok(Vec::new());
        };
        let mut wanted: Vec<EntityId> = ids.to_vec();
        wanted.sort();
        wanted.dedup();
        if self.reverse_batches.load(Ordering::SeqCst) {
            wanted.reverse();
        }
        Ok(wanted
            .into_iter()
            .filter_map(|id| table.rows.get(&id).cloned())
            .collect())
    }

    fn load_full_record(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RawRecord>> {
        self.count(|c| c.full_loads += 1);
        let tables = self.tables();
        let Some(table) = tables.get(&info.entity_type) else {
            return Ok(None);
        };
        let Some(row) = table.rows.get(&id) else {
            return Ok(None);
        };
        let mut record = row.clone();
        if let Some(details) = table.details.get(&id) {
            record.extend(details.clone());
        }
        let revision = storage_revision(info, &record);
        if let Some(fields) = table.fields.get(&(id, revision)) {
            record.extend(fields.clone());
        }
        Ok(Some(record))
    }

    fn load_field_storage(
        &self,
        info: &EntityInfo,
        records: &mut [(EntityId, &mut RawRecord)],
        field: &FieldSelector,
    ) -> StorageResult<()> {
        self.count(|c| c.field_loads += 1);
        if self.fail_field_loads.load(Ordering::SeqCst) {
            return Err(StorageError::Database("field storage unavailable".into()));
        }
        let tables = self.tables();
        let table = tables.get(&info.entity_type);
        for (id, record) in records.iter_mut() {
            if !table.is_some_and(|t| t.rows.contains_key(id)) {
                return Err(StorageError::NotPersisted(format!("{} {}", info.entity_type, id)));
            }
            let revision = storage_revision(info, record);
            let storage = table
                .and_then(|t| t.fields.get(&(*id, revision)))
                .and_then(|fields| fields.get(&field.field_name))
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new()));
            debug!("attached {} to {} {}", field.field_name, info.entity_type, id);
            record.insert(field.field_name.clone(), storage);
        }
        Ok(())
    }

    fn latest_revision_id(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RevisionId>> {
        self.count(|c| c.latest_revision += 1);
        Ok(self
            .tables()
            .get(&info.entity_type)
            .and_then(|t| t.revisions.get(&id))
            .and_then(|revs| revs.keys().next_back().copied()))
    }

    fn load_revision_row(
        &self,
        info: &EntityInfo,
        id: EntityId,
        revision: &Identifier,
    ) -> StorageResult<Option<RawRecord>> {
        self.count(|c| c.revision_rows += 1);
        let tables = self.tables();
        let Some(revisions) = tables.get(&info.entity_type).and_then(|t| t.revisions.get(&id)) else {
            return Ok(None);
        };
        Ok(match revision {
            Identifier::Numeric(rev) => revisions.get(&RevisionId::new(*rev)).cloned(),
            Identifier::Uuid(uuid) => {
                let Some(column) = info.key(EntityKey::RevisionUuid) else {
                    return Ok(None);
                };
                let wanted = Value::String(uuid.clone());
                revisions
                    .values()
                    .find(|row| row.get(column).is_some_and(|v| same_value(v, &wanted)))
                    .cloned()
            }
        })
    }

    fn save(&self, info: &EntityInfo, record: &mut RawRecord) -> StorageResult<bool> {
        self.count(|c| c.saves += 1);
        let id_column = info
            .key(EntityKey::Id)
            .ok_or_else(|| StorageError::InvalidData(format!("{} has no id key", info.entity_type)))?;
        let mut tables = self.tables();
        let table = tables.entry(info.entity_type.clone()).or_default();

        let id = match record.get(id_column).and_then(EntityId::from_value) {
            Some(id) => id,
            None => {
                let next = table.rows.keys().next_back().map_or(1, |id| id.get() + 1);
                let id = EntityId::new(next);
                record.insert(id_column.into(), id.to_value());
                id
            }
        };
        if let Some(column) = info.key(EntityKey::Uuid) {
            if record.get(column).is_none_or(Value::is_null) {
                record.insert(column.into(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
        }

        let (fields, row): (RawRecord, RawRecord) = record
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .partition(|(_, v)| v.is_array() || v.is_object());
        let revision = storage_revision(info, record);
        if let Some(rev) = revision {
            table.revisions.entry(id).or_default().insert(rev, row.clone());
        }
        table.rows.insert(id, row);
        if !fields.is_empty() {
            table.fields.entry((id, revision)).or_default().extend(fields);
        }
        debug!("saved {} {}", info.entity_type, id);
        Ok(true)
    }

    fn delete(&self, info: &EntityInfo, id: EntityId) -> StorageResult<bool> {
        self.count(|c| c.deletes += 1);
        let mut tables = self.tables();
        let Some(table) = tables.get_mut(&info.entity_type) else {
            return Ok(false);
        };
        let existed = table.rows.remove(&id).is_some();
        table.details.remove(&id);
        table.revisions.remove(&id);
        table.fields.retain(|(entity_id, _), _| *entity_id != id);
        Ok(existed)
    }

    fn count_matching(&self, info: &EntityInfo, column: &str, value: &Value) -> StorageResult<u64> {
        self.count(|c| c.counts += 1);
        Ok(self.tables().get(&info.entity_type).map_or(0, |t| {
            t.rows
                .values()
                .filter(|row| row.get(column).is_some_and(|v| same_value(v, value)))
                .count() as u64
        }))
    }
}

impl UuidService for MemoryStore {
    fn resolve_ids_by_uuid(&self, info: &EntityInfo, uuids: &[String]) -> StorageResult<Vec<EntityId>> {
        self.count(|c| c.uuid_lookups += 1);
        let Some(column) = info.key(EntityKey::Uuid) else {
            return Ok(Vec::new());
        };
        let tables = self.tables();
        let Some(table) = tables.get(&info.entity_type) else {
            return Ok(Vec::new());
        };
        Ok(uuids
            .iter()
            .filter_map(|uuid| {
                let wanted = Value::String(uuid.clone());
                table
                    .rows
                    .iter()
                    .find(|(_, row)| row.get(column).is_some_and(|v| same_value(v, &wanted)))
                    .map(|(id, _)| *id)
            })
            .collect())
    }
}
