//! Storage collaborators: the row store, the UUID index and the
//! last-modified oracle.
//!
//! All calls are synchronous and fallible. The entity layer never retries;
//! a failed read surfaces as an absent value.

use crate::error::StorageResult;
use crate::ids::{EntityId, Identifier, RevisionId};
use crate::keys::EntityInfo;
use crate::record::RawRecord;
use serde_json::Value;

/// Selects which field's storage to attach to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    pub field_name: String,
    pub field_id: Option<u64>,
}

impl FieldSelector {
    pub fn named(field_name: &str) -> Self {
        Self {
            field_name: field_name.into(),
            field_id: None,
        }
    }
}

/// Row-level access to entity storage.
///
/// Every method receives the type's [`EntityInfo`] so implementations can
/// resolve table and column names without a metadata handle of their own.
pub trait EntityStorage: Send + Sync {
    /// Loads the summary (base table) row for `id`.
    fn load_summary_row(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RawRecord>>;

    /// Loads the summary rows for `ids`. Order is unspecified and ids with
    /// no row are simply missing from the result.
    fn load_summary_rows(&self, info: &EntityInfo, ids: &[EntityId]) -> StorageResult<Vec<RawRecord>>;

    /// Loads the complete record for `id`, including all field storage.
    fn load_full_record(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RawRecord>>;

    /// Attaches one field's storage to each record in place.
    ///
    /// The load is revision-aware: when the type has a revision key and the
    /// record carries a revision id, storage for that revision is attached.
    /// Fails with [`StorageError::NotPersisted`](crate::StorageError) for
    /// records that have no storage row.
    fn load_field_storage(
        &self,
        info: &EntityInfo,
        records: &mut [(EntityId, &mut RawRecord)],
        field: &FieldSelector,
    ) -> StorageResult<()>;

    /// Highest revision id stored for `id`.
    fn latest_revision_id(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RevisionId>>;

    /// Loads the revision row of `id` matching `revision` (numeric revision
    /// id or revision uuid).
    fn load_revision_row(
        &self,
        info: &EntityInfo,
        id: EntityId,
        revision: &Identifier,
    ) -> StorageResult<Option<RawRecord>>;

    /// Persists `record`, assigning an id (and uuid) when it has none.
    fn save(&self, info: &EntityInfo, record: &mut RawRecord) -> StorageResult<bool>;

    /// Deletes the entity `id`.
    fn delete(&self, info: &EntityInfo, id: EntityId) -> StorageResult<bool>;

    /// Number of summary rows whose `column` equals `value`.
    fn count_matching(&self, info: &EntityInfo, column: &str, value: &Value) -> StorageResult<u64>;
}

/// The optional UUID subsystem. Its presence switches on uuid lookups and
/// the revision-uuid requirement for revision support.
pub trait UuidService: Send + Sync {
    fn resolve_ids_by_uuid(&self, info: &EntityInfo, uuids: &[String]) -> StorageResult<Vec<EntityId>>;
}

/// The optional "last modified" oracle consulted when synthesizing a
/// version identity for unrevisioned records.
pub trait ModifiedOracle: Send + Sync {
    fn last_modified(&self, entity_type: &str, record: &RawRecord) -> Option<Value>;
}
