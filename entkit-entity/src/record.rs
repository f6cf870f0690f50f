//! The entity record and its lazy-loading state machine.
//!
//! A record starts either partial (a summary row) or full. Field storage is
//! attached one field at a time while the record is partial; an access that
//! misses both fields and attributes promotes a partial record to a full
//! load and retries once.

use crate::context::EntityContext;
use crate::kind::EntityKind;
use entkit_fields::{FieldLookup, FieldRequest, field_language, record_bundle};
use entkit_model::{
    EntityId, EntityInfo, EntityKey, EntityResult, FieldValueCollection, Identifier, RawRecord,
    RevisionId, is_blank, scalar_string,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Combined getter/setter argument for entity keys.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyUpdate {
    /// Read the key.
    Keep,
    /// Write the key.
    Set(Value),
    /// Remove the key's attribute.
    Clear,
}

/// Result of resolving a member name on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// A decodable field; `None` when it holds no values.
    Field(Option<FieldValueCollection>),
    /// A plain attribute of the raw record.
    Attribute(Value),
    /// Neither a field nor an attribute, even after a full load.
    Absent,
}

impl Member {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The member as JSON: field values as an array, absent and empty as
    /// `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Field(Some(values)) => values.to_json(),
            Self::Field(None) | Self::Absent => Value::Null,
            Self::Attribute(value) => value.clone(),
        }
    }
}

/// A typed wrapper around a raw record of one entity type.
#[derive(Clone)]
pub struct EntityRecord {
    ctx: Arc<EntityContext>,
    entity_type: String,
    raw: RawRecord,
    is_new: bool,
    full_loaded: bool,
    /// Decoded values keyed by field name.
    fields: HashMap<String, FieldLookup>,
    /// Fields whose storage was dropped by a revision switch; they are
    /// re-attached on access even on a full-loaded record.
    detached: HashSet<String>,
}

impl EntityRecord {
    pub fn new(ctx: Arc<EntityContext>, entity_type: &str, raw: RawRecord, full_loaded: bool) -> Self {
        Self {
            ctx,
            entity_type: entity_type.to_string(),
            raw,
            is_new: false,
            full_loaded,
            fields: HashMap::new(),
            detached: HashSet::new(),
        }
    }

    /// Builds a record of kind `K` from `source`'s type, raw data and
    /// full-loaded flag, without touching storage. `None` if there is no
    /// source.
    pub fn promote<K: EntityKind>(source: Option<&EntityRecord>) -> Option<K> {
        let source = source?;
        Some(K::from_record(EntityRecord::new(
            Arc::clone(&source.ctx),
            &source.entity_type,
            source.raw.clone(),
            source.full_loaded,
        )))
    }

    pub fn context(&self) -> &Arc<EntityContext> {
        &self.ctx
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn raw(&self) -> &RawRecord {
        &self.raw
    }

    /// Mutable access to the raw record. Drops decoded field values since
    /// they may no longer match the data.
    pub fn raw_mut(&mut self) -> &mut RawRecord {
        self.fields.clear();
        &mut self.raw
    }

    pub fn into_raw(self) -> RawRecord {
        self.raw
    }

    pub fn is_full_loaded(&self) -> bool {
        self.full_loaded
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    // ── Keys ─────────────────────────────────────────────────────

    /// Gets, sets or clears an entity key. Keys the type does not support
    /// always come back `None`; so does a cleared key.
    ///
    /// Writing the bundle, revision or language key drops decoded field
    /// values, since each of them selects which field storage applies.
    pub fn key_update(&mut self, key: EntityKey, update: KeyUpdate) -> Option<Value> {
        let column = self.key_column(key)?;
        if update != KeyUpdate::Keep
            && matches!(key, EntityKey::Bundle | EntityKey::Revision | EntityKey::Language)
        {
            self.fields.clear();
        }
        match update {
            KeyUpdate::Keep => self.raw.get(&column).filter(|v| !v.is_null()).cloned(),
            KeyUpdate::Set(Value::Null) | KeyUpdate::Clear => {
                self.raw.remove(&column);
                None
            }
            KeyUpdate::Set(value) => {
                self.raw.insert(column, value.clone());
                Some(value)
            }
        }
    }

    /// Reads an entity key from the raw record. Never triggers a load.
    pub fn key(&self, key: EntityKey) -> Option<&Value> {
        let column = self.key_column(key)?;
        self.raw.get(&column).filter(|v| !v.is_null())
    }

    pub fn set_key(&mut self, key: EntityKey, value: impl Into<Value>) -> Option<Value> {
        self.key_update(key, KeyUpdate::Set(value.into()))
    }

    pub fn clear_key(&mut self, key: EntityKey) {
        self.key_update(key, KeyUpdate::Clear);
    }

    pub fn id(&self) -> Option<EntityId> {
        self.key(EntityKey::Id).and_then(EntityId::from_value)
    }

    pub fn bundle(&self) -> Option<String> {
        self.key(EntityKey::Bundle).map(scalar_string)
    }

    pub fn uuid(&self) -> Option<String> {
        self.key(EntityKey::Uuid).map(scalar_string)
    }

    pub fn revision(&self) -> Option<RevisionId> {
        self.key(EntityKey::Revision).and_then(RevisionId::from_value)
    }

    pub fn revision_uuid(&self) -> Option<String> {
        self.key(EntityKey::RevisionUuid).map(scalar_string)
    }

    pub fn language(&self) -> Option<String> {
        self.key(EntityKey::Language).map(scalar_string)
    }

    /// Version identity for change detection.
    ///
    /// The revision uuid when the type has one; otherwise
    /// `norevision|<uuid>|<changed>` from the record's `changed` attribute
    /// or the modified oracle; otherwise `norevision|<uuid>`.
    pub fn vuuid(&self) -> String {
        if let Some(revision_uuid) = self.key(EntityKey::RevisionUuid) {
            return scalar_string(revision_uuid);
        }
        let uuid = self.uuid().unwrap_or_default();
        if let Some(changed) = self.raw.get("changed").filter(|v| !v.is_null()) {
            return format!("norevision|{uuid}|{}", scalar_string(changed));
        }
        let modified = self
            .ctx
            .modified_oracle()
            .and_then(|oracle| oracle.last_modified(&self.entity_type, &self.raw))
            .filter(|v| !is_blank(v));
        match modified {
            Some(modified) => format!("norevision|{uuid}|{}", scalar_string(&modified)),
            None => format!("norevision|{uuid}"),
        }
    }

    // ── Fields ───────────────────────────────────────────────────

    /// Decoded values of `name`. Results are cached per record until the
    /// next full load or revision switch.
    pub fn field(&mut self, name: &str) -> FieldLookup {
        if let Some(cached) = self.fields.get(name) {
            return cached.clone();
        }
        let lookup = self.lookup_field(name, &[]);
        if lookup.is_found() {
            self.fields.insert(name.to_string(), lookup.clone());
        }
        lookup
    }

    /// Decodes `name` passing `args` through to the handler. Not cached.
    pub fn field_with_args(&mut self, name: &str, args: &[Value]) -> FieldLookup {
        self.lookup_field(name, args)
    }

    /// Whether `name` is a decodable field of this record, regardless of
    /// whether it holds values.
    pub fn field_exists(&mut self, name: &str) -> bool {
        self.field(name).is_found()
    }

    /// Language code the field's items are stored under.
    pub fn field_language(&self, name: &str) -> Option<String> {
        field_language(&self.raw, name, self.language().as_deref())
    }

    fn lookup_field(&mut self, name: &str, args: &[Value]) -> FieldLookup {
        let Some(info) = self.info() else {
            return FieldLookup::NotFound;
        };
        let request = FieldRequest::new(name)
            .autoload(!self.full_loaded || self.detached.contains(name))
            .args(args);
        let lookup = self.ctx.field_accessor().get(&info, &mut self.raw, &request);
        if self.raw.contains_key(name) {
            self.detached.remove(name);
        }
        lookup
    }

    // ── Member resolution ────────────────────────────────────────

    /// Resolves `name` as a field, then as a raw attribute. A partial
    /// record that has neither is fully loaded and tried once more.
    pub fn resolve(&mut self, name: &str) -> Member {
        if let Some(member) = self.resolve_loaded(name) {
            return member;
        }
        if self.full_loaded {
            return Member::Absent;
        }
        if let Err(e) = self.load_full() {
            warn!("full load of {} {:?} failed: {}", self.entity_type, self.id(), e);
            return Member::Absent;
        }
        self.resolve_loaded(name).unwrap_or(Member::Absent)
    }

    /// Shorthand for [`resolve`](Self::resolve) rendered as JSON.
    pub fn get(&mut self, name: &str) -> Value {
        self.resolve(name).to_json()
    }

    fn resolve_loaded(&mut self, name: &str) -> Option<Member> {
        match self.field(name) {
            FieldLookup::Values(values) => Some(Member::Field(Some(values))),
            FieldLookup::Empty => Some(Member::Field(None)),
            FieldLookup::NotFound => self.raw.get(name).cloned().map(Member::Attribute),
        }
    }

    // ── Loading ──────────────────────────────────────────────────

    /// Replaces the raw record with the complete stored record and marks the
    /// record full-loaded. A record with no stored row keeps its data.
    pub fn load_full(&mut self) -> EntityResult<()> {
        let info = self.ctx.entity_info(&self.entity_type)?;
        let full = match self.id() {
            Some(id) => self.ctx.storage().load_full_record(&info, id)?,
            None => None,
        };
        match full {
            Some(full) => {
                debug!("full load of {} {:?}", self.entity_type, self.id());
                self.raw = full;
            }
            None => debug!("{} {:?} has no stored record to load", self.entity_type, self.id()),
        }
        self.full_loaded = true;
        self.fields.clear();
        self.detached.clear();
        Ok(())
    }

    // ── Revisions ────────────────────────────────────────────────

    pub fn supports_revisions(&self) -> bool {
        self.ctx.revisions().type_supports_revisions(&self.entity_type)
    }

    /// Latest stored revision id of this record.
    pub fn latest_revision_id(&self, force_refresh: bool) -> Option<RevisionId> {
        let id = self.id()?;
        self.ctx
            .revisions()
            .latest_revision_id(&self.entity_type, id, force_refresh)
    }

    /// Switches the record to another revision, by numeric id or revision
    /// uuid. `Ok(false)` if no such revision exists.
    pub fn set_revision(&mut self, revision: &Identifier) -> EntityResult<bool> {
        let ctx = Arc::clone(&self.ctx);
        ctx.revisions().set_revision(self, revision)
    }

    /// Overwrites attributes with a revision row and drops everything
    /// decoded from the previous revision.
    pub(crate) fn apply_revision_row(&mut self, row: RawRecord) {
        self.raw.extend(row);
        let bundle = match self.info() {
            Some(info) => record_bundle(&info, &self.raw),
            None => self.entity_type.clone(),
        };
        for field_name in self.ctx.metadata().field_instances(&self.entity_type, &bundle) {
            self.raw.remove(&field_name);
            self.detached.insert(field_name);
        }
        self.fields.clear();
    }

    // ── Persistence ──────────────────────────────────────────────

    /// Persists the record and clears the new flag.
    pub fn save(&mut self) -> EntityResult<bool> {
        let info = self.ctx.entity_info(&self.entity_type)?;
        self.is_new = false;
        Ok(self.ctx.storage().save(&info, &mut self.raw)?)
    }

    /// Deletes the stored entity this record represents.
    pub fn delete_current(&self) -> EntityResult<bool> {
        let info = self.ctx.entity_info(&self.entity_type)?;
        match self.id() {
            Some(id) => Ok(self.ctx.storage().delete(&info, id)?),
            None => Ok(false),
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn info(&self) -> Option<Arc<EntityInfo>> {
        self.ctx.metadata().entity_info(&self.entity_type)
    }

    fn key_column(&self, key: EntityKey) -> Option<String> {
        self.info()?.key(key).map(str::to_string)
    }
}

impl fmt::Debug for EntityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRecord")
            .field("entity_type", &self.entity_type)
            .field("raw", &self.raw)
            .field("is_new", &self.is_new)
            .field("full_loaded", &self.full_loaded)
            .finish_non_exhaustive()
    }
}
