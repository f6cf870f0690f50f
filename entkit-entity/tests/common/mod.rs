#![allow(dead_code)]

use entkit_entity::{EntityContext, Loader};
use entkit_fields::{FieldCall, FieldValueHandler, HandlerRegistry};
use entkit_handlers::standard_providers;
use entkit_memstore::MemoryStore;
use entkit_model::{
    EntityId, EntityInfo, EntityKey, EntityKeySet, EntityStorage, FieldInfo, FieldValue,
    MetadataService, ModifiedOracle, RawRecord, RevisionId, UuidService,
};
use entkit_schema::SchemaCatalog;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Text handler for the `counted_text` field type that counts its calls.
#[derive(Default)]
pub struct CountingText {
    pub calls: AtomicUsize,
}

impl CountingText {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FieldValueHandler for CountingText {
    fn name(&self) -> &str {
        "counting"
    }

    fn configuration(&self) -> Vec<(String, String)> {
        vec![("counted_text".into(), "count".into())]
    }

    fn has_method(&self, method: &str) -> bool {
        method == "count"
    }

    fn call(&self, _method: &str, call: &FieldCall<'_>) -> Option<FieldValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        call.item.get("value").and_then(Value::as_str).map(FieldValue::text)
    }
}

/// Reports a fixed modification time for every record.
pub struct FixedModified(pub Value);

impl ModifiedOracle for FixedModified {
    fn last_modified(&self, _entity_type: &str, _record: &RawRecord) -> Option<Value> {
        Some(self.0.clone())
    }
}

/// `article`: revisioned, no revision uuid key.
pub fn article_info() -> EntityInfo {
    EntityInfo::new(
        "article",
        "article",
        EntityKeySet::with_id("nid")
            .with(EntityKey::Bundle, "type")
            .with(EntityKey::Uuid, "uuid")
            .with(EntityKey::Revision, "vid"),
    )
    .with_revision_table("article_revision")
    .with_bundles(["story", "gallery"])
}

/// `document`: revisioned with a revision uuid key.
pub fn document_info() -> EntityInfo {
    EntityInfo::new(
        "document",
        "document",
        EntityKeySet::with_id("did")
            .with(EntityKey::Bundle, "kind")
            .with(EntityKey::Uuid, "uuid")
            .with(EntityKey::Revision, "rid")
            .with(EntityKey::RevisionUuid, "vuuid")
            .with(EntityKey::Language, "language"),
    )
    .with_revision_table("document_revision")
    .with_bundles(["report"])
}

/// `user`: no bundle key, no revisions.
pub fn user_info() -> EntityInfo {
    EntityInfo::new("user", "users", EntityKeySet::with_id("uid").with(EntityKey::Uuid, "uuid"))
}

pub fn catalog() -> SchemaCatalog {
    SchemaCatalog::builder()
        .entity_type(article_info())
        .entity_type(document_info())
        .entity_type(user_info())
        .entity_type(EntityInfo::new("broken", "", EntityKeySet::with_id("id")))
        .field(FieldInfo::new("body", "text_with_summary"))
        .field(FieldInfo::new("field_tags", "taxonomy_term_reference"))
        .field(FieldInfo::new("field_rating", "number_integer"))
        .field(FieldInfo::new("field_subtitle", "counted_text"))
        .field(FieldInfo::new("field_geo", "geofield"))
        .field(FieldInfo::new("field_caption", "text"))
        .field(FieldInfo::new("field_summary", "text"))
        .field(FieldInfo::new("field_bio", "text"))
        .instance("article", "body", "story")
        .instance("article", "field_tags", "story")
        .instance("article", "field_rating", "story")
        .instance("article", "field_subtitle", "story")
        .instance("article", "field_geo", "story")
        .instance("article", "field_caption", "gallery")
        .instance("document", "field_summary", "report")
        .instance("user", "field_bio", "user")
        .build()
        .unwrap()
}

pub fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub counting: Arc<CountingText>,
    pub ctx: Arc<EntityContext>,
    pub loader: Loader,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(false, None)
    }

    /// UUID subsystem active.
    pub fn with_uuid() -> Self {
        Self::build(true, None)
    }

    pub fn with_modified(value: Value) -> Self {
        Self::build(false, Some(Arc::new(FixedModified(value))))
    }

    fn build(uuid: bool, modified: Option<Arc<dyn ModifiedOracle>>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let counting = Arc::new(CountingText::default());
        let mut providers = standard_providers();
        providers.push(counting.clone());
        let metadata: Arc<dyn MetadataService> = Arc::new(catalog());
        let storage: Arc<dyn EntityStorage> = store.clone();
        let mut builder =
            EntityContext::builder(metadata, storage).registry(Arc::new(HandlerRegistry::new(providers)));
        if uuid {
            let service: Arc<dyn UuidService> = store.clone();
            builder = builder.uuid_service(service);
        }
        if let Some(oracle) = modified {
            builder = builder.modified_oracle(oracle);
        }
        let ctx = builder.build();
        let loader = Loader::new(Arc::clone(&ctx));
        Self {
            store,
            counting,
            ctx,
            loader,
        }
    }

    /// Stores a `story` article at revision `vid` with a body, tags and a
    /// subtitle, plus a detail attribute only a full load returns.
    pub fn seed_article(&self, nid: u64, vid: u64, title: &str) {
        let id = EntityId::new(nid);
        let rev = RevisionId::new(vid);
        let row = record(json!({
            "nid": nid,
            "vid": vid,
            "type": "story",
            "uuid": format!("uuid-{nid}"),
            "title": title,
        }));
        self.store.insert_row("article", id, row.clone());
        self.store.insert_revision("article", id, rev, row);
        self.store
            .insert_details("article", id, record(json!({"promote": 1, "changed": 1000 + nid})));
        self.store.set_field(
            "article",
            id,
            Some(rev),
            "body",
            json!({"und": [{"value": format!("{title} body"), "summary": "Sum", "format": "plain_text"}]}),
        );
        self.store
            .set_field("article", id, Some(rev), "field_tags", json!([{"tid": 4}, {"tid": 7}]));
        self.store
            .set_field("article", id, Some(rev), "field_subtitle", json!([{"value": format!("{title} sub")}]));
    }

    /// Adds an older revision `vid` of article `nid` with its own title and
    /// body.
    pub fn seed_article_revision(&self, nid: u64, vid: u64, title: &str) {
        let id = EntityId::new(nid);
        let rev = RevisionId::new(vid);
        self.store.insert_revision(
            "article",
            id,
            rev,
            record(json!({"nid": nid, "vid": vid, "title": title})),
        );
        self.store.set_field(
            "article",
            id,
            Some(rev),
            "body",
            json!([{"value": format!("{title} body")}]),
        );
        self.store
            .set_field("article", id, Some(rev), "field_subtitle", json!([{"value": format!("{title} sub")}]));
    }

    pub fn seed_document(&self, did: u64, rid: u64, vuuid: &str) {
        let id = EntityId::new(did);
        let row = record(json!({
            "did": did,
            "rid": rid,
            "kind": "report",
            "uuid": format!("doc-{did}"),
            "vuuid": vuuid,
            "language": "en",
        }));
        self.store.insert_row("document", id, row.clone());
        self.store.insert_revision("document", id, RevisionId::new(rid), row);
        self.store.set_field(
            "document",
            id,
            Some(RevisionId::new(rid)),
            "field_summary",
            json!({"en": [{"value": format!("summary r{rid}")}], "und": [{"value": "neutral"}]}),
        );
    }

    pub fn seed_user(&self, uid: u64, name: &str) {
        let id = EntityId::new(uid);
        self.store
            .insert_row("user", id, record(json!({"uid": uid, "name": name, "uuid": format!("user-{uid}")})));
        self.store
            .set_field("user", id, None, "field_bio", json!([{"value": format!("{name} bio")}]));
    }
}
