use entkit_fields::{FieldAccessor, FieldCall, FieldLookup, FieldRequest, FieldValueHandler, HandlerRegistry};
use entkit_memstore::MemoryStore;
use entkit_model::{
    EntityId, EntityInfo, EntityKey, EntityKeySet, FieldInfo, FieldValue, RawRecord, RevisionId,
};
use entkit_schema::SchemaCatalog;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Decodes `text` items to their `value` column (blank → no value) and
/// echoes extra arguments when asked.
#[derive(Default)]
struct TextProvider {
    calls: AtomicUsize,
}

impl FieldValueHandler for TextProvider {
    fn name(&self) -> &str {
        "text"
    }

    fn configuration(&self) -> Vec<(String, String)> {
        vec![("text".into(), "text_value".into()), ("echo".into(), "echo_args".into())]
    }

    fn has_method(&self, method: &str) -> bool {
        matches!(method, "text_value" | "echo_args")
    }

    fn call(&self, method: &str, call: &FieldCall<'_>) -> Option<FieldValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            "text_value" => call
                .item
                .get("value")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(FieldValue::text),
            "echo_args" => Some(FieldValue::Scalar(Value::Array(call.args.to_vec()))),
            _ => None,
        }
    }
}

fn node_info() -> EntityInfo {
    EntityInfo::new(
        "node",
        "node",
        EntityKeySet::with_id("nid")
            .with(EntityKey::Bundle, "type")
            .with(EntityKey::Revision, "vid")
            .with(EntityKey::Language, "language"),
    )
    .with_revision_table("node_revision")
}

fn catalog() -> SchemaCatalog {
    SchemaCatalog::builder()
        .entity_type(node_info())
        .field(FieldInfo::new("body", "text"))
        .field(FieldInfo::new("field_location", "geo"))
        .field(FieldInfo::new("field_echo", "echo"))
        .field(FieldInfo::new("field_page_only", "text"))
        .instance("node", "body", "article")
        .instance("node", "field_location", "article")
        .instance("node", "field_echo", "article")
        .instance("node", "field_page_only", "page")
        .build()
        .unwrap()
}

fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

struct Fixture {
    catalog: SchemaCatalog,
    store: MemoryStore,
    provider: Arc<TextProvider>,
    registry: HandlerRegistry,
}

impl Fixture {
    fn new() -> Self {
        let provider = Arc::new(TextProvider::default());
        let store = MemoryStore::new();
        store.insert_row("node", EntityId::new(1), record(json!({"nid": 1, "vid": 2, "type": "article"})));
        Self {
            catalog: catalog(),
            store,
            registry: HandlerRegistry::new(vec![provider.clone()]),
            provider,
        }
    }

    fn accessor(&self) -> FieldAccessor<'_> {
        FieldAccessor::new(&self.catalog, &self.store, &self.registry)
    }

    fn get(&self, row: &mut RawRecord, name: &str) -> FieldLookup {
        self.accessor().get(&node_info(), row, &FieldRequest::new(name))
    }
}

fn article() -> RawRecord {
    record(json!({"nid": 1, "vid": 2, "type": "article"}))
}

// ── Existence ────────────────────────────────────────────────────

#[test]
fn unknown_field_is_not_found() {
    let f = Fixture::new();
    assert_eq!(f.get(&mut article(), "nope"), FieldLookup::NotFound);
}

#[test]
fn field_not_attached_to_bundle_is_not_found() {
    let f = Fixture::new();
    assert_eq!(f.get(&mut article(), "field_page_only"), FieldLookup::NotFound);
}

#[test]
fn undecodable_field_is_not_found_even_with_stored_data() {
    let f = Fixture::new();
    let mut row = article();
    row.insert("field_location".into(), json!([{"lat": 1.0, "lon": 2.0}]));
    assert_eq!(f.get(&mut row, "field_location"), FieldLookup::NotFound);
    assert_eq!(f.store.calls().field_loads, 0);
}

// ── Decoding ─────────────────────────────────────────────────────

#[test]
fn decodes_present_items_by_delta() {
    let f = Fixture::new();
    let mut row = article();
    row.insert("body".into(), json!({"und": [{"value": "a"}, {"value": ""}, {"value": "c"}]}));

    let values = f.get(&mut row, "body").into_values().unwrap();
    assert_eq!(values.deltas().collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(values.get(2).and_then(FieldValue::as_str), Some("c"));
    assert_eq!(f.provider.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn record_language_selects_items() {
    let f = Fixture::new();
    let mut row = article();
    row.insert("language".into(), json!("fr"));
    row.insert("body".into(), json!({"und": [{"value": "neutral"}], "fr": [{"value": "bonjour"}]}));
    let values = f.get(&mut row, "body").into_values().unwrap();
    assert_eq!(values.first().and_then(FieldValue::as_str), Some("bonjour"));
}

#[test]
fn empty_storage_is_empty_not_missing() {
    let f = Fixture::new();
    let mut row = article();
    row.insert("body".into(), json!({"und": []}));
    assert_eq!(f.get(&mut row, "body"), FieldLookup::Empty);
}

#[test]
fn all_null_items_report_as_empty() {
    let f = Fixture::new();
    let mut row = article();
    row.insert("body".into(), json!([{"value": ""}, {"value": ""}, {"value": ""}]));
    let mut none = article();
    none.insert("body".into(), json!([]));
    assert_eq!(f.get(&mut row, "body"), f.get(&mut none, "body"));
}

#[test]
fn extra_arguments_reach_the_handler() {
    let f = Fixture::new();
    let mut row = article();
    row.insert("field_echo".into(), json!([{}]));
    let args = [json!("small"), json!(2)];
    let lookup = f
        .accessor()
        .get(&node_info(), &mut row, &FieldRequest::new("field_echo").args(&args));
    assert_eq!(
        lookup.values().and_then(|v| v.first()).cloned(),
        Some(FieldValue::Scalar(json!(["small", 2])))
    );
}

// ── Autoloading ──────────────────────────────────────────────────

#[test]
fn autoload_attaches_storage_to_the_record() {
    let f = Fixture::new();
    f.store
        .set_field("node", EntityId::new(1), Some(RevisionId::new(2)), "body", json!([{"value": "stored"}]));
    let mut row = article();

    let values = f.get(&mut row, "body").into_values().unwrap();
    assert_eq!(values.first().and_then(FieldValue::as_str), Some("stored"));
    assert!(row.contains_key("body"));

    // Second lookup reads the attached storage.
    f.get(&mut row, "body");
    assert_eq!(f.store.calls().field_loads, 1);
}

#[test]
fn autoload_disabled_reports_not_found() {
    let f = Fixture::new();
    let mut row = article();
    let lookup = f
        .accessor()
        .get(&node_info(), &mut row, &FieldRequest::new("body").autoload(false));
    assert_eq!(lookup, FieldLookup::NotFound);
    assert_eq!(f.store.calls().field_loads, 0);
}

#[test]
fn autoload_of_field_without_data_is_empty() {
    let f = Fixture::new();
    assert_eq!(f.get(&mut article(), "body"), FieldLookup::Empty);
}

#[test]
fn unsaved_record_has_no_stored_fields() {
    let f = Fixture::new();
    let mut row = record(json!({"nid": 50, "type": "article"}));
    assert_eq!(f.get(&mut row, "body"), FieldLookup::NotFound);
    assert!(!row.contains_key("body"));
}

#[test]
fn record_without_id_has_no_stored_fields() {
    let f = Fixture::new();
    let mut row = record(json!({"type": "article"}));
    assert_eq!(f.get(&mut row, "body"), FieldLookup::NotFound);
    assert_eq!(f.store.calls().field_loads, 0);
}

#[test]
fn storage_failure_degrades_to_not_found() {
    let f = Fixture::new();
    f.store.fail_field_loads(true);
    assert_eq!(f.get(&mut article(), "body"), FieldLookup::NotFound);
}

proptest! {
    /// However many blank items a field holds, it reports the same as a
    /// field with no items at all.
    #[test]
    fn blank_items_are_indistinguishable_from_none(n in 0usize..12) {
        let f = Fixture::new();
        let mut row = article();
        row.insert("body".into(), Value::Array(vec![json!({"value": ""}); n]));
        prop_assert_eq!(f.get(&mut row, "body"), FieldLookup::Empty);
    }

    /// Fields of a type without a handler never exist, whatever is stored.
    #[test]
    fn undecodable_fields_never_exist(items in prop::collection::vec("[a-z]{0,8}", 0..6)) {
        let f = Fixture::new();
        let mut row = article();
        row.insert(
            "field_location".into(),
            Value::Array(items.into_iter().map(|s| json!({"value": s})).collect()),
        );
        prop_assert!(!f.get(&mut row, "field_location").is_found());
    }
}
