mod common;

use common::{Fixture, record};
use entkit_entity::{EntityRecord, FieldLookup, RevisionResolver};
use entkit_model::{EntityError, EntityId, Identifier, RevisionId};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn first_text(lookup: &FieldLookup) -> Option<String> {
    lookup
        .values()
        .and_then(|values| values.first())
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

// ── Support ──────────────────────────────────────────────────────

#[test]
fn revision_support_requires_table_and_key() {
    let f = Fixture::new();
    let revisions = f.ctx.revisions();

    assert!(revisions.type_supports_revisions("article"));
    assert!(revisions.type_supports_revisions("document"));
    assert!(!revisions.type_supports_revisions("user"));
    assert!(!revisions.type_supports_revisions("unknown"));
}

#[test]
fn active_uuid_subsystem_also_requires_a_revision_uuid_key() {
    let f = Fixture::with_uuid();
    let revisions = RevisionResolver::new(&f.ctx);

    assert!(!revisions.type_supports_revisions("article"));
    assert!(revisions.type_supports_revisions("document"));
}

#[test]
fn records_report_their_type_support() {
    let f = Fixture::new();
    f.seed_article(1, 10, "Hello");
    f.seed_user(1, "ada");

    assert!(f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap().supports_revisions());
    assert!(!f.loader.by_id("user", EntityId::new(1)).unwrap().unwrap().supports_revisions());
}

// ── Latest revision ──────────────────────────────────────────────

#[test]
fn latest_revision_is_cached_per_entity() {
    let f = Fixture::new();
    f.seed_article(1, 10, "Hello");
    f.seed_article_revision(1, 12, "Newer");

    assert_eq!(f.loader.latest_revision_id("article", EntityId::new(1), false), Some(RevisionId::new(12)));
    assert_eq!(f.loader.latest_revision_id("article", EntityId::new(1), false), Some(RevisionId::new(12)));
    assert_eq!(f.store.calls().latest_revision, 1);
}

#[test]
fn entities_without_revision_rows_cache_the_miss() {
    let f = Fixture::new();

    assert_eq!(f.loader.latest_revision_id("article", EntityId::new(9), false), None);
    assert_eq!(f.loader.latest_revision_id("article", EntityId::new(9), false), None);
    assert_eq!(f.store.calls().latest_revision, 1);
    assert_eq!(f.ctx.revision_cache().get("article", EntityId::new(9)), Some(None));
}

#[test]
fn forced_refresh_clears_every_cached_pointer() {
    let f = Fixture::new();
    f.seed_article(1, 10, "One");
    f.seed_article(2, 20, "Two");
    f.loader.latest_revision_id("article", EntityId::new(1), false);
    f.loader.latest_revision_id("article", EntityId::new(2), false);
    assert_eq!(f.ctx.revision_cache().len(), 2);

    f.seed_article_revision(2, 21, "Two again");
    assert_eq!(f.loader.latest_revision_id("article", EntityId::new(1), true), Some(RevisionId::new(10)));

    // only the refreshed entity is cached again
    assert_eq!(f.ctx.revision_cache().len(), 1);
    assert_eq!(f.ctx.revision_cache().get("article", EntityId::new(2)), None);
    assert_eq!(f.loader.latest_revision_id("article", EntityId::new(2), false), Some(RevisionId::new(21)));
    assert_eq!(f.store.calls().latest_revision, 4);
}

#[test]
fn forced_refresh_of_an_unsupported_type_still_clears_the_cache() {
    let f = Fixture::new();
    f.seed_article(1, 10, "One");
    f.seed_user(1, "ada");
    f.loader.latest_revision_id("article", EntityId::new(1), false);
    assert_eq!(f.ctx.revision_cache().len(), 1);

    assert_eq!(f.loader.latest_revision_id("user", EntityId::new(1), true), None);
    assert!(f.ctx.revision_cache().is_empty());
    assert_eq!(f.store.calls().latest_revision, 1);
}

#[test]
fn unsupported_types_have_no_latest_revision() {
    let f = Fixture::new();
    f.seed_user(1, "ada");

    assert_eq!(f.loader.latest_revision_id("user", EntityId::new(1), false), None);
    assert_eq!(f.store.calls().latest_revision, 0);
}

#[test]
fn record_latest_revision_uses_its_id() {
    let f = Fixture::new();
    f.seed_article(1, 10, "Hello");
    let rec = f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap();
    assert_eq!(rec.latest_revision_id(false), Some(RevisionId::new(10)));

    let unsaved = EntityRecord::new(Arc::clone(&f.ctx), "article", record(json!({})), false);
    assert_eq!(unsaved.latest_revision_id(false), None);
}

// ── Switching ────────────────────────────────────────────────────

#[test]
fn switching_overwrites_attributes_from_the_revision_row() {
    let f = Fixture::new();
    f.seed_article(1, 12, "Current");
    f.seed_article_revision(1, 10, "Original");
    let mut rec = f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap();

    assert!(rec.set_revision(&Identifier::Numeric(10)).unwrap());
    assert_eq!(rec.revision(), Some(RevisionId::new(10)));
    assert_eq!(rec.raw().get("title"), Some(&json!("Original")));
    // not part of the revision row
    assert_eq!(rec.bundle().as_deref(), Some("story"));
    assert_eq!(rec.uuid().as_deref(), Some("uuid-1"));
}

#[test]
fn switching_re_decodes_fields_from_the_new_revision() {
    let f = Fixture::new();
    f.seed_article(1, 12, "Current");
    f.seed_article_revision(1, 10, "Original");
    let mut rec = f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap();

    assert_eq!(first_text(&rec.field("field_subtitle")).as_deref(), Some("Current sub"));
    assert_eq!(first_text(&rec.field("body")).as_deref(), Some("Current body"));
    assert_eq!(f.counting.calls(), 1);

    rec.set_revision(&Identifier::Numeric(10)).unwrap();
    assert!(!rec.raw().contains_key("field_subtitle"));
    assert_eq!(first_text(&rec.field("field_subtitle")).as_deref(), Some("Original sub"));
    assert_eq!(first_text(&rec.field("body")).as_deref(), Some("Original body"));
    assert_eq!(f.counting.calls(), 2);
}

#[test]
fn switching_a_full_loaded_record_re_attaches_fields() {
    let f = Fixture::new();
    f.seed_article(1, 12, "Current");
    f.seed_article_revision(1, 10, "Original");
    let mut rec = f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap();
    rec.load_full().unwrap();
    assert_eq!(first_text(&rec.field("body")).as_deref(), Some("Current body"));

    rec.set_revision(&Identifier::Numeric(10)).unwrap();
    assert!(rec.is_full_loaded());
    assert_eq!(first_text(&rec.field("body")).as_deref(), Some("Original body"));
    // stays attached afterwards
    f.store.reset_calls();
    assert_eq!(first_text(&rec.field("body")).as_deref(), Some("Original body"));
    assert_eq!(f.store.calls().field_loads, 0);
}

#[test]
fn switching_by_revision_uuid() {
    let f = Fixture::with_uuid();
    f.seed_document(1, 6, "rev-6");
    let older = record(json!({"did": 1, "rid": 5, "vuuid": "rev-5"}));
    f.store.insert_revision("document", EntityId::new(1), RevisionId::new(5), older);
    f.store.set_field(
        "document",
        EntityId::new(1),
        Some(RevisionId::new(5)),
        "field_summary",
        json!({"und": [{"value": "first draft"}]}),
    );
    let mut rec = f.loader.by_id("document", EntityId::new(1)).unwrap().unwrap();
    assert_eq!(first_text(&rec.field("field_summary")).as_deref(), Some("summary r6"));

    assert!(rec.set_revision(&Identifier::parse("rev-5")).unwrap());
    assert_eq!(rec.revision(), Some(RevisionId::new(5)));
    assert_eq!(rec.vuuid(), "rev-5");
    assert_eq!(first_text(&rec.field("field_summary")).as_deref(), Some("first draft"));
}

#[test]
fn missing_revisions_leave_the_record_untouched() {
    let f = Fixture::new();
    f.seed_article(1, 10, "Hello");
    let mut rec = f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap();
    rec.field("body");
    let before = rec.raw().clone();

    assert!(!rec.set_revision(&Identifier::Numeric(99)).unwrap());
    assert_eq!(rec.raw(), &before);
}

#[test]
fn non_numeric_revisions_need_the_uuid_subsystem() {
    let f = Fixture::new();
    f.seed_article(1, 10, "Hello");
    let mut rec = f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap();
    let before = rec.raw().clone();

    let err = rec.set_revision(&Identifier::parse("rev-abc")).unwrap_err();
    assert!(matches!(err, EntityError::InvalidIdentifier(_)));
    assert_eq!(rec.raw(), &before);
    assert_eq!(f.store.calls().revision_rows, 0);
}

#[test]
fn non_integer_numbers_match_no_revision() {
    let f = Fixture::new();
    f.seed_article(1, 10, "Hello");
    let mut rec = f.loader.by_id("article", EntityId::new(1)).unwrap().unwrap();
    let before = rec.raw().clone();

    assert!(!rec.set_revision(&Identifier::parse("1.5")).unwrap());
    assert!(!rec.set_revision(&Identifier::parse("-3")).unwrap());
    assert_eq!(rec.raw(), &before);
    assert!(!f.loader.exists("article", &Identifier::parse("-3")));
}

#[test]
fn unsupported_types_refuse_to_switch() {
    let f = Fixture::new();
    f.seed_user(1, "ada");
    let mut rec = f.loader.by_id("user", EntityId::new(1)).unwrap().unwrap();
    let before = rec.raw().clone();

    let err = rec.set_revision(&Identifier::Numeric(1)).unwrap_err();
    assert!(matches!(err, EntityError::UnsupportedOperation(_)));
    assert_eq!(rec.raw(), &before);
}

#[test]
fn invalid_types_fail_before_anything_else() {
    let f = Fixture::new();
    let mut rec = EntityRecord::new(Arc::clone(&f.ctx), "broken", record(json!({"id": 1})), false);

    let err = rec.set_revision(&Identifier::Numeric(1)).unwrap_err();
    assert!(matches!(err, EntityError::InvalidType(t) if t == "broken"));
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn types_without_revision_support_always_refuse(rev in any::<u64>(), uuid in "[a-z]{1,12}") {
        let f = Fixture::new();
        f.seed_user(1, "ada");
        let mut rec = f.loader.by_id("user", EntityId::new(1)).unwrap().unwrap();

        prop_assert!(!f.ctx.revisions().type_supports_revisions("user"));
        prop_assert!(matches!(
            rec.set_revision(&Identifier::Numeric(rev)),
            Err(EntityError::UnsupportedOperation(_))
        ));
        prop_assert!(matches!(
            rec.set_revision(&Identifier::Uuid(uuid)),
            Err(EntityError::UnsupportedOperation(_))
        ));
    }
}
