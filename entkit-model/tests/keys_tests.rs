use entkit_model::{EntityInfo, EntityKey, EntityKeySet, is_blank, scalar_string};
use pretty_assertions::assert_eq;
use serde_json::json;

fn article_keys() -> EntityKeySet {
    EntityKeySet::with_id("nid")
        .with(EntityKey::Bundle, "type")
        .with(EntityKey::Uuid, "uuid")
        .with(EntityKey::Revision, "vid")
}

// ── Key sets ─────────────────────────────────────────────────────

#[test]
fn key_set_maps_logical_keys_to_columns() {
    let keys = article_keys();
    assert_eq!(keys.get(EntityKey::Id), Some("nid"));
    assert_eq!(keys.get(EntityKey::Bundle), Some("type"));
    assert_eq!(keys.get(EntityKey::Revision), Some("vid"));
    assert_eq!(keys.get(EntityKey::RevisionUuid), None);
    assert!(!keys.supports(EntityKey::Language));
}

#[test]
fn empty_column_names_count_as_unsupported() {
    let keys = EntityKeySet::with_id("id").with(EntityKey::Bundle, "");
    assert_eq!(keys.get(EntityKey::Bundle), None);
}

#[test]
fn key_names_keep_their_conventional_spelling() {
    assert_eq!(EntityKey::RevisionUuid.as_str(), "revision uuid");
    assert_eq!(EntityKey::ALL.len(), 6);
}

#[test]
fn key_set_deserializes_revision_uuid_alias() {
    let keys: EntityKeySet =
        serde_json::from_value(json!({"id": "nid", "revision uuid": "vuuid"})).unwrap();
    assert_eq!(keys.get(EntityKey::RevisionUuid), Some("vuuid"));
}

// ── Entity info ──────────────────────────────────────────────────

#[test]
fn entity_info_builder() {
    let info = EntityInfo::new("node", "node", article_keys())
        .with_revision_table("node_revision")
        .with_bundles(["article", "page"]);
    assert_eq!(info.revision_table(), Some("node_revision"));
    assert_eq!(info.key(EntityKey::Id), Some("nid"));
    assert_eq!(info.bundles, vec!["article".to_string(), "page".to_string()]);
}

#[test]
fn blank_revision_table_is_absent() {
    let info = EntityInfo::new("user", "users", EntityKeySet::with_id("uid")).with_revision_table("");
    assert_eq!(info.revision_table(), None);
}

// ── Record helpers ───────────────────────────────────────────────

#[test]
fn scalar_string_renders_identity_parts() {
    assert_eq!(scalar_string(&json!("abc")), "abc");
    assert_eq!(scalar_string(&json!(1000)), "1000");
    assert_eq!(scalar_string(&json!(null)), "");
    assert_eq!(scalar_string(&json!(false)), "");
}

#[test]
fn blank_values() {
    assert!(is_blank(&json!("")));
    assert!(is_blank(&json!(null)));
    assert!(is_blank(&json!("0")));
    assert!(is_blank(&json!(0)));
    assert!(!is_blank(&json!("article")));
}
