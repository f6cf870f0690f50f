use entkit_fields::{FieldCall, FieldValueHandler};
use entkit_handlers::{ReferenceProvider, standard_providers, standard_registry};
use entkit_model::{EntityId, EntityReference, FieldValue};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

fn decode(field_type: &str, item: Value) -> Option<FieldValue> {
    decode_with(field_type, item, &[])
}

fn decode_with(field_type: &str, item: Value, args: &[Value]) -> Option<FieldValue> {
    let registry = standard_registry();
    registry.handle(&FieldCall {
        field_type,
        item: &item,
        field_name: "field_x",
        delta: 0,
        args,
    })
}

// ── Catalog ──────────────────────────────────────────────────────

#[test]
fn standard_providers_have_distinct_names_in_fixed_order() {
    let names: Vec<String> = standard_providers().iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["text", "number", "boolean", "list", "reference"]);
}

#[test]
fn registry_covers_every_standard_field_type() {
    let registry = standard_registry();
    assert_eq!(
        registry.field_types(),
        vec![
            "entityreference",
            "list_boolean",
            "list_integer",
            "list_text",
            "node_reference",
            "number_decimal",
            "number_float",
            "number_integer",
            "taxonomy_term_reference",
            "text",
            "text_long",
            "text_with_summary",
            "user_reference",
        ]
    );
    assert!(!registry.handles_type("image"));
}

// ── Text ─────────────────────────────────────────────────────────

#[test]
fn text_keeps_summary_and_format() {
    let decoded = decode(
        "text_with_summary",
        json!({"value": "<p>Body</p>", "summary": "Short", "format": "filtered_html"}),
    );
    assert_eq!(
        decoded,
        Some(FieldValue::Text {
            value: "<p>Body</p>".into(),
            summary: Some("Short".into()),
            format: Some("filtered_html".into()),
        })
    );
}

#[test]
fn empty_text_has_no_value() {
    assert_eq!(decode("text", json!({"value": ""})), None);
    assert_eq!(decode("text_long", json!({"format": "plain_text"})), None);
}

#[test]
fn bare_scalar_items_stand_for_the_value_column() {
    assert_eq!(decode("text", json!("Plain")), Some(FieldValue::text("Plain")));
    assert_eq!(decode("number_integer", json!(7)), Some(FieldValue::Scalar(json!(7))));
}

// ── Numbers ──────────────────────────────────────────────────────

#[test]
fn integers_accept_numeric_strings() {
    assert_eq!(decode("number_integer", json!({"value": "42"})), Some(FieldValue::Scalar(json!(42))));
    assert_eq!(decode("number_integer", json!({"value": "forty"})), None);
}

#[test]
fn decimals_stay_strings() {
    assert_eq!(
        decode("number_decimal", json!({"value": "10.50"})),
        Some(FieldValue::Scalar(json!("10.50")))
    );
    assert_eq!(decode("number_decimal", json!({"value": "n/a"})), None);
}

#[test]
fn floats_become_numbers() {
    let decoded = decode("number_float", json!({"value": "2.5"}));
    assert_eq!(decoded.and_then(|v| v.as_f64()), Some(2.5));
}

// ── Lists ────────────────────────────────────────────────────────

#[test]
fn list_boolean_uses_truthiness() {
    assert_eq!(decode("list_boolean", json!({"value": 1})), Some(FieldValue::Scalar(json!(true))));
    assert_eq!(decode("list_boolean", json!({"value": "0"})), Some(FieldValue::Scalar(json!(false))));
    assert_eq!(decode("list_boolean", json!({})), None);
}

#[test]
fn list_keys_decode_by_type() {
    assert_eq!(decode("list_text", json!({"value": "red"})), Some(FieldValue::Scalar(json!("red"))));
    assert_eq!(decode("list_integer", json!({"value": "3"})), Some(FieldValue::Scalar(json!(3))));
}

// ── References ───────────────────────────────────────────────────

#[test]
fn references_use_conventional_target_types() {
    let cases = [
        ("taxonomy_term_reference", json!({"tid": 4}), "taxonomy_term"),
        ("node_reference", json!({"nid": "9"}), "node"),
        ("user_reference", json!({"uid": 1}), "user"),
        ("entityreference", json!({"target_id": 12}), "node"),
    ];
    for (field_type, item, target) in cases {
        let decoded = decode(field_type, item.clone());
        let expected_id = item
            .as_object()
            .and_then(|o| o.values().next())
            .and_then(EntityId::from_value)
            .unwrap();
        assert_eq!(
            decoded,
            Some(FieldValue::Reference(EntityReference::new(target, expected_id))),
            "{field_type}"
        );
    }
}

#[test]
fn reference_target_type_comes_from_extra_argument() {
    let decoded = decode_with("entityreference", json!({"target_id": 3}), &[json!("commerce_product")]);
    assert_eq!(
        decoded,
        Some(FieldValue::Reference(EntityReference::new("commerce_product", EntityId::new(3))))
    );
}

#[test]
fn reference_without_target_id_has_no_value() {
    assert_eq!(decode("entityreference", json!({"target_id": null})), None);
}

#[test]
fn reference_provider_rejects_unknown_field_types() {
    let item = json!({"value": 1});
    let call = FieldCall {
        field_type: "file",
        item: &item,
        field_name: "field_file",
        delta: 0,
        args: &[],
    };
    assert_eq!(ReferenceProvider.call("reference", &call), None);
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn integer_items_round_trip(n in any::<i64>()) {
        prop_assert_eq!(
            decode("number_integer", json!({"value": n.to_string()})),
            Some(FieldValue::Scalar(json!(n)))
        );
    }

    #[test]
    fn non_empty_text_always_decodes(s in "[a-zA-Z0-9 ]{1,40}") {
        prop_assert_eq!(decode("text", json!({"value": s.clone()})), Some(FieldValue::text(s)));
    }
}
