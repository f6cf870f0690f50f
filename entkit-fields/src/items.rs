//! Reading field items off a raw record.
//!
//! Field storage is attached under the field's name either as a plain list
//! of items or keyed by language code (`{"und": [..], "fr": [..]}`).

use entkit_model::{LANGUAGE_NONE, RawRecord};
use serde_json::Value;

/// The language whose items are used for `field_name`: the preferred
/// language if stored, else the language-neutral code, else the only
/// language present. `None` for unkeyed or absent storage.
pub fn field_language(record: &RawRecord, field_name: &str, preferred: Option<&str>) -> Option<String> {
    let Value::Object(by_language) = record.get(field_name)? else {
        return None;
    };
    if let Some(lang) = preferred.filter(|l| by_language.contains_key(*l)) {
        return Some(lang.to_string());
    }
    if by_language.contains_key(LANGUAGE_NONE) {
        return Some(LANGUAGE_NONE.to_string());
    }
    if by_language.len() == 1 {
        return by_language.keys().next().cloned();
    }
    None
}

/// Items stored for `field_name`, or `None` when the field holds no items
/// (absent, null, or an empty list).
pub fn field_items<'a>(record: &'a RawRecord, field_name: &str, preferred: Option<&str>) -> Option<&'a [Value]> {
    let items = match record.get(field_name)? {
        Value::Array(items) => items.as_slice(),
        Value::Object(by_language) => {
            let lang = field_language(record, field_name, preferred)?;
            by_language.get(&lang)?.as_array()?.as_slice()
        }
        _ => return None,
    };
    if items.is_empty() { None } else { Some(items) }
}
