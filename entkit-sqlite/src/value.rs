//! Conversion between SQLite values and JSON attribute values.

use entkit_model::{RawRecord, StorageError};
use rusqlite::Row;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// Maps a backend error onto [`StorageError::Database`].
pub(crate) fn db_err(e: rusqlite::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

/// Ids are unsigned on the entity side and signed in SQLite.
pub(crate) fn sql_int(value: u64) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|_| StorageError::InvalidData(format!("{value} exceeds the SQLite integer range")))
}

/// Attribute value as a bound parameter. Arrays and objects are stored as
/// JSON text.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            (None, Some(f)) if n.is_f64() => SqlValue::Real(f),
            _ => SqlValue::Text(n.to_string()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Reads every column of `row` into a record.
pub(crate) fn row_to_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<RawRecord> {
    let mut record = RawRecord::new();
    for (idx, name) in columns.iter().enumerate() {
        record.insert(name.clone(), from_sql(row.get_ref(idx)?));
    }
    Ok(record)
}

/// Whether an attribute is field storage rather than a column value.
pub(crate) fn is_field_storage(value: &Value) -> bool {
    value.is_array() || value.is_object()
}
