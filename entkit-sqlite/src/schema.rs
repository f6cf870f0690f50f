//! Table naming and introspection.

use crate::value::db_err;
use entkit_model::StorageResult;
use rusqlite::{Connection, params};

const DATA_PREFIX: &str = "field_data_";
const REVISION_PREFIX: &str = "field_revision_";

/// Table holding the current values of `field_name`.
pub fn data_table(field_name: &str) -> String {
    format!("{DATA_PREFIX}{field_name}")
}

/// Table holding the per-revision values of `field_name`.
pub fn revision_table(field_name: &str) -> String {
    format!("{REVISION_PREFIX}{field_name}")
}

/// Quotes an identifier taken from configuration.
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> StorageResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .map_err(db_err)?;
    Ok(count > 0)
}

/// Column names of `table`, in declaration order. Empty if it does not exist.
pub(crate) fn table_columns(conn: &Connection, table: &str) -> StorageResult<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote(table)))
        .map_err(db_err)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(db_err)?;
    names.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

/// Names of every field with a data table.
pub(crate) fn field_names(conn: &Connection) -> StorageResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, ?1) = ?2 ORDER BY name")
        .map_err(db_err)?;
    let tables = stmt
        .query_map(params![DATA_PREFIX.len() as i64, DATA_PREFIX], |row| row.get::<_, String>(0))
        .map_err(db_err)?;
    let mut names = Vec::new();
    for table in tables {
        let table = table.map_err(db_err)?;
        if let Some(name) = table.strip_prefix(DATA_PREFIX) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

pub(crate) fn create_field_tables(conn: &Connection, field_name: &str) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS {data} (
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            revision_id INTEGER,
            language TEXT NOT NULL DEFAULT 'und',
            delta INTEGER NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (entity_type, entity_id, language, delta)
        );

        CREATE TABLE IF NOT EXISTS {revision} (
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            revision_id INTEGER NOT NULL,
            language TEXT NOT NULL DEFAULT 'und',
            delta INTEGER NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (entity_type, entity_id, revision_id, language, delta)
        );
        ",
        data = quote(&data_table(field_name)),
        revision = quote(&revision_table(field_name)),
    ))
    .map_err(db_err)
}
