use crate::schema::{
    create_field_tables, data_table, field_names, quote, revision_table, table_columns, table_exists,
};
use crate::value::{db_err, is_field_storage, row_to_record, sql_int, to_sql};
use entkit_model::{
    EntityId, EntityInfo, EntityKey, EntityStorage, FieldSelector, Identifier, LANGUAGE_NONE,
    RawRecord, RevisionId, StorageError, StorageResult, UuidService,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Params, params, params_from_iter};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Ids bound per `IN (...)` query, well under SQLite's parameter limit.
const ID_BATCH_SIZE: usize = 500;

/// Entity storage backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Database(format!("failed to open {}: {e}", path.display())))?;
        info!("opened entity store at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Database(format!("failed to open in-memory store: {e}")))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// A uuid index sharing this store's connection.
    pub fn uuid_index(&self) -> SqliteUuidIndex {
        SqliteUuidIndex {
            conn: Arc::clone(&self.conn),
        }
    }

    /// Runs a batch of SQL statements (schema setup, fixtures).
    pub fn execute_batch(&self, sql: &str) -> StorageResult<()> {
        self.lock().execute_batch(sql).map_err(db_err)
    }

    /// Creates the data and revision tables of `field_name`.
    pub fn create_field_tables(&self, field_name: &str) -> StorageResult<()> {
        create_field_tables(&self.lock(), field_name)
    }

    /// Stores one field item, creating the field's tables when needed.
    ///
    /// With a revision the item goes to the revision table, and to the data
    /// table as well when `current` is set.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_field_item(
        &self,
        entity_type: &str,
        field_name: &str,
        id: EntityId,
        revision: Option<RevisionId>,
        language: &str,
        delta: usize,
        item: &Value,
    ) -> StorageResult<()> {
        let conn = self.lock();
        create_field_tables(&conn, field_name)?;
        let revision_id = revision.map(|r| sql_int(r.get())).transpose()?;
        let data = serde_json::to_string(item)?;
        let mut targets = vec![data_table(field_name)];
        if revision.is_some() {
            targets.push(revision_table(field_name));
        }
        for table in targets {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO {} (entity_type, entity_id, revision_id, language, delta, data) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    quote(&table)
                ),
                params![entity_type, sql_int(id.get())?, revision_id, language, delta as i64, data],
            )
            .map_err(db_err)?;
        }
        Ok(())
    }

    /// Stores one field item for an older revision only.
    pub fn insert_revision_field_item(
        &self,
        entity_type: &str,
        field_name: &str,
        id: EntityId,
        revision: RevisionId,
        delta: usize,
        item: &Value,
    ) -> StorageResult<()> {
        let conn = self.lock();
        create_field_tables(&conn, field_name)?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (entity_type, entity_id, revision_id, language, delta, data) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                quote(&revision_table(field_name))
            ),
            params![
                entity_type,
                sql_int(id.get())?,
                sql_int(revision.get())?,
                LANGUAGE_NONE,
                delta as i64,
                serde_json::to_string(item)?
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn id_column(info: &EntityInfo) -> StorageResult<&str> {
    info.key(EntityKey::Id)
        .ok_or_else(|| StorageError::InvalidData(format!("{} has no id key", info.entity_type)))
}

/// Revision table and revision column, when the type is revisioned.
fn revisioning(info: &EntityInfo) -> Option<(&str, &str)> {
    info.revision_table().zip(info.key(EntityKey::Revision))
}

/// Revision a record's field storage is keyed by.
fn storage_revision(info: &EntityInfo, record: &RawRecord) -> Option<RevisionId> {
    let (_, column) = revisioning(info)?;
    record.get(column).and_then(RevisionId::from_value)
}

fn query_records<P: Params>(conn: &Connection, sql: &str, params: P) -> StorageResult<Vec<RawRecord>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map(params, |row| row_to_record(row, &columns))
        .map_err(db_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

fn row_exists(conn: &Connection, table: &str, id_column: &str, id: EntityId) -> StorageResult<bool> {
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", quote(table), quote(id_column)),
            params![sql_int(id.get())?],
            |row| row.get(0),
        )
        .map_err(db_err)?;
    Ok(count > 0)
}

/// Reads one field's storage for an entity, keyed by language. An empty
/// list when nothing is stored.
fn read_field(
    conn: &Connection,
    entity_type: &str,
    field_name: &str,
    id: EntityId,
    revision: Option<RevisionId>,
) -> StorageResult<Value> {
    let table = match revision {
        Some(_) => revision_table(field_name),
        None => data_table(field_name),
    };
    if !table_exists(conn, &table)? {
        return Ok(Value::Array(Vec::new()));
    }

    let mut sql = format!(
        "SELECT language, data FROM {} WHERE entity_type = ?1 AND entity_id = ?2",
        quote(&table)
    );
    let mut bound: Vec<SqlValue> = vec![
        SqlValue::Text(entity_type.to_string()),
        SqlValue::Integer(sql_int(id.get())?),
    ];
    if let Some(revision) = revision {
        sql.push_str(" AND revision_id = ?3");
        bound.push(SqlValue::Integer(sql_int(revision.get())?));
    }
    sql.push_str(" ORDER BY language, delta");

    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params_from_iter(bound), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(db_err)?;

    let mut by_language: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for row in rows {
        let (language, data) = row.map_err(db_err)?;
        by_language
            .entry(language)
            .or_default()
            .push(serde_json::from_str(&data)?);
    }
    if by_language.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    Ok(Value::Object(
        by_language
            .into_iter()
            .map(|(language, items)| (language, Value::Array(items)))
            .collect::<Map<String, Value>>(),
    ))
}

/// Items of an attached field attribute, grouped by language.
fn items_by_language(storage: &Value) -> Vec<(String, &[Value])> {
    match storage {
        Value::Array(items) => vec![(LANGUAGE_NONE.to_string(), items.as_slice())],
        Value::Object(by_language) => by_language
            .iter()
            .filter_map(|(language, items)| items.as_array().map(|items| (language.clone(), items.as_slice())))
            .collect(),
        _ => Vec::new(),
    }
}

fn write_field(
    conn: &Connection,
    entity_type: &str,
    field_name: &str,
    id: EntityId,
    revision: Option<RevisionId>,
    storage: &Value,
) -> StorageResult<()> {
    create_field_tables(conn, field_name)?;
    let entity_id = sql_int(id.get())?;
    let revision_id = revision.map(|r| sql_int(r.get())).transpose()?;

    conn.execute(
        &format!(
            "DELETE FROM {} WHERE entity_type = ?1 AND entity_id = ?2",
            quote(&data_table(field_name))
        ),
        params![entity_type, entity_id],
    )
    .map_err(db_err)?;
    if let Some(revision_id) = revision_id {
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE entity_type = ?1 AND entity_id = ?2 AND revision_id = ?3",
                quote(&revision_table(field_name))
            ),
            params![entity_type, entity_id, revision_id],
        )
        .map_err(db_err)?;
    }

    let mut targets = vec![data_table(field_name)];
    if revision_id.is_some() {
        targets.push(revision_table(field_name));
    }
    for (language, items) in items_by_language(storage) {
        for (delta, item) in items.iter().enumerate() {
            let data = serde_json::to_string(item)?;
            for table in &targets {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (entity_type, entity_id, revision_id, language, delta, data) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        quote(table)
                    ),
                    params![entity_type, entity_id, revision_id, language, delta as i64, data],
                )
                .map_err(db_err)?;
            }
        }
    }
    Ok(())
}

/// Column values of `record` that `table` has, excluding `skip`.
fn column_values(columns: &[String], record: &RawRecord, skip: &[&str]) -> Vec<(String, SqlValue)> {
    columns
        .iter()
        .filter(|column| !skip.contains(&column.as_str()))
        .filter_map(|column| {
            record
                .get(column)
                .filter(|value| !is_field_storage(value))
                .map(|value| (column.clone(), to_sql(value)))
        })
        .collect()
}

fn insert_row(conn: &Connection, table: &str, values: Vec<(String, SqlValue)>) -> StorageResult<i64> {
    if values.is_empty() {
        conn.execute(&format!("INSERT INTO {} DEFAULT VALUES", quote(table)), [])
            .map_err(db_err)?;
        return Ok(conn.last_insert_rowid());
    }
    let (columns, bound): (Vec<String>, Vec<SqlValue>) = values.into_iter().unzip();
    let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table),
            names.join(", "),
            placeholders.join(", ")
        ),
        params_from_iter(bound),
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

fn update_row(
    conn: &Connection,
    table: &str,
    id_column: &str,
    id: EntityId,
    values: Vec<(String, SqlValue)>,
) -> StorageResult<()> {
    if values.is_empty() {
        return Ok(());
    }
    let (columns, mut bound): (Vec<String>, Vec<SqlValue>) = values.into_iter().unzip();
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quote(c), i + 1))
        .collect();
    bound.push(SqlValue::Integer(sql_int(id.get())?));
    conn.execute(
        &format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote(table),
            assignments.join(", "),
            quote(id_column),
            bound.len()
        ),
        params_from_iter(bound),
    )
    .map_err(db_err)?;
    Ok(())
}

impl EntityStorage for SqliteStore {
    fn load_summary_row(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RawRecord>> {
        let conn = self.lock();
        let rows = query_records(
            &conn,
            &format!(
                "SELECT * FROM {} WHERE {} = ?1 LIMIT 1",
                quote(&info.base_table),
                quote(id_column(info)?)
            ),
            params![sql_int(id.get())?],
        )?;
        Ok(rows.into_iter().next())
    }

    fn load_summary_rows(&self, info: &EntityInfo, ids: &[EntityId]) -> StorageResult<Vec<RawRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let bound = ids
            .iter()
            .map(|id| sql_int(id.get()))
            .collect::<StorageResult<Vec<i64>>>()?;
        let table = quote(&info.base_table);
        let column = quote(id_column(info)?);
        let conn = self.lock();
        let mut rows = Vec::with_capacity(bound.len());
        for chunk in bound.chunks(ID_BATCH_SIZE) {
            let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{i}")).collect();
            rows.extend(query_records(
                &conn,
                &format!("SELECT * FROM {table} WHERE {column} IN ({})", placeholders.join(", ")),
                params_from_iter(chunk),
            )?);
        }
        Ok(rows)
    }

    fn load_full_record(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RawRecord>> {
        let Some(mut record) = self.load_summary_row(info, id)? else {
            return Ok(None);
        };
        let revision = storage_revision(info, &record);
        let conn = self.lock();
        for field_name in field_names(&conn)? {
            let storage = read_field(&conn, &info.entity_type, &field_name, id, revision)?;
            record.insert(field_name, storage);
        }
        debug!("full load of {} {}", info.entity_type, id);
        Ok(Some(record))
    }

    fn load_field_storage(
        &self,
        info: &EntityInfo,
        records: &mut [(EntityId, &mut RawRecord)],
        field: &FieldSelector,
    ) -> StorageResult<()> {
        let id_column = id_column(info)?;
        let conn = self.lock();
        for (id, record) in records.iter_mut() {
            if !row_exists(&conn, &info.base_table, id_column, *id)? {
                return Err(StorageError::NotPersisted(format!("{} {}", info.entity_type, id)));
            }
            let revision = storage_revision(info, record);
            let storage = read_field(&conn, &info.entity_type, &field.field_name, *id, revision)?;
            debug!("attached {} to {} {}", field.field_name, info.entity_type, id);
            record.insert(field.field_name.clone(), storage);
        }
        Ok(())
    }

    fn latest_revision_id(&self, info: &EntityInfo, id: EntityId) -> StorageResult<Option<RevisionId>> {
        let Some((table, column)) = revisioning(info) else {
            return Ok(None);
        };
        let conn = self.lock();
        let latest: Option<i64> = conn
            .query_row(
                &format!(
                    "SELECT MAX({}) FROM {} WHERE {} = ?1",
                    quote(column),
                    quote(table),
                    quote(id_column(info)?)
                ),
                params![sql_int(id.get())?],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(latest.and_then(|rev| u64::try_from(rev).ok()).map(RevisionId::new))
    }

    fn load_revision_row(
        &self,
        info: &EntityInfo,
        id: EntityId,
        revision: &Identifier,
    ) -> StorageResult<Option<RawRecord>> {
        let Some((table, revision_column)) = revisioning(info) else {
            return Ok(None);
        };
        let (column, value) = match revision {
            Identifier::Numeric(rev) => (revision_column, SqlValue::Integer(sql_int(*rev)?)),
            Identifier::Uuid(uuid) => match info.key(EntityKey::RevisionUuid) {
                Some(column) => (column, SqlValue::Text(uuid.clone())),
                None => return Ok(None),
            },
        };
        let conn = self.lock();
        let rows = query_records(
            &conn,
            &format!(
                "SELECT * FROM {} WHERE {} = ?1 AND {} = ?2 LIMIT 1",
                quote(table),
                quote(id_column(info)?),
                quote(column)
            ),
            params![sql_int(id.get())?, value],
        )?;
        Ok(rows.into_iter().next())
    }

    fn save(&self, info: &EntityInfo, record: &mut RawRecord) -> StorageResult<bool> {
        let id_column = id_column(info)?;
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(db_err)?;

        if let Some(column) = info.key(EntityKey::Uuid) {
            if record.get(column).is_none_or(Value::is_null) {
                record.insert(column.into(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
        }
        if let Some((table, column)) = revisioning(info) {
            if record.get(column).and_then(RevisionId::from_value).is_none() {
                let next: i64 = tx
                    .query_row(
                        &format!("SELECT COALESCE(MAX({}), 0) + 1 FROM {}", quote(column), quote(table)),
                        [],
                        |row| row.get(0),
                    )
                    .map_err(db_err)?;
                record.insert(column.into(), Value::from(next));
            }
        }

        let base_columns = table_columns(&tx, &info.base_table)?;
        if base_columns.is_empty() {
            return Err(StorageError::InvalidData(format!("table {} does not exist", info.base_table)));
        }
        let id = match record.get(id_column).and_then(EntityId::from_value) {
            Some(id) if row_exists(&tx, &info.base_table, id_column, id)? => {
                update_row(&tx, &info.base_table, id_column, id, column_values(&base_columns, record, &[id_column]))?;
                id
            }
            Some(id) => {
                insert_row(&tx, &info.base_table, column_values(&base_columns, record, &[]))?;
                id
            }
            None => {
                let rowid = insert_row(&tx, &info.base_table, column_values(&base_columns, record, &[id_column]))?;
                let id = EntityId::new(
                    u64::try_from(rowid).map_err(|_| StorageError::InvalidData(format!("negative rowid {rowid}")))?,
                );
                record.insert(id_column.into(), id.to_value());
                id
            }
        };

        let revision = storage_revision(info, record);
        if let (Some((table, column)), Some(revision)) = (revisioning(info), revision) {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
                    quote(table),
                    quote(id_column),
                    quote(column)
                ),
                params![sql_int(id.get())?, sql_int(revision.get())?],
            )
            .map_err(db_err)?;
            let revision_columns = table_columns(&tx, table)?;
            insert_row(&tx, table, column_values(&revision_columns, record, &[]))?;
        }

        for (name, storage) in record.iter().filter(|(_, v)| is_field_storage(v)) {
            write_field(&tx, &info.entity_type, name, id, revision, storage)?;
        }
        tx.commit().map_err(db_err)?;
        debug!("saved {} {}", info.entity_type, id);
        Ok(true)
    }

    fn delete(&self, info: &EntityInfo, id: EntityId) -> StorageResult<bool> {
        let id_column = id_column(info)?;
        let entity_id = sql_int(id.get())?;
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let removed = tx
            .execute(
                &format!("DELETE FROM {} WHERE {} = ?1", quote(&info.base_table), quote(id_column)),
                params![entity_id],
            )
            .map_err(db_err)?;
        if let Some((table, _)) = revisioning(info) {
            tx.execute(
                &format!("DELETE FROM {} WHERE {} = ?1", quote(table), quote(id_column)),
                params![entity_id],
            )
            .map_err(db_err)?;
        }
        for field_name in field_names(&tx)? {
            for table in [data_table(&field_name), revision_table(&field_name)] {
                tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE entity_type = ?1 AND entity_id = ?2",
                        quote(&table)
                    ),
                    params![info.entity_type, entity_id],
                )
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        debug!("deleted {} {}", info.entity_type, id);
        Ok(removed > 0)
    }

    fn count_matching(&self, info: &EntityInfo, column: &str, value: &Value) -> StorageResult<u64> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                    quote(&info.base_table),
                    quote(column)
                ),
                params![to_sql(value)],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Resolves uuids against the base table's uuid column.
#[derive(Clone)]
pub struct SqliteUuidIndex {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteUuidIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteUuidIndex").finish_non_exhaustive()
    }
}

impl UuidService for SqliteUuidIndex {
    fn resolve_ids_by_uuid(&self, info: &EntityInfo, uuids: &[String]) -> StorageResult<Vec<EntityId>> {
        let Some(uuid_column) = info.key(EntityKey::Uuid) else {
            return Ok(Vec::new());
        };
        let id_column = id_column(info)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 LIMIT 1",
            quote(id_column),
            quote(&info.base_table),
            quote(uuid_column)
        );
        let mut ids = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            let id: Option<i64> = conn
                .query_row(&sql, params![uuid], |row| row.get(0))
                .optional()
                .map_err(db_err)?;
            if let Some(id) = id.and_then(|id| u64::try_from(id).ok()) {
                ids.push(EntityId::new(id));
            }
        }
        Ok(ids)
    }
}
