//! SQLite storage for entkit.
//!
//! Entity types map onto their configured base and revision tables, whose
//! columns become record attributes. The id column must be an
//! `INTEGER PRIMARY KEY` so new rows get their id from SQLite.
//!
//! Field storage lives in one pair of tables per field:
//!
//! ```text
//! field_data_<field>      current values
//! field_revision_<field>  values per revision
//!
//! (entity_type, entity_id, revision_id, language, delta, data)
//! ```
//!
//! `data` holds one JSON item. Attached storage is keyed by language:
//! `{"und": [item, ...]}`.

mod schema;
mod store;
mod value;

pub use schema::{data_table, revision_table};
pub use store::{SqliteStore, SqliteUuidIndex};
