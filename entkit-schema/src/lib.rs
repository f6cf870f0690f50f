//! Entity metadata and process configuration for entkit.
//!
//! [`EntkitConfig`] is read from a TOML file describing the database, the
//! logging filter, whether the UUID subsystem is active, and every entity
//! type and field. [`SchemaCatalog`] turns the entity and field sections
//! into a [`MetadataService`](entkit_model::MetadataService).

mod catalog;
mod config;
mod error;

pub use catalog::{SchemaCatalog, SchemaCatalogBuilder};
pub use config::{
    DatabaseConfig, EntityTypeConfig, EntkitConfig, FieldConfig, FieldInstanceConfig, LoggingConfig,
    UuidConfig,
};
pub use error::{SchemaError, SchemaResult};
