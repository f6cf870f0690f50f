//! The `entkit` command-line inspector.
//!
//! Wires a [`SchemaCatalog`] from the config file, a [`SqliteStore`] and
//! the standard field handlers into an [`EntityContext`], then answers
//! one command as JSON.

mod args;

pub use args::{Cli, Command};

use anyhow::{Context, Result, anyhow, bail};
use entkit_entity::{EntityContext, EntityRecord, Loader};
use entkit_fields::HandlerRegistry;
use entkit_handlers::standard_providers;
use entkit_model::{EntityId, EntityStorage, Identifier, MetadataService, UuidService};
use entkit_schema::{EntkitConfig, SchemaCatalog};
use entkit_sqlite::SqliteStore;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A loaded configuration bound to its database.
pub struct App {
    loader: Loader,
}

impl App {
    /// Reads `config_path` and opens the configured database (or
    /// `database`, when given). Relative database paths are resolved
    /// against the config file's directory.
    pub fn open(config_path: &Path, database: Option<&Path>) -> Result<Self> {
        let config = EntkitConfig::load(config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;
        let db_path = database_path(&config, config_path, database)?;
        let store = SqliteStore::open(&db_path)?;
        Self::from_parts(&config, store)
    }

    /// Builds the app from an already parsed config and an open store.
    pub fn from_parts(config: &EntkitConfig, store: SqliteStore) -> Result<Self> {
        let catalog = SchemaCatalog::from_config(config)?;
        let metadata: Arc<dyn MetadataService> = Arc::new(catalog);
        let uuid: Arc<dyn UuidService> = Arc::new(store.uuid_index());
        let storage: Arc<dyn EntityStorage> = Arc::new(store);

        let registry = HandlerRegistry::new(standard_providers());
        registry.prepare();
        let mut builder = EntityContext::builder(metadata, storage).registry(Arc::new(registry));
        if config.uuid.enabled {
            builder = builder.uuid_service(uuid);
        }
        Ok(Self {
            loader: Loader::new(builder.build()),
        })
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Runs one command and returns its JSON output.
    pub fn run(&self, command: &Command) -> Result<Value> {
        match command {
            Command::Show {
                entity_type,
                id,
                fields,
            } => self.show(entity_type, EntityId::new(*id), fields),
            Command::Exists {
                entity_type,
                identifier,
            } => Ok(json!({ "exists": self.exists(entity_type, identifier) })),
            Command::Revisions {
                entity_type,
                id,
                switch,
            } => self.revisions(entity_type, EntityId::new(*id), switch.as_deref()),
        }
    }

    /// Keys, vuuid and decoded fields of one entity.
    pub fn show(&self, entity_type: &str, id: EntityId, fields: &[String]) -> Result<Value> {
        let mut record = self.load(entity_type, id)?;
        let names = if fields.is_empty() {
            let bundle = record.bundle().unwrap_or_else(|| entity_type.to_string());
            self.loader
                .context()
                .metadata()
                .field_instances(entity_type, &bundle)
        } else {
            fields.to_vec()
        };

        let mut decoded = Map::new();
        for name in names {
            let value = record.get(&name);
            decoded.insert(name, value);
        }
        Ok(json!({
            "entity_type": record.entity_type(),
            "id": record.id().map(|id| id.get()),
            "bundle": record.bundle(),
            "uuid": record.uuid(),
            "revision": record.revision().map(|rev| rev.get()),
            "vuuid": record.vuuid(),
            "fields": decoded,
        }))
    }

    pub fn exists(&self, entity_type: &str, identifier: &str) -> bool {
        self.loader.exists(entity_type, &Identifier::parse(identifier))
    }

    /// Latest revision of an entity and, with `switch`, the record after
    /// switching to that revision.
    pub fn revisions(&self, entity_type: &str, id: EntityId, switch: Option<&str>) -> Result<Value> {
        let mut record = self.load(entity_type, id)?;
        let latest = record.latest_revision_id(false).map(|rev| rev.get());
        let mut output = json!({
            "supported": record.supports_revisions(),
            "latest": latest,
            "current": record.revision().map(|rev| rev.get()),
        });
        if let Some(target) = switch {
            let switched = record
                .set_revision(&Identifier::parse(target))
                .with_context(|| format!("cannot switch {entity_type} {id} to revision {target}"))?;
            if !switched {
                bail!("{entity_type} {id} has no revision {target}");
            }
            debug!("switched {} {} to {}", entity_type, id, target);
            output["current"] = json!(record.revision().map(|rev| rev.get()));
            output["record"] = Value::Object(record.raw().clone());
        }
        Ok(output)
    }

    fn load(&self, entity_type: &str, id: EntityId) -> Result<EntityRecord> {
        self.loader
            .by_id(entity_type, id)?
            .ok_or_else(|| anyhow!("{entity_type} {id} not found"))
    }
}

/// The database to open: the override, else `[database] path` relative to
/// the config file.
pub fn database_path(config: &EntkitConfig, config_path: &Path, database: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = database {
        return Ok(path.to_path_buf());
    }
    let Some(path) = config.database.path.as_deref() else {
        bail!("no database configured; set [database] path or pass --database");
    };
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(base.join(path))
}
