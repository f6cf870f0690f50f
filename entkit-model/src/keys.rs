//! Entity keys: the per-type mapping from logical key to physical column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical entity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKey {
    Id,
    Bundle,
    Uuid,
    Revision,
    RevisionUuid,
    Language,
}

impl EntityKey {
    pub const ALL: [EntityKey; 6] = [
        EntityKey::Id,
        EntityKey::Bundle,
        EntityKey::Uuid,
        EntityKey::Revision,
        EntityKey::RevisionUuid,
        EntityKey::Language,
    ];

    /// The key's conventional name (`"revision uuid"` keeps its space).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Bundle => "bundle",
            Self::Uuid => "uuid",
            Self::Revision => "revision",
            Self::RevisionUuid => "revision uuid",
            Self::Language => "language",
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical attribute names holding each logical key for one entity type.
///
/// Keys a type does not support are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKeySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "revision uuid")]
    pub revision_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl EntityKeySet {
    /// Starts a key set with only the id column.
    pub fn with_id(column: &str) -> Self {
        Self {
            id: Some(column.into()),
            ..Self::default()
        }
    }

    /// Returns a copy of the key set with `key` mapped to `column`.
    #[must_use]
    pub fn with(mut self, key: EntityKey, column: &str) -> Self {
        *self.slot(key) = Some(column.into());
        self
    }

    /// Physical column for `key`, if the type supports it.
    pub fn get(&self, key: EntityKey) -> Option<&str> {
        match key {
            EntityKey::Id => self.id.as_deref(),
            EntityKey::Bundle => self.bundle.as_deref(),
            EntityKey::Uuid => self.uuid.as_deref(),
            EntityKey::Revision => self.revision.as_deref(),
            EntityKey::RevisionUuid => self.revision_uuid.as_deref(),
            EntityKey::Language => self.language.as_deref(),
        }
        .filter(|column| !column.is_empty())
    }

    pub fn supports(&self, key: EntityKey) -> bool {
        self.get(key).is_some()
    }

    fn slot(&mut self, key: EntityKey) -> &mut Option<String> {
        match key {
            EntityKey::Id => &mut self.id,
            EntityKey::Bundle => &mut self.bundle,
            EntityKey::Uuid => &mut self.uuid,
            EntityKey::Revision => &mut self.revision,
            EntityKey::RevisionUuid => &mut self.revision_uuid,
            EntityKey::Language => &mut self.language,
        }
    }
}

/// Everything the entity layer needs to know about one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub entity_type: String,
    /// Table holding one summary row per entity.
    pub base_table: String,
    /// Table holding one row per revision, when the type is revisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_table: Option<String>,
    pub keys: EntityKeySet,
    #[serde(default)]
    pub bundles: Vec<String>,
}

impl EntityInfo {
    pub fn new(entity_type: &str, base_table: &str, keys: EntityKeySet) -> Self {
        Self {
            entity_type: entity_type.into(),
            base_table: base_table.into(),
            revision_table: None,
            keys,
            bundles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_revision_table(mut self, table: &str) -> Self {
        self.revision_table = Some(table.into());
        self
    }

    #[must_use]
    pub fn with_bundles<I, S>(mut self, bundles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bundles = bundles.into_iter().map(Into::into).collect();
        self
    }

    /// Physical column for `key`.
    pub fn key(&self, key: EntityKey) -> Option<&str> {
        self.keys.get(key)
    }

    /// Revision table name, treating an empty name as absent.
    pub fn revision_table(&self) -> Option<&str> {
        self.revision_table.as_deref().filter(|t| !t.is_empty())
    }
}
