//! Core model for entkit.
//!
//! Defines the plugin-agnostic types every other entkit crate depends on:
//! - [`EntityId`] / [`Identifier`]: numeric ids and id-or-uuid identifiers
//! - [`EntityKeySet`] / [`EntityInfo`]: logical key to physical column mapping
//! - [`RawRecord`]: the mutable attribute map a storage row is loaded into
//! - [`FieldValue`] / [`FieldValueCollection`]: decoded field values
//! - the collaborator traits ([`MetadataService`], [`EntityStorage`],
//!   [`UuidService`], [`ModifiedOracle`]) that the entity layer is built on
//!
//! Nothing in this crate touches a database; storage engines implement
//! [`EntityStorage`] in their own crates.

mod error;
mod ids;
mod keys;
mod metadata;
mod record;
mod storage;
mod value;

pub use error::{EntityError, EntityResult, StorageError, StorageResult};
pub use ids::{EntityId, Identifier, RevisionId};
pub use keys::{EntityInfo, EntityKey, EntityKeySet};
pub use metadata::{FieldInfo, FieldInstanceInfo, MetadataService, require_entity_info};
pub use record::{RawRecord, is_blank, scalar_string};
pub use storage::{EntityStorage, FieldSelector, ModifiedOracle, UuidService};
pub use value::{EntityReference, FieldValue, FieldValueCollection};

/// Language code under which untranslatable field items are stored.
pub const LANGUAGE_NONE: &str = "und";
