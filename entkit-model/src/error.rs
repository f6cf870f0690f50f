//! Error types shared by the entity layer and its storage collaborators.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for entity operations.
pub type EntityResult<T> = Result<T, EntityError>;

/// Errors reported by an [`EntityStorage`](crate::EntityStorage) implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend failure (query, connection, constraint).
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record has no storage row yet (never saved).
    #[error("record not persisted: {0}")]
    NotPersisted(String),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Errors that terminate an entity operation.
///
/// Only the conditions listed here are hard failures. Missing rows,
/// undecodable fields and transient field storage failures are reported
/// as absent values instead.
#[derive(Debug, Error)]
pub enum EntityError {
    /// Metadata has no entry, or no base table, for the entity type.
    #[error("the entity type {0} is invalid")]
    InvalidType(String),

    /// A revision operation on a type without revision support.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A non-numeric revision identifier without the UUID subsystem.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Storage failure on a path that must report it (save, delete).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
