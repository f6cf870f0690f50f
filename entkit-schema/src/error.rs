//! Error types for schema and configuration loading.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// IO error reading the config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document parsed but describes an inconsistent schema.
    #[error("invalid schema: {0}")]
    Invalid(String),
}
