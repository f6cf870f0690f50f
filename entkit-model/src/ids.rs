//! Identifier types used throughout entkit.
//!
//! Storage engines hand back ids either as JSON numbers or as numeric
//! strings, so both forms are accepted when reading them off a record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Numeric identifier of an entity within its entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Reads an id from a record attribute (number or numeric string).
    pub fn from_value(value: &Value) -> Option<Self> {
        numeric_value(value).map(Self)
    }

    /// The id as it is stored on a record.
    pub fn to_value(&self) -> Value {
        Value::from(self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Numeric identifier of one revision of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Reads a revision id from a record attribute (number or numeric string).
    pub fn from_value(value: &Value) -> Option<Self> {
        numeric_value(value).map(Self)
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.0)
    }
}

impl From<u64> for RevisionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either a numeric id or a UUID, as accepted by lookups that take both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifier {
    Numeric(u64),
    Uuid(String),
}

impl Identifier {
    /// Classifies a caller-supplied identifier: all-digit strings are
    /// numeric, anything else is treated as a UUID.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(id) if !trimmed.is_empty() => Self::Numeric(id),
            _ => Self::Uuid(raw.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Whether the identifier reads as any finite number, including
    /// negatives and decimals such as `"-3"` or `"1.5"`. Those can never
    /// name a stored row but are still numbers rather than UUIDs.
    pub fn is_number_like(&self) -> bool {
        match self {
            Self::Numeric(_) => true,
            Self::Uuid(raw) => raw.trim().parse::<f64>().is_ok_and(f64::is_finite),
        }
    }

    /// The identifier as a record attribute value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Numeric(id) => Value::from(*id),
            Self::Uuid(uuid) => Value::String(uuid.clone()),
        }
    }
}

impl From<EntityId> for Identifier {
    fn from(id: EntityId) -> Self {
        Self::Numeric(id.get())
    }
}

impl From<RevisionId> for Identifier {
    fn from(id: RevisionId) -> Self {
        Self::Numeric(id.get())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Uuid(uuid) => f.write_str(uuid),
        }
    }
}

fn numeric_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
