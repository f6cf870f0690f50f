use crate::record::EntityRecord;

/// A specialized view over an [`EntityRecord`].
///
/// Kinds are built by promotion: the generic loader produces plain
/// records and [`EntityRecord::promote`] rewraps one as `K` without
/// touching storage.
pub trait EntityKind: Sized {
    /// Entity type this kind is bound to, if any. Loaders reject records of
    /// other types when set.
    const ENTITY_TYPE: Option<&'static str> = None;

    fn from_record(record: EntityRecord) -> Self;

    fn as_record(&self) -> &EntityRecord;

    fn as_record_mut(&mut self) -> &mut EntityRecord;

    fn into_record(self) -> EntityRecord;
}

impl EntityKind for EntityRecord {
    fn from_record(record: EntityRecord) -> Self {
        record
    }

    fn as_record(&self) -> &EntityRecord {
        self
    }

    fn as_record_mut(&mut self) -> &mut EntityRecord {
        self
    }

    fn into_record(self) -> EntityRecord {
        self
    }
}
