//! Entity records for entkit.
//!
//! - [`EntityContext`]: the collaborators (metadata, storage, handler
//!   registry, optional UUID index and modified oracle) plus the revision
//!   cache, built once and shared by every record
//! - [`EntityRecord`]: a raw record with key accessors, lazy field
//!   decoding, member resolution and full-load promotion
//! - [`RevisionResolver`]: revision support checks, the latest revision
//!   cache and revision switching
//! - [`Loader`]: singular, batch, uuid and query-result loading
//! - [`EntityKind`]: typed wrappers over records, built by promotion
//!
//! Only invalid types, unsupported revision operations and invalid
//! revision identifiers are errors. Everything else that can go missing
//! (rows, fields, storage) comes back as an absent value.

mod context;
mod kind;
mod loader;
mod record;
mod revision;

pub use context::{EntityContext, EntityContextBuilder};
pub use entkit_fields::FieldLookup;
pub use kind::EntityKind;
pub use loader::{Loader, QueryMapping, QueryResult};
pub use record::{EntityRecord, KeyUpdate, Member};
pub use revision::{RevisionCache, RevisionResolver};
