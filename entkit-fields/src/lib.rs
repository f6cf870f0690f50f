//! Field decoding for entkit.
//!
//! - [`HandlerRegistry`]: catalog of field type to handler, built once from
//!   an explicit list of [`FieldValueHandler`] providers
//! - [`FieldAccessor`]: resolves a field name on a raw record to decoded
//!   values, attaching field storage on demand
//!
//! A field whose type has no handler is invisible to this layer: it is
//! reported as [`FieldLookup::NotFound`], never as an error.

mod accessor;
mod items;
mod registry;

pub use accessor::{FieldAccessor, FieldLookup, FieldRequest, record_bundle};
pub use items::{field_items, field_language};
pub use registry::{FieldCall, FieldValueHandler, Handler, HandlerRegistry};
