//! In-memory storage for entkit.
//!
//! [`MemoryStore`] implements [`EntityStorage`](entkit_model::EntityStorage)
//! and [`UuidService`](entkit_model::UuidService) over plain maps. It backs
//! fixtures, demos and the test suites of the other crates, and can be told
//! to misbehave (shuffled batch results, failing field loads) to exercise
//! the entity layer's degradation paths.

mod store;

pub use store::{CallCounts, MemoryStore};
