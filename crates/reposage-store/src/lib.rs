//! RepoSage Store: vector index backends and per-repository collection routing.
//!
//! `VectorIndex` is the storage seam: `SqliteIndex` persists int8-quantized
//! embeddings on disk, `InMemoryIndex` keeps float vectors in memory. The
//! `CollectionRouter` is the single entry point mapping repository ids to
//! collections in whichever backend is plugged in.

pub mod embedding;
pub mod index;
pub mod memory;
pub mod router;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use index::{CollectionHandle, VectorIndex};
pub use memory::InMemoryIndex;
pub use router::CollectionRouter;
pub use sqlite::SqliteIndex;
pub use types::*;
