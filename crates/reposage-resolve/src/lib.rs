//! RepoSage Resolve: multi-collection retrieval and context assembly.
//!
//! `Retriever` fans a query out over candidate repositories and aggregates
//! the hits in candidate order; `ContextAssembler` turns the result into the
//! context string handed to the answer generator.

pub mod context;
pub mod fanout;
pub mod types;

pub use context::ContextAssembler;
pub use fanout::Retriever;
pub use types::*;
