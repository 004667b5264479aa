//! Runtime orchestrator: the caller-facing operations of RepoSage.
//!
//! `Orchestrator` owns the collection router and wires the ingestion
//! pipeline, retrieval fan-out, context assembler and answer generator
//! together. HTTP handlers and other callers only talk to it.

pub mod orchestrator;
pub mod types;

pub use orchestrator::Orchestrator;
pub use types::*;
