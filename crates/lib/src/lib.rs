//! # casewatch
//!
//! A case-monitoring pipeline for legal teams. A user uploads a case file; the
//! pipeline extracts searchable legal terms, indexes the file as embedded chunks in
//! a per-user namespace, scans the web for recent developments matching those terms,
//! and raises prioritized alerts with a rationale grounded in the matched passages.
//!
//! External capabilities (generation, embedding, entity recognition, web search)
//! sit behind async traits in [`providers`]; persistence sits behind the store traits
//! in [`store`] and the [`index::VectorIndex`]. [`pipeline::Pipeline`] ties them together.

pub mod alerts;
pub mod call;
pub mod canonical;
pub mod chunk;
pub mod constants;
pub mod embedding;
pub mod errors;
pub mod extract;
pub mod index;
pub mod matcher;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod scanner;
pub mod settings;
pub mod store;
pub mod types;

pub use errors::{PipelineError, ProviderError, StoreError};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use settings::PipelineSettings;
pub use store::{memory::MemoryStore, sqlite::SqliteStore};
