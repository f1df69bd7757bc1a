//! Reconciles fetched broker snapshots into the store.

mod pipeline;

pub use pipeline::IngestionPipeline;
