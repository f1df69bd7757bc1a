//! Collection run models shared by the ingestion pipeline and its callers.

mod collection_run_model;

pub use collection_run_model::*;
