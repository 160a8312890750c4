//! hubmeta - fetch, cache and deduplicate Hugging Face model metadata
//!
//! For each model id: reserve a record slot, clone the repository without LFS
//! payloads, read the weight size and README, ask the hub for the download
//! count, and write one JSON record per model.

pub mod batch;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;

pub use batch::{BatchDriver, BatchSummary, ErrorLog};
pub use error::{HubmetaError, PipelineError, Result};
