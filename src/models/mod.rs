// src/models/mod.rs

//! Domain models for the reindexer.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod bulk;
mod config;
mod document;
mod page;
mod schedule;
mod site;

// Re-export all public types
pub use bulk::{
    BatchResult, BatchStatus, BulkActionPair, BulkItem, BulkItemStatus, BulkResponse,
    docs_to_bulk_actions, to_ndjson,
};
pub use config::{CmsConfig, Config, MergeOrder, PipelineConfig, SearchConfig};
pub use document::{ElasticDoc, PartialDoc, fields};
pub use page::{PageLocation, PageUri};
pub use schedule::{Schedule, ScheduleEntry};
pub use site::{Site, SiteKey};
