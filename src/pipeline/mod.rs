//! Reindex pipeline.
//!
//! - `walk`: find embedded components in composed page JSON
//! - `handlers`: component handler and custom transform registries
//! - `transforms`: the built-in per-page transforms
//! - `page`: assemble one search document per page
//! - `upsert`: batch documents into bulk writes
//! - `reindex`: list pages, fan out and upsert
//! - `report`: per-document result lines and run totals

pub mod handlers;
pub mod page;
pub mod reindex;
pub mod report;
pub mod transforms;
pub mod upsert;
pub mod walk;

pub use handlers::{ComponentHandler, CustomTransform, HandlerOutput, HandlerRegistry, TransformRegistry};
pub use page::PagePipeline;
pub use reindex::{ReindexOptions, Reindexer, list_page_uris, prefetch_schedule, reindex};
pub use report::{ResultRecord, RunSummary, number_results};
pub use transforms::TransformContext;
pub use upsert::put_docs;
pub use walk::{ComponentRef, component_name, walk_components};
