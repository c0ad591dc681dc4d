//! Service layer for the reindexer.
//!
//! This module contains the network-facing collaborators:
//! - CMS fetching (`Fetcher`, `HttpFetcher`)
//! - Search queries and bulk writes (`SearchBackend`, `ElasticClient`)
//! - Memoized site lookup (`SiteResolver`)

pub mod fetch;
pub mod search;
mod sites;

#[cfg(test)]
pub(crate) mod fakes;

pub use fetch::{FORWARDED_HOST_HEADER, FetchOptions, Fetcher, HttpFetcher};
pub use search::{ElasticClient, SearchBackend, term_filter_query};
pub use sites::SiteResolver;
