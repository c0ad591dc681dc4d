// src/lib.rs

//! Search reindexer library.
//!
//! Rebuilds the page index of a search engine from the pages a CMS
//! serves: each page is turned into one denormalized document and the
//! documents are upserted in bulk.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
