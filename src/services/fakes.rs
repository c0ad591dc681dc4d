//! In-memory stand-ins for the CMS and the search engine.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{BulkActionPair, BulkItem, BulkItemStatus, BulkResponse};
use crate::services::{FetchOptions, Fetcher, SearchBackend};

/// Canned CMS response.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Json(Value),
    Text(String),
    Status(u16),
}

/// CMS fake serving responses by exact URL; unknown URLs 404.
#[derive(Default)]
pub struct MemoryFetcher {
    routes: HashMap<String, FakeResponse>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, url: &str, value: Value) -> Self {
        self.routes.insert(url.to_string(), FakeResponse::Json(value));
        self
    }

    pub fn text(mut self, url: &str, text: &str) -> Self {
        self.routes
            .insert(url.to_string(), FakeResponse::Text(text.to_string()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), FakeResponse::Status(status));
        self
    }

    pub fn calls(&self) -> Vec<(String, FetchOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|(u, _)| u == url).count()
    }

    fn respond(&self, url: &str, opts: &FetchOptions) -> Result<FakeResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), opts.clone()));
        match self.routes.get(url) {
            None | Some(FakeResponse::Status(404)) => Err(AppError::NotFound {
                url: url.to_string(),
            }),
            Some(FakeResponse::Status(status)) => {
                Err(AppError::request_failed(url, Some(*status), "fake failure"))
            }
            Some(other) => Ok(other.clone()),
        }
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_json(&self, url: &str, opts: &FetchOptions) -> Result<Value> {
        match self.respond(url, opts)? {
            FakeResponse::Json(value) => Ok(value),
            FakeResponse::Text(text) => serde_json::from_str(&text)
                .map_err(|e| AppError::request_failed(url, None, e)),
            FakeResponse::Status(_) => unreachable!(),
        }
    }

    async fn fetch_text(&self, url: &str, opts: &FetchOptions) -> Result<String> {
        match self.respond(url, opts)? {
            FakeResponse::Json(value) => Ok(value.to_string()),
            FakeResponse::Text(text) => Ok(text),
            FakeResponse::Status(_) => unreachable!(),
        }
    }
}

/// Search fake: every query returns `sites`, every bulk item succeeds
/// unless its id is listed in `failing`.
#[derive(Default)]
pub struct RecordingSearch {
    sites: Vec<Value>,
    failing: HashSet<String>,
    reject_bulk: bool,
    search_calls: Mutex<Vec<(String, Value)>>,
    bulk_calls: Mutex<Vec<Vec<BulkActionPair>>>,
}

impl RecordingSearch {
    pub fn with_sites(sites: Vec<Value>) -> Self {
        Self {
            sites,
            ..Self::default()
        }
    }

    pub fn failing(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn rejecting_bulk(mut self) -> Self {
        self.reject_bulk = true;
        self
    }

    pub fn search_calls(&self) -> Vec<(String, Value)> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn bulk_calls(&self) -> Vec<Vec<BulkActionPair>> {
        self.bulk_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for RecordingSearch {
    async fn search(&self, index: &str, query: Value) -> Result<Vec<Value>> {
        self.search_calls
            .lock()
            .unwrap()
            .push((index.to_string(), query));
        Ok(self.sites.clone())
    }

    async fn bulk(&self, actions: Vec<BulkActionPair>) -> Result<BulkResponse> {
        self.bulk_calls.lock().unwrap().push(actions.clone());
        if self.reject_bulk {
            return Err(AppError::request_failed("fake/_bulk", Some(503), "unavailable"));
        }

        let items: Vec<BulkItem> = actions
            .iter()
            .map(|pair| {
                let id = pair.id().to_string();
                let status = if self.failing.contains(&id) { 400 } else { 200 };
                BulkItem::new(
                    "update",
                    BulkItemStatus {
                        id,
                        status,
                        error: None,
                    },
                )
            })
            .collect();
        Ok(BulkResponse {
            errors: items
                .iter()
                .any(|item| item.status().is_some_and(|s| !s.is_success())),
            items,
        })
    }
}
