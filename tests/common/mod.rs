#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use reindexer::error::{AppError, Result};
use reindexer::models::{BulkActionPair, BulkItem, BulkItemStatus, BulkResponse, Config};
use reindexer::services::{FetchOptions, Fetcher, SearchBackend};
use serde_json::Value;
use tokio::sync::Mutex;

pub const CMS: &str = "http://cms.test";

pub fn config() -> Config {
    let mut config = Config::default();
    config.cms.host = CMS.into();
    config.search.host = "http://search.test".into();
    config
}

/// CMS answering from a URL table; anything else is a 404.
#[derive(Clone, Default)]
pub struct FakeCms {
    json: HashMap<String, Value>,
    text: HashMap<String, String>,
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl FakeCms {
    pub fn json(mut self, path: &str, value: Value) -> Self {
        self.json.insert(format!("{CMS}{path}"), value);
        self
    }

    pub fn text(mut self, path: &str, text: &str) -> Self {
        self.text.insert(format!("{CMS}{path}"), text.to_string());
        self
    }

    /// Requested URLs with their forwarded host.
    pub async fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, url: &str, opts: &FetchOptions) {
        self.calls.lock().await.push((
            url.to_string(),
            opts.header("x-forwarded-host").map(str::to_string),
        ));
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeCms {
    async fn fetch_json(&self, url: &str, opts: &FetchOptions) -> Result<Value> {
        self.record(url, opts).await;
        self.json.get(url).cloned().ok_or_else(|| AppError::NotFound {
            url: url.to_string(),
        })
    }

    async fn fetch_text(&self, url: &str, opts: &FetchOptions) -> Result<String> {
        self.record(url, opts).await;
        self.text.get(url).cloned().ok_or_else(|| AppError::NotFound {
            url: url.to_string(),
        })
    }
}

/// Search engine holding one site and recording every bulk call.
#[derive(Clone, Default)]
pub struct FakeSearch {
    sites: Vec<Value>,
    rejected: HashSet<String>,
    searches: Arc<Mutex<Vec<(String, Value)>>>,
    bulks: Arc<Mutex<Vec<Vec<BulkActionPair>>>>,
}

impl FakeSearch {
    pub fn with_site(site: Value) -> Self {
        Self {
            sites: vec![site],
            ..Default::default()
        }
    }

    /// Answer status 400 for these document ids.
    pub fn rejecting(mut self, ids: &[&str]) -> Self {
        self.rejected = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub async fn searches(&self) -> Vec<(String, Value)> {
        self.searches.lock().await.clone()
    }

    pub async fn bulks(&self) -> Vec<Vec<BulkActionPair>> {
        self.bulks.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, index: &str, query: Value) -> Result<Vec<Value>> {
        self.searches.lock().await.push((index.to_string(), query));
        Ok(self.sites.clone())
    }

    async fn bulk(&self, actions: Vec<BulkActionPair>) -> Result<BulkResponse> {
        self.bulks.lock().await.push(actions.clone());
        let items: Vec<BulkItem> = actions
            .iter()
            .map(|pair| {
                let id = pair.id().to_string();
                let rejected = self.rejected.contains(&id);
                BulkItem::new(
                    "update",
                    BulkItemStatus {
                        id,
                        status: if rejected { 400 } else { 200 },
                        error: rejected.then(|| {
                            serde_json::json!({"type": "mapper_parsing_exception", "reason": "failed to parse"})
                        }),
                    },
                )
            })
            .collect();
        Ok(BulkResponse {
            errors: !self.rejected.is_empty(),
            items,
        })
    }
}
