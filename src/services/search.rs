// src/services/search.rs

//! Search engine client.
//!
//! Two operations are needed: an exact-term query returning `_source`
//! documents, and a bulk write of interleaved action pairs.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{BulkActionPair, BulkResponse, SearchConfig, to_ndjson};
use crate::utils::http::create_async_client;

/// Write and query access to the search engine.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `query` against `index` and return each hit's `_source`.
    async fn search(&self, index: &str, query: Value) -> Result<Vec<Value>>;

    /// Execute one bulk request.
    async fn bulk(&self, actions: Vec<BulkActionPair>) -> Result<BulkResponse>;
}

/// Bool query matching every `(field, value)` pair exactly.
pub fn term_filter_query(terms: &[(&str, &str)]) -> Value {
    let filter: Vec<Value> = terms
        .iter()
        .map(|(field, value)| {
            let mut term = serde_json::Map::new();
            term.insert((*field).to_string(), Value::from(*value));
            json!({ "term": term })
        })
        .collect();
    json!({ "query": { "bool": { "filter": filter } } })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Value,
}

/// [`SearchBackend`] speaking the Elasticsearch HTTP API.
#[derive(Clone)]
pub struct ElasticClient {
    client: Client,
    host: String,
}

impl ElasticClient {
    /// Create a client for the cluster at `config.host`.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = create_async_client("reindexer/0.1", config.timeout_secs)?;
        Ok(Self::with_client(client, &config.host))
    }

    pub fn with_client(client: Client, host: &str) -> Self {
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    async fn check(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::request_failed(url, Some(status.as_u16()), body.trim()))
    }
}

#[async_trait]
impl SearchBackend for ElasticClient {
    async fn search(&self, index: &str, query: Value) -> Result<Vec<Value>> {
        let url = format!("{}/{}/_search", self.host, index);
        log::debug!("Searching {} with {}", url, query);

        let response = self
            .client
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&url, None, e))?;
        let response = Self::check(&url, response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::request_failed(&url, None, format!("invalid search response: {e}")))?;
        Ok(parsed.hits.hits.into_iter().map(|hit| hit.source).collect())
    }

    async fn bulk(&self, actions: Vec<BulkActionPair>) -> Result<BulkResponse> {
        let url = format!("{}/_bulk", self.host);
        let body = to_ndjson(&actions)?;
        log::debug!("Bulk request with {} actions", actions.len());

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&url, None, e))?;
        let response = Self::check(&url, response).await?;

        response
            .json()
            .await
            .map_err(|e| AppError::request_failed(&url, None, format!("invalid bulk response: {e}")))
    }
}
