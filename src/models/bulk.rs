//! Bulk-write wire types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ElasticDoc;
use crate::error::Result;

/// Addressing record plus payload record for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkActionPair {
    pub action: Value,
    pub payload: Value,
}

impl BulkActionPair {
    /// Build an upsert of `doc` into `index`, addressed by its uri.
    pub fn upsert(index: &str, doc: ElasticDoc) -> Self {
        let action = json!({ "update": { "_index": index, "_id": doc.id() } });
        let payload = json!({ "doc": doc.into_fields(), "doc_as_upsert": true });
        Self { action, payload }
    }

    /// Document id this pair addresses.
    pub fn id(&self) -> &str {
        self.action["update"]["_id"].as_str().unwrap_or_default()
    }
}

/// Convert a batch of documents into interleaved action pairs.
pub fn docs_to_bulk_actions(docs: Vec<ElasticDoc>, index: &str) -> Vec<BulkActionPair> {
    docs.into_iter()
        .map(|doc| BulkActionPair::upsert(index, doc))
        .collect()
}

/// Serialize action pairs as a newline-delimited bulk body.
pub fn to_ndjson(pairs: &[BulkActionPair]) -> Result<String> {
    let mut body = String::new();
    for pair in pairs {
        body.push_str(&serde_json::to_string(&pair.action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&pair.payload)?);
        body.push('\n');
    }
    Ok(body)
}

/// Response of one bulk call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    /// True when at least one item failed
    #[serde(default)]
    pub errors: bool,

    /// One entry per action pair, in request order
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// One bulk response item, keyed by its action name (`update`, `index`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct BulkItem(HashMap<String, BulkItemStatus>);

impl BulkItem {
    pub fn new(action: impl Into<String>, status: BulkItemStatus) -> Self {
        Self(HashMap::from([(action.into(), status)]))
    }

    /// The status of whichever action this item reports.
    pub fn status(&self) -> Option<&BulkItemStatus> {
        self.0.values().next()
    }
}

/// Outcome of one action inside a bulk call.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemStatus {
    #[serde(rename = "_id")]
    pub id: String,

    pub status: u16,

    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkItemStatus {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human readable failure reason from the `error` object.
    pub fn reason(&self) -> String {
        match &self.error {
            Some(Value::Object(err)) => err
                .get("reason")
                .and_then(Value::as_str)
                .or_else(|| err.get("type").and_then(Value::as_str))
                .unwrap_or("unknown error")
                .to_string(),
            Some(Value::String(reason)) => reason.clone(),
            _ => format!("status {}", self.status),
        }
    }
}

/// Write status of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Error,
}

/// Per-document result reduced from a bulk response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub id: String,
    pub status: BatchStatus,
}

impl BatchResult {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: BatchStatus::Success,
        }
    }
}
