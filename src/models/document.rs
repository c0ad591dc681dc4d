//! Search documents and the partial field sets they are built from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PageUri;

/// Field names of the search document.
pub mod fields {
    pub const URI: &str = "uri";
    pub const SITE_SLUG: &str = "siteSlug";
    pub const URL: &str = "url";
    pub const PUBLISHED: &str = "published";
    pub const PUBLISH_TIME: &str = "publishTime";
    pub const SCHEDULED: &str = "scheduled";
    pub const SCHEDULED_TIME: &str = "scheduledTime";
}

/// A sparse set of document fields produced by one transform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialDoc(Map<String, Value>);

impl PartialDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Merge `other` into `self`; fields of `other` win.
    pub fn merge(&mut self, other: PartialDoc) {
        self.0.extend(other.0);
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for PartialDoc {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for PartialDoc {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The denormalized search document for one page.
///
/// Always carries `uri`, which doubles as the bulk-write id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ElasticDoc {
    fields: Map<String, Value>,
}

impl ElasticDoc {
    /// Seed a document with the page identity.
    pub fn new(uri: &PageUri) -> Self {
        let mut map = Map::new();
        map.insert(fields::URI.into(), Value::String(uri.to_string()));
        Self { fields: map }
    }

    /// Merge a partial into the document. `uri` cannot be overwritten.
    pub fn merge(&mut self, partial: PartialDoc) {
        let uri = self.fields.get(fields::URI).cloned();
        self.fields.extend(partial.into_map());
        if let Some(uri) = uri {
            self.fields.insert(fields::URI.into(), uri);
        }
    }

    /// Document id used for the bulk write.
    pub fn id(&self) -> &str {
        self.fields
            .get(fields::URI)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn published(&self) -> bool {
        self.get(fields::PUBLISHED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn scheduled(&self) -> bool {
        self.get(fields::SCHEDULED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn url(&self) -> Option<&str> {
        self.get(fields::URL).and_then(Value::as_str)
    }

    /// Deep copy of the fields accumulated so far.
    pub fn snapshot(&self) -> PartialDoc {
        PartialDoc::from(self.fields.clone())
    }

    /// Enforce the cross-field invariants once all partials are merged:
    /// an unpublished page has neither `url` nor `publishTime`.
    pub fn finalize(mut self) -> Self {
        if !self.published() {
            self.fields.insert(fields::URL.into(), Value::Null);
            self.fields.insert(fields::PUBLISH_TIME.into(), Value::Null);
        }
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
