//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// CMS origin and request behavior
    #[serde(default)]
    pub cms: CmsConfig,

    /// Search engine endpoint and index names
    #[serde(default)]
    pub search: SearchConfig,

    /// Fan-out, batching and merge settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.normalize();
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Strip trailing slashes from the configured hosts.
    pub fn normalize(&mut self) {
        self.cms.host = trim_trailing_slash(&self.cms.host);
        self.search.host = trim_trailing_slash(&self.search.host);
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.cms.host.trim().is_empty() {
            return Err(AppError::validation("cms.host is empty"));
        }
        url::Url::parse(&self.cms.host)
            .map_err(|e| AppError::validation(format!("cms.host is not a URL: {e}")))?;
        if self.cms.user_agent.trim().is_empty() {
            return Err(AppError::validation("cms.user_agent is empty"));
        }
        if self.cms.timeout_secs == 0 {
            return Err(AppError::validation("cms.timeout_secs must be > 0"));
        }
        if self.cms.pages_segment.trim_matches('/').is_empty() {
            return Err(AppError::validation("cms.pages_segment is empty"));
        }
        if self.search.host.trim().is_empty() {
            return Err(AppError::validation("search.host is empty"));
        }
        url::Url::parse(&self.search.host)
            .map_err(|e| AppError::validation(format!("search.host is not a URL: {e}")))?;
        if self.search.index.trim().is_empty() {
            return Err(AppError::validation("search.index is empty"));
        }
        if self.search.sites_index.trim().is_empty() {
            return Err(AppError::validation("search.sites_index is empty"));
        }
        if self.search.timeout_secs == 0 {
            return Err(AppError::validation("search.timeout_secs must be > 0"));
        }
        if self.pipeline.parallel == 0 {
            return Err(AppError::validation("pipeline.parallel must be > 0"));
        }
        if self.pipeline.batch_size == 0 {
            return Err(AppError::validation("pipeline.batch_size must be > 0"));
        }
        Ok(())
    }
}

/// CMS origin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    /// Base address of the CMS, e.g. `http://cms.internal:3001`
    #[serde(default)]
    pub host: String,

    /// Path segment of the page listing endpoint
    #[serde(default = "defaults::pages_segment")]
    pub pages_segment: String,

    /// User-Agent header for CMS requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Log every outgoing request at debug level
    #[serde(default)]
    pub verbose: bool,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            pages_segment: defaults::pages_segment(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            verbose: false,
        }
    }
}

/// Search engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base address of the search cluster, e.g. `http://localhost:9200`
    #[serde(default)]
    pub host: String,

    /// Index receiving the page documents
    #[serde(default = "defaults::index")]
    pub index: String,

    /// Prefix prepended to every index name as `<prefix>_<index>`
    #[serde(default)]
    pub index_prefix: Option<String>,

    /// Index holding one document per site
    #[serde(default = "defaults::sites_index")]
    pub sites_index: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl SearchConfig {
    /// Apply the configured prefix to an index name.
    pub fn index_with_prefix(&self, index: &str) -> String {
        match self.index_prefix.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}_{index}"),
            _ => index.to_string(),
        }
    }

    /// Full name of the target page index.
    pub fn target_index(&self) -> String {
        self.index_with_prefix(&self.index)
    }

    /// Full name of the sites index.
    pub fn target_sites_index(&self) -> String {
        self.index_with_prefix(&self.sites_index)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            index: defaults::index(),
            index_prefix: None,
            sites_index: defaults::sites_index(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Order in which custom transforms and component handlers are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// Custom transforms first, handler-derived fields win conflicts
    #[default]
    CustomThenHandlers,
    /// Handler-derived fields first, custom transforms see and may override them
    HandlersThenCustom,
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of pages transformed concurrently
    #[serde(default = "defaults::parallel")]
    pub parallel: usize,

    /// Number of documents per bulk request
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Maximum number of pages to process
    #[serde(default)]
    pub limit: Option<usize>,

    /// Merge order of custom transforms and handlers
    #[serde(default)]
    pub merge_order: MergeOrder,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: defaults::parallel(),
            batch_size: defaults::batch_size(),
            limit: None,
            merge_order: MergeOrder::default(),
        }
    }
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

mod defaults {
    // CMS defaults
    pub fn pages_segment() -> String {
        "pages".into()
    }
    pub fn user_agent() -> String {
        "reindexer/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Search defaults
    pub fn index() -> String {
        "pages".into()
    }
    pub fn sites_index() -> String {
        "sites".into()
    }

    // Pipeline defaults
    pub fn parallel() -> usize {
        5
    }
    pub fn batch_size() -> usize {
        100
    }
}
