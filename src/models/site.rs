//! Site records from the sites index.

use serde::{Deserialize, Serialize};

/// One site served by the CMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Hostname without port
    pub host: String,

    /// Base path, empty for a root site
    #[serde(default)]
    pub path: String,

    /// Short site identifier copied onto every document
    pub slug: String,

    /// Port pages are published on, when not the scheme default
    #[serde(default)]
    pub port: Option<u16>,
}

/// Cache key of the site resolver: the exact (host, path) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteKey {
    pub host: String,
    pub path: String,
}

impl SiteKey {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }
}
