//! Page identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Page segments recognised inside a page URI, most specific first.
const PAGE_SEGMENTS: [&str; 2] = ["_pages", "pages"];

/// Opaque identifier of one page, `<host>/<base-path>/pages/<id>`.
///
/// Used verbatim as the search document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageUri(String);

impl PageUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the URI into its site prefix and page instance.
    pub fn location(&self) -> Result<PageLocation> {
        PageLocation::parse(&self.0)
    }
}

impl fmt::Display for PageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for PageUri {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

/// The parts of a page URI needed to address the CMS and the sites index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Hostname without port, e.g. `foo.com`
    pub hostname: String,
    /// Port declared in the URI, if any
    pub port: Option<u16>,
    /// Site base path, empty for a root site, otherwise `/section`
    pub path: String,
    /// Page segment used by the URI (`pages` or `_pages`)
    pub segment: String,
    /// Page instance id without version or extension
    pub instance: String,
}

impl PageLocation {
    /// Parse a page URI such as `foo.com/section/_pages/abc@published`.
    pub fn parse(uri: &str) -> Result<Self> {
        let (base, segment, rest) = PAGE_SEGMENTS
            .iter()
            .find_map(|segment| {
                let marker = format!("/{segment}/");
                uri.split_once(marker.as_str())
                    .map(|(base, rest)| (base, *segment, rest))
            })
            .ok_or_else(|| AppError::invalid_page_uri(uri, "missing pages segment"))?;

        let instance = rest
            .split(['@', '.'])
            .next()
            .unwrap_or_default()
            .to_string();
        if instance.is_empty() {
            return Err(AppError::invalid_page_uri(uri, "missing page instance"));
        }

        let parsed = url::Url::parse(&format!("http://{base}"))
            .map_err(|e| AppError::invalid_page_uri(uri, e))?;
        let hostname = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::invalid_page_uri(uri, "missing host"))?
            .to_string();
        let path = match parsed.path() {
            "/" => String::new(),
            p => p.trim_end_matches('/').to_string(),
        };

        Ok(Self {
            hostname,
            port: parsed.port(),
            path,
            segment: segment.to_string(),
            instance,
        })
    }

    /// Host with port when one is declared, as sent in `x-forwarded-host`.
    pub fn host(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.clone(),
        }
    }

    /// Path of the page below its host, e.g. `/section/pages/abc`.
    pub fn page_path(&self) -> String {
        format!("{}/{}/{}", self.path, self.segment, self.instance)
    }
}
