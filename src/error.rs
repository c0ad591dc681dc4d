// src/error.rs

//! Unified error handling for the reindexer.

use std::fmt;

use thiserror::Error;

/// Result type alias for reindex operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The CMS answered 404 for this resource
    #[error("Request to {url} failed (404): not found")]
    NotFound { url: String },

    /// Transport failure, non-2xx status or undecodable body
    #[error("Request to {url} failed{}: {message}", status_suffix(.status))]
    RequestFailed {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// No site document matches the page's host and path
    #[error("No site found for host '{host}' and path '{path}'")]
    SiteNotFound { host: String, path: String },

    /// A transform needed the page's site before it was resolved
    #[error("Site has not been resolved for {uri}")]
    SiteUnresolved { uri: String },

    /// A single document in a bulk request was not written
    #[error("Elastic batch action failed on {id}{}: {reason}", status_suffix(.status))]
    FailedBulkAction {
        id: String,
        status: Option<u16>,
        reason: String,
    },

    /// A page failed to transform; wraps the underlying cause
    #[error("Page {page_uri}: {source}")]
    Page {
        page_uri: String,
        #[source]
        source: Box<AppError>,
    },

    /// The page identifier could not be parsed
    #[error("Invalid page URI '{uri}': {message}")]
    InvalidPageUri { uri: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or used
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl AppError {
    /// Create a request failure for `url`.
    pub fn request_failed(url: impl Into<String>, status: Option<u16>, message: impl fmt::Display) -> Self {
        Self::RequestFailed {
            url: url.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create a failed bulk action for document `id`.
    pub fn failed_bulk_action(id: impl Into<String>, status: Option<u16>, reason: impl fmt::Display) -> Self {
        Self::FailedBulkAction {
            id: id.into(),
            status,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid page URI error.
    pub fn invalid_page_uri(uri: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidPageUri {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Tag this error with the page it belongs to. Already-tagged errors
    /// keep their original tag.
    pub fn tag_page(self, page_uri: impl Into<String>) -> Self {
        match self {
            tagged @ Self::Page { .. } => tagged,
            other => Self::Page {
                page_uri: page_uri.into(),
                source: Box::new(other),
            },
        }
    }

    /// The page this error was tagged with, if any.
    pub fn page_uri(&self) -> Option<&str> {
        match self {
            Self::Page { page_uri, .. } => Some(page_uri),
            _ => None,
        }
    }

    /// The underlying error, looking through page tags.
    pub fn root(&self) -> &AppError {
        match self {
            Self::Page { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this is (or wraps) a 404 from the CMS.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_page_wraps_once() {
        let err = AppError::NotFound {
            url: "http://cms/pages/1@published".into(),
        }
        .tag_page("foo.com/pages/1")
        .tag_page("foo.com/pages/2");

        assert_eq!(err.page_uri(), Some("foo.com/pages/1"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_request_failed_message() {
        let err = AppError::request_failed("http://cms/schedule", Some(500), "boom");
        assert_eq!(
            err.to_string(),
            "Request to http://cms/schedule failed (500): boom"
        );

        let err = AppError::request_failed("http://cms/schedule", None, "connection refused");
        assert_eq!(
            err.to_string(),
            "Request to http://cms/schedule failed: connection refused"
        );
    }

    #[test]
    fn test_untagged_has_no_page_uri() {
        let err = AppError::SiteNotFound {
            host: "foo.com".into(),
            path: "".into(),
        };
        assert!(err.page_uri().is_none());
        assert!(!err.is_not_found());
    }
}
