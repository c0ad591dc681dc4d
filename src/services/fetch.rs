// src/services/fetch.rs

//! CMS fetch client.
//!
//! Issues GET requests against the CMS origin and classifies the responses:
//! a 404 becomes [`AppError::NotFound`], every other failure (transport,
//! non-2xx status, undecodable body) becomes [`AppError::RequestFailed`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::CmsConfig;
use crate::utils::http::create_async_client;

/// Header used to address one site behind a shared CMS origin.
pub const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

/// Longest error body kept in a failure message.
const MAX_ERROR_BODY: usize = 200;

/// Per-request header overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    /// Options routing the request to `host`.
    pub fn forwarded_host(host: impl Into<String>) -> Self {
        Self {
            headers: vec![(FORWARDED_HOST_HEADER.to_string(), host.into())],
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Read access to the CMS.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and decode the body as JSON.
    async fn fetch_json(&self, url: &str, opts: &FetchOptions) -> Result<Value>;

    /// GET `url` and return the body as text.
    async fn fetch_text(&self, url: &str, opts: &FetchOptions) -> Result<String>;
}

/// Decode a fetched JSON value into `T`, reporting a malformed body as a
/// request failure of `url`.
pub fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::request_failed(url, None, format!("unexpected body: {e}")))
}

/// [`Fetcher`] backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    verbose: bool,
}

impl HttpFetcher {
    /// Create a fetcher with a client configured from `config`.
    pub fn new(config: &CmsConfig) -> Result<Self> {
        let client = create_async_client(&config.user_agent, config.timeout_secs)?;
        Ok(Self::with_client(client, config.verbose))
    }

    pub fn with_client(client: Client, verbose: bool) -> Self {
        Self { client, verbose }
    }

    /// Send the request and return the response if its status is 2xx.
    async fn send(&self, url: &str, opts: &FetchOptions) -> Result<reqwest::Response> {
        if self.verbose {
            log::debug!(">> Request: GET {} {:?}", url, opts.headers);
        }

        let mut request = self.client.get(url);
        for (name, value) in &opts.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            AppError::request_failed(url, e.status().map(|s| s.as_u16()), e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Drain the body so the connection goes back to the pool.
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound {
                url: url.to_string(),
            });
        }
        Err(AppError::request_failed(
            url,
            Some(status.as_u16()),
            failure_message(status, &body),
        ))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str, opts: &FetchOptions) -> Result<Value> {
        let response = self.send(url, opts).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::request_failed(url, None, format!("invalid JSON body: {e}")))
    }

    async fn fetch_text(&self, url: &str, opts: &FetchOptions) -> Result<String> {
        let response = self.send(url, opts).await?;
        response
            .text()
            .await
            .map_err(|e| AppError::request_failed(url, None, e))
    }
}

fn failure_message(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("unexpected status");
    let body = body.trim();
    if body.is_empty() {
        return reason.to_string();
    }
    let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
    format!("{reason}: {snippet}")
}
