// src/services/sites.rs

//! Memoized site resolver.
//!
//! Maps a page's (host, path) prefix to its site record by querying the
//! sites index. Each key is filled at most once per run: concurrent misses
//! for the same key wait on a single lookup, and the result is kept even if
//! the index changes afterwards. Failed lookups are not cached.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::error::{AppError, Result};
use crate::models::{PageLocation, Site, SiteKey};
use crate::services::fetch::decode;
use crate::services::search::{SearchBackend, term_filter_query};

/// Resolves and caches [`Site`] records for the lifetime of a run.
pub struct SiteResolver {
    backend: Arc<dyn SearchBackend>,
    index: String,
    cache: Mutex<HashMap<SiteKey, Arc<OnceCell<Arc<Site>>>>>,
}

impl SiteResolver {
    /// Create a resolver querying `index` (already prefixed).
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        Self {
            backend,
            index: index.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the site owning `location`.
    pub async fn resolve_page(&self, location: &PageLocation) -> Result<Arc<Site>> {
        self.resolve(&location.hostname, &location.path).await
    }

    /// Resolve the site for an exact (host, path) pair.
    pub async fn resolve(&self, host: &str, path: &str) -> Result<Arc<Site>> {
        let key = SiteKey::new(host, path);
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(key.clone()).or_default())
        };

        cell.get_or_try_init(|| self.lookup(&key))
            .await
            .map(Arc::clone)
    }

    /// The cached site for a key, without issuing a lookup.
    pub async fn cached(&self, host: &str, path: &str) -> Option<Arc<Site>> {
        let cache = self.cache.lock().await;
        cache
            .get(&SiteKey::new(host, path))
            .and_then(|cell| cell.get().cloned())
    }

    async fn lookup(&self, key: &SiteKey) -> Result<Arc<Site>> {
        log::debug!("Looking up site for host '{}' path '{}'", key.host, key.path);

        let query = term_filter_query(&[("host", key.host.as_str()), ("path", key.path.as_str())]);
        let mut hits = self.backend.search(&self.index, query).await?;

        if hits.len() > 1 {
            log::warn!(
                "{} sites match host '{}' path '{}', using the first",
                hits.len(),
                key.host,
                key.path
            );
        }
        if hits.is_empty() {
            return Err(AppError::SiteNotFound {
                host: key.host.clone(),
                path: key.path.clone(),
            });
        }

        let site: Site = decode(&self.index, hits.swap_remove(0))?;
        Ok(Arc::new(site))
    }
}
