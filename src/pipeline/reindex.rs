// src/pipeline/reindex.rs

//! Run driver: page listing, fan-out and the upsert stage wired together.

use std::sync::Arc;

use futures::{Stream, StreamExt, stream};

use crate::error::Result;
use crate::models::{BatchResult, Config, PageUri, Schedule};
use crate::services::fetch::decode;
use crate::services::{ElasticClient, FetchOptions, Fetcher, HttpFetcher, SearchBackend, SiteResolver};
use crate::utils::url::{pages_url, schedule_url};

use super::handlers::{HandlerRegistry, TransformRegistry};
use super::page::PagePipeline;
use super::upsert::put_docs;

/// Fan-out and batching settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexOptions {
    /// Target index, prefix already applied
    pub index: String,
    /// Pages transformed concurrently
    pub parallel: usize,
    /// Documents per bulk request
    pub batch_size: usize,
    /// Stop after this many pages
    pub limit: Option<usize>,
}

impl ReindexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            index: config.search.target_index(),
            parallel: config.pipeline.parallel,
            batch_size: config.pipeline.batch_size,
            limit: config.pipeline.limit,
        }
    }
}

/// Page URIs the CMS lists for the site at `host` + `path`.
pub async fn list_page_uris(
    fetcher: &dyn Fetcher,
    cms_host: &str,
    pages_segment: &str,
    host: &str,
    path: &str,
) -> Result<Vec<PageUri>> {
    let url = pages_url(cms_host, path, pages_segment);
    let value = fetcher
        .fetch_json(&url, &FetchOptions::forwarded_host(host))
        .await?;
    decode(&url, value)
}

/// Publish schedule of the site at `host` + `path`.
pub async fn prefetch_schedule(fetcher: &dyn Fetcher, cms_host: &str, host: &str, path: &str) -> Result<Schedule> {
    let url = schedule_url(cms_host, path);
    let value = fetcher
        .fetch_json(&url, &FetchOptions::forwarded_host(host))
        .await?;
    decode(&url, value)
}

/// Transform `uris` with bounded concurrency and upsert the documents.
///
/// Yields one result per page: the write outcome of its document, or the
/// page's own failure. Completion order is not input order.
pub fn reindex<S>(
    pipeline: PagePipeline,
    backend: Arc<dyn SearchBackend>,
    options: &ReindexOptions,
    uris: S,
) -> impl Stream<Item = Result<BatchResult>>
where
    S: Stream<Item = PageUri> + Send + 'static,
{
    let docs = uris
        .take(options.limit.unwrap_or(usize::MAX))
        .map(move |uri| {
            let pipeline = pipeline.clone();
            async move { pipeline.page_to_doc(&uri).await }
        })
        .buffer_unordered(options.parallel.max(1));

    put_docs(backend, options.index.clone(), options.batch_size, Box::pin(docs))
}

/// A configured reindex run.
pub struct Reindexer {
    fetcher: Arc<dyn Fetcher>,
    backend: Arc<dyn SearchBackend>,
    pipeline: PagePipeline,
    options: ReindexOptions,
    cms_host: String,
    pages_segment: String,
}

impl Reindexer {
    /// Build HTTP clients for the CMS and the search engine from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.cms)?);
        let backend: Arc<dyn SearchBackend> = Arc::new(ElasticClient::new(&config.search)?);
        Ok(Self::with_services(config, fetcher, backend))
    }

    /// Build a run over caller-provided services.
    pub fn with_services(config: &Config, fetcher: Arc<dyn Fetcher>, backend: Arc<dyn SearchBackend>) -> Self {
        let resolver = Arc::new(SiteResolver::new(
            Arc::clone(&backend),
            config.search.target_sites_index(),
        ));
        let pipeline = PagePipeline::new(config.cms.host.clone(), Arc::clone(&fetcher), resolver)
            .with_merge_order(config.pipeline.merge_order);

        Self {
            fetcher,
            backend,
            pipeline,
            options: ReindexOptions::from_config(config),
            cms_host: config.cms.host.clone(),
            pages_segment: config.cms.pages_segment.clone(),
        }
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.pipeline = self.pipeline.with_handlers(handlers);
        self
    }

    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.pipeline = self.pipeline.with_transforms(transforms);
        self
    }

    pub fn options(&self) -> &ReindexOptions {
        &self.options
    }

    /// Reindex an explicit list of pages.
    pub fn reindex_uris<S>(&self, uris: S) -> impl Stream<Item = Result<BatchResult>>
    where
        S: Stream<Item = PageUri> + Send + 'static,
    {
        reindex(
            self.pipeline.clone(),
            Arc::clone(&self.backend),
            &self.options,
            uris,
        )
    }

    /// Reindex every page of one site, sharing one schedule fetch.
    pub async fn reindex_site(&self, host: &str, path: &str) -> Result<impl Stream<Item = Result<BatchResult>>> {
        let uris = list_page_uris(
            self.fetcher.as_ref(),
            &self.cms_host,
            &self.pages_segment,
            host,
            path,
        )
        .await?;
        log::info!("Found {} pages for {}{}", uris.len(), host, path);

        let schedule = prefetch_schedule(self.fetcher.as_ref(), &self.cms_host, host, path).await?;
        log::debug!("Prefetched {} schedule entries", schedule.len());

        let pipeline = self.pipeline.clone().with_schedule(schedule);
        Ok(reindex(
            pipeline,
            Arc::clone(&self.backend),
            &self.options,
            stream::iter(uris),
        ))
    }
}
