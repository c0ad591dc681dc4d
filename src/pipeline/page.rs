// src/pipeline/page.rs

//! Page to search document.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{ElasticDoc, MergeOrder, PageUri, PartialDoc, Schedule, fields};
use crate::services::{Fetcher, SiteResolver};

use super::handlers::{HandlerRegistry, TransformRegistry};
use super::transforms::{
    TransformContext, add_publish_data, add_schedule_time, add_site_slug, apply_custom_transforms,
    apply_handlers, validate_publish_url,
};

/// Builds one [`ElasticDoc`] per page.
///
/// Cheap to clone; every clone shares the resolver cache and registries.
#[derive(Clone)]
pub struct PagePipeline {
    cms_host: String,
    fetcher: Arc<dyn Fetcher>,
    resolver: Arc<SiteResolver>,
    schedule: Option<Arc<Schedule>>,
    handlers: Arc<HandlerRegistry>,
    transforms: Arc<TransformRegistry>,
    merge_order: MergeOrder,
}

impl PagePipeline {
    pub fn new(cms_host: impl Into<String>, fetcher: Arc<dyn Fetcher>, resolver: Arc<SiteResolver>) -> Self {
        Self {
            cms_host: cms_host.into(),
            fetcher,
            resolver,
            schedule: None,
            handlers: Arc::new(HandlerRegistry::default()),
            transforms: Arc::new(TransformRegistry::default()),
            merge_order: MergeOrder::default(),
        }
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Arc::new(handlers);
        self
    }

    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = Arc::new(transforms);
        self
    }

    /// Use `schedule` for every page instead of fetching it per page.
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(Arc::new(schedule));
        self
    }

    pub fn with_merge_order(mut self, merge_order: MergeOrder) -> Self {
        self.merge_order = merge_order;
        self
    }

    /// Transform context for one page, without a site.
    pub fn context(&self) -> TransformContext {
        let ctx = TransformContext::new(self.cms_host.clone(), Arc::clone(&self.fetcher))
            .with_handlers(Arc::clone(&self.handlers))
            .with_transforms(Arc::clone(&self.transforms));
        match &self.schedule {
            Some(schedule) => ctx.with_schedule(Arc::clone(schedule)),
            None => ctx,
        }
    }

    /// Build the search document for `uri`.
    ///
    /// Any failure is returned tagged with the page URI.
    pub async fn page_to_doc(&self, uri: &PageUri) -> Result<ElasticDoc> {
        self.build(uri).await.map_err(|e| {
            log::warn!("Failed to transform {}: {}", uri, e);
            e.tag_page(uri.as_str())
        })
    }

    async fn build(&self, uri: &PageUri) -> Result<ElasticDoc> {
        let location = uri.location()?;
        let site = self.resolver.resolve_page(&location).await?;
        let ctx = self.context().with_site(site);

        let slug = add_site_slug(uri, &ctx)?;

        // Validation needs the public URL, so it follows publish data.
        let publish = async {
            let publish = add_publish_data(uri, &ctx).await?;
            let url = publish
                .get(fields::URL)
                .and_then(|u| u.as_str())
                .map(str::to_owned);
            let validation = validate_publish_url(uri, url.as_deref(), &ctx).await?;
            Ok::<_, AppError>((publish, validation))
        };
        let handled = async {
            if ctx.handlers.is_empty() {
                return Ok(PartialDoc::new());
            }
            apply_handlers(uri, &ctx).await
        };

        let ((publish, validation), schedule, handled) =
            futures::try_join!(publish, add_schedule_time(uri, &ctx), handled)?;

        let mut doc = ElasticDoc::new(uri);
        doc.merge(slug);
        doc.merge(publish);
        doc.merge(validation);
        doc.merge(schedule);

        match self.merge_order {
            MergeOrder::CustomThenHandlers => {
                let custom = apply_custom_transforms(uri, &doc, &ctx).await?;
                doc.merge(custom);
                doc.merge(handled);
            }
            MergeOrder::HandlersThenCustom => {
                doc.merge(handled);
                let custom = apply_custom_transforms(uri, &doc, &ctx).await?;
                doc.merge(custom);
            }
        }

        log::debug!("Built document for {} ({} fields)", uri, doc.fields().len());
        Ok(doc.finalize())
    }
}
