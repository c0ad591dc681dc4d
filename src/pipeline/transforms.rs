// src/pipeline/transforms.rs

//! Built-in page transforms.
//!
//! Each transform looks at one page from one angle (site, publish state,
//! schedule, custom logic, embedded components) and returns the partial
//! document it is responsible for. None of them touch the accumulated
//! document; merging happens in [`super::page`].

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ElasticDoc, PageLocation, PageUri, PartialDoc, Schedule, ScheduleEntry, Site, fields};
use crate::services::fetch::decode;
use crate::services::{FetchOptions, Fetcher};
use crate::utils::parse_timestamp;
use crate::utils::url::{composed_page_url, page_url, schedule_url, uri_lookup_url};

use super::handlers::{HandlerOutput, HandlerRegistry, TransformRegistry};
use super::walk::walk_components;

/// Default HTTP port assumed when neither the URL nor the site names one.
const DEFAULT_PORT: u16 = 80;

/// Everything a transform may consult for one page.
#[derive(Clone)]
pub struct TransformContext {
    /// CMS origin, without trailing slash
    pub cms_host: String,
    pub fetcher: Arc<dyn Fetcher>,
    /// The page's site, once resolved
    pub site: Option<Arc<Site>>,
    /// Prefetched schedule; fetched per page when absent
    pub schedule: Option<Arc<Schedule>>,
    pub handlers: Arc<HandlerRegistry>,
    pub transforms: Arc<TransformRegistry>,
}

impl TransformContext {
    pub fn new(cms_host: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cms_host: cms_host.into(),
            fetcher,
            site: None,
            schedule: None,
            handlers: Arc::new(HandlerRegistry::default()),
            transforms: Arc::new(TransformRegistry::default()),
        }
    }

    pub fn with_site(mut self, site: Arc<Site>) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_schedule(mut self, schedule: Arc<Schedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_handlers(mut self, handlers: Arc<HandlerRegistry>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_transforms(mut self, transforms: Arc<TransformRegistry>) -> Self {
        self.transforms = transforms;
        self
    }
}

/// Request options addressing the page's own site.
fn page_fetch_options(location: &PageLocation) -> FetchOptions {
    FetchOptions::forwarded_host(location.host())
}

/// `{siteSlug}` of the resolved site.
pub fn add_site_slug(uri: &PageUri, ctx: &TransformContext) -> Result<PartialDoc> {
    let site = ctx.site.as_ref().ok_or_else(|| AppError::SiteUnresolved {
        uri: uri.to_string(),
    })?;
    Ok(PartialDoc::new().with(fields::SITE_SLUG, site.slug.clone()))
}

/// Publish state of the page.
///
/// A published version yields `{published: true, url, publishTime}`,
/// preferring `customUrl` over `url`. A missing published version yields
/// `{published: false}`.
pub async fn add_publish_data(uri: &PageUri, ctx: &TransformContext) -> Result<PartialDoc> {
    let location = uri.location()?;
    let url = page_url(&ctx.cms_host, &location, Some("published"));

    let published = match ctx
        .fetcher
        .fetch_json(&url, &page_fetch_options(&location))
        .await
    {
        Ok(page) => page,
        Err(e) if e.is_not_found() => {
            log::debug!("{} has no published version", uri);
            return Ok(PartialDoc::new().with(fields::PUBLISHED, false));
        }
        Err(e) => return Err(e),
    };

    let public_url = non_empty_str(&published, "customUrl")
        .or_else(|| non_empty_str(&published, "url"))
        .map(|u| Value::String(u.to_string()))
        .unwrap_or(Value::Null);
    let publish_time = published
        .get("lastModified")
        .and_then(parse_timestamp)
        .map(|dt| Value::String(dt.to_rfc3339()))
        .unwrap_or(Value::Null);

    Ok(PartialDoc::new()
        .with(fields::PUBLISHED, true)
        .with(fields::URL, public_url)
        .with(fields::PUBLISH_TIME, publish_time))
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Check that the public URL still resolves back to this page.
///
/// Returns `{}` when it does (or when there is no URL to check) and
/// `{url: null}` when the lookup misses or names another page.
pub async fn validate_publish_url(uri: &PageUri, public_url: Option<&str>, ctx: &TransformContext) -> Result<PartialDoc> {
    let Some(public_url) = public_url.filter(|u| !u.is_empty()) else {
        return Ok(PartialDoc::new());
    };

    let lookup = uri_lookup_url(&ctx.cms_host, public_url);
    let location = uri.location()?;
    match ctx
        .fetcher
        .fetch_text(&lookup, &page_fetch_options(&location))
        .await
    {
        Ok(resolved) if resolved == uri.as_str() => Ok(PartialDoc::new()),
        Ok(resolved) => {
            log::warn!("{} points at {:?}, not {}; clearing url", public_url, resolved, uri);
            Ok(PartialDoc::new().with(fields::URL, Value::Null))
        }
        Err(e) if e.is_not_found() => {
            log::warn!("{} does not resolve to any page; clearing url", public_url);
            Ok(PartialDoc::new().with(fields::URL, Value::Null))
        }
        Err(e) => Err(e),
    }
}

/// Schedule state of the page: `{scheduled, scheduledTime?}`.
///
/// Uses the prefetched schedule when the context carries one, otherwise
/// fetches the site's schedule.
pub async fn add_schedule_time(uri: &PageUri, ctx: &TransformContext) -> Result<PartialDoc> {
    let location = uri.location()?;
    let fetched;
    let schedule: &[ScheduleEntry] = match &ctx.schedule {
        Some(schedule) => schedule,
        None => {
            let url = schedule_url(&ctx.cms_host, &location.path);
            let value = ctx
                .fetcher
                .fetch_json(&url, &page_fetch_options(&location))
                .await?;
            fetched = decode::<Schedule>(&url, value)?;
            &fetched
        }
    };

    let site_port = ctx.site.as_ref().and_then(|site| site.port);
    let entry = schedule
        .iter()
        .find(|entry| schedule_matches(entry, &location, site_port));

    Ok(match entry {
        Some(entry) => {
            let at = parse_timestamp(&entry.at)
                .map(|dt| Value::String(dt.to_rfc3339()))
                .unwrap_or_else(|| entry.at.clone());
            PartialDoc::new()
                .with(fields::SCHEDULED, true)
                .with(fields::SCHEDULED_TIME, at)
        }
        None => PartialDoc::new().with(fields::SCHEDULED, false),
    })
}

/// Whether `entry` publishes the page at `location`.
///
/// Hostname, port and path must all agree. A missing port means the
/// site's port, then the HTTP default, on both sides.
pub fn schedule_matches(entry: &ScheduleEntry, location: &PageLocation, site_port: Option<u16>) -> bool {
    let Ok(target) = url::Url::parse(&entry.publish) else {
        log::debug!("Skipping unparsable schedule entry {}", entry.publish);
        return false;
    };
    let default_port = site_port.unwrap_or(DEFAULT_PORT);

    let entry_port = target.port().unwrap_or(default_port);
    let page_port = location.port.unwrap_or(default_port);
    let entry_path = target.path().split(['@', '.']).next().unwrap_or_default();

    target.host_str() == Some(location.hostname.as_str())
        && entry_port == page_port
        && entry_path == location.page_path()
}

/// Run every registered custom transform against a copy of `doc` and
/// merge their outputs in registration order.
pub async fn apply_custom_transforms(uri: &PageUri, doc: &ElasticDoc, ctx: &TransformContext) -> Result<PartialDoc> {
    let outputs = ctx
        .transforms
        .iter()
        .map(|(name, transform)| {
            log::trace!("Applying transform '{}' to {}", name, uri);
            transform.transform(uri, doc.snapshot(), ctx).resolve()
        })
        .collect::<Vec<_>>();

    Ok(merge_all(try_join_all(outputs).await?))
}

/// Walk the composed page and merge the output of every handler whose
/// component appears in it, in document order.
pub async fn apply_handlers(uri: &PageUri, ctx: &TransformContext) -> Result<PartialDoc> {
    let location = uri.location()?;
    let url = composed_page_url(&ctx.cms_host, &location);
    let composed = ctx
        .fetcher
        .fetch_json(&url, &page_fetch_options(&location))
        .await?;

    let outputs: Vec<HandlerOutput> = walk_components(&composed)
        .filter_map(|component| {
            let name = component.name()?;
            let handler = ctx.handlers.get(name)?;
            Some(handler.handle(component.reference, component.data(), ctx))
        })
        .collect();
    log::debug!("{} handled components on {}", outputs.len(), uri);

    let resolved = try_join_all(outputs.into_iter().map(HandlerOutput::resolve)).await?;
    Ok(merge_all(resolved))
}

fn merge_all(partials: Vec<Option<PartialDoc>>) -> PartialDoc {
    partials
        .into_iter()
        .flatten()
        .fold(PartialDoc::new(), |mut merged, partial| {
            merged.merge(partial);
            merged
        })
}
