// src/utils/url.rs

//! CMS endpoint construction.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::models::PageLocation;

/// Remove a leading `http://` or `https://`.
pub fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url)
}

/// Base64 key of a public URL as used by the `/uris` endpoint.
pub fn encode_uri_key(url: &str) -> String {
    STANDARD.encode(strip_scheme(url))
}

/// CMS URL of a page, optionally at a version such as `published`.
///
/// # Examples
/// ```
/// use reindexer::models::PageLocation;
/// use reindexer::utils::url::page_url;
///
/// let loc = PageLocation::parse("foo.com/blog/pages/1").unwrap();
/// assert_eq!(
///     page_url("http://cms", &loc, Some("published")),
///     "http://cms/blog/pages/1@published"
/// );
/// ```
pub fn page_url(cms_host: &str, location: &PageLocation, version: Option<&str>) -> String {
    let url = format!("{cms_host}{}", location.page_path());
    match version {
        Some(version) => format!("{url}@{version}"),
        None => url,
    }
}

/// CMS URL of the fully composed page JSON.
pub fn composed_page_url(cms_host: &str, location: &PageLocation) -> String {
    format!("{}.json", page_url(cms_host, location, None))
}

/// CMS URL of a site's publish schedule.
pub fn schedule_url(cms_host: &str, site_path: &str) -> String {
    format!("{cms_host}{}/schedule", normalize_path(site_path))
}

/// CMS URL listing a site's page URIs.
pub fn pages_url(cms_host: &str, site_path: &str, pages_segment: &str) -> String {
    format!(
        "{cms_host}{}/{}",
        normalize_path(site_path),
        pages_segment.trim_matches('/')
    )
}

/// CMS URL resolving a public URL to its canonical page URI.
pub fn uri_lookup_url(cms_host: &str, public_url: &str) -> String {
    format!("{cms_host}/uris/{}", encode_uri_key(public_url))
}

/// `/` and empty both mean the root site.
fn normalize_path(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "",
        p => p,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("http://foo.com/bar"), "foo.com/bar");
        assert_eq!(strip_scheme("https://foo.com/bar"), "foo.com/bar");
        assert_eq!(strip_scheme("foo.com/bar"), "foo.com/bar");
    }

    #[test]
    fn test_uri_lookup_url() {
        // base64("foo.com/bar")
        assert_eq!(
            uri_lookup_url("http://cms", "http://foo.com/bar"),
            "http://cms/uris/Zm9vLmNvbS9iYXI="
        );
    }

    #[test]
    fn test_page_urls() {
        let loc = PageLocation::parse("foo.com/pages/1").unwrap();
        assert_eq!(page_url("http://cms", &loc, None), "http://cms/pages/1");
        assert_eq!(
            page_url("http://cms", &loc, Some("published")),
            "http://cms/pages/1@published"
        );
        assert_eq!(composed_page_url("http://cms", &loc), "http://cms/pages/1.json");

        let clay = PageLocation::parse("nymag.com/daily/_pages/abc").unwrap();
        assert_eq!(page_url("http://cms", &clay, None), "http://cms/daily/_pages/abc");
    }

    #[test]
    fn test_site_urls() {
        assert_eq!(schedule_url("http://cms", "/"), "http://cms/schedule");
        assert_eq!(schedule_url("http://cms", "/blog"), "http://cms/blog/schedule");
        assert_eq!(pages_url("http://cms", "", "pages"), "http://cms/pages");
        assert_eq!(pages_url("http://cms", "/blog/", "_pages"), "http://cms/blog/_pages");
    }
}
