//! Link extraction
//!
//! This module turns the anchors of a rendered page into the list of
//! same-origin pages to crawl next:
//! - reading raw `href` values out of page HTML
//! - resolving them against the page URL
//! - dropping anything malformed, non-HTTP or off-origin
//! - removing duplicates while keeping first-seen order

use crate::url::{is_same_origin, normalize_url};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::{Origin, Url};

/// Reads the raw `href` of every `<a href>` element, in document order
///
/// Attribute values are returned untouched; resolution happens in
/// [`extract_links`].
pub fn parse_anchor_hrefs(html: &str) -> Vec<Option<String>> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element.value().attr("href").map(str::to_string))
        .collect()
}

/// Filters raw anchor hrefs down to crawlable same-origin URLs
///
/// # Extraction Rules
///
/// **Drop:**
/// - missing or empty hrefs
/// - fragment-only links (same page anchors)
/// - hrefs that fail to resolve against `page_url`
/// - non-HTTP(S) results (`javascript:`, `mailto:`, `tel:`, `data:` ...)
/// - URLs whose origin differs from `origin`
///
/// **Keep:** everything else, normalized without its fragment, each URL
/// once, in the order it first appears.
///
/// Never fails: an invalid href is skipped, not reported.
///
/// # Arguments
///
/// * `hrefs` - Raw anchor hrefs as reported by the browser
/// * `page_url` - URL of the page the anchors came from, for relative resolution
/// * `origin` - Origin the crawl is restricted to
///
/// # Example
///
/// ```
/// use site_sentinel::crawler::extract_links;
/// use url::Url;
///
/// let page = Url::parse("https://example.com/shop/").unwrap();
/// let hrefs = vec![
///     Some("cart".to_string()),
///     Some("https://other.com/".to_string()),
///     Some("/shop/cart#top".to_string()),
/// ];
/// let links = extract_links(&hrefs, &page, &page.origin());
/// assert_eq!(links, vec!["https://example.com/shop/cart"]);
/// ```
pub fn extract_links(hrefs: &[Option<String>], page_url: &Url, origin: &Origin) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs.iter().flatten() {
        let Some(url) = resolve_link(href, page_url) else {
            continue;
        };

        if !is_same_origin(&url, origin) {
            continue;
        }

        let link = url.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

/// Resolves one href to a normalized absolute HTTP(S) URL
fn resolve_link(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let absolute = page_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}
