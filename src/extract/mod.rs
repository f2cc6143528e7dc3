//! Selector-driven field extraction from listing pages.
//!
//! Given page markup and a source's selector map, locates the repeated
//! listing containers and pulls out named fields. Selector chains fall back
//! in order; when the configured container selector matches nothing, a set
//! of generic container patterns is tried before giving up on the page.
//! Missing optional fields are absent keys, never errors.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::models::{RawListing, SourceConfig};

/// Generic container patterns tried when the configured selector finds
/// nothing. Each candidate must contain a link to qualify as a listing.
const FALLBACK_CONTAINERS: &[&str] = &[
    "table tr",
    "ul li",
    "ol li",
    "div.job-listing, div.post, div.card, article",
];

/// Default title chain for fallback containers whose source config has none.
const FALLBACK_TITLE_SELECTORS: &[&str] = &["a", "h2", "h3", "strong"];

/// Everything extraction produces from one page.
#[derive(Debug, Default)]
pub struct ExtractedPage {
    pub listings: Vec<RawListing>,
    /// Resolved next-page URL when the source paginates by next-link.
    pub next_url: Option<String>,
}

/// Extract all listings and the next-page link from one page of markup.
pub fn parse_page(
    html: &str,
    source: &SourceConfig,
    run_id: &str,
    page_url: &str,
) -> ExtractedPage {
    let document = Html::parse_document(html);

    let containers = select_containers(&document, &source.selectors.job_container);
    let mut listings = Vec::new();
    for container in &containers {
        if let Some(listing) = extract_listing(*container, source, run_id, page_url) {
            listings.push(listing);
        }
    }
    debug!(
        page = page_url,
        containers = containers.len(),
        listings = listings.len(),
        "extracted page"
    );

    let next_url = source
        .pagination
        .next_page
        .as_deref()
        .and_then(|sel| find_next_url(&document, sel, page_url));

    ExtractedPage { listings, next_url }
}

/// All container matches, falling back to generic patterns when the
/// configured selector yields nothing.
fn select_containers<'a>(document: &'a Html, configured: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(configured) {
        Ok(selector) => {
            let matches: Vec<_> = document.select(&selector).collect();
            if !matches.is_empty() {
                return matches;
            }
        }
        Err(e) => warn!("invalid container selector {configured:?}: {e}"),
    }

    for pattern in FALLBACK_CONTAINERS {
        // Fallback patterns are compile-time constants
        let selector = Selector::parse(pattern).unwrap();
        let link = Selector::parse("a[href]").unwrap();
        let matches: Vec<_> = document
            .select(&selector)
            .filter(|el| el.select(&link).next().is_some())
            .collect();
        if !matches.is_empty() {
            debug!("container selector matched nothing, using fallback {pattern:?}");
            return matches;
        }
    }

    Vec::new()
}

/// Extract one container's fields. Returns None when the container has no
/// title: it can never become a valid record.
fn extract_listing(
    container: ElementRef,
    source: &SourceConfig,
    run_id: &str,
    page_url: &str,
) -> Option<RawListing> {
    let selectors = &source.selectors;
    let mut listing = RawListing::new(run_id, source.id.as_str(), page_url);

    for (field, chain) in selectors.text_fields() {
        if let Some(text) = first_text(container, chain) {
            listing.fields.insert(field.to_string(), text);
        }
    }
    for (field, chain) in selectors.link_fields() {
        if let Some(href) = first_href(container, chain, page_url) {
            listing.fields.insert(field.to_string(), href);
        }
    }

    // Sources without a configured title chain (generic fallback containers)
    // take the first anchor or heading text instead
    if listing.get("title").is_none() && selectors.title.is_empty() {
        if let Some(text) = first_text_static(container, FALLBACK_TITLE_SELECTORS) {
            listing.fields.insert("title".to_string(), text);
        }
    }

    // A title is the one thing a listing cannot do without
    listing.get("title")?;

    Some(listing)
}

/// First selector in the chain yielding non-empty text.
fn first_text(container: ElementRef, chain: &[String]) -> Option<String> {
    for selector_str in chain {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(e) => {
                warn!("invalid field selector {selector_str:?}: {e}");
                continue;
            }
        };
        if let Some(element) = container.select(&selector).next() {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn first_text_static(container: ElementRef, chain: &[&str]) -> Option<String> {
    for selector_str in chain {
        let selector = Selector::parse(selector_str).unwrap();
        if let Some(element) = container.select(&selector).next() {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// First selector in the chain yielding an href, resolved absolute against
/// the page URL.
fn first_href(container: ElementRef, chain: &[String], page_url: &str) -> Option<String> {
    for selector_str in chain {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(e) => {
                warn!("invalid link selector {selector_str:?}: {e}");
                continue;
            }
        };
        if let Some(href) = container
            .select(&selector)
            .find_map(|el| el.value().attr("href"))
        {
            if let Some(absolute) = resolve_href(page_url, href) {
                return Some(absolute);
            }
        }
    }
    None
}

fn resolve_href(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Resolve the next-page link for next-link pagination.
fn find_next_url(document: &Html, selector_str: &str, page_url: &str) -> Option<String> {
    let selector = match Selector::parse(selector_str) {
        Ok(s) => s,
        Err(e) => {
            warn!("invalid next-page selector {selector_str:?}: {e}");
            return None;
        }
    };
    document
        .select(&selector)
        .find_map(|el| el.value().attr("href"))
        .and_then(|href| resolve_href(page_url, href))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table class="jobs">
            <tr class="job">
                <td class="title"><a href="/jobs/42">Junior Engineer Recruitment 2026</a></td>
                <td class="dept">PWD</td>
                <td class="last">31/10/2026</td>
            </tr>
            <tr class="job">
                <td class="title"><a href="https://other.gov.in/jobs/7">Staff Nurse Vacancy Notice</a></td>
                <td class="dept">Health</td>
                <td class="last">15/11/2026</td>
            </tr>
            <tr class="job">
                <td class="title"></td>
                <td class="dept">No title here</td>
            </tr>
        </table>
        <a class="next" href="?page=2">Next</a>
        </body></html>
    "#;

    fn source() -> SourceConfig {
        let mut source = SourceConfig::new("s1", "Source", "https://example.gov.in/jobs");
        source.selectors.job_container = "tr.job".to_string();
        source.selectors.title = vec!["td.title a".to_string()];
        source.selectors.department = vec!["td.dept".to_string()];
        source.selectors.last_date = vec!["td.last".to_string()];
        source.selectors.application_link = vec!["td.title a".to_string()];
        source
    }

    #[test]
    fn test_extracts_fields_per_container() {
        let page = parse_page(PAGE, &source(), "run1", "https://example.gov.in/jobs");
        assert_eq!(page.listings.len(), 2);

        let first = &page.listings[0];
        assert_eq!(first.get("title"), Some("Junior Engineer Recruitment 2026"));
        assert_eq!(first.get("department"), Some("PWD"));
        assert_eq!(first.get("last_date"), Some("31/10/2026"));
    }

    #[test]
    fn test_titleless_container_is_dropped() {
        let page = parse_page(PAGE, &source(), "run1", "https://example.gov.in/jobs");
        assert!(page
            .listings
            .iter()
            .all(|l| l.get("title").is_some()));
    }

    #[test]
    fn test_links_resolved_absolute() {
        let page = parse_page(PAGE, &source(), "run1", "https://example.gov.in/jobs");
        assert_eq!(
            page.listings[0].get("application_link"),
            Some("https://example.gov.in/jobs/42")
        );
        // already-absolute hrefs pass through
        assert_eq!(
            page.listings[1].get("application_link"),
            Some("https://other.gov.in/jobs/7")
        );
    }

    #[test]
    fn test_next_page_link() {
        let mut source = source();
        source.pagination.next_page = Some("a.next".to_string());
        let page = parse_page(PAGE, &source, "run1", "https://example.gov.in/jobs");
        assert_eq!(
            page.next_url.as_deref(),
            Some("https://example.gov.in/jobs?page=2")
        );
    }

    #[test]
    fn test_selector_chain_fallback() {
        let mut source = source();
        source.selectors.title = vec!["td.missing".to_string(), "td.title a".to_string()];
        let page = parse_page(PAGE, &source, "run1", "https://example.gov.in/jobs");
        assert_eq!(
            page.listings[0].get("title"),
            Some("Junior Engineer Recruitment 2026")
        );
    }

    #[test]
    fn test_generic_container_fallback() {
        let mut source = source();
        source.selectors.job_container = "div.nonexistent".to_string();
        source.selectors.title = Vec::new();
        let page = parse_page(PAGE, &source, "run1", "https://example.gov.in/jobs");
        // Falls back to "table tr" rows containing links; titleless row dropped
        assert_eq!(page.listings.len(), 2);
        assert_eq!(
            page.listings[0].get("title"),
            Some("Junior Engineer Recruitment 2026")
        );
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let page = parse_page(
            "<html><body><p>maintenance</p></body></html>",
            &source(),
            "run1",
            "https://example.gov.in/jobs",
        );
        assert!(page.listings.is_empty());
        assert!(page.next_url.is_none());
    }
}
