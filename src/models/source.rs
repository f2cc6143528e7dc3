//! Source configuration for government job portals.
//!
//! A source describes one site the pipeline knows how to scrape: where it
//! lives, which selectors locate listings and fields, how pagination works,
//! and which fetch strategy it needs. Sources are owned by the registry and
//! read-only to the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-field CSS selector chains for one source.
///
/// Every field except `job_container` is an ordered fallback chain: the first
/// selector that yields a non-empty value wins. An empty chain means the
/// field is not extracted for this source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectorMap {
    /// Selector matching one listing container per job.
    pub job_container: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub department: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualification: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notification_date: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_date: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exam_date: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fee: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub salary: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub age_limit: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_link: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notification_pdf: Vec<String>,
}

impl SelectorMap {
    /// Text fields with their selector chains, in extraction order.
    pub fn text_fields(&self) -> [(&'static str, &[String]); 12] {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("department", &self.department),
            ("posts", &self.posts),
            ("qualification", &self.qualification),
            ("notification_date", &self.notification_date),
            ("last_date", &self.last_date),
            ("exam_date", &self.exam_date),
            ("fee", &self.fee),
            ("salary", &self.salary),
            ("age_limit", &self.age_limit),
            ("location", &self.location),
        ]
    }

    /// Link fields whose value is a resolved `href`, not text.
    pub fn link_fields(&self) -> [(&'static str, &[String]); 2] {
        [
            ("application_link", &self.application_link),
            ("notification_pdf", &self.notification_pdf),
        ]
    }
}

/// Pagination descriptor for one source.
///
/// Either a CSS selector for the next-page link or a URL pattern containing
/// a `{page}` placeholder. When both are set, the pattern wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Selector for the next-page anchor.
    #[serde(default)]
    pub next_page: Option<String>,
    /// URL pattern with a `{page}` placeholder, e.g. `/jobs?page={page}`.
    #[serde(default)]
    pub url_pattern: Option<String>,
    /// Hard cap on pages visited per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            next_page: None,
            url_pattern: None,
            max_pages: default_max_pages(),
        }
    }
}

fn default_max_pages() -> u32 {
    10
}

/// One government site the pipeline knows how to scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique identifier for this source.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Listing page URL where scraping starts.
    pub base_url: String,
    /// Field selectors for this source.
    pub selectors: SelectorMap,
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Site renders listings with JavaScript; use the browser strategy.
    #[serde(default)]
    pub requires_js: bool,
    /// Large multi-page site; use the crawl strategy.
    #[serde(default)]
    pub complex_structure: bool,
    /// Requests-per-minute budget. None uses the strategy default.
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
    /// Retry attempts for transient failures. None uses the policy default.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Per-request timeout. None uses the strategy default.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// User agent configuration.
    /// - None: default NaukriHarvest user agent
    /// - "rotate": randomly select from real browser user agents
    /// - Any other string: use as a custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Proxy URLs to rotate through, best success rate first.
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Skip images/fonts/media in the browser strategy.
    #[serde(default = "default_true")]
    pub block_resources: bool,
    /// How often this source should be scraped.
    #[serde(default = "default_frequency_hours")]
    pub frequency_hours: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maintained by the source registry after each run.
    #[serde(default)]
    pub last_scraped: Option<DateTime<Utc>>,
}

fn default_frequency_hours() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

impl SourceConfig {
    /// Create a minimal source with defaults, mostly useful in tests.
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
            selectors: SelectorMap::default(),
            pagination: PaginationConfig::default(),
            requires_js: false,
            complex_structure: false,
            requests_per_minute: None,
            max_retries: None,
            timeout_seconds: None,
            user_agent: None,
            proxies: Vec::new(),
            block_resources: true,
            frequency_hours: default_frequency_hours(),
            enabled: true,
            last_scraped: None,
        }
    }

    /// Whether this source should be scraped now.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_scraped {
            None => true,
            Some(last) => now - last >= chrono::Duration::hours(i64::from(self.frequency_hours)),
        }
    }
}
