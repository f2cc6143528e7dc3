//! Fetch strategies for government job portals.
//!
//! Three interchangeable implementations share one contract: fetch a URL,
//! return the rendered or raw markup, report timing. Strategy choice is a
//! pure function of the source configuration; an unavailable browser
//! runtime degrades to plain HTTP with a recorded warning.

pub mod browser;
pub mod crawl;
pub mod http;
pub mod proxy;
pub mod rate_limit;
pub mod user_agent;

pub use browser::BrowserFetcher;
pub use crawl::CrawlFetcher;
pub use http::HttpFetcher;
pub use proxy::{ProxyEntry, ProxyPool};
pub use rate_limit::{RateLimiter, RateLimiterRegistry, RetryPolicy, BROWSER_DEFAULT_RPM, DEFAULT_RPM};
pub use user_agent::resolve_user_agent;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::{FaultKind, ScrapeFault, SourceConfig};

/// Default per-request timeout when the source does not override it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which fetch strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Http,
    Browser,
    Crawl,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
            Self::Crawl => "crawl",
        }
    }

    /// Default request budget; browser pages cost more per request.
    pub fn default_requests_per_minute(&self) -> u32 {
        match self {
            Self::Browser => BROWSER_DEFAULT_RPM,
            Self::Http | Self::Crawl => DEFAULT_RPM,
        }
    }
}

/// Pick the strategy for a source. Pure function of the configuration:
/// `requires_js` beats `complex_structure` beats plain HTTP.
pub fn select_strategy(source: &SourceConfig) -> StrategyKind {
    if source.requires_js {
        StrategyKind::Browser
    } else if source.complex_structure {
        StrategyKind::Crawl
    } else {
        StrategyKind::Http
    }
}

/// Markup returned by a fetch, with timing.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    /// URL after redirects.
    pub final_url: String,
    pub response_ms: u64,
    /// Requests spent, including retries.
    pub attempts: u32,
}

/// Failure modes of a fetch after the retry policy is exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network {
        url: String,
        message: String,
        status: Option<u16>,
        retries: u32,
        timed_out: bool,
    },
    #[error("render error on {url}: {message}")]
    Render { url: String, message: String },
}

impl FetchError {
    /// Requests spent before this error was returned.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Network { retries, .. } => retries + 1,
            Self::Render { .. } => 1,
        }
    }

    /// Convert into an audit fault row.
    pub fn to_fault(&self) -> ScrapeFault {
        match self {
            Self::Network {
                url,
                status,
                retries,
                timed_out,
                ..
            } => {
                let kind = if *status == Some(429) {
                    FaultKind::RateLimit
                } else if *timed_out {
                    FaultKind::Timeout
                } else {
                    FaultKind::Network
                };
                ScrapeFault::new(kind, self.to_string())
                    .with_url(url.clone())
                    .with_retries(*retries)
            }
            Self::Render { url, .. } => {
                ScrapeFault::new(FaultKind::Javascript, self.to_string()).with_url(url.clone())
            }
        }
    }
}

/// Capability contract shared by all fetch strategies.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;

    fn kind(&self) -> StrategyKind;
}

/// Build the fetcher for a source.
///
/// Falls back from the browser strategy to plain HTTP when the browser
/// runtime is unavailable, returning a resolved warning fault for the run
/// record. Errors here are systemic: the run cannot start at all.
pub async fn build_fetcher(
    source: &SourceConfig,
    limiters: &RateLimiterRegistry,
    pool: &ProxyPool,
) -> anyhow::Result<(Box<dyn FetchStrategy>, Option<ScrapeFault>)> {
    let preferred = select_strategy(source);
    let rpm = source
        .requests_per_minute
        .unwrap_or_else(|| preferred.default_requests_per_minute());

    match preferred {
        StrategyKind::Browser => {
            let limiter = limiters.for_source(&source.id, rpm).await;
            match BrowserFetcher::launch(source, limiter).await {
                Ok(fetcher) => Ok((Box::new(fetcher), None)),
                Err(e) => {
                    warn!(source = %source.id, "browser unavailable, falling back to http: {e}");
                    let fault = ScrapeFault::new(
                        FaultKind::Javascript,
                        format!("browser strategy unavailable, using http: {e}"),
                    )
                    .resolved();
                    let http_rpm = source
                        .requests_per_minute
                        .unwrap_or_else(|| StrategyKind::Http.default_requests_per_minute());
                    let limiter = limiters.for_source(&source.id, http_rpm).await;
                    let fetcher = HttpFetcher::new(source, limiter, pool)?;
                    Ok((Box::new(fetcher), Some(fault)))
                }
            }
        }
        StrategyKind::Crawl => {
            let limiter = limiters.for_source(&source.id, rpm).await;
            let fetcher = CrawlFetcher::new(source, limiter, pool)?;
            Ok((Box::new(fetcher), None))
        }
        StrategyKind::Http => {
            let limiter = limiters.for_source(&source.id, rpm).await;
            let fetcher = HttpFetcher::new(source, limiter, pool)?;
            Ok((Box::new(fetcher), None))
        }
    }
}

/// Fetch a batch of URLs through one strategy with bounded concurrency.
///
/// Results are returned in input order. Used by queue consumers that need
/// auxiliary pages alongside the sequential pagination walk.
pub async fn fetch_many(
    strategy: &dyn FetchStrategy,
    urls: &[String],
    concurrency: usize,
) -> Vec<Result<FetchedPage, FetchError>> {
    use futures::stream::{self, StreamExt};

    stream::iter(urls.iter().map(|url| strategy.fetch(url)))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(requires_js: bool, complex: bool) -> SourceConfig {
        let mut s = SourceConfig::new("s1", "Source", "https://example.gov.in");
        s.requires_js = requires_js;
        s.complex_structure = complex;
        s
    }

    #[test]
    fn test_select_strategy_priority() {
        assert_eq!(select_strategy(&source(false, false)), StrategyKind::Http);
        assert_eq!(select_strategy(&source(false, true)), StrategyKind::Crawl);
        assert_eq!(select_strategy(&source(true, false)), StrategyKind::Browser);
        // requires_js wins the tie
        assert_eq!(select_strategy(&source(true, true)), StrategyKind::Browser);
    }

    #[test]
    fn test_default_rpm_per_strategy() {
        assert_eq!(StrategyKind::Http.default_requests_per_minute(), 30);
        assert_eq!(StrategyKind::Crawl.default_requests_per_minute(), 30);
        assert_eq!(StrategyKind::Browser.default_requests_per_minute(), 20);
    }

    #[test]
    fn test_fetch_error_fault_mapping() {
        let rate_limited = FetchError::Network {
            url: "https://example.gov.in".to_string(),
            message: "HTTP 429".to_string(),
            status: Some(429),
            retries: 2,
            timed_out: false,
        };
        assert_eq!(rate_limited.to_fault().kind, FaultKind::RateLimit);
        assert_eq!(rate_limited.attempts(), 3);

        let timeout = FetchError::Network {
            url: "https://example.gov.in".to_string(),
            message: "timed out".to_string(),
            status: None,
            retries: 2,
            timed_out: true,
        };
        assert_eq!(timeout.to_fault().kind, FaultKind::Timeout);

        let render = FetchError::Render {
            url: "https://example.gov.in".to_string(),
            message: "selector wait timed out".to_string(),
        };
        assert_eq!(render.to_fault().kind, FaultKind::Javascript);
        assert_eq!(render.attempts(), 1);
    }

    struct StubStrategy;

    #[async_trait]
    impl FetchStrategy for StubStrategy {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            Ok(FetchedPage {
                html: format!("<html>{url}</html>"),
                final_url: url.to_string(),
                response_ms: 1,
                attempts: 1,
            })
        }

        fn kind(&self) -> StrategyKind {
            StrategyKind::Crawl
        }
    }

    #[tokio::test]
    async fn test_fetch_many_preserves_order() {
        let urls: Vec<String> = (0..8)
            .map(|i| format!("https://example.gov.in/page/{i}"))
            .collect();
        let results = fetch_many(&StubStrategy, &urls, 3).await;
        assert_eq!(results.len(), 8);
        for (url, result) in urls.iter().zip(&results) {
            assert!(result.as_ref().unwrap().html.contains(url));
        }
    }
}
