//! Crawl fetch strategy for large, deeply-paginated sources.
//!
//! Same wire behavior as the HTTP strategy but tuned for volume: a pooled
//! connection set and an internal concurrency cap so batch fetches of
//! auxiliary pages cannot swamp one host. The pagination walk itself stays
//! sequential; the cap only matters for `fetch_many` style batch work.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;

use crate::models::SourceConfig;

use super::http::fetch_with_policy;
use super::proxy::{ProxyEntry, ProxyPool};
use super::rate_limit::{RateLimiter, RetryPolicy};
use super::user_agent::resolve_user_agent;
use super::{FetchError, FetchStrategy, FetchedPage, StrategyKind, DEFAULT_TIMEOUT_SECS};

/// Concurrent in-flight requests this strategy allows per source.
const MAX_IN_FLIGHT: usize = 8;

/// High-volume fetcher for sources flagged `complex_structure`.
pub struct CrawlFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    proxy: Option<Arc<ProxyEntry>>,
    in_flight: Arc<Semaphore>,
}

impl CrawlFetcher {
    pub fn new(
        source: &SourceConfig,
        limiter: Arc<RateLimiter>,
        pool: &ProxyPool,
    ) -> anyhow::Result<Self> {
        let user_agent = resolve_user_agent(source.user_agent.as_deref());
        let timeout = Duration::from_secs(source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let proxy = pool.best();

        let mut builder = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .pool_max_idle_per_host(MAX_IN_FLIGHT)
            .tcp_keepalive(Duration::from_secs(60));
        if let Some(entry) = &proxy {
            builder = builder.proxy(reqwest::Proxy::all(&entry.url)?);
        }

        Ok(Self {
            client: builder.build()?,
            limiter,
            policy: source
                .max_retries
                .map(RetryPolicy::with_max_attempts)
                .unwrap_or_default(),
            proxy,
            in_flight: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        })
    }
}

#[async_trait]
impl FetchStrategy for CrawlFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        // Closed only on drop, so acquire cannot fail while self lives
        let _permit = self.in_flight.acquire().await.map_err(|e| {
            FetchError::Network {
                url: url.to_string(),
                message: format!("fetcher shut down: {e}"),
                status: None,
                retries: 0,
                timed_out: false,
            }
        })?;

        fetch_with_policy(
            &self.client,
            url,
            &self.policy,
            &self.limiter,
            self.proxy.as_deref(),
        )
        .await
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Crawl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reports_crawl_kind() {
        let mut source = SourceConfig::new("s1", "Source", "https://example.gov.in");
        source.complex_structure = true;

        let limiter = Arc::new(RateLimiter::per_minute(30));
        let fetcher = CrawlFetcher::new(&source, limiter, &ProxyPool::default()).unwrap();
        assert_eq!(fetcher.kind(), StrategyKind::Crawl);
        assert_eq!(fetcher.in_flight.available_permits(), MAX_IN_FLIGHT);
    }
}
