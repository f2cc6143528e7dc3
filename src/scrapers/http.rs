//! Plain HTTP fetch strategy.
//!
//! The default strategy for static listing pages. The retry/rate-limit core
//! here is shared with the crawl strategy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::models::SourceConfig;

use super::proxy::{ProxyEntry, ProxyPool};
use super::rate_limit::{RateLimiter, RetryPolicy};
use super::user_agent::resolve_user_agent;
use super::{FetchError, FetchStrategy, FetchedPage, StrategyKind, DEFAULT_TIMEOUT_SECS};

/// HTTP fetcher with retry, pacing, and optional proxy.
pub struct HttpFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    proxy: Option<Arc<ProxyEntry>>,
}

impl HttpFetcher {
    pub fn new(
        source: &SourceConfig,
        limiter: Arc<RateLimiter>,
        pool: &ProxyPool,
    ) -> anyhow::Result<Self> {
        let proxy = pool.best();
        let client = build_client(source, proxy.as_deref())?;
        let policy = source
            .max_retries
            .map(RetryPolicy::with_max_attempts)
            .unwrap_or_default();

        Ok(Self {
            client,
            limiter,
            policy,
            proxy,
        })
    }
}

#[async_trait]
impl FetchStrategy for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
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
        StrategyKind::Http
    }
}

/// Build a reqwest client for a source, routed through a proxy when one is
/// configured.
pub(super) fn build_client(
    source: &SourceConfig,
    proxy: Option<&ProxyEntry>,
) -> anyhow::Result<Client> {
    let user_agent = resolve_user_agent(source.user_agent.as_deref());
    let timeout = Duration::from_secs(source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS));

    let mut builder = Client::builder()
        .user_agent(&user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true);
    if let Some(entry) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(&entry.url)?);
    }
    Ok(builder.build()?)
}

/// Bounded retry loop around one GET.
///
/// Every attempt consumes one rate-limit slot. Transient statuses and
/// timeouts back off exponentially; other failures return immediately.
pub(super) async fn fetch_with_policy(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
    limiter: &RateLimiter,
    proxy: Option<&ProxyEntry>,
) -> Result<FetchedPage, FetchError> {
    let mut attempt = 0u32;
    loop {
        limiter.acquire().await;

        let start = Instant::now();
        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if response.status().is_success() {
                    let final_url = response.url().to_string();
                    match response.text().await {
                        Ok(html) => {
                            if let Some(entry) = proxy {
                                entry.record(true);
                            }
                            return Ok(FetchedPage {
                                html,
                                final_url,
                                response_ms: start.elapsed().as_millis() as u64,
                                attempts: attempt + 1,
                            });
                        }
                        Err(e) if attempt + 1 < policy.max_attempts => {
                            debug!("body read failed for {url}, retrying: {e}");
                            tokio::time::sleep(policy.backoff_delay(attempt)).await;
                            attempt += 1;
                        }
                        Err(e) => {
                            if let Some(entry) = proxy {
                                entry.record(false);
                            }
                            return Err(FetchError::Network {
                                url: url.to_string(),
                                message: format!("body read failed: {e}"),
                                status: Some(status),
                                retries: attempt,
                                timed_out: e.is_timeout(),
                            });
                        }
                    }
                } else if RetryPolicy::is_transient(status) && attempt + 1 < policy.max_attempts {
                    let delay = policy.backoff_delay(attempt);
                    debug!("transient HTTP {status} from {url}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                } else {
                    if let Some(entry) = proxy {
                        entry.record(false);
                    }
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        message: format!("HTTP {status}"),
                        status: Some(status),
                        retries: attempt,
                        timed_out: false,
                    });
                }
            }
            Err(e) => {
                let transient = e.is_timeout() || e.is_connect();
                if transient && attempt + 1 < policy.max_attempts {
                    let delay = policy.backoff_delay(attempt);
                    debug!("request to {url} failed ({e}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                } else {
                    if let Some(entry) = proxy {
                        entry.record(false);
                    }
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                        retries: attempt,
                        timed_out: e.is_timeout(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_source_overrides() {
        let mut source = SourceConfig::new("s1", "Source", "https://example.gov.in");
        source.max_retries = Some(5);
        source.timeout_seconds = Some(10);

        let limiter = Arc::new(RateLimiter::per_minute(30));
        let fetcher = HttpFetcher::new(&source, limiter, &ProxyPool::default()).unwrap();
        assert_eq!(fetcher.policy.max_attempts, 5);
        assert_eq!(fetcher.kind(), StrategyKind::Http);
        assert!(fetcher.proxy.is_none());
    }

    #[test]
    fn test_new_picks_proxy_from_pool() {
        let source = SourceConfig::new("s1", "Source", "https://example.gov.in");
        let pool = ProxyPool::from_urls(&["socks5://127.0.0.1:1080".to_string()]);
        let limiter = Arc::new(RateLimiter::per_minute(30));
        let fetcher = HttpFetcher::new(&source, limiter, &pool).unwrap();
        assert_eq!(
            fetcher.proxy.as_ref().map(|p| p.url.as_str()),
            Some("socks5://127.0.0.1:1080")
        );
    }
}
