//! Proxy rotation with per-proxy success statistics.
//!
//! Proxies are shared read-only across runs; usage statistics are updated
//! atomically after each request and selection prefers the highest
//! historical success rate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One proxy endpoint and its request history.
#[derive(Debug)]
pub struct ProxyEntry {
    pub url: String,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl ProxyEntry {
    fn new(url: String) -> Self {
        Self {
            url,
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Record the outcome of one request through this proxy.
    pub fn record(&self, success: bool) {
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Historical success rate; unused proxies rank highest.
    pub fn success_rate(&self) -> f64 {
        let s = self.successes.load(Ordering::Relaxed);
        let f = self.failures.load(Ordering::Relaxed);
        if s + f == 0 {
            1.0
        } else {
            s as f64 / (s + f) as f64
        }
    }
}

/// Read-only pool of proxies for one source.
#[derive(Debug, Default)]
pub struct ProxyPool {
    entries: Vec<Arc<ProxyEntry>>,
}

impl ProxyPool {
    pub fn from_urls(urls: &[String]) -> Self {
        Self {
            entries: urls
                .iter()
                .map(|u| Arc::new(ProxyEntry::new(u.clone())))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Proxy with the best historical success rate, if any are configured.
    pub fn best(&self) -> Option<Arc<ProxyEntry>> {
        self.entries
            .iter()
            .max_by(|a, b| {
                a.success_rate()
                    .partial_cmp(&b.success_rate())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }
}
