//! Token-bucket request pacing and the transient-failure retry policy.
//!
//! One bucket per source, shared across concurrent runs of that source
//! through [`RateLimiterRegistry`]. Every request, successful or not,
//! consumes exactly one slot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Default requests-per-minute for the HTTP and crawl strategies.
pub const DEFAULT_RPM: u32 = 30;
/// Default requests-per-minute for the browser strategy.
pub const BROWSER_DEFAULT_RPM: u32 = 20;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter bounding requests per minute.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Create a limiter allowing `rpm` requests per minute, starting full.
    pub fn per_minute(rpm: u32) -> Self {
        let capacity = f64::from(rpm.max(1));
        Self {
            capacity,
            refill_per_sec: capacity / 60.0,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until a slot is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let elapsed = state.last_refill.elapsed().as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = Instant::now();

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                (1.0 - state.tokens) / self.refill_per_sec
            };
            debug!("rate limit reached, pacing for {:.2}s", wait);
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        }
    }

    #[cfg(test)]
    async fn available(&self) -> f64 {
        self.state.lock().await.tokens
    }
}

/// Global limiter registry keyed by source id.
///
/// Concurrent runs of the same source (e.g. a manual trigger during a
/// scheduled run) share one bucket; the first registration's budget wins.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    limiters: RwLock<HashMap<String, Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the shared limiter for a source.
    pub async fn for_source(&self, source_id: &str, rpm: u32) -> Arc<RateLimiter> {
        {
            let limiters = self.limiters.read().await;
            if let Some(limiter) = limiters.get(source_id) {
                return limiter.clone();
            }
        }
        let mut limiters = self.limiters.write().await;
        limiters
            .entry(source_id.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::per_minute(rpm)))
            .clone()
    }
}

/// Bounded exponential-backoff retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first request.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Statuses worth retrying. Other 4xx responses are permanent.
    pub fn is_transient(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }

    /// Backoff before retry number `attempt` (0-based): 1s, 2s, 4s, ... capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
