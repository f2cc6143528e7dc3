//! Scrape run lifecycle and fault audit models.
//!
//! A run is one execution of the engine against one source. Runs move
//! `running -> {completed, failed, cancelled}` exactly once; faults are
//! recorded against the run without interrupting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scrapers::StrategyKind;

/// Lifecycle state of a scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Category of a fault encountered mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Network,
    Parsing,
    Validation,
    Timeout,
    Javascript,
    RateLimit,
    Other,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Javascript => "javascript",
            Self::RateLimit => "rate_limit",
            Self::Other => "other",
        }
    }
}

/// One fault recorded against a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeFault {
    pub kind: FaultKind,
    pub message: String,
    pub url: Option<String>,
    pub selector: Option<String>,
    /// Retries spent before the fault was recorded.
    pub retry_count: u32,
    /// True when the pipeline worked around the fault (e.g. strategy fallback).
    pub resolved: bool,
    pub occurred_at: DateTime<Utc>,
}

impl ScrapeFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            url: None,
            selector: None,
            retry_count: 0,
            resolved: false,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }
}

/// One execution of the engine against one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRun {
    /// Unique identifier for this run.
    pub id: String,
    pub source_id: String,
    /// Strategy actually used (after any fallback).
    pub strategy: StrategyKind,
    pub started_at: DateTime<Utc>,
    /// Set exactly once, at the terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub pages_scraped: u32,
    /// Requests made including retries.
    pub requests_made: u32,
    /// Sum of response times for successful fetches.
    pub total_response_ms: u64,
    pub jobs_found: u32,
    pub jobs_created: u32,
    pub jobs_updated: u32,
    pub jobs_skipped: u32,
    pub error_count: u32,
    pub faults: Vec<ScrapeFault>,
}

impl ScrapeRun {
    pub fn new(source_id: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            strategy,
            started_at: Utc::now(),
            completed_at: None,
            status: RunStatus::Running,
            pages_scraped: 0,
            requests_made: 0,
            total_response_ms: 0,
            jobs_found: 0,
            jobs_created: 0,
            jobs_updated: 0,
            jobs_skipped: 0,
            error_count: 0,
            faults: Vec::new(),
        }
    }

    /// Record a fault against this run.
    pub fn record_fault(&mut self, fault: ScrapeFault) {
        self.error_count += 1;
        self.faults.push(fault);
    }

    /// Mean response time across successful page fetches.
    pub fn avg_response_ms(&self) -> u64 {
        if self.pages_scraped == 0 {
            0
        } else {
            self.total_response_ms / u64::from(self.pages_scraped)
        }
    }

    /// Transition to a terminal status. The first call wins; later calls
    /// are ignored so a run can never leave a terminal state.
    pub fn finalize(&mut self, status: RunStatus) -> bool {
        if !status.is_terminal() {
            warn!(run = %self.id, "finalize called with non-terminal status, ignoring");
            return false;
        }
        if self.status.is_terminal() {
            warn!(run = %self.id, current = self.status.as_str(), "run already finalized");
            return false;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Caller-facing summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub source_id: String,
    pub status: RunStatus,
    pub strategy: StrategyKind,
    pub pages_scraped: u32,
    pub requests_made: u32,
    pub avg_response_ms: u64,
    pub jobs_found: u32,
    pub jobs_created: u32,
    pub jobs_updated: u32,
    pub jobs_skipped: u32,
    pub error_count: u32,
    pub duration_ms: Option<i64>,
}

impl RunSummary {
    /// Only a systemic failure makes a run non-successful.
    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Failed
    }
}

impl From<&ScrapeRun> for RunSummary {
    fn from(run: &ScrapeRun) -> Self {
        Self {
            run_id: run.id.clone(),
            source_id: run.source_id.clone(),
            status: run.status,
            strategy: run.strategy,
            pages_scraped: run.pages_scraped,
            requests_made: run.requests_made,
            avg_response_ms: run.avg_response_ms(),
            jobs_found: run.jobs_found,
            jobs_created: run.jobs_created,
            jobs_updated: run.jobs_updated,
            jobs_skipped: run.jobs_skipped,
            error_count: run.error_count,
            duration_ms: run.duration_ms(),
        }
    }
}
