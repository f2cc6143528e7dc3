//! Scrape orchestration: strategy selection, pagination, run lifecycle.
//!
//! One engine run works one source: fetch a page, extract its listings,
//! normalize and score each, hand them to the reconciler, advance
//! pagination. Per-page and per-listing failures become audit faults and
//! never abort the run; only a failed first page or a strategy that cannot
//! initialize fails the whole run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::extract;
use crate::models::{
    FaultKind, RawListing, RunStatus, RunSummary, ScrapeFault, ScrapeRun, SourceConfig,
};
use crate::normalize;
use crate::quality;
use crate::reconcile::{Outcome, Reconciler};
use crate::scrapers::{self, FetchStrategy, ProxyPool, RateLimiterRegistry};
use crate::store::{AuditStore, JobStore};

/// Pages in a row that may yield zero valid records before the run stops.
/// Guards against misconfigured pagination that never ends.
const MAX_ZERO_YIELD_PAGES: u32 = 3;

/// Cooperative cancellation flag, checked between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum LoopEnd {
    Finished,
    Cancelled,
    FirstPageFailed,
}

/// Drives scrape runs for sources.
pub struct ScrapeEngine {
    reconciler: Reconciler,
    audit: Arc<dyn AuditStore>,
    limiters: RateLimiterRegistry,
}

impl ScrapeEngine {
    pub fn new(jobs: Arc<dyn JobStore>, audit: Arc<dyn AuditStore>) -> Self {
        Self {
            reconciler: Reconciler::new(jobs),
            audit,
            limiters: RateLimiterRegistry::new(),
        }
    }

    /// Execute one run against a source.
    ///
    /// Always returns a summary; only a systemic failure yields a
    /// non-success status.
    pub async fn run(&self, source: &SourceConfig, cancel: &CancelFlag) -> RunSummary {
        let pool = ProxyPool::from_urls(&source.proxies);
        match scrapers::build_fetcher(source, &self.limiters, &pool).await {
            Ok((fetcher, warning)) => {
                self.run_with_fetcher(source, fetcher, warning, cancel).await
            }
            Err(e) => {
                // The strategy could not initialize at all
                let mut run = ScrapeRun::new(source.id.clone(), scrapers::select_strategy(source));
                let fault =
                    ScrapeFault::new(FaultKind::Other, format!("strategy initialization failed: {e}"));
                self.fault(&mut run, fault).await;
                run.finalize(RunStatus::Failed);
                self.persist_run(&run).await;
                RunSummary::from(&run)
            }
        }
    }

    /// Execute a run with an already-constructed fetch strategy.
    ///
    /// This is the seam queue consumers and tests use to inject a strategy.
    pub async fn run_with_fetcher(
        &self,
        source: &SourceConfig,
        fetcher: Box<dyn FetchStrategy>,
        warning: Option<ScrapeFault>,
        cancel: &CancelFlag,
    ) -> RunSummary {
        let mut run = ScrapeRun::new(source.id.clone(), fetcher.kind());
        info!(source = %source.id, run = %run.id, strategy = fetcher.kind().as_str(), "starting scrape run");
        if let Some(fault) = warning {
            self.fault(&mut run, fault).await;
        }
        self.persist_run(&run).await;

        let status = match self
            .run_pages(source, fetcher.as_ref(), &mut run, cancel)
            .await
        {
            Ok(LoopEnd::Finished) => RunStatus::Completed,
            Ok(LoopEnd::Cancelled) => RunStatus::Cancelled,
            Ok(LoopEnd::FirstPageFailed) => RunStatus::Failed,
            Err(e) => {
                let fault = ScrapeFault::new(FaultKind::Other, format!("run aborted: {e}"));
                self.fault(&mut run, fault).await;
                RunStatus::Failed
            }
        };

        run.finalize(status);
        self.persist_run(&run).await;
        info!(
            source = %source.id,
            run = %run.id,
            status = run.status.as_str(),
            pages = run.pages_scraped,
            found = run.jobs_found,
            created = run.jobs_created,
            updated = run.jobs_updated,
            skipped = run.jobs_skipped,
            errors = run.error_count,
            "scrape run finished"
        );
        RunSummary::from(&run)
    }

    async fn run_pages(
        &self,
        source: &SourceConfig,
        fetcher: &dyn FetchStrategy,
        run: &mut ScrapeRun,
        cancel: &CancelFlag,
    ) -> anyhow::Result<LoopEnd> {
        let mut page_url = Some(source.base_url.clone());
        let mut page_number: u32 = 1;
        let mut pages_attempted: u32 = 0;
        let mut zero_yield_streak: u32 = 0;

        while let Some(url) = page_url.take() {
            if cancel.is_cancelled() {
                info!(source = %source.id, "cancellation requested, stopping between pages");
                return Ok(LoopEnd::Cancelled);
            }
            if pages_attempted >= source.pagination.max_pages {
                break;
            }
            pages_attempted += 1;

            match fetcher.fetch(&url).await {
                Ok(page) => {
                    run.requests_made += page.attempts;
                    run.total_response_ms += page.response_ms;
                    run.pages_scraped += 1;

                    let extracted = extract::parse_page(&page.html, source, &run.id, &url);
                    let valid = self.ingest_page(source, run, &url, extracted.listings).await?;

                    if valid == 0 {
                        zero_yield_streak += 1;
                        if zero_yield_streak >= MAX_ZERO_YIELD_PAGES {
                            info!(source = %source.id, "{MAX_ZERO_YIELD_PAGES} consecutive empty pages, stopping pagination");
                            break;
                        }
                    } else {
                        zero_yield_streak = 0;
                    }

                    page_number += 1;
                    page_url = next_page_url(source, extracted.next_url, page_number);
                }
                Err(e) => {
                    run.requests_made += e.attempts();
                    self.fault(run, e.to_fault()).await;

                    if run.pages_scraped == 0 {
                        warn!(source = %source.id, "first page fetch failed, failing run");
                        return Ok(LoopEnd::FirstPageFailed);
                    }

                    // Skip the page and keep walking where the next URL is
                    // still derivable (pattern pagination); next-link
                    // pagination has nothing to follow without the page.
                    zero_yield_streak += 1;
                    if zero_yield_streak >= MAX_ZERO_YIELD_PAGES {
                        break;
                    }
                    page_number += 1;
                    page_url = next_page_url(source, None, page_number);
                }
            }
        }

        Ok(LoopEnd::Finished)
    }

    /// Normalize, score, and reconcile one page of listings.
    /// Returns how many valid records the page yielded.
    async fn ingest_page(
        &self,
        source: &SourceConfig,
        run: &mut ScrapeRun,
        page_url: &str,
        listings: Vec<RawListing>,
    ) -> anyhow::Result<u32> {
        let mut valid: u32 = 0;

        for raw in listings {
            run.jobs_found += 1;
            match normalize::normalize(&raw) {
                Ok(mut posting) => {
                    posting.quality_score = quality::score(&posting);
                    if let Err(e) = self.audit.record_raw(&raw, &posting.content_hash).await {
                        warn!(source = %source.id, "failed to record raw listing: {e}");
                    }
                    match self.reconciler.ingest(posting).await? {
                        Outcome::Created => run.jobs_created += 1,
                        Outcome::Updated => run.jobs_updated += 1,
                        Outcome::Skipped => run.jobs_skipped += 1,
                    }
                    valid += 1;
                }
                Err(e) => {
                    run.jobs_skipped += 1;
                    self.fault(run, e.to_fault(page_url)).await;
                }
            }
        }
        Ok(valid)
    }

    /// Record a fault on the run and in the audit trail.
    async fn fault(&self, run: &mut ScrapeRun, fault: ScrapeFault) {
        if let Err(e) = self.audit.record_fault(&run.id, &fault).await {
            warn!(run = %run.id, "failed to record fault: {e}");
        }
        run.record_fault(fault);
    }

    /// Audit failures must not take the run down with them.
    async fn persist_run(&self, run: &ScrapeRun) {
        if let Err(e) = self.audit.record_run(run).await {
            warn!(run = %run.id, "failed to persist run record: {e}");
        }
    }
}

/// Next page URL: a `{page}` pattern when configured, else whatever link
/// extraction found on the current page.
fn next_page_url(
    source: &SourceConfig,
    extracted_next: Option<String>,
    next_number: u32,
) -> Option<String> {
    if let Some(pattern) = &source.pagination.url_pattern {
        if pattern.contains("{page}") {
            return Some(pattern.replace("{page}", &next_number.to_string()));
        }
    }
    extracted_next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_url_pattern_wins() {
        let mut source = SourceConfig::new("s1", "Source", "https://example.gov.in/jobs");
        source.pagination.url_pattern = Some("https://example.gov.in/jobs?page={page}".to_string());

        assert_eq!(
            next_page_url(&source, Some("https://example.gov.in/other".to_string()), 2),
            Some("https://example.gov.in/jobs?page=2".to_string())
        );
    }

    #[test]
    fn test_next_page_url_falls_back_to_extracted() {
        let source = SourceConfig::new("s1", "Source", "https://example.gov.in/jobs");
        assert_eq!(
            next_page_url(&source, Some("https://example.gov.in/jobs?page=2".to_string()), 2),
            Some("https://example.gov.in/jobs?page=2".to_string())
        );
        assert_eq!(next_page_url(&source, None, 2), None);
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
