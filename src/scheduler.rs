//! Scheduler gate and queue-facing entry points.
//!
//! A source is due when it is enabled and its frequency window has elapsed
//! since the last run (or it has never run). The entry points here are
//! plain async functions so any task queue can call them directly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::engine::{CancelFlag, ScrapeEngine};
use crate::models::{RunSummary, SourceConfig};
use crate::store::SourceRegistry;

/// Default concurrent runs for `scrape_all_due`.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Sources that should be scraped now.
pub async fn due_sources(
    registry: &dyn SourceRegistry,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<SourceConfig>> {
    Ok(registry
        .list()
        .await?
        .into_iter()
        .filter(|source| source.is_due(now))
        .collect())
}

/// Scrape one source by id.
pub async fn scrape_source(
    engine: &ScrapeEngine,
    registry: &dyn SourceRegistry,
    source_id: &str,
    cancel: &CancelFlag,
) -> anyhow::Result<RunSummary> {
    let source = registry
        .get(source_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("unknown source: {source_id}"))?;

    let summary = engine.run(&source, cancel).await;
    if let Err(e) = registry.mark_scraped(source_id, Utc::now()).await {
        warn!(source = source_id, "failed to record scrape time: {e}");
    }
    Ok(summary)
}

/// Scrape every due source through a bounded worker pool.
pub async fn scrape_all_due(
    engine: Arc<ScrapeEngine>,
    registry: Arc<dyn SourceRegistry>,
    workers: usize,
    cancel: CancelFlag,
) -> anyhow::Result<Vec<RunSummary>> {
    let due = due_sources(registry.as_ref(), Utc::now()).await?;
    info!(count = due.len(), "scraping due sources");

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(due.len());

    for source in due {
        let engine = engine.clone();
        let registry = registry.clone();
        let cancel = cancel.clone();
        let semaphore = semaphore.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| anyhow::anyhow!("worker pool closed: {e}"))?;
            let summary = engine.run(&source, &cancel).await;
            if let Err(e) = registry.mark_scraped(&source.id, Utc::now()).await {
                warn!(source = %source.id, "failed to record scrape time: {e}");
            }
            Ok::<RunSummary, anyhow::Error>(summary)
        }));
    }

    let mut summaries = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(e)) => warn!("scrape worker failed: {e}"),
            Err(e) => warn!("scrape worker panicked: {e}"),
        }
    }
    Ok(summaries)
}
