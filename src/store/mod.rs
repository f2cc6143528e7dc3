//! Collaborator traits and in-memory implementations.
//!
//! The pipeline talks to three external collaborators: the source registry,
//! the job store, and the scrape-run audit trail. Each is a trait so the
//! relational backends live outside this crate; the in-memory versions here
//! back the CLI and the test suite.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{JobPosting, RawListing, ScrapeFault, ScrapeRun, SourceConfig};

/// Supplies source configurations and records when each was last scraped.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<SourceConfig>>;

    async fn get(&self, id: &str) -> anyhow::Result<Option<SourceConfig>>;

    async fn mark_scraped(&self, id: &str, at: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Downstream store for normalized postings.
///
/// Implementations must enforce `(source_id, content_hash)` uniqueness;
/// the reconciler's dedup depends on it.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_by_hash(
        &self,
        source_id: &str,
        content_hash: &str,
    ) -> anyhow::Result<Option<JobPosting>>;

    async fn create(&self, posting: &JobPosting) -> anyhow::Result<()>;

    async fn update(&self, posting: &JobPosting) -> anyhow::Result<()>;
}

/// Observability trail: runs, raw listings, faults. Retention is external.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Upsert a run record by id.
    async fn record_run(&self, run: &ScrapeRun) -> anyhow::Result<()>;

    /// Persist a raw listing keyed by `(source_id, content_hash)`.
    /// Returns false when that content was already recorded.
    async fn record_raw(&self, listing: &RawListing, content_hash: &str) -> anyhow::Result<bool>;

    async fn record_fault(&self, run_id: &str, fault: &ScrapeFault) -> anyhow::Result<()>;
}

/// In-memory source registry, loadable from a directory of JSON files.
#[derive(Debug, Default)]
pub struct MemorySourceRegistry {
    sources: RwLock<HashMap<String, SourceConfig>>,
}

impl MemorySourceRegistry {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self {
            sources: RwLock::new(sources.into_iter().map(|s| (s.id.clone(), s)).collect()),
        }
    }

    /// Load every `*.json` source definition in a directory.
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut sources = Vec::new();
        if dir.is_dir() {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    let data = std::fs::read_to_string(&path)?;
                    let source: SourceConfig = serde_json::from_str(&data)
                        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
                    debug!(source = %source.id, "loaded source definition");
                    sources.push(source);
                }
            }
        }
        Ok(Self::new(sources))
    }
}

#[async_trait]
impl SourceRegistry for MemorySourceRegistry {
    async fn list(&self) -> anyhow::Result<Vec<SourceConfig>> {
        let sources = self.sources.read().await;
        let mut list: Vec<_> = sources.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<SourceConfig>> {
        Ok(self.sources.read().await.get(id).cloned())
    }

    async fn mark_scraped(&self, id: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut sources = self.sources.write().await;
        if let Some(source) = sources.get_mut(id) {
            source.last_scraped = Some(at);
        }
        Ok(())
    }
}

/// In-memory job store keyed by `(source_id, content_hash)`.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    postings: RwLock<HashMap<(String, String), JobPosting>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.postings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.postings.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<JobPosting> {
        self.postings.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_by_hash(
        &self,
        source_id: &str,
        content_hash: &str,
    ) -> anyhow::Result<Option<JobPosting>> {
        let postings = self.postings.read().await;
        Ok(postings
            .get(&(source_id.to_string(), content_hash.to_string()))
            .cloned())
    }

    async fn create(&self, posting: &JobPosting) -> anyhow::Result<()> {
        let mut postings = self.postings.write().await;
        let key = (posting.source_id.clone(), posting.content_hash.clone());
        if postings.contains_key(&key) {
            anyhow::bail!(
                "posting already exists for ({}, {})",
                posting.source_id,
                posting.content_hash
            );
        }
        postings.insert(key, posting.clone());
        Ok(())
    }

    async fn update(&self, posting: &JobPosting) -> anyhow::Result<()> {
        let mut postings = self.postings.write().await;
        let key = (posting.source_id.clone(), posting.content_hash.clone());
        match postings.get_mut(&key) {
            Some(stored) => {
                *stored = posting.clone();
                Ok(())
            }
            None => anyhow::bail!(
                "no posting to update for ({}, {})",
                posting.source_id,
                posting.content_hash
            ),
        }
    }
}

/// In-memory audit trail.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    runs: RwLock<HashMap<String, ScrapeRun>>,
    raw: RwLock<HashMap<(String, String), RawListing>>,
    faults: RwLock<Vec<(String, ScrapeFault)>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run(&self, run_id: &str) -> Option<ScrapeRun> {
        self.runs.read().await.get(run_id).cloned()
    }

    pub async fn raw_count(&self) -> usize {
        self.raw.read().await.len()
    }

    pub async fn fault_count(&self) -> usize {
        self.faults.read().await.len()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn record_run(&self, run: &ScrapeRun) -> anyhow::Result<()> {
        self.runs.write().await.insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn record_raw(&self, listing: &RawListing, content_hash: &str) -> anyhow::Result<bool> {
        let mut raw = self.raw.write().await;
        let key = (listing.source_id.clone(), content_hash.to_string());
        if raw.contains_key(&key) {
            return Ok(false);
        }
        raw.insert(key, listing.clone());
        Ok(true)
    }

    async fn record_fault(&self, run_id: &str, fault: &ScrapeFault) -> anyhow::Result<()> {
        self.faults
            .write()
            .await
            .push((run_id.to_string(), fault.clone()));
        Ok(())
    }
}

/// Convenience bundle of in-memory stores for the CLI and tests.
pub fn memory_stores() -> (Arc<MemoryJobStore>, Arc<MemoryAuditStore>) {
    (Arc::new(MemoryJobStore::new()), Arc::new(MemoryAuditStore::new()))
}
