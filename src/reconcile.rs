//! Create/update/skip reconciliation against the job store.
//!
//! Dedup is source-scoped on the content hash: the same posting mirrored by
//! two sources is two independent records by design. Ingestion serializes
//! on `(source_id, content_hash)` so overlapping runs of one source cannot
//! lose updates.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::models::JobPosting;
use crate::store::JobStore;

/// What the reconciler decided for one posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// Reconciles freshly normalized postings with previously stored ones.
pub struct Reconciler {
    store: Arc<dyn JobStore>,
    // Lock scope is exactly (source_id, content_hash)
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, source_id: &str, content_hash: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry((source_id.to_string(), content_hash.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Decide create/update/skip for one posting and apply it.
    ///
    /// Idempotent: ingesting an identical posting again is a skip.
    pub async fn ingest(&self, posting: JobPosting) -> anyhow::Result<Outcome> {
        let key_lock = self
            .lock_for(&posting.source_id, &posting.content_hash)
            .await;
        let _guard = key_lock.lock().await;

        match self
            .store
            .find_by_hash(&posting.source_id, &posting.content_hash)
            .await?
        {
            None => {
                self.store.create(&posting).await?;
                debug!(source = %posting.source_id, hash = %posting.content_hash, "created posting");
                Ok(Outcome::Created)
            }
            Some(mut existing) => {
                if existing.apply_update(&posting) {
                    self.store.update(&existing).await?;
                    debug!(source = %posting.source_id, hash = %posting.content_hash, version = existing.version, "updated posting");
                    Ok(Outcome::Updated)
                } else {
                    Ok(Outcome::Skipped)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryJobStore;
    use chrono::Utc;

    fn posting(hash: &str, fee: Option<f64>) -> JobPosting {
        let now = Utc::now();
        JobPosting {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: "s1".to_string(),
            title: "Junior Engineer Recruitment".to_string(),
            description: None,
            department: None,
            total_posts: None,
            qualification: None,
            notification_date: None,
            last_date: None,
            exam_date: None,
            fee,
            salary_min: None,
            salary_max: None,
            min_age: None,
            max_age: None,
            location: None,
            application_link: None,
            notification_pdf: None,
            source_url: "https://example.gov.in".to_string(),
            content_hash: hash.to_string(),
            quality_score: 20,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_then_skip() {
        let store = Arc::new(MemoryJobStore::new());
        let reconciler = Reconciler::new(store.clone());

        assert_eq!(
            reconciler.ingest(posting("h1", Some(500.0))).await.unwrap(),
            Outcome::Created
        );
        assert_eq!(
            reconciler.ingest(posting("h1", Some(500.0))).await.unwrap(),
            Outcome::Skipped
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_on_changed_fields() {
        let store = Arc::new(MemoryJobStore::new());
        let reconciler = Reconciler::new(store.clone());

        reconciler.ingest(posting("h1", Some(500.0))).await.unwrap();
        assert_eq!(
            reconciler.ingest(posting("h1", Some(250.0))).await.unwrap(),
            Outcome::Updated
        );

        let stored = store.find_by_hash("s1", "h1").await.unwrap().unwrap();
        assert_eq!(stored.fee, Some(250.0));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_idempotent_batch() {
        let store = Arc::new(MemoryJobStore::new());
        let reconciler = Reconciler::new(store.clone());

        let batch: Vec<_> = (0..5)
            .map(|i| posting(&format!("h{i}"), Some(100.0)))
            .collect();

        for p in batch.clone() {
            assert_eq!(reconciler.ingest(p).await.unwrap(), Outcome::Created);
        }
        // Second pass with the same set is all skips
        for p in batch {
            assert_eq!(reconciler.ingest(p).await.unwrap(), Outcome::Skipped);
        }
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn test_concurrent_ingest_same_key_is_serialized() {
        let store = Arc::new(MemoryJobStore::new());
        let reconciler = Arc::new(Reconciler::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let reconciler = reconciler.clone();
            handles.push(tokio::spawn(async move {
                reconciler.ingest(posting("h1", Some(500.0))).await.unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() == Outcome::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.len().await, 1);
    }
}
