//! Job listing models: raw extracted listings and normalized postings.
//!
//! Postings are deduplicated by a content hash over their key fields,
//! allowing detection of updates from source sites over time.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::quality::HIGH_QUALITY_THRESHOLD;

/// One listing container's field map as extracted from a page.
///
/// Exists between extraction and normalization; persisted to the audit
/// store keyed by `(source_id, content_hash)` once the hash is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    /// Run that extracted this listing.
    pub run_id: String,
    pub source_id: String,
    /// Page the listing was extracted from.
    pub page_url: String,
    /// Field name to raw extracted value.
    pub fields: HashMap<String, String>,
    pub extracted_at: DateTime<Utc>,
}

impl RawListing {
    pub fn new(
        run_id: impl Into<String>,
        source_id: impl Into<String>,
        page_url: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            source_id: source_id.into(),
            page_url: page_url.into(),
            fields: HashMap::new(),
            extracted_at: Utc::now(),
        }
    }

    /// Get a field's trimmed value, None when absent or blank.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// A normalized, typed job posting ready for the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    /// Unique identifier for this posting.
    pub id: String,
    /// Source that published the notice.
    pub source_id: String,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub total_posts: Option<u32>,
    pub qualification: Option<String>,
    pub notification_date: Option<NaiveDate>,
    /// Application deadline.
    pub last_date: Option<NaiveDate>,
    pub exam_date: Option<NaiveDate>,
    /// Application fee in rupees; 0.0 for fee-exempt notices.
    pub fee: Option<f64>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    /// Detected state or union territory.
    pub location: Option<String>,
    pub application_link: Option<String>,
    pub notification_pdf: Option<String>,
    /// Page the posting was extracted from.
    pub source_url: String,
    /// Dedup key over {title, description, last date, posts, qualification}.
    pub content_hash: String,
    /// Completeness score, 0-100.
    pub quality_score: u8,
    /// Bumped on every reconciled update.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobPosting {
    /// Advisory completeness flag; never blocks ingestion.
    pub fn is_high_quality(&self) -> bool {
        self.quality_score >= HIGH_QUALITY_THRESHOLD
    }

    /// Apply a newer scrape of the same posting (same dedup identity).
    ///
    /// Copies changed source-specific fields and bumps the version.
    /// Returns true if anything changed, false when the records are identical.
    pub fn apply_update(&mut self, newer: &JobPosting) -> bool {
        let changed = self.description != newer.description
            || self.department != newer.department
            || self.total_posts != newer.total_posts
            || self.qualification != newer.qualification
            || self.notification_date != newer.notification_date
            || self.last_date != newer.last_date
            || self.exam_date != newer.exam_date
            || self.fee != newer.fee
            || self.salary_min != newer.salary_min
            || self.salary_max != newer.salary_max
            || self.min_age != newer.min_age
            || self.max_age != newer.max_age
            || self.location != newer.location
            || self.application_link != newer.application_link
            || self.notification_pdf != newer.notification_pdf
            || self.quality_score != newer.quality_score;

        if !changed {
            return false;
        }

        self.description = newer.description.clone();
        self.department = newer.department.clone();
        self.total_posts = newer.total_posts;
        self.qualification = newer.qualification.clone();
        self.notification_date = newer.notification_date;
        self.last_date = newer.last_date;
        self.exam_date = newer.exam_date;
        self.fee = newer.fee;
        self.salary_min = newer.salary_min;
        self.salary_max = newer.salary_max;
        self.min_age = newer.min_age;
        self.max_age = newer.max_age;
        self.location = newer.location.clone();
        self.application_link = newer.application_link.clone();
        self.notification_pdf = newer.notification_pdf.clone();
        self.quality_score = newer.quality_score;
        self.version += 1;
        self.updated_at = Utc::now();
        true
    }
}
