//! Raw listing to typed posting transformation.
//!
//! Pure, no I/O. Cleans text, parses dates/amounts/ranges, detects the
//! state, computes the dedup content hash, and validates the required
//! fields. Rejected listings never reach the reconciler.

mod amounts;
mod dates;
mod text;

pub use amounts::{parse_count, parse_fee, parse_int_range};
pub use dates::parse_date;
pub use text::{clean_text, detect_state, expand_department};

use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{FaultKind, JobPosting, RawListing, ScrapeFault};

/// Minimum cleaned title length for a valid posting.
pub const MIN_TITLE_LEN: usize = 10;

/// Validation failures that drop a listing.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("listing has no usable title")]
    MissingTitle,
    #[error("title too short after cleaning: {0:?}")]
    TitleTooShort(String),
    #[error("listing has no source URL")]
    MissingUrl,
    #[error("source URL is not http(s): {0:?}")]
    InvalidUrl(String),
}

impl NormalizeError {
    /// Convert into an audit fault row.
    pub fn to_fault(&self, page_url: &str) -> ScrapeFault {
        ScrapeFault::new(FaultKind::Validation, self.to_string()).with_url(page_url)
    }
}

/// Normalize one raw listing into a typed posting.
///
/// The returned posting carries a zero quality score; scoring is a separate
/// step so the two stay independently testable.
pub fn normalize(raw: &RawListing) -> Result<JobPosting, NormalizeError> {
    let title = clean_text(raw.get("title").unwrap_or_default());
    if title.is_empty() {
        return Err(NormalizeError::MissingTitle);
    }
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(NormalizeError::TitleTooShort(title));
    }
    let source_url = normalize_url(&raw.page_url)?;

    let description = cleaned(raw, "description");
    let department = raw
        .get("department")
        .map(clean_text)
        .map(|d| expand_department(&d));
    let total_posts = raw.get("posts").and_then(parse_count);
    let qualification = cleaned(raw, "qualification");
    let notification_date = parsed_date(raw, "notification_date");
    let last_date = parsed_date(raw, "last_date");
    let exam_date = parsed_date(raw, "exam_date");
    let fee = raw.get("fee").and_then(parse_fee);

    let (salary_min, salary_max) = raw
        .get("salary")
        .map(parse_int_range)
        .unwrap_or((None, None));
    let (age_min, age_max) = raw
        .get("age_limit")
        .map(parse_int_range)
        .unwrap_or((None, None));

    let location = raw
        .get("location")
        .and_then(|v| detect_state(v))
        .or_else(|| description.as_deref().and_then(detect_state));

    let content_hash = content_hash(
        &title,
        description.as_deref(),
        last_date,
        total_posts,
        qualification.as_deref(),
    );

    let now = Utc::now();
    Ok(JobPosting {
        id: uuid::Uuid::new_v4().to_string(),
        source_id: raw.source_id.clone(),
        title,
        description,
        department,
        total_posts,
        qualification,
        notification_date,
        last_date,
        exam_date,
        fee,
        salary_min,
        salary_max,
        min_age: age_min.and_then(|v| u32::try_from(v).ok()),
        max_age: age_max.and_then(|v| u32::try_from(v).ok()),
        location,
        application_link: raw.get("application_link").map(str::to_string),
        notification_pdf: raw.get("notification_pdf").map(str::to_string),
        source_url,
        content_hash,
        quality_score: 0,
        version: 1,
        created_at: now,
        updated_at: now,
    })
}

fn cleaned(raw: &RawListing, field: &str) -> Option<String> {
    raw.get(field).map(clean_text).filter(|v| !v.is_empty())
}

fn parsed_date(raw: &RawListing, field: &str) -> Option<NaiveDate> {
    raw.get(field).and_then(parse_date)
}

/// Best-effort URL normalization; rejects anything that is not http(s).
fn normalize_url(url: &str) -> Result<String, NormalizeError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::MissingUrl);
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }
    if trimmed.starts_with("www.") {
        return Ok(format!("https://{trimmed}"));
    }
    Err(NormalizeError::InvalidUrl(trimmed.to_string()))
}

/// Dedup key: truncated SHA-256 over the five key fields, lower-cased, in a
/// fixed order. Records identical in these fields always hash identically.
pub fn content_hash(
    title: &str,
    description: Option<&str>,
    last_date: Option<NaiveDate>,
    total_posts: Option<u32>,
    qualification: Option<&str>,
) -> String {
    let key = format!(
        "{}\n{}\n{}\n{}\n{}",
        title.to_lowercase(),
        description.unwrap_or_default().to_lowercase(),
        last_date.map(|d| d.to_string()).unwrap_or_default(),
        total_posts.map(|p| p.to_string()).unwrap_or_default(),
        qualification.unwrap_or_default().to_lowercase(),
    );
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with(fields: &[(&str, &str)]) -> RawListing {
        let mut raw = RawListing::new("run1", "s1", "https://example.gov.in/jobs");
        for (k, v) in fields {
            raw.fields.insert((*k).to_string(), (*v).to_string());
        }
        raw
    }

    #[test]
    fn test_normalize_full_listing() {
        let raw = raw_with(&[
            ("title", "Junior Engineer Recruitment 2026"),
            ("description", "120 posts of <b>Junior Engineer</b> in PWD"),
            ("department", "PWD"),
            ("posts", "120 Posts"),
            ("qualification", "B.E. / B.Tech in Civil Engineering"),
            ("last_date", "31/10/2026"),
            ("fee", "₹500"),
            ("salary", "Rs. 25,500 - 81,100"),
            ("age_limit", "18 to 27 years"),
            ("location", "Lucknow, Uttar Pradesh"),
        ]);

        let posting = normalize(&raw).unwrap();
        assert_eq!(posting.title, "Junior Engineer Recruitment 2026");
        assert_eq!(
            posting.description.as_deref(),
            Some("120 posts of Junior Engineer in PWD")
        );
        assert_eq!(posting.department.as_deref(), Some("Public Works Department"));
        assert_eq!(posting.total_posts, Some(120));
        assert_eq!(
            posting.last_date,
            NaiveDate::from_ymd_opt(2026, 10, 31)
        );
        assert_eq!(posting.fee, Some(500.0));
        assert_eq!(posting.salary_min, Some(25500));
        assert_eq!(posting.salary_max, Some(81100));
        assert_eq!(posting.min_age, Some(18));
        assert_eq!(posting.max_age, Some(27));
        assert_eq!(posting.location.as_deref(), Some("Uttar Pradesh"));
        assert_eq!(posting.version, 1);
        assert!(!posting.content_hash.is_empty());
    }

    #[test]
    fn test_rejects_missing_or_short_title() {
        let raw = raw_with(&[("description", "something")]);
        assert!(matches!(
            normalize(&raw),
            Err(NormalizeError::MissingTitle)
        ));

        let raw = raw_with(&[("title", "Clerk")]);
        assert!(matches!(
            normalize(&raw),
            Err(NormalizeError::TitleTooShort(_))
        ));
    }

    #[test]
    fn test_rejects_bad_source_url() {
        let mut raw = raw_with(&[("title", "Junior Engineer Recruitment 2026")]);
        raw.page_url = "ftp://example.gov.in".to_string();
        assert!(matches!(normalize(&raw), Err(NormalizeError::InvalidUrl(_))));

        raw.page_url = "  ".to_string();
        assert!(matches!(normalize(&raw), Err(NormalizeError::MissingUrl)));
    }

    #[test]
    fn test_scheme_added_for_www() {
        let mut raw = raw_with(&[("title", "Junior Engineer Recruitment 2026")]);
        raw.page_url = "www.example.gov.in/jobs".to_string();
        let posting = normalize(&raw).unwrap();
        assert_eq!(posting.source_url, "https://www.example.gov.in/jobs");
    }

    #[test]
    fn test_content_hash_case_insensitive_key_fields() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 31);
        let a = content_hash("Junior Engineer", Some("PWD Posts"), date, Some(120), Some("B.E."));
        let b = content_hash("JUNIOR ENGINEER", Some("pwd posts"), date, Some(120), Some("b.e."));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_content_hash_ignores_other_fields() {
        let raw1 = raw_with(&[
            ("title", "Junior Engineer Recruitment 2026"),
            ("fee", "₹500"),
        ]);
        let raw2 = raw_with(&[
            ("title", "Junior Engineer Recruitment 2026"),
            ("fee", "Nil"),
            ("location", "Kerala"),
        ]);
        let p1 = normalize(&raw1).unwrap();
        let p2 = normalize(&raw2).unwrap();
        assert_eq!(p1.content_hash, p2.content_hash);
    }

    #[test]
    fn test_content_hash_changes_with_key_field() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 31);
        let a = content_hash("Junior Engineer", None, date, Some(120), None);
        let b = content_hash("Junior Engineer", None, date, Some(121), None);
        assert_ne!(a, b);
    }
}
