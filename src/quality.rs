//! Posting completeness scoring.
//!
//! Weighted-field score in [0, 100]. A text field counts only when its
//! trimmed value is longer than three characters; typed fields count when
//! present. Extra fields outside the weighted set earn capped bonus points.

use crate::models::JobPosting;

/// Score at or above which a posting is considered high quality.
pub const HIGH_QUALITY_THRESHOLD: u8 = 70;

/// Minimum useful length for a text field.
const MIN_FIELD_LEN: usize = 3;

/// Bonus per extra non-empty field, and the bonus cap.
const BONUS_PER_FIELD: u32 = 2;
const BONUS_CAP: u32 = 10;

fn counts(text: &str) -> bool {
    text.trim().chars().count() > MIN_FIELD_LEN
}

fn opt_counts(text: &Option<String>) -> bool {
    text.as_deref().is_some_and(counts)
}

/// Score a posting's completeness.
pub fn score(posting: &JobPosting) -> u8 {
    let mut total = 0u32;

    if counts(&posting.title) {
        total += 20;
    }
    if opt_counts(&posting.description) {
        total += 15;
    }
    if posting.last_date.is_some() {
        total += 15;
    }
    if posting.notification_date.is_some() {
        total += 10;
    }
    if posting.total_posts.is_some() {
        total += 10;
    }
    if opt_counts(&posting.qualification) {
        total += 10;
    }
    if posting.salary_min.is_some() || posting.salary_max.is_some() {
        total += 8;
    }
    if posting.min_age.is_some() || posting.max_age.is_some() {
        total += 7;
    }
    if opt_counts(&posting.department) {
        total += 5;
    }

    let extras = [
        posting.exam_date.is_some(),
        posting.fee.is_some(),
        posting.location.is_some(),
        posting.application_link.is_some(),
        posting.notification_pdf.is_some(),
    ];
    let bonus = extras.iter().filter(|present| **present).count() as u32 * BONUS_PER_FIELD;
    total += bonus.min(BONUS_CAP);

    total.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn empty_posting() -> JobPosting {
        let now = Utc::now();
        JobPosting {
            id: "p1".to_string(),
            source_id: "s1".to_string(),
            title: String::new(),
            description: None,
            department: None,
            total_posts: None,
            qualification: None,
            notification_date: None,
            last_date: None,
            exam_date: None,
            fee: None,
            salary_min: None,
            salary_max: None,
            min_age: None,
            max_age: None,
            location: None,
            application_link: None,
            notification_pdf: None,
            source_url: "https://example.gov.in".to_string(),
            content_hash: "hash".to_string(),
            quality_score: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_posting_scores_zero() {
        assert_eq!(score(&empty_posting()), 0);
    }

    #[test]
    fn test_short_text_does_not_count() {
        let mut posting = empty_posting();
        posting.title = "JE".to_string();
        assert_eq!(score(&posting), 0);
        posting.title = "Junior Engineer".to_string();
        assert_eq!(score(&posting), 20);
    }

    #[test]
    fn test_monotonic_as_fields_fill_in() {
        let mut posting = empty_posting();
        let mut last = score(&posting);

        posting.title = "Junior Engineer Recruitment".to_string();
        let s = score(&posting);
        assert!(s >= last);
        last = s;

        posting.description = Some("120 posts of Junior Engineer".to_string());
        let s = score(&posting);
        assert!(s >= last);
        last = s;

        posting.last_date = NaiveDate::from_ymd_opt(2026, 10, 31);
        let s = score(&posting);
        assert!(s >= last);
        last = s;

        posting.total_posts = Some(120);
        posting.qualification = Some("B.E. Civil".to_string());
        posting.salary_min = Some(25500);
        posting.min_age = Some(18);
        posting.department = Some("Public Works Department".to_string());
        posting.notification_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        let s = score(&posting);
        assert!(s >= last);
    }

    #[test]
    fn test_full_posting_hits_ceiling() {
        let mut posting = empty_posting();
        posting.title = "Junior Engineer Recruitment 2026".to_string();
        posting.description = Some("120 posts of Junior Engineer".to_string());
        posting.last_date = NaiveDate::from_ymd_opt(2026, 10, 31);
        posting.notification_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        posting.total_posts = Some(120);
        posting.qualification = Some("B.E. Civil Engineering".to_string());
        posting.salary_min = Some(25500);
        posting.salary_max = Some(81100);
        posting.min_age = Some(18);
        posting.max_age = Some(27);
        posting.department = Some("Public Works Department".to_string());
        posting.exam_date = NaiveDate::from_ymd_opt(2026, 12, 15);
        posting.fee = Some(500.0);
        posting.location = Some("Uttar Pradesh".to_string());
        posting.application_link = Some("https://example.gov.in/apply".to_string());
        posting.notification_pdf = Some("https://example.gov.in/notice.pdf".to_string());

        let s = score(&posting);
        assert_eq!(s, 100);
        assert!(posting_quality(&posting, s));
    }

    fn posting_quality(posting: &JobPosting, s: u8) -> bool {
        let mut p = posting.clone();
        p.quality_score = s;
        p.is_high_quality()
    }

    #[test]
    fn test_bonus_capped() {
        let mut posting = empty_posting();
        // Only bonus fields present: 5 extras * 2 = 10, capped at 10
        posting.exam_date = NaiveDate::from_ymd_opt(2026, 12, 15);
        posting.fee = Some(0.0);
        posting.location = Some("Kerala".to_string());
        posting.application_link = Some("https://example.gov.in/apply".to_string());
        posting.notification_pdf = Some("https://example.gov.in/notice.pdf".to_string());
        assert_eq!(score(&posting), 10);
    }

    #[test]
    fn test_score_bounded() {
        let posting = empty_posting();
        let s = score(&posting);
        assert!(s <= 100);
    }
}
