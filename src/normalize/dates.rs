//! Date parsing for the formats government notices actually use.
//!
//! Four pattern families tried in order; the first that yields a valid
//! calendar date wins:
//! 1. `DD/MM/YYYY` (also `-` and `.` separators)
//! 2. `YYYY/MM/DD`
//! 3. `DD Month YYYY`
//! 4. `Month DD, YYYY`

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s*[./-]\s*(\d{1,2})\s*[./-]\s*(\d{4})\b").unwrap());
static YMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\s*[./-]\s*(\d{1,2})\s*[./-]\s*(\d{1,2})\b").unwrap());
static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)?\s+([A-Za-z]+),?\s+(\d{4})\b").unwrap()
});
static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?\s*,?\s+(\d{4})\b").unwrap()
});

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse a date out of free text. Deterministic: the same input always
/// produces the same calendar date regardless of surrounding noise.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DMY.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    if let Some(caps) = YMD.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        if let Some(month) = month_number(&caps[2]) {
            let day: u32 = caps[1].parse().ok()?;
            let year: i32 = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }
    if let Some(caps) = MONTH_DAY_YEAR.captures(text) {
        if let Some(month) = month_number(&caps[1]) {
            let day: u32 = caps[2].parse().ok()?;
            let year: i32 = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dmy_separators() {
        assert_eq!(parse_date("31/10/2026"), Some(date(2026, 10, 31)));
        assert_eq!(parse_date("31-10-2026"), Some(date(2026, 10, 31)));
        assert_eq!(parse_date("31.10.2026"), Some(date(2026, 10, 31)));
        assert_eq!(parse_date("Last date: 05/01/2027"), Some(date(2027, 1, 5)));
    }

    #[test]
    fn test_ymd() {
        assert_eq!(parse_date("2026/10/31"), Some(date(2026, 10, 31)));
        assert_eq!(parse_date("2026-10-31"), Some(date(2026, 10, 31)));
    }

    #[test]
    fn test_day_month_name_year() {
        assert_eq!(parse_date("31 October 2026"), Some(date(2026, 10, 31)));
        assert_eq!(parse_date("3rd Mar 2026"), Some(date(2026, 3, 3)));
        assert_eq!(parse_date("1st January, 2027"), Some(date(2027, 1, 1)));
    }

    #[test]
    fn test_month_name_day_year() {
        assert_eq!(parse_date("October 31, 2026"), Some(date(2026, 10, 31)));
        assert_eq!(parse_date("Mar 3 2026"), Some(date(2026, 3, 3)));
    }

    #[test]
    fn test_same_calendar_date_across_formats() {
        let expected = Some(date(2026, 10, 31));
        for text in ["31/10/2026", "2026-10-31", "31 October 2026", "October 31, 2026"] {
            assert_eq!(parse_date(text), expected, "format {text:?}");
        }
    }

    #[test]
    fn test_invalid_dates_rejected() {
        assert_eq!(parse_date("32/13/2026"), None);
        assert_eq!(parse_date("no date here"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_deterministic() {
        let text = "apply before 15 August 2026 positively";
        assert_eq!(parse_date(text), parse_date(text));
    }
}
