//! Fee and numeric-range parsing.
//!
//! Notices express fees as "₹500", "Rs. 100/-", or words like "Nil", and
//! salary/age limits as ranges ("18 to 27 years", "Rs. 25500 - 81100"),
//! one-sided bounds ("maximum 30 years"), or single values. Range parsing
//! precedence: explicit range, then maximum-only, then minimum-only, then
//! single value.

use std::sync::LazyLock;

use regex::Regex;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:₹|rs\.?|inr)?\s*(\d[\d,]*(?:\.\d{1,2})?)").unwrap());
static RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*)\s*(?:-|–|—|to|and)\s*(\d[\d,]*)").unwrap());
static MAX_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:maximum|max\.?|up\s*to|not\s+exceeding|below)\s*:?\s*(\d[\d,]*)").unwrap()
});
static MIN_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:minimum|min\.?|at\s*least|above)\s*:?\s*(\d[\d,]*)").unwrap()
});
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d,]*").unwrap());

/// Words meaning the notice charges nothing.
const FEE_EXEMPT_WORDS: &[&str] = &["free", "nil", "exempt", "no fee", "not applicable"];

fn parse_number(text: &str) -> Option<u64> {
    text.replace(',', "").parse().ok()
}

/// Parse a fee amount. Exemption words mean zero; otherwise the first
/// monetary amount in the text wins.
pub fn parse_fee(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    if FEE_EXEMPT_WORDS.iter().any(|word| lower.contains(word)) {
        return Some(0.0);
    }
    AMOUNT
        .captures(&lower)
        .and_then(|caps| caps[1].replace(',', "").parse().ok())
}

/// Parse a salary or age expression into (min, max).
///
/// Precedence: explicit range, maximum-only, minimum-only, single value.
pub fn parse_int_range(text: &str) -> (Option<u64>, Option<u64>) {
    let lower = text.to_lowercase();

    if let Some(caps) = RANGE.captures(&lower) {
        let min = parse_number(&caps[1]);
        let max = parse_number(&caps[2]);
        if min.is_some() || max.is_some() {
            return (min, max);
        }
    }
    if let Some(caps) = MAX_ONLY.captures(&lower) {
        if let Some(max) = parse_number(&caps[1]) {
            return (None, Some(max));
        }
    }
    if let Some(caps) = MIN_ONLY.captures(&lower) {
        if let Some(min) = parse_number(&caps[1]) {
            return (Some(min), None);
        }
    }
    if let Some(m) = NUMBER.find(&lower) {
        if let Some(value) = parse_number(m.as_str()) {
            return (Some(value), Some(value));
        }
    }
    (None, None)
}

/// First integer in the text, e.g. a total-posts count.
pub fn parse_count(text: &str) -> Option<u32> {
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_exempt_words() {
        assert_eq!(parse_fee("Nil"), Some(0.0));
        assert_eq!(parse_fee("FREE for all categories"), Some(0.0));
        assert_eq!(parse_fee("Exempt"), Some(0.0));
    }

    #[test]
    fn test_fee_amounts() {
        assert_eq!(parse_fee("₹500"), Some(500.0));
        assert_eq!(parse_fee("Rs. 100/-"), Some(100.0));
        assert_eq!(parse_fee("INR 1,200.50"), Some(1200.5));
        assert_eq!(parse_fee("fee not announced"), None);
    }

    #[test]
    fn test_range_expressions() {
        assert_eq!(parse_int_range("18 to 27 years"), (Some(18), Some(27)));
        assert_eq!(parse_int_range("between 18 and 27"), (Some(18), Some(27)));
        assert_eq!(parse_int_range("from 21 to 30 years"), (Some(21), Some(30)));
        assert_eq!(
            parse_int_range("Rs. 25,500 - 81,100"),
            (Some(25500), Some(81100))
        );
    }

    #[test]
    fn test_one_sided_bounds() {
        assert_eq!(parse_int_range("maximum 30 years"), (None, Some(30)));
        assert_eq!(parse_int_range("Max. 35"), (None, Some(35)));
        assert_eq!(parse_int_range("up to 40 years"), (None, Some(40)));
        assert_eq!(parse_int_range("minimum 18 years"), (Some(18), None));
        assert_eq!(parse_int_range("at least 21"), (Some(21), None));
    }

    #[test]
    fn test_single_value() {
        assert_eq!(parse_int_range("56100"), (Some(56100), Some(56100)));
        assert_eq!(parse_int_range("no numbers"), (None, None));
    }

    #[test]
    fn test_range_beats_one_sided_wording() {
        // Both a range and the word "maximum" present: the range wins
        assert_eq!(
            parse_int_range("18 to 27 years, maximum 30 for reserved"),
            (Some(18), Some(27))
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("120 Posts"), Some(120));
        assert_eq!(parse_count("Total: 1,493"), Some(1493));
        assert_eq!(parse_count("various"), None);
    }
}
