//! Text cleanup, department expansion, and state detection.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Strip markup, decode common entities, and collapse whitespace.
pub fn clean_text(input: &str) -> String {
    let without_tags = TAG_RE.replace_all(input, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recruiting bodies commonly abbreviated in notices.
const DEPARTMENT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("UPSC", "Union Public Service Commission"),
    ("SSC", "Staff Selection Commission"),
    ("RRB", "Railway Recruitment Board"),
    ("IBPS", "Institute of Banking Personnel Selection"),
    ("DRDO", "Defence Research and Development Organisation"),
    ("ISRO", "Indian Space Research Organisation"),
    ("ESIC", "Employees' State Insurance Corporation"),
    ("AIIMS", "All India Institute of Medical Sciences"),
    ("DSSSB", "Delhi Subordinate Services Selection Board"),
    ("BPSC", "Bihar Public Service Commission"),
    ("MPSC", "Maharashtra Public Service Commission"),
    ("KPSC", "Karnataka Public Service Commission"),
    ("TNPSC", "Tamil Nadu Public Service Commission"),
    ("UPPSC", "Uttar Pradesh Public Service Commission"),
    ("PWD", "Public Works Department"),
];

/// Expand a known department abbreviation; anything else passes through.
pub fn expand_department(name: &str) -> String {
    let token = name.trim();
    let upper = token.to_uppercase();
    for (abbr, full) in DEPARTMENT_ABBREVIATIONS {
        if upper == *abbr {
            return (*full).to_string();
        }
    }
    token.to_string()
}

/// Indian states and union territories, canonical names.
const INDIAN_STATES: &[&str] = &[
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
    "Andaman and Nicobar Islands",
    "Chandigarh",
    "Dadra and Nagar Haveli and Daman and Diu",
    "Delhi",
    "Jammu and Kashmir",
    "Ladakh",
    "Lakshadweep",
    "Puducherry",
];

/// Detect a state or union territory by substring match.
pub fn detect_state(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    INDIAN_STATES
        .iter()
        .find(|state| lower.contains(&state.to_lowercase()))
        .map(|state| (*state).to_string())
}
