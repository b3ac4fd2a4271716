//! Regex heuristics for pulling candidate identity fields out of resume text.
//!
//! Extraction is inherently lossy: every function returns `Option`, and the
//! pipeline treats "no email found" as a first-class failure outcome for the
//! file, never as an exception. Email is the dedup/creation key.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered email patterns; the first surviving match wins.
static EMAIL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
        Regex::new(r#"mailto:([^\s"<>]+@[^\s"<>]+)"#).unwrap(),
    ]
});

/// Ordered phone patterns: international prefix, separator-grouped, bare
/// 10-digit.
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\+\d{1,3}[-.\s]?\(?\d{1,4}\)?(?:[-.\s]?\d{2,4}){2,3}").unwrap(),
        Regex::new(r"\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}").unwrap(),
        Regex::new(r"\b\d{10}\b").unwrap(),
    ]
});

/// A line of 2-4 capitalized words, no digits.
static NAME_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z'.-]*(?:\s+[A-Z][A-Za-z'.-]*){1,3}$").unwrap());

/// Placeholder domains that appear in resume templates.
const BLOCKED_DOMAINS: &[&str] = &[
    "example.com",
    "test.com",
    "email.com",
    "domain.com",
    "sample.com",
];

/// Header tokens that disqualify a line from being a name.
const HEADER_TOKENS: &[&str] = &["resume", "curriculum", "vitae", "cv"];

/// Scans the first 5 non-empty lines for a capitalized 2-4 word line,
/// skipping document-header lines.
pub fn extract_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(5)
        .find(|line| !is_header_line(line) && NAME_LINE.is_match(line))
        .map(|line| line.to_string())
}

/// Returns the first email match not on the placeholder-domain blocklist,
/// lower-cased. Text is whitespace-normalized first so addresses split
/// across layout artifacts still match.
pub fn extract_email(text: &str) -> Option<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    for pattern in EMAIL_PATTERNS.iter() {
        for captures in pattern.captures_iter(&normalized) {
            let matched = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_lowercase())?;
            if !is_blocked_domain(&matched) {
                return Some(matched);
            }
        }
    }
    None
}

/// Returns the first phone match with all non-digit characters stripped.
pub fn extract_phone(text: &str) -> Option<String> {
    for pattern in PHONE_PATTERNS.iter() {
        if let Some(m) = pattern.find(text) {
            let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
            return Some(digits);
        }
    }
    None
}

fn is_header_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower
        .split_whitespace()
        .any(|token| HEADER_TOKENS.contains(&token))
}

fn is_blocked_domain(email: &str) -> bool {
    email
        .rsplit('@')
        .next()
        .map(|domain| BLOCKED_DOMAINS.contains(&domain))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESUME: &str = "\
John Smith
Senior Backend Engineer
john.smith@acme.io | +1 415-555-0182
San Francisco, CA";

    // ── name ────────────────────────────────────────────────────────────

    #[test]
    fn test_name_from_first_line() {
        assert_eq!(extract_name(SAMPLE_RESUME), Some("John Smith".to_string()));
    }

    #[test]
    fn test_name_skips_resume_header() {
        let text = "Resume\nMary Jane Watson\nmjw@corp.io";
        assert_eq!(extract_name(text), Some("Mary Jane Watson".to_string()));
    }

    #[test]
    fn test_name_skips_curriculum_vitae_header() {
        let text = "Curriculum Vitae\nAlan Turing";
        assert_eq!(extract_name(text), Some("Alan Turing".to_string()));
    }

    #[test]
    fn test_name_rejects_lines_with_digits() {
        let text = "Flat 4B Baker Street\n+44 20 7946 0958";
        assert_eq!(extract_name(text), None);
    }

    #[test]
    fn test_name_rejects_single_word() {
        assert_eq!(extract_name("Engineer\n"), None);
    }

    #[test]
    fn test_name_rejects_five_words() {
        assert_eq!(extract_name("One Two Three Four Five\n"), None);
    }

    #[test]
    fn test_name_only_first_five_nonempty_lines() {
        let text = "a@b.co\nx\ny\nz\nw\nJohn Smith";
        assert_eq!(extract_name(text), None);
    }

    #[test]
    fn test_name_allows_all_caps() {
        assert_eq!(extract_name("JOHN SMITH\n"), Some("JOHN SMITH".to_string()));
    }

    #[test]
    fn test_name_empty_text() {
        assert_eq!(extract_name(""), None);
    }

    // ── email ───────────────────────────────────────────────────────────

    #[test]
    fn test_email_basic() {
        assert_eq!(
            extract_email(SAMPLE_RESUME),
            Some("john.smith@acme.io".to_string())
        );
    }

    #[test]
    fn test_email_lowercased() {
        assert_eq!(
            extract_email("Contact: John.Smith@Acme.IO"),
            Some("john.smith@acme.io".to_string())
        );
    }

    #[test]
    fn test_email_skips_placeholder_domain() {
        let text = "template: someone@example.com real: jane@startup.dev";
        assert_eq!(extract_email(text), Some("jane@startup.dev".to_string()));
    }

    #[test]
    fn test_email_all_placeholders_yields_none() {
        assert_eq!(extract_email("a@example.com b@test.com"), None);
    }

    #[test]
    fn test_email_none_in_text() {
        assert_eq!(extract_email("no contact details here"), None);
    }

    #[test]
    fn test_email_with_plus_tag() {
        assert_eq!(
            extract_email("reach me at dev+jobs@fastmail.com"),
            Some("dev+jobs@fastmail.com".to_string())
        );
    }

    #[test]
    fn test_email_mailto_fallback() {
        assert_eq!(
            extract_email("see mailto:hire.me@startup.dev for details"),
            // The word-boundary pattern already catches the address itself.
            Some("hire.me@startup.dev".to_string())
        );
    }

    // ── phone ───────────────────────────────────────────────────────────

    #[test]
    fn test_phone_international() {
        assert_eq!(
            extract_phone("call +1 415-555-0182 anytime"),
            Some("14155550182".to_string())
        );
    }

    #[test]
    fn test_phone_hyphenated() {
        assert_eq!(
            extract_phone("phone: 415-555-0182"),
            Some("4155550182".to_string())
        );
    }

    #[test]
    fn test_phone_parenthesized_area_code() {
        assert_eq!(
            extract_phone("(415) 555-0182"),
            Some("4155550182".to_string())
        );
    }

    #[test]
    fn test_phone_bare_ten_digits() {
        assert_eq!(
            extract_phone("mobile 4155550182 available"),
            Some("4155550182".to_string())
        );
    }

    #[test]
    fn test_phone_none() {
        assert_eq!(extract_phone("no numbers here"), None);
    }

    #[test]
    fn test_phone_ignores_short_digit_runs() {
        assert_eq!(extract_phone("born in 1987, class of 2009"), None);
    }
}
