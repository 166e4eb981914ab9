//! Pure predicates over single raw field values.
//!
//! None of these trim or coerce their input; callers trim before storing. Empty input is
//! always rejected.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Wire format for date inputs.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_CHARS: usize = 7;

fn postcode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}$").expect("postcode pattern")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9 +()\-]+$").expect("phone pattern"))
}

/// UK postcode shape, e.g. `WC1X 8LU` or `wc1x8lu`.
pub fn is_postcode(raw: &str) -> bool {
    postcode_pattern().is_match(raw)
}

pub fn is_name(raw: &str) -> bool {
    raw.trim().chars().count() >= MIN_NAME_CHARS
}

/// `local@domain.tld`; not a full RFC 5322 check.
pub fn is_email(raw: &str) -> bool {
    email_pattern().is_match(raw)
}

pub fn is_phone(raw: &str) -> bool {
    raw.chars().count() >= MIN_PHONE_CHARS && phone_pattern().is_match(raw)
}

/// Whole-number amount such as an annual income. Thousands separators and a leading `£`
/// are accepted; zero is not.
pub fn is_amount(raw: &str) -> bool {
    let digits: String = raw
        .strip_prefix('£')
        .unwrap_or(raw)
        .chars()
        .filter(|c| *c != ',')
        .collect();
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.trim_start_matches('0').is_empty()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

pub fn is_date(raw: &str) -> bool {
    parse_date(raw).is_some()
}

/// Strictly after `today`; a date equal to today is rejected.
pub fn is_future_date(raw: &str, today: NaiveDate) -> bool {
    parse_date(raw).is_some_and(|date| date > today)
}

/// Strictly after `earlier`. Either side failing to parse rejects.
pub fn is_after(later: &str, earlier: &str) -> bool {
    match (parse_date(later), parse_date(earlier)) {
        (Some(later), Some(earlier)) => later > earlier,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn postcode_accepts_uk_shapes_with_optional_space() {
        assert!(is_postcode("WC1X 8LU"));
        assert!(is_postcode("WC1X8LU"));
        assert!(is_postcode("m1 1ae"));
        assert!(is_postcode("B33 8TH"));
        assert!(is_postcode("CR2 6XH"));
        assert!(!is_postcode("12345"));
        assert!(!is_postcode(""));
        assert!(!is_postcode(" WC1X 8LU"));
        assert!(!is_postcode("WC1X  8LU"));
    }

    #[test]
    fn name_checks_trimmed_length() {
        assert!(is_name("Jo"));
        assert!(is_name("  Ada Lovelace "));
        assert!(!is_name(" J "));
        assert!(!is_name(""));
    }

    #[test]
    fn email_requires_local_domain_and_tld() {
        assert!(is_email("ada@example.co.uk"));
        assert!(!is_email("ada@example"));
        assert!(!is_email("ada example@x.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email(""));
    }

    #[test]
    fn phone_accepts_common_punctuation() {
        assert!(is_phone("+44 (0)20 7946-0958"));
        assert!(is_phone("0207946"));
        assert!(!is_phone("020794"));
        assert!(!is_phone("020 7946 ext 12"));
        assert!(!is_phone(""));
    }

    #[test]
    fn amount_rejects_zero_and_text() {
        assert!(is_amount("42000"));
        assert!(is_amount("£42,000"));
        assert!(!is_amount("0"));
        assert!(!is_amount("lots"));
        assert!(!is_amount("£"));
    }

    #[test]
    fn viewing_date_must_be_strictly_future() {
        let today = day(2026, 10, 18);
        assert!(!is_future_date("2026-10-18", today));
        assert!(!is_future_date("2026-10-17", today));
        assert!(is_future_date("2026-10-19", today));
        assert!(!is_future_date("19/10/2026", today));
    }

    #[test]
    fn move_in_must_follow_viewing() {
        assert!(!is_after("2026-10-20", "2026-10-20"));
        assert!(is_after("2026-10-21", "2026-10-20"));
        assert!(!is_after("2026-10-19", "2026-10-20"));
        assert!(!is_after("2026-10-21", ""));
    }
}
