//! Well-known field names and the store's raw field encodings.
//!
//! Checkbox fields store `"1"` when checked. Date fields use the compact ISO
//! encoding `yyyyMMddTHHmmss`, optionally suffixed with `Z`, or the
//! date-only form `yyyyMMdd`. All stored dates are UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub const HIDE_VERSION: &str = "__Hide version";
pub const VALID_FROM: &str = "__Valid from";
pub const VALID_TO: &str = "__Valid to";
pub const UNPUBLISH: &str = "__Unpublish";

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";

/// `true` iff a checkbox value is checked.
pub fn is_checked(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.trim() == "1")
}

/// Parse a date in the store encoding. `None` for anything malformed.
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let raw = raw.strip_suffix('Z').unwrap_or(raw);

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Encode a timestamp in the store encoding (second precision, `Z` suffix).
pub fn format_iso_date(at: DateTime<Utc>) -> String {
    format!("{}Z", at.format(DATE_TIME_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        assert!(is_checked(Some("1")));
        assert!(!is_checked(Some("")));
        assert!(!is_checked(Some("0")));
        assert!(!is_checked(None));
    }

    #[test]
    fn parses_full_and_zulu_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 31, 12, 30, 5).unwrap();
        assert_eq!(parse_iso_date("20240131T123005"), Some(expected));
        assert_eq!(parse_iso_date("20240131T123005Z"), Some(expected));
    }

    #[test]
    fn parses_date_only_as_midnight() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(parse_iso_date("20240131"), Some(expected));
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(parse_iso_date("yesterday"), None);
        assert_eq!(parse_iso_date("2024-01-31"), None);
        assert_eq!(parse_iso_date("20241331T000000"), None);
    }

    #[test]
    fn format_matches_parse() {
        let at = Utc.with_ymd_and_hms(2023, 7, 4, 8, 0, 0).unwrap();
        let encoded = format_iso_date(at);
        assert_eq!(encoded, "20230704T080000Z");
        assert_eq!(parse_iso_date(&encoded), Some(at));
    }
}
