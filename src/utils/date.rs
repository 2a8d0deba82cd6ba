// src/utils/date.rs

//! Normalization of the optional `date` request parameter.
//!
//! Accepted inputs mirror what a browser `Date` would accept for the common
//! cases: ISO dates and datetimes, RFC 2822 strings, `MM/DD/YYYY`, month
//! names (`October 16, 2026`, `16 Oct 2026`), the `Date.toString()` form, and
//! epoch milliseconds. A missing or falsy value means "today" in the service
//! timezone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use crate::error::{AppError, Result};

/// `chrono` format of the token embedded in the readings URL.
pub const FETCH_KEY_FORMAT: &str = "%m%d%y";

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    // `%B` also accepts abbreviated month names when parsing
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %H:%M:%S",
];

/// Offset-carrying layouts beyond RFC 3339 and RFC 2822.
const ZONED_FORMATS: &[&str] = &["%a %b %d %Y %H:%M:%S GMT%z", "%a %b %d %Y %H:%M:%S %z"];

/// Normalize `date` to a `MMDDYY` fetch key.
pub fn fetch_key(date: Option<&Value>, now: DateTime<Utc>, tz: Tz) -> Result<String> {
    resolve_date(date, now, tz).map(|day| day.format(FETCH_KEY_FORMAT).to_string())
}

/// Resolve `date` to a calendar day in `tz`.
pub fn resolve_date(date: Option<&Value>, now: DateTime<Utc>, tz: Tz) -> Result<NaiveDate> {
    let value = match date {
        Some(value) if !is_falsy(value) => value,
        _ => return Ok(now.with_timezone(&tz).date_naive()),
    };

    let parsed = match value {
        Value::String(s) => parse_date_str(s.trim(), tz),
        Value::Number(n) => n
            .as_f64()
            .and_then(|ms| DateTime::from_timestamp_millis(ms.trunc() as i64))
            .map(|instant| instant.with_timezone(&tz).date_naive()),
        _ => None,
    };

    parsed.ok_or_else(|| AppError::invalid_date(json_type_name(value)))
}

/// Name of a JSON value's type as a JavaScript client would report it.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn parse_date_str(s: &str, tz: Tz) -> Option<NaiveDate> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(instant.with_timezone(&tz).date_naive());
    }
    if let Ok(instant) = DateTime::parse_from_rfc2822(s) {
        return Some(instant.with_timezone(&tz).date_naive());
    }
    let unlabeled = strip_zone_name(s);
    if let Some(instant) = ZONED_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(unlabeled, f).ok())
    {
        return Some(instant.with_timezone(&tz).date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

/// Drop the trailing `(Pacific Daylight Time)` label `Date.toString()` appends.
fn strip_zone_name(s: &str) -> &str {
    match s.rfind(" (") {
        Some(i) if s.ends_with(')') => s[..i].trim_end(),
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const LA: Tz = chrono_tz::America::Los_Angeles;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_and_falsy_mean_today() {
        for date in [None, Some(json!(null)), Some(json!("")), Some(json!(0)), Some(json!(false))] {
            assert_eq!(fetch_key(date.as_ref(), now(), LA).unwrap(), "101626");
        }
    }

    #[test]
    fn test_today_uses_service_timezone() {
        // 03:00 UTC on the 17th is still the 16th in Los Angeles
        let late = Utc.with_ymd_and_hms(2026, 10, 17, 3, 0, 0).unwrap();
        assert_eq!(fetch_key(None, late, LA).unwrap(), "101626");
    }

    #[test]
    fn test_date_strings() {
        let cases = [
            ("2026-12-25", "122526"),
            ("2026/12/25", "122526"),
            ("12/25/2026", "122526"),
            ("2026-12-25T10:30", "122526"),
            ("2026-12-25 10:30:00", "122526"),
            ("Fri, 25 Dec 2026 10:00:00 -0800", "122526"),
            (" 2027-01-03 ", "010327"),
            ("December 25, 2026", "122526"),
            ("Dec 25, 2026", "122526"),
            ("Dec 25 2026", "122526"),
            ("25 Dec 2026", "122526"),
            ("25 December 2026", "122526"),
            ("Fri Dec 25 2026", "122526"),
            ("December 25, 2026 10:30:00", "122526"),
            ("Fri Oct 16 2026 10:00:00 GMT-0700 (Pacific Daylight Time)", "101626"),
            ("Fri Oct 16 2026 23:30:00 GMT+0200", "101626"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                fetch_key(Some(&json!(input)), now(), LA).unwrap(),
                expected,
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_date_to_string_form_converts_to_timezone() {
        // 01:00 in Berlin on the 17th is still the 16th in Los Angeles
        let date = json!("Sat Oct 17 2026 01:00:00 GMT+0200 (Central European Summer Time)");
        assert_eq!(fetch_key(Some(&date), now(), LA).unwrap(), "101626");
    }

    #[test]
    fn test_strip_zone_name() {
        assert_eq!(
            strip_zone_name("Fri Oct 16 2026 10:00:00 GMT-0700 (Pacific Daylight Time)"),
            "Fri Oct 16 2026 10:00:00 GMT-0700"
        );
        assert_eq!(strip_zone_name("Oct 16 2026"), "Oct 16 2026");
    }

    #[test]
    fn test_rfc3339_converts_to_timezone() {
        let date = json!("2026-10-16T03:00:00Z");
        assert_eq!(fetch_key(Some(&date), now(), LA).unwrap(), "101526");
    }

    #[test]
    fn test_epoch_millis() {
        let noon_utc = Utc.with_ymd_and_hms(2026, 3, 4, 20, 0, 0).unwrap();
        let date = json!(noon_utc.timestamp_millis());
        assert_eq!(fetch_key(Some(&date), now(), LA).unwrap(), "030426");
    }

    #[test]
    fn test_tokens_are_fixed_width() {
        for input in ["0001-01-01", "2000-02-29", "9999-12-31"] {
            let token = fetch_key(Some(&json!(input)), now(), LA).unwrap();
            assert_eq!(token.len(), 6, "input {input:?}");
            assert!(token.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_invalid_string() {
        let err = fetch_key(Some(&json!("not-a-date")), now(), LA).unwrap_err();
        assert!(matches!(err, AppError::InvalidDate(ref t) if t == "string"));
        assert_eq!(
            err.to_string(),
            "Optional param (date) of type Date not assignable to type string"
        );
    }

    #[test]
    fn test_invalid_non_strings_name_their_type() {
        let cases = [
            (json!(true), "boolean"),
            (json!([2026, 10, 16]), "object"),
            (json!({ "day": 16 }), "object"),
            (json!("2026-13-40"), "string"),
        ];
        for (value, type_name) in cases {
            match fetch_key(Some(&value), now(), LA) {
                Err(AppError::InvalidDate(t)) => assert_eq!(t, type_name),
                other => panic!("expected InvalidDate for {value}, got {other:?}"),
            }
        }
    }
}
