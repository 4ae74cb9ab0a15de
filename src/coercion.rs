// Value Coercion - locale-formatted numbers and dates from raw CSV text
//
// Malformed input never fails: amounts become None and unrecognised
// dates become DateValue::Invalid.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// DATE VALUE
// ============================================================================

/// A parsed date field.
///
/// `Invalid` is the sentinel for a non-empty string that matched no accepted
/// format. It still counts as "present" for required-field checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Valid(NaiveDate),
    Invalid,
}

impl DateValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Valid(date) => Some(*date),
            DateValue::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DateValue::Valid(_))
    }

    /// Calendar bucket key, e.g. "2024-01". None for the invalid sentinel.
    pub fn year_month(&self) -> Option<String> {
        self.as_date()
            .map(|d| format!("{:04}-{:02}", d.year(), d.month()))
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Valid(date) => write!(f, "{}", date.format("%d/%m/%Y")),
            DateValue::Invalid => write!(f, "Invalid Date"),
        }
    }
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Parse a pt-BR formatted amount: "." groups thousands, "," is the decimal mark.
///
/// `"1.234,56"` → `Some(1234.56)`, `""` → `None`, `"abc"` → `None`.
///
/// Only the empty string is absent. Text that is blank once the thousands
/// dots are removed (`"   "`, `"."`) is zero.
pub fn parse_amount(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    let normalized = raw.replace('.', "").replacen(',', ".", 1);
    let normalized = normalized.trim();
    if normalized.is_empty() {
        return Some(0.0);
    }

    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

// ============================================================================
// DATES
// ============================================================================

/// Parse a date field.
///
/// Accepted: `dd/mm/yyyy` (out-of-range parts roll over), `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]` and
/// RFC 3339 timestamps. Anything else non-empty is `DateValue::Invalid`.
pub fn parse_date(raw: Option<&str>) -> Option<DateValue> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    if let Some((day, month, year)) = split_day_month_year(raw) {
        return Some(
            rolled_over_date(day, month, year)
                .map(DateValue::Valid)
                .unwrap_or(DateValue::Invalid),
        );
    }

    Some(parse_iso8601(raw).map(DateValue::Valid).unwrap_or(DateValue::Invalid))
}

/// Match exactly two digits, "/", two digits, "/", four digits.
fn split_day_month_year(raw: &str) -> Option<(u32, u32, i32)> {
    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return None;
    }

    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    let day = raw[0..2].parse().ok()?;
    let month = raw[3..5].parse().ok()?;
    let year = raw[6..10].parse().ok()?;
    Some((day, month, year))
}

/// Calendar date from day/month/year, carrying overflow into the next unit:
/// `31/02/2024` is 2024-03-02, day `00` is the last day of the month before,
/// month `13` is January of the following year.
fn rolled_over_date(day: u32, month: u32, year: i32) -> Option<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let first_of_month = match month {
        0 => start.checked_sub_months(Months::new(1))?,
        m => start.checked_add_months(Months::new(m - 1))?,
    };
    first_of_month.checked_add_signed(Duration::days(i64::from(day) - 1))
}

fn parse_iso8601(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    None
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> DateValue {
        DateValue::Valid(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_parse_amount_brazilian_format() {
        assert_eq!(parse_amount(Some("1.234,56")), Some(1234.56));
        assert_eq!(parse_amount(Some("1.000.000")), Some(1_000_000.0));
        assert_eq!(parse_amount(Some("-87,5")), Some(-87.5));
        assert_eq!(parse_amount(Some("42")), Some(42.0));
    }

    #[test]
    fn test_parse_amount_absent_and_malformed() {
        assert_eq!(parse_amount(None), None);
        assert_eq!(parse_amount(Some("")), None);
        assert_eq!(parse_amount(Some("abc")), None);
        assert_eq!(parse_amount(Some("1,2,3")), None);
        assert_eq!(parse_amount(Some("R$ 10,00")), None);
    }

    #[test]
    fn test_parse_amount_blank_after_cleanup_is_zero() {
        assert_eq!(parse_amount(Some("   ")), Some(0.0));
        assert_eq!(parse_amount(Some(".")), Some(0.0));
        assert_eq!(parse_amount(Some(" 12,5 ")), Some(12.5));
    }

    #[test]
    fn test_parse_amount_rejects_non_finite() {
        assert_eq!(parse_amount(Some("inf")), None);
        assert_eq!(parse_amount(Some("NaN")), None);
    }

    #[test]
    fn test_parse_date_day_month_year() {
        assert_eq!(parse_date(Some("05/01/2024")), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date(Some("31/12/1999")), Some(ymd(1999, 12, 31)));
    }

    #[test]
    fn test_parse_date_round_trips_components() {
        for (d, m, y) in [(1, 1, 2000), (29, 2, 2024), (15, 7, 2031), (30, 11, 1987)] {
            let raw = format!("{:02}/{:02}/{:04}", d, m, y);
            let parsed = parse_date(Some(&raw)).unwrap().as_date().unwrap();
            assert_eq!((parsed.day(), parsed.month(), parsed.year()), (d, m, y));
        }
    }

    #[test]
    fn test_parse_date_out_of_range_components_roll_over() {
        assert_eq!(parse_date(Some("31/02/2024")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_date(Some("00/01/2024")), Some(ymd(2023, 12, 31)));
        assert_eq!(parse_date(Some("01/13/2024")), Some(ymd(2025, 1, 1)));
        assert_eq!(parse_date(Some("15/00/2024")), Some(ymd(2023, 12, 15)));
        assert_eq!(parse_date(Some("99/99/2024")), Some(ymd(2032, 6, 7)));
    }

    #[test]
    fn test_parse_date_iso8601() {
        assert_eq!(parse_date(Some("2024-01-20")), Some(ymd(2024, 1, 20)));
        assert_eq!(parse_date(Some("2024-03-01T12:30:00")), Some(ymd(2024, 3, 1)));
        assert_eq!(
            parse_date(Some("2024-03-01T12:30:00.250Z")),
            Some(ymd(2024, 3, 1))
        );
        assert_eq!(
            parse_date(Some("2024-03-01T23:00:00-03:00")),
            Some(ymd(2024, 3, 1))
        );
    }

    #[test]
    fn test_parse_date_absent_and_invalid() {
        assert_eq!(parse_date(None), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("yesterday")), Some(DateValue::Invalid));
        assert_eq!(parse_date(Some("1/2/2024")), Some(DateValue::Invalid));
    }

    #[test]
    fn test_year_month_key() {
        assert_eq!(ymd(2024, 1, 5).year_month(), Some("2024-01".to_string()));
        assert_eq!(DateValue::Invalid.year_month(), None);
    }
}
