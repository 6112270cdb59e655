//! Calendar date normalization for imported cells
//!
//! Cells may hold an ISO date, day-month-year text, a spreadsheet serial day
//! number or a native date. Everything is reduced to a `NaiveDate`, which has
//! no time-of-day and no offset, so a date never drifts with the runtime
//! timezone. Serial numbers and relative offsets are applied by adding whole
//! days only.
//!
//! Relative schedule expressions ("1st day", "2nd week", "3rd month" or a bare
//! day count) resolve against a commencement date:
//! - `N day`: N - 1 days (day 1 is the anchor itself)
//! - `N week`: N * 7 days
//! - `N month`: N * 30 days, not calendar months

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cell::CellValue;

/// Smallest serial day number accepted as a date
pub const SERIAL_MIN: f64 = 1.0;

/// Largest serial day number accepted as a date (9999-12-31 in spreadsheet terms)
pub const SERIAL_MAX: f64 = 2_958_465.0;

/// Days per "month" in relative expressions
pub const DAYS_PER_RELATIVE_MONTH: u64 = 30;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").unwrap());

static RELATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:st|nd|rd|th)?\s*(day|week|month)$").unwrap());

static BARE_DAYS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Date-only shapes tried when the strict shapes fail
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Date-time shapes tried when the strict shapes fail; only the date part is kept
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a raw cell as a calendar date
///
/// Returns `None` for anything that is not recognizably a date; callers decide
/// whether that is fatal.
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty | CellValue::Bool(_) => None,
        CellValue::Text(s) => parse_date_text(s),
        CellValue::Number(n) => from_serial(*n),
        CellValue::Date(d) => Some(*d),
    }
}

/// Parse date text
///
/// Tried in order: ISO `yyyy-mm-dd`, strict `d-m-yyyy`, then a set of common
/// written forms. Day-month-year text that overflows its month (31-04-2024) is
/// rejected rather than rolled over.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DATE.captures(trimmed) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures(trimmed) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    parse_fallback(trimmed)
}

fn parse_fallback(text: &str) -> Option<NaiveDate> {
    // Offsets are kept as written: the calendar fields of the text win
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Convert a spreadsheet serial day number to a date
///
/// Serial 1 is 1900-01-01; the fractional (time-of-day) part is dropped.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if serial.is_nan() || !(SERIAL_MIN..=SERIAL_MAX).contains(&serial) {
        return None;
    }
    let offset = serial.floor() as u64 - 1;
    serial_epoch().checked_add_days(Days::new(offset))
}

fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Number of days a relative expression adds to its anchor
pub fn relative_offset_days(expr: &str) -> Option<u64> {
    let text = expr.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = RELATIVE.captures(&text) {
        let n: u64 = caps[1].parse().ok()?;
        return match &caps[2] {
            "day" => Some(n.saturating_sub(1)),
            "week" => n.checked_mul(7),
            "month" => n.checked_mul(DAYS_PER_RELATIVE_MONTH),
            _ => None,
        };
    }

    if BARE_DAYS.is_match(&text) {
        return text.parse().ok();
    }

    None
}

/// Resolve a relative expression ("2nd week") against an anchor date
pub fn resolve_relative(expr: &str, anchor: NaiveDate) -> Option<NaiveDate> {
    let days = relative_offset_days(expr)?;
    anchor.checked_add_days(Days::new(days))
}

/// Serialize a date as `yyyy-mm-dd` from its calendar fields
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_text() {
        assert_eq!(parse_date_text("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date_text(" 2024-03-05 "), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date_text("2024-02-30"), None);
    }

    #[test]
    fn test_day_month_year_text() {
        assert_eq!(parse_date_text("5-3-2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date_text("29-02-2024"), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_date_text("31-04-2024"), None);
        assert_eq!(parse_date_text("29-02-2023"), None);
    }

    #[test]
    fn test_fallback_shapes() {
        assert_eq!(parse_date_text("2024/01/15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date_text("01/15/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date_text("15 January 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date_text("Jan 15, 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(
            parse_date_text("2024-01-15T23:30:00-08:00"),
            Some(ymd(2024, 1, 15))
        );
        assert_eq!(parse_date_text("soon"), None);
        assert_eq!(parse_date_text("1st week"), None);
    }

    #[test]
    fn test_serial_numbers() {
        assert_eq!(from_serial(1.0), Some(ymd(1900, 1, 1)));
        assert_eq!(from_serial(32.0), Some(ymd(1900, 2, 1)));
        assert_eq!(from_serial(45292.75), Some(ymd(2024, 1, 2)));
        assert_eq!(from_serial(0.0), None);
        assert_eq!(from_serial(SERIAL_MAX + 1.0), None);
        assert_eq!(parse_date(&CellValue::Number(366.0)), Some(ymd(1901, 1, 1)));
    }

    #[test]
    fn test_native_and_empty_cells() {
        assert_eq!(parse_date(&CellValue::Date(ymd(2024, 6, 1))), Some(ymd(2024, 6, 1)));
        assert_eq!(parse_date(&CellValue::Empty), None);
        assert_eq!(parse_date(&CellValue::Bool(true)), None);
    }

    #[test]
    fn test_resolve_relative() {
        let anchor = ymd(2024, 1, 1);
        assert_eq!(resolve_relative("2nd week", anchor), Some(ymd(2024, 1, 15)));
        assert_eq!(resolve_relative("1st day", anchor), Some(anchor));
        assert_eq!(resolve_relative("3rd day", anchor), Some(ymd(2024, 1, 3)));
        assert_eq!(resolve_relative("0 day", anchor), Some(anchor));
        assert_eq!(resolve_relative("10", anchor), Some(ymd(2024, 1, 11)));
        assert_eq!(resolve_relative("  1ST Week ", anchor), Some(ymd(2024, 1, 8)));
        assert_eq!(resolve_relative("next friday", anchor), None);
        assert_eq!(resolve_relative("-3", anchor), None);
    }

    #[test]
    fn test_relative_month_is_thirty_days() {
        let anchor = ymd(2024, 1, 31);
        assert_eq!(resolve_relative("1st month", anchor), Some(ymd(2024, 3, 1)));
        assert_eq!(relative_offset_days("2nd month"), Some(60));
    }

    #[test]
    fn test_format_then_parse_is_stable() {
        for date in [ymd(1900, 1, 1), ymd(2024, 2, 29), ymd(2031, 12, 31)] {
            let text = format_date(date);
            assert_eq!(parse_date_text(&text), Some(date));
        }
    }
}
