//! Lenient date parsing for historical records
//!
//! Malformed and missing dates both parse to `None`, and any elapsed-time
//! computation involving a `None` yields zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::RawValue;

const SECONDS_PER_DAY: f64 = 86_400.0;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parse a raw value into a timestamp, or `None` if it cannot be read as one
pub fn parse_date(value: &RawValue) -> Option<NaiveDateTime> {
    let text = value.as_text()?;
    parse_date_str(&text)
}

/// Parse a date string. Accepts dates, datetimes, RFC 3339, `YYYY-MM` and
/// bare `YYYY`.
pub fn parse_date_str(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    // Partial dates: "2012-06" and "2012"
    let padded = match text.len() {
        7 => format!("{}-01", text),
        4 => format!("{}-01-01", text),
        _ => return None,
    };
    NaiveDate::parse_from_str(&padded, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Days from `start` to `end`, including any fraction of a day. Zero if
/// either is unparseable.
pub fn elapsed_days(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> f64 {
    match (start, end) {
        (Some(start), Some(end)) => (end - start).num_seconds() as f64 / SECONDS_PER_DAY,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_date_str("2010-03-15"), Some(date(2010, 3, 15)));
        assert_eq!(parse_date_str(" 2010/03/15 "), Some(date(2010, 3, 15)));
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2011, 7, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(parse_date_str("2011-07-01 12:30:00"), Some(expected));
        assert_eq!(parse_date_str("2011-07-01T12:30:00"), Some(expected));
        assert_eq!(parse_date_str("2011-07-01T12:30:00Z"), Some(expected));
    }

    #[test]
    fn test_parse_partial_dates() {
        assert_eq!(parse_date_str("2012-06"), Some(date(2012, 6, 1)));
        assert_eq!(parse_date_str("2012"), Some(date(2012, 1, 1)));
        assert_eq!(parse_date(&RawValue::from(2012i64)), Some(date(2012, 1, 1)));
    }

    #[test]
    fn test_parse_malformed_is_none() {
        assert_eq!(parse_date_str(""), None);
        assert_eq!(parse_date_str("-"), None);
        assert_eq!(parse_date_str("not a date"), None);
        assert_eq!(parse_date_str("2010-13-45"), None);
        assert_eq!(parse_date_str("0000-00-00"), None);
        assert_eq!(parse_date(&RawValue::Null), None);
    }

    #[test]
    fn test_elapsed_days() {
        let days = elapsed_days(Some(date(2010, 1, 1)), Some(date(2011, 1, 1)));
        assert!((days - 365.0).abs() < 1e-9);

        let days = elapsed_days(Some(date(2011, 1, 1)), Some(date(2010, 1, 1)));
        assert!((days + 365.0).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_days_keeps_partial_days() {
        let start = NaiveDate::from_ymd_opt(2010, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert!((elapsed_days(Some(start), Some(date(2010, 1, 3))) - 1.5).abs() < 1e-9);
        assert!((elapsed_days(Some(date(2010, 1, 1)), Some(start)) - 0.5).abs() < 1e-9);

        let end = parse_date_str("2002-12-31T18:00:00");
        let days = elapsed_days(Some(date(2000, 1, 1)), end);
        assert!((days - 1095.75).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_days_unparseable_is_zero() {
        assert_eq!(elapsed_days(None, Some(date(2010, 1, 1))), 0.0);
        assert_eq!(elapsed_days(Some(date(2010, 1, 1)), None), 0.0);
        assert_eq!(elapsed_days(None, None), 0.0);
    }
}
