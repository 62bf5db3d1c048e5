//! Lenient timestamp parsing for spreadsheet cells.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date-time layouts tried in order after RFC 3339.
const DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Date-only layouts; the time of day becomes midnight.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a timestamp cell, or `None` when no known layout matches.
///
/// Offsets in RFC 3339 values are dropped after conversion, keeping the wall
/// time the sheet recorded.
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_iso_formats() {
        assert_eq!(
            parse_timestamp("2024-01-05 09:30:00"),
            Some(ts(2024, 1, 5, 9, 30, 0))
        );
        assert_eq!(
            parse_timestamp("2024-01-05T09:30:15"),
            Some(ts(2024, 1, 5, 9, 30, 15))
        );
        assert_eq!(
            parse_timestamp("2024-01-05 09:30"),
            Some(ts(2024, 1, 5, 9, 30, 0))
        );
    }

    #[test]
    fn test_rfc3339_keeps_wall_time() {
        assert_eq!(
            parse_timestamp("2024-01-05T23:30:00+05:00"),
            Some(ts(2024, 1, 5, 23, 30, 0))
        );
    }

    #[test]
    fn test_us_formats() {
        assert_eq!(
            parse_timestamp("1/5/2024 9:05:00"),
            Some(ts(2024, 1, 5, 9, 5, 0))
        );
        assert_eq!(
            parse_timestamp("01/05/2024 02:15 PM"),
            Some(ts(2024, 1, 5, 14, 15, 0))
        );
        assert_eq!(
            parse_timestamp("12/31/2023 11:59:59 PM"),
            Some(ts(2023, 12, 31, 23, 59, 59))
        );
    }

    #[test]
    fn test_date_only() {
        assert_eq!(parse_timestamp("2024-02-29"), Some(ts(2024, 2, 29, 0, 0, 0)));
        assert_eq!(parse_timestamp(" 2/29/2024 "), Some(ts(2024, 2, 29, 0, 0, 0)));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-01"), None);
        assert_eq!(parse_timestamp("2023-02-29"), None);
    }
}
