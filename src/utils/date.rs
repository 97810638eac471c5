//! Frontmatter date parsing.
//!
//! Accepted formats, tried in order:
//!
//! | Format                    | Example                     |
//! |---------------------------|-----------------------------|
//! | RFC 3339 with offset      | `2024-01-05T10:30:00+02:00` |
//! | Bare date-time            | `2024-01-05T10:30:00`       |
//! | Space-separated date-time | `2024-01-05 10:30:00`       |
//! | Plain date                | `2024-01-05`                |
//!
//! Formats without an offset are read as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a frontmatter date string, `None` if no accepted format matches.
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc().fixed_offset())
}
