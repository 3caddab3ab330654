//! ISO-8601 timestamp handling.
//!
//! GPS files in the wild carry a loose mix of RFC 3339 timestamps, timestamps
//! without an offset, and occasionally a space instead of the `T` separator.
//! Values without an offset are taken as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::{MergeError, Result};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a point timestamp into UTC.
///
/// # Example
/// ```
/// use track_merger::timestamp;
///
/// let a = timestamp::parse("2024-05-01T10:00:00+02:00").unwrap();
/// let b = timestamp::parse("2024-05-01T08:00:00Z").unwrap();
/// assert_eq!(a, b);
/// assert!(timestamp::parse("yesterday").is_err());
/// ```
pub fn parse(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MergeError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Format a timestamp the way merged documents store it.
pub fn format(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
