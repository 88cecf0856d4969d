//! Timestamp conversion between protobuf `(seconds, nanos)` and Amino ISO-8601 strings
//!
//! Amino JSON carries millisecond precision only. Anything finer is truncated on the way out.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::errors::{GrantError, Result};

/// Render a timestamp as an ISO-8601 UTC string with millisecond precision.
///
/// A zero millisecond component renders as `...:SSZ` rather than `...:SS.000Z`.
pub fn to_iso(seconds: i64, nanos: i32) -> Result<String> {
    let total_nanos = i128::from(seconds) * 1_000_000_000 + i128::from(nanos);
    let millis = total_nanos / 1_000_000;

    let datetime = i64::try_from(millis)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| GrantError::MalformedTimestamp {
            input: format!("{}s {}ns", seconds, nanos),
        })?;

    let iso = datetime.to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(match iso.strip_suffix(".000Z") {
        Some(whole_seconds) => format!("{}Z", whole_seconds),
        None => iso,
    })
}

/// Parse an ISO-8601 string into `(seconds, nanos)`.
pub fn from_iso(input: &str) -> Result<(i64, i32)> {
    let millis = parse_millis(input).ok_or_else(|| GrantError::MalformedTimestamp {
        input: input.to_string(),
    })?;

    let seconds = millis.div_euclid(1000);
    let nanos = (millis.rem_euclid(1000) * 1_000_000) as i32;
    Ok((seconds, nanos))
}

fn parse_millis(input: &str) -> Option<i64> {
    let input = input.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime.timestamp_millis());
    }

    // ISO-8601 also allows dropping the seconds field.
    if let Some(naive) = input.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M") {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M%:z") {
        return Some(datetime.timestamp_millis());
    }

    // Date-only forms are UTC midnight.
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
}
