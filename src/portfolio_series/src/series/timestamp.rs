//! Canonical Unix-seconds timestamps from heterogeneous wire encodings.
//!
//! The backend is inconsistent about time: bars may carry an ISO-8601 string,
//! epoch seconds, or epoch milliseconds, under one of several field names.
//! Everything downstream of the provider works in `i64` seconds; this module is
//! the single place where raw values are converted.
//!
//! Rules:
//! - Strings are parsed as RFC 3339 / ISO-8601. An embedded offset is honoured;
//!   a date-time without offset, or a bare `YYYY-MM-DD`, is read as UTC.
//! - Numbers strictly greater than [`MILLIS_THRESHOLD`] are milliseconds and are
//!   floor-divided by 1000. Anything else is already seconds (floored).
//! - Unparsable strings and non-finite numbers normalize to `None`. There is no
//!   NaN sentinel; callers skip the point.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric timestamps above this are treated as milliseconds.
pub const MILLIS_THRESHOLD: f64 = 1e10;

/// A timestamp as it appears on the wire, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Number(f64),
    Text(String),
}

impl From<i64> for RawTimestamp {
    fn from(value: i64) -> Self {
        RawTimestamp::Number(value as f64)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        RawTimestamp::Text(value.to_string())
    }
}

/// Converts a raw timestamp into whole seconds since the Unix epoch.
pub fn normalize(raw: &RawTimestamp) -> Option<i64> {
    match raw {
        RawTimestamp::Number(n) => from_number(*n),
        RawTimestamp::Text(s) => parse_text(s),
    }
}

/// Normalizes the first candidate that is present.
///
/// Candidates are checked in the order given; the first `Some` wins even if it
/// then fails to parse. Later candidates are not consulted as a fallback.
pub fn pick_timestamp<'a, I>(candidates: I) -> Option<i64>
where
    I: IntoIterator<Item = Option<&'a RawTimestamp>>,
{
    candidates.into_iter().flatten().next().and_then(normalize)
}

/// Parses an ISO-8601 string directly to seconds.
pub fn parse_text(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc).timestamp());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}

fn from_number(n: f64) -> Option<i64> {
    if !n.is_finite() {
        return None;
    }
    let secs = if n > MILLIS_THRESHOLD {
        (n / 1000.0).floor()
    } else {
        n.floor()
    };
    // i64::MAX as f64 rounds up, so the upper bound is exclusive.
    if secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
        return None;
    }
    Some(secs as i64)
}

/// Renders seconds back as an RFC 3339 UTC string, for labels and summaries.
pub fn to_rfc3339(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}
