//! Clock helpers.
//!
//! Timestamps are kept at millisecond precision everywhere so that a value
//! read back from storage compares equal to the one that was written.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::CoreError;

/// Current time, truncated to whole milliseconds.
pub fn now() -> DateTime<Utc> {
    let millis = Utc::now().timestamp_millis();
    // A millisecond count taken from the clock always maps back.
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Convert a timestamp to Unix milliseconds.
pub fn to_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert Unix milliseconds back to a timestamp.
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>, CoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(CoreError::TimestampOutOfRange(millis))
}

/// Format as RFC3339 with whole seconds and a `Z` suffix.
///
/// Truncates rather than rounds, so a watermark built from it never lies
/// after the instant it came from.
pub fn format_rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp in any offset.
pub fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp(format!("{text:?}: {e}")))
}

/// Serde adapter for timestamps carried as [`format_rfc3339`] strings.
pub mod rfc3339_seconds {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_rfc3339(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_rfc3339(&text).map_err(de::Error::custom)
    }
}
