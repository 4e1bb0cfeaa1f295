//! Time conversion utilities.
//!
//! Timestamps are stored as RFC3339 text, except `selected_at` which is
//! stored as epoch milliseconds because it takes part in SQL comparisons.

use crate::error::{MergeError, Result};
use chrono::{DateTime, TimeZone, Utc};

/// Format a timestamp for storage.
#[must_use]
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a stored RFC3339 timestamp.
///
/// # Errors
///
/// Returns a validation error if the text is not valid RFC3339.
pub fn parse_ts(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MergeError::Config(format!("invalid timestamp '{text}': {e}")))
}

/// Epoch milliseconds for storage of `selected_at`.
#[must_use]
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Rebuild a timestamp from stored epoch milliseconds.
///
/// # Errors
///
/// Returns an error if the value is outside the representable range.
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| MergeError::Config(format!("timestamp out of range: {millis}ms")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_roundtrip() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_000_000).unwrap();
        assert_eq!(parse_ts(&format_ts(ts)).unwrap(), ts);
    }

    #[test]
    fn millis_roundtrip_truncates_to_millisecond() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let back = from_millis(to_millis(ts)).unwrap();
        assert_eq!(back.timestamp_millis(), ts.timestamp_millis());
        assert!(back <= ts);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_ts("not-a-time").is_err());
    }
}
