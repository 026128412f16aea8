//! Timestamp encoding for the datetime columns.
//!
//! Timestamps are persisted as UTC text with millisecond precision. The
//! zero-padded format sorts lexicographically in chronological order, which
//! is what `ORDER BY` relies on when the dialect stores the column as text.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::StorageError;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Formats a timestamp for storage, truncating to millisecond precision.
pub(crate) fn format_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DATETIME_FORMAT).to_string()
}

/// Parses a stored timestamp.
pub(crate) fn parse_datetime(text: &str) -> Result<DateTime<Utc>, StorageError> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| StorageError::Decode(format!("invalid timestamp '{text}': {err}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn round_trip_at_millisecond_precision() {
        let timestamp = Utc
            .with_ymd_and_hms(2026, 8, 1, 13, 37, 42)
            .single()
            .unwrap()
            + chrono::Duration::milliseconds(123);
        let text = format_datetime(timestamp);
        assert_eq!(text, "2026-08-01 13:37:42.123");
        assert_eq!(parse_datetime(&text).unwrap(), timestamp);
    }

    #[test]
    fn format_truncates_sub_millisecond_precision() {
        let timestamp = Utc
            .with_ymd_and_hms(2026, 8, 1, 0, 0, 0)
            .single()
            .unwrap()
            + chrono::Duration::microseconds(1500);
        assert_eq!(format_datetime(timestamp), "2026-08-01 00:00:00.001");
    }

    #[test]
    fn lexicographic_order_is_chronological() {
        let earlier = format_datetime(
            Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).single().unwrap(),
        );
        let later = format_datetime(
            Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).single().unwrap(),
        );
        assert!(earlier < later);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(parse_datetime("not a timestamp").is_err());
    }
}
