//! Timestamp utilities
//!
//! Database timestamps are RFC 3339 UTC strings with millisecond precision
//! and a `Z` suffix, so lexical order matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
pub fn parse_db_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01, before 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_db_timestamp_format() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(to_db_timestamp(&dt), "2025-03-04T05:06:07.000Z");
    }

    #[test]
    fn test_db_timestamp_parses_back() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let parsed = parse_db_timestamp(&to_db_timestamp(&dt)).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn test_db_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap();
        let later = earlier + Duration::days(3);
        assert!(to_db_timestamp(&earlier) < to_db_timestamp(&later));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_db_timestamp("yesterday").is_err());
    }
}
