use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Re-encode a producer timestamp as fixed-width UTC with nanosecond
/// precision (`2025-01-02T03:04:05.000000000Z`), so that string order in the
/// store matches chronological order. No precision the source carries is lost.
///
/// Accepts RFC 3339 with any offset, or a naive ISO-8601 date-time which is
/// taken as UTC. Returns `None` for anything else.
pub fn normalize_source_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?
            .and_utc(),
    };

    Some(parsed.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

/// Current time in the same encoding, used for `last_synced` and `updated_at`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_offsets_to_utc() {
        assert_eq!(
            normalize_source_timestamp("2025-03-01T10:00:00+02:00").as_deref(),
            Some("2025-03-01T08:00:00.000000000Z")
        );
        assert_eq!(
            normalize_source_timestamp("2025-03-01T08:00:00.5Z").as_deref(),
            Some("2025-03-01T08:00:00.500000000Z")
        );
    }

    #[test]
    fn test_naive_timestamps_are_utc() {
        assert_eq!(
            normalize_source_timestamp("2025-03-01T08:00:00").as_deref(),
            Some("2025-03-01T08:00:00.000000000Z")
        );
        assert_eq!(
            normalize_source_timestamp("2025-03-01 08:00:00.123").as_deref(),
            Some("2025-03-01T08:00:00.123000000Z")
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(normalize_source_timestamp(""), None);
        assert_eq!(normalize_source_timestamp("yesterday"), None);
        assert_eq!(normalize_source_timestamp("2025-13-01T00:00:00Z"), None);
    }

    #[test]
    fn test_sub_microsecond_precision_is_kept() {
        let first = normalize_source_timestamp("2025-01-01T10:00:00.000000100Z").unwrap();
        let second = normalize_source_timestamp("2025-01-01T10:00:00.000000200Z").unwrap();
        assert_eq!(first, "2025-01-01T10:00:00.000000100Z");
        assert!(first < second);
    }

    #[test]
    fn test_normalized_order_is_chronological() {
        // Raw strings sort the wrong way round; normalized ones do not.
        let earlier = "2025-03-01T09:30:00+02:00";
        let later = "2025-03-01T08:00:00Z";
        assert!(earlier > later);

        let earlier = normalize_source_timestamp(earlier).unwrap();
        let later = normalize_source_timestamp(later).unwrap();
        assert!(earlier < later);
    }
}
