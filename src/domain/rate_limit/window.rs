//! Window arithmetic shared by all counter stores

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Window used when none is configured
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Extra lifetime given to a counter beyond its window
pub const COUNTER_TTL_PADDING: Duration = Duration::from_millis(1000);

/// Unix second at which the window containing `now` starts
///
/// Sub-second windows cannot be aligned to whole seconds, so they fall back
/// to the current second.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> i64 {
    let unix = now.timestamp();
    let secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);

    if secs <= 0 {
        return unix;
    }

    unix.div_euclid(secs) * secs
}

/// Storage key of the counter for `key` in the window containing `now`
pub fn counter_key(prefix: &str, key: &str, window: Duration, now: DateTime<Utc>) -> String {
    format!("{}{}:{}", prefix, key, window_start(now, window))
}

/// Lifetime of a freshly created counter
pub fn counter_ttl(window: Duration) -> Duration {
    window.saturating_add(COUNTER_TTL_PADDING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_huge_window_does_not_overflow() {
        assert_eq!(counter_ttl(Duration::MAX), Duration::MAX);

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 42).unwrap();
        assert_eq!(window_start(now, Duration::from_secs(u64::MAX)), 0);
    }

    #[test]
    fn test_window_start_aligns_to_minute() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 42).unwrap();
        let start = window_start(now, Duration::from_secs(60));

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn test_same_window_same_key() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 1).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 59).unwrap();
        let window = Duration::from_secs(60);

        assert_eq!(
            counter_key("req_limit:", "k1", window, a),
            counter_key("req_limit:", "k1", window, b)
        );
    }

    #[test]
    fn test_next_window_new_key() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap();
        let window = Duration::from_secs(60);

        assert_ne!(
            counter_key("req_limit:", "k1", window, a),
            counter_key("req_limit:", "k1", window, b)
        );
    }

    #[test]
    fn test_counter_key_layout() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap();
        let key = counter_key("req_limit:", "k1", Duration::from_secs(60), now);

        assert_eq!(key, format!("req_limit:k1:{}", now.timestamp() - 30));
    }

    #[test]
    fn test_sub_second_window_uses_current_second() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap();

        assert_eq!(window_start(now, Duration::from_millis(500)), now.timestamp());
    }

    #[test]
    fn test_counter_ttl_adds_one_second() {
        assert_eq!(counter_ttl(Duration::from_secs(60)), Duration::from_millis(61_000));
    }
}
