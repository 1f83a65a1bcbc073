//! Clock utilities for the janitor
//!
//! Retention decisions compare tag dates against "today", so every caller
//! goes through [`now`] / [`today`] instead of reading the system clock
//! directly.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `JANITOR_MOCK_TIME` environment variable can be set
//! to override the system time. This is useful for checking how a set of
//! `KeepUntil` tags will be treated on a given day.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! JANITOR_MOCK_TIME="2025-12-25 14:30:00" janitor --dry-run
//! ```

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "JANITOR_MOCK_TIME";

/// Format accepted by `JANITOR_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset between mock time and real time, computed once at first use.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                return parse_mock_offset(&mock_time_str, chrono::Local::now());
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Compute the offset that makes `real_now` read as `mock_time_str`.
fn parse_mock_offset(mock_time_str: &str, real_now: DateTime<Local>) -> Option<chrono::Duration> {
    let Ok(naive_dt) = NaiveDateTime::parse_from_str(mock_time_str, MOCK_TIME_FORMAT) else {
        tracing::warn!(
            mock_time = %mock_time_str,
            expected_format = MOCK_TIME_FORMAT,
            "Invalid mock time format"
        );
        return None;
    };

    let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() else {
        tracing::warn!(
            mock_time = %mock_time_str,
            "Failed to convert mock time to local timezone"
        );
        return None;
    };

    let offset = mock_dt.signed_duration_since(real_now);
    tracing::info!(
        mock_time = %mock_time_str,
        offset_secs = offset.num_seconds(),
        "Mock time enabled"
    );
    Some(offset)
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Today's local calendar date, used as the reference for `KeepUntil` expiry.
pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Format a DateTime for reports with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn mock_offset_lands_on_requested_time() {
        let real_now = Local.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let offset = parse_mock_offset("2025-12-25 14:30:00", real_now).unwrap();

        let simulated = real_now + offset;
        assert_eq!(format_datetime_full(&simulated), "2025-12-25 14:30:00");
    }

    #[test]
    fn mock_offset_rejects_bad_format() {
        let real_now = Local.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        assert!(parse_mock_offset("12/25/2025", real_now).is_none());
        assert!(parse_mock_offset("2025-12-25", real_now).is_none());
    }

    #[test]
    fn today_matches_now() {
        let date = today();
        let current = now().date_naive();
        // Could straddle midnight; allow one day of slack
        assert!((current - date).num_days().abs() <= 1);
    }

    #[test]
    fn now_advances() {
        let t1 = now();
        std::thread::sleep(Duration::from_millis(20));
        let t2 = now();
        assert!(t2 > t1, "Time should advance forward");
    }

    #[test]
    fn mock_time_constants() {
        assert_eq!(MOCK_TIME_ENV_VAR, "JANITOR_MOCK_TIME");
        assert!(NaiveDateTime::parse_from_str("2025-12-25 14:30:00", MOCK_TIME_FORMAT).is_ok());
    }
}
