//! Idle-time arithmetic for the culler
//!
//! Resources report their last activity in several shapes: a zone-aware
//! instant, a naive instant (interpreted as UTC) or an ISO-8601 string as
//! returned by the Jupyter REST API. Everything is normalized to
//! `DateTime<Utc>` before comparing against "now".
//!
//! # Mock Time for Development
//!
//! In debug builds, the `CULLER_MOCK_TIME` environment variable can be set
//! to shift the clock returned by [`now_utc`]. This makes it possible to
//! watch a culler pass evict resources without waiting for real timeouts.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` in UTC (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::{CullerError, Result};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "CULLER_MOCK_TIME";

/// Idle value reported for resources without any recorded activity.
/// Negative so that no timeout comparison can ever select it.
pub const NO_ACTIVITY: f64 = -1.0;

static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        let mock_dt = Utc.from_utc_datetime(&naive_dt);
                        let offset = mock_dt.signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Current UTC time, respecting `CULLER_MOCK_TIME` in debug builds.
pub fn now_utc() -> DateTime<Utc> {
    let real_now = Utc::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Last-activity signal of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityTimestamp {
    /// Zone-aware instant
    Utc(DateTime<Utc>),
    /// Instant without zone information, interpreted as UTC
    Naive(NaiveDateTime),
    /// Raw ISO-8601 text, parsed on demand
    Iso(String),
}

impl ActivityTimestamp {
    /// Resolve to a UTC instant
    pub fn to_utc(&self) -> Result<DateTime<Utc>> {
        match self {
            ActivityTimestamp::Utc(dt) => Ok(*dt),
            ActivityTimestamp::Naive(naive) => Ok(Utc.from_utc_datetime(naive)),
            ActivityTimestamp::Iso(text) => parse_iso_timestamp(text),
        }
    }
}

impl std::fmt::Display for ActivityTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityTimestamp::Utc(dt) => write!(f, "{}", dt.to_rfc3339()),
            ActivityTimestamp::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
            ActivityTimestamp::Iso(text) => f.write_str(text),
        }
    }
}

impl From<DateTime<Utc>> for ActivityTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Utc(dt)
    }
}

impl From<NaiveDateTime> for ActivityTimestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl From<String> for ActivityTimestamp {
    fn from(text: String) -> Self {
        Self::Iso(text)
    }
}

impl From<&str> for ActivityTimestamp {
    fn from(text: &str) -> Self {
        Self::Iso(text.to_string())
    }
}

const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp.
///
/// A trailing `Z` is rewritten to `+00:00` first. Values without a zone are
/// taken as UTC, and a bare date means midnight UTC.
pub fn parse_iso_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    let normalized = match trimmed.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(CullerError::timestamp(value, "not an ISO-8601 timestamp"))
}

/// Seconds elapsed between `last_activity` and `now`.
///
/// Returns [`NO_ACTIVITY`] when no activity was ever recorded. Callers must
/// treat a negative value as "never idle".
pub fn idle_seconds(last_activity: Option<&ActivityTimestamp>, now: DateTime<Utc>) -> Result<f64> {
    let Some(last_activity) = last_activity else {
        return Ok(NO_ACTIVITY);
    };

    let elapsed = now.signed_duration_since(last_activity.to_utc()?);
    Ok(match elapsed.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => elapsed.num_seconds() as f64,
    })
}

/// Format elapsed seconds as a single magnitude: `42s`, `5.5m`, `2.0h`, `7.0d`
pub fn format_idle(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.0}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else if seconds < 86400.0 {
        format!("{:.1}h", seconds / 3600.0)
    } else {
        format!("{:.1}d", seconds / 86400.0)
    }
}

/// Idle time of a resource for display, `unknown` when it cannot be computed
pub fn format_idle_since(last_activity: Option<&ActivityTimestamp>, now: DateTime<Utc>) -> String {
    match last_activity {
        None => "unknown".to_string(),
        Some(ts) => match idle_seconds(Some(ts), now) {
            Ok(seconds) => format_idle(seconds),
            Err(_) => "unknown".to_string(),
        },
    }
}

/// Convert a timeout in minutes to the seconds threshold used by comparisons
pub fn timeout_seconds(minutes: u64) -> f64 {
    (minutes as f64) * 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_format_idle_boundaries() {
        assert_eq!(format_idle(0.0), "0s");
        assert_eq!(format_idle(59.0), "59s");
        assert_eq!(format_idle(60.0), "1.0m");
        assert_eq!(format_idle(3599.0), "60.0m");
        assert_eq!(format_idle(3600.0), "1.0h");
        assert_eq!(format_idle(86399.0), "24.0h");
        assert_eq!(format_idle(86400.0), "1.0d");
        assert_eq!(format_idle(7.0 * 86400.0), "7.0d");
    }

    #[test]
    fn test_idle_seconds_absent() {
        assert_eq!(idle_seconds(None, fixed_now()).unwrap(), NO_ACTIVITY);
    }

    #[test]
    fn test_idle_seconds_structured() {
        let now = fixed_now();
        let ts = ActivityTimestamp::from(now - Duration::minutes(120));
        assert_eq!(idle_seconds(Some(&ts), now).unwrap(), 7200.0);
    }

    #[test]
    fn test_idle_seconds_naive_is_utc() {
        let now = fixed_now();
        let naive = (now - Duration::minutes(5)).naive_utc();
        let ts = ActivityTimestamp::from(naive);
        assert_eq!(idle_seconds(Some(&ts), now).unwrap(), 300.0);
    }

    #[test]
    fn test_idle_seconds_iso_with_z_suffix() {
        let ts = ActivityTimestamp::from("2025-06-01T11:00:00.000000Z");
        assert_eq!(idle_seconds(Some(&ts), fixed_now()).unwrap(), 3600.0);
    }

    #[test]
    fn test_idle_seconds_iso_with_offset() {
        let ts = ActivityTimestamp::from("2025-06-01T13:00:00+02:00");
        assert_eq!(idle_seconds(Some(&ts), fixed_now()).unwrap(), 3600.0);
    }

    #[test]
    fn test_idle_seconds_iso_without_zone() {
        let ts = ActivityTimestamp::from("2025-06-01T11:30:00");
        assert_eq!(idle_seconds(Some(&ts), fixed_now()).unwrap(), 1800.0);

        let ts = ActivityTimestamp::from("2025-06-01 11:59:30.5");
        assert_eq!(idle_seconds(Some(&ts), fixed_now()).unwrap(), 29.5);
    }

    #[test]
    fn test_idle_seconds_rejects_garbage() {
        let ts = ActivityTimestamp::from("yesterday");
        assert!(matches!(
            idle_seconds(Some(&ts), fixed_now()),
            Err(CullerError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_format_idle_since() {
        let now = fixed_now();
        assert_eq!(format_idle_since(None, now), "unknown");
        assert_eq!(
            format_idle_since(Some(&ActivityTimestamp::from("not a date")), now),
            "unknown"
        );
        let ts = ActivityTimestamp::from(now - Duration::hours(3));
        assert_eq!(format_idle_since(Some(&ts), now), "3.0h");
    }

    #[test]
    fn test_timestamp_deserializes_from_json_string() {
        let ts: ActivityTimestamp = serde_json::from_str("\"2025-06-01T11:00:00Z\"").unwrap();
        assert_eq!(ts.to_utc().unwrap(), Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap());

        let ts: ActivityTimestamp = serde_json::from_str("\"garbage\"").unwrap();
        assert_eq!(ts, ActivityTimestamp::Iso("garbage".into()));
    }

    #[test]
    fn test_timeout_seconds() {
        assert_eq!(timeout_seconds(60), 3600.0);
        assert_eq!(timeout_seconds(0), 0.0);
    }

    #[test]
    fn test_now_returns_time() {
        let t1 = now_utc();
        let t2 = now_utc();
        assert!(t2 >= t1);
    }
}
