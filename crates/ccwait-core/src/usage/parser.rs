//! Resolver for the usage API payload.
//!
//! Expected shape:
//! ```json
//! {
//!   "five_hour": { "utilization": 42.0, "resets_at": "2026-01-17T15:00:00Z" },
//!   "seven_day": { "utilization": 12.5, "resets_at": null },
//!   "seven_day_opus": null
//! }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::types::{UsageStatus, UsageWindow};

/// Resolve a raw payload into a [`UsageStatus`].
///
/// Fails soft: a payload that is not an object, or a window of the wrong
/// shape, yields `None`. Missing primary windows count as unused.
pub fn resolve(payload: &Value) -> Option<UsageStatus> {
    let Some(obj) = payload.as_object() else {
        debug!("Usage payload is not an object");
        return None;
    };

    let five_hour = optional_window(obj.get("five_hour"), "five_hour")?.unwrap_or_default();
    let seven_day = optional_window(obj.get("seven_day"), "seven_day")?.unwrap_or_default();
    let seven_day_opus = optional_window(obj.get("seven_day_opus"), "seven_day_opus")?;

    Some(UsageStatus {
        five_hour,
        seven_day,
        seven_day_opus,
    })
}

/// `Some(None)` when absent or null, `None` when malformed
fn optional_window(value: Option<&Value>, name: &str) -> Option<Option<UsageWindow>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(data @ Value::Object(_)) => {
            let window = parse_window(data);
            if window.is_none() {
                debug!(window = name, "Malformed usage window");
            }
            window.map(Some)
        }
        Some(_) => {
            debug!(window = name, "Usage window is not an object");
            None
        }
    }
}

fn parse_window(data: &Value) -> Option<UsageWindow> {
    let utilization = match data.get("utilization") {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::String(s)) => s.trim().parse().ok()?,
        Some(_) => return None,
    };
    let resets_at = data
        .get("resets_at")
        .and_then(Value::as_str)
        .and_then(parse_datetime);
    Some(UsageWindow::new(utilization, resets_at))
}

/// Parse an ISO-8601 timestamp.
///
/// A trailing `Z` or numeric offset is honoured; a timestamp without any
/// zone designator is taken as UTC. Unparseable input yields `None`.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_resolve_full_payload() {
        let payload = json!({
            "five_hour": { "utilization": 100.0, "resets_at": "2026-01-17T15:00:00Z" },
            "seven_day": { "utilization": 35, "resets_at": "2026-01-20T00:00:00+00:00" },
            "seven_day_opus": { "utilization": 12.5, "resets_at": null }
        });
        let status = resolve(&payload).unwrap();
        assert_eq!(
            status.five_hour,
            UsageWindow::new(
                100.0,
                Some(Utc.with_ymd_and_hms(2026, 1, 17, 15, 0, 0).unwrap())
            )
        );
        assert_eq!(status.seven_day.utilization, 35.0);
        assert_eq!(status.seven_day_opus, Some(UsageWindow::new(12.5, None)));
        assert!(status.is_limited());
    }

    #[test]
    fn test_resolve_missing_windows_default() {
        let status = resolve(&json!({})).unwrap();
        assert_eq!(status, UsageStatus::default());
        assert!(!status.is_limited());

        let null_opus = resolve(&json!({ "five_hour": {}, "seven_day_opus": null })).unwrap();
        assert_eq!(null_opus.seven_day_opus, None);
    }

    #[test]
    fn test_resolve_fails_soft() {
        assert_eq!(resolve(&json!("nope")), None);
        assert_eq!(resolve(&json!({ "five_hour": 42 })), None);
        assert_eq!(
            resolve(&json!({ "five_hour": { "utilization": "lots" } })),
            None
        );
        assert_eq!(
            resolve(&json!({ "seven_day": { "utilization": [1] } })),
            None
        );
    }

    #[test]
    fn test_invalid_reset_time_is_dropped() {
        let status = resolve(&json!({
            "five_hour": { "utilization": 10, "resets_at": "tomorrow-ish" }
        }))
        .unwrap();
        assert_eq!(status.five_hour.resets_at, None);
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 17, 15, 0, 0).unwrap();
        assert_eq!(parse_datetime("2026-01-17T15:00:00Z"), Some(expected));
        assert_eq!(parse_datetime("2026-01-17T15:00:00+00:00"), Some(expected));
        assert_eq!(parse_datetime("2026-01-17T17:00:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("2026-01-17T15:00:00"), Some(expected));
        assert_eq!(
            parse_datetime("2026-01-17T15:00:00.250000+00:00").map(|d| d.timestamp()),
            Some(expected.timestamp())
        );
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("garbage"), None);
    }
}
