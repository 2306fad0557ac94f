//! Relative wait rules: "in 30 seconds", "retry-after: 60", "in 5:30".

use once_cell::sync::Lazy;
use regex::Regex;

static AMOUNT_WITH_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(second|minute|hour|sec|min|hr)").unwrap());

static RETRY_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)retry[_-]?after["\s:]+(\d+)"#).unwrap());

static MINUTES_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bin\s+(\d+):(\d{2})\b").unwrap());

/// Extract a wait duration in seconds.
///
/// Rules are tried in order: amount with a unit word, a `retry-after`
/// header value, then an `in MM:SS` countdown.
pub fn extract_wait_seconds(text: &str) -> Option<i64> {
    if let Some(caps) = AMOUNT_WITH_UNIT.captures(text) {
        let amount: i64 = caps[1].parse().ok()?;
        let unit = caps[2].to_ascii_lowercase();
        let scale = if unit.starts_with("min") {
            60
        } else if unit.starts_with("hour") || unit == "hr" {
            3600
        } else {
            1
        };
        return amount.checked_mul(scale);
    }

    if let Some(caps) = RETRY_AFTER.captures(text) {
        return caps[1].parse().ok();
    }

    if let Some(caps) = MINUTES_SECONDS.captures(text) {
        let minutes: i64 = caps[1].parse().ok()?;
        let seconds: i64 = caps[2].parse().ok()?;
        return minutes.checked_mul(60)?.checked_add(seconds);
    }

    None
}
