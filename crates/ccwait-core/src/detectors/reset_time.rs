//! Reset-time rules: "reset at 7pm (Asia/Tokyo)", "resets at 14:00",
//! "hit your limit · resets 2am".

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::clock::Clock;

/// "reset at 7pm", "reset at 3:30pm (America/New_York)", "reset at 9"
static RESET_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)reset\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:\(([^)]+)\))?").unwrap()
});

/// "resets at 14:00"
static RESETS_AT_24H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)resets?\s+at\s+(\d{1,2}):(\d{2})").unwrap());

/// "You've hit your limit · resets 2am (America/Chicago)", also with `-`
pub(crate) static HIT_LIMIT_RESETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)hit\s+your\s+limit\s*[·\-]\s*resets\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s*(?:\(([^)]+)\))?",
    )
    .unwrap()
});

/// Rules in precedence order
static RULES: Lazy<[(&'static str, &'static Regex); 3]> = Lazy::new(|| {
    [
        ("reset_at", &*RESET_AT),
        ("resets_at_24h", &*RESETS_AT_24H),
        ("hit_your_limit", &*HIT_LIMIT_RESETS),
    ]
});

/// Normalize an hour to 24-hour form.
///
/// With a meridiem the hour must be 1..=12 (`12am` is 0, `12pm` stays 12);
/// without one it must already be 0..=23.
pub fn to_24_hour(hour: u32, meridiem: Option<&str>) -> Option<u32> {
    match meridiem.map(|m| m.to_ascii_lowercase()) {
        Some(m) if (1..=12).contains(&hour) => match m.as_str() {
            "am" if hour == 12 => Some(0),
            "am" => Some(hour),
            "pm" if hour == 12 => Some(12),
            "pm" => Some(hour + 12),
            _ => None,
        },
        Some(_) => None,
        None if hour <= 23 => Some(hour),
        None => None,
    }
}

/// Extract a reset instant from `text`.
///
/// The first rule with a valid clock reading wins. The result is always in
/// the future relative to `clock`.
pub fn parse_reset_time(text: &str, clock: &dyn Clock) -> Option<DateTime<FixedOffset>> {
    for (name, rule) in RULES.iter() {
        let Some(caps) = rule.captures(text) else {
            continue;
        };
        let Some((hour, minute)) = clock_reading(&caps) else {
            debug!(rule = name, matched = &caps[0], "Rejected out-of-range reset time");
            continue;
        };
        let zone = caps.get(4).map(|m| m.as_str());
        debug!(rule = name, hour, minute, zone, "Matched reset time");
        if let Some(at) = resolve_reset_time(hour, minute, zone, clock) {
            return Some(at);
        }
    }
    None
}

/// Hour (24h) and minute from a rule's captures: 1 = hour, 2 = minute,
/// 3 = optional meridiem
pub(crate) fn clock_reading(caps: &Captures<'_>) -> Option<(u32, u32)> {
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if minute > 59 {
        return None;
    }
    let hour = to_24_hour(hour, caps.get(3).map(|m| m.as_str()))?;
    Some((hour, minute))
}

/// Resolve a time of day to the next instant it occurs.
///
/// `zone` is an IANA name; when absent or unknown the clock's local offset
/// is used. A time not after "now" rolls forward exactly 24 hours.
pub fn resolve_reset_time(
    hour: u32,
    minute: u32,
    zone: Option<&str>,
    clock: &dyn Clock,
) -> Option<DateTime<FixedOffset>> {
    let now = clock.now();
    match zone.and_then(parse_zone) {
        Some(tz) => next_occurrence(&tz, now, hour, minute),
        None => {
            if let Some(name) = zone {
                debug!(zone = name, "Unknown timezone, using local offset");
            }
            next_occurrence(&clock.local_offset(), now, hour, minute)
        }
    }
}

fn parse_zone(name: &str) -> Option<Tz> {
    let name = name.trim();
    name.parse::<Tz>()
        .ok()
        .or_else(|| Tz::from_str_insensitive(name).ok())
}

fn next_occurrence<Z: TimeZone>(
    zone: &Z,
    now: DateTime<Utc>,
    hour: u32,
    minute: u32,
) -> Option<DateTime<FixedOffset>> {
    let local_now = now.with_timezone(zone);
    let naive = local_now.date_naive().and_hms_opt(hour, minute, 0)?;
    // A wall time skipped by a forward DST shift lands an hour later
    let candidate = zone
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })?;
    let candidate = if candidate.with_timezone(&Utc) <= now {
        candidate + chrono::Duration::hours(24)
    } else {
        candidate
    };
    Some(candidate.fixed_offset())
}
