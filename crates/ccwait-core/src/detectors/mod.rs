//! Rate-limit detection over free text.
//!
//! Two entry points share the same time and duration rules:
//! - [`MessageDetector`] for short messages and hook transcripts
//! - [`PaneDetector`] for full captured terminal frames, with false-positive
//!   suppression for code and diff excerpts

mod message;
mod pane;
mod reset_time;
mod wait;

pub use message::{MessageDetector, DEFAULT_WAIT_SECS};
pub use pane::{PaneDetector, PaneDetectorConfig, PaneRateLimit};
pub use reset_time::{parse_reset_time, resolve_reset_time, to_24_hour};
pub use wait::extract_wait_seconds;

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Outcome of a successful match: either an absolute reset instant or a
/// relative wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitSignal {
    /// Limit lifts at this instant
    ResetAt(DateTime<FixedOffset>),
    /// Limit lifts after this many seconds
    WaitSeconds(i64),
}

impl RateLimitSignal {
    /// Seconds from `now` until the limit lifts (may be negative for a
    /// reset instant already in the past)
    pub fn wait_seconds(&self, now: DateTime<Utc>) -> i64 {
        match self {
            RateLimitSignal::ResetAt(at) => at
                .with_timezone(&Utc)
                .signed_duration_since(now)
                .num_seconds(),
            RateLimitSignal::WaitSeconds(secs) => *secs,
        }
    }

    /// The reset instant, if this signal carries one
    pub fn reset_at(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            RateLimitSignal::ResetAt(at) => Some(*at),
            RateLimitSignal::WaitSeconds(_) => None,
        }
    }
}

/// Remove OSC and CSI escape sequences from captured terminal output
pub fn strip_ansi(input: &str) -> String {
    static OSC_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)").unwrap());
    static CSI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap());

    let without_osc = OSC_RE.replace_all(input, "");
    CSI_RE.replace_all(&without_osc, "").to_string()
}

/// Byte index at or before `index` that sits on a char boundary
pub(crate) fn floor_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_strip_ansi() {
        let input = "\x1b[31mClaude usage limit reached\x1b[0m \x1b]0;title\x07done";
        assert_eq!(strip_ansi(input), "Claude usage limit reached done");
    }

    #[test]
    fn test_floor_boundary_multibyte() {
        let s = "a·b";
        // '·' is two bytes starting at 1
        assert_eq!(floor_boundary(s, 2), 1);
        assert_eq!(floor_boundary(s, 100), s.len());
    }

    #[test]
    fn test_signal_wait_seconds() {
        let now = Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap();
        let at = (now + chrono::Duration::minutes(10)).fixed_offset();
        assert_eq!(RateLimitSignal::ResetAt(at).wait_seconds(now), 600);
        assert_eq!(RateLimitSignal::WaitSeconds(42).wait_seconds(now), 42);
        assert_eq!(RateLimitSignal::WaitSeconds(42).reset_at(), None);
    }
}
