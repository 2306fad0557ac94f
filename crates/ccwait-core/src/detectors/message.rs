//! Rate-limit detection over short message text: stop-hook transcripts and
//! single assistant replies.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::reset_time::parse_reset_time;
use super::wait::extract_wait_seconds;
use super::RateLimitSignal;
use crate::clock::Clock;

/// Wait used when rate-limit wording is present but no time can be read
pub const DEFAULT_WAIT_SECS: i64 = 300;

/// Wording that marks text as being about a rate limit at all
static RATE_LIMIT_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)usage\s+limit|rate[\s_]?limit|limit\s+reached|hit\s+your\s+limit|\b429\b|too\s+many\s+requests|try\s+again",
    )
    .unwrap()
});

/// Detector for short messages (hook input, transcript entries).
///
/// Text must carry rate-limit wording before any time is extracted, so an
/// ordinary stop never turns into a wait.
#[derive(Debug, Clone)]
pub struct MessageDetector {
    default_wait_secs: i64,
}

impl MessageDetector {
    /// Create a detector with the 300-second fallback wait
    pub fn new() -> Self {
        Self {
            default_wait_secs: DEFAULT_WAIT_SECS,
        }
    }

    /// Create a detector with a custom fallback wait
    pub fn with_default_wait(default_wait_secs: i64) -> Self {
        Self { default_wait_secs }
    }

    /// Whether `text` mentions a rate limit
    pub fn mentions_rate_limit(&self, text: &str) -> bool {
        RATE_LIMIT_KEYWORDS.is_match(text)
    }

    /// Detect a rate limit in `text`.
    ///
    /// An explicit reset time beats a relative wait; wording without any
    /// readable time yields the fallback wait.
    pub fn detect(&self, text: &str, clock: &dyn Clock) -> Option<RateLimitSignal> {
        if !self.mentions_rate_limit(text) {
            return None;
        }
        debug!("Rate limit wording found");

        if let Some(at) = parse_reset_time(text, clock) {
            return Some(RateLimitSignal::ResetAt(at));
        }
        if let Some(secs) = extract_wait_seconds(text) {
            return Some(RateLimitSignal::WaitSeconds(secs));
        }

        debug!(
            default_wait_secs = self.default_wait_secs,
            "No readable time, using default wait"
        );
        Some(RateLimitSignal::WaitSeconds(self.default_wait_secs))
    }
}

impl Default for MessageDetector {
    fn default() -> Self {
        Self::new()
    }
}
