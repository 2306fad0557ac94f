//! Rate-limit detection over captured terminal frames, with suppression of
//! matches that sit inside code, REPL output or diffs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::reset_time::{clock_reading, resolve_reset_time, HIT_LIMIT_RESETS};
use super::{floor_boundary, strip_ansi, RateLimitSignal};
use crate::clock::Clock;

/// Reset clock reading that closes the primary screen: "at 7pm (America/Chicago)"
const RESET_CLOCK: &str = r"\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s*(?:\(([^)]+)\))?";

/// "Claude usage limit reached. Your limit will reset at 7pm (America/Chicago)."
/// The two halves may sit on different lines. Used when the configured cues
/// do not compile.
static USAGE_LIMIT_REACHED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)claude\s+usage\s+limit\s+reached.*?limit\s+will\s+reset{}",
        RESET_CLOCK
    ))
    .unwrap()
});

/// A numbered menu entry such as "❯ 1. Stop and wait for limit to reset"
static MENU_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:❯\s*)?\d+\.\s+(.+)$").unwrap());

/// Signatures of code, REPL sessions and diffs around a match
const CODE_INDICATORS: &[&str] = &[
    "content = \"",
    "content=\"",
    "= \"claude",
    ">>> ",
    "... ",
    "\n+",
];

/// Bytes of leading context inspected for code signatures
const CODE_CONTEXT_BYTES: usize = 50;

/// Tunables for frame scanning.
///
/// The bullet-style message is only trusted near the bottom of the frame,
/// or anywhere when all four cues agree that the live rate-limit screen is
/// showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneDetectorConfig {
    /// How many lines count as "the bottom of the frame"; trailing blank
    /// space is ignored, blank lines above it are counted
    pub tail_lines: usize,
    /// Assistant name token
    pub assistant_cue: String,
    /// "usage limit" token
    pub usage_cue: String,
    /// "limit will reset" token
    pub reset_cue: String,
    /// Words one of the numbered menu entries must contain
    pub menu_options: Vec<String>,
}

impl Default for PaneDetectorConfig {
    fn default() -> Self {
        Self {
            tail_lines: 15,
            assistant_cue: "claude".to_string(),
            usage_cue: "usage limit".to_string(),
            reset_cue: "limit will reset".to_string(),
            menu_options: vec!["wait".to_string(), "upgrade".to_string()],
        }
    }
}

/// A rate-limit screen found in a captured frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneRateLimit {
    /// Reset hour, 24-hour form
    pub reset_hour: u32,
    /// Reset minute
    pub reset_minute: u32,
    /// Timezone as written, if any
    pub timezone: Option<String>,
    /// The matched text
    pub raw_match: String,
}

impl PaneRateLimit {
    /// Resolve to the next reset instant
    pub fn to_signal(&self, clock: &dyn Clock) -> Option<RateLimitSignal> {
        resolve_reset_time(
            self.reset_hour,
            self.reset_minute,
            self.timezone.as_deref(),
            clock,
        )
        .map(RateLimitSignal::ResetAt)
    }
}

/// Detector for full captured terminal frames
#[derive(Debug, Clone)]
pub struct PaneDetector {
    config: PaneDetectorConfig,
    /// "<assistant> <usage cue> reached ... <reset cue> at H[:MM]am|pm [(TZ)]"
    primary: Regex,
}

impl PaneDetector {
    /// Create a detector with the given tunables
    pub fn new(config: PaneDetectorConfig) -> Self {
        let primary = primary_pattern(&config);
        Self { config, primary }
    }

    /// Tunables in use
    pub fn config(&self) -> &PaneDetectorConfig {
        &self.config
    }

    /// Look for a live rate-limit screen in `content`
    pub fn detect(&self, content: &str) -> Option<PaneRateLimit> {
        let plain = strip_ansi(content);

        if let Some(hit) = find_live_match(&self.primary, &plain) {
            debug!(matched = %hit.raw_match, "Usage-limit screen detected");
            return Some(hit);
        }

        let tail = tail_lines(&plain, self.config.tail_lines.max(1));
        if let Some(hit) = find_live_match(&HIT_LIMIT_RESETS, tail) {
            debug!(matched = %hit.raw_match, "Limit notice detected in frame tail");
            return Some(hit);
        }

        if self.has_confirming_cues(&plain) {
            if let Some(hit) = find_live_match(&HIT_LIMIT_RESETS, &plain) {
                debug!(matched = %hit.raw_match, "Limit notice confirmed by screen cues");
                return Some(hit);
            }
        }

        None
    }

    /// All four cues present: assistant name, "usage limit", "limit will
    /// reset" and a numbered menu offering one of the configured options
    fn has_confirming_cues(&self, plain: &str) -> bool {
        let lower = plain.to_lowercase();
        let cfg = &self.config;
        if !(lower.contains(&cfg.assistant_cue.to_lowercase())
            && lower.contains(&cfg.usage_cue.to_lowercase())
            && lower.contains(&cfg.reset_cue.to_lowercase()))
        {
            return false;
        }
        MENU_ENTRY.captures_iter(&lower).any(|caps| {
            cfg.menu_options
                .iter()
                .any(|option| caps[1].contains(&option.to_lowercase()))
        })
    }
}

impl Default for PaneDetector {
    fn default() -> Self {
        Self::new(PaneDetectorConfig::default())
    }
}

/// A cue phrase as a pattern: words escaped, any whitespace between them
fn phrase(cue: &str) -> String {
    cue.split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn primary_pattern(config: &PaneDetectorConfig) -> Regex {
    let pattern = format!(
        r"(?is){}\s+{}\s+reached.*?{}{}",
        phrase(&config.assistant_cue),
        phrase(&config.usage_cue),
        phrase(&config.reset_cue),
        RESET_CLOCK
    );
    Regex::new(&pattern).unwrap_or_else(|e| {
        debug!("Falling back to the default screen pattern: {}", e);
        USAGE_LIMIT_REACHED.clone()
    })
}

/// First match of `pattern` that does not sit inside code or a diff
fn find_live_match(pattern: &Regex, text: &str) -> Option<PaneRateLimit> {
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if looks_like_code(text, whole.start(), whole.end()) {
            debug!(matched = whole.as_str(), "Ignoring match inside code excerpt");
            continue;
        }
        let Some((reset_hour, reset_minute)) = clock_reading(&caps) else {
            continue;
        };
        return Some(PaneRateLimit {
            reset_hour,
            reset_minute,
            timezone: caps.get(4).map(|m| m.as_str().trim().to_string()),
            raw_match: whole.as_str().trim().to_string(),
        });
    }
    None
}

fn looks_like_code(text: &str, start: usize, end: usize) -> bool {
    let from = floor_boundary(text, start.saturating_sub(CODE_CONTEXT_BYTES));
    let context = text[from..end].to_lowercase();
    CODE_INDICATORS.iter().any(|ind| context.contains(ind))
}

/// The last `n` lines of `text`, ignoring trailing blank space.
/// `n` must be at least 1.
fn tail_lines(text: &str, n: usize) -> &str {
    let trimmed = text.trim_end();
    match trimmed.rmatch_indices('\n').nth(n - 1) {
        Some((idx, _)) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
