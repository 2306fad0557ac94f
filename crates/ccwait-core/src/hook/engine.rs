//! Wait-then-continue decision for a single Stop hook invocation.

use std::io::Write;
use std::time::Duration;

use tracing::{debug, info};

use super::schema::HookOutput;
use crate::clock::Clock;
use crate::detectors::{MessageDetector, RateLimitSignal, DEFAULT_WAIT_SECS};
use crate::format::format_duration;

/// Reason sent with `block` so the assistant picks the session back up
pub const CONTINUE_REASON: &str = "continue";

/// Hard ceiling on any single wait, whatever the configuration says
pub const MAX_WAIT_SECS: i64 = 6 * 3600;

/// Remaining time below which progress lines are no longer printed
const QUIET_REMAINING_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    /// Upper bound on any single wait, itself capped at [`MAX_WAIT_SECS`]
    pub max_wait_secs: i64,
    /// Sleep chunk between progress lines
    pub update_interval_secs: i64,
    /// Wait used when limit wording carries no time
    pub default_wait_secs: i64,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: MAX_WAIT_SECS,
            update_interval_secs: 300,
            default_wait_secs: DEFAULT_WAIT_SECS,
        }
    }
}

/// Stateless decision engine: every call re-derives its answer from the
/// text it is given.
pub struct HookEngine<C: Clock> {
    clock: C,
    detector: MessageDetector,
    config: HookConfig,
}

impl<C: Clock> HookEngine<C> {
    pub fn new(clock: C, config: HookConfig) -> Self {
        let detector = MessageDetector::with_default_wait(config.default_wait_secs);
        Self {
            clock,
            detector,
            config,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Find a signal in `text` and act on it
    pub fn decide(&self, text: &str, progress: &mut dyn Write) -> HookOutput {
        let signal = self.detector.detect(text, &self.clock);
        self.decide_signal(signal, progress)
    }

    /// Approve when there is nothing to wait for; otherwise wait out the
    /// limit (blocking the caller) and ask the assistant to continue.
    pub fn decide_signal(
        &self,
        signal: Option<RateLimitSignal>,
        progress: &mut dyn Write,
    ) -> HookOutput {
        let Some(signal) = signal else {
            debug!("No rate limit detected, approving stop");
            return HookOutput::approve();
        };

        let requested = signal.wait_seconds(self.clock.now());
        let cap = self.config.max_wait_secs.clamp(0, MAX_WAIT_SECS);
        let wait_secs = requested.clamp(0, cap);
        if wait_secs <= 0 {
            debug!(requested, "Limit already lapsed, approving stop");
            return HookOutput::approve();
        }
        if wait_secs < requested {
            debug!(requested, capped = wait_secs, "Capping wait");
        }

        let duration = format_duration(wait_secs);
        match signal.reset_at() {
            Some(at) => {
                info!(reset_at = %at, wait_secs, "Rate limited, waiting for reset");
                report(
                    progress,
                    &format!(
                        "⏳ Rate limit reached. Waiting until {} ({})...",
                        at.format("%H:%M %:z"),
                        duration
                    ),
                );
            }
            None => {
                info!(wait_secs, "Rate limited, waiting");
                report(progress, &format!("⏳ Rate limit reached. Waiting {}...", duration));
            }
        }

        self.wait(wait_secs, progress);

        report(progress, "✓ Rate limit reset. Continuing...");
        HookOutput::block(CONTINUE_REASON)
    }

    fn wait(&self, wait_secs: i64, progress: &mut dyn Write) {
        let chunk = self.config.update_interval_secs.max(1);
        let start = self.clock.now();
        let remaining = |now: chrono::DateTime<chrono::Utc>| {
            wait_secs - now.signed_duration_since(start).num_seconds()
        };

        loop {
            let left = remaining(self.clock.now());
            if left <= 0 {
                break;
            }
            let step = left.min(chunk);
            self.clock.sleep(Duration::from_secs(step as u64));

            let left = remaining(self.clock.now());
            if left > QUIET_REMAINING_SECS {
                report(progress, &format!("⏳ {} remaining...", format_duration(left)));
            }
        }
    }
}

/// Write one progress line; a closed diagnostic stream must not stop the wait
fn report(progress: &mut dyn Write, line: &str) {
    if let Err(e) = writeln!(progress, "{}", line) {
        debug!("Failed to write progress line: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn engine() -> HookEngine<ManualClock> {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 17, 10, 0, 0).unwrap());
        HookEngine::new(clock, HookConfig::default())
    }

    fn run(engine: &HookEngine<ManualClock>, text: &str) -> (HookOutput, String) {
        let mut progress = Vec::new();
        let output = engine.decide(text, &mut progress);
        (output, String::from_utf8(progress).unwrap())
    }

    #[test]
    fn test_approves_without_rate_limit() {
        let engine = engine();
        let (output, progress) = run(&engine, r#"{"session_id":"abc","stop_hook_active":false}"#);
        assert_eq!(output, HookOutput::approve());
        assert!(progress.is_empty());
        assert!(engine.clock().sleeps().is_empty());
    }

    #[test]
    fn test_waits_in_chunks_then_blocks() {
        let engine = engine();
        let (output, progress) = run(&engine, "Rate limit hit, try again in 15 minutes");
        assert_eq!(output, HookOutput::block(CONTINUE_REASON));
        assert_eq!(
            engine.clock().sleeps(),
            vec![Duration::from_secs(300); 3]
        );
        let lines: Vec<_> = progress.lines().collect();
        assert_eq!(
            lines,
            vec![
                "⏳ Rate limit reached. Waiting 15m...",
                "⏳ 10m remaining...",
                "⏳ 5m remaining...",
                "✓ Rate limit reset. Continuing...",
            ]
        );
    }

    #[test]
    fn test_waits_until_reset_time() {
        let engine = engine();
        let (output, progress) = run(&engine, "Your usage limit will reset at 11am");
        assert!(output.is_block());
        let total: u64 = engine.clock().sleeps().iter().map(|d| d.as_secs()).sum();
        assert_eq!(total, 3600);
        assert!(progress.starts_with("⏳ Rate limit reached. Waiting until 11:00 +00:00 (1h)"));
    }

    #[test]
    fn test_wait_capped_at_max() {
        let engine = engine();
        let (output, _) = run(&engine, "usage limit reached, try again in 10 hours");
        assert!(output.is_block());
        let total: u64 = engine.clock().sleeps().iter().map(|d| d.as_secs()).sum();
        assert_eq!(total, 6 * 3600);
    }

    #[test]
    fn test_configured_cap_cannot_exceed_six_hours() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 17, 10, 0, 0).unwrap());
        let engine = HookEngine::new(
            clock,
            HookConfig {
                max_wait_secs: 12 * 3600,
                ..HookConfig::default()
            },
        );
        let (output, _) = run(&engine, "usage limit reached, try again in 10 hours");
        assert!(output.is_block());
        let total: u64 = engine.clock().sleeps().iter().map(|d| d.as_secs()).sum();
        assert_eq!(total, MAX_WAIT_SECS as u64);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_progress_write_failure_still_waits_and_blocks() {
        let engine = engine();
        let output = engine.decide("Rate limit hit, try again in 15 minutes", &mut BrokenPipe);
        assert_eq!(output, HookOutput::block(CONTINUE_REASON));
        let total: u64 = engine.clock().sleeps().iter().map(|d| d.as_secs()).sum();
        assert_eq!(total, 900);
    }

    #[test]
    fn test_zero_wait_approves() {
        let engine = engine();
        let mut progress = Vec::new();
        let output = engine.decide_signal(Some(RateLimitSignal::WaitSeconds(0)), &mut progress);
        assert_eq!(output, HookOutput::approve());

        let past = (engine.clock().now() - chrono::Duration::minutes(5)).fixed_offset();
        let output = engine.decide_signal(Some(RateLimitSignal::ResetAt(past)), &mut progress);
        assert_eq!(output, HookOutput::approve());
        assert!(engine.clock().sleeps().is_empty());
    }

    #[test]
    fn test_short_wait_has_no_progress_lines() {
        let engine = engine();
        let (_, progress) = run(&engine, "429 too many requests, retry in 30 seconds");
        assert_eq!(
            progress.lines().collect::<Vec<_>>(),
            vec![
                "⏳ Rate limit reached. Waiting 30s...",
                "✓ Rate limit reset. Continuing...",
            ]
        );
    }

    #[test]
    fn test_default_wait_for_unreadable_time() {
        let engine = engine();
        let (output, _) = run(&engine, "rate_limit_error");
        assert!(output.is_block());
        assert_eq!(engine.clock().sleeps(), vec![Duration::from_secs(300)]);
    }
}
