//! Injectable time source.
//!
//! Reset-time resolution, the daemon's "reset passed" check and the hook's
//! wait loop all read time through [`Clock`] so tests can pin "now".

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use parking_lot::Mutex;

/// Source of the current instant, the local zone and blocking sleeps
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Offset of the local zone, used when a reset time names no zone
    fn local_offset(&self) -> FixedOffset;

    /// Block the caller for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self) -> FixedOffset {
        Local::now().offset().fix()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to.
///
/// `sleep` advances time instantly and records the requested duration.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Create a clock pinned at `now` with a UTC local zone
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_offset(now, Utc.fix())
    }

    /// Create a clock pinned at `now` with the given local offset
    pub fn with_offset(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Move the clock to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }

    /// Durations passed to `sleep` so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn local_offset(&self) -> FixedOffset {
        self.offset
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        self.advance(step);
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn local_offset(&self) -> FixedOffset {
        (**self).local_offset()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_sleep_advances() {
        let start = Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.sleep(Duration::from_secs(90));
        clock.sleep(Duration::from_secs(30));

        assert_eq!(clock.now(), start + chrono::Duration::seconds(120));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(90), Duration::from_secs(30)]
        );
    }

    #[test]
    fn test_manual_clock_offset() {
        let start = Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap();
        let offset = FixedOffset::west_opt(6 * 3600).unwrap();
        let clock = ManualClock::with_offset(start, offset);
        assert_eq!(clock.local_offset(), offset);
    }
}
