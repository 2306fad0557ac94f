//! One poll tick of the wait/resume state machine.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::state::{DaemonPhase, DaemonSnapshot, DaemonState, EpisodeSummary, TickOutcome};
use crate::clock::Clock;
use crate::detectors::PaneDetector;
use crate::format::format_duration;
use crate::sessions::{find_rate_limited_sessions, Session, SessionBackend};
use crate::usage::{UsageSource, UsageStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Lines of pane history inspected per session
    pub capture_lines: usize,
    /// Seconds between polls, reported in snapshots
    pub poll_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            capture_lines: 100,
            poll_interval_secs: 60,
        }
    }
}

/// Rate-limit watcher.
///
/// The usage status is the source of truth for episodes: the daemon enters
/// `Limited` when any window is limited and resumes sessions only once the
/// status reports the limit cleared, whatever the clock says.
pub struct RateLimitDaemon<U, S, C> {
    usage: U,
    sessions: S,
    clock: C,
    detector: PaneDetector,
    config: DaemonConfig,
    state: DaemonState,
    last_status: Option<UsageStatus>,
    last_check: Option<DateTime<Utc>>,
    last_episode: Option<EpisodeSummary>,
}

impl<U, S, C> RateLimitDaemon<U, S, C>
where
    U: UsageSource,
    S: SessionBackend,
    C: Clock,
{
    pub fn new(
        usage: U,
        sessions: S,
        clock: C,
        detector: PaneDetector,
        config: DaemonConfig,
    ) -> Self {
        Self {
            usage,
            sessions,
            clock,
            detector,
            config,
            state: DaemonState::default(),
            last_status: None,
            last_check: None,
            last_episode: None,
        }
    }

    pub fn state(&self) -> &DaemonState {
        &self.state
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn last_status(&self) -> Option<&UsageStatus> {
        self.last_status.as_ref()
    }

    pub fn last_episode(&self) -> Option<&EpisodeSummary> {
        self.last_episode.as_ref()
    }

    /// Whether the multiplexer can be reached at all
    pub fn sessions_available(&self) -> bool {
        self.sessions.is_available()
    }

    /// Current state for the dashboard
    pub fn snapshot(&self, running: bool) -> DaemonSnapshot {
        let reset_at = match &self.state.phase {
            DaemonPhase::Limited { reset_at, .. } => *reset_at,
            _ => None,
        };
        DaemonSnapshot {
            running,
            waiting: self.state.phase.is_waiting(),
            phase: self.state.phase.label().to_string(),
            poll_interval_secs: self.config.poll_interval_secs,
            reset_at,
            last_status: self.last_status.clone(),
            last_check: self.last_check,
            last_episode: self.last_episode.clone(),
        }
    }

    /// Run one poll: fetch status, advance the episode, resume if cleared
    pub fn check_and_handle(&mut self) -> TickOutcome {
        let now = self.clock.now();
        self.last_check = Some(now);

        let status = match self.usage.fetch() {
            Ok(status) => status,
            Err(e) => {
                debug!("Usage status unavailable: {}", e);
                return TickOutcome::Unavailable;
            }
        };
        self.last_status = Some(status.clone());

        if status.is_limited() {
            let outcome = if self.state.phase.is_waiting() {
                self.track_reset_time(&status);
                TickOutcome::StillLimited
            } else {
                self.enter_limited(&status, now);
                TickOutcome::EnteredLimited
            };
            self.warn_if_reset_passed(now);
            return outcome;
        }

        if self.state.phase.is_waiting() {
            let summary = self.resume_blocked_sessions();
            return TickOutcome::Resumed(summary);
        }

        TickOutcome::StillIdle
    }

    fn enter_limited(&mut self, status: &UsageStatus, now: DateTime<Utc>) {
        let reset_at = status.next_reset();
        self.state.resumed.clear();
        self.state.reset_warned = false;
        self.state.phase = DaemonPhase::Limited {
            since: now,
            reset_at,
        };

        match reset_at {
            Some(at) => {
                let remaining = at.signed_duration_since(now).num_seconds().max(0);
                info!(
                    "Rate limit detected. Reset at {} ({})",
                    at.with_timezone(&self.clock.local_offset()).format("%H:%M"),
                    format_duration(remaining)
                );
            }
            None => info!("Rate limit detected."),
        }

        let blocked = self.blocked_sessions();
        if blocked.is_empty() {
            info!("No blocked sessions found (will check again at reset)");
        } else {
            info!(
                "Found {} blocked session(s): {}",
                blocked.len(),
                join_ids(&blocked)
            );
        }
    }

    /// Follow a reset time that moves while still limited; the warning
    /// re-arms for the new time
    fn track_reset_time(&mut self, status: &UsageStatus) {
        let next = status.next_reset();
        if let DaemonPhase::Limited { reset_at, .. } = &mut self.state.phase {
            if *reset_at != next {
                debug!(?next, "Reset time changed");
                *reset_at = next;
                self.state.reset_warned = false;
            }
        }
    }

    fn warn_if_reset_passed(&mut self, now: DateTime<Utc>) {
        if let DaemonPhase::Limited {
            reset_at: Some(at), ..
        } = self.state.phase
        {
            if now >= at && !self.state.reset_warned {
                warn!("Reset time reached, but usage still shows limited. Waiting...");
                self.state.reset_warned = true;
            }
        }
    }

    fn resume_blocked_sessions(&mut self) -> EpisodeSummary {
        self.state.phase = DaemonPhase::Resuming;
        info!("Rate limit reset!");

        let mut summary = EpisodeSummary::default();
        let blocked = self.blocked_sessions();
        if blocked.is_empty() {
            info!("No blocked sessions to continue");
        }

        for session in blocked {
            if self.state.resumed.contains(&session.id) {
                debug!("Skipping {} (already continued)", session.id);
                summary.skipped.push(session.id);
                continue;
            }
            if self.sessions.resume(&session.id) {
                info!("Sent continue to {} ({})", session.id, session.display_name);
                self.state.resumed.insert(session.id.clone());
                summary.resumed.push(session.id);
            } else {
                warn!("Failed to send continue to {}", session.id);
                summary.failed.push(session.id);
            }
        }

        self.state.phase = DaemonPhase::Idle;
        self.state.resumed.clear();
        self.state.reset_warned = false;
        self.last_episode = Some(summary.clone());
        summary
    }

    fn blocked_sessions(&self) -> Vec<Session> {
        if !self.sessions.is_available() {
            debug!("Session backend unavailable");
            return Vec::new();
        }
        find_rate_limited_sessions(&self.sessions, &self.detector, self.config.capture_lines)
    }
}

fn join_ids(sessions: &[Session]) -> String {
    sessions
        .iter()
        .map(|s| s.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
