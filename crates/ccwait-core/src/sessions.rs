//! Session model and the multiplexer boundary.

use serde::Serialize;
use tracing::debug;

use crate::detectors::{PaneDetector, PaneRateLimit};

/// A terminal pane that may be running the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Pane id (e.g. "%3")
    pub id: String,
    /// Session label shown to the user
    pub display_name: String,
    /// Command running in the pane at enumeration time
    pub last_known_command: String,
    /// Whether the captured text shows a live rate-limit screen
    pub rate_limited: bool,
    /// Reset time as shown on screen, when limited
    pub reset_hint: Option<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        last_known_command: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            last_known_command: last_known_command.into(),
            rate_limited: false,
            reset_hint: None,
        }
    }
}

/// The multiplexer boundary.
///
/// Every method is fail-soft: an unavailable tool or a timed out call yields
/// an empty list, an empty string or `false`.
pub trait SessionBackend: Send + Sync {
    /// Whether the multiplexer can be reached at all
    fn is_available(&self) -> bool;

    /// Candidate sessions, without rate-limit flags
    fn list_sessions(&self) -> Vec<Session>;

    /// The last `lines` lines of a session's output
    fn capture(&self, id: &str, lines: usize) -> String;

    /// Send the resume keystrokes; `true` on success
    fn resume(&self, id: &str) -> bool;
}

impl<T: SessionBackend + ?Sized> SessionBackend for std::sync::Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn list_sessions(&self) -> Vec<Session> {
        (**self).list_sessions()
    }

    fn capture(&self, id: &str, lines: usize) -> String {
        (**self).capture(id, lines)
    }

    fn resume(&self, id: &str) -> bool {
        (**self).resume(id)
    }
}

/// Render the on-screen reset time, e.g. "19:00 (America/Chicago)"
pub fn reset_hint(hit: &PaneRateLimit) -> String {
    let time = format!("{:02}:{:02}", hit.reset_hour, hit.reset_minute);
    match &hit.timezone {
        Some(tz) => format!("{} ({})", time, tz),
        None => time,
    }
}

/// Enumerate sessions and flag the ones whose recent output shows a limit
pub fn scan_sessions(
    backend: &dyn SessionBackend,
    detector: &PaneDetector,
    capture_lines: usize,
) -> Vec<Session> {
    backend
        .list_sessions()
        .into_iter()
        .map(|mut session| {
            let content = backend.capture(&session.id, capture_lines);
            if let Some(hit) = detector.detect(&content) {
                debug!(session = %session.id, matched = %hit.raw_match, "Session is rate limited");
                session.rate_limited = true;
                session.reset_hint = Some(reset_hint(&hit));
            }
            session
        })
        .collect()
}

/// Only the sessions currently showing a rate-limit screen
pub fn find_rate_limited_sessions(
    backend: &dyn SessionBackend,
    detector: &PaneDetector,
    capture_lines: usize,
) -> Vec<Session> {
    scan_sessions(backend, detector, capture_lines)
        .into_iter()
        .filter(|s| s.rate_limited)
        .collect()
}
