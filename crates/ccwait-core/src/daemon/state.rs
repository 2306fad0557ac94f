//! Daemon state types.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::usage::UsageStatus;

/// Where the daemon is in the current episode
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DaemonPhase {
    /// Not limited
    #[default]
    Idle,
    /// Limited since `since`; `reset_at` is the last reset time reported
    Limited {
        since: DateTime<Utc>,
        reset_at: Option<DateTime<Utc>>,
    },
    /// Limit just cleared, resuming blocked sessions
    Resuming,
}

impl DaemonPhase {
    pub fn label(&self) -> &'static str {
        match self {
            DaemonPhase::Idle => "idle",
            DaemonPhase::Limited { .. } => "limited",
            DaemonPhase::Resuming => "resuming",
        }
    }

    /// True while waiting for the limit to clear
    pub fn is_waiting(&self) -> bool {
        matches!(self, DaemonPhase::Limited { .. })
    }
}

/// Mutable state owned by the polling loop
#[derive(Debug, Clone, Default)]
pub struct DaemonState {
    pub phase: DaemonPhase,
    /// Sessions already resumed in the current episode
    pub resumed: HashSet<String>,
    /// Whether "reset passed but still limited" was logged for the current
    /// reset time
    pub reset_warned: bool,
}

/// Result of one resume cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeSummary {
    /// Sessions the resume keystrokes were delivered to
    pub resumed: Vec<String>,
    /// Sessions where delivery failed
    pub failed: Vec<String>,
    /// Sessions already resumed in this episode
    pub skipped: Vec<String>,
}

/// What a single poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No usage status; nothing changed
    Unavailable,
    /// Not limited before or after
    StillIdle,
    /// Limit just observed
    EnteredLimited,
    /// Still waiting for the limit to clear
    StillLimited,
    /// Limit cleared and blocked sessions were handled
    Resumed(EpisodeSummary),
}

/// Read-only view published for the dashboard
#[derive(Debug, Clone, Default, Serialize)]
pub struct DaemonSnapshot {
    pub running: bool,
    pub waiting: bool,
    pub phase: String,
    pub poll_interval_secs: u64,
    pub reset_at: Option<DateTime<Utc>>,
    pub last_status: Option<UsageStatus>,
    pub last_check: Option<DateTime<Utc>>,
    pub last_episode: Option<EpisodeSummary>,
}
