//! Wait/resume state machine and its polling loop.
//!
//! [`RateLimitDaemon`] owns the episode state and performs one poll per
//! [`RateLimitDaemon::check_and_handle`] call; [`run_daemon`] drives it on a
//! fixed interval and publishes a [`DaemonSnapshot`] after every tick.

mod machine;
mod runner;
mod state;

pub use machine::{DaemonConfig, RateLimitDaemon};
pub use runner::{run_daemon, snapshot_channel, SnapshotReceiver, SnapshotSender};
pub use state::{DaemonPhase, DaemonSnapshot, DaemonState, EpisodeSummary, TickOutcome};
