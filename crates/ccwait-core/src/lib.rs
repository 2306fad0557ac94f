//! Core library for cc-wait.
//!
//! Everything here is free of process and network boundaries: the text
//! matchers, the usage model, the wait/resume state machine and the one-shot
//! hook engine all talk to the outside world through the [`clock::Clock`],
//! [`usage::UsageSource`] and [`sessions::SessionBackend`] traits.

pub mod clock;
pub mod daemon;
pub mod detectors;
pub mod format;
pub mod hook;
pub mod sessions;
pub mod usage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use daemon::{DaemonConfig, DaemonSnapshot, RateLimitDaemon, TickOutcome};
pub use detectors::{MessageDetector, PaneDetector, PaneDetectorConfig, RateLimitSignal};
pub use hook::{HookConfig, HookEngine, HookOutput, HookOutputError};
pub use sessions::{Session, SessionBackend};
pub use usage::{FetchError, UsageSource, UsageStatus, UsageWindow};
