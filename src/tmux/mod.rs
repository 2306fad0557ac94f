//! tmux boundary: command execution, pane listing and the session backend.

mod client;
mod command;
mod pane;
mod sessions;

pub use client::TmuxClient;
pub use pane::PaneInfo;
pub use sessions::TmuxSessions;
