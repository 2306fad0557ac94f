//! cc-wait: wait out Claude Code rate limits and resume blocked tmux
//! sessions once the limit resets.

pub mod cli;
pub mod config;
pub mod hook;
pub mod oauth;
pub mod tmux;
pub mod web;
