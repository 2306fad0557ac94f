use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use super::command::{run_with_timeout, CommandOutput};
use super::pane::PaneInfo;

/// Accepted tmux targets: a pane id (`%3`) or `session:window.pane`
static TARGET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:%\d+|[A-Za-z0-9_.-]+:\d+\.\d+)$").expect("Invalid TARGET_PATTERN regex")
});

/// Validate tmux target format to prevent command injection
fn validate_target(target: &str) -> Result<()> {
    if !TARGET_PATTERN.is_match(target) {
        anyhow::bail!("Invalid tmux target format: {}", target);
    }
    Ok(())
}

/// Client for interacting with tmux; every invocation carries a timeout
pub struct TmuxClient {
    timeout: Duration,
}

impl TmuxClient {
    /// Creates a new TmuxClient with the default 5 second timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Creates a new TmuxClient with a custom per-call timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = run_with_timeout("tmux", args, self.timeout)?;
        if !output.status.success() {
            anyhow::bail!(
                "tmux {} failed: {}",
                args.first().copied().unwrap_or_default(),
                output.stderr.trim()
            );
        }
        Ok(output)
    }

    /// Check if tmux is available and a server is running
    pub fn is_available(&self) -> bool {
        self.run(&["list-sessions"]).is_ok()
    }

    /// Lists all panes across all sessions
    pub fn list_panes(&self) -> Result<Vec<PaneInfo>> {
        let output = self.run(&["list-panes", "-a", "-F", PaneInfo::FORMAT])?;
        Ok(output.stdout.lines().filter_map(PaneInfo::parse).collect())
    }

    /// Captures the last `lines` lines of a pane without ANSI codes
    pub fn capture_pane(&self, target: &str, lines: usize) -> Result<String> {
        validate_target(target)?;
        let start_line = format!("-{}", lines);
        let output = self.run(&["capture-pane", "-p", "-t", target, "-S", &start_line])?;
        Ok(output.stdout)
    }

    /// Sends keys to a specific pane
    pub fn send_keys(&self, target: &str, keys: &str) -> Result<()> {
        validate_target(target)?;
        self.run(&["send-keys", "-t", target, keys])?;
        Ok(())
    }

    /// Sends literal keys (with -l flag) to a specific pane
    pub fn send_keys_literal(&self, target: &str, keys: &str) -> Result<()> {
        validate_target(target)?;
        self.run(&["send-keys", "-t", target, "-l", keys])?;
        Ok(())
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target_valid() {
        assert!(validate_target("%0").is_ok());
        assert!(validate_target("%123").is_ok());
        assert!(validate_target("main:0.1").is_ok());
        assert!(validate_target("my-session:10.2").is_ok());
        assert!(validate_target("dev_env.v2:3.0").is_ok());
    }

    #[test]
    fn test_validate_target_invalid() {
        assert!(validate_target("").is_err());
        assert!(validate_target("%").is_err());
        assert!(validate_target("%1; rm -rf /").is_err());
        assert!(validate_target("main").is_err());
        assert!(validate_target("main:0").is_err());
        assert!(validate_target("main:0.1 -t other").is_err());
        assert!(validate_target("$(whoami):0.1").is_err());
    }

    #[test]
    fn test_invalid_target_rejected_before_exec() {
        let client = TmuxClient::with_timeout(Duration::from_millis(10));
        let err = client.send_keys("bad target", "Enter").unwrap_err();
        assert!(err.to_string().contains("Invalid tmux target"));
    }
}
