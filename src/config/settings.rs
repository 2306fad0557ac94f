use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use ccwait_core::hook::MAX_WAIT_SECS;
use ccwait_core::{DaemonConfig, HookConfig, PaneDetectorConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    name = "cc-wait",
    author,
    version,
    about = "Automatically continue Claude Code sessions after rate limits reset."
)]
pub struct Config {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show current rate limit status
    Status,
    /// Detect rate-limited Claude sessions in tmux
    Detect,
    /// Run the rate limit monitor daemon
    Daemon {
        /// Poll interval in seconds
        #[arg(short = 'i', long)]
        interval: Option<u64>,
    },
    /// Run as a Claude Code Stop hook (reads JSON on stdin)
    Hook,
    /// Run the dashboard server with the daemon in the background
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Poll interval in seconds
        #[arg(short = 'i', long)]
        interval: Option<u64>,
    },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if running as a Stop hook
    pub fn is_hook_mode(&self) -> bool {
        matches!(self.command, Some(Command::Hook))
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between usage polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Number of lines to capture from panes
    #[serde(default = "default_capture_lines")]
    pub capture_lines: usize,

    /// Text typed into a pane to resume it
    #[serde(default = "default_resume_text")]
    pub resume_text: String,

    /// Timeout for each tmux invocation in milliseconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,

    /// Usage API settings
    #[serde(default)]
    pub usage: UsageSettings,

    /// Rate limit screen detection settings
    #[serde(default)]
    pub detection: DetectionSettings,

    /// Stop hook settings
    #[serde(default)]
    pub hook: HookSettings,

    /// Dashboard server settings
    #[serde(default)]
    pub web: WebSettings,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_capture_lines() -> usize {
    100
}

fn default_resume_text() -> String {
    "continue".to_string()
}

fn default_command_timeout() -> u64 {
    5000
}

/// Usage API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSettings {
    /// Usage endpoint
    #[serde(default = "default_usage_url")]
    pub url: String,

    /// Value of the `anthropic-beta` header
    #[serde(default = "default_beta_header")]
    pub beta_header: String,

    /// Request timeout in seconds
    #[serde(default = "default_usage_timeout")]
    pub timeout_secs: u64,

    /// Credentials file (default: ~/.claude/.credentials.json)
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

fn default_usage_url() -> String {
    "https://api.anthropic.com/api/oauth/usage".to_string()
}

fn default_beta_header() -> String {
    "oauth-2025-04-20".to_string()
}

fn default_usage_timeout() -> u64 {
    10
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            url: default_usage_url(),
            beta_header: default_beta_header(),
            timeout_secs: default_usage_timeout(),
            credentials_path: None,
        }
    }
}

impl UsageSettings {
    /// Credentials file to read the OAuth token from
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials_path
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".claude/.credentials.json")))
    }
}

/// Rate limit screen detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Trailing lines in which the short limit notice is trusted
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,

    /// Assistant name cue
    #[serde(default = "default_assistant_cue")]
    pub assistant_cue: String,

    /// "usage limit" cue
    #[serde(default = "default_usage_cue")]
    pub usage_cue: String,

    /// "limit will reset" cue
    #[serde(default = "default_reset_cue")]
    pub reset_cue: String,

    /// Words expected in the numbered rate-limit menu
    #[serde(default = "default_menu_options")]
    pub menu_options: Vec<String>,

    /// Wait used when limit wording carries no time
    #[serde(default = "default_wait")]
    pub default_wait_secs: i64,
}

fn default_tail_lines() -> usize {
    15
}

fn default_assistant_cue() -> String {
    "claude".to_string()
}

fn default_usage_cue() -> String {
    "usage limit".to_string()
}

fn default_reset_cue() -> String {
    "limit will reset".to_string()
}

fn default_menu_options() -> Vec<String> {
    vec!["wait".to_string(), "upgrade".to_string()]
}

fn default_wait() -> i64 {
    300
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            tail_lines: default_tail_lines(),
            assistant_cue: default_assistant_cue(),
            usage_cue: default_usage_cue(),
            reset_cue: default_reset_cue(),
            menu_options: default_menu_options(),
            default_wait_secs: default_wait(),
        }
    }
}

/// Stop hook settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSettings {
    /// Upper bound on a single wait (6 hours)
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: i64,

    /// Seconds between progress lines while waiting
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: i64,

    /// Transcript lines read from the end of the file
    #[serde(default = "default_transcript_lines")]
    pub transcript_lines: usize,

    /// Most recent transcript entries searched
    #[serde(default = "default_transcript_entries")]
    pub transcript_entries: usize,

    /// Terminal output log checked before the transcript
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

fn default_max_wait() -> i64 {
    6 * 3600
}

fn default_update_interval() -> i64 {
    300
}

fn default_transcript_lines() -> usize {
    100
}

fn default_transcript_entries() -> usize {
    20
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            max_wait_secs: default_max_wait(),
            update_interval_secs: default_update_interval(),
            transcript_lines: default_transcript_lines(),
            transcript_entries: default_transcript_entries(),
            output_file: None,
        }
    }
}

/// Dashboard server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSettings {
    /// Host to bind to
    #[serde(default = "default_web_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_web_port")]
    pub port: u16,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8000
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            capture_lines: default_capture_lines(),
            resume_text: default_resume_text(),
            command_timeout_ms: default_command_timeout(),
            debug: false,
            usage: UsageSettings::default(),
            detection: DetectionSettings::default(),
            hook: HookSettings::default(),
            web: WebSettings::default(),
        }
    }
}

/// `1`, `true` or `yes`, any case
fn env_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read(p);
            }
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("cc-wait/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/cc-wait/config.toml")),
            dirs::home_dir().map(|p| p.join(".cc-wait.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        Ok(Self::default())
    }

    fn read(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Apply environment overrides (after the file, before CLI flags)
    pub fn merge_env(&mut self) {
        if let Ok(value) = std::env::var("CC_WAIT_POLL_INTERVAL") {
            match value.trim().parse() {
                Ok(secs) => self.poll_interval_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid CC_WAIT_POLL_INTERVAL: {}", value),
            }
        }
        if let Ok(value) = std::env::var("CC_WAIT_DEBUG") {
            if env_flag(&value) {
                self.debug = true;
            }
        }
        if let Ok(value) = std::env::var("CC_OUTPUT_FILE") {
            if !value.trim().is_empty() {
                self.hook.output_file = Some(PathBuf::from(value.trim()));
            }
        }
        if let Ok(value) = std::env::var("PORT") {
            match value.trim().parse() {
                Ok(port) => self.web.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT: {}", value),
            }
        }
        if let Ok(value) = std::env::var("HOST") {
            if !value.trim().is_empty() {
                self.web.host = value.trim().to_string();
            }
        }
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if cli.debug {
            self.debug = true;
        }
        match &cli.command {
            Some(Command::Daemon { interval }) => {
                if let Some(interval) = interval {
                    self.poll_interval_secs = *interval;
                }
            }
            Some(Command::Serve {
                port,
                host,
                interval,
            }) => {
                if let Some(port) = port {
                    self.web.port = *port;
                }
                if let Some(host) = host {
                    self.web.host = host.clone();
                }
                if let Some(interval) = interval {
                    self.poll_interval_secs = *interval;
                }
            }
            _ => {}
        }
    }

    /// Validate and normalize settings values
    ///
    /// Intervals and windows are kept at a minimum of 1 so that loops always
    /// make progress.
    pub fn validate(&mut self) {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.capture_lines = self.capture_lines.max(1);
        self.command_timeout_ms = self.command_timeout_ms.max(1);
        self.usage.timeout_secs = self.usage.timeout_secs.max(1);
        self.detection.tail_lines = self.detection.tail_lines.max(1);
        self.hook.update_interval_secs = self.hook.update_interval_secs.max(1);
        self.hook.max_wait_secs = self.hook.max_wait_secs.clamp(0, MAX_WAIT_SECS);
        self.hook.transcript_lines = self.hook.transcript_lines.max(1);
        self.hook.transcript_entries = self.hook.transcript_entries.max(1);
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn pane_detector_config(&self) -> PaneDetectorConfig {
        PaneDetectorConfig {
            tail_lines: self.detection.tail_lines,
            assistant_cue: self.detection.assistant_cue.clone(),
            usage_cue: self.detection.usage_cue.clone(),
            reset_cue: self.detection.reset_cue.clone(),
            menu_options: self.detection.menu_options.clone(),
        }
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            capture_lines: self.capture_lines,
            poll_interval_secs: self.poll_interval_secs,
        }
    }

    pub fn hook_config(&self) -> HookConfig {
        HookConfig {
            max_wait_secs: self.hook.max_wait_secs,
            update_interval_secs: self.hook.update_interval_secs,
            default_wait_secs: self.detection.default_wait_secs,
        }
    }
}
