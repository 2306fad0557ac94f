//! Subcommand handlers
//!
//! `status` and `detect` write human output to a caller-supplied writer and
//! return the process exit code; `daemon` and `serve` run until Ctrl-C.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use ccwait_core::daemon::{run_daemon, snapshot_channel};
use ccwait_core::format::{format_bar, format_duration};
use ccwait_core::sessions::scan_sessions;
use ccwait_core::{Clock, PaneDetector, RateLimitDaemon, SessionBackend, SystemClock, UsageSource};

use crate::config::Settings;
use crate::oauth::OAuthUsageClient;
use crate::tmux::{TmuxClient, TmuxSessions};
use crate::web::{WebContext, WebServer};

/// Width of the utilization bar in `status`
const BAR_WIDTH: usize = 20;

/// Print every usage window; exit code 1 when usage cannot be fetched
pub fn status(usage: &dyn UsageSource, clock: &dyn Clock, out: &mut dyn Write) -> Result<i32> {
    let status = match usage.fetch() {
        Ok(status) => status,
        Err(e) => {
            debug!("Usage fetch failed: {}", e);
            writeln!(out, "Error: Could not fetch usage status.")?;
            writeln!(
                out,
                "Make sure you're logged into Claude Code (check ~/.claude/.credentials.json)"
            )?;
            return Ok(1);
        }
    };

    let now = clock.now();
    writeln!(out, "Claude Code Usage")?;
    writeln!(out)?;
    for (label, window) in status.windows() {
        let resets = window
            .resets_in_seconds(now)
            .map(format_duration)
            .unwrap_or_else(|| "N/A".to_string());
        let flag = if window.is_limited() { " ⚠️ LIMITED" } else { "" };
        writeln!(
            out,
            "{:<12}{:5.1}% {}  resets in {}{}",
            format!("{}:", label),
            window.utilization,
            format_bar(window.utilization, BAR_WIDTH),
            resets,
            flag
        )?;
    }

    if status.is_limited() {
        writeln!(out)?;
        match status.next_reset() {
            Some(at) => writeln!(
                out,
                "Rate limited. Next reset in {}.",
                format_duration(at.signed_duration_since(now).num_seconds())
            )?,
            None => writeln!(out, "Rate limited. Reset time unknown.")?,
        }
    }

    Ok(0)
}

/// List assistant panes and flag the rate-limited ones.
///
/// `manual_command` renders the keystrokes a user would send by hand.
pub fn detect(
    backend: &dyn SessionBackend,
    detector: &PaneDetector,
    capture_lines: usize,
    manual_command: &dyn Fn(&str) -> String,
    out: &mut dyn Write,
) -> Result<i32> {
    if !backend.is_available() {
        writeln!(out, "Error: tmux not available or no sessions running.")?;
        return Ok(1);
    }

    writeln!(out, "Scanning tmux panes for Claude sessions...")?;
    let sessions = scan_sessions(backend, detector, capture_lines);
    if sessions.is_empty() {
        writeln!(out, "No Claude sessions found in tmux.")?;
        return Ok(0);
    }

    writeln!(out, "Found {} Claude session(s):", sessions.len())?;
    writeln!(out)?;
    for session in &sessions {
        if session.rate_limited {
            let hint = session
                .reset_hint
                .as_deref()
                .map(|h| format!(" (resets {})", h))
                .unwrap_or_default();
            writeln!(
                out,
                "  ⚠️  {} ({}): RATE LIMITED{}",
                session.id, session.display_name, hint
            )?;
        } else {
            writeln!(out, "  ✓  {} ({}): OK", session.id, session.display_name)?;
        }
    }

    let limited: Vec<_> = sessions.iter().filter(|s| s.rate_limited).collect();
    writeln!(out)?;
    writeln!(out, "Rate limited: {}", limited.len())?;
    if !limited.is_empty() {
        writeln!(out)?;
        writeln!(out, "To manually continue these sessions:")?;
        for session in limited {
            writeln!(out, "  {}", manual_command(&session.id))?;
        }
    }

    Ok(0)
}

/// `status` against the configured usage endpoint
pub fn run_status(settings: &Settings) -> Result<i32> {
    let usage = OAuthUsageClient::new(&settings.usage);
    let stdout = std::io::stdout();
    status(&usage, &SystemClock, &mut stdout.lock())
}

/// `detect` against the local tmux server
pub fn run_detect(settings: &Settings) -> Result<i32> {
    let sessions = tmux_sessions(settings);
    let detector = PaneDetector::new(settings.pane_detector_config());
    let stdout = std::io::stdout();
    detect(
        &sessions,
        &detector,
        settings.capture_lines,
        &|id| sessions.manual_resume_command(id),
        &mut stdout.lock(),
    )
}

/// Run one Stop hook invocation over the process's standard streams
pub fn run_hook(settings: &Settings) -> Result<i32> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    crate::hook::run(
        settings,
        SystemClock,
        &mut stdin.lock(),
        &mut stdout.lock(),
        &mut stderr.lock(),
    )?;
    Ok(0)
}

/// Poll usage and resume sessions until Ctrl-C
pub async fn run_daemon_loop(settings: &Settings) -> Result<i32> {
    let daemon = RateLimitDaemon::new(
        OAuthUsageClient::new(&settings.usage),
        tmux_sessions(settings),
        SystemClock,
        PaneDetector::new(settings.pane_detector_config()),
        settings.daemon_config(),
    );
    let (snapshot_tx, _snapshot_rx) = snapshot_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    println!(
        "Starting cc-wait daemon (poll interval: {}s)",
        settings.poll_interval_secs
    );
    println!("Press Ctrl+C to stop");

    let runner = tokio::spawn(run_daemon(
        daemon,
        settings.poll_interval(),
        snapshot_tx,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down daemon");
    let _ = shutdown_tx.send(true);
    if let Err(e) = runner.await {
        warn!("Daemon task ended abnormally: {}", e);
    }

    Ok(0)
}

/// Serve the dashboard with the daemon running in the background
pub async fn run_serve(settings: Settings) -> Result<i32> {
    let usage = Arc::new(OAuthUsageClient::new(&settings.usage));
    let sessions = Arc::new(tmux_sessions(&settings));
    let detector = PaneDetector::new(settings.pane_detector_config());

    let (snapshot_tx, snapshot_rx) = snapshot_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let daemon = RateLimitDaemon::new(
        Arc::clone(&usage),
        Arc::clone(&sessions),
        SystemClock,
        detector.clone(),
        settings.daemon_config(),
    );
    let runner = tokio::spawn(run_daemon(
        daemon,
        settings.poll_interval(),
        snapshot_tx,
        shutdown_rx,
    ));

    let context = Arc::new(WebContext {
        usage,
        sessions,
        detector,
        clock: Arc::new(SystemClock),
        capture_lines: settings.capture_lines,
        daemon: snapshot_rx,
    });
    let server = WebServer::new(settings, context);

    let result = tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down dashboard");
            Ok(())
        }
    };

    let _ = shutdown_tx.send(true);
    if let Err(e) = runner.await {
        warn!("Daemon task ended abnormally: {}", e);
    }

    result.map(|_| 0)
}

fn tmux_sessions(settings: &Settings) -> TmuxSessions {
    TmuxSessions::new(
        TmuxClient::with_timeout(settings.command_timeout()),
        settings.resume_text.clone(),
    )
}
