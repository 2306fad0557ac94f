use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use clap::CommandFactory;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ccwait::cli;
use ccwait::config::{Command, Config, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Config::parse_args();

    // Load settings; a broken config file must not break the Stop hook
    let mut settings = match Settings::load(args.config.as_ref()) {
        Ok(settings) => settings,
        Err(e) if args.is_hook_mode() => {
            eprintln!("cc-wait: {:#}, using defaults", e);
            Settings::default()
        }
        Err(e) => return Err(e),
    };
    settings.merge_env();
    settings.merge_cli(&args);
    settings.validate();

    // Setup logging
    setup_logging(settings.debug, args.is_hook_mode());

    let code = match args.command {
        // Usage fetches and tmux calls block; keep them off the runtime threads
        Some(Command::Status) => {
            tokio::task::spawn_blocking(move || cli::run_status(&settings)).await??
        }
        Some(Command::Detect) => {
            tokio::task::spawn_blocking(move || cli::run_detect(&settings)).await??
        }
        Some(Command::Daemon { .. }) => cli::run_daemon_loop(&settings).await?,
        Some(Command::Hook) => {
            tokio::task::spawn_blocking(move || cli::run_hook(&settings)).await??
        }
        Some(Command::Serve { .. }) => cli::run_serve(settings).await?,
        None => {
            Config::command().print_help()?;
            println!();
            0
        }
    };

    std::process::exit(code);
}

fn setup_logging(debug: bool, hook_mode: bool) {
    let filter = if debug {
        EnvFilter::new("ccwait=debug,ccwait_core=debug")
    } else if hook_mode {
        EnvFilter::new("ccwait=warn,ccwait_core=warn")
    } else {
        EnvFilter::new("ccwait=info,ccwait_core=info")
    };

    // The hook's stderr is shown to the user, so debug output goes to a file
    if debug && hook_mode {
        let log_file = dirs::home_dir()
            .map(|home| home.join(".claude").join("wait_hook_debug.log"))
            .and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .ok()
            });
        if let Some(file) = log_file {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
