//! `vigil` — Live terminal dashboard for admin backend monitoring.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `vigil-core`'s [`Monitor`](vigil_core::Monitor). Screens are navigable
//! via number keys (1-3): Dashboard, Platforms, and Alerts.
//!
//! Logs are written to a file (default `/tmp/vigil.log`) to avoid
//! corrupting the terminal UI. A background data bridge task continuously
//! forwards monitor state changes into the TUI action loop.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and app launch.

mod action;
mod app;
mod charts;
mod component;
mod data_bridge;
mod event;
mod notify;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vigil_core::{Monitor, MonitorConfig};

use crate::app::App;

/// Live terminal dashboard for monitoring an admin backend.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about)]
struct Cli {
    /// Backend base URL (e.g., http://127.0.0.1:8080)
    #[arg(short = 'u', long, env = "VIGIL_URL")]
    url: Option<String>,

    /// Config profile to use (defaults to the config file's default)
    #[arg(short = 'p', long, env = "VIGIL_PROFILE")]
    profile: Option<String>,

    /// Disable the WebSocket event stream (polling only)
    #[arg(long)]
    no_websocket: bool,

    /// Polling fallback interval in seconds (0 = never poll)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Log file path (defaults to /tmp/vigil.log)
    #[arg(long, default_value = "/tmp/vigil.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that would
/// corrupt the TUI output. Returns a guard that must be held for the
/// lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("vigil={log_level},vigil_core={log_level}"))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("vigil.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Build the monitor configuration. Priority: CLI flags > config file
/// profile > built-in defaults.
fn build_monitor_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match vigil_config::load_config() {
        Ok(cfg) => match vigil_config::select_profile(&cfg, cli.profile.as_deref()) {
            Ok((name, profile)) => {
                info!(profile = name, "using config profile");
                vigil_config::profile_to_monitor_config(profile, &cfg.defaults)?
            }
            Err(e) => {
                // An explicitly requested profile must exist.
                if cli.profile.is_some() {
                    return Err(e.into());
                }
                MonitorConfig::default()
            }
        },
        Err(_) => MonitorConfig::default(),
    };

    if let Some(url) = cli.url.as_deref() {
        config.url = url.parse()?;
    }
    if cli.no_websocket {
        config.websocket_enabled = false;
    }
    if let Some(interval) = cli.poll_interval {
        config.poll_interval_secs = interval;
    }
    // Keep the request timeout under the poll interval when both are set.
    if config.poll_interval_secs > 0 {
        config.timeout = config
            .timeout
            .min(Duration::from_secs(config.poll_interval_secs.max(5)));
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    let config = build_monitor_config(&cli)?;
    info!(url = %config.url, websocket = config.websocket_enabled, "starting vigil");

    let monitor = Monitor::new(config)?;
    let mut app = App::new(monitor);
    app.run().await?;

    Ok(())
}
