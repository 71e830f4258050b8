// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MTG Arena companion daemon (`mtgcd`)
//!
//! Follows the game client's log, projects events into SQLite, and
//! broadcasts derived state to GUI clients over a local WebSocket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser as ClapParser;
use mtgc_core::Config;
use mtgc_daemon::lifecycle::{self, DaemonPaths};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Command-line surface. Only these flags reach the core; everything
/// else is configuration-by-default.
#[derive(Debug, ClapParser)]
#[command(name = "mtgcd", version, about = "MTG Arena companion daemon")]
struct Cli {
    /// Explicit client log path (defaults to the platform location)
    #[arg(long)]
    log_file_path: Option<PathBuf>,

    /// Polling interval in milliseconds for the fallback tailer back-end
    #[arg(long, default_value_t = 1000)]
    log_poll_interval: u64,

    /// Use filesystem notifications (falls back to polling on failure)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    log_use_fsnotify: bool,

    /// Database path (also settable via MTGA_DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Listener address for the REST/WebSocket surface
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
}

fn build_config(cli: Cli) -> Config {
    // CLI flag wins over the environment override.
    let db_path = cli
        .db_path
        .or_else(|| std::env::var_os("MTGA_DB_PATH").map(PathBuf::from));
    Config {
        log_file_path: cli.log_file_path,
        log_poll_interval: Duration::from_millis(cli.log_poll_interval.max(1)),
        log_use_fsnotify: cli.log_use_fsnotify,
        db_path,
        bind_addr: cli.bind,
        ..Config::default()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = build_config(cli);

    let paths = match DaemonPaths::resolve(&config) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("mtgcd: {e}");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = std::fs::create_dir_all(&paths.state_dir) {
        eprintln!("mtgcd: cannot create state dir: {e}");
        std::process::exit(2);
    }
    rotate_log_if_needed(&paths.log_path);
    let _log_guard = match setup_logging(&paths.log_path) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mtgcd: logging setup failed: {e}");
            std::process::exit(2);
        }
    };

    info!("starting companion daemon");

    let daemon = match lifecycle::startup(&config, &paths).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!("startup failed: {e}");
            eprintln!("mtgcd: {e}");
            std::process::exit(e.exit_code());
        }
    };

    println!("READY {}", daemon.bound_addr());

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
        }
        _ => {
            error!("signal handler installation failed");
            daemon.stop().await;
            std::process::exit(2);
        }
    }

    daemon.stop().await;
    info!("daemon stopped");
}

/// Maximum daemon log size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon's own log at startup if it has grown too large.
/// Best-effort: failures are ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    log_path: &std::path::Path,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path
        .parent()
        .ok_or_else(|| std::io::Error::other("log path has no parent"))?;
    let name = log_path
        .file_name()
        .ok_or_else(|| std::io::Error::other("log path has no file name"))?;

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
