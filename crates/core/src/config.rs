// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! A `Config` value is built once at startup (from CLI flags and the
//! `MTGA_DB_PATH` environment override) and passed explicitly to every
//! component. There are no process-wide configuration globals.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the companion daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit log file path; `None` means probe the platform default.
    pub log_file_path: Option<PathBuf>,
    /// Polling interval for the fallback tailer back-end.
    pub log_poll_interval: Duration,
    /// Prefer filesystem notifications over polling.
    pub log_use_fsnotify: bool,
    /// Explicit database path; `None` means the platform default
    /// (or `MTGA_DB_PATH`, resolved by the caller before construction).
    pub db_path: Option<PathBuf>,
    /// Address the REST/WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// Per-subscriber outbound frame queue capacity.
    pub subscriber_queue: usize,
    /// Number of event fingerprints kept for duplicate suppression.
    pub dedup_window: usize,
    /// Maximum buffered unterminated-line size before the tailer discards.
    pub max_line_buffer: usize,
    /// Maximum parser candidate-buffer size before a malformed skip.
    pub max_event_buffer: usize,
    /// Rating cache TTL; zero means entries never expire.
    pub rating_ttl: Duration,
    /// Rating cache capacity (FIFO eviction beyond this).
    pub rating_cache_capacity: usize,
    /// Idle horizon after which an active draft session is marked stale.
    pub stale_after: Duration,
    /// Collect window for batching store writes into one transaction.
    pub write_batch_window: Duration,
    /// Window of consecutive read failures before the tailer reports a stall.
    pub stall_after: Duration,
    /// Per-component deadline during graceful shutdown.
    pub shutdown_deadline: Duration,
    /// Per-component startup attempts before startup fails.
    pub startup_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file_path: None,
            log_poll_interval: Duration::from_secs(1),
            log_use_fsnotify: true,
            db_path: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            subscriber_queue: 256,
            dedup_window: 4096,
            max_line_buffer: 1024 * 1024,
            max_event_buffer: 4 * 1024 * 1024,
            rating_ttl: Duration::from_secs(3600),
            rating_cache_capacity: 2048,
            stale_after: Duration::from_secs(3600),
            write_batch_window: Duration::from_millis(50),
            stall_after: Duration::from_secs(300),
            shutdown_deadline: Duration::from_secs(5),
            startup_retries: 3,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
