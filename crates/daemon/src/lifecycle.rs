// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup ordering, recovery, reverse-order shutdown.
//!
//! Startup wires store → tailer → parser → machine → bus; any failure
//! tears down the components already started, in reverse. Shutdown walks
//! the same order backwards, giving each component a deadline.

use crate::adapters::{CachedRatings, StoreOffsetSink};
use crate::bus::ws::{self, WsCtx};
use crate::bus::Hub;
use crate::command::Command;
use crate::ingest;
use crate::replay::ReplayController;
use fs2::FileExt;
use mtgc_core::{Config, SystemClock, UuidIdGen};
use mtgc_engine::{
    select_session_for_signature, spawn_sweeper, RatingCache, SessionCandidate, SessionMachine,
};
use mtgc_parser::{Parser, ParserConfig, ParserMetrics};
use mtgc_store::{spawn_writer, Store, StoreError, WriterHandle};
use mtgc_tailer::{resolve_log_path, start_tailer, TailError, TailerConfig};
use parking_lot::Mutex;
use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Queue capacities for the pipeline channels.
const TAIL_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 256;
const WRITE_QUEUE: usize = 1024;
const COMMAND_QUEUE: usize = 16;

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("log path error: {0}")]
    Tail(#[from] TailError),

    #[error("failed to bind {0}: {1}")]
    BindFailed(SocketAddr, #[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LifecycleError {
    /// Process exit code: 1 configuration, 3 dirty migrations,
    /// 2 anything else unrecoverable.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoStateDir
            | Self::Tail(
                TailError::PathMissing { .. }
                | TailError::PathUnreadable { .. }
                | TailError::NoPlatformDefault,
            ) => 1,
            Self::Store(StoreError::MigrationDirty { .. }) => 3,
            _ => 2,
        }
    }
}

/// Filesystem locations derived from config and platform conventions.
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub state_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub lock_path: PathBuf,
}

impl DaemonPaths {
    /// Resolve under `$XDG_STATE_HOME/mtgc` (or the platform equivalent).
    /// `config.db_path` (already merged with `MTGA_DB_PATH` by the CLI
    /// layer) overrides the database location.
    pub fn resolve(config: &Config) -> Result<Self, LifecycleError> {
        let state_dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or(LifecycleError::NoStateDir)?
            .join("mtgc");
        Ok(Self {
            db_path: config
                .db_path
                .clone()
                .unwrap_or_else(|| state_dir.join("companion.db")),
            log_path: state_dir.join("daemon.log"),
            lock_path: state_dir.join("daemon.pid"),
            state_dir,
        })
    }
}

/// The running daemon; dropping without `stop()` aborts its tasks.
pub struct Daemon {
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    lock_path: PathBuf,
    hub: Hub,
    store: Store,
    bound_addr: SocketAddr,
    shutdown_deadline: Duration,

    writer: Option<WriterHandle>,
    tailer_shutdown: Option<oneshot::Sender<()>>,
    sweeper_shutdown: Option<oneshot::Sender<()>>,
    server_task: Option<JoinHandle<()>>,
    replay_task: Option<JoinHandle<()>>,
    parser_task: Option<JoinHandle<()>>,
    machine_task: Option<JoinHandle<()>>,
}

impl Daemon {
    pub fn hub(&self) -> Hub {
        self.hub.clone()
    }

    pub fn store(&self) -> Store {
        self.store.clone()
    }

    /// Actual listener address (useful when configured with port 0).
    pub fn bound_addr(&self) -> SocketAddr {
        self.bound_addr
    }

    /// Reverse-order graceful shutdown. Each component gets the
    /// configured deadline; stragglers are aborted.
    pub async fn stop(mut self) {
        let deadline = self.shutdown_deadline;
        tracing::info!("shutting down");

        // 1. Stop accepting connections and client commands.
        if let Some(server) = self.server_task.take() {
            server.abort();
        }
        // 2. Replay controller exits once the command channel closes.
        if let Some(replay) = self.replay_task.take() {
            await_or_abort(replay, deadline, "replay controller").await;
        }
        // 3. Tailer checkpoints and exits; its channel closes the parser,
        //    which in turn closes the machine.
        if let Some(tailer) = self.tailer_shutdown.take() {
            let _ = tailer.send(());
        }
        if let Some(parser) = self.parser_task.take() {
            await_or_abort(parser, deadline, "parser task").await;
        }
        if let Some(machine) = self.machine_task.take() {
            await_or_abort(machine, deadline, "machine task").await;
        }
        // 4. Cache sweeper.
        if let Some(sweeper) = self.sweeper_shutdown.take() {
            let _ = sweeper.send(());
        }
        // 5. Flush remaining writes, then close the pool.
        if let Some(writer) = self.writer.take() {
            writer.shutdown(deadline).await;
        }
        self.store.close().await;

        // 6. Release the pid file.
        let _ = std::fs::remove_file(&self.lock_path);
        let stats = self.hub.stats();
        tracing::info!(
            published = stats.published,
            slow_client_drops = stats.slow_client_drops,
            "shutdown complete"
        );
    }
}

async fn await_or_abort(task: JoinHandle<()>, deadline: Duration, name: &str) {
    let abort = task.abort_handle();
    if tokio::time::timeout(deadline, task).await.is_err() {
        tracing::warn!(component = name, "did not stop within deadline, aborting");
        abort.abort();
    }
}

/// Start every component in order, tearing down on failure.
pub async fn startup(config: &Config, paths: &DaemonPaths) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;

    // Lock first so a second daemon fails fast without touching state.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    {
        use std::io::Write;
        let mut f = &lock_file;
        f.set_len(0)?;
        writeln!(f, "{}", std::process::id())?;
    }

    // 1. Store (refuses dirty schema; that error is not retried).
    let store = open_store_with_retry(&paths.db_path, config.startup_retries).await?;

    // 2. Store writer task.
    let writer = spawn_writer(
        store.clone(),
        config.write_batch_window,
        WRITE_QUEUE,
    );
    let write_tx = writer.sender();

    // 3. Rating cache + sweeper, machine, snapshot channel.
    let cache = Arc::new(RatingCache::new(
        config.rating_cache_capacity,
        config.rating_ttl,
        SystemClock,
    ));
    let sweeper_shutdown = spawn_sweeper(Arc::clone(&cache));
    let ratings = CachedRatings::new(Arc::clone(&cache), store.clone());
    let mut machine = SessionMachine::new(SystemClock, UuidIdGen, ratings, config.stale_after);
    recover_active_draft(&store, &mut machine, config).await;
    let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());

    // 4. Bus hub.
    let hub = Hub::new(config.subscriber_queue);

    // 5. Pipeline channels and tasks: machine first so the parser always
    //    has a live consumer.
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    let machine_task =
        ingest::spawn_machine_task(machine, event_rx, write_tx.clone(), hub.clone(), snapshot_tx);

    let parser_metrics = Arc::new(Mutex::new(ParserMetrics::default()));
    let parser_config = ParserConfig {
        max_event_buffer: config.max_event_buffer,
        dedup_window: config.dedup_window,
    };
    let (tail_tx, tail_rx) = mpsc::channel(TAIL_QUEUE);
    let parser_task = ingest::spawn_parser_task(
        Parser::new(parser_config.clone(), SystemClock),
        tail_rx,
        event_tx.clone(),
        hub.clone(),
        Arc::clone(&parser_metrics),
    );

    // 6. Tailer against the resolved log path.
    let log_path = match resolve_log_path(config.log_file_path.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            drop(write_tx);
            drop(event_tx);
            teardown_partial(machine_task, Some(parser_task), None, writer, &store).await;
            return Err(e.into());
        }
    };
    let sink = Arc::new(StoreOffsetSink::new(store.clone(), write_tx.clone()));
    let tailer_shutdown = start_tailer(
        TailerConfig {
            path: log_path.clone(),
            poll_interval: config.log_poll_interval,
            use_fsnotify: config.log_use_fsnotify,
            max_line_buffer: config.max_line_buffer,
            stall_after: config.stall_after,
        },
        sink,
        tail_tx,
    );

    // 7. Replay controller on the coordinator command queue.
    let (command_tx, command_rx) = mpsc::channel::<Command>(COMMAND_QUEUE);
    let replay_task = tokio::spawn(
        ReplayController::new(store.clone(), event_tx, parser_config, SystemClock)
            .run(command_rx),
    );

    // 8. REST/WS listener, last: only advertise once the pipeline is live.
    let ctx = Arc::new(WsCtx {
        hub: hub.clone(),
        command_tx,
        start_time: Instant::now(),
        parser_metrics,
        cache_stats: Box::new(move || cache.stats()),
        snapshot_rx,
    });
    let listener = match bind_with_retry(config.bind_addr, config.startup_retries).await {
        Ok(listener) => listener,
        Err(e) => {
            drop(write_tx);
            let _ = tailer_shutdown.send(());
            replay_task.abort();
            teardown_partial(machine_task, Some(parser_task), None, writer, &store).await;
            return Err(e);
        }
    };
    let bound_addr = listener.local_addr().map_err(LifecycleError::Io)?;
    let server_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, ws::router(ctx)).await {
            tracing::error!(error = %e, "http server exited");
        }
    });

    tracing::info!(
        log = %log_path.display(),
        db = %paths.db_path.display(),
        addr = %bound_addr,
        "daemon ready"
    );

    Ok(Daemon {
        lock_file,
        lock_path: paths.lock_path.clone(),
        hub,
        store,
        bound_addr,
        shutdown_deadline: config.shutdown_deadline,
        writer: Some(writer),
        tailer_shutdown: Some(tailer_shutdown),
        sweeper_shutdown: Some(sweeper_shutdown),
        server_task: Some(server_task),
        replay_task: Some(replay_task),
        parser_task: Some(parser_task),
        machine_task: Some(machine_task),
    })
}

async fn open_store_with_retry(path: &PathBuf, retries: u32) -> Result<Store, LifecycleError> {
    let mut last = None;
    for attempt in 1..=retries.max(1) {
        match Store::open(path).await {
            Ok(store) => return Ok(store),
            // Dirty schema needs operator intervention; retrying is noise.
            Err(e @ StoreError::MigrationDirty { .. }) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "store open failed");
                last = Some(e);
                tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            }
        }
    }
    Err(last.map(LifecycleError::Store).unwrap_or_else(|| {
        LifecycleError::Io(std::io::Error::other("store open failed with no error"))
    }))
}

async fn bind_with_retry(
    addr: SocketAddr,
    retries: u32,
) -> Result<tokio::net::TcpListener, LifecycleError> {
    let mut last = None;
    for attempt in 1..=retries.max(1) {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "bind failed");
                last = Some(e);
                tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            }
        }
    }
    Err(LifecycleError::BindFailed(
        addr,
        last.unwrap_or_else(|| std::io::Error::other("bind failed")),
    ))
}

/// Adopt a still-active draft session so a daemon restart mid-draft keeps
/// appending to it instead of opening a duplicate.
async fn recover_active_draft<C, G, R>(
    store: &Store,
    machine: &mut SessionMachine<C, G, R>,
    config: &Config,
) where
    C: mtgc_core::Clock,
    G: mtgc_core::IdGen + Send + Sync + 'static,
    R: mtgc_engine::RatingSource + 'static,
{
    let now = chrono::Utc::now();
    let horizon = chrono::Duration::from_std(config.stale_after)
        .unwrap_or_else(|_| chrono::Duration::hours(1));
    let recent = match store.draft_sessions_in_range(now - horizon, now).await {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::warn!(error = %e, "draft recovery query failed");
            return;
        }
    };

    let mut candidates = Vec::new();
    for session in recent
        .into_iter()
        .filter(|s| s.status == mtgc_core::DraftStatus::Active)
    {
        let progress = match store.picks_for_session(&session.session_id).await {
            Ok(picks) => picks
                .iter()
                .map(|p| (p.pack_number, p.pick_number))
                .max()
                .unwrap_or((0, 0)),
            Err(_) => (0, 0),
        };
        candidates.push(SessionCandidate { session, progress });
    }
    if candidates.is_empty() {
        return;
    }

    // Reconcile against the newest candidate's own signature; the
    // tie-break prefers lower progress, then earlier start.
    let newest = candidates
        .iter()
        .map(|c| c.session.clone())
        .max_by_key(|s| s.start_time);
    let Some(newest) = newest else { return };
    let signature = mtgc_core::SessionSignature::new(
        &newest.set_code,
        &newest.draft_type,
        &newest.event_name,
        newest.start_time,
    );
    let Some(chosen) = select_session_for_signature(candidates, &signature) else {
        return;
    };

    let packs = store
        .packs_for_session(&chosen.session_id)
        .await
        .unwrap_or_default();
    tracing::info!(session_id = %chosen.session_id, "resuming active draft session");
    machine.drafts_mut().adopt(chosen, packs);
}

async fn teardown_partial(
    machine_task: JoinHandle<()>,
    parser_task: Option<JoinHandle<()>>,
    server_task: Option<JoinHandle<()>>,
    writer: WriterHandle,
    store: &Store,
) {
    if let Some(server) = server_task {
        server.abort();
    }
    if let Some(parser) = parser_task {
        parser.abort();
    }
    machine_task.abort();
    writer.shutdown(Duration::from_secs(2)).await;
    store.close().await;
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
