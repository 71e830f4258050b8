// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket endpoint and client command handling.
//!
//! Each connection gets a reader loop (client commands) and a writer task
//! (drains the subscriber queue). The bus is stateless across reconnects:
//! a returning client starts from the next published frame.

use crate::bus::{Hub, SubscriberQueue};
use crate::command::Command;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use mtgc_core::Frame;
use mtgc_engine::{CacheStats, MachineSnapshot};
use mtgc_parser::ParserMetrics;
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Shared context for the HTTP/WS surface.
pub struct WsCtx {
    pub hub: Hub,
    pub command_tx: mpsc::Sender<Command>,
    pub start_time: Instant,
    pub parser_metrics: Arc<Mutex<ParserMetrics>>,
    pub cache_stats: Box<dyn Fn() -> CacheStats + Send + Sync>,
    pub snapshot_rx: watch::Receiver<MachineSnapshot>,
}

/// Client-to-server messages. Unknown tags map to `Unknown` and get an
/// error ack instead of closing the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
    ReplayLogs {
        file_paths: Vec<PathBuf>,
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        filter: Vec<String>,
        #[serde(default)]
        pause_on_draft: bool,
        #[serde(default)]
        clear_data: bool,
    },
    StartReplay,
    PauseReplay,
    ResumeReplay,
    StopReplay,
    #[serde(other)]
    Unknown,
}

/// Build the REST/WS router.
pub fn router(ctx: Arc<WsCtx>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(ctx)
}

async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<Arc<WsCtx>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn healthz(State(ctx): State<Arc<WsCtx>>) -> axum::Json<serde_json::Value> {
    let snapshot = ctx.snapshot_rx.borrow().clone();
    axum::Json(serde_json::json!({
        "status": "ok",
        "uptime_s": ctx.start_time.elapsed().as_secs(),
        "bus": ctx.hub.stats(),
        "parser": *ctx.parser_metrics.lock(),
        "rating_cache": (ctx.cache_stats)(),
        "active_draft": snapshot.active_draft.map(|d| d.session_id.as_str().to_string()),
        "active_match": snapshot.active_match.map(|m| m.match_id.as_str().to_string()),
    }))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<WsCtx>) {
    let (mut sender, mut receiver) = socket.split();
    let (id, queue) = ctx.hub.subscribe();

    // Writer task: drain the subscriber queue to the socket.
    let writer_queue = Arc::clone(&queue);
    let writer = tokio::spawn(async move {
        while let Some(frame) = writer_queue.next().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "frame serialization failed");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader loop: client commands.
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_client_text(&ctx, &queue, text.as_str()).await;
            }
            Ok(Message::Binary(bytes)) => {
                if let Ok(text) = std::str::from_utf8(&bytes) {
                    handle_client_text(&ctx, &queue, text).await;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    ctx.hub.unsubscribe(id);
    writer.abort();
    tracing::debug!(subscriber = id, "websocket disconnected");
}

/// Push a frame to one connection, bypassing the broadcast path. Direct
/// replies share the subscriber queue so they interleave with broadcast
/// frames in a single ordered stream.
fn reply(queue: &SubscriberQueue, frame: Frame) {
    let _ = queue.push(frame);
}

async fn handle_client_text(ctx: &Arc<WsCtx>, queue: &SubscriberQueue, text: &str) {
    let now = chrono::Utc::now();
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable client message");
            reply(queue, Frame::error("unknown_command", now));
            return;
        }
    };

    let command = match message {
        ClientMessage::Ping => {
            reply(
                queue,
                Frame::new(mtgc_core::FrameKind::Pong, serde_json::json!({}), now),
            );
            return;
        }
        ClientMessage::Unknown => {
            reply(queue, Frame::error("unknown_command", now));
            return;
        }
        ClientMessage::ReplayLogs {
            file_paths,
            speed,
            filter,
            pause_on_draft,
            clear_data,
        } => Command::ReplayLogs {
            file_paths,
            speed,
            filter,
            pause_on_draft,
            clear_data,
        },
        ClientMessage::StartReplay => Command::StartReplay,
        ClientMessage::PauseReplay => Command::PauseReplay,
        ClientMessage::ResumeReplay => Command::ResumeReplay,
        ClientMessage::StopReplay => Command::StopReplay,
    };

    let name = command.name();
    if ctx.command_tx.send(command).await.is_err() {
        reply(queue, Frame::error("daemon_shutting_down", now));
        return;
    }
    reply(queue, Frame::replay_ack(name, now));
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
