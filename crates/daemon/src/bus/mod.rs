// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-subscriber broadcast hub.
//!
//! Publishing never blocks: the publisher hands the frame to a dispatcher
//! task which fans out to per-subscriber bounded queues. A subscriber that
//! cannot keep up loses its *oldest* queued frames and never delays
//! anyone else. Frames reach each subscriber in publish order; nothing is
//! promised across subscribers, and missed frames are never replayed.

pub mod ws;

use mtgc_core::Frame;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Per-subscriber bounded frame queue with drop-oldest overflow.
pub struct SubscriberQueue {
    frames: Mutex<VecDeque<Frame>>,
    notify: Notify,
    capacity: usize,
    closed: Mutex<bool>,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity: capacity.max(1),
            closed: Mutex::new(false),
        }
    }

    /// Enqueue, dropping the oldest frame when full. Returns whether a
    /// frame was dropped.
    fn push(&self, frame: Frame) -> bool {
        let mut frames = self.frames.lock();
        let dropped = if frames.len() >= self.capacity {
            frames.pop_front();
            true
        } else {
            false
        };
        frames.push_back(frame);
        drop(frames);
        self.notify.notify_one();
        dropped
    }

    /// Next frame in order, or `None` once closed and drained.
    pub async fn next(&self) -> Option<Frame> {
        loop {
            {
                let mut frames = self.frames.lock();
                if let Some(frame) = frames.pop_front() {
                    return Some(frame);
                }
                if *self.closed.lock() {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    fn close(&self) {
        *self.closed.lock() = true;
        self.notify.notify_waiters();
    }
}

/// Counters exposed through the health endpoint.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct BusStats {
    pub subscribers: usize,
    pub slow_client_drops: u64,
    pub published: u64,
}

struct HubInner {
    subscribers: Mutex<HashMap<u64, Arc<SubscriberQueue>>>,
    next_id: AtomicU64,
    slow_client_drops: AtomicU64,
    published: AtomicU64,
    queue_capacity: usize,
}

/// Handle to the broadcast hub. Cloning shares the hub. The dispatcher
/// task exits once every handle is dropped.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
    dispatch_tx: mpsc::Sender<Frame>,
}

impl Hub {
    /// Create the hub and spawn its dispatcher task.
    pub fn new(queue_capacity: usize) -> Self {
        let (dispatch_tx, mut dispatch_rx) = mpsc::channel::<Frame>(1024);
        let inner = Arc::new(HubInner {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            slow_client_drops: AtomicU64::new(0),
            published: AtomicU64::new(0),
            queue_capacity,
        });

        let dispatch_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            while let Some(frame) = dispatch_rx.recv().await {
                let subscribers: Vec<Arc<SubscriberQueue>> = {
                    let map = dispatch_inner.subscribers.lock();
                    map.values().map(Arc::clone).collect()
                };
                for queue in subscribers {
                    if queue.push(frame.clone()) {
                        dispatch_inner
                            .slow_client_drops
                            .fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });

        Self { inner, dispatch_tx }
    }

    /// Non-blocking publish. Frames are dropped (with a warning) only if
    /// the dispatcher itself is saturated.
    pub fn publish(&self, frame: Frame) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.dispatch_tx.try_send(frame) {
            tracing::warn!(error = %e, "bus dispatch queue full, frame dropped");
        }
    }

    /// Register a subscriber; returns its id and queue.
    pub fn subscribe(&self) -> (u64, Arc<SubscriberQueue>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(SubscriberQueue::new(self.inner.queue_capacity));
        self.inner.subscribers.lock().insert(id, Arc::clone(&queue));
        tracing::debug!(subscriber = id, "bus subscriber registered");
        (id, queue)
    }

    /// Register with an explicit queue capacity (tests exercise slow
    /// consumers with tiny queues).
    pub fn subscribe_with_capacity(&self, capacity: usize) -> (u64, Arc<SubscriberQueue>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(SubscriberQueue::new(capacity));
        self.inner.subscribers.lock().insert(id, Arc::clone(&queue));
        (id, queue)
    }

    /// Deregister and release the queue.
    pub fn unsubscribe(&self, id: u64) {
        if let Some(queue) = self.inner.subscribers.lock().remove(&id) {
            queue.close();
            tracing::debug!(subscriber = id, "bus subscriber deregistered");
        }
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            subscribers: self.inner.subscribers.lock().len(),
            slow_client_drops: self.inner.slow_client_drops.load(Ordering::Relaxed),
            published: self.inner.published.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
