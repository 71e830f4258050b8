// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded TTL cache for card ratings.
//!
//! Keyed by [`RatingKey`] — the same `(set, format, card)` key the store
//! looks up by, with the format axis carrying any color filter. FIFO
//! eviction by insertion order, TTL expiry on read, and a periodic sweep
//! for entries nobody re-reads. Readers share a read lock; only
//! `set`/`sweep`/`disable` take the write lock, so lookups from the
//! grader never serialize behind each other.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use mtgc_core::{CardRating, Clock, RatingKey};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Minimum interval between background sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Counters exposed through the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

struct Entry {
    rating: CardRating,
    inserted_at: DateTime<Utc>,
}

struct Inner {
    map: IndexMap<RatingKey, Entry>,
    enabled: bool,
}

/// Concurrent-reader, single-writer rating cache.
pub struct RatingCache<C: Clock> {
    inner: RwLock<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    clock: C,
    /// Zero means entries never expire.
    ttl: Duration,
    capacity: usize,
}

impl<C: Clock> RatingCache<C> {
    pub fn new(capacity: usize, ttl: Duration, clock: C) -> Self {
        Self {
            inner: RwLock::new(Inner {
                map: IndexMap::with_capacity(capacity.min(4096)),
                enabled: true,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            clock,
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Fresh entry, or `None` when absent, expired, or disabled.
    pub fn get(&self, key: &RatingKey) -> Option<CardRating> {
        let now = self.clock.now();
        let inner = self.inner.read();
        if !inner.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        match inner.map.get(key) {
            Some(entry) if !self.expired(entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.rating.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert under the rating's own key, evicting the oldest entry when
    /// at capacity and the key is new.
    pub fn set(&self, rating: CardRating) {
        let now = self.clock.now();
        let key = rating.key();
        let mut inner = self.inner.write();
        if !inner.enabled {
            return;
        }
        if !inner.map.contains_key(&key) && inner.map.len() >= self.capacity {
            inner.map.shift_remove_index(0);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        inner.map.insert(
            key,
            Entry {
                rating,
                inserted_at: now,
            },
        );
    }

    /// Delete expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        if self.ttl.is_zero() {
            return 0;
        }
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut inner = self.inner.write();
        let before = inner.map.len();
        inner.map.retain(|_, entry| age_of(entry, now) < ttl);
        before - inner.map.len()
    }

    /// Clear and park: gets miss and sets are dropped until re-enabled.
    pub fn disable(&self) {
        let mut inner = self.inner.write();
        inner.map.clear();
        inner.enabled = false;
    }

    pub fn enable(&self) {
        self.inner.write().enabled = true;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.inner.read().map.len(),
        }
    }

    fn expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        !self.ttl.is_zero() && age_of(entry, now) >= self.ttl
    }
}

fn age_of(entry: &Entry, now: DateTime<Utc>) -> Duration {
    (now - entry.inserted_at).to_std().unwrap_or(Duration::ZERO)
}

/// Spawn the background sweep task. Returns a shutdown sender.
pub fn spawn_sweeper<C: Clock>(cache: Arc<RatingCache<C>>) -> oneshot::Sender<()> {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = cache.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, "rating cache sweep");
                    }
                }
                _ = &mut shutdown_rx => break,
            }
        }
    });
    shutdown_tx
}

#[cfg(test)]
#[path = "rating_cache_tests.rs"]
mod tests;
