// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seam adapters between crates.
//!
//! The tailer checkpoints through a sink trait and the grader reads
//! through a rating-source trait; both are implemented here against the
//! store so neither crate depends on it.

use async_trait::async_trait;
use mtgc_core::{ArenaId, CardRating, Clock, RatingKey};
use mtgc_engine::{RatingCache, RatingSource};
use mtgc_store::{OffsetRow, Store, WriteOp};
use mtgc_tailer::{FileIdentity, LogOffset, OffsetSink};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Offset sink backed by the store.
///
/// Loads go straight to the database; saves ride the writer queue so they
/// batch with the event writes from the same read.
pub struct StoreOffsetSink {
    store: Store,
    write_tx: mpsc::Sender<WriteOp>,
}

impl StoreOffsetSink {
    pub fn new(store: Store, write_tx: mpsc::Sender<WriteOp>) -> Self {
        Self { store, write_tx }
    }
}

#[async_trait]
impl OffsetSink for StoreOffsetSink {
    async fn load(&self, path: &Path) -> Option<LogOffset> {
        let row = match self.store.get_offset(&path.to_string_lossy()).await {
            Ok(row) => row?,
            Err(e) => {
                tracing::warn!(error = %e, "offset load failed");
                return None;
            }
        };
        Some(LogOffset {
            path: path.to_path_buf(),
            identity: FileIdentity::decode(&row.identity)?,
            offset: row.offset.max(0) as u64,
            last_read_at: row.last_read_at,
        })
    }

    async fn save(&self, offset: LogOffset) -> Result<(), String> {
        let row = OffsetRow {
            path: offset.path.to_string_lossy().into_owned(),
            identity: offset.identity.encode(),
            offset: offset.offset as i64,
            last_read_at: offset.last_read_at,
        };
        self.write_tx
            .send(WriteOp::SaveOffset(row))
            .await
            .map_err(|e| e.to_string())
    }
}

/// Rating source with the cache in front and the store behind.
pub struct CachedRatings<C: Clock> {
    cache: Arc<RatingCache<C>>,
    store: Store,
}

impl<C: Clock> CachedRatings<C> {
    pub fn new(cache: Arc<RatingCache<C>>, store: Store) -> Self {
        Self { cache, store }
    }
}

#[async_trait]
impl<C: Clock> RatingSource for CachedRatings<C> {
    async fn rating(&self, set_code: &str, format: &str, arena_id: ArenaId) -> Option<CardRating> {
        let key = RatingKey {
            set_code: set_code.to_string(),
            format: format.to_string(),
            arena_id,
        };
        if let Some(rating) = self.cache.get(&key) {
            return Some(rating);
        }
        match self.store.get_rating(set_code, format, arena_id).await {
            Ok(Some(rating)) => {
                self.cache.set(rating.clone());
                Some(rating)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(arena_id, error = %e, "rating lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "adapters_tests.rs"]
mod tests;
