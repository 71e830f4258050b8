// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resumable byte-offset checkpoints.
//!
//! After each successful read the tailer records `{path, identity, offset}`
//! through an [`OffsetSink`] so a restart resumes from the last consumed
//! byte. The sink is a trait so the tailer does not depend on the store.

use crate::identity::FileIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted resume point for one observed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogOffset {
    pub path: PathBuf,
    pub identity: FileIdentity,
    /// Byte offset of the first unconsumed byte.
    pub offset: u64,
    pub last_read_at: DateTime<Utc>,
}

/// Destination for offset checkpoints.
///
/// Checkpoint failures are non-fatal: the tailer logs and keeps going, at
/// the cost of re-reading on restart.
#[async_trait]
pub trait OffsetSink: Send + Sync + 'static {
    /// Last recorded offset for `path`, if any.
    async fn load(&self, path: &Path) -> Option<LogOffset>;

    /// Record a new resume point.
    async fn save(&self, offset: LogOffset) -> Result<(), String>;
}

/// Sink that keeps offsets in memory. Used in tests and when running
/// without persistence.
#[derive(Debug, Default)]
pub struct MemoryOffsetSink {
    inner: tokio::sync::Mutex<Option<LogOffset>>,
}

#[async_trait]
impl OffsetSink for MemoryOffsetSink {
    async fn load(&self, path: &Path) -> Option<LogOffset> {
        let inner = self.inner.lock().await;
        inner.as_ref().filter(|o| o.path == path).cloned()
    }

    async fn save(&self, offset: LogOffset) -> Result<(), String> {
        *self.inner.lock().await = Some(offset);
        Ok(())
    }
}
