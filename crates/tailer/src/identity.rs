// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File identity for rotation detection.
//!
//! A rotation replaces the file behind the path. Size comparisons catch
//! truncation; identity comparisons catch replace-and-recreate where the
//! new file is already larger than the old offset.

use serde::{Deserialize, Serialize};
use std::fs::Metadata;

/// Stable identity of an open file, independent of its path.
///
/// On Unix this is `(device, inode)`. On other platforms it falls back to
/// the creation timestamp, which is stable for the lifetime of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn of(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn of(meta: &Metadata) -> Self {
        let created = meta
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            dev: created,
            ino: 0,
        }
    }

    /// Encoding used in the offset store.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.dev, self.ino)
    }

    pub fn decode(s: &str) -> Option<Self> {
        let (dev, ino) = s.split_once(':')?;
        Some(Self {
            dev: dev.parse().ok()?,
            ino: ino.parse().ok()?,
        })
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
