// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform log path resolution.

use crate::tailer::TailError;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Locate the game client's log file.
///
/// An explicit override bypasses OS probing entirely; otherwise the
/// platform default is probed. Fails with [`TailError::PathMissing`] when
/// the file does not exist and [`TailError::PathUnreadable`] when it exists
/// but cannot be opened for shared reading.
pub fn resolve_log_path(override_path: Option<&Path>) -> Result<PathBuf, TailError> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => platform_default().ok_or(TailError::NoPlatformDefault)?,
    };

    if !path.exists() {
        return Err(TailError::PathMissing { path });
    }

    // Shared-read probe; the handle is dropped immediately.
    OpenOptions::new()
        .read(true)
        .open(&path)
        .map_err(|source| TailError::PathUnreadable {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}

#[cfg(target_os = "macos")]
fn platform_default() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Library")
            .join("Logs")
            .join("Wizards Of The Coast")
            .join("MTGA")
            .join("Player.log")
    })
}

#[cfg(target_os = "windows")]
fn platform_default() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("AppData")
            .join("LocalLow")
            .join("Wizards Of The Coast")
            .join("MTGA")
            .join("Player.log")
    })
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_default() -> Option<PathBuf> {
    // The client does not ship for other platforms; an explicit
    // --log-file-path is required (e.g. a Proton prefix path).
    None
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
