// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded duplicate-suppression window.
//!
//! The game client retransmits events on resync, so the parser keeps a
//! FIFO window of payload fingerprints and drops exact repeats. Only the
//! window is bounded; suppression across a longer horizon is the store's
//! idempotent-insert job.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::collections::VecDeque;

type Fingerprint = [u8; 32];

/// FIFO set of recently-seen event fingerprints.
pub struct DedupWindow {
    capacity: usize,
    order: VecDeque<Fingerprint>,
    seen: HashSet<Fingerprint>,
}

impl DedupWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Record `(event_type, payload)`; returns `false` when it is an exact
    /// duplicate already inside the window.
    pub fn insert(&mut self, event_type: &str, payload: &Value) -> bool {
        let fp = fingerprint(event_type, payload);
        if self.seen.contains(&fp) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(fp);
        self.seen.insert(fp);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// `sha256(event_type || 0x00 || canonical payload)`.
///
/// `serde_json` keys are ordered, so `to_string` of a parsed value is a
/// canonical form.
fn fingerprint(event_type: &str, payload: &Value) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(event_type.as_bytes());
    hasher.update([0u8]);
    hasher.update(payload.to_string().as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
