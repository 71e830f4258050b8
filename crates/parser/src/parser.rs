// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extraction, classification, and dedup tied into one stream stage.

use crate::dedup::DedupWindow;
use crate::extract::{Extracted, Extractor};
use mtgc_core::{Clock, LogEvent, LogEventKind};
use serde_json::Value;

/// Parser settings, taken from the daemon [`Config`](mtgc_core::Config).
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub max_event_buffer: usize,
    pub dedup_window: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_event_buffer: 4 * 1024 * 1024,
            dedup_window: 4096,
        }
    }
}

/// Counters kept across the parser's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ParserMetrics {
    pub events_emitted: u64,
    pub duplicates_suppressed: u64,
    pub malformed_skipped: u64,
}

/// Streaming parser: lines in, classified [`LogEvent`]s out.
///
/// `arrival_seq` is strictly increasing for the life of the value; events
/// are emitted in the order they balanced, which matches file order.
pub struct Parser<C: Clock> {
    extractor: Extractor,
    dedup: DedupWindow,
    clock: C,
    arrival_seq: u64,
    /// Bytes consumed so far; stamps `source_offset` for debugging.
    offset: u64,
    metrics: ParserMetrics,
}

impl<C: Clock> Parser<C> {
    pub fn new(config: ParserConfig, clock: C) -> Self {
        Self {
            extractor: Extractor::new(config.max_event_buffer),
            dedup: DedupWindow::new(config.dedup_window),
            clock,
            arrival_seq: 0,
            offset: 0,
            metrics: ParserMetrics::default(),
        }
    }

    /// Feed one line (newline stripped).
    pub fn push_line(&mut self, line: &str) -> Vec<LogEvent> {
        self.offset += line.len() as u64 + 1;
        let extracted = self.extractor.push_line(line);
        self.collect(extracted)
    }

    /// Feed a batch of lines from one tailer read.
    pub fn push_lines(&mut self, lines: &[String]) -> Vec<LogEvent> {
        let mut out = Vec::new();
        for line in lines {
            out.extend(self.push_line(line));
        }
        out
    }

    /// A rotation gap interrupts any open candidate.
    pub fn note_rotation(&mut self) {
        if self.extractor.reset().is_some() {
            self.metrics.malformed_skipped += 1;
        }
        self.offset = 0;
    }

    pub fn metrics(&self) -> ParserMetrics {
        self.metrics
    }

    fn collect(&mut self, extracted: Vec<Extracted>) -> Vec<LogEvent> {
        let mut out = Vec::new();
        for item in extracted {
            match item {
                Extracted::Event { marker, value } => {
                    let kind = classify(marker.as_deref(), &value);
                    if !self.dedup.insert(kind.name(), &value) {
                        self.metrics.duplicates_suppressed += 1;
                        tracing::trace!(kind = kind.name(), "duplicate suppressed");
                        continue;
                    }
                    self.arrival_seq += 1;
                    self.metrics.events_emitted += 1;
                    out.push(LogEvent {
                        kind,
                        timestamp: self.clock.now(),
                        arrival_seq: self.arrival_seq,
                        payload: value,
                        source_offset: self.offset,
                    });
                }
                Extracted::MalformedSkipped { discarded } => {
                    self.metrics.malformed_skipped += 1;
                    tracing::debug!(discarded, "malformed event skipped");
                }
            }
        }
        out
    }
}

/// Classify by arrow marker, or by well-known payload fields when the JSON
/// arrived without a marker. Everything else passes through as `Other`.
fn classify(marker: Option<&str>, payload: &Value) -> LogEventKind {
    if let Some(marker) = marker {
        return LogEventKind::from_marker(marker);
    }
    for probe in ["InternalEventName", "EventName", "EventType"] {
        if let Some(name) = payload.get(probe).and_then(Value::as_str) {
            return LogEventKind::from_marker(name);
        }
    }
    LogEventKind::Other("Unlabeled".to_string())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
