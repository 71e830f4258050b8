// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Candidate-buffer JSON extraction.
//!
//! Lines stream in one at a time. A candidate starts at the first `{` and
//! completes when the brace depth returns to zero; braces inside string
//! literals (and escape sequences) do not count. Arrow-marker lines
//! (`<== EventName`, `==> EventName`) name the payload that follows.

use regex::Regex;
use serde_json::Value;

/// Log prefixes that cannot continue a pretty-printed JSON block. Seeing
/// one mid-block means the block was interrupted and must be discarded.
const NOISE_PREFIXES: &[&str] = &["[UnityCrossThreadLogger]", "[Client GRE]", "[MF]"];

/// A unit of extractor output.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// A balanced, parseable JSON value, with the arrow marker (if any)
    /// that introduced it.
    Event {
        marker: Option<String>,
        value: Value,
    },
    /// A candidate that balanced but failed to parse, was interrupted, or
    /// outgrew the buffer cap.
    MalformedSkipped { discarded: usize },
}

/// Streaming extractor over log lines.
pub struct Extractor {
    marker_re: Regex,
    buffer: String,
    pending_marker: Option<String>,
    started: bool,
    depth: u32,
    in_string: bool,
    escaped: bool,
    max_buffer: usize,
}

impl Extractor {
    pub fn new(max_buffer: usize) -> Self {
        // Arrow + event identifier, anywhere in the line.
        #[allow(clippy::unwrap_used)] // static pattern
        let marker_re = Regex::new(r"(?:<==|==>)\s*([A-Za-z0-9_.]+)").unwrap();
        Self {
            marker_re,
            buffer: String::new(),
            pending_marker: None,
            started: false,
            depth: 0,
            in_string: false,
            escaped: false,
            max_buffer,
        }
    }

    /// Feed one line (newline already stripped).
    pub fn push_line(&mut self, line: &str) -> Vec<Extracted> {
        let mut out = Vec::new();
        let mut rest = line;

        if let Some(caps) = self.marker_re.captures(line) {
            // A marker always starts a fresh candidate.
            self.discard_into(&mut out);
            if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
                self.pending_marker = Some(name.as_str().to_string());
                rest = &line[whole.end()..];
            }
        } else if self.started && NOISE_PREFIXES.iter().any(|p| line.starts_with(p)) {
            self.discard_into(&mut out);
        } else if !self.started && !line.contains('{') {
            // Free text outside any candidate.
            return out;
        }

        self.scan(rest, &mut out);

        if self.buffer.len() > self.max_buffer {
            tracing::warn!(
                len = self.buffer.len(),
                cap = self.max_buffer,
                "candidate buffer exceeded cap without balancing"
            );
            self.discard_into(&mut out);
        }

        out
    }

    /// Discard any open candidate, e.g. after a rotation gap.
    pub fn reset(&mut self) -> Option<Extracted> {
        let mut out = Vec::new();
        self.discard_into(&mut out);
        self.pending_marker = None;
        out.pop()
    }

    /// Character-level scan; may complete multiple candidates per line.
    fn scan(&mut self, text: &str, out: &mut Vec<Extracted>) {
        for ch in text.chars() {
            if !self.started {
                if ch == '{' {
                    self.started = true;
                    self.depth = 1;
                    self.in_string = false;
                    self.escaped = false;
                    self.buffer.push(ch);
                }
                continue;
            }

            self.buffer.push(ch);
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if ch == '\\' {
                    self.escaped = true;
                } else if ch == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match ch {
                '"' => self.in_string = true,
                '{' => self.depth += 1,
                '}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        self.finish(out);
                    }
                }
                _ => {}
            }
        }

        // Token separator across physical lines (JSON strings cannot span
        // a raw newline, so this is always safe).
        if self.started {
            self.buffer.push('\n');
        }
    }

    /// Balanced candidate: parse and emit, or count it malformed.
    fn finish(&mut self, out: &mut Vec<Extracted>) {
        let marker = self.pending_marker.take();
        match serde_json::from_str::<Value>(&self.buffer) {
            Ok(value) => out.push(Extracted::Event { marker, value }),
            Err(e) => {
                tracing::debug!(error = %e, len = self.buffer.len(), "balanced candidate failed to parse");
                out.push(Extracted::MalformedSkipped {
                    discarded: self.buffer.len(),
                });
            }
        }
        self.buffer.clear();
        self.started = false;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
    }

    /// Abandon the open candidate, if any, emitting a malformed marker.
    fn discard_into(&mut self, out: &mut Vec<Extracted>) {
        if self.started {
            out.push(Extracted::MalformedSkipped {
                discarded: self.buffer.len(),
            });
        }
        self.buffer.clear();
        self.started = false;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.pending_marker = None;
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
