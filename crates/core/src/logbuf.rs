// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded per-server log ring.
//!
//! The process runner's reader tasks hand this buffer whole lines; it
//! never sees partial reads. Lines are stamped on insert, stripped of
//! ANSI CSI sequences and a trailing CR, and evicted from the head once
//! the ring is full.

use parking_lot::Mutex;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};

/// Maximum retained lines per server.
pub const MAX_LOG_LINES: usize = 5000;

/// ANSI CSI escape sequences: ESC `[` params letter.
#[allow(clippy::expect_used)]
static ANSI_CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\x1B\\[[0-9;]*[A-Za-z]").expect("constant regex pattern is valid"));

/// One captured output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Wall-clock stamp, milliseconds since the Unix epoch.
    pub at_ms: u64,
    pub line: String,
}

/// FIFO of the last [`MAX_LOG_LINES`] lines for one server.
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    cap: usize,
}

/// The runner's reader tasks and the engine share a buffer through this
/// handle; appends lock per line.
pub type SharedLogBuffer = Arc<Mutex<LogBuffer>>;

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_LINES)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { entries: VecDeque::new(), cap }
    }

    pub fn shared() -> SharedLogBuffer {
        Arc::new(Mutex::new(LogBuffer::new()))
    }

    /// Stamp, sanitize, and append one line, evicting the oldest entry
    /// when the ring is full.
    pub fn append(&mut self, at_ms: u64, line: &str) {
        let line = sanitize(line);
        if self.entries.len() == self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry { at_ms, line });
    }

    /// Copy of the last `n` entries, oldest first.
    pub fn snapshot_last(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip ANSI CSI sequences and a trailing CR.
fn sanitize(line: &str) -> String {
    let line = line.strip_suffix('\r').unwrap_or(line);
    ANSI_CSI.replace_all(line, "").into_owned()
}

#[cfg(test)]
#[path = "logbuf_tests.rs"]
mod tests;
