// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identity for the daemon scheduler.
//!
//! Timers are string-keyed by kind and server id so stopping a server
//! can cancel everything it owns by prefix-free exact ids, with no weak
//! references through timer closures.

use serde::{Deserialize, Serialize};

/// Unique identifier for one scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(String);

impl TimerId {
    /// Crash-backoff restart for a server.
    pub fn restart(server_id: &str) -> Self {
        TimerId(format!("restart:{server_id}"))
    }

    /// End-of-cooldown resumption for a server.
    pub fn cooldown(server_id: &str) -> Self {
        TimerId(format!("cooldown:{server_id}"))
    }

    /// Settle delay between the halves of a manual restart.
    pub fn settle(server_id: &str) -> Self {
        TimerId(format!("settle:{server_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a typed kind; `None` for unrecognized ids.
    pub fn kind(&self) -> Option<TimerKind<'_>> {
        if let Some(id) = self.0.strip_prefix("restart:") {
            return Some(TimerKind::Restart { server_id: id });
        }
        if let Some(id) = self.0.strip_prefix("cooldown:") {
            return Some(TimerKind::Cooldown { server_id: id });
        }
        if let Some(id) = self.0.strip_prefix("settle:") {
            return Some(TimerKind::Settle { server_id: id });
        }
        None
    }

    /// The server that owns this timer.
    pub fn server_id(&self) -> Option<&str> {
        match self.kind()? {
            TimerKind::Restart { server_id }
            | TimerKind::Cooldown { server_id }
            | TimerKind::Settle { server_id } => Some(server_id),
        }
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed representation of a [`TimerId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind<'a> {
    Restart { server_id: &'a str },
    Cooldown { server_id: &'a str },
    Settle { server_id: &'a str },
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
