// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-server lifecycle status.

use serde::{Deserialize, Serialize};

/// Where a server is in its lifecycle.
///
/// `Crashed` and `Cooldown` are governor states: `Crashed` means a
/// restart is pending (or the governor gave up for this exit), while
/// `Cooldown` is the timed lockout after too many crashes in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Crashed,
    Cooldown,
}

impl ServerStatus {
    /// True while a child process may exist for this server.
    pub fn has_child(self) -> bool {
        matches!(self, ServerStatus::Starting | ServerStatus::Running)
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ServerStatus::Stopped => "stopped",
            ServerStatus::Starting => "starting",
            ServerStatus::Running => "running",
            ServerStatus::Crashed => "crashed",
            ServerStatus::Cooldown => "cooldown",
        })
    }
}
