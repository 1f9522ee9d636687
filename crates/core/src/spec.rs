// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative description of one managed server.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One entry of the user's server list, immutable once loaded.
///
/// The wire form is camelCase JSON; absent optional fields take their
/// defaults and unknown fields are ignored so older daemons can read
/// newer settings files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    /// Unique identifier within the server set.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Working directory; a leading `~` is expanded at spawn time.
    pub working_dir: String,
    /// Shell command line, executed via `/bin/sh -c`.
    pub command: String,
    /// TCP port the server binds, when it has one. Drives the prober.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Reserved for a future HTTP probe; the TCP prober ignores it.
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
    #[serde(default)]
    pub use_https: bool,
    #[serde(default)]
    pub auto_start: bool,
    /// Governs UI listing only; the API always reports every server.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_health_check_path() -> String {
    "/".to_string()
}

fn default_visible() -> bool {
    true
}

impl ServerSpec {
    /// Working directory with a leading `~` expanded against the
    /// invoking user's home. The directory need not exist at load time;
    /// a missing path surfaces as a spawn error.
    pub fn working_dir(&self) -> PathBuf {
        expand_tilde(&self.working_dir)
    }

    /// First whitespace-delimited token of the command line, used by the
    /// spawn preflight to match orphaned processes.
    pub fn command_word(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or_default()
    }
}

/// Expand a leading `~` or `~/` against the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
