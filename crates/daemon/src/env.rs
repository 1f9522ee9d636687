// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Resolve the configuration directory: `STAGEHAND_DIR` > `~/.servers`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STAGEHAND_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".servers"),
        None => PathBuf::from(".servers"),
    }
}

/// Path of the settings document.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Scheduler tick resolution (default 250 ms, configurable via
/// `STAGEHAND_TIMER_CHECK_MS`). The finest timer in the system is the
/// 500 ms restart settle delay, so the default stays well under it.
pub fn timer_check_interval() -> Duration {
    std::env::var("STAGEHAND_TIMER_CHECK_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(250))
}

/// Extra PATH entries from `STAGEHAND_EXTRA_PATHS` (colon separated),
/// merged after the settings document's `extraPaths`.
pub fn extra_paths() -> Vec<String> {
    std::env::var("STAGEHAND_EXTRA_PATHS")
        .ok()
        .map(|raw| raw.split(':').filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}
