// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The user-owned settings document: the declarative server list plus
//! supervisor options.
//!
//! Lives at `~/.servers/settings.json` by default. Loads are whole-file
//! reads; saves are atomic (same-directory temp file + rename) so a
//! crash mid-write never leaves a torn document behind.

use crate::spec::ServerSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Default port for the HTTP control API.
pub const DEFAULT_API_PORT: u16 = 7378;

/// Errors from loading or saving the settings document.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file not found: {0}")]
    NotFound(String),
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Top-level settings document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub servers: Vec<ServerSpec>,
    /// Port the control API binds on loopback.
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Extra directories prepended to every child's PATH, ahead of the
    /// built-in toolchain candidates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_paths: Vec<String>,
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

impl Default for Settings {
    fn default() -> Self {
        Self { servers: Vec::new(), api_port: DEFAULT_API_PORT, extra_paths: Vec::new() }
    }
}

impl Settings {
    /// Read and validate the settings document at `path`.
    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }
        let raw = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write the document atomically, creating the parent directory if
    /// missing. The temp file lives in the same directory so the final
    /// rename never crosses filesystems.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let parent = path.parent().ok_or_else(|| {
            SettingsError::Invalid(format!("settings path has no parent: {}", path.display()))
        })?;
        fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(self)?;
        let tmp = parent.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("settings.json")
        ));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Reject documents the supervisor cannot host: empty or duplicate
    /// server ids. Port collisions are deliberately left to surface at
    /// spawn time.
    fn validate(&self) -> Result<(), SettingsError> {
        let mut seen = HashSet::new();
        for spec in &self.servers {
            if spec.id.is_empty() {
                return Err(SettingsError::Invalid("server with empty id".to_string()));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(SettingsError::Invalid(format!("duplicate server id: {}", spec.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
