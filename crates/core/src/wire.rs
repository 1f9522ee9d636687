// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON shapes for the HTTP control surface.

use crate::status::ServerStatus;
use serde::{Deserialize, Serialize};

/// Snapshot of one server for listings and detail lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    pub status: ServerStatus,
    /// Meaningful only while `status` is `running`.
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// `GET /servers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServersResponse {
    pub servers: Vec<ServerInfo>,
    /// Set when the settings document failed to load; the server set is
    /// empty but the API stays up for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_error: Option<String>,
}

/// `GET /servers/{id}/logs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub id: String,
    pub lines: Vec<String>,
    pub total_lines: usize,
}

/// Every mutating endpoint's reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Error envelope for 4xx/5xx replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
