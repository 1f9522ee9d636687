// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process runner: spawns children in their own process groups, streams
//! their output into log buffers, and signals them by negated PID.
//!
//! The [`ProcessAdapter`] trait is the seam between the state machine
//! and real processes; engine tests run against the in-memory fake.

mod shell;

pub use shell::ShellAdapter;


use async_trait::async_trait;
use stagehand_core::logbuf::SharedLogBuffer;
use stagehand_core::{Event, ServerSpec};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Grace between SIGTERM and SIGKILL when stopping a child.
pub const STOP_GRACE: Duration = Duration::from_secs(1);

/// Errors surfaced before a child process exists.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("working directory does not exist: {0}")]
    WorkingDir(String),
    #[error("failed to spawn: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the runner needs to launch one child.
#[derive(Debug)]
pub struct SpawnRequest {
    pub id: String,
    pub spec: ServerSpec,
    /// Shared buffer the reader tasks append into.
    pub logs: SharedLogBuffer,
    /// User-configured PATH entries, ahead of the built-in candidates.
    pub extra_paths: Vec<String>,
}

/// Seam between the supervisor and the operating system.
///
/// `spawn` posts `ChildSpawned` on the event channel the moment the
/// child exists and `ChildExited` when it dies, in that order: the
/// spawn event is enqueued before the exit watcher starts, so even a
/// child that dies instantly cannot reorder the two. Signaling is by
/// process group so shell descendants die with the shell.
#[async_trait]
pub trait ProcessAdapter: Send + Sync + 'static {
    /// Launch a child for the request; returns its PID (also the
    /// process group id).
    async fn spawn(&self, req: SpawnRequest, events: mpsc::Sender<Event>)
        -> Result<i32, SpawnError>;

    /// SIGTERM the group, wait [`STOP_GRACE`], then SIGKILL it.
    async fn stop(&self, pid: i32);

    /// SIGKILL the group immediately.
    fn force_stop(&self, pid: i32);
}

/// Build the PATH prefix for a child: user-configured entries first,
/// then whichever built-in toolchain candidates exist on disk.
pub(crate) fn path_prefix(extra_paths: &[String]) -> String {
    let mut entries: Vec<String> = extra_paths.to_vec();
    for candidate in toolchain_candidates() {
        if std::path::Path::new(&candidate).is_dir() && !entries.contains(&candidate) {
            entries.push(candidate);
        }
    }
    entries.join(":")
}

/// Kill whatever still holds `port` after the process groups were
/// already SIGKILLed. Best-effort: a missing `lsof` is a no-op.
pub(crate) async fn reclaim_port(port: u16) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let output = match tokio::process::Command::new("lsof")
        .arg("-ti")
        .arg(format!(":{port}"))
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(port, error = %e, "lsof unavailable, skipping port reclamation");
            return;
        }
    };
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if let Ok(pid) = line.trim().parse::<i32>() {
            tracing::warn!(port, pid, "killing survivor still holding port");
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
}

/// Best-effort Node.js toolchain locations, checked for existence.
fn toolchain_candidates() -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".nvm/current/bin").display().to_string());
    }
    candidates.push("/opt/homebrew/bin".to_string());
    candidates.push("/usr/local/bin".to_string());
    candidates
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
