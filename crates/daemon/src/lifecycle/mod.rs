// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup and the shutdown coordinator.

use crate::engine::Supervisor;
use crate::listener::{self, ListenCtx};
use crate::process::{ProcessAdapter, ShellAdapter};
use stagehand_core::{Clock, Command, Event, Op, Settings, SystemClock};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Depth of the supervisor's event inbox.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// The daemon's concrete supervisor type.
pub type DaemonSupervisor = Supervisor<ShellAdapter<SystemClock>, SystemClock>;

#[derive(Debug, Error)]
pub enum StartupError {
    /// The control API is this build's only control surface, so a bind
    /// failure is fatal.
    #[error("failed to bind control API on 127.0.0.1:{port}: {source}")]
    Bind { port: u16, source: std::io::Error },
}

/// Everything `main` needs after startup.
pub struct Startup {
    pub supervisor: Arc<DaemonSupervisor>,
    pub event_rx: mpsc::Receiver<Event>,
    pub listener: TcpListener,
    pub listener_ctx: Arc<ListenCtx>,
    pub api_port: u16,
}

impl std::fmt::Debug for Startup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Startup")
            .field("api_port", &self.api_port)
            .finish_non_exhaustive()
    }
}

/// Load settings (degrading to an empty set on config errors), build
/// the supervisor, bind the control socket, and queue the auto-start
/// pass. Servers whose `autoStart` is set are started exactly once
/// here; reload never repeats it.
pub fn startup(settings_path: PathBuf) -> Result<Startup, StartupError> {
    let (settings, config_error) = match Settings::load(&settings_path) {
        Ok(settings) => (settings, None),
        Err(e) => {
            warn!(error = %e, "settings unavailable, running with empty server set");
            (Settings::default(), Some(e.to_string()))
        }
    };
    let api_port = settings.api_port;

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let adapter = Arc::new(ShellAdapter::new(SystemClock));
    let supervisor = Arc::new(Supervisor::new(
        adapter,
        SystemClock,
        settings,
        config_error,
        settings_path,
        event_tx.clone(),
    ));

    let listener =
        listener::bind(api_port).map_err(|source| StartupError::Bind { port: api_port, source })?;
    let listener_ctx =
        Arc::new(ListenCtx { state: supervisor.state_handle(), event_tx: event_tx.clone() });

    // Queue auto-starts ahead of any external command; the loop drains
    // them first.
    let auto: Vec<String> = {
        let state = supervisor.state_handle();
        let guard = state.lock();
        guard
            .servers
            .values()
            .filter(|st| st.spec.auto_start)
            .map(|st| st.spec.id.clone())
            .collect()
    };
    for id in auto {
        info!(id, "queueing auto-start");
        let cmd = Command::new(Op::Start { id });
        if event_tx.try_send(Event::Command(cmd)).is_err() {
            warn!("event channel full before startup, skipping auto-start");
        }
    }

    Ok(Startup { supervisor, event_rx, listener, listener_ctx, api_port })
}

/// Orderly teardown: stop accepting control connections, kill every
/// child process group, reclaim ports. Idempotent; a second delivery
/// during teardown is a no-op.
pub async fn shutdown<A: ProcessAdapter, C: Clock>(
    supervisor: &Supervisor<A, C>,
    accept_token: &CancellationToken,
) {
    static IN_PROGRESS: AtomicBool = AtomicBool::new(false);
    if IN_PROGRESS.swap(true, Ordering::SeqCst) {
        return;
    }
    info!("shutting down: stopping all servers");
    accept_token.cancel();
    supervisor.force_stop_all().await;
    info!("shutdown complete");
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
