// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor state machine and manager.
//!
//! All server state lives behind one mutex and mutates only on the
//! supervisor task, which consumes the event channel in FIFO order.
//! Handlers return effects; the [`executor`] performs them and posts
//! completions back as events. Queries read snapshots without entering
//! the loop.

mod handlers;
mod scheduler;

pub(crate) mod executor;

use crate::process::ProcessAdapter;
use executor::Executor;
use indexmap::IndexMap;
use parking_lot::Mutex;
use scheduler::Scheduler;
use stagehand_core::governor::CrashTracker;
use stagehand_core::logbuf::{LogBuffer, SharedLogBuffer};
use stagehand_core::{
    Clock, Event, LogsResponse, OpResult, ServerInfo, ServerSpec, ServerStatus, Settings,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::info;

/// Runtime companion of one [`ServerSpec`].
pub struct ServerState {
    pub spec: ServerSpec,
    pub status: ServerStatus,
    /// Meaningful only while Running; forced false on every exit.
    pub healthy: bool,
    pub last_error: Option<String>,
    /// Child PID (and process group id); 0 when no child.
    pub pid: i32,
    pub logs: SharedLogBuffer,
    /// Crash instants inside the governor window.
    pub(crate) crashes: CrashTracker,
    /// Mirrors `status == Cooldown`, retained so a crash-backoff timer
    /// that lost a race is suppressed mid-transition.
    pub in_cooldown: bool,
    /// A manual restart's start half is pending on the exit event.
    pub(crate) restart_pending: bool,
    /// Spawns issued but revoked (stop raced the runner); their results
    /// are discarded and the children killed on arrival.
    pub(crate) discard_spawns: u32,
    /// Stop callers waiting for the exit event.
    pub(crate) stop_replies: Vec<oneshot::Sender<OpResult>>,
}

impl ServerState {
    fn new(spec: ServerSpec) -> Self {
        Self {
            spec,
            status: ServerStatus::Stopped,
            healthy: false,
            last_error: None,
            pid: 0,
            logs: LogBuffer::shared(),
            crashes: CrashTracker::new(),
            in_cooldown: false,
            restart_pending: false,
            discard_spawns: 0,
            stop_replies: Vec::new(),
        }
    }

    /// Wire snapshot of this server.
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            id: self.spec.id.clone(),
            name: self.spec.name.clone(),
            status: self.status,
            healthy: self.healthy,
            port: self.spec.port,
            last_error: self.last_error.clone(),
        }
    }
}

/// Everything the supervisor owns, behind one lock.
pub struct SupervisorState {
    pub settings: Settings,
    /// Set when the settings document failed to load; the server set is
    /// empty but the daemon keeps serving for diagnostics.
    pub config_error: Option<String>,
    /// Configuration order preserved for listings.
    pub servers: IndexMap<String, ServerState>,
}

impl SupervisorState {
    pub fn from_settings(settings: Settings, config_error: Option<String>) -> Self {
        let servers = settings
            .servers
            .iter()
            .map(|spec| (spec.id.clone(), ServerState::new(spec.clone())))
            .collect();
        Self { settings, config_error, servers }
    }

    pub fn list_info(&self) -> Vec<ServerInfo> {
        self.servers.values().map(ServerState::info).collect()
    }

    pub fn get_info(&self, id: &str) -> Option<ServerInfo> {
        self.servers.get(id).map(ServerState::info)
    }

    pub fn get_logs(&self, id: &str, lines: usize) -> Option<LogsResponse> {
        let state = self.servers.get(id)?;
        let logs = state.logs.lock();
        Some(LogsResponse {
            id: id.to_string(),
            lines: logs.snapshot_last(lines).into_iter().map(|e| e.line).collect(),
            total_lines: logs.len(),
        })
    }
}

/// A reload waiting for the last old child to die before the state is
/// rebuilt and the caller answered.
struct PendingReload {
    waiting: HashSet<String>,
    reply: Option<oneshot::Sender<OpResult>>,
}

/// The supervisor: single owner of server state.
///
/// One explicitly-constructed instance is passed by handle to every
/// collaborator (listener, lifecycle); there is no global.
pub struct Supervisor<A: ProcessAdapter, C: Clock> {
    state: Arc<Mutex<SupervisorState>>,
    executor: Executor<A, C>,
    scheduler: Arc<Mutex<Scheduler>>,
    clock: C,
    settings_path: PathBuf,
    changes: broadcast::Sender<ServerInfo>,
    pending_reload: Mutex<Option<PendingReload>>,
}

impl<A: ProcessAdapter, C: Clock> Supervisor<A, C> {
    pub fn new(
        adapter: Arc<A>,
        clock: C,
        settings: Settings,
        config_error: Option<String>,
        settings_path: PathBuf,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        let scheduler = Arc::new(Mutex::new(Scheduler::new()));
        let executor = Executor::new(adapter, clock.clone(), event_tx, Arc::clone(&scheduler));
        let (changes, _) = broadcast::channel(256);
        Self {
            state: Arc::new(Mutex::new(SupervisorState::from_settings(settings, config_error))),
            executor,
            scheduler,
            clock,
            settings_path,
            changes,
            pending_reload: Mutex::new(None),
        }
    }

    /// Shared state handle for snapshot readers (the HTTP listener).
    pub fn state_handle(&self) -> Arc<Mutex<SupervisorState>> {
        Arc::clone(&self.state)
    }

    /// Change feed for UI layers; every status/health transition is
    /// published as a fresh [`ServerInfo`].
    pub fn subscribe(&self) -> broadcast::Receiver<ServerInfo> {
        self.changes.subscribe()
    }

    /// Process one event. The only entry point that mutates state.
    pub fn handle_event(&self, event: Event) {
        match event {
            Event::Command(cmd) => self.handle_command(cmd),
            Event::ChildSpawned { id, pid } => self.on_child_spawned(&id, pid),
            Event::SpawnFailed { id, error } => self.on_spawn_failed(&id, &error),
            Event::ChildExited { id, pid, code } => self.on_child_exited(&id, pid, code),
            Event::ProbeResult { id, healthy } => self.on_probe_result(&id, healthy),
            Event::TimerFired { timer } => self.on_timer(&timer),
        }
    }

    /// Fire due timers back through the state machine. Called from the
    /// engine loop tick (and directly by tests driving a fake clock).
    pub fn pump_timers(&self) {
        let fired = self.scheduler.lock().fired(self.clock.now());
        for event in fired {
            self.handle_event(event);
        }
    }

    /// Synchronous best-effort teardown for process exit: SIGKILL every
    /// live process group, give the kernel a beat, then reclaim every
    /// configured port from survivors. The one code path allowed to
    /// block its caller.
    pub async fn force_stop_all(&self) {
        self.executor.stop_all_probes();
        self.scheduler.lock().clear();
        let (pids, ports) = {
            let mut state = self.state.lock();
            let mut pids = Vec::new();
            let mut ports = Vec::new();
            for (_, st) in state.servers.iter_mut() {
                if st.pid != 0 {
                    pids.push(st.pid);
                    st.pid = 0;
                    // Only ports a child actually held are reclaimed.
                    if let Some(port) = st.spec.port {
                        ports.push(port);
                    }
                }
                st.status = ServerStatus::Stopped;
                st.healthy = false;
                st.in_cooldown = false;
                st.restart_pending = false;
                st.crashes.clear();
                for reply in st.stop_replies.drain(..) {
                    let _ = reply.send(Ok("Stopped".to_string()));
                }
            }
            (pids, ports)
        };
        if let Some(pending) = self.pending_reload.lock().take() {
            if let Some(reply) = pending.reply {
                let _ = reply.send(Err(stagehand_core::OpError::Failed(
                    "supervisor shutting down".to_string(),
                )));
            }
        }

        if pids.is_empty() && ports.is_empty() {
            return;
        }
        info!(children = pids.len(), "force-stopping all children");
        for pid in &pids {
            self.executor.adapter().force_stop(*pid);
        }
        if !pids.is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
        for port in ports {
            crate::process::reclaim_port(port).await;
        }
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }

    /// Run effects outside the state lock.
    fn run_effects(&self, effects: Vec<stagehand_core::Effect>) {
        if effects.is_empty() {
            return;
        }
        let extra_paths = {
            let state = self.state.lock();
            let mut paths = state.settings.extra_paths.clone();
            paths.extend(crate::env::extra_paths());
            paths
        };
        for effect in effects {
            self.executor.execute(effect, &extra_paths);
        }
    }

    /// Publish snapshots to the change feed.
    fn notify(&self, notes: Vec<ServerInfo>) {
        for info in notes {
            // Send only fails with no subscribers, which is the common
            // headless case.
            let _ = self.changes.send(info);
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.unix_ms()
    }
}
