// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External control operations.

use super::super::{PendingReload, Supervisor, SupervisorState};
use crate::process::ProcessAdapter;
use stagehand_core::governor::RESTART_SETTLE;
use stagehand_core::{
    Clock, Command, Effect, Op, OpError, OpResult, ServerInfo, ServerStatus, Settings, TimerId,
};
use std::collections::HashSet;
use tokio::sync::oneshot;
use tracing::{info, warn};

fn send(reply: Option<oneshot::Sender<OpResult>>, result: OpResult) {
    if let Some(reply) = reply {
        // A dropped receiver just means the HTTP client went away.
        let _ = reply.send(result);
    }
}

impl<A: ProcessAdapter, C: Clock> Supervisor<A, C> {
    pub(in crate::engine) fn handle_command(&self, cmd: Command) {
        let Command { op, reply } = cmd;
        info!(?op, "handling command");
        match op {
            Op::Start { id } => self.cmd_start(&id, reply),
            Op::Stop { id } => self.cmd_stop(&id, reply),
            Op::Restart { id } => self.cmd_restart(&id, reply),
            Op::ClearLogs { id } => self.cmd_clear_logs(&id, reply),
            Op::StartAll => self.cmd_start_all(reply),
            Op::StopAll => self.cmd_stop_all(reply),
            Op::Reload => self.cmd_reload(reply),
        }
    }

    fn cmd_start(&self, id: &str, reply: Option<oneshot::Sender<OpResult>>) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        let result = {
            let mut state = self.state.lock();
            match state.servers.get_mut(id) {
                None => Err(OpError::NotFound),
                Some(st) if st.status.has_child() => {
                    Ok(format!("{} is already running", st.spec.name))
                }
                Some(st) => {
                    self.begin_start(st, &mut effects);
                    notes.push(st.info());
                    Ok(format!("Starting {}", st.spec.name))
                }
            }
        };
        self.run_effects(effects);
        self.notify(notes);
        send(reply, result);
    }

    fn cmd_stop(&self, id: &str, mut reply: Option<oneshot::Sender<OpResult>>) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        let result = {
            let mut state = self.state.lock();
            match state.servers.get_mut(id) {
                None => Some(Err(OpError::NotFound)),
                Some(st) if st.pid == 0 && st.status == ServerStatus::Stopped => {
                    Some(Ok(format!("{} is not running", st.spec.name)))
                }
                Some(st) => {
                    let exit_pending = self.halt(st, &mut effects);
                    notes.push(st.info());
                    if exit_pending {
                        // Answer once the exit event lands, so callers
                        // observe a fully dead child.
                        if let Some(tx) = reply.take() {
                            st.stop_replies.push(tx);
                        }
                        None
                    } else {
                        Some(Ok(format!("Stopped {}", st.spec.name)))
                    }
                }
            }
        };
        self.run_effects(effects);
        self.notify(notes);
        if let Some(result) = result {
            send(reply, result);
        }
    }

    fn cmd_restart(&self, id: &str, reply: Option<oneshot::Sender<OpResult>>) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        let result = {
            let mut state = self.state.lock();
            match state.servers.get_mut(id) {
                None => Err(OpError::NotFound),
                Some(st) => {
                    let exit_pending = self.halt(st, &mut effects);
                    if exit_pending {
                        st.restart_pending = true;
                    } else {
                        effects.push(Effect::SetTimer {
                            timer: TimerId::settle(&st.spec.id),
                            after: RESTART_SETTLE,
                        });
                    }
                    notes.push(st.info());
                    Ok(format!("Restarting {}", st.spec.name))
                }
            }
        };
        self.run_effects(effects);
        self.notify(notes);
        send(reply, result);
    }

    fn cmd_clear_logs(&self, id: &str, reply: Option<oneshot::Sender<OpResult>>) {
        let result = {
            let state = self.state.lock();
            match state.servers.get(id) {
                None => Err(OpError::NotFound),
                Some(st) => {
                    st.logs.lock().clear();
                    Ok(format!("Logs cleared for {}", st.spec.name))
                }
            }
        };
        send(reply, result);
    }

    fn cmd_start_all(&self, reply: Option<oneshot::Sender<OpResult>>) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock();
            for (_, st) in state.servers.iter_mut() {
                if !st.status.has_child() {
                    self.begin_start(st, &mut effects);
                    notes.push(st.info());
                }
            }
        }
        self.run_effects(effects);
        self.notify(notes);
        send(reply, Ok("Starting all servers".to_string()));
    }

    fn cmd_stop_all(&self, reply: Option<oneshot::Sender<OpResult>>) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock();
            for (_, st) in state.servers.iter_mut() {
                if !(st.pid == 0 && st.status == ServerStatus::Stopped) {
                    self.halt(st, &mut effects);
                    notes.push(st.info());
                }
            }
        }
        self.run_effects(effects);
        self.notify(notes);
        send(reply, Ok("Stopping all servers".to_string()));
    }

    /// Stop everything, wait for the last old child, then rebuild state
    /// from the settings file. The reply holds until the rebuild is
    /// done, so callers observe the new server set.
    fn cmd_reload(&self, reply: Option<oneshot::Sender<OpResult>>) {
        if self.pending_reload.lock().is_some() {
            send(reply, Err(OpError::Failed("Reload already in progress".to_string())));
            return;
        }

        self.executor.stop_all_probes();
        self.scheduler.lock().clear();

        let mut effects = Vec::new();
        let mut waiting = HashSet::new();
        let finished = {
            let mut state = self.state.lock();
            for (id, st) in state.servers.iter_mut() {
                if self.halt(st, &mut effects) {
                    waiting.insert(id.clone());
                }
            }
            if waiting.is_empty() {
                Some(self.rebuild(&mut state))
            } else {
                None
            }
        };
        self.run_effects(effects);

        match finished {
            Some((result, notes)) => {
                self.notify(notes);
                send(reply, result);
            }
            None => {
                info!(waiting = waiting.len(), "reload waiting for children to exit");
                *self.pending_reload.lock() = Some(PendingReload { waiting, reply });
            }
        }
    }

    /// Re-load the settings document and rebuild every [`ServerState`].
    pub(in crate::engine) fn rebuild(
        &self,
        state: &mut SupervisorState,
    ) -> (OpResult, Vec<ServerInfo>) {
        let (settings, config_error) = match Settings::load(&self.settings_path) {
            Ok(settings) => (settings, None),
            Err(e) => {
                warn!(error = %e, "settings reload failed, running with empty server set");
                (Settings::default(), Some(e.to_string()))
            }
        };
        let result = match &config_error {
            None => Ok("Settings reloaded".to_string()),
            Some(e) => Err(OpError::Failed(format!("Settings reload failed: {e}"))),
        };
        *state = SupervisorState::from_settings(settings, config_error);
        let notes = state.list_info();
        info!(servers = state.servers.len(), "settings reloaded");
        (result, notes)
    }
}
