// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process events: spawn results, exits, probe results.

use super::super::Supervisor;
use crate::process::ProcessAdapter;
use stagehand_core::governor::RESTART_SETTLE;
use stagehand_core::{Clock, Effect, ServerStatus, TimerId};
use tracing::{debug, info, warn};

impl<A: ProcessAdapter, C: Clock> Supervisor<A, C> {
    pub(in crate::engine) fn on_child_spawned(&self, id: &str, pid: i32) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(st) = state.servers.get_mut(id) else {
                // The server set changed under the spawn (reload); the
                // child belongs to nobody now.
                warn!(id, pid, "spawn completed for unknown server, killing child");
                drop(state);
                self.run_effects(vec![Effect::ForceStopChild { pid }]);
                return;
            };
            if st.discard_spawns > 0 {
                st.discard_spawns -= 1;
                debug!(id, pid, "discarding revoked spawn");
                effects.push(Effect::ForceStopChild { pid });
            } else if st.status == ServerStatus::Starting {
                st.status = ServerStatus::Running;
                st.pid = pid;
                self.log_system(st, &format!("[system] Started with PID {pid}"));
                info!(id, pid, "server running");
                if let Some(port) = st.spec.port {
                    effects.push(Effect::StartProbe {
                        id: id.to_string(),
                        hostname: st.spec.hostname.clone(),
                        port,
                    });
                }
                notes.push(st.info());
            } else {
                // Stopped while the runner was working: no orphan
                // survives the race.
                debug!(id, pid, status = %st.status, "spawn landed after stop, killing child");
                effects.push(Effect::ForceStopChild { pid });
            }
        }
        self.run_effects(effects);
        self.notify(notes);
    }

    pub(in crate::engine) fn on_spawn_failed(&self, id: &str, error: &str) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(st) = state.servers.get_mut(id) else {
                debug!(id, error, "spawn failure for unknown server");
                return;
            };
            if st.discard_spawns > 0 {
                st.discard_spawns -= 1;
                return;
            }
            if st.status != ServerStatus::Starting {
                return;
            }
            warn!(id, error, "spawn failed");
            st.last_error = Some(error.to_string());
            self.log_system(st, &format!("[system] Failed to start: {error}"));
            self.apply_crash(st, &mut effects);
            notes.push(st.info());
        }
        self.run_effects(effects);
        self.notify(notes);
    }

    pub(in crate::engine) fn on_child_exited(&self, id: &str, pid: i32, code: Option<i32>) {
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        let mut replies = Vec::new();
        let mut stop_message = String::new();
        {
            let mut state = self.state.lock();
            let Some(st) = state.servers.get_mut(id) else {
                debug!(id, pid, "exit for unknown server");
                return;
            };
            if st.pid != pid {
                // A disowned child (revoked spawn, pre-reload process).
                debug!(id, pid, current = st.pid, "exit from disowned child");
                return;
            }
            st.pid = 0;
            st.healthy = false;
            effects.push(Effect::StopProbe { id: id.to_string() });

            if st.status == ServerStatus::Stopped {
                // Stop-initiated death: release the waiting callers and
                // kick off the second half of a manual restart.
                info!(id, pid, "child stopped");
                replies.append(&mut st.stop_replies);
                stop_message = format!("Stopped {}", st.spec.name);
                if st.restart_pending {
                    st.restart_pending = false;
                    effects.push(Effect::SetTimer {
                        timer: TimerId::settle(id),
                        after: RESTART_SETTLE,
                    });
                }
            } else {
                match code {
                    Some(0) => {
                        info!(id, pid, "child exited cleanly");
                        st.status = ServerStatus::Stopped;
                        st.crashes.clear();
                    }
                    _ => {
                        warn!(id, pid, ?code, "child crashed");
                        st.status = ServerStatus::Crashed;
                        st.last_error = Some(format!("exited with code {}", code.unwrap_or(-1)));
                        self.apply_crash(st, &mut effects);
                    }
                }
            }
            notes.push(st.info());

            // The last exit a reload was waiting on completes it.
            let mut pending = self.pending_reload.lock();
            let finished = match pending.as_mut() {
                Some(reload) => {
                    reload.waiting.remove(id);
                    reload.waiting.is_empty()
                }
                None => false,
            };
            if finished {
                if let Some(reload) = pending.take() {
                    drop(pending);
                    let (result, rebuilt) = self.rebuild(&mut state);
                    notes = rebuilt;
                    if let Some(reply) = reload.reply {
                        let _ = reply.send(result);
                    }
                }
            }
        }
        self.run_effects(effects);
        self.notify(notes);
        for reply in replies {
            let _ = reply.send(Ok(stop_message.clone()));
        }
    }

    pub(in crate::engine) fn on_probe_result(&self, id: &str, healthy: bool) {
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(st) = state.servers.get_mut(id) else { return };
            // Health only means something while Running; late results
            // from a cancelled prober are dropped.
            if st.status != ServerStatus::Running {
                return;
            }
            if st.healthy != healthy {
                info!(id, healthy, "health changed");
                st.healthy = healthy;
                notes.push(st.info());
            }
        }
        self.notify(notes);
    }
}
