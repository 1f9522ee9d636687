// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer events: crash backoff, cooldown expiry, restart settle.

use super::super::Supervisor;
use crate::process::ProcessAdapter;
use stagehand_core::{Clock, ServerStatus, TimerId, TimerKind};
use tracing::{debug, info, warn};

impl<A: ProcessAdapter, C: Clock> Supervisor<A, C> {
    pub(in crate::engine) fn on_timer(&self, timer: &TimerId) {
        let Some(kind) = timer.kind() else {
            warn!(%timer, "fired timer with unknown id");
            return;
        };
        let mut effects = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock();
            match kind {
                TimerKind::Restart { server_id } => {
                    let Some(st) = state.servers.get_mut(server_id) else { return };
                    // Skip if the server was stopped or reached cooldown
                    // after this timer was armed.
                    if st.status != ServerStatus::Crashed || st.in_cooldown {
                        debug!(server_id, status = %st.status, "restart timer no longer applies");
                        return;
                    }
                    info!(server_id, "restarting after crash backoff");
                    self.begin_start(st, &mut effects);
                    notes.push(st.info());
                }
                TimerKind::Cooldown { server_id } => {
                    let Some(st) = state.servers.get_mut(server_id) else { return };
                    if st.status != ServerStatus::Cooldown {
                        debug!(server_id, status = %st.status, "cooldown timer no longer applies");
                        return;
                    }
                    info!(server_id, "cooldown ended");
                    st.crashes.clear();
                    st.in_cooldown = false;
                    self.log_system(st, "[system] Cooldown ended — restarting");
                    self.begin_start(st, &mut effects);
                    notes.push(st.info());
                }
                TimerKind::Settle { server_id } => {
                    let Some(st) = state.servers.get_mut(server_id) else { return };
                    // Only complete the restart if nothing intervened.
                    if st.status != ServerStatus::Stopped || st.pid != 0 {
                        debug!(server_id, status = %st.status, "settle timer no longer applies");
                        return;
                    }
                    self.begin_start(st, &mut effects);
                    notes.push(st.info());
                }
            }
        }
        self.run_effects(effects);
        self.notify(notes);
    }
}
