// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handlers for the supervisor state machine.
//!
//! Split by event source: external commands, child process events, and
//! timers. Shared transition helpers live here.

mod child;
mod commands;
mod timer;

use super::{ServerState, Supervisor};
use crate::process::ProcessAdapter;
use stagehand_core::governor::{COOLDOWN, MAX_CRASHES, RESTART_BACKOFF};
use stagehand_core::{Clock, Effect, ServerStatus, TimerId, Verdict};

impl<A: ProcessAdapter, C: Clock> Supervisor<A, C> {
    /// Append a `[system]` line to a server's log buffer.
    pub(super) fn log_system(&self, st: &ServerState, message: &str) {
        st.logs.lock().append(self.now_ms(), message);
    }

    /// Cancel every timer a server owns.
    pub(super) fn cancel_timers(id: &str, effects: &mut Vec<Effect>) {
        effects.push(Effect::CancelTimer { timer: TimerId::restart(id) });
        effects.push(Effect::CancelTimer { timer: TimerId::cooldown(id) });
        effects.push(Effect::CancelTimer { timer: TimerId::settle(id) });
    }

    /// Transition into Starting and request a spawn. Callers have
    /// already verified no child is live.
    pub(super) fn begin_start(&self, st: &mut ServerState, effects: &mut Vec<Effect>) {
        let id = st.spec.id.clone();
        Self::cancel_timers(&id, effects);
        st.status = ServerStatus::Starting;
        st.healthy = false;
        st.last_error = None;
        st.in_cooldown = false;
        effects.push(Effect::Spawn {
            id,
            spec: Box::new(st.spec.clone()),
            logs: st.logs.clone(),
        });
    }

    /// Transition into Stopped from any state, revoking whatever is in
    /// flight. Returns true when a live child must still exit before the
    /// stop is complete.
    pub(super) fn halt(&self, st: &mut ServerState, effects: &mut Vec<Effect>) -> bool {
        let id = st.spec.id.clone();
        Self::cancel_timers(&id, effects);
        effects.push(Effect::StopProbe { id });
        st.healthy = false;
        st.in_cooldown = false;
        st.restart_pending = false;
        st.crashes.clear();

        let was_stopped = st.status == ServerStatus::Stopped;
        if st.pid == 0 && st.status == ServerStatus::Starting {
            // Spawn in flight: the runner's result gets discarded and
            // the child killed on arrival.
            st.discard_spawns += 1;
        }
        st.status = ServerStatus::Stopped;
        if st.pid != 0 {
            if !was_stopped {
                effects.push(Effect::StopChild { pid: st.pid });
            }
            true
        } else {
            false
        }
    }

    /// Record a crash and apply the governor's verdict.
    pub(super) fn apply_crash(&self, st: &mut ServerState, effects: &mut Vec<Effect>) {
        let count = st.crashes.record(self.clock_now());
        match Verdict::judge(count) {
            Verdict::Restart { attempt } => {
                st.status = ServerStatus::Crashed;
                self.log_system(
                    st,
                    &format!("[system] Crashed — restarting ({attempt}/{MAX_CRASHES})"),
                );
                effects.push(Effect::SetTimer {
                    timer: TimerId::restart(&st.spec.id),
                    after: RESTART_BACKOFF,
                });
            }
            Verdict::Cooldown => {
                st.status = ServerStatus::Cooldown;
                st.in_cooldown = true;
                st.crashes.clear();
                let minutes = COOLDOWN.as_secs() / 60;
                self.log_system(
                    st,
                    &format!("[system] Too many crashes — cooldown for {minutes} minutes"),
                );
                effects.push(Effect::SetTimer {
                    timer: TimerId::cooldown(&st.spec.id),
                    after: COOLDOWN,
                });
            }
        }
    }

    pub(super) fn clock_now(&self) -> std::time::Instant {
        self.clock.now()
    }
}
