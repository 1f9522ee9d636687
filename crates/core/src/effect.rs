// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor's outbox.
//!
//! Event handlers mutate state under the lock and return these; the
//! daemon executor performs the actual I/O (spawning, signaling,
//! timers, probers) and posts completions back as events. Keeping the
//! split lets the whole state machine run under test against a fake
//! process adapter.

use crate::logbuf::SharedLogBuffer;
use crate::spec::ServerSpec;
use crate::timer::TimerId;
use std::time::Duration;

/// Side effects requested by the state machine.
#[derive(Debug)]
pub enum Effect {
    /// Launch a child for `spec`; the runner reports back with
    /// `ChildSpawned` or `SpawnFailed` and streams output into `logs`.
    Spawn { id: String, spec: Box<ServerSpec>, logs: SharedLogBuffer },
    /// SIGTERM the child's process group, then SIGKILL after the grace
    /// period.
    StopChild { pid: i32 },
    /// SIGKILL the child's process group immediately.
    ForceStopChild { pid: i32 },
    /// Arm (or re-arm) a scheduler deadline.
    SetTimer { timer: TimerId, after: Duration },
    CancelTimer { timer: TimerId },
    /// Begin periodic TCP liveness probing for a running server.
    StartProbe { id: String, hostname: String, port: u16 },
    StopProbe { id: String },
}

impl Effect {
    /// Short name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Spawn { .. } => "spawn",
            Effect::StopChild { .. } => "stop_child",
            Effect::ForceStopChild { .. } => "force_stop_child",
            Effect::SetTimer { .. } => "set_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::StartProbe { .. } => "start_probe",
            Effect::StopProbe { .. } => "stop_probe",
        }
    }
}
