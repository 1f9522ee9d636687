// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor's inbox.
//!
//! Every mutation of server state enters through exactly one channel of
//! these events, consumed by the single supervisor task. FIFO delivery
//! per channel is what makes the lifecycle ordering guarantee hold: the
//! engine never sees an exit for a child it has not acknowledged
//! starting, and never starts a new child while the prior one is live.

use crate::timer::TimerId;
use thiserror::Error;
use tokio::sync::oneshot;

/// Everything the supervisor task reacts to.
#[derive(Debug)]
pub enum Event {
    /// External control operation (HTTP listener, lifecycle).
    Command(Command),
    /// The runner finished spawning a child.
    ChildSpawned { id: String, pid: i32 },
    /// The runner failed before a child existed.
    SpawnFailed { id: String, error: String },
    /// A child exited; `code` is `None` for signal deaths. The pid lets
    /// the engine drop exits from children it has already disowned.
    ChildExited { id: String, pid: i32, code: Option<i32> },
    /// One TCP liveness probe completed.
    ProbeResult { id: String, healthy: bool },
    /// A scheduler deadline elapsed.
    TimerFired { timer: TimerId },
}

/// A control operation plus an optional completion reply.
///
/// Operations that promise a postcondition (stop, reload) hold the
/// reply until the supervisor has observed it; the rest acknowledge as
/// soon as the work is underway.
pub struct Command {
    pub op: Op,
    pub reply: Option<oneshot::Sender<OpResult>>,
}

impl Command {
    pub fn new(op: Op) -> Self {
        Self { op, reply: None }
    }

    pub fn with_reply(op: Op) -> (Self, oneshot::Receiver<OpResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { op, reply: Some(tx) }, rx)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("op", &self.op)
            .field("reply", &self.reply.is_some())
            .finish()
    }
}

/// Control operations exposed by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Start { id: String },
    Stop { id: String },
    Restart { id: String },
    ClearLogs { id: String },
    StartAll,
    StopAll,
    Reload,
}

/// Outcome of a control operation: a human-readable message on success.
pub type OpResult = Result<String, OpError>;

/// Why a control operation was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpError {
    #[error("Server not found")]
    NotFound,
    #[error("{0}")]
    Failed(String),
}
