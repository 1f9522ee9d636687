// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Stagehand daemon: keeps a set of declaratively-configured dev servers
//! alive and controllable.
//!
//! Architecture:
//! - Supervisor loop: single task consuming the event channel; the only
//!   place server state mutates
//! - Executor: performs effects (spawn, signal, timers, probers) and
//!   posts completions back as events
//! - Listener task: loopback HTTP control surface; reads state
//!   snapshots, injects commands
//!
//! UI layers are external: they subscribe to the supervisor's change
//! feed and drive the same HTTP surface.

pub mod engine;
pub mod env;
pub mod health;
pub mod lifecycle;
pub mod listener;
pub mod process;

pub use engine::{ServerState, Supervisor, SupervisorState};
pub use process::{ProcessAdapter, ShellAdapter, SpawnError, SpawnRequest};
