// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor: the I/O half of the supervisor.
//!
//! Handlers stay synchronous; anything that blocks (spawning, the
//! TERM-grace-KILL sequence, probing) runs in its own task and reports
//! back through the event channel.

use super::scheduler::Scheduler;
use crate::health;
use crate::process::ProcessAdapter;
use parking_lot::Mutex;
use stagehand_core::{Clock, Effect, Event};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) struct Executor<A: ProcessAdapter, C: Clock> {
    adapter: Arc<A>,
    clock: C,
    event_tx: mpsc::Sender<Event>,
    scheduler: Arc<Mutex<Scheduler>>,
    probers: Mutex<HashMap<String, CancellationToken>>,
}

impl<A: ProcessAdapter, C: Clock> Executor<A, C> {
    pub fn new(
        adapter: Arc<A>,
        clock: C,
        event_tx: mpsc::Sender<Event>,
        scheduler: Arc<Mutex<Scheduler>>,
    ) -> Self {
        Self { adapter, clock, event_tx, scheduler, probers: Mutex::new(HashMap::new()) }
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn execute(&self, effect: Effect, extra_paths: &[String]) {
        debug!(effect = effect.name(), "executing effect");
        match effect {
            Effect::Spawn { id, spec, logs } => {
                let req = crate::process::SpawnRequest {
                    id: id.clone(),
                    spec: *spec,
                    logs,
                    extra_paths: extra_paths.to_vec(),
                };
                let adapter = Arc::clone(&self.adapter);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    // The adapter posts ChildSpawned itself (before its
                    // exit watcher starts); only failures come back here.
                    if let Err(e) = adapter.spawn(req, tx.clone()).await {
                        let event = Event::SpawnFailed { id, error: e.to_string() };
                        if tx.send(event).await.is_err() {
                            debug!("supervisor gone, dropping spawn failure");
                        }
                    }
                });
            }
            Effect::StopChild { pid } => {
                let adapter = Arc::clone(&self.adapter);
                tokio::spawn(async move {
                    adapter.stop(pid).await;
                });
            }
            Effect::ForceStopChild { pid } => {
                self.adapter.force_stop(pid);
            }
            Effect::SetTimer { timer, after } => {
                let at = self.clock.now() + after;
                self.scheduler.lock().set(timer, at);
            }
            Effect::CancelTimer { timer } => {
                self.scheduler.lock().cancel(&timer);
            }
            Effect::StartProbe { id, hostname, port } => {
                let token = CancellationToken::new();
                // At most one prober per server: replacing an id cancels
                // the previous task.
                if let Some(old) = self.probers.lock().insert(id.clone(), token.clone()) {
                    old.cancel();
                }
                health::spawn_prober(id, hostname, port, self.event_tx.clone(), token);
            }
            Effect::StopProbe { id } => {
                if let Some(token) = self.probers.lock().remove(&id) {
                    token.cancel();
                }
            }
        }
    }

    /// Cancel every prober (reload, shutdown).
    pub fn stop_all_probes(&self) {
        for (_, token) in self.probers.lock().drain() {
            token.cancel();
        }
    }
}
