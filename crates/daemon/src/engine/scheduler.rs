// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline scheduler for restart, cooldown, and settle timers.
//!
//! Timers live in a map keyed by [`TimerId`], so stopping or reloading
//! a server cancels its pending work by id. The engine loop's tick
//! drains due timers back into the event stream.

use stagehand_core::{Event, TimerId};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    deadlines: HashMap<TimerId, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer; re-arming an id replaces its deadline.
    pub fn set(&mut self, timer: TimerId, at: Instant) {
        self.deadlines.insert(timer, at);
    }

    pub fn cancel(&mut self, timer: &TimerId) {
        self.deadlines.remove(timer);
    }

    /// Drop every pending timer (reload, shutdown).
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Remove and return events for every timer due at `now`, in
    /// deadline order.
    pub fn fired(&mut self, now: Instant) -> Vec<Event> {
        let mut due: Vec<(TimerId, Instant)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, at)| (id.clone(), *at))
            .collect();
        due.sort_by_key(|(_, at)| *at);
        for (id, _) in &due {
            self.deadlines.remove(id);
        }
        due.into_iter().map(|(timer, _)| Event::TimerFired { timer }).collect()
    }

    pub fn has_timers(&self) -> bool {
        !self.deadlines.is_empty()
    }

    pub fn is_armed(&self, timer: &TimerId) -> bool {
        self.deadlines.contains_key(timer)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
