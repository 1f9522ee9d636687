// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so timer and governor logic is testable.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of the current time.
///
/// `now()` feeds deadlines and the crash window; `unix_ms()` stamps log
/// lines for display.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn unix_ms(&self) -> u64;
}

/// The real wall clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Controllable clock for tests.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeNow>>,
}

struct FakeNow {
    instant: Instant,
    unix_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(FakeNow { instant: Instant::now(), unix_ms: 1_700_000_000_000 })) }
    }

    /// Move both the monotonic and wall readings forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.inner.lock();
        now.instant += by;
        now.unix_ms += by.as_millis() as u64;
    }

    pub fn set_unix_ms(&self, ms: u64) {
        self.inner.lock().unix_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn unix_ms(&self) -> u64 {
        self.inner.lock().unix_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
