// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so worker/recovery timing is deterministic in tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of wall-clock and monotonic time.
///
/// Production code uses [`SystemClock`]; tests use [`FakeClock`] to advance
/// time explicitly instead of sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant, used for durations (e.g. "state for Xs").
    fn now(&self) -> Instant;
    /// Wall-clock epoch seconds, used for `StatusMessage::timestamp` display.
    fn epoch_secs(&self) -> u64;
}

/// Real clock backed by `std::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Deterministic clock for tests: starts at a fixed instant/epoch and only
/// advances when [`FakeClock::advance`] is called.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    now: Instant,
    epoch_secs: u64,
}

impl FakeClock {
    pub fn new(epoch_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now: Instant::now(),
                epoch_secs,
            })),
        }
    }

    pub fn advance(&self, d: Duration) {
        let mut state = self.inner.lock();
        state.now += d;
        state.epoch_secs += d.as_secs();
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn epoch_secs(&self) -> u64 {
        self.inner.lock().epoch_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_both_now_and_epoch() {
        let clock = FakeClock::new(1_700_000_000);
        let start = clock.now();
        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.epoch_secs(), 1_700_000_030);
        assert!(clock.now() >= start + Duration::from_secs(30));
    }
}
