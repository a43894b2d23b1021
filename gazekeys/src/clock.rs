//! Clock abstraction for deterministic testing.
//!
//! The headless backend uses `SystemClock`. Tests drive the session with
//! `TestClock` and advance time by hand, so dwell and blink timing never
//! depends on real sleeps.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of monotonic time for gaze sampling, ticks and debounce.
pub trait Clock {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;

    /// Time elapsed since `earlier`, saturating at zero.
    fn since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Production clock backed by `Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock.
///
/// Single-threaded like the rest of the session, so plain `Cell` suffices.
#[derive(Debug)]
pub struct TestClock {
    instant: Cell<Instant>,
}

impl TestClock {
    /// Create a test clock anchored at the current real time.
    pub fn new() -> Self {
        Self {
            instant: Cell::new(Instant::now()),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.instant.set(self.instant.get() + duration);
    }

    /// Advance time by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.instant.get()
    }
}
