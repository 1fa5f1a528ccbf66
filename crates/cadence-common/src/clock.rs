//! Monotonic clocks for playback bookkeeping.
//!
//! One-shot sounds have no completion event, so sound instances track their
//! own progress against a clock. The clock is injected so that hosts use the
//! real monotonic time while tests advance time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time in nanoseconds.
pub trait Clock: Send + Sync {
    /// Nanoseconds elapsed since an arbitrary, fixed origin.
    fn now_nanos(&self) -> u64;

    /// Nanoseconds elapsed since `start`, saturating at zero.
    fn nanos_since(&self, start: u64) -> u64 {
        self.now_nanos().saturating_sub(start)
    }
}

/// Clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        // u64 nanoseconds covers ~584 years of uptime.
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Moves time forward by whole milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Moves time forward by fractional seconds.
    pub fn advance_secs_f32(&self, secs: f32) {
        self.advance(Duration::from_secs_f32(secs.max(0.0)));
    }

    /// Sets the absolute time.
    pub fn set_nanos(&self, nanos: u64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
}
