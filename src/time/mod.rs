//! Default tick source.
//!
//! Quantum expiry and wall-clock conversions are the external timer's job
//! (see `platform::Clock`); the only thing this crate owns is a tick
//! counter a host can wire up as the `Clock` collaborator when it has no
//! better one of its own.

use crate::platform::Clock;
use portable_atomic::{AtomicU64, Ordering};

/// Monotonic tick counter, incremented by the host's timer interrupt
/// handler. Grounded in NachOS's `kernel->stats->totalTicks`.
pub struct TickClock {
    ticks: AtomicU64,
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Advance the counter by one tick. Called from the timer interrupt
    /// handler, never from scheduler code.
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TickClock {
    fn now_tick(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}
