//! In-memory `Platform` implementation for host tests.
//!
//! Grounded in the teacher's `tests/helpers.rs::TestEnvironment` pattern:
//! a small owned fixture instead of a global. The clock is advanced by
//! hand (`set_tick`/`advance`) so aging boundary tests are exact; the
//! logger captures formatted lines so tests can assert on the `[A]`/
//! `[B]`/`[C]`/`[E]` wire format from spec.md §6.

extern crate alloc;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use super::{Clock, DebugTag, InterruptGate, Logger, Switch};
use crate::thread::Thread;

/// Test double for all four platform collaborators.
pub struct TestPlatform {
    tick: AtomicU64,
    interrupts_disabled: AtomicBool,
    lines: Mutex<Vec<String>>,
    switches: Mutex<Vec<(u64, u64)>>,
}

impl TestPlatform {
    /// Interrupts start disabled, matching every Scheduler entry point's
    /// precondition; tests that want to check the assertion flip it off.
    pub fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
            interrupts_disabled: AtomicBool::new(true),
            lines: Mutex::new(Vec::new()),
            switches: Mutex::new(Vec::new()),
        }
    }

    pub fn set_tick(&self, tick: u64) {
        self.tick.store(tick, Ordering::Release);
    }

    pub fn advance(&self, by: u64) {
        self.tick.fetch_add(by, Ordering::AcqRel);
    }

    pub fn set_interrupts_disabled(&self, disabled: bool) {
        self.interrupts_disabled.store(disabled, Ordering::Release);
    }

    /// All captured log lines, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Captured log lines carrying a given tag prefix, e.g. `"[C]"`.
    pub fn lines_tagged(&self, prefix: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with(prefix))
            .collect()
    }

    /// (old_id, next_id) pairs passed to `switch`, in call order.
    pub fn switches(&self) -> Vec<(u64, u64)> {
        self.switches.lock().clone()
    }
}

impl Default for TestPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptGate for TestPlatform {
    fn interrupts_disabled(&self) -> bool {
        self.interrupts_disabled.load(Ordering::Acquire)
    }
}

impl Clock for TestPlatform {
    fn now_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }
}

impl Logger for TestPlatform {
    fn log(&self, _tag: DebugTag, args: fmt::Arguments<'_>) {
        self.lines.lock().push(format!("{}", args));
    }
}

impl Switch for TestPlatform {
    fn switch(&self, old: &Thread, next: &Thread) {
        self.switches
            .lock()
            .push((old.id().get(), next.id().get()));
    }
}
