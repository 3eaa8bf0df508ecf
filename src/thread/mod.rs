//! The thread control block.
//!
//! Stack allocation, register save areas, and the CPU-burst estimator are
//! out of scope for this crate (external collaborators per spec.md §1).
//! What's left is the handful of fields the scheduler core actually reads
//! and writes, plus two small hook traits (`AddressSpace`, `ThreadOps`) so
//! a host can wire in real state save/restore without the core depending
//! on any concrete machine type.

use crate::mem::ArcLite;
use portable_atomic::{AtomicU64, AtomicU8, Ordering};

extern crate alloc;
use alloc::string::String;
use alloc::sync::Arc;

/// A unique, small, totally-ordered thread identifier. Used as the
/// deterministic tie-breaker in SJF and priority selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    Ready = 0,
    Running = 1,
    Blocked = 2,
    Finished = 3,
}

impl ThreadState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ThreadState::Ready,
            1 => ThreadState::Running,
            2 => ThreadState::Blocked,
            _ => ThreadState::Finished,
        }
    }
}

/// Per-thread address space save/restore, invoked from `Scheduler::run`
/// when a thread carries one. A kernel thread with no address space of
/// its own leaves this `None`.
pub trait AddressSpace: Send + Sync {
    fn save_state(&self);
    fn restore_state(&self);
}

/// CPU-register-level hooks a host plugs in. Every method defaults to a
/// no-op so a test thread can carry neither.
pub trait ThreadOps: Send + Sync {
    fn save_user_state(&self) {}
    fn restore_user_state(&self) {}
    fn check_overflow(&self) {}
}

struct ThreadInner {
    id: ThreadId,
    name: String,
    status: AtomicU8,
    priority: AtomicU8,
    priority_updated_tick: AtomicU64,
    approx_burst_tick: AtomicU64,
    approx_remaining_tick: AtomicU64,
    accum_tick_with_reset: AtomicU64,
    address_space: Option<Arc<dyn AddressSpace>>,
    ops: Option<Arc<dyn ThreadOps>>,
}

/// A stable handle to a thread control block. Cheap to clone (bumps a
/// reference count); every clone refers to the same underlying block.
pub struct Thread {
    inner: ArcLite<ThreadInner>,
}

impl Thread {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ThreadId,
        name: String,
        priority: u8,
        approx_burst_tick: u64,
        address_space: Option<Arc<dyn AddressSpace>>,
        ops: Option<Arc<dyn ThreadOps>>,
    ) -> Self {
        assert!(
            priority < 150,
            "{}",
            crate::errors::SchedulerFault::PriorityOutOfRange(priority)
        );
        let inner = ThreadInner {
            id,
            name,
            status: AtomicU8::new(ThreadState::Ready as u8),
            priority: AtomicU8::new(priority),
            priority_updated_tick: AtomicU64::new(0),
            approx_burst_tick: AtomicU64::new(approx_burst_tick),
            approx_remaining_tick: AtomicU64::new(approx_burst_tick),
            accum_tick_with_reset: AtomicU64::new(0),
            address_space,
            ops,
        };
        Self {
            inner: ArcLite::new(inner),
        }
    }

    /// Convenience constructor for tests and simple kernel threads: no
    /// address space, no register hooks.
    pub fn spawn(id: ThreadId, name: &str, priority: u8, approx_burst_tick: u64) -> Self {
        Self::new(
            id,
            String::from(name),
            priority,
            approx_burst_tick,
            None,
            None,
        )
    }

    pub fn id(&self) -> ThreadId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn status(&self) -> ThreadState {
        ThreadState::from_u8(self.inner.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: ThreadState) {
        self.inner.status.store(status as u8, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.status() == ThreadState::Running
    }

    pub fn priority(&self) -> u8 {
        self.inner.priority.load(Ordering::Acquire)
    }

    pub fn set_priority(&self, priority: u8) {
        assert!(
            priority < 150,
            "{}",
            crate::errors::SchedulerFault::PriorityOutOfRange(priority)
        );
        self.inner.priority.store(priority, Ordering::Release);
    }

    pub fn priority_updated_tick(&self) -> u64 {
        self.inner.priority_updated_tick.load(Ordering::Acquire)
    }

    pub fn set_priority_updated_tick(&self, tick: u64) {
        self.inner
            .priority_updated_tick
            .store(tick, Ordering::Release);
    }

    pub fn approx_burst_tick(&self) -> u64 {
        self.inner.approx_burst_tick.load(Ordering::Acquire)
    }

    pub fn set_approx_burst_tick(&self, ticks: u64) {
        self.inner.approx_burst_tick.store(ticks, Ordering::Release);
    }

    pub fn approx_remaining_tick(&self) -> u64 {
        self.inner.approx_remaining_tick.load(Ordering::Acquire)
    }

    pub fn set_approx_remaining_tick(&self, ticks: u64) {
        self.inner
            .approx_remaining_tick
            .store(ticks, Ordering::Release);
    }

    /// Add ticks to the current run's accumulator. Called by the external
    /// timer interrupt handler while this thread is running, never by the
    /// scheduler core itself.
    pub fn accumulate_tick(&self, ticks: u64) {
        self.inner
            .accum_tick_with_reset
            .fetch_add(ticks, Ordering::AcqRel);
    }

    /// Read the accumulator and reset it to zero in one step. This is the
    /// semantics `Scheduler::run` uses for its `[E]` log line (spec.md
    /// §9's open question resolved in favor of read-and-reset).
    pub fn read_and_reset_accum_tick(&self) -> u64 {
        self.inner.accum_tick_with_reset.swap(0, Ordering::AcqRel)
    }

    pub fn address_space(&self) -> Option<&Arc<dyn AddressSpace>> {
        self.inner.address_space.as_ref()
    }

    pub fn save_user_state(&self) {
        if let Some(ops) = &self.inner.ops {
            ops.save_user_state();
        }
    }

    pub fn restore_user_state(&self) {
        if let Some(ops) = &self.inner.ops {
            ops.restore_user_state();
        }
    }

    pub fn check_overflow(&self) {
        if let Some(ops) = &self.inner.ops {
            ops.check_overflow();
        }
    }
}

impl Clone for Thread {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Thread {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_ready_with_given_priority() {
        let t = Thread::spawn(ThreadId::new(1), "alpha", 42, 10);
        assert_eq!(t.status(), ThreadState::Ready);
        assert_eq!(t.priority(), 42);
        assert_eq!(t.approx_burst_tick(), 10);
        assert_eq!(t.approx_remaining_tick(), 10);
    }

    #[test]
    #[should_panic]
    fn rejects_out_of_range_priority() {
        Thread::spawn(ThreadId::new(1), "bad", 150, 0);
    }

    #[test]
    fn accum_tick_reads_and_resets() {
        let t = Thread::spawn(ThreadId::new(1), "alpha", 10, 5);
        t.accumulate_tick(3);
        t.accumulate_tick(4);
        assert_eq!(t.read_and_reset_accum_tick(), 7);
        assert_eq!(t.read_and_reset_accum_tick(), 0);
    }

    #[test]
    fn clones_share_identity() {
        let t = Thread::spawn(ThreadId::new(7), "shared", 10, 0);
        let clone = t.clone();
        clone.set_priority(99);
        assert_eq!(t.priority(), 99);
        assert_eq!(t, clone);
    }
}
