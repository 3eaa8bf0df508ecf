//! The three ready-queue selection disciplines.
//!
//! spec.md §9 calls out that a closed sum type beats virtual dispatch here:
//! exactly three variants exist and each overrides only `remove_best`, so
//! each gets its own concrete struct rather than a trait object. The
//! membership bookkeeping they share (dedup-on-push, linear `contains`,
//! `remove` by id, snapshotting for `elevate_threads`) lives in one small
//! private helper instead of being duplicated three times.

extern crate alloc;
use alloc::vec::Vec;

use crate::thread::{Thread, ThreadId};

/// Insertion-ordered membership shared by all three queue kinds.
struct Members(Vec<Thread>);

impl Members {
    const fn new() -> Self {
        Self(Vec::new())
    }

    fn position(&self, id: ThreadId) -> Option<usize> {
        self.0.iter().position(|t| t.id() == id)
    }

    /// Dedup-then-append: if `thread` is already a member, drop the old
    /// occurrence first so the fresh one lands at the tail (spec.md §4.3).
    fn push(&mut self, thread: Thread) {
        if let Some(idx) = self.position(thread.id()) {
            self.0.remove(idx);
        }
        self.0.push(thread);
    }

    fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        let idx = self.position(id);
        debug_assert!(
            idx.is_some(),
            "{}",
            crate::errors::SchedulerFault::RemoveAbsent
        );
        idx.map(|idx| self.0.remove(idx))
    }

    fn take_at(&mut self, idx: usize) -> Thread {
        self.0.remove(idx)
    }

    fn contains(&self, id: ThreadId) -> bool {
        self.position(id).is_some()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn for_each(&self, mut f: impl FnMut(&Thread)) {
        self.0.iter().for_each(|t| f(t));
    }

    /// A cloned copy of current membership, used by `elevate_threads` so
    /// promotions during the walk can't invalidate the iteration
    /// (spec.md §4.5, §9 "iterator invalidation during aging").
    fn snapshot(&self) -> Vec<Thread> {
        self.0.clone()
    }
}

/// L1: shortest-job-first with a remaining-time preemption guard.
pub struct SjfQueue {
    members: Members,
}

impl SjfQueue {
    pub const fn new() -> Self {
        Self {
            members: Members::new(),
        }
    }

    pub fn push(&mut self, thread: Thread) {
        self.members.push(thread);
    }

    pub fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        self.members.remove(id)
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.members.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn for_each(&self, f: impl FnMut(&Thread)) {
        self.members.for_each(f)
    }

    pub fn snapshot(&self) -> Vec<Thread> {
        self.members.snapshot()
    }

    /// `running` is `Some((remaining_tick, id))` of the currently running
    /// L1 thread, if any. Picks the smallest `approx_burst_tick`, ties
    /// broken by smaller id; then applies the preemption guard: if the
    /// running thread's remaining time is `<=` the candidate's burst
    /// (ties won by the smaller id), the running thread keeps the CPU and
    /// `None` is returned without removing the candidate.
    pub fn remove_best(&mut self, running: Option<(u64, ThreadId)>) -> Option<Thread> {
        let best_idx = self.best_index()?;
        let candidate = &self.members.0[best_idx];
        if let Some((remaining, running_id)) = running {
            let burst = candidate.approx_burst_tick();
            let running_keeps_cpu = if remaining == burst {
                running_id < candidate.id()
            } else {
                remaining < burst
            };
            if running_keeps_cpu {
                return None;
            }
        }
        Some(self.members.take_at(best_idx))
    }

    fn best_index(&self) -> Option<usize> {
        self.members
            .0
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.approx_burst_tick(), t.id()))
            .map(|(idx, _)| idx)
    }
}

impl Default for SjfQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// L2: static priority, highest wins, ties broken by smaller id.
pub struct PriorityQueue {
    members: Members,
}

impl PriorityQueue {
    pub const fn new() -> Self {
        Self {
            members: Members::new(),
        }
    }

    pub fn push(&mut self, thread: Thread) {
        self.members.push(thread);
    }

    pub fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        self.members.remove(id)
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.members.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn for_each(&self, f: impl FnMut(&Thread)) {
        self.members.for_each(f)
    }

    pub fn snapshot(&self) -> Vec<Thread> {
        self.members.snapshot()
    }

    pub fn remove_best(&mut self) -> Option<Thread> {
        let idx = self
            .members
            .0
            .iter()
            .enumerate()
            .max_by_key(|(_, t)| (t.priority(), core::cmp::Reverse(t.id())))
            .map(|(idx, _)| idx)?;
        Some(self.members.take_at(idx))
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// L3: strict FIFO round-robin.
pub struct RrQueue {
    members: Members,
}

impl RrQueue {
    pub const fn new() -> Self {
        Self {
            members: Members::new(),
        }
    }

    pub fn push(&mut self, thread: Thread) {
        self.members.push(thread);
    }

    pub fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        self.members.remove(id)
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.members.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn for_each(&self, f: impl FnMut(&Thread)) {
        self.members.for_each(f)
    }

    pub fn snapshot(&self) -> Vec<Thread> {
        self.members.snapshot()
    }

    pub fn remove_best(&mut self) -> Option<Thread> {
        if self.members.0.is_empty() {
            return None;
        }
        Some(self.members.take_at(0))
    }
}

impl Default for RrQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Membership operations shared across the three queue kinds, used only
/// by `elevate_threads` to walk and re-file threads generically without
/// caring which concrete queue it's touching.
pub(crate) trait QueueMembership {
    fn push(&mut self, thread: Thread);
    fn remove(&mut self, id: ThreadId) -> Option<Thread>;
    fn snapshot(&self) -> Vec<Thread>;
}

impl QueueMembership for SjfQueue {
    fn push(&mut self, thread: Thread) {
        SjfQueue::push(self, thread);
    }
    fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        SjfQueue::remove(self, id)
    }
    fn snapshot(&self) -> Vec<Thread> {
        SjfQueue::snapshot(self)
    }
}

impl QueueMembership for PriorityQueue {
    fn push(&mut self, thread: Thread) {
        PriorityQueue::push(self, thread);
    }
    fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        PriorityQueue::remove(self, id)
    }
    fn snapshot(&self) -> Vec<Thread> {
        PriorityQueue::snapshot(self)
    }
}

impl QueueMembership for RrQueue {
    fn push(&mut self, thread: Thread) {
        RrQueue::push(self, thread);
    }
    fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        RrQueue::remove(self, id)
    }
    fn snapshot(&self) -> Vec<Thread> {
        RrQueue::snapshot(self)
    }
}
