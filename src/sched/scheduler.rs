//! The Scheduler: owns the three ready queues and the dispatch protocol.

use spin::Mutex;

use crate::errors::SchedulerFault;
use crate::platform::{Clock, DebugTag, InterruptGate, Logger, Platform, Switch};
use crate::sched_log;
use crate::thread::{Thread, ThreadState};

use super::aging::age;
use super::level::{level, Level};
use super::queues::{PriorityQueue, QueueMembership, RrQueue, SjfQueue};

/// Snapshot of queue occupancy, returned by `Scheduler::stats` for
/// introspection (tests, debug consoles) without exposing the queues
/// themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub l1_len: usize,
    pub l2_len: usize,
    pub l3_len: usize,
    pub has_current: bool,
    pub has_to_be_destroyed: bool,
}

/// Owns the three ready queues, the currently-running thread, and the
/// deferred-destroy slot. Generic over the platform collaborators
/// (spec.md §9 "Global kernel handle": threaded in explicitly, no
/// process-wide statics).
pub struct Scheduler<P: Platform> {
    platform: P,
    ready_l1: Mutex<SjfQueue>,
    ready_l2: Mutex<PriorityQueue>,
    ready_l3: Mutex<RrQueue>,
    current: Mutex<Option<Thread>>,
    to_be_destroyed: Mutex<Option<Thread>>,
}

impl<P: Platform> Scheduler<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            ready_l1: Mutex::new(SjfQueue::new()),
            ready_l2: Mutex::new(PriorityQueue::new()),
            ready_l3: Mutex::new(RrQueue::new()),
            current: Mutex::new(None),
            to_be_destroyed: Mutex::new(None),
        }
    }

    fn assert_interrupts_disabled(&self) {
        assert!(
            self.platform.interrupts_disabled(),
            "{}",
            SchedulerFault::InterruptsEnabled
        );
    }

    /// The thread currently marked running, if any.
    pub fn current_thread(&self) -> Option<Thread> {
        self.current.lock().clone()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            l1_len: { let q = self.ready_l1.lock(); let mut n = 0; q.for_each(|_| n += 1); n },
            l2_len: { let q = self.ready_l2.lock(); let mut n = 0; q.for_each(|_| n += 1); n },
            l3_len: { let q = self.ready_l3.lock(); let mut n = 0; q.for_each(|_| n += 1); n },
            has_current: self.current.lock().is_some(),
            has_to_be_destroyed: self.to_be_destroyed.lock().is_some(),
        }
    }

    /// File a thread into its ready queue (spec.md §4.3).
    pub fn ready_to_run(&self, thread: Thread) {
        self.assert_interrupts_disabled();

        thread.set_status(ThreadState::Ready);
        let lvl = level(thread.priority());
        let tick = self.platform.now_tick();
        let id = thread.id();

        match lvl {
            Level::L1 => self.ready_l1.lock().push(thread),
            Level::L2 => self.ready_l2.lock().push(thread),
            Level::L3 => self.ready_l3.lock().push(thread),
        }

        sched_log!(
            self.platform,
            DebugTag::Scheduler,
            "[A] Tick {}: Thread {} is inserted into queue {}",
            tick,
            id,
            lvl.name()
        );
    }

    /// `Some((remaining, id))` of the currently running thread, if it is
    /// filed at L1 — the only case the SJF preemption guard cares about.
    fn running_l1(&self) -> Option<(u64, crate::thread::ThreadId)> {
        let current = self.current.lock().clone()?;
        if current.is_running() && level(current.priority()) == Level::L1 {
            Some((current.approx_remaining_tick(), current.id()))
        } else {
            None
        }
    }

    /// The cross-level preemption rule (spec.md §4.4).
    pub fn find_next_to_run(&self) -> Option<Thread> {
        self.assert_interrupts_disabled();
        let tick = self.platform.now_tick();

        if let Some(thread) = self.ready_l1.lock().remove_best(self.running_l1()) {
            self.log_removed(tick, &thread, Level::L1);
            return Some(thread);
        }

        if let Some(current) = self.current.lock().clone() {
            if current.is_running() && level(current.priority()) >= Level::L2 {
                return None;
            }
        }

        if let Some(thread) = self.ready_l2.lock().remove_best() {
            self.log_removed(tick, &thread, Level::L2);
            return Some(thread);
        }

        if let Some(thread) = self.ready_l3.lock().remove_best() {
            self.log_removed(tick, &thread, Level::L3);
            return Some(thread);
        }

        None
    }

    fn log_removed(&self, tick: u64, thread: &Thread, lvl: Level) {
        sched_log!(
            self.platform,
            DebugTag::Scheduler,
            "[B] Tick {}: Thread {} is removed from queue {}",
            tick,
            thread.id(),
            lvl.name()
        );
    }

    /// Apply the aging rule to every ready thread (spec.md §4.5). Each
    /// queue is snapshotted before its walk so a thread promoted into a
    /// queue during this pass is never re-visited in the same pass.
    pub fn elevate_threads(&self) {
        self.assert_interrupts_disabled();
        let tick = self.platform.now_tick();

        self.age_queue(&self.ready_l1, Level::L1, tick);
        self.age_queue(&self.ready_l2, Level::L2, tick);
        self.age_queue(&self.ready_l3, Level::L3, tick);
    }

    fn age_queue<Q: QueueMembership>(&self, queue: &Mutex<Q>, from: Level, tick: u64) {
        let snapshot = queue.lock().snapshot();
        for thread in snapshot {
            let Some(result) = age(&thread, tick) else {
                continue;
            };
            sched_log!(
                self.platform,
                DebugTag::Scheduler,
                "[C] Tick {}: Thread {} changes its priority from {} to {}",
                tick,
                thread.id(),
                result.old_priority,
                result.new_priority
            );

            let to = level(result.new_priority);
            if to != from {
                self.upgrade_thread_level(queue, &thread, from, to);
            }
        }
    }

    fn upgrade_thread_level<Q: QueueMembership>(
        &self,
        from_queue: &Mutex<Q>,
        thread: &Thread,
        from: Level,
        to: Level,
    ) {
        debug_assert!(
            matches!((from, to), (Level::L3, Level::L2) | (Level::L2, Level::L1)),
            "aging only promotes L3->L2 or L2->L1"
        );
        from_queue.lock().remove(thread.id());
        match to {
            Level::L1 => self.ready_l1.lock().push(thread.clone()),
            Level::L2 => self.ready_l2.lock().push(thread.clone()),
            Level::L3 => unreachable!("aging never demotes to L3"),
        }
    }

    /// The dispatch protocol (spec.md §4.6). `finishing` hands the
    /// outgoing thread to the deferred-destroy slot instead of letting it
    /// run again; its deallocation is postponed until the first
    /// subsequent `check_to_be_destroyed`, which only ever runs on the
    /// incoming thread's stack.
    pub fn run(&self, next_thread: Thread, finishing: bool) {
        self.assert_interrupts_disabled();
        let tick = self.platform.now_tick();

        let old = self.current.lock().clone();

        if finishing {
            let outgoing = old.clone().expect("finishing dispatch with no current thread");
            let mut slot = self.to_be_destroyed.lock();
            assert!(slot.is_none(), "{}", SchedulerFault::DoubleFinish);
            *slot = Some(outgoing);
        }

        if let Some(old) = &old {
            if let Some(space) = old.address_space() {
                old.save_user_state();
                space.save_state();
            }
            old.check_overflow();
        }

        *self.current.lock() = Some(next_thread.clone());
        next_thread.set_status(ThreadState::Running);

        if let Some(old) = &old {
            let ticks = old.read_and_reset_accum_tick();
            sched_log!(
                self.platform,
                DebugTag::Scheduler,
                "[E] Tick {}: Thread {} is now selected for execution, thread {} is replaced, and it has executed {} ticks",
                tick,
                next_thread.id(),
                old.id(),
                ticks
            );
        }

        if let Some(old) = &old {
            self.platform.switch(old, &next_thread);
        }

        self.assert_interrupts_disabled();

        self.check_to_be_destroyed();

        // Control only resumes past `switch` on `old`'s own stack frame, so
        // `old` is "self" again here — restore its state, not next_thread's
        // (scheduler.cc: `currentThread->RestoreUserState()` runs after the
        // SWITCH that suspended this call, and `currentThread` is `old` by
        // the time that resumption happens).
        if let Some(old) = &old {
            if let Some(space) = old.address_space() {
                old.restore_user_state();
                space.restore_state();
            }
        }
    }

    /// Drop whatever thread is parked in the deferred-destroy slot. Only
    /// safe to call from a stack other than the one being destroyed; the
    /// dispatch protocol in `run` guarantees that (spec.md §4.6).
    pub fn check_to_be_destroyed(&self) {
        self.assert_interrupts_disabled();
        let dead = self.to_be_destroyed.lock().take();
        drop(dead);
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use alloc::string::String;
    use alloc::sync::Arc;
    use portable_atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::platform::test_platform::TestPlatform;
    use crate::thread::{AddressSpace, ThreadId};

    fn sched() -> Scheduler<TestPlatform> {
        Scheduler::new(TestPlatform::new())
    }

    #[test]
    fn pure_l3_round_robin() {
        let s = sched();
        s.ready_to_run(Thread::spawn(ThreadId::new(1), "A", 10, 0));
        s.ready_to_run(Thread::spawn(ThreadId::new(2), "B", 20, 0));
        s.ready_to_run(Thread::spawn(ThreadId::new(3), "C", 30, 0));

        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(1));
        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(2));
        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(3));
    }

    #[test]
    fn l2_priority_with_tie_break() {
        let s = sched();
        s.ready_to_run(Thread::spawn(ThreadId::new(5), "X", 80, 0));
        s.ready_to_run(Thread::spawn(ThreadId::new(6), "Y", 80, 0));
        s.ready_to_run(Thread::spawn(ThreadId::new(7), "Z", 90, 0));

        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(7));
        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(5));
        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(6));
    }

    #[test]
    fn l1_sjf_with_preemption_guard() {
        let s = sched();
        let u = Thread::spawn(ThreadId::new(1), "U", 120, 5);
        s.run(u, false); // bootstrap: U becomes the running thread, R=5

        let v = Thread::spawn(ThreadId::new(2), "V", 120, 10);
        s.ready_to_run(v.clone());

        assert!(s.find_next_to_run().is_none(), "U keeps the CPU: 5 < 10");

        v.set_approx_burst_tick(3);
        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(2));
    }

    #[test]
    fn cross_level_preemption_rule() {
        let s = sched();
        let p = Thread::spawn(ThreadId::new(1), "P", 80, 0);
        s.run(p.clone(), false); // P running at L2

        s.ready_to_run(Thread::spawn(ThreadId::new(2), "Q", 10, 0));
        assert!(s.find_next_to_run().is_none(), "L3 cannot preempt running L2");

        p.set_status(ThreadState::Blocked);
        assert_eq!(s.find_next_to_run().unwrap().id(), ThreadId::new(2));
    }

    #[test]
    fn aging_promotion_at_exactly_aging_period() {
        let s = sched();
        let w = Thread::spawn(ThreadId::new(4), "W", 45, 0);
        s.ready_to_run(w.clone());

        s.elevate_threads();
        assert_eq!(w.priority(), 45, "not due yet at tick 0");

        // advance the shared platform clock to exactly AGING_PERIOD
        let tick = s.platform.now_tick() + 1500;
        s.platform.set_tick(tick);
        s.elevate_threads();

        assert_eq!(w.priority(), 55);
        assert!(s.ready_l2.lock().contains(ThreadId::new(4)));
        assert!(!s.ready_l3.lock().contains(ThreadId::new(4)));
        assert!(!s.platform.lines_tagged("[C]").is_empty());
    }

    #[test]
    fn a_log_line_matches_exact_wire_format() {
        let s = sched();
        s.ready_to_run(Thread::spawn(ThreadId::new(1), "A", 10, 0));

        let lines = s.platform.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "[A] Tick 0: Thread 1 is inserted into queue L[3]");
    }

    #[test]
    fn b_log_line_matches_exact_wire_format() {
        let s = sched();
        s.ready_to_run(Thread::spawn(ThreadId::new(2), "B", 10, 0));
        s.find_next_to_run();

        let lines = s.platform.lines_tagged("[B]");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "[B] Tick 0: Thread 2 is removed from queue L[3]");
    }

    #[test]
    fn c_log_line_matches_exact_wire_format() {
        let s = sched();
        s.ready_to_run(Thread::spawn(ThreadId::new(3), "C", 45, 0));
        s.platform.set_tick(1500);
        s.elevate_threads();

        let lines = s.platform.lines_tagged("[C]");
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "[C] Tick 1500: Thread 3 changes its priority from 45 to 55"
        );
    }

    #[test]
    fn e_log_line_matches_exact_wire_format() {
        let s = sched();
        let old = Thread::spawn(ThreadId::new(4), "Old", 10, 0);
        s.run(old.clone(), false); // bootstrap: no prior current, no [E] line yet

        old.accumulate_tick(7);
        s.platform.set_tick(3);
        s.run(Thread::spawn(ThreadId::new(5), "Next", 10, 0), false);

        let lines = s.platform.lines_tagged("[E]");
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "[E] Tick 3: Thread 5 is now selected for execution, thread 4 is replaced, and it has executed 7 ticks"
        );
    }

    struct DropSignal(Arc<AtomicBool>);

    impl AddressSpace for DropSignal {
        fn save_state(&self) {}
        fn restore_state(&self) {}
    }

    impl Drop for DropSignal {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn deferred_destroy_runs_exactly_once() {
        let s = sched();
        let flag = Arc::new(AtomicBool::new(false));

        let old = Thread::new(
            ThreadId::new(1),
            String::from("Old"),
            10,
            0,
            Some(Arc::new(DropSignal(flag.clone()))),
            None,
        );
        s.run(old, false); // bootstrap: Old becomes current, no prior thread to destroy
        assert!(!flag.load(Ordering::SeqCst));

        let new = Thread::spawn(ThreadId::new(2), "New", 10, 0);
        s.run(new, true);

        assert!(flag.load(Ordering::SeqCst), "Old must be dropped by the time run() returns");
        assert!(s.to_be_destroyed.lock().is_none());
    }
}
