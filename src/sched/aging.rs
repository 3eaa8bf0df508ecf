//! Starvation prevention: periodic priority boost for long-waiting threads.

use crate::thread::Thread;

pub const AGING_PERIOD: u64 = 1500;
pub const AGING_FACTOR: u8 = 10;
pub const MAX_PRIORITY: u8 = 149;

/// The outcome of aging a single thread, when its priority actually moved.
pub struct AgingResult {
    pub old_priority: u8,
    pub new_priority: u8,
}

/// Apply the aging rule to one thread (spec.md §4.5).
///
/// If `now_tick - thread.priority_updated_tick() >= AGING_PERIOD`, bumps
/// priority by `AGING_FACTOR`, capped at `MAX_PRIORITY`, and stamps
/// `priority_updated_tick`. Returns `None` if the thread wasn't due, or
/// was due but already at the cap (no priority change to report).
///
/// Does not touch queue membership; the caller decides whether the level
/// changed and re-files the thread accordingly.
pub fn age(thread: &Thread, now_tick: u64) -> Option<AgingResult> {
    if now_tick.saturating_sub(thread.priority_updated_tick()) < AGING_PERIOD {
        return None;
    }
    thread.set_priority_updated_tick(now_tick);

    let old_priority = thread.priority();
    let new_priority = core::cmp::min(old_priority.saturating_add(AGING_FACTOR), MAX_PRIORITY);
    if new_priority == old_priority {
        return None;
    }
    thread.set_priority(new_priority);
    Some(AgingResult {
        old_priority,
        new_priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::ThreadId;

    #[test]
    fn triggers_at_exactly_the_period() {
        let t = Thread::spawn(ThreadId::new(1), "t", 45, 0);
        assert!(age(&t, 1499).is_none());
        assert_eq!(t.priority(), 45);
        let result = age(&t, 1500).unwrap();
        assert_eq!(result.old_priority, 45);
        assert_eq!(result.new_priority, 55);
        assert_eq!(t.priority_updated_tick(), 1500);
    }

    #[test]
    fn caps_at_max_priority() {
        let t = Thread::spawn(ThreadId::new(1), "t", 145, 0);
        t.set_priority_updated_tick(0);
        let result = age(&t, 1500).unwrap();
        assert_eq!(result.new_priority, 149);

        t.set_priority_updated_tick(0);
        assert!(age(&t, 1500).is_none());
        assert_eq!(t.priority(), 149);
    }
}
