//! Programming-error reporting for the scheduler core.
//!
//! spec.md §7 treats every error class here as a programming error: an
//! assertion that aborts the kernel, never a recoverable `Result`. This
//! type exists only to give those assertions a readable `Display` instead
//! of an ad hoc format string at each call site.

use core::fmt;

/// A violated precondition of the scheduler core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerFault {
    /// A core entry point was called with interrupts enabled.
    InterruptsEnabled,
    /// A priority fell outside `[0, 150)`.
    PriorityOutOfRange(u8),
    /// `run(_, finishing: true)` was called while `to_be_destroyed` was
    /// already occupied.
    DoubleFinish,
    /// A queue's `remove` was asked to remove a thread it does not hold.
    RemoveAbsent,
}

impl fmt::Display for SchedulerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerFault::InterruptsEnabled => {
                write!(f, "scheduler entry point called with interrupts enabled")
            }
            SchedulerFault::PriorityOutOfRange(p) => {
                write!(f, "priority {} outside [0, 150)", p)
            }
            SchedulerFault::DoubleFinish => {
                write!(f, "run(finishing=true) called with to_be_destroyed already occupied")
            }
            SchedulerFault::RemoveAbsent => {
                write!(f, "removing a thread from a queue that does not contain it")
            }
        }
    }
}
