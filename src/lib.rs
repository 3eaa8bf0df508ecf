#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! A multilevel feedback CPU scheduler core for a uniprocessor teaching
//! operating system.
//!
//! Three ready queues classify threads by priority band: `L1` runs the
//! shortest remaining job first (with a preemption guard that lets a
//! running L1 thread keep the CPU against shorter-but-not-short-enough
//! newcomers), `L2` runs strictly by static priority, and `L3` is plain
//! round-robin. A thread that waits long enough gets its priority raised
//! by the aging rule, which may promote it into a more urgent queue.
//!
//! The core has no opinion on interrupts, context switching, address
//! spaces, or logging — those are the four collaborators in
//! [`platform`], supplied by whoever embeds this crate. A host wires them
//! up once via [`platform::Platform`] and drives the scheduler from its
//! timer interrupt and blocking primitives.
//!
//! # Quick start
//!
//! ```ignore
//! use mlfq_scheduler::sched::Scheduler;
//! use mlfq_scheduler::thread::{Thread, ThreadId};
//!
//! let scheduler = Scheduler::new(my_platform);
//! scheduler.ready_to_run(Thread::spawn(ThreadId::new(1), "worker", 80, 50));
//! if let Some(next) = scheduler.find_next_to_run() {
//!     scheduler.run(next, false);
//! }
//! ```

pub mod errors;
pub mod mem;
pub mod platform;
pub mod sched;
pub mod thread;
pub mod time;

#[cfg(test)]
extern crate std;

extern crate alloc;

pub use errors::SchedulerFault;
pub use platform::{Clock, DebugTag, InterruptGate, Logger, Platform, Switch};
pub use sched::{level, Level, Scheduler, SchedulerStats};
pub use thread::{AddressSpace, Thread, ThreadId, ThreadOps, ThreadState};
pub use time::TickClock;
