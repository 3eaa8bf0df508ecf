//! The multilevel feedback scheduler core.

pub mod aging;
pub mod level;
pub mod queues;
pub mod scheduler;

pub use aging::{AGING_FACTOR, AGING_PERIOD};
pub use level::{level, Level};
pub use queues::{PriorityQueue, RrQueue, SjfQueue};
pub use scheduler::{Scheduler, SchedulerStats};
