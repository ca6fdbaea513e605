//! Cooperative periodic scheduler
//!
//! Single-threaded timer table plus the grouping layer that coalesces
//! same-cadence widget refreshes into one wakeup.

pub mod group;
pub mod timer;

pub use group::{Cadence, GroupError, GroupTask, Grouped, Slot, TimerGroups, MAX_GROUPS};
pub use timer::{TaskError, Timer, TimerError, TimerId, TimerTask, Timers, MAX_TIMERS};
