//! Host side of phosphor
//!
//! Everything that needs `std`: loading the display configuration from
//! TOML, a monotonic clock backed by [`std::time::Instant`], and the wait
//! loop that drives the power poll and widget refreshes.

pub mod clock;
pub mod config;
pub mod host;

pub use clock::StdClock;
pub use config::{load, LoadError};
pub use host::{DisplayHost, HostTask, WidgetSet};
