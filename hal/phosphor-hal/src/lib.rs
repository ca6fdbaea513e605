//! Phosphor Hardware Abstraction Layer
//!
//! This crate defines the hardware boundary that display drivers are
//! written against. Platform code (a Linux `ppdev` wrapper, a direct I/O
//! port backend, a test double) implements these traits; drivers never
//! touch registers any other way.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Host loop (phosphor-host)              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  Drivers (phosphor-drivers)             │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  phosphor-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`parport::ParallelPort`] - Data/control/status register access
//! - [`time::Clock`] - Monotonic nanosecond clock
//! - [`time::SpinDelay`] - Bounded busy-wait implementing `DelayNs`

#![no_std]
#![deny(unsafe_code)]

pub mod parport;
pub mod time;

// Re-export key traits at crate root for convenience
pub use parport::{ControlLine, Direction, ParallelPort, StatusLine};
pub use time::{Clock, SpinDelay};
