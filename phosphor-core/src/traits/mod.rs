//! Driver-facing traits
//!
//! These traits define the interface between the host loop and a concrete
//! display driver.

pub mod display;

pub use display::{PowerSense, TextDisplay};
