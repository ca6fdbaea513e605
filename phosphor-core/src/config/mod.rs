//! Configuration types
//!
//! Board-agnostic configuration structures. Parsing from a concrete file
//! format happens on the host side; these types only carry and validate.

pub mod display;

pub use display::*;
