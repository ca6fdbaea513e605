//! Board-agnostic core logic for phosphor display drivers
//!
//! This crate contains all logic that does not depend on a specific
//! display or port implementation:
//!
//! - Cooperative timer scheduler and same-cadence timer groups
//! - Power state machine for displays with their own supply
//! - Action hooks fired on power transitions
//! - Display mirror used to resynchronize after reconnection
//! - Driver-facing traits
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible below
mod fmt;

pub mod action;
pub mod config;
pub mod display;
pub mod power;
pub mod scheduler;
pub mod traits;
