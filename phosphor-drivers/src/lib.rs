//! Display driver implementations
//!
//! This crate provides concrete implementations of the traits defined in
//! phosphor-core for attached displays:
//!
//! - Futaba VFD on the parallel port (handshake, power tracking, replay)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible below
mod fmt;

pub mod vfd;
