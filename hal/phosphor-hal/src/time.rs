//! Monotonic time and bounded busy-waiting
//!
//! Handshake timing on the parallel port is specified in nanoseconds, far
//! below what a scheduler sleep can honour. Delays are therefore spun
//! inline against a monotonic clock and always end at a fixed deadline.

use embedded_hal::delay::DelayNs;

/// Monotonic clock
pub trait Clock {
    /// Nanoseconds since an arbitrary fixed origin; never decreases
    fn now_ns(&self) -> u64;

    /// Milliseconds since the same origin
    fn now_ms(&self) -> u64 {
        self.now_ns() / 1_000_000
    }
}

/// Busy-wait delay spinning against a [`Clock`] deadline
///
/// Never yields the thread: the wait ends as soon as the deadline has
/// passed, so the worst-case stall is the requested duration plus one
/// clock read.
pub struct SpinDelay<C> {
    clock: C,
}

impl<C: Clock> SpinDelay<C> {
    /// Create a spin delay on top of `clock`
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Access the underlying clock
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> DelayNs for SpinDelay<C> {
    fn delay_ns(&mut self, ns: u32) {
        let deadline = self.clock.now_ns().saturating_add(ns as u64);
        while self.clock.now_ns() < deadline {
            core::hint::spin_loop();
        }
    }
}
