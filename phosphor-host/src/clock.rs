//! Monotonic clock for the host

use std::time::Instant;

use phosphor_hal::Clock;

/// [`Clock`] measuring from the moment it was created
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ns(&self) -> u64 {
        // Wraps after ~584 years
        self.origin.elapsed().as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::delay::DelayNs;
    use phosphor_hal::SpinDelay;

    #[test]
    fn test_monotonic() {
        let clock = StdClock::new();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }

    #[test]
    fn test_spin_delay_waits_at_least_requested() {
        let mut delay = SpinDelay::new(StdClock::new());
        let start = delay.clock().now_ns();
        delay.delay_ns(50_000);
        assert!(delay.clock().now_ns() - start >= 50_000);
    }
}
