//! Parallel-port byte handshake
//!
//! One byte crosses the port as follows:
//!
//! 1. Present the byte on the data lines, pull WR and SEL low, settle.
//! 2. Raise WR and wait for the device to drop BUSY.
//! 3. Pad out the first wait's budget, raise SEL, pull WR low.
//! 4. Wait for BUSY to come back as the acknowledgement.
//! 5. Trailing settle.
//!
//! Both waits are bounded iteration counts with a 1 ns delay per iteration,
//! and both abort the moment the power-present line drops. A wait that runs
//! out without seeing its BUSY edge falls through as if it had succeeded.

use embedded_hal::delay::DelayNs;
use phosphor_core::config::{ConfigError, Signal, WiringConfig};
use phosphor_core::power::PowerEvent;
use phosphor_hal::{ControlLine, Direction, ParallelPort, StatusLine};

/// Settle time after asserting WR and SEL
pub const STROBE_SETTLE_NS: u32 = 60;

/// Iteration bound for BUSY to clear
pub const BUSY_WAIT_LIMIT: u32 = 60;

/// Iteration bound for the BUSY acknowledgement
pub const ACK_WAIT_LIMIT: u32 = 32_000;

/// Settle time after the acknowledgement
pub const TRAILING_SETTLE_NS: u32 = 210;

/// Result of one byte handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Handshake completed (or ran out its bounds with power present)
    Acknowledged,
    /// Power-present line dropped mid-handshake; the byte is lost
    PowerLost,
}

impl From<Outcome> for PowerEvent {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Acknowledged => PowerEvent::Acknowledged,
            Outcome::PowerLost => PowerEvent::PowerLost,
        }
    }
}

/// Register masks of the wired signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Signals {
    pub wr: u8,
    pub select: u8,
    pub test: u8,
    pub power_5v: u8,
    pub busy: u8,
    pub power_on: u8,
}

impl Default for Signals {
    fn default() -> Self {
        Self {
            wr: ControlLine::Strobe.mask(),
            select: ControlLine::SelectIn.mask(),
            test: ControlLine::AutoFeed.mask(),
            power_5v: ControlLine::Init.mask(),
            busy: StatusLine::Busy.mask(),
            power_on: StatusLine::PaperOut.mask(),
        }
    }
}

impl Signals {
    /// Resolve configured line names into register masks
    ///
    /// Output signals must name a control line and input signals a status
    /// line. A signal wired to GND resolves to an empty mask.
    pub fn resolve(wiring: &WiringConfig) -> Result<Self, ConfigError> {
        let mask = |signal: Signal| -> Result<u8, ConfigError> {
            let line = wiring.line(signal);
            let mask = if signal.is_status() {
                StatusLine::from_name(line).map(StatusLine::mask)
            } else {
                ControlLine::from_name(line).map(ControlLine::mask)
            };
            mask.ok_or(ConfigError::UnknownSignal(signal))
        };

        Ok(Self {
            wr: mask(Signal::Wr)?,
            select: mask(Signal::Select)?,
            test: mask(Signal::Test)?,
            power_5v: mask(Signal::Power5v)?,
            busy: mask(Signal::Busy)?,
            power_on: mask(Signal::PowerOn)?,
        })
    }
}

/// How a bounded wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// Condition met after this many iterations
    Done(u32),
    /// Bound ran out
    Exhausted,
    PowerLost,
}

/// Byte handshake over a claimed parallel port
pub struct Handshake<P, D> {
    port: P,
    delay: D,
    signals: Signals,
    /// Waits that ran out without their BUSY edge
    exhausted: u32,
}

impl<P: ParallelPort, D: DelayNs> Handshake<P, D> {
    /// Wrap a port; nothing is touched until [`Handshake::open`]
    pub fn new(port: P, delay: D, signals: Signals) -> Self {
        Self {
            port,
            delay,
            signals,
            exhausted: 0,
        }
    }

    /// Claim the port and drive the idle line levels
    ///
    /// SEL, TEST and PWR_5V go high, WR goes low, data lines become outputs.
    pub fn open(&mut self) -> Result<(), P::Error> {
        self.port.claim()?;
        let s = self.signals;
        self.port.write_control(s.select | s.test | s.power_5v, 0xFF);
        self.port.write_control(s.wr, 0);
        self.port.set_direction(Direction::Output);
        Ok(())
    }

    /// Release the port
    pub fn close(&mut self) -> Result<(), P::Error> {
        self.port.release()
    }

    /// Read the power-present line
    pub fn power_present(&mut self) -> bool {
        self.port.read_status() & self.signals.power_on != 0
    }

    /// Send one byte
    ///
    /// Never blocks beyond the two wait bounds plus the fixed settle
    /// delays.
    pub fn transmit(&mut self, byte: u8) -> Outcome {
        let s = self.signals;

        self.port.write_data(byte);
        self.port.write_control(s.wr | s.select, 0);
        self.delay.delay_ns(STROBE_SETTLE_NS);
        self.port.write_control(s.wr, 0xFF);

        let spent = match self.wait(BUSY_WAIT_LIMIT, |status| status & s.busy == 0) {
            Wait::Done(spent) => spent,
            Wait::Exhausted => BUSY_WAIT_LIMIT,
            Wait::PowerLost => return Outcome::PowerLost,
        };

        self.delay.delay_ns(STROBE_SETTLE_NS.saturating_sub(spent));
        self.port.write_control(s.select, 0xFF);
        self.port.write_control(s.wr, 0);

        if self.wait(ACK_WAIT_LIMIT, |status| status & s.busy != 0) == Wait::PowerLost {
            return Outcome::PowerLost;
        }

        self.delay.delay_ns(TRAILING_SETTLE_NS);
        Outcome::Acknowledged
    }

    /// Number of waits that ran out their bound
    pub fn exhausted(&self) -> u32 {
        self.exhausted
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Give back the port
    pub fn into_port(self) -> P {
        self.port
    }

    /// Spin until `done` holds for the status register
    fn wait(&mut self, limit: u32, done: impl Fn(u8) -> bool) -> Wait {
        for spent in 0..limit {
            let status = self.port.read_status();
            if status & self.signals.power_on == 0 {
                return Wait::PowerLost;
            }
            if done(status) {
                return Wait::Done(spent);
            }
            self.delay.delay_ns(1);
        }

        self.exhausted = self.exhausted.wrapping_add(1);
        trace!("handshake wait exhausted after {} iterations", limit);
        Wait::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfd::mock::{MockPort, TallyDelay};

    fn handshake() -> Handshake<MockPort, TallyDelay> {
        let mut link = Handshake::new(MockPort::new(), TallyDelay::default(), Signals::default());
        link.open().unwrap();
        link
    }

    #[test]
    fn test_default_wiring_resolves_to_default_masks() {
        let signals = Signals::resolve(&WiringConfig::default()).unwrap();
        assert_eq!(signals, Signals::default());
        assert_eq!(signals.wr, 0x01);
        assert_eq!(signals.power_on, 0x20);
    }

    #[test]
    fn test_wrong_register_rejected() {
        let mut wiring = WiringConfig::default();
        // BUSY is a status input, STROBE a control output
        wiring.set(Signal::Busy, "STROBE").unwrap();
        assert_eq!(
            Signals::resolve(&wiring),
            Err(ConfigError::UnknownSignal(Signal::Busy))
        );

        let mut wiring = WiringConfig::default();
        wiring.set(Signal::Wr, "LPT1").unwrap();
        assert_eq!(
            Signals::resolve(&wiring),
            Err(ConfigError::UnknownSignal(Signal::Wr))
        );
    }

    #[test]
    fn test_gnd_is_empty_mask() {
        let mut wiring = WiringConfig::default();
        wiring.set(Signal::Test, "GND").unwrap();
        assert_eq!(Signals::resolve(&wiring).unwrap().test, 0);
    }

    #[test]
    fn test_open_drives_idle_levels() {
        let link = handshake();
        let port = link.port();
        assert!(port.claimed);
        assert_eq!(port.direction, Some(Direction::Output));
        // SEL, TEST, PWR_5V high; WR low
        assert_eq!(port.control, 0x08 | 0x02 | 0x04);
    }

    #[test]
    fn test_byte_latched_on_powered_device() {
        let mut link = handshake();
        link.port_mut().powered = true;

        assert_eq!(link.transmit(b'A'), Outcome::Acknowledged);
        assert_eq!(link.transmit(b'B'), Outcome::Acknowledged);
        assert_eq!(link.port().sent.as_slice(), b"AB");
        assert_eq!(link.exhausted(), 0);
    }

    #[test]
    fn test_settle_budget() {
        let mut link = handshake();
        link.port_mut().powered = true;
        link.transmit(0x1F);

        // BUSY answers at once: full padding, no spin delays
        assert_eq!(
            link.delay.total_ns,
            (STROBE_SETTLE_NS * 2 + TRAILING_SETTLE_NS) as u64
        );
    }

    #[test]
    fn test_unpowered_device_aborts_immediately() {
        let mut link = handshake();
        assert_eq!(link.transmit(b'x'), Outcome::PowerLost);
        assert!(link.port().sent.is_empty());
        assert_eq!(link.port().status_reads, 1);
    }

    #[test]
    fn test_power_loss_in_ack_wait() {
        let mut link = handshake();
        link.port_mut().powered = true;
        // First wait sees power, second does not
        link.port_mut().reads_until_power_loss = Some(1);

        assert_eq!(link.transmit(b'x'), Outcome::PowerLost);
        assert!(!link.power_present());
    }

    #[test]
    fn test_stuck_busy_falls_through() {
        let mut link = handshake();
        link.port_mut().powered = true;
        link.port_mut().stuck_busy = true;

        // BUSY never clears: first wait runs out, second succeeds at once
        assert_eq!(link.transmit(b'x'), Outcome::Acknowledged);
        assert_eq!(link.exhausted(), 1);
        assert_eq!(link.port().status_reads, BUSY_WAIT_LIMIT + 1);
    }

    #[test]
    fn test_missing_ack_falls_through() {
        let mut link = handshake();
        link.port_mut().powered = true;
        link.port_mut().never_ack = true;

        // BUSY clears at once, then never returns: second wait runs out
        assert_eq!(link.transmit(b'x'), Outcome::Acknowledged);
        assert_eq!(link.exhausted(), 1);
        assert_eq!(link.port().status_reads, 1 + ACK_WAIT_LIMIT);
        assert_eq!(link.port().sent.as_slice(), b"x");
        assert_eq!(
            link.delay.total_ns,
            (STROBE_SETTLE_NS * 2 + ACK_WAIT_LIMIT + TRAILING_SETTLE_NS) as u64
        );
    }

    #[test]
    fn test_close_releases_port() {
        let mut link = handshake();
        link.close().unwrap();
        assert!(!link.port().claimed);
    }
}
