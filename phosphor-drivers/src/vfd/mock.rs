//! Test doubles for the VFD driver

use embedded_hal::delay::DelayNs;
use heapless::{String, Vec};
use phosphor_core::action::Evaluator;
use phosphor_hal::{Direction, ParallelPort};

const WR: u8 = 0x01;
const BUSY: u8 = 0x80;
const PAPEROUT: u8 = 0x20;

/// Claim failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBusy;

/// Register-level model of a VFD on the default wiring
///
/// The device latches the data byte on the rising edge of WR while it has
/// power, and answers with BUSY whenever WR is low.
pub struct MockPort {
    pub control: u8,
    pub data: u8,
    pub direction: Option<Direction>,
    pub claimed: bool,
    pub fail_claim: bool,
    pub powered: bool,
    /// Status reads that still see power before it drops
    pub reads_until_power_loss: Option<u32>,
    /// BUSY held high regardless of WR
    pub stuck_busy: bool,
    /// BUSY held low regardless of WR, so the acknowledgement never comes
    pub never_ack: bool,
    pub status_reads: u32,
    /// Bytes latched by the device
    pub sent: Vec<u8, 2048>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            control: 0,
            data: 0,
            direction: None,
            claimed: false,
            fail_claim: false,
            powered: false,
            reads_until_power_loss: None,
            stuck_busy: false,
            never_ack: false,
            status_reads: 0,
            sent: Vec::new(),
        }
    }
}

impl ParallelPort for MockPort {
    type Error = PortBusy;

    fn claim(&mut self) -> Result<(), PortBusy> {
        if self.fail_claim {
            return Err(PortBusy);
        }
        self.claimed = true;
        Ok(())
    }

    fn release(&mut self) -> Result<(), PortBusy> {
        self.claimed = false;
        Ok(())
    }

    fn write_data(&mut self, byte: u8) {
        self.data = byte;
    }

    fn write_control(&mut self, mask: u8, value: u8) {
        let before = self.control;
        self.control = (self.control & !mask) | (value & mask);
        let rising = before & WR == 0 && self.control & WR != 0;
        if rising && self.powered {
            self.sent.push(self.data).unwrap();
        }
    }

    fn read_status(&mut self) -> u8 {
        self.status_reads += 1;
        match self.reads_until_power_loss {
            Some(0) => {
                self.powered = false;
                self.reads_until_power_loss = None;
            }
            Some(n) => self.reads_until_power_loss = Some(n - 1),
            None => {}
        }

        let mut status = 0;
        if self.powered {
            status |= PAPEROUT;
        }
        if self.never_ack {
            return status;
        }
        if self.stuck_busy || self.control & WR == 0 {
            status |= BUSY;
        }
        status
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }
}

/// Delay that only adds up what it was asked for
#[derive(Debug, Default)]
pub struct TallyDelay {
    pub total_ns: u64,
}

impl DelayNs for TallyDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

/// Evaluator that records every expression
#[derive(Debug, Default)]
pub struct Recorder {
    pub seen: Vec<String<64>, 32>,
}

impl Recorder {
    pub fn names(&self) -> Vec<&str, 32> {
        self.seen.iter().map(|s| s.as_str()).collect()
    }
}

impl Evaluator for Recorder {
    fn evaluate(&mut self, expression: &str) {
        let mut s = String::new();
        s.push_str(expression).unwrap();
        self.seen.push(s).unwrap();
    }
}
