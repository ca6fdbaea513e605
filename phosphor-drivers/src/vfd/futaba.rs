//! Futaba M402SD06GL vacuum fluorescent display
//!
//! A 5x7 character VFD with its own supply, driven over the parallel port
//! through [`Handshake`]. The display can be switched off or unplugged at
//! any time, so every byte is sent only while the driver believes the
//! device is powered, and everything written is kept in a
//! [`DisplayMirror`] for replay once power returns.
//!
//! # Command set
//!
//! | Byte(s)        | Meaning                                  |
//! |----------------|------------------------------------------|
//! | `0x1F`         | Reset                                    |
//! | `0x14`         | Hide cursor                              |
//! | `0x11`         | DC1, normal display mode                 |
//! | `0x10 pos`     | Cursor to `pos = row * cols + col`       |
//! | `0x04 val`     | Brightness, `val` from the dim level     |

use embedded_hal::delay::DelayNs;
use phosphor_core::action::{Actions, Evaluator};
use phosphor_core::config::DisplayConfig;
use phosphor_core::display::DisplayMirror;
use phosphor_core::power::{ConnectionState, PowerEvent, PowerMonitor, Transition};
use phosphor_core::traits::{PowerSense, TextDisplay};
use phosphor_hal::ParallelPort;

use super::protocol::{Handshake, Signals};
use super::DriverError;

/// Model name
pub const MODEL: &str = "Futaba VFD M402SD06GL";

/// Character cell width in pixels
pub const CHAR_WIDTH: u8 = 5;

/// Character cell height in pixels
pub const CHAR_HEIGHT: u8 = 7;

/// Bytes needed to move the cursor
pub const GOTO_COST: u8 = 2;

/// Highest dim level
pub const MAX_DIM: u8 = 3;

/// Hook names this driver fires
pub const ACTIONS: [&str; 2] = [
    Transition::PowerOn.action(),
    Transition::PowerOff.action(),
];

/// Command bytes
pub mod cmd {
    pub const RESET: u8 = 0x1F;
    pub const HIDE_CURSOR: u8 = 0x14;
    pub const DC1: u8 = 0x11;
    pub const GOTO: u8 = 0x10;
    pub const BRIGHTNESS: u8 = 0x04;
}

/// Farewell shown on shutdown
const GOODBYE: &[u8] = b"Goodbye...";

/// How the last mirror replay ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resync {
    /// Every row reached the device
    Complete,
    /// Power dropped while replaying this row
    Interrupted { row: u8 },
}

/// Brightness byte for a dim level (0..=3)
pub const fn brightness_value(dim: u8) -> u8 {
    if dim < MAX_DIM {
        (dim + 1) * 0x20
    } else {
        0xFF
    }
}

/// Futaba VFD driver
pub struct FutabaVfd<P, D, E> {
    link: Handshake<P, D>,
    power: PowerMonitor,
    mirror: DisplayMirror,
    actions: Actions,
    evaluator: E,
    /// Dim level 0..=3
    dim: u8,
    last_resync: Option<Resync>,
}

impl<P, D, E> FutabaVfd<P, D, E>
where
    P: ParallelPort,
    D: DelayNs,
    E: Evaluator,
{
    /// Resolve the wiring, claim the port and set up the mirror
    ///
    /// The driver starts `Unpowered`; the first power poll that sees the
    /// device powered resets it and fires "poweron".
    pub fn new(port: P, delay: D, config: &DisplayConfig, evaluator: E) -> Result<Self, DriverError> {
        info!("init {} ({}x{})", MODEL, config.size.cols, config.size.rows);

        let signals = Signals::resolve(&config.wiring)?;
        let mirror = DisplayMirror::new(config.size)?;
        let actions = Actions::from_config(&ACTIONS, &config.actions);

        let mut link = Handshake::new(port, delay, signals);
        if link.open().is_err() {
            error!("could not initialize parallel port");
            return Err(DriverError::HardwareUnavailable);
        }

        Ok(Self {
            link,
            power: PowerMonitor::new(),
            mirror,
            actions,
            evaluator,
            dim: config.brightness.min(MAX_DIM),
            last_resync: None,
        })
    }

    /// Current power state
    pub fn state(&self) -> ConnectionState {
        self.power.state()
    }

    pub fn is_powered(&self) -> bool {
        self.power.state().is_powered()
    }

    /// Dim level in use (0..=3)
    pub fn brightness(&self) -> u8 {
        self.dim
    }

    /// Change brightness
    ///
    /// `level` is clamped to 0..=3. Returns the level applied.
    pub fn set_brightness(&mut self, level: u8) -> u8 {
        self.dim = level.min(MAX_DIM);
        self.send(cmd::BRIGHTNESS);
        self.send(brightness_value(self.dim));
        self.dim
    }

    /// Intended display content
    pub fn mirror(&self) -> &DisplayMirror {
        &self.mirror
    }

    /// Evaluator the hooks run through
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// How the most recent replay ended
    pub fn last_resync(&self) -> Option<Resync> {
        self.last_resync
    }

    /// Handshake waits that ran out their bound
    pub fn exhausted_waits(&self) -> u32 {
        self.link.exhausted()
    }

    pub fn port(&self) -> &P {
        self.link.port()
    }

    pub fn port_mut(&mut self) -> &mut P {
        self.link.port_mut()
    }

    /// Drop the hooks, blank the device, say goodbye and release the port
    ///
    /// Hands the released port back.
    pub fn shutdown(mut self) -> Result<P, DriverError> {
        info!("{}: shutting down", MODEL);

        self.actions.clear();
        // The reset blanks the device, so there is nothing to replay
        self.mirror.clear();
        self.init_device();
        self.write(0, 0, GOODBYE);

        debug!("closing connection");
        if self.link.close().is_err() {
            error!("could not release parallel port");
            return Err(DriverError::HardwareUnavailable);
        }
        Ok(self.link.into_port())
    }

    /// Send one byte if the device is powered
    ///
    /// Returns the power state afterwards.
    fn send(&mut self, byte: u8) -> ConnectionState {
        if self.power.state().is_powered() {
            let outcome = self.link.transmit(byte);
            self.observe(outcome.into());
        }
        self.power.state()
    }

    fn goto(&mut self, row: u8, col: u8) -> ConnectionState {
        self.send(cmd::GOTO);
        // Grid is at most 256 cells, so the offset fits a byte
        self.send(self.mirror.offset(row, col) as u8)
    }

    /// Feed an event into the power state machine and act on a transition
    fn observe(&mut self, event: PowerEvent) {
        let Some(transition) = self.power.apply(event) else {
            return;
        };

        info!("{}: {}", MODEL, transition.action());
        self.actions.trigger(transition.action(), &mut self.evaluator);

        if transition == Transition::PowerOn {
            let resync = self.reset();
            if let Resync::Interrupted { row } = resync {
                warn!("power lost replaying row {}", row);
            }
            self.last_resync = Some(resync);
        }
    }

    /// Reinitialise the device and replay the mirror
    ///
    /// Stops at the first byte that loses power.
    fn reset(&mut self) -> Resync {
        self.init_device();

        for row in 0..self.mirror.rows() {
            if !self.goto(row, 0).is_powered() {
                return Resync::Interrupted { row };
            }
            for col in 0..self.mirror.cols() {
                let cell = self.mirror.cell(row, col).unwrap_or(b' ');
                if !self.send(cell).is_powered() {
                    return Resync::Interrupted { row };
                }
            }
        }
        Resync::Complete
    }

    /// Reset command sequence: blank, hide cursor, normal mode, brightness
    fn init_device(&mut self) {
        self.send(cmd::RESET);
        self.send(cmd::HIDE_CURSOR);
        self.send(cmd::DC1);
        self.send(cmd::BRIGHTNESS);
        self.send(brightness_value(self.dim));
    }
}

impl<P, D, E> TextDisplay for FutabaVfd<P, D, E>
where
    P: ParallelPort,
    D: DelayNs,
    E: Evaluator,
{
    fn write(&mut self, row: u8, col: u8, text: &[u8]) {
        let len = self.mirror.write(row, col, text);
        if len == 0 {
            return;
        }

        if !self.goto(row, col).is_powered() {
            return;
        }
        for &byte in &text[..len] {
            if !self.send(byte).is_powered() {
                break;
            }
        }
    }

    fn defchar(&mut self, index: u8, _glyph: &[u8]) {
        trace!("ignoring defchar {}", index);
    }

    fn dimensions(&self) -> (u8, u8) {
        (self.mirror.cols(), self.mirror.rows())
    }
}

impl<P, D, E> PowerSense for FutabaVfd<P, D, E>
where
    P: ParallelPort,
    D: DelayNs,
    E: Evaluator,
{
    fn poll_power(&mut self) -> ConnectionState {
        let present = self.link.power_present();
        self.observe(PowerEvent::Polled { present });
        self.power.state()
    }

    fn connection(&self) -> ConnectionState {
        self.power.state()
    }
}
