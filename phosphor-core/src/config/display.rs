//! Display configuration types
//!
//! These types describe one attached display: its character grid, its
//! brightness, how its logical signals are wired to parallel port lines,
//! and which action hooks fire on power transitions.

use core::str::FromStr;

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest supported character grid (rows × cols)
pub const MAX_CELLS: usize = 256;

/// Maximum length of a port line name ("PAPEROUT")
pub const MAX_LINE_NAME: usize = 8;

/// Maximum configured action hooks
pub const MAX_ACTIONS: usize = 8;

/// Maximum action name length
pub const MAX_ACTION_NAME: usize = 16;

/// Maximum action expression length
pub const MAX_EXPRESSION: usize = 64;

/// Configuration errors
///
/// All of these are fatal to driver initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No size entry
    MissingSize,
    /// Size is not of the form "ColsxRows" or has a zero dimension
    BadSize,
    /// Grid exceeds [`MAX_CELLS`]
    DisplayTooLarge,
    /// Signal hardwired to a line that does not exist
    UnknownSignal(Signal),
    /// More than [`MAX_ACTIONS`] hooks
    TooManyActions,
    /// Action name or expression too long
    ExpressionTooLong,
}

/// Character grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplaySize {
    pub cols: u8,
    pub rows: u8,
}

impl DisplaySize {
    /// Create a size, checking it fits the mirror
    pub fn new(cols: u8, rows: u8) -> Result<Self, ConfigError> {
        if cols == 0 || rows == 0 {
            return Err(ConfigError::BadSize);
        }
        if cols as usize * rows as usize > MAX_CELLS {
            return Err(ConfigError::DisplayTooLarge);
        }
        Ok(Self { cols, rows })
    }

    /// Number of character cells
    pub const fn cells(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}

impl FromStr for DisplaySize {
    type Err = ConfigError;

    /// Parse "ColsxRows", e.g. "40x2"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::MissingSize);
        }

        let (cols, rows) = s.split_once('x').ok_or(ConfigError::BadSize)?;
        let cols: u16 = cols.parse().map_err(|_| ConfigError::BadSize)?;
        let rows: u16 = rows.parse().map_err(|_| ConfigError::BadSize)?;

        if cols == 0 || rows == 0 {
            return Err(ConfigError::BadSize);
        }
        if cols > u8::MAX as u16 || rows > u8::MAX as u16 {
            return Err(ConfigError::DisplayTooLarge);
        }
        Self::new(cols as u8, rows as u8)
    }
}

/// Logical signals of the display's parallel interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Signal {
    /// Write strobe (control)
    Wr,
    /// Chip select (control)
    Select,
    /// Self-test mode (control, held inactive)
    Test,
    /// Logic supply enable (control)
    Power5v,
    /// Busy indicator, inverted (status)
    Busy,
    /// Power-present indicator (status)
    PowerOn,
}

impl Signal {
    /// All signals, control lines first
    pub const ALL: [Signal; 6] = [
        Signal::Wr,
        Signal::Select,
        Signal::Test,
        Signal::Power5v,
        Signal::Busy,
        Signal::PowerOn,
    ];

    /// Configuration key of this signal
    pub const fn name(self) -> &'static str {
        match self {
            Signal::Wr => "WR",
            Signal::Select => "SEL",
            Signal::Test => "TEST",
            Signal::Power5v => "PWR_5V",
            Signal::Busy => "BUSY",
            Signal::PowerOn => "PWR_ON",
        }
    }

    /// Look up a signal by configuration key
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Port line the signal is wired to unless configured otherwise
    pub const fn default_line(self) -> &'static str {
        match self {
            Signal::Wr => "STROBE",
            Signal::Select => "SLCTIN",
            Signal::Test => "AUTOFD",
            Signal::Power5v => "INIT",
            Signal::Busy => "BUSY",
            Signal::PowerOn => "PAPEROUT",
        }
    }

    /// Whether the signal is read from the status register
    pub const fn is_status(self) -> bool {
        matches!(self, Signal::Busy | Signal::PowerOn)
    }
}

/// Signal-to-line hardwiring
///
/// Line names are validated against the port when the driver resolves
/// them into register masks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WiringConfig {
    lines: [String<MAX_LINE_NAME>; 6],
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            lines: core::array::from_fn(|i| {
                let mut line = String::new();
                let _ = line.push_str(Signal::ALL[i].default_line());
                line
            }),
        }
    }
}

impl WiringConfig {
    /// Line a signal is wired to
    pub fn line(&self, signal: Signal) -> &str {
        self.lines[Self::index(signal)].as_str()
    }

    /// Rewire a signal
    pub fn set(&mut self, signal: Signal, line: &str) -> Result<(), ConfigError> {
        let mut name = String::new();
        name.push_str(line)
            .map_err(|_| ConfigError::UnknownSignal(signal))?;
        self.lines[Self::index(signal)] = name;
        Ok(())
    }

    fn index(signal: Signal) -> usize {
        Signal::ALL
            .iter()
            .position(|s| *s == signal)
            .unwrap_or_default()
    }
}

/// One action hook: an externally evaluated expression fired by name
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActionConfig {
    /// Event name ("poweron", "poweroff")
    pub name: String<MAX_ACTION_NAME>,
    /// Expression handed to the evaluator
    pub expression: String<MAX_EXPRESSION>,
}

impl ActionConfig {
    /// Build a hook from borrowed strings
    pub fn new(name: &str, expression: &str) -> Result<Self, ConfigError> {
        let mut n = String::new();
        n.push_str(name).map_err(|_| ConfigError::ExpressionTooLong)?;
        let mut e = String::new();
        e.push_str(expression)
            .map_err(|_| ConfigError::ExpressionTooLong)?;
        Ok(Self {
            name: n,
            expression: e,
        })
    }
}

/// Complete configuration of one display
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfig {
    /// Character grid
    pub size: DisplaySize,
    /// Requested brightness (0-255, clamped by the driver)
    pub brightness: u8,
    /// Signal hardwiring
    pub wiring: WiringConfig,
    /// Power transition hooks
    pub actions: Vec<ActionConfig, MAX_ACTIONS>,
}

impl DisplayConfig {
    /// Configuration with default wiring, zero brightness and no hooks
    pub fn new(size: DisplaySize) -> Self {
        Self {
            size,
            brightness: 0,
            wiring: WiringConfig::default(),
            actions: Vec::new(),
        }
    }

    /// Append an action hook
    pub fn add_action(&mut self, name: &str, expression: &str) -> Result<(), ConfigError> {
        let action = ActionConfig::new(name, expression)?;
        self.actions
            .push(action)
            .map_err(|_| ConfigError::TooManyActions)
    }
}
