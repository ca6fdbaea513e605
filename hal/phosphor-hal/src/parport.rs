//! Parallel port abstractions
//!
//! A PC-style parallel port exposes three registers: eight data lines, a
//! control register the host drives, and a status register the attached
//! device drives. Registers are accessed whole; individual lines are
//! addressed through bit masks.

/// Data line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host drives the data lines
    Output,
    /// Device drives the data lines
    Input,
}

/// Parallel port register access
///
/// Implementations own the underlying device handle. Register accesses are
/// infallible once the port is claimed; only claiming and releasing can fail.
pub trait ParallelPort {
    /// Error type for claim/release
    type Error;

    /// Gain exclusive access to the port
    fn claim(&mut self) -> Result<(), Self::Error>;

    /// Give up exclusive access
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Present a byte on the data lines
    fn write_data(&mut self, byte: u8);

    /// Update control lines
    ///
    /// Bits set in `mask` take the corresponding bit of `value`; all other
    /// control lines keep their level.
    fn write_control(&mut self, mask: u8, value: u8);

    /// Read the status register
    ///
    /// Bits are logical levels: the hardware-inverted BUSY line is already
    /// corrected, so a set BUSY bit means the device is busy.
    fn read_status(&mut self) -> u8;

    /// Set data line direction
    fn set_direction(&mut self, direction: Direction);
}

/// Host-driven control lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlLine {
    Strobe,
    AutoFeed,
    Init,
    SelectIn,
    /// Not wired; writes are dropped
    Ground,
}

impl ControlLine {
    /// Look up a line by its connector name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "STROBE" => Some(Self::Strobe),
            "AUTOFD" => Some(Self::AutoFeed),
            "INIT" => Some(Self::Init),
            "SLCTIN" => Some(Self::SelectIn),
            "GND" => Some(Self::Ground),
            _ => None,
        }
    }

    /// Bit in the control register
    pub const fn mask(self) -> u8 {
        match self {
            Self::Strobe => 0x01,
            Self::AutoFeed => 0x02,
            Self::Init => 0x04,
            Self::SelectIn => 0x08,
            Self::Ground => 0x00,
        }
    }
}

/// Device-driven status lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusLine {
    Error,
    Select,
    PaperOut,
    Ack,
    Busy,
    /// Not wired; always reads low
    Ground,
}

impl StatusLine {
    /// Look up a line by its connector name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ERROR" => Some(Self::Error),
            "SELECT" => Some(Self::Select),
            "PAPEROUT" => Some(Self::PaperOut),
            "ACK" => Some(Self::Ack),
            "BUSY" => Some(Self::Busy),
            "GND" => Some(Self::Ground),
            _ => None,
        }
    }

    /// Bit in the status register
    pub const fn mask(self) -> u8 {
        match self {
            Self::Error => 0x08,
            Self::Select => 0x10,
            Self::PaperOut => 0x20,
            Self::Ack => 0x40,
            Self::Busy => 0x80,
            Self::Ground => 0x00,
        }
    }
}
