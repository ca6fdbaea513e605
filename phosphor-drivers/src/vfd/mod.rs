//! Vacuum fluorescent displays on the parallel port
//!
//! - [`protocol`] - Bounded byte handshake over control/status lines
//! - [`futaba`] - Futaba M402SD06GL driver with power tracking and replay

pub mod futaba;
pub mod protocol;

#[cfg(test)]
pub(crate) mod mock;

pub use futaba::{FutabaVfd, Resync};
pub use protocol::{Handshake, Outcome, Signals};

use phosphor_core::config::ConfigError;

/// Driver initialisation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Size or wiring rejected
    Config(ConfigError),
    /// Port could not be claimed or released
    HardwareUnavailable,
}

impl From<ConfigError> for DriverError {
    fn from(e: ConfigError) -> Self {
        DriverError::Config(e)
    }
}
