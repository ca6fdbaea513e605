//! Events that move the power state

/// Observations fed into the power state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerEvent {
    /// A byte handshake completed
    Acknowledged,
    /// Power-present indicator dropped during a handshake
    PowerLost,
    /// Periodic poll read the power-present indicator
    Polled { present: bool },
}

/// A genuine change of power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Unpowered → Powered
    PowerOn,
    /// Powered → Unpowered
    PowerOff,
}

impl Transition {
    /// Name of the action hooks fired for this transition
    pub const fn action(self) -> &'static str {
        match self {
            Transition::PowerOn => "poweron",
            Transition::PowerOff => "poweroff",
        }
    }
}
