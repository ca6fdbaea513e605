//! Power state machine definition

use super::events::{PowerEvent, Transition};

/// Connectivity of the attached display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No device power; physical writes are skipped
    #[default]
    Unpowered,
    /// Device powered and accepting bytes
    Powered,
}

impl ConnectionState {
    /// Check if physical writes should be attempted
    pub fn is_powered(&self) -> bool {
        matches!(self, ConnectionState::Powered)
    }

    /// Process an event and return the next state
    ///
    /// Power is only ever regained through the poll; a completed handshake
    /// cannot happen while unpowered because none is attempted.
    pub fn transition(self, event: PowerEvent) -> Self {
        use ConnectionState::*;
        use PowerEvent::*;

        match (self, event) {
            (Powered, PowerLost) => Unpowered,
            (Powered, Polled { present: false }) => Unpowered,
            (Unpowered, Polled { present: true }) => Powered,

            // Default: stay in current state
            _ => self,
        }
    }
}

/// Tracks the current state and reports genuine transitions
#[derive(Debug, Clone, Default)]
pub struct PowerMonitor {
    state: ConnectionState,
    transitions: u32,
}

impl PowerMonitor {
    /// Create a monitor in the initial `Unpowered` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of transitions so far
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Feed an event
    ///
    /// Returns the transition if the state changed, `None` if the event
    /// left it where it was.
    pub fn apply(&mut self, event: PowerEvent) -> Option<Transition> {
        let next = self.state.transition(event);
        if next == self.state {
            return None;
        }

        self.state = next;
        self.transitions = self.transitions.wrapping_add(1);
        Some(match next {
            ConnectionState::Powered => Transition::PowerOn,
            ConnectionState::Unpowered => Transition::PowerOff,
        })
    }
}
