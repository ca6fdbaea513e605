//! Attached-device power state
//!
//! The display has its own supply and can lose power at any moment. The
//! state here is driven only by handshake outcomes and the periodic poll,
//! never set directly by application code.

pub mod events;
pub mod machine;

pub use events::{PowerEvent, Transition};
pub use machine::{ConnectionState, PowerMonitor};
