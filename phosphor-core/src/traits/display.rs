//! Display driver traits

use crate::power::ConnectionState;

/// Character display as seen by the renderer
///
/// The renderer composes widgets into exactly these two mutations. Neither
/// can fail: a write to an unpowered display still lands in the driver's
/// mirror and reaches the glass on the next restoration.
pub trait TextDisplay {
    /// Show `text` starting at (`row`, `col`), clipped at the row end
    fn write(&mut self, row: u8, col: u8, text: &[u8]);

    /// Load a user-defined glyph
    ///
    /// Displays without programmable glyphs ignore this.
    fn defchar(&mut self, index: u8, glyph: &[u8]);

    /// Grid dimensions as (cols, rows)
    fn dimensions(&self) -> (u8, u8);
}

/// Display with its own supply that must be watched
pub trait PowerSense {
    /// Cadence of the power poll
    const POLL_INTERVAL_MS: u32 = 100;

    /// Re-read the power-present indicator and act on any change
    ///
    /// Returns the state after the poll.
    fn poll_power(&mut self) -> ConnectionState;

    /// Current state, without touching the hardware
    fn connection(&self) -> ConnectionState;
}
