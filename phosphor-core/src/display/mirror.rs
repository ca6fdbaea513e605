//! Display mirror
//!
//! Row-major copy of what the display is supposed to show. Every write
//! lands here first, whether or not the device is powered, so that the
//! full content can be replayed after the device comes back.

use heapless::Vec;

use crate::config::{ConfigError, DisplaySize, MAX_CELLS};

/// Blank cell
pub const BLANK: u8 = b' ';

/// Host-held copy of the display content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMirror {
    size: DisplaySize,
    cells: Vec<u8, MAX_CELLS>,
}

impl DisplayMirror {
    /// Create a blank mirror
    pub fn new(size: DisplaySize) -> Result<Self, ConfigError> {
        if size.cols == 0 || size.rows == 0 {
            return Err(ConfigError::BadSize);
        }
        let mut cells = Vec::new();
        cells
            .resize(size.cells(), BLANK)
            .map_err(|_| ConfigError::DisplayTooLarge)?;
        Ok(Self { size, cells })
    }

    /// Grid dimensions
    pub fn size(&self) -> DisplaySize {
        self.size
    }

    pub fn rows(&self) -> u8 {
        self.size.rows
    }

    pub fn cols(&self) -> u8 {
        self.size.cols
    }

    /// Store `text` starting at (`row`, `col`)
    ///
    /// Text running past the end of the row is clipped. Returns the number
    /// of cells written (zero for an out-of-range position).
    pub fn write(&mut self, row: u8, col: u8, text: &[u8]) -> usize {
        if row >= self.size.rows || col >= self.size.cols {
            return 0;
        }

        let len = text.len().min((self.size.cols - col) as usize);
        let start = self.offset(row, col);
        self.cells[start..start + len].copy_from_slice(&text[..len]);
        len
    }

    /// One row of cells
    pub fn row(&self, row: u8) -> Option<&[u8]> {
        if row >= self.size.rows {
            return None;
        }
        let start = self.offset(row, 0);
        Some(&self.cells[start..start + self.size.cols as usize])
    }

    /// One cell
    pub fn cell(&self, row: u8, col: u8) -> Option<u8> {
        if row >= self.size.rows || col >= self.size.cols {
            return None;
        }
        Some(self.cells[self.offset(row, col)])
    }

    /// Blank every cell
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = BLANK);
    }

    /// Linear cursor position of (`row`, `col`)
    pub fn offset(&self, row: u8, col: u8) -> usize {
        row as usize * self.size.cols as usize + col as usize
    }
}
