//! Cursor position and the bounds it lives in.
//!
//! Coordinates are **1-based**, the same as the terminal's CUP sequence, so
//! the renderer can emit them without conversion. Row 1, column 1 is the
//! top-left cell.
//!
//! The cursor never reaches the last row or the last column of the
//! viewport: [`Bounds`] stops one short of each edge, and never goes below
//! 1 even on a 1x1 terminal.

use std::fmt;

use tilde_term::terminal::Size;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// The largest row and column the cursor may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_row: u16,
    pub max_col: u16,
}

impl Bounds {
    /// Bounds for a viewport of `size` cells.
    #[must_use]
    pub fn for_size(size: Size) -> Self {
        Self {
            max_row: size.rows.saturating_sub(1).max(1),
            max_col: size.cols.saturating_sub(1).max(1),
        }
    }
}

impl From<Size> for Bounds {
    fn from(size: Size) -> Self {
        Self::for_size(size)
    }
}

// ---------------------------------------------------------------------------
// CursorPosition
// ---------------------------------------------------------------------------

/// Where the cursor sits in the viewport: (row, col), both 1-based.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorPosition {
    pub row: u16,
    pub col: u16,
}

impl CursorPosition {
    /// The top-left cell.
    pub const ORIGIN: Self = Self { row: 1, col: 1 };

    /// Create a position. Zero coordinates are raised to 1.
    #[inline]
    #[must_use]
    pub fn new(row: u16, col: u16) -> Self {
        Self {
            row: row.max(1),
            col: col.max(1),
        }
    }

    /// One row up. Returns `false` if already on the first row.
    pub const fn move_up(&mut self) -> bool {
        if self.row > 1 {
            self.row -= 1;
            true
        } else {
            false
        }
    }

    /// One row down. Returns `false` if already on the last allowed row.
    pub const fn move_down(&mut self, bounds: Bounds) -> bool {
        if self.row < bounds.max_row {
            self.row += 1;
            true
        } else {
            false
        }
    }

    /// One column left. Returns `false` if already in the first column.
    pub const fn move_left(&mut self) -> bool {
        if self.col > 1 {
            self.col -= 1;
            true
        } else {
            false
        }
    }

    /// One column right. Returns `false` if already in the last allowed
    /// column.
    pub const fn move_right(&mut self, bounds: Bounds) -> bool {
        if self.col < bounds.max_col {
            self.col += 1;
            true
        } else {
            false
        }
    }

    /// Pull the position back inside `bounds` (after a resize).
    pub fn clamp(&mut self, bounds: Bounds) {
        self.row = self.row.clamp(1, bounds.max_row);
        self.col = self.col.clamp(1, bounds.max_col);
    }

    /// Whether the position is inside `bounds`.
    #[must_use]
    pub const fn is_within(self, bounds: Bounds) -> bool {
        self.row >= 1 && self.col >= 1 && self.row <= bounds.max_row && self.col <= bounds.max_col
    }
}

impl Default for CursorPosition {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl fmt::Debug for CursorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cur({}:{})", self.row, self.col)
    }
}

impl fmt::Display for CursorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
