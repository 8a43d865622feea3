//! Row/column positions and ranges.
//!
//! Columns are counted in `char`s (Unicode scalar values), consistent with token columns.

use std::fmt;

/// A zero-based `(row, column)` position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Row index.
    pub row: usize,
    /// Column index in chars.
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// A half-open `[start, end)` range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    /// Inclusive start.
    pub start: Position,
    /// Exclusive end.
    pub end: Position,
}

impl Range {
    /// Create a range from explicit coordinates.
    pub const fn new(
        start_row: usize,
        start_column: usize,
        end_row: usize,
        end_column: usize,
    ) -> Self {
        Self {
            start: Position::new(start_row, start_column),
            end: Position::new(end_row, end_column),
        }
    }

    /// Create a range from two positions (in any order).
    pub fn from_positions(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Returns `true` if start and end are on the same row.
    pub fn is_single_row(&self) -> bool {
        self.start.row == self.end.row
    }

    /// Returns `true` if `pos` lies within `[start, end)`.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }
}
