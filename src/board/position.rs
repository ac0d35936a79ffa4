//! Grid coordinates and the board metric.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A square on the grid. Row 0 is player two's back row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Manhattan distance.
    ///
    /// ```
    /// use realm_sim::board::Position;
    ///
    /// assert_eq!(Position::new(0, 0).distance(Position::new(3, 2)), 5);
    /// ```
    #[must_use]
    pub fn distance(self, other: Position) -> u32 {
        u32::from(self.row.abs_diff(other.row)) + u32::from(self.col.abs_diff(other.col))
    }

    /// Orthogonal adjacency.
    #[must_use]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.distance(other) == 1
    }

    /// Orthogonal neighbors inside a `rows` x `cols` grid, in N, W, E, S order.
    #[must_use]
    pub fn neighbors(self, rows: u8, cols: u8) -> SmallVec<[Position; 4]> {
        let mut out = SmallVec::new();
        if self.row > 0 {
            out.push(Position::new(self.row - 1, self.col));
        }
        if self.col > 0 {
            out.push(Position::new(self.row, self.col - 1));
        }
        if self.col + 1 < cols {
            out.push(Position::new(self.row, self.col + 1));
        }
        if self.row + 1 < rows {
            out.push(Position::new(self.row + 1, self.col));
        }
        out
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
