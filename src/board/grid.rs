//! The board grid.
//!
//! The grid stores IDs only. Units, sites and artifacts live in the
//! `GameState` maps; `GameState::check_invariants` verifies the two views
//! agree.

use smallvec::SmallVec;

use super::position::Position;
use super::region::Terrain;
use crate::core::{SiteId, UnitId};

/// One board square.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Square {
    pub(crate) site: Option<SiteId>,
    pub(crate) terrain: Terrain,
    pub(crate) occupants: SmallVec<[UnitId; 4]>,
}

impl Square {
    /// Site on this square, if any.
    #[must_use]
    pub fn site(&self) -> Option<SiteId> {
        self.site
    }

    /// Current terrain.
    #[must_use]
    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    /// Units on this square across all regions.
    #[must_use]
    pub fn occupants(&self) -> &[UnitId] {
        &self.occupants
    }
}

/// Row-major grid of squares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: u8,
    cols: u8,
    squares: Vec<Square>,
}

impl Grid {
    /// Create an empty grid of void squares.
    #[must_use]
    pub fn new(rows: u8, cols: u8) -> Self {
        Self {
            rows,
            cols,
            squares: vec![Square::default(); usize::from(rows) * usize::from(cols)],
        }
    }

    #[must_use]
    pub fn rows(&self) -> u8 {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> u8 {
        self.cols
    }

    /// Check if a position lies on the grid.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos)
            .then(|| usize::from(pos.row) * usize::from(self.cols) + usize::from(pos.col))
    }

    /// Get a square.
    #[must_use]
    pub fn square(&self, pos: Position) -> Option<&Square> {
        self.index(pos).map(|i| &self.squares[i])
    }

    pub(crate) fn square_mut(&mut self, pos: Position) -> Option<&mut Square> {
        self.index(pos).map(move |i| &mut self.squares[i])
    }

    /// Terrain at a position; off-grid reads as void.
    #[must_use]
    pub fn terrain(&self, pos: Position) -> Terrain {
        self.square(pos).map_or(Terrain::Void, Square::terrain)
    }

    /// Units at a position; off-grid reads as empty.
    #[must_use]
    pub fn occupants(&self, pos: Position) -> &[UnitId] {
        match self.square(pos) {
            Some(square) => square.occupants(),
            None => &[],
        }
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Position::new(row, col)))
    }

    /// Neighbors of a position on this grid.
    #[must_use]
    pub fn neighbors(&self, pos: Position) -> SmallVec<[Position; 4]> {
        pos.neighbors(self.rows, self.cols)
    }

    pub(crate) fn add_occupant(&mut self, pos: Position, unit: UnitId) -> bool {
        match self.square_mut(pos) {
            Some(square) => {
                square.occupants.push(unit);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_occupant(&mut self, pos: Position, unit: UnitId) -> bool {
        let Some(square) = self.square_mut(pos) else {
            return false;
        };
        match square.occupants.iter().position(|&u| u == unit) {
            Some(i) => {
                square.occupants.remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_site(&mut self, pos: Position, site: Option<SiteId>, terrain: Terrain) {
        if let Some(square) = self.square_mut(pos) {
            square.site = site;
            square.terrain = terrain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_void() {
        let grid = Grid::new(4, 5);
        assert_eq!(grid.positions().count(), 20);
        assert!(grid.positions().all(|p| grid.terrain(p) == Terrain::Void));
    }

    #[test]
    fn test_bounds() {
        let grid = Grid::new(4, 5);
        assert!(grid.contains(Position::new(3, 4)));
        assert!(!grid.contains(Position::new(4, 0)));
        assert!(grid.square(Position::new(0, 5)).is_none());
        assert!(grid.occupants(Position::new(9, 9)).is_empty());
    }

    #[test]
    fn test_occupants() {
        let mut grid = Grid::new(4, 5);
        let pos = Position::new(1, 1);
        assert!(grid.add_occupant(pos, UnitId::new(1)));
        assert!(grid.add_occupant(pos, UnitId::new(2)));
        assert!(grid.remove_occupant(pos, UnitId::new(1)));
        assert!(!grid.remove_occupant(pos, UnitId::new(1)));
        assert_eq!(grid.occupants(pos), &[UnitId::new(2)]);
    }

    #[test]
    fn test_set_site() {
        let mut grid = Grid::new(4, 5);
        let pos = Position::new(2, 2);
        grid.set_site(pos, Some(SiteId::new(7)), Terrain::Water);
        assert_eq!(grid.square(pos).unwrap().site(), Some(SiteId::new(7)));
        assert_eq!(grid.terrain(pos), Terrain::Water);
    }
}
