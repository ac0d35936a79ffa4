//! Positional board model.
//!
//! - `Position` / `Grid`: coordinates and squares (IDs only)
//! - `RegionManager`: terrain, regions and region conflicts
//! - `PositionSystem`: placement legality and placement
//! - `MovementEngine`: movement range, paths and atomic moves
//!
//! Other subsystems read these freely but change positions only through
//! the methods here.

pub mod grid;
pub mod movement;
pub mod placement;
pub mod position;
pub mod region;

pub use grid::{Grid, Square};
pub use movement::{MovementEngine, MovementError};
pub use placement::{Placement, PlacementError, PositionSystem};
pub use position::Position;
pub use region::{ConflictResolution, Region, RegionManager, Terrain};
