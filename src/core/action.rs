//! Main-phase actions a player can take.
//!
//! Actions are plain values: the AI proposes them, `RealmRules` validates
//! and applies them. Hand cards are referenced by index into the relevant
//! hand bucket at the time the action is taken.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::ids::UnitId;
use crate::board::{Position, Region};
use crate::effects::Target;

/// A main-phase action.
///
/// ## Example
///
/// ```
/// use realm_sim::core::{Action, UnitId};
/// use realm_sim::board::Position;
///
/// let step = Action::Move { unit: UnitId::new(4), path: vec![Position::new(2, 2)] };
/// assert!(!step.is_pass());
/// assert!(Action::Pass.is_pass());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Play a site from the site hand.
    PlaySite { hand_index: usize, position: Position },
    /// Summon a minion from the spell hand.
    SummonUnit { hand_index: usize, position: Position, region: Region },
    /// Cast a magic spell from the spell hand.
    CastSpell { hand_index: usize, targets: SmallVec<[Target; 2]> },
    /// Attach an artifact from the spell hand to a friendly unit.
    PlayArtifact { hand_index: usize, bearer: UnitId },
    /// Move a unit along a path of adjacent squares.
    Move { unit: UnitId, path: Vec<Position> },
    /// End the main phase.
    Pass,
}

impl Action {
    /// Check if this is the pass action.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Action::Pass)
    }

    /// Short verb for logging.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Action::PlaySite { .. } => "play_site",
            Action::SummonUnit { .. } => "summon",
            Action::CastSpell { .. } => "cast",
            Action::PlayArtifact { .. } => "artifact",
            Action::Move { .. } => "move",
            Action::Pass => "pass",
        }
    }
}
