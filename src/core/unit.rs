//! Units on the board and the modifiers attached to them.
//!
//! A `Unit` pairs an immutable `Card` with its mutable board state. Power
//! and life are always read through `power()`/`life()`, which fold the
//! modifier list over the card's base stats.

use smallvec::SmallVec;

use super::ids::{ArtifactId, UnitId};
use super::player::PlayerId;
use crate::board::{Position, Region};
use crate::cards::{CardId, CardRef};
use crate::effects::Duration;

/// What a modifier changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Adds to power.
    Power,
    /// Adds to life.
    Life,
    /// Reduces each instance of incoming damage.
    Prevent,
}

/// Where a modifier came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierSource {
    /// A resolved spell.
    Spell(CardId),
    /// An attached artifact.
    Artifact(ArtifactId),
}

/// A stat change on a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub value: i32,
    pub source: ModifierSource,
    pub duration: Duration,
    /// Player whose state a conditional duration is checked against.
    pub controller: PlayerId,
}

/// A unit on the board.
#[derive(Clone, Debug)]
pub struct Unit {
    pub id: UnitId,
    pub card: CardRef,
    pub owner: PlayerId,
    pub(crate) position: Position,
    pub(crate) region: Region,
    /// Accumulated damage this turn cycle.
    pub damage: u32,
    pub is_tapped: bool,
    /// Cannot attack until its controller's next turn.
    pub summoning_sickness: bool,
    /// Already moved this turn.
    pub has_moved: bool,
    pub modifiers: SmallVec<[Modifier; 2]>,
    pub artifacts: SmallVec<[ArtifactId; 1]>,
    pub is_avatar: bool,
    /// Summoned by an effect; never goes to the cemetery.
    pub is_token: bool,
}

impl Unit {
    /// Create a fresh, summoning-sick unit.
    #[must_use]
    pub fn new(id: UnitId, card: CardRef, owner: PlayerId, position: Position, region: Region) -> Self {
        Self {
            id,
            card,
            owner,
            position,
            region,
            damage: 0,
            is_tapped: false,
            summoning_sickness: true,
            has_moved: false,
            modifiers: SmallVec::new(),
            artifacts: SmallVec::new(),
            is_avatar: false,
            is_token: false,
        }
    }

    /// Current square.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Current region.
    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    fn modifier_total(&self, kind: ModifierKind) -> i32 {
        self.modifiers
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.value)
            .sum()
    }

    /// Effective power.
    #[must_use]
    pub fn power(&self) -> u32 {
        clamp_stat(self.card.power, self.modifier_total(ModifierKind::Power))
    }

    /// Effective life.
    #[must_use]
    pub fn life(&self) -> u32 {
        clamp_stat(self.card.life, self.modifier_total(ModifierKind::Life))
    }

    /// Damage prevented from each incoming instance.
    #[must_use]
    pub fn prevention(&self) -> u32 {
        self.modifier_total(ModifierKind::Prevent).max(0) as u32
    }

    /// Life left before lethal damage.
    #[must_use]
    pub fn remaining_life(&self) -> u32 {
        self.life().saturating_sub(self.damage)
    }

    /// Whether accumulated damage is lethal.
    ///
    /// Avatars never hold damage; theirs is redirected to player life.
    #[must_use]
    pub fn has_lethal_damage(&self) -> bool {
        !self.is_avatar && self.damage >= self.life()
    }

    /// Untapped, not sick, able to attack.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        !self.is_tapped && !self.summoning_sickness && self.power() > 0
    }

    /// Movement budget for this turn.
    #[must_use]
    pub fn movement_budget(&self) -> u32 {
        self.card.movement_budget()
    }
}

fn clamp_stat(base: u32, delta: i32) -> u32 {
    (i64::from(base) + i64::from(delta)).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;
    use std::sync::Arc;

    fn unit(power: u32, life: u32) -> Unit {
        let card = Arc::new(Card::minion(CardId::new(1), "Test", 1, power, life));
        Unit::new(UnitId::new(1), card, PlayerId::ONE, Position::new(0, 0), Region::Surface)
    }

    fn modifier(kind: ModifierKind, value: i32) -> Modifier {
        Modifier {
            kind,
            value,
            source: ModifierSource::Spell(CardId::new(9)),
            duration: Duration::Turn,
            controller: PlayerId::ONE,
        }
    }

    #[test]
    fn test_modifiers_fold_into_stats() {
        let mut u = unit(2, 3);
        u.modifiers.push(modifier(ModifierKind::Power, 2));
        u.modifiers.push(modifier(ModifierKind::Life, -1));
        assert_eq!(u.power(), 4);
        assert_eq!(u.life(), 2);
    }

    #[test]
    fn test_negative_modifiers_clamp_at_zero() {
        let mut u = unit(1, 1);
        u.modifiers.push(modifier(ModifierKind::Power, -5));
        assert_eq!(u.power(), 0);
        assert!(!u.can_attack());
    }

    #[test]
    fn test_lethal_damage() {
        let mut u = unit(1, 3);
        u.damage = 2;
        assert!(!u.has_lethal_damage());
        assert_eq!(u.remaining_life(), 1);
        u.damage = 3;
        assert!(u.has_lethal_damage());
    }

    #[test]
    fn test_avatar_never_lethal() {
        let mut u = unit(1, 1);
        u.is_avatar = true;
        u.damage = 10;
        assert!(!u.has_lethal_damage());
    }

    #[test]
    fn test_new_unit_is_summoning_sick() {
        let u = unit(2, 2);
        assert!(u.summoning_sickness);
        assert!(!u.can_attack());
    }
}
