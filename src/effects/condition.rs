//! Condition evaluation against a live game state.

use super::effect::{ConditionCheck, ConditionProperty, ConditionTarget};
use crate::core::{GameState, PlayerId};

impl ConditionCheck {
    /// The player whose state this condition reads.
    #[must_use]
    pub fn subject(&self, caster: PlayerId) -> PlayerId {
        match self.target {
            ConditionTarget::Caster => caster,
            ConditionTarget::Opponent => caster.opponent(),
        }
    }

    /// Current value of the checked property.
    #[must_use]
    pub fn observe(&self, state: &GameState, caster: PlayerId) -> u32 {
        let player = self.subject(caster);
        let seat = state.player(player);
        match self.property {
            ConditionProperty::ControlledSites => seat.controlled_sites.len() as u32,
            ConditionProperty::UnitCount => state.units_of(player).filter(|u| !u.is_avatar).count() as u32,
            ConditionProperty::Life => seat.life,
            ConditionProperty::HandSize => seat.hand.len() as u32,
            ConditionProperty::Affinity(element) => seat.affinity.get(element),
        }
    }

    /// Check whether the condition holds for `caster`.
    #[must_use]
    pub fn evaluate(&self, state: &GameState, caster: PlayerId) -> bool {
        self.operator.compare(self.observe(state, caster), self.value)
    }
}
