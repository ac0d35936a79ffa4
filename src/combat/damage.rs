//! Damage, healing and destruction.
//!
//! Every source of damage (combat, spells) goes through
//! `DamageSystem::apply_damage`, which runs the prevention and redirection
//! hooks before mutating anything:
//!
//! 1. `prevent_damage`: the target unit's `Prevent` modifiers reduce the
//!    instance.
//! 2. `redirect_damage`: damage to an avatar is dealt to its owner's life.
//!
//! Lethal damage on ordinary units is swept by `check_destroyed_creatures`,
//! which destroys each dead unit exactly once no matter how many times it
//! runs. `check_game_over` turns dead avatars and empty life totals into a
//! match result; simultaneous losses are a draw.

use tracing::debug;

use crate::core::{DamageTarget, EndReason, EventKind, GameState, PlayerId, UnitId};
use crate::rules::GameResult;

/// Damage, healing and destruction rules.
pub struct DamageSystem;

impl DamageSystem {
    /// Split an instance of damage into `(dealt, prevented)`.
    #[must_use]
    pub fn prevent_damage(state: &GameState, target: DamageTarget, amount: u32) -> (u32, u32) {
        let shield = match target {
            DamageTarget::Unit(id) => state.unit(id).map_or(0, |u| u.prevention()),
            DamageTarget::Player(_) => 0,
        };
        let prevented = shield.min(amount);
        (amount - prevented, prevented)
    }

    /// Where damage aimed at `target` actually lands.
    #[must_use]
    pub fn redirect_damage(state: &GameState, target: DamageTarget) -> DamageTarget {
        match target {
            DamageTarget::Unit(id) => match state.unit(id) {
                Some(unit) if unit.is_avatar => DamageTarget::Player(unit.owner),
                _ => target,
            },
            DamageTarget::Player(_) => target,
        }
    }

    /// Deal damage. Returns the amount actually dealt.
    ///
    /// `source` is the dealing unit, if any; it attributes the damage in
    /// the match statistics. Spell damage is attributed to the opponent of
    /// whoever took it.
    pub fn apply_damage(
        state: &mut GameState,
        source: Option<UnitId>,
        target: DamageTarget,
        amount: u32,
    ) -> u32 {
        let victim = match target {
            DamageTarget::Unit(id) => match state.unit(id) {
                Some(unit) => unit.owner,
                None => return 0,
            },
            DamageTarget::Player(p) => p,
        };

        let (amount, prevented) = Self::prevent_damage(state, target, amount);
        if prevented > 0 {
            state.emit(
                EventKind::DamagePrevented { target, amount: prevented },
                format!("{prevented} damage to {target} is prevented"),
            );
        }
        if amount == 0 {
            return 0;
        }

        let landed = Self::redirect_damage(state, target);
        let dealt = match landed {
            DamageTarget::Unit(id) => match state.unit_mut(id) {
                Some(unit) => {
                    unit.damage += amount;
                    amount
                }
                None => 0,
            },
            DamageTarget::Player(p) => state.lose_life(p, amount),
        };
        if dealt == 0 {
            return 0;
        }

        let attacker = source
            .and_then(|id| state.unit(id))
            .map_or(victim.opponent(), |u| u.owner);
        state.stats.damage_dealt[attacker] += dealt;
        state.emit(
            EventKind::DamageDealt {
                source,
                target: landed,
                amount: dealt,
            },
            format!("{landed} takes {dealt} damage"),
        );

        // An avatar whose owner's life is gone is destroyed with it.
        if let (DamageTarget::Unit(avatar), DamageTarget::Player(owner)) = (target, landed) {
            if !state.player(owner).is_alive() {
                Self::destroy_unit(state, avatar);
            }
        }
        dealt
    }

    /// Heal a unit's damage or restore player life. Returns the amount
    /// healed.
    pub fn heal(state: &mut GameState, target: DamageTarget, amount: u32) -> u32 {
        let landed = Self::redirect_damage(state, target);
        let healed = match landed {
            DamageTarget::Unit(id) => match state.unit_mut(id) {
                Some(unit) => {
                    let healed = unit.damage.min(amount);
                    unit.damage -= healed;
                    healed
                }
                None => 0,
            },
            DamageTarget::Player(p) => state.gain_life(p, amount),
        };
        if healed > 0 {
            state.emit(
                EventKind::Healed {
                    target: landed,
                    amount: healed,
                },
                format!("{landed} heals {healed}"),
            );
        }
        healed
    }

    /// Remove a unit from the board.
    ///
    /// Returns false if the unit was already gone.
    pub fn destroy_unit(state: &mut GameState, id: UnitId) -> bool {
        let Some(unit) = state.remove_unit(id) else {
            return false;
        };
        state.stats.units_destroyed[unit.owner] += 1;
        state.emit(
            EventKind::UnitDestroyed {
                unit: id,
                owner: unit.owner,
                card: unit.card.name.clone(),
            },
            format!("{} is destroyed", unit.card.name),
        );
        debug!(unit = %id, owner = %unit.owner, avatar = unit.is_avatar, "unit destroyed");
        true
    }

    /// Destroy every unit holding lethal damage, in ID order.
    ///
    /// Running it again without new damage destroys nothing.
    pub fn check_destroyed_creatures(state: &mut GameState) -> Vec<UnitId> {
        let dead: Vec<UnitId> = state
            .units()
            .filter(|u| u.has_lethal_damage())
            .map(|u| u.id)
            .collect();
        dead.into_iter()
            .filter(|&id| Self::destroy_unit(state, id))
            .collect()
    }

    /// Why a player has lost, if they have.
    #[must_use]
    pub fn loss_reason(state: &GameState, player: PlayerId) -> Option<EndReason> {
        let seat = state.player(player);
        if state.avatar(player).is_none() {
            Some(EndReason::AvatarDestroyed)
        } else if !seat.is_alive() {
            Some(EndReason::LifeDepleted)
        } else if seat.decked_out {
            Some(EndReason::DeckOut)
        } else {
            None
        }
    }

    /// End the match if a player has lost. Returns true when the match is
    /// over.
    pub fn check_game_over(state: &mut GameState) -> bool {
        if state.is_game_over() {
            return true;
        }
        let losers: Vec<(PlayerId, EndReason)> = PlayerId::all()
            .filter_map(|p| Self::loss_reason(state, p).map(|r| (p, r)))
            .collect();
        match losers.as_slice() {
            [] => false,
            [(loser, reason)] => {
                state.end_game(GameResult::Winner(loser.opponent()), *reason);
                true
            }
            [(_, a), (_, b), ..] => {
                state.end_game(GameResult::Draw, (*a).min(*b));
                true
            }
        }
    }
}
