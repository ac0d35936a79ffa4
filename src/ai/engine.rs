//! Strategy-driven action selection.
//!
//! `AIEngine` plays one seat. Main-phase actions are scored by one-ply
//! lookahead: each legal action is applied to a clone of the state and
//! the result evaluated with the seat's `Strategy`. Combat decisions use
//! per-unit trade heuristics instead.

use tracing::trace;

use super::eval::{evaluate, unit_value};
use super::strategy::Strategy;
use crate::combat::{AttackTarget, CombatPhase, CombatSystem};
use crate::core::{Action, GameRng, GameState, PlayerId, Unit, UnitId};
use crate::rules::{RealmRules, RulesEngine};

/// AI for one player seat.
#[derive(Clone, Debug)]
pub struct AIEngine {
    player: PlayerId,
    strategy: Strategy,
    rng: GameRng,
}

impl AIEngine {
    /// Create an AI for a seat. `rng` only feeds exploration noise.
    #[must_use]
    pub fn new(player: PlayerId, strategy: Strategy, rng: GameRng) -> Self {
        Self { player, strategy, rng }
    }

    /// The seat this AI plays.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// The strategy in use.
    #[must_use]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Sites to control before preferring spellbook draws.
    #[must_use]
    pub fn site_target(&self) -> u32 {
        self.strategy.site_target
    }

    fn noise(&mut self) -> f64 {
        if self.strategy.exploration > 0.0 {
            self.rng.gen_unit() * self.strategy.exploration
        } else {
            0.0
        }
    }

    /// Pick the next main-phase action.
    ///
    /// Returns `Action::Pass` unless some action beats the current position
    /// by more than the strategy's pass threshold. Ties keep the earliest
    /// candidate in legal-action order.
    pub fn select_action(&mut self, state: &GameState) -> Action {
        let rules = RealmRules;
        let candidates = rules.legal_actions(state, self.player);
        let mut best_score = evaluate(state, self.player, &self.strategy) + self.strategy.pass_threshold;
        let mut best = Action::Pass;

        for action in candidates.into_iter().filter(|a| !a.is_pass()) {
            let mut preview = state.clone();
            preview.set_recording(false);
            if rules.apply_action(&mut preview, self.player, &action).is_err() {
                continue;
            }
            let score = evaluate(&preview, self.player, &self.strategy) + self.noise();
            trace!(player = %self.player, action = action.verb(), score, "candidate scored");
            if score > best_score {
                best_score = score;
                best = action;
            }
        }
        best
    }

    fn trade_score(&self, attacker: &Unit, defender: &Unit) -> f64 {
        let kills = attacker.power() >= defender.remaining_life();
        let dies = defender.power() >= attacker.remaining_life();
        let gain = if kills { unit_value(defender) } else { f64::from(attacker.power()) * 0.25 };
        let loss = if dies { unit_value(attacker) } else { 0.0 };
        gain - loss * (1.0 - self.strategy.aggression)
    }

    fn guards_home(&self, state: &GameState, unit: &Unit) -> bool {
        self.strategy.guards_avatar()
            && state
                .avatar(self.player)
                .is_some_and(|a| a.position().distance(unit.position()) <= 1)
    }

    /// Choose attacks for the active player, in unit ID order.
    ///
    /// Each attacker takes its best-scoring target; the defending player is
    /// scored by the attacker's power weighted by aggression.
    pub fn select_attackers(&mut self, state: &GameState) -> Vec<(UnitId, AttackTarget)> {
        let mut attacks = Vec::new();
        for unit in state.units_of(self.player).filter(|u| u.can_attack()) {
            if self.guards_home(state, unit) {
                continue;
            }
            let mut best: Option<(f64, AttackTarget)> = None;
            for target in CombatSystem::attack_targets(state, unit.id) {
                let score = match target {
                    AttackTarget::Player(_) => f64::from(unit.power()) * (0.5 + self.strategy.aggression),
                    AttackTarget::Unit(id) => match state.unit(id) {
                        Some(defender) => self.trade_score(unit, defender),
                        None => continue,
                    },
                } + self.noise();
                if score > 0.0 && best.as_ref().map_or(true, |(s, _)| score > *s) {
                    best = Some((score, target));
                }
            }
            if let Some((_, target)) = best {
                attacks.push((unit.id, target));
            }
        }
        attacks
    }

    /// Choose blocks for the defending player against declared attacks.
    ///
    /// Each blocker is used at most once. A block is taken when the blocker
    /// survives, when it trades favourably, or when the attack would
    /// otherwise be lethal to the defending player.
    pub fn select_blockers(&mut self, state: &GameState, combat: &CombatPhase) -> Vec<(UnitId, UnitId)> {
        let mut blocks: Vec<(UnitId, UnitId)> = Vec::new();
        let life = state.player(self.player).life;
        let incoming: u32 = combat
            .attacks()
            .iter()
            .filter(|a| a.target == AttackTarget::Player(self.player))
            .filter_map(|a| state.unit(a.attacker))
            .map(Unit::power)
            .sum();
        let lethal = incoming >= life;

        for attack in combat.attacks() {
            let Some(attacker) = state.unit(attack.attacker) else {
                continue;
            };
            let mut chosen: Option<(f64, UnitId)> = None;
            for blocker in state.units_of(self.player).filter(|u| !u.is_avatar) {
                if blocks.iter().any(|(b, _)| *b == blocker.id)
                    || !combat.can_declare_blocker(state, blocker.id, attacker.id)
                {
                    continue;
                }
                let survives = attacker.power() < blocker.remaining_life();
                let kills = blocker.power() >= attacker.remaining_life();
                let score = match (survives, kills) {
                    (true, true) => unit_value(attacker) + 1.0,
                    (true, false) => 1.0 - self.strategy.aggression,
                    (false, true) => unit_value(attacker) - unit_value(blocker),
                    (false, false) if lethal => 0.5,
                    (false, false) => -1.0,
                };
                if score > 0.0 && chosen.map_or(true, |(s, _)| score > s) {
                    chosen = Some((score, blocker.id));
                }
            }
            if let Some((_, blocker)) = chosen {
                blocks.push((blocker, attacker.id));
            }
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Placement, Position, PositionSystem};
    use crate::cards::{Card, CardId, Element, PlayerDeck};
    use crate::core::Ruleset;
    use std::sync::Arc;

    fn state(ruleset: Ruleset) -> GameState {
        let deck = PlayerDeck::new(
            Card::avatar(CardId::new(0), "Avatar", 1, 20),
            vec![Card::minion(CardId::new(1), "Grunt", 0, 2, 2); 6],
            vec![Card::site(CardId::new(2), "Field").with_element(Element::Earth); 6],
        );
        GameState::new(ruleset, &deck, &deck, 31)
    }

    fn ai(player: PlayerId, strategy: Strategy) -> AIEngine {
        AIEngine::new(player, strategy, GameRng::new(1))
    }

    fn summon(state: &mut GameState, player: PlayerId, at: Position, power: u32, life: u32) -> UnitId {
        if state.site_at(at).is_none() {
            let site = Arc::new(Card::site(CardId::new(2), "Field").with_element(Element::Earth));
            PositionSystem::place_card(state, player, site, at, None).unwrap();
        }
        let card = Arc::new(Card::minion(CardId::new(7), "Soldier", 0, power, life));
        match PositionSystem::place_card(state, player, card, at, None).unwrap() {
            Placement::Unit(id) => {
                state.unit_mut(id).unwrap().summoning_sickness = false;
                id
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_first_action_is_site() {
        let state = state(Ruleset::default());
        let action = ai(PlayerId::ONE, Strategy::midrange()).select_action(&state);
        assert!(matches!(action, Action::PlaySite { .. }), "got {action:?}");
    }

    #[test]
    fn test_selection_is_deterministic() {
        let state = state(Ruleset::default());
        let a = ai(PlayerId::ONE, Strategy::aggressive()).select_action(&state);
        let b = ai(PlayerId::ONE, Strategy::aggressive()).select_action(&state);
        assert_eq!(a, b);
    }

    #[test]
    fn test_passes_on_opponents_turn() {
        let state = state(Ruleset::default());
        assert_eq!(ai(PlayerId::TWO, Strategy::midrange()).select_action(&state), Action::Pass);
    }

    #[test]
    fn test_attacks_adjacent_avatar() {
        let mut state = state(Ruleset::default().with_grid(2, 1));
        let home = state.ruleset().avatar_start(PlayerId::ONE);
        let enemy_home = state.ruleset().avatar_start(PlayerId::TWO);
        let site = Arc::new(Card::site(CardId::new(2), "Field"));
        PositionSystem::place_card(&mut state, PlayerId::TWO, site, enemy_home, None).unwrap();
        let attacker = summon(&mut state, PlayerId::ONE, home, 3, 3);

        let attacks = ai(PlayerId::ONE, Strategy::aggressive()).select_attackers(&state);
        assert_eq!(attacks, vec![(attacker, AttackTarget::Player(PlayerId::TWO))]);
    }

    #[test]
    fn test_blocks_when_it_survives() {
        let mut state = state(Ruleset::default().with_grid(2, 1));
        let home = state.ruleset().avatar_start(PlayerId::ONE);
        let enemy_home = state.ruleset().avatar_start(PlayerId::TWO);
        let attacker = summon(&mut state, PlayerId::ONE, home, 1, 1);
        let wall = summon(&mut state, PlayerId::TWO, enemy_home, 0, 5);

        let mut combat = CombatPhase::new();
        combat
            .declare_attacker(&mut state, attacker, AttackTarget::Player(PlayerId::TWO))
            .unwrap();
        combat.finish_attacks().unwrap();

        let blocks = ai(PlayerId::TWO, Strategy::defensive()).select_blockers(&state, &combat);
        assert_eq!(blocks, vec![(wall, attacker)]);
    }
}
