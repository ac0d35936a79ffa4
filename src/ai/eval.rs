//! Heuristic position evaluation.

use crate::core::{GameState, PlayerId, Unit};
use crate::rules::GameResult;

use super::strategy::Strategy;

/// Score of a decided game, large enough to dominate any heuristic.
pub const TERMINAL_SCORE: f64 = 1.0e6;

/// Power plus remaining life of a unit.
#[must_use]
pub fn unit_value(unit: &Unit) -> f64 {
    f64::from(unit.power()) + f64::from(unit.remaining_life())
}

fn board_value(state: &GameState, player: PlayerId) -> f64 {
    state
        .units_of(player)
        .filter(|u| !u.is_avatar)
        .map(unit_value)
        .sum()
}

fn proximity(state: &GameState, player: PlayerId) -> f64 {
    let Some(target) = state.avatar(player.opponent()).map(|a| a.position()) else {
        return 0.0;
    };
    let span = f64::from(state.grid().rows()) + f64::from(state.grid().cols());
    state
        .units_of(player)
        .filter(|u| !u.is_avatar && u.power() > 0)
        .map(|u| span - f64::from(u.position().distance(target)))
        .sum::<f64>()
        / span
}

/// Evaluate a position from `player`'s point of view. Higher is better.
///
/// ## Terms
///
/// - life: own life weighted by `1 - aggression`, damage already dealt to
///   the opponent by `1 + aggression`
/// - board: power and remaining life of non-avatar units, own minus enemy
/// - hand and sites: raw counts
/// - proximity: how close armed units stand to the enemy avatar
#[must_use]
pub fn evaluate(state: &GameState, player: PlayerId, strategy: &Strategy) -> f64 {
    if let Some(result) = state.winner() {
        return match result {
            GameResult::Winner(p) if *p == player => TERMINAL_SCORE,
            GameResult::Winner(_) => -TERMINAL_SCORE,
            GameResult::Draw => 0.0,
        };
    }
    let me = state.player(player);
    let them = state.player(player.opponent());
    let aggression = strategy.aggression;

    let life = f64::from(me.life) * (1.0 - aggression)
        + f64::from(them.max_life.saturating_sub(them.life)) * (1.0 + aggression);
    let board = board_value(state, player) - board_value(state, player.opponent());
    let hand = me.hand.len() as f64;
    let sites = me.controlled_sites.len() as f64;

    strategy.life_weight * life
        + strategy.board_weight * board
        + strategy.hand_weight * hand
        + strategy.site_weight * sites
        + strategy.proximity_weight * aggression * proximity(state, player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Placement, PositionSystem};
    use crate::cards::{Card, CardId, Element, PlayerDeck};
    use crate::combat::DamageSystem;
    use crate::core::{DamageTarget, Ruleset};
    use std::sync::Arc;

    fn state() -> GameState {
        let deck = PlayerDeck::new(
            Card::avatar(CardId::new(0), "Avatar", 1, 20),
            vec![Card::minion(CardId::new(1), "Grunt", 0, 1, 1); 6],
            vec![Card::site(CardId::new(2), "Field").with_element(Element::Earth); 6],
        );
        GameState::new(Ruleset::default(), &deck, &deck, 5)
    }

    #[test]
    fn test_symmetric_start_scores_equal() {
        let state = state();
        let strategy = Strategy::midrange();
        let a = evaluate(&state, PlayerId::ONE, &strategy);
        let b = evaluate(&state, PlayerId::TWO, &strategy);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_damage_to_opponent_improves_score() {
        let mut state = state();
        let strategy = Strategy::aggressive();
        let before = evaluate(&state, PlayerId::ONE, &strategy);
        DamageSystem::apply_damage(&mut state, None, DamageTarget::Player(PlayerId::TWO), 3);
        assert!(evaluate(&state, PlayerId::ONE, &strategy) > before);
    }

    #[test]
    fn test_board_and_sites_count() {
        let mut state = state();
        let strategy = Strategy::midrange();
        let before = evaluate(&state, PlayerId::ONE, &strategy);

        let home = state.ruleset().avatar_start(PlayerId::ONE);
        let site = Arc::new(Card::site(CardId::new(2), "Field").with_element(Element::Earth));
        PositionSystem::place_card(&mut state, PlayerId::ONE, site, home, None).unwrap();
        let with_site = evaluate(&state, PlayerId::ONE, &strategy);
        assert!(with_site > before);

        let grunt = Arc::new(Card::minion(CardId::new(1), "Grunt", 0, 2, 2));
        let placed = PositionSystem::place_card(&mut state, PlayerId::ONE, grunt, home, None).unwrap();
        assert!(matches!(placed, Placement::Unit(_)));
        assert!(evaluate(&state, PlayerId::ONE, &strategy) > with_site);
    }

    #[test]
    fn test_terminal_scores() {
        let mut state = state();
        DamageSystem::apply_damage(&mut state, None, DamageTarget::Player(PlayerId::TWO), 20);
        DamageSystem::check_game_over(&mut state);
        let strategy = Strategy::defensive();
        assert_eq!(evaluate(&state, PlayerId::ONE, &strategy), TERMINAL_SCORE);
        assert_eq!(evaluate(&state, PlayerId::TWO, &strategy), -TERMINAL_SCORE);
    }
}
