//! End-to-end matches and batches.

mod common;

use realm_sim::ai::Strategy;
use realm_sim::cards::{CardRegistry, RawCard};
use realm_sim::core::{ConfigError, EndReason, EventKind, PlayerId};
use realm_sim::sim::{MatchSimulator, MatchWinner, SimulationBatch, SimulationConfig, SimulationError};

fn filler_config(max_turns: u32) -> SimulationConfig {
    SimulationConfig::new(common::filler_deck(10, 10), common::filler_deck(10, 10))
        .with_ruleset(common::small_ruleset(10, 10))
        .with_max_turns(max_turns)
        .with_timeout_ms(0)
}

fn mixed_config() -> SimulationConfig {
    SimulationConfig::new(common::mixed_deck(16, 12), common::mixed_deck(16, 12))
        .with_ruleset(common::small_ruleset(16, 12))
        .with_max_turns(30)
        .with_timeout_ms(0)
}

#[test]
fn test_turn_limit_is_respected() {
    common::init_tracing();
    let result = MatchSimulator::new(filler_config(5)).unwrap().run();

    assert!(!result.is_error());
    assert!(result.turns <= 5);
    if result.winner == MatchWinner::Draw {
        assert_eq!(result.reason, EndReason::MaxTurnsReached);
    }
    assert_eq!(result.seed, 42);
    assert!(result
        .game_log
        .iter()
        .any(|e| matches!(e.kind, EventKind::GameOver { .. })));
}

#[test]
fn test_timeout_ends_match_mid_turn() {
    let result = MatchSimulator::new(mixed_config().with_timeout_ms(1)).unwrap().run();

    assert_eq!(result.winner, MatchWinner::Draw);
    assert_eq!(result.reason, EndReason::Timeout);
    assert!(!result.is_error());
}

#[test]
fn test_same_seed_same_match() {
    let simulator = MatchSimulator::new(mixed_config().with_seed(11)).unwrap();
    let first = simulator.run();
    let second = simulator.run();

    assert_eq!(first.winner, second.winner);
    assert_eq!(first.reason, second.reason);
    assert_eq!(first.turns, second.turns);
    assert_eq!(first.statistics, second.statistics);
    assert_eq!(first.game_log.to_bytes().unwrap(), second.game_log.to_bytes().unwrap());
}

#[test]
fn test_mixed_decks_play_spells() {
    let batch = SimulationBatch::new(mixed_config().with_invariant_checks(true), 6).unwrap();
    let outcomes = batch.run_matches();
    assert_eq!(outcomes.len(), 6);

    let mut sites = 0;
    for outcome in &outcomes {
        let result = outcome.as_ref().unwrap();
        assert!(!result.is_error(), "seed {} errored", result.seed);
        assert!(result.turns <= 30);
        sites += result.statistics.sites_played;
    }
    assert!(sites > 0);
}

#[test]
fn test_batch_totals_add_up() {
    let batch = SimulationBatch::new(filler_config(8).with_seed(100), 10).unwrap();
    let result = batch.run();

    assert_eq!(result.total_games, 10);
    assert_eq!(result.player1_wins + result.player2_wins + result.draws + result.failed, 10);
    assert_eq!(result.failed, 0);
    let total_rate = result.player1_win_rate + result.player2_win_rate + result.draw_rate;
    assert!((total_rate - 1.0).abs() < 1e-9);
    assert!(result.average_turns > 0.0 && result.average_turns <= 8.0);
    assert_eq!(result.win_reasons.values().sum::<u32>(), 10);
}

#[test]
fn test_action_cap_limits_main_phase() {
    let config = mixed_config()
        .with_ruleset(common::small_ruleset(16, 12).with_max_actions_per_turn(1))
        .with_max_turns(20)
        .with_seed(3);
    let result = MatchSimulator::new(config).unwrap().run();

    assert!(!result.is_error());
    assert!(result.statistics.total_actions <= 20);
}

#[test]
fn test_strategies_are_configurable() {
    let config = mixed_config()
        .with_strategies(Strategy::from_name("aggro").unwrap(), Strategy::defensive())
        .with_seed(5);
    let simulator = MatchSimulator::new(config).unwrap();
    assert_eq!(simulator.config().player1_strategy.name, "aggressive");

    let result = simulator.run();
    assert!(!result.is_error());
    assert!(result.statistics.total_actions > 0);
}

#[test]
fn test_invalid_setup_is_rejected() {
    let err = MatchSimulator::new(filler_config(0)).unwrap_err();
    assert_eq!(err, SimulationError::Config(ConfigError::ZeroMaxTurns));

    let short = SimulationConfig::new(common::filler_deck(9, 10), common::filler_deck(10, 10))
        .with_ruleset(common::small_ruleset(10, 10));
    assert!(matches!(
        MatchSimulator::new(short),
        Err(SimulationError::InvalidDeck(_))
    ));
    assert!(Strategy::from_name("berserk").is_err());
}

#[test]
fn test_catalog_decks_run() {
    let records: Vec<RawCard> = serde_json::from_str(
        r#"[
            {"name": "Pyromancer", "type": "Avatar", "attack": 1, "life": 20},
            {"name": "Ember Imp", "type": "Minion", "mana_cost": 1, "attack": 1, "toughness": 1, "threshold": "F"},
            {"name": "Lava Hound", "type": "Minion", "cost": 2, "power": 3, "defense": 2},
            {"name": "Scorch", "type": "Magic", "cost": 1, "rules_text": "Deal 2 damage to target enemy unit."},
            {"name": "Ash Plains", "type": "Site", "elements": ["fire"]}
        ]"#,
    )
    .unwrap();
    let registry = CardRegistry::from_raw(records).unwrap();
    assert_eq!(registry.len(), 5);

    let deck = registry
        .build_deck(
            "Pyromancer",
            &[("Ember Imp", 4), ("Lava Hound", 4), ("scorch", 4)],
            &[("Ash Plains", 10)],
        )
        .unwrap();
    let config = SimulationConfig::new(deck.clone(), deck)
        .with_ruleset(common::small_ruleset(12, 10))
        .with_max_turns(20)
        .with_timeout_ms(0);
    let result = MatchSimulator::new(config).unwrap().run();

    assert!(!result.is_error());
    // The final board holds avatars plus minions that were played.
    let on_board = PlayerId::all().map(|p| result.statistics.final_board[p]).sum::<u32>();
    assert!(on_board <= result.statistics.units_played + 2);
}
