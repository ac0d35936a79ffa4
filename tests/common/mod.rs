//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use realm_sim::board::{Placement, Position, PositionSystem};
use realm_sim::cards::{Card, CardId, Element, PlayerDeck};
use realm_sim::core::{GameState, PlayerId, Ruleset, UnitId};

static TRACING: Once = Once::new();

/// Install a fmt subscriber once per test binary (`RUST_LOG` filters it).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A deck of 0-cost neutral filler: vanilla minions and plain sites.
pub fn filler_deck(spells: usize, sites: usize) -> PlayerDeck {
    PlayerDeck::new(
        Card::avatar(CardId::new(0), "Wanderer", 1, 20),
        (0..spells)
            .map(|i| Card::minion(CardId::new(100 + i as u32), format!("Filler {i}"), 0, 1, 1))
            .collect(),
        (0..sites)
            .map(|i| Card::site(CardId::new(200 + i as u32), format!("Plain {i}")))
            .collect(),
    )
}

/// A mixed deck: minions, burn, pump and draw spells over earth and fire
/// sites.
pub fn mixed_deck(spells: usize, sites: usize) -> PlayerDeck {
    let templates = [
        Card::minion(CardId::new(1), "Footsoldier", 1, 1, 2),
        Card::minion(CardId::new(2), "Ogre", 3, 3, 3),
        Card::magic(CardId::new(3), "Firebolt", 1, "Deal 2 damage to target enemy unit."),
        Card::magic(CardId::new(4), "Insight", 1, "Draw 2."),
        Card::magic(CardId::new(5), "Rally", 2, "All units you control get +1/+1 until end of turn."),
        Card::minion(CardId::new(6), "Scout", 1, 1, 1).with_movement(2),
        Card::magic(CardId::new(7), "Mend", 1, "Restore 3 life."),
        Card::artifact(CardId::new(8), "Spear", 1, 1, 0),
    ];
    let lands = [
        Card::site(CardId::new(20), "Meadow").with_element(Element::Earth),
        Card::site(CardId::new(21), "Volcano").with_element(Element::Fire),
    ];
    PlayerDeck::new(
        Card::avatar(CardId::new(0), "Sorcerer", 1, 20),
        (0..spells).map(|i| templates[i % templates.len()].clone()).collect(),
        (0..sites).map(|i| lands[i % lands.len()].clone()).collect(),
    )
}

/// Small ruleset for fast matches with short decks.
pub fn small_ruleset(spells: usize, sites: usize) -> Ruleset {
    Ruleset::default().with_deck_sizes(spells, sites)
}

/// Two-row, one-column board: both avatars start adjacent.
pub fn duel_state() -> GameState {
    let deck = filler_deck(6, 6);
    GameState::new(Ruleset::default().with_grid(2, 1), &deck, &deck, 7)
}

/// Ensure `player` controls a site on their avatar square, then summon a
/// minion there.
pub fn summon_at_home(state: &mut GameState, player: PlayerId, card: Card) -> UnitId {
    let home = state.ruleset().avatar_start(player);
    if state.site_at(home).is_none() {
        let site = Arc::new(Card::site(CardId::new(2), "Field").with_element(Element::Earth));
        PositionSystem::place_card(state, player, site, home, None).expect("home site");
    }
    place_unit(state, player, card, home)
}

/// Summon a minion on a square the player already controls.
pub fn place_unit(state: &mut GameState, player: PlayerId, card: Card, at: Position) -> UnitId {
    match PositionSystem::place_card(state, player, Arc::new(card), at, None).expect("summon") {
        Placement::Unit(id) => id,
        other => panic!("expected a unit, got {other:?}"),
    }
}
