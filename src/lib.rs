//! # realm-sim
//!
//! A deterministic match simulator for a grid-based collectible card game,
//! used to measure deck strength over many AI-vs-AI matches.
//!
//! ## Design Principles
//!
//! 1. **Single Writer**: `GameState` is the only owner of game data. Each
//!    subsystem mutates it through crate-private methods, so grid/unit
//!    consistency is enforced in one place.
//!
//! 2. **Reject Before Mutating**: placements, moves, attacks, blocks and
//!    actions are validated completely before any state changes.
//!
//! 3. **Deterministic**: seeded ChaCha RNG streams, ordered collections and
//!    logical timestamps make the same seed produce a byte-identical log.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: cheap `GameState` clones via `im` make
//!   one-ply AI lookahead affordable.
//!
//! - **Embarrassingly Parallel Batches**: matches share nothing mutable and
//!   run on the rayon pool.
//!
//! ## Modules
//!
//! - `core`: IDs, players, units, state, actions, events, RNG, ruleset
//! - `cards`: canonical cards, catalog adapter, registry, decklists
//! - `board`: grid, placement, movement and regions
//! - `effects`: card-text parser and spell execution
//! - `combat`: combat phase and the damage pipeline
//! - `rules`: `RulesEngine` trait and `RealmRules`
//! - `ai`: strategies, evaluation and action selection
//! - `turn`: phase state machine
//! - `sim`: match and batch simulation
//!
//! ## Example
//!
//! ```
//! use realm_sim::ai::Strategy;
//! use realm_sim::cards::{Card, CardId, Element, PlayerDeck};
//! use realm_sim::core::Ruleset;
//! use realm_sim::sim::{MatchSimulator, SimulationConfig};
//!
//! let deck = PlayerDeck::new(
//!     Card::avatar(CardId::new(0), "Sorcerer", 1, 20),
//!     vec![Card::minion(CardId::new(1), "Footsoldier", 1, 1, 2); 10],
//!     vec![Card::site(CardId::new(2), "Meadow").with_element(Element::Earth); 10],
//! );
//! let config = SimulationConfig::new(deck.clone(), deck)
//!     .with_ruleset(Ruleset::default().with_deck_sizes(10, 10))
//!     .with_strategies(Strategy::aggressive(), Strategy::defensive())
//!     .with_max_turns(8)
//!     .with_seed(1);
//!
//! let result = MatchSimulator::new(config).unwrap().run();
//! assert!(result.turns <= 8);
//! ```

pub mod ai;
pub mod board;
pub mod cards;
pub mod combat;
pub mod core;
pub mod effects;
pub mod rules;
pub mod sim;
pub mod turn;

// Re-export commonly used types
pub use crate::core::{Action, GameEvent, GameLog, GameRng, GameState, PlayerId, PlayerMap, Ruleset};

pub use crate::cards::{Card, CardId, CardKind, CardRegistry, PlayerDeck};

pub use crate::board::{MovementEngine, Position, PositionSystem, Region, RegionManager};

pub use crate::effects::{SpellEffect, SpellEffectSystem, SpellParser};

pub use crate::combat::{CombatPhase, CombatSystem, DamageSystem};

pub use crate::rules::{GameResult, RealmRules, RulesEngine};

pub use crate::ai::{AIEngine, Strategy};

pub use crate::turn::TurnEngine;

pub use crate::sim::{BatchResult, MatchResult, MatchSimulator, SimulationBatch, SimulationConfig};
