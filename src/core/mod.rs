//! Core engine types: IDs, players, units, state, actions, events, RNG,
//! rules configuration.
//!
//! `GameState` is the root aggregate. Every other module reads it freely
//! and mutates it only through the crate-private methods defined here.

pub mod action;
pub mod config;
pub mod event;
pub mod ids;
pub mod player;
pub mod rng;
pub mod state;
pub mod unit;

pub use action::Action;
pub use config::{ConfigError, EmptyDeckRule, Ruleset};
pub use event::{DamageTarget, EndReason, EventKind, GameEvent, GameLog};
pub use ids::{ArtifactId, SiteId, UnitId};
pub use player::{DeckKind, Hand, Player, PlayerId, PlayerMap, PLAYER_COUNT};
pub use rng::GameRng;
pub use state::{Artifact, GameState, Phase, PhaseKind, Site};
pub use unit::{Modifier, ModifierKind, ModifierSource, Unit};
