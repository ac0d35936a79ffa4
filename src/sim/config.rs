//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::ai::Strategy;
use crate::cards::PlayerDeck;
use crate::core::{ConfigError, Ruleset};

/// Everything needed to run one matchup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub player1_deck: PlayerDeck,
    pub player2_deck: PlayerDeck,
    pub player1_strategy: Strategy,
    pub player2_strategy: Strategy,

    /// Player-turns before the match is called a draw.
    pub max_turns: u32,

    /// Wall-clock budget per match in milliseconds (0 = unlimited).
    pub timeout_ms: u64,

    /// Record human-readable events into the game log.
    /// Statistics are collected either way.
    pub enable_logging: bool,

    /// Seed for shuffling and AI noise. `None` uses a fixed default so runs
    /// stay reproducible.
    pub random_seed: Option<u64>,

    pub ruleset: Ruleset,

    /// Verify state invariants after every turn (slow; for testing).
    pub check_invariants: bool,
}

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

impl SimulationConfig {
    /// Create a config with default limits for two decks.
    #[must_use]
    pub fn new(player1_deck: PlayerDeck, player2_deck: PlayerDeck) -> Self {
        Self {
            player1_deck,
            player2_deck,
            player1_strategy: Strategy::midrange(),
            player2_strategy: Strategy::midrange(),
            max_turns: 50,
            timeout_ms: 30_000,
            enable_logging: true,
            random_seed: None,
            ruleset: Ruleset::default(),
            check_invariants: false,
        }
    }

    /// Set both strategies.
    #[must_use]
    pub fn with_strategies(mut self, player1: Strategy, player2: Strategy) -> Self {
        self.player1_strategy = player1;
        self.player2_strategy = player2;
        self
    }

    /// Set the turn limit.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the wall-clock budget.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Toggle event recording.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Set the ruleset.
    #[must_use]
    pub fn with_ruleset(mut self, ruleset: Ruleset) -> Self {
        self.ruleset = ruleset;
        self
    }

    /// Toggle per-turn invariant checks.
    #[must_use]
    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    /// The seed a match will use.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.random_seed.unwrap_or(DEFAULT_SEED)
    }

    /// Check limits and the ruleset. Decks are validated separately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::ZeroMaxTurns);
        }
        self.ruleset.validate()
    }
}
