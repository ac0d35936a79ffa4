//! Single-match driver.
//!
//! `MatchSimulator` validates the configuration once, then plays any
//! number of seeded matches. Each match owns a fresh `GameState` and runs
//! turns until the rules end it or a limit is hit:
//!
//! - `max_turns` player-turns → draw, `max_turns_reached`
//! - `timeout_ms` wall-clock → draw, `timeout`
//! - internal rules failure → draw, `error`

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};

use super::config::SimulationConfig;
use super::stats::MatchStatistics;
use crate::ai::AIEngine;
use crate::cards::DeckError;
use crate::core::{ConfigError, EndReason, GameLog, GameState, PlayerId, PlayerMap};
use crate::rules::GameResult;
use crate::turn::TurnEngine;

/// Why a simulation could not start.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum SimulationError {
    #[display("invalid deck: {_0}")]
    InvalidDeck(DeckError),
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),
    #[display("match with seed {seed} panicked: {message}")]
    #[from(skip)]
    Panicked { seed: u64, message: String },
}

impl std::error::Error for SimulationError {}

/// Match winner as reported to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchWinner {
    Player1,
    Player2,
    Draw,
}

impl From<&GameResult> for MatchWinner {
    fn from(result: &GameResult) -> Self {
        match result {
            GameResult::Winner(p) if *p == PlayerId::ONE => MatchWinner::Player1,
            GameResult::Winner(_) => MatchWinner::Player2,
            GameResult::Draw => MatchWinner::Draw,
        }
    }
}

impl std::fmt::Display for MatchWinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchWinner::Player1 => write!(f, "player1"),
            MatchWinner::Player2 => write!(f, "player2"),
            MatchWinner::Draw => write!(f, "draw"),
        }
    }
}

/// Outcome of one match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: MatchWinner,
    /// Player-turns started.
    pub turns: u32,
    pub reason: EndReason,
    /// Wall-clock duration. Not covered by determinism.
    pub duration_ms: u64,
    pub statistics: MatchStatistics,
    pub game_log: GameLog,
    pub seed: u64,
}

impl MatchResult {
    /// Whether the match hit an internal failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.reason == EndReason::Error
    }
}

/// Runs matches for one validated configuration.
#[derive(Clone, Debug)]
pub struct MatchSimulator {
    config: SimulationConfig,
}

impl MatchSimulator {
    /// Validate the configuration and both decks.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        config.player1_deck.validate(&config.ruleset)?;
        config.player2_deck.validate(&config.ruleset)?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Play one match with the configured seed.
    #[must_use]
    pub fn run(&self) -> MatchResult {
        self.run_with_seed(self.config.seed())
    }

    /// Build the starting state and turn engine for a seed.
    #[must_use]
    pub fn setup(&self, seed: u64) -> (GameState, TurnEngine) {
        let config = &self.config;
        let mut state = GameState::new(config.ruleset.clone(), &config.player1_deck, &config.player2_deck, seed);
        state.set_recording(config.enable_logging);

        let ais = PlayerMap::new(|p| {
            let strategy = if p == PlayerId::ONE {
                config.player1_strategy.clone()
            } else {
                config.player2_strategy.clone()
            };
            AIEngine::new(p, strategy, state.rng.for_context(&format!("ai/{p}")))
        });
        (state, TurnEngine::new(ais))
    }

    /// Play one match with an explicit seed.
    #[must_use]
    pub fn run_with_seed(&self, seed: u64) -> MatchResult {
        let _span = info_span!("match", seed).entered();
        let started = Instant::now();
        let (mut state, mut engine) = self.setup(seed);
        let limit = self.config.timeout_ms;
        engine.set_deadline((limit > 0).then(|| started + Duration::from_millis(limit)));

        while !state.is_game_over() {
            if state.turn() > self.config.max_turns {
                state.end_game(GameResult::Draw, EndReason::MaxTurnsReached);
                break;
            }
            if let Err(error) = engine.play_turn(&mut state) {
                warn!(%error, turn = state.turn(), "turn failed");
                state.end_game(GameResult::Draw, EndReason::Error);
                break;
            }
            if self.config.check_invariants {
                if let Err(violation) = state.check_invariants() {
                    warn!(%violation, turn = state.turn(), "invariant violated");
                    state.end_game(GameResult::Draw, EndReason::Error);
                    break;
                }
            }
            let elapsed = started.elapsed().as_millis() as u64;
            if self.config.timeout_ms > 0 && elapsed > self.config.timeout_ms && !state.is_game_over() {
                debug!(elapsed, "match timed out");
                state.end_game(GameResult::Draw, EndReason::Timeout);
            }
        }

        let winner = state.winner().map_or(MatchWinner::Draw, MatchWinner::from);
        let reason = state.end_reason().unwrap_or(EndReason::Error);
        let turns = state.turn().min(self.config.max_turns);
        info!(%winner, %reason, turns, "match finished");

        MatchResult {
            winner,
            turns,
            reason,
            duration_ms: started.elapsed().as_millis() as u64,
            statistics: state.statistics().clone(),
            game_log: state.log().clone(),
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, CardId, Element, PlayerDeck};
    use crate::core::Ruleset;

    fn deck() -> PlayerDeck {
        PlayerDeck::new(
            Card::avatar(CardId::new(0), "Avatar", 1, 20),
            vec![Card::minion(CardId::new(1), "Grunt", 0, 1, 1); 10],
            vec![Card::site(CardId::new(2), "Field").with_element(Element::Earth); 10],
        )
    }

    fn config() -> SimulationConfig {
        SimulationConfig::new(deck(), deck())
            .with_ruleset(Ruleset::default().with_deck_sizes(10, 10))
            .with_max_turns(6)
            .with_timeout_ms(0)
    }

    #[test]
    fn test_rejects_invalid_deck() {
        let config = SimulationConfig::new(deck(), deck());
        assert!(matches!(
            MatchSimulator::new(config),
            Err(SimulationError::InvalidDeck(DeckError::SpellbookSize { .. }))
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = config().with_max_turns(0);
        assert_eq!(
            MatchSimulator::new(config).unwrap_err(),
            SimulationError::Config(ConfigError::ZeroMaxTurns)
        );
    }

    #[test]
    fn test_turn_limit_ends_in_draw() {
        let sim = MatchSimulator::new(config()).unwrap();
        let result = sim.run();
        assert_eq!(result.reason, EndReason::MaxTurnsReached);
        assert_eq!(result.winner, MatchWinner::Draw);
        assert_eq!(result.turns, 6);
        assert!(!result.game_log.is_empty());
        assert!(result.statistics.sites_played > 0);
    }

    #[test]
    fn test_same_seed_same_log() {
        let sim = MatchSimulator::new(config()).unwrap();
        let a = sim.run_with_seed(11);
        let b = sim.run_with_seed(11);
        assert_eq!(a.game_log.to_bytes().unwrap(), b.game_log.to_bytes().unwrap());
        assert_eq!(a.statistics, b.statistics);
        assert_eq!(a.winner, b.winner);
    }

    #[test]
    fn test_logging_disabled_keeps_statistics() {
        let quiet = MatchSimulator::new(config().with_logging(false)).unwrap().run();
        let loud = MatchSimulator::new(config()).unwrap().run();
        assert!(quiet.game_log.is_empty());
        assert_eq!(quiet.statistics, loud.statistics);
    }

    #[test]
    fn test_winner_mapping() {
        assert_eq!(MatchWinner::from(&GameResult::Winner(PlayerId::ONE)), MatchWinner::Player1);
        assert_eq!(MatchWinner::from(&GameResult::Winner(PlayerId::TWO)), MatchWinner::Player2);
        assert_eq!(MatchWinner::from(&GameResult::Draw), MatchWinner::Draw);
        assert_eq!(serde_json::to_string(&MatchWinner::Player2).unwrap(), "\"player2\"");
    }
}
