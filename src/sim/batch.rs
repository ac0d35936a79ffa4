//! Parallel batch simulation.
//!
//! Matches in a batch share nothing but the read-only configuration, so
//! they run on the rayon pool and are reduced afterwards. Match `i` uses
//! seed `base_seed + i`, which makes a batch reproducible regardless of
//! thread scheduling.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, info_span, warn};

use super::config::SimulationConfig;
use super::simulator::{MatchResult, MatchSimulator, MatchWinner, SimulationError};

/// One batch element: a finished match, or why it could not run.
pub type MatchOutcome = Result<MatchResult, SimulationError>;

/// Aggregate statistics over a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_games: u32,
    pub player1_wins: u32,
    pub player2_wins: u32,
    pub draws: u32,
    /// Elements that errored or ended with `EndReason::Error`.
    pub failed: u32,
    /// Rates are over completed (non-failed) games.
    pub player1_win_rate: f64,
    pub player2_win_rate: f64,
    pub draw_rate: f64,
    pub average_turns: f64,
    pub average_game_duration_ms: f64,
    /// Count of each end reason among completed games.
    pub win_reasons: BTreeMap<String, u32>,
}

impl BatchResult {
    /// Reduce match outcomes into aggregate statistics.
    #[must_use]
    pub fn aggregate(outcomes: &[MatchOutcome]) -> Self {
        let mut result = BatchResult {
            total_games: outcomes.len() as u32,
            ..BatchResult::default()
        };
        let mut turns = 0u64;
        let mut duration = 0u64;

        for outcome in outcomes {
            let game = match outcome {
                Ok(game) if !game.is_error() => game,
                _ => {
                    result.failed += 1;
                    continue;
                }
            };
            match game.winner {
                MatchWinner::Player1 => result.player1_wins += 1,
                MatchWinner::Player2 => result.player2_wins += 1,
                MatchWinner::Draw => result.draws += 1,
            }
            *result.win_reasons.entry(game.reason.as_str().to_string()).or_default() += 1;
            turns += u64::from(game.turns);
            duration += game.duration_ms;
        }

        let completed = result.total_games - result.failed;
        if completed > 0 {
            let n = f64::from(completed);
            result.player1_win_rate = f64::from(result.player1_wins) / n;
            result.player2_win_rate = f64::from(result.player2_wins) / n;
            result.draw_rate = f64::from(result.draws) / n;
            result.average_turns = turns as f64 / n;
            result.average_game_duration_ms = duration as f64 / n;
        }
        result
    }
}

/// Runs `runs` independent matches of one configuration.
#[derive(Clone, Debug)]
pub struct SimulationBatch {
    simulator: MatchSimulator,
    runs: u32,
}

impl SimulationBatch {
    /// Validate the configuration once for the whole batch.
    pub fn new(config: SimulationConfig, runs: u32) -> Result<Self, SimulationError> {
        Ok(Self {
            simulator: MatchSimulator::new(config)?,
            runs,
        })
    }

    /// Number of matches in the batch.
    #[must_use]
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Play every match in parallel, returning results in seed order.
    ///
    /// A match that panics becomes a failed element; the rest of the batch
    /// still runs.
    #[must_use]
    pub fn run_matches(&self) -> Vec<MatchOutcome> {
        self.play_each(|seed| self.simulator.run_with_seed(seed))
    }

    fn play_each<F>(&self, play: F) -> Vec<MatchOutcome>
    where
        F: Fn(u64) -> MatchResult + Sync,
    {
        let base = self.simulator.config().seed();
        (0..self.runs)
            .into_par_iter()
            .map(|i| {
                let seed = base.wrapping_add(u64::from(i));
                match panic::catch_unwind(AssertUnwindSafe(|| play(seed))) {
                    Ok(result) => {
                        if result.is_error() {
                            warn!(run = i, seed, "match ended with an internal error");
                        }
                        Ok(result)
                    }
                    Err(payload) => {
                        let message = payload
                            .downcast_ref::<&str>()
                            .map(|s| (*s).to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        warn!(run = i, seed, %message, "match panicked");
                        Err(SimulationError::Panicked { seed, message })
                    }
                }
            })
            .collect()
    }

    /// Play the batch and aggregate it.
    #[must_use]
    pub fn run(&self) -> BatchResult {
        let _span = info_span!("batch", runs = self.runs).entered();
        let result = BatchResult::aggregate(&self.run_matches());
        info!(
            p1 = result.player1_win_rate,
            p2 = result.player2_win_rate,
            draws = result.draw_rate,
            failed = result.failed,
            "batch finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, CardId, DeckError, Element, PlayerDeck};
    use crate::core::{EndReason, GameLog, Ruleset};
    use crate::sim::MatchStatistics;

    fn synthetic(winner: MatchWinner, reason: EndReason, turns: u32) -> MatchOutcome {
        Ok(MatchResult {
            winner,
            turns,
            reason,
            duration_ms: 10,
            statistics: MatchStatistics::default(),
            game_log: GameLog::new(),
            seed: 0,
        })
    }

    #[test]
    fn test_aggregate_rates() {
        let outcomes = vec![
            synthetic(MatchWinner::Player1, EndReason::AvatarDestroyed, 10),
            synthetic(MatchWinner::Player1, EndReason::LifeDepleted, 12),
            synthetic(MatchWinner::Player2, EndReason::AvatarDestroyed, 8),
            synthetic(MatchWinner::Draw, EndReason::MaxTurnsReached, 50),
        ];
        let result = BatchResult::aggregate(&outcomes);

        assert_eq!(result.total_games, 4);
        assert_eq!(result.player1_win_rate, 0.5);
        assert_eq!(result.player2_win_rate, 0.25);
        assert_eq!(result.draw_rate, 0.25);
        assert_eq!(result.draws, 1);
        assert_eq!(result.average_turns, 20.0);
        assert_eq!(result.win_reasons["avatar_destroyed"], 2);
        assert_eq!(result.win_reasons["max_turns_reached"], 1);
    }

    #[test]
    fn test_aggregate_counts_failures() {
        let outcomes = vec![
            synthetic(MatchWinner::Player2, EndReason::AvatarDestroyed, 9),
            synthetic(MatchWinner::Draw, EndReason::Error, 3),
            Err(SimulationError::InvalidDeck(DeckError::UnknownCard("Nope".to_string()))),
        ];
        let result = BatchResult::aggregate(&outcomes);
        assert_eq!(result.total_games, 3);
        assert_eq!(result.failed, 2);
        assert_eq!(result.player2_win_rate, 1.0);
        assert_eq!(result.average_turns, 9.0);
    }

    #[test]
    fn test_empty_batch() {
        let result = BatchResult::aggregate(&[]);
        assert_eq!(result.total_games, 0);
        assert_eq!(result.player1_win_rate, 0.0);
    }

    fn small_config() -> SimulationConfig {
        let deck = PlayerDeck::new(
            Card::avatar(CardId::new(0), "Avatar", 1, 20),
            vec![Card::minion(CardId::new(1), "Grunt", 0, 1, 1); 10],
            vec![Card::site(CardId::new(2), "Field").with_element(Element::Earth); 10],
        );
        SimulationConfig::new(deck.clone(), deck)
            .with_ruleset(Ruleset::default().with_deck_sizes(10, 10))
            .with_max_turns(4)
            .with_timeout_ms(0)
            .with_logging(false)
    }

    #[test]
    fn test_panicking_match_is_isolated() {
        let batch = SimulationBatch::new(small_config(), 4).unwrap();
        let outcomes = batch.play_each(|seed| {
            if seed == 43 {
                panic!("rules bug on seed {seed}");
            }
            batch.simulator.run_with_seed(seed)
        });

        assert_eq!(outcomes.len(), 4);
        assert_eq!(
            outcomes[1],
            Err(SimulationError::Panicked {
                seed: 43,
                message: "rules bug on seed 43".to_string()
            })
        );
        assert!(outcomes.iter().enumerate().all(|(i, o)| i == 1 || o.is_ok()));

        let result = BatchResult::aggregate(&outcomes);
        assert_eq!(result.total_games, 4);
        assert_eq!(result.failed, 1);
        assert_eq!(result.player1_wins + result.player2_wins + result.draws, 3);
    }

    #[test]
    fn test_batch_is_reproducible() {
        let batch = SimulationBatch::new(small_config(), 4).unwrap();

        let first = batch.run_matches();
        let second = batch.run_matches();
        let seeds: Vec<u64> = first.iter().map(|o| o.as_ref().unwrap().seed).collect();
        assert_eq!(seeds, vec![42, 43, 44, 45]);
        for (a, b) in first.iter().zip(&second) {
            let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
            assert_eq!(a.statistics, b.statistics);
            assert_eq!(a.winner, b.winner);
        }
        assert_eq!(batch.run().total_games, 4);
    }
}
