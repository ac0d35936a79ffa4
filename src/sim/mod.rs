//! Match and batch simulation.
//!
//! - `SimulationConfig`: decks, strategies and limits for a matchup
//! - `MatchSimulator`: plays one seeded match to a `MatchResult`
//! - `SimulationBatch`: plays many matches in parallel to a `BatchResult`
//! - `MatchStatistics`: per-match counters

mod batch;
mod config;
mod simulator;
mod stats;

pub use batch::{BatchResult, MatchOutcome, SimulationBatch};
pub use config::{SimulationConfig, DEFAULT_SEED};
pub use simulator::{MatchResult, MatchSimulator, MatchWinner, SimulationError};
pub use stats::MatchStatistics;
