//! Turn and phase sequencing.

mod engine;

pub use engine::{TurnEngine, TurnError, TurnSummary};
