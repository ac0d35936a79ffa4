//! AI players.
//!
//! - `Strategy`: weight profile with named presets
//! - `evaluate`: heuristic score of a position for one seat
//! - `AIEngine`: picks main-phase actions, attacks and blocks

mod engine;
mod eval;
mod strategy;

pub use engine::AIEngine;
pub use eval::{evaluate, unit_value, TERMINAL_SCORE};
pub use strategy::Strategy;
