//! Rules engine: legal actions, action application, match results.
//!
//! The AI and the turn engine go through `RulesEngine`:
//! - Legal actions for each game state
//! - How actions modify state
//! - Win/loss conditions
//!
//! `RealmRules` is the only implementation; the trait keeps the seam
//! narrow enough for a scripted or recorded player to slot in.

pub mod engine;

pub use engine::{ActionError, ActionOutcome, GameResult, RealmRules, RulesEngine};
