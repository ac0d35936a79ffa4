//! Spell effects: parsing card text and executing it.
//!
//! - `SpellEffect`: the effect AST
//! - `SpellParser`: card text to effects
//! - `TargetSelector`: legal targets for a target specification
//! - `SpellEffectSystem`: executes effects on game state
//!
//! ## Design Philosophy
//!
//! Parsing is pure and cacheable; execution is the only place spell text
//! touches the state. Unrecognised text is a known fidelity gap: it yields
//! no effect and is counted, never guessed at.

mod condition;
mod effect;
mod executor;
mod parser;
mod targeting;

pub use effect::{
    Comparison, ConditionCheck, ConditionProperty, ConditionTarget, Duration, EffectParameters,
    EffectType, Restriction, SearchFilter, SpellEffect, TargetKind, TargetSpecification, ALL_TARGETS,
};
pub use executor::{EffectError, SpellEffectSystem, SpellResult};
pub use parser::{ParsedText, SpellParser};
pub use targeting::{Target, TargetPool, TargetSelector};
