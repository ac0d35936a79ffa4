//! Combat and damage.
//!
//! - `DamageSystem`: prevention, redirection, destruction, loss checks
//! - `CombatSystem`: stateless attack/block legality
//! - `CombatPhase`: the declare → block → damage → end state machine

#[allow(clippy::module_inception)]
mod combat;
mod damage;

pub use combat::{
    Attack, AttackTarget, CombatError, CombatPhase, CombatReport, CombatStep, CombatSystem,
    DamageAssignment,
};
pub use damage::DamageSystem;
