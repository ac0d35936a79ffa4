//! Combat phase state machine.
//!
//! ## Steps
//!
//! `DeclareAttackers` → `DeclareBlockers` → `Damage` → `End`
//!
//! - Attackers belong to the active player, are untapped, free of summoning
//!   sickness and have power. Declaring taps them.
//! - An attack targets an enemy non-avatar unit, or the defending player
//!   through their avatar, in the attacker's region within distance 1.
//! - Blockers belong to the defender, are untapped, stand in the attacker's
//!   region within distance 1, and block one attacker each.
//! - Damage is computed for every pairing first, then applied, then lethal
//!   damage is swept once.
//!
//! Illegal declarations are rejected before any mutation.

use smallvec::SmallVec;
use tracing::debug;

use super::damage::DamageSystem;
use crate::core::{DamageTarget, EventKind, GameState, PlayerId, Unit, UnitId};

/// Combat step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombatStep {
    DeclareAttackers,
    DeclareBlockers,
    Damage,
    End,
}

/// What an attacker swings at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttackTarget {
    Unit(UnitId),
    Player(PlayerId),
}

/// Why a declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CombatError {
    #[display("cannot do that during {_0:?}")]
    WrongStep(CombatStep),
    #[display("{_0} is not on the board")]
    UnknownUnit(UnitId),
    #[display("{_0} is not controlled by the right player")]
    WrongController(UnitId),
    #[display("{_0} is tapped")]
    Tapped(UnitId),
    #[display("{_0} has summoning sickness")]
    SummoningSick(UnitId),
    #[display("{_0} has no power")]
    NoPower(UnitId),
    #[display("{_0} is already attacking")]
    AlreadyAttacking(UnitId),
    #[display("{_0} is already blocking")]
    AlreadyBlocking(UnitId),
    #[display("{_0} is not attacking")]
    NotAttacking(UnitId),
    #[display("{_0:?} is not a legal attack target")]
    InvalidTarget(AttackTarget),
    #[display("{unit} cannot reach {other}")]
    OutOfReach { unit: UnitId, other: UnitId },
}

impl std::error::Error for CombatError {}

/// One declared attack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attack {
    pub attacker: UnitId,
    pub target: AttackTarget,
    /// Blockers in declaration order.
    pub blockers: SmallVec<[UnitId; 2]>,
}

/// One computed damage assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageAssignment {
    pub source: UnitId,
    pub target: DamageTarget,
    pub amount: u32,
}

/// What combat damage did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CombatReport {
    pub assignments: Vec<DamageAssignment>,
    pub destroyed: Vec<UnitId>,
}

/// Stateless combat legality checks.
pub struct CombatSystem;

impl CombatSystem {
    fn within_reach(a: &Unit, b: &Unit) -> bool {
        a.region() == b.region() && a.position().distance(b.position()) <= 1
    }

    /// Check an attack declaration.
    pub fn check_attacker(state: &GameState, attacker: UnitId, target: AttackTarget) -> Result<(), CombatError> {
        let unit = state.unit(attacker).ok_or(CombatError::UnknownUnit(attacker))?;
        if unit.owner != state.active_player() {
            return Err(CombatError::WrongController(attacker));
        }
        if unit.is_tapped {
            return Err(CombatError::Tapped(attacker));
        }
        if unit.summoning_sickness {
            return Err(CombatError::SummoningSick(attacker));
        }
        if unit.power() == 0 {
            return Err(CombatError::NoPower(attacker));
        }

        let victim = match target {
            AttackTarget::Unit(id) => state
                .unit(id)
                .filter(|t| t.owner != unit.owner && !t.is_avatar),
            AttackTarget::Player(p) if p != unit.owner => state.avatar(p),
            AttackTarget::Player(_) => None,
        }
        .ok_or(CombatError::InvalidTarget(target))?;

        if !Self::within_reach(unit, victim) {
            return Err(CombatError::OutOfReach {
                unit: attacker,
                other: victim.id,
            });
        }
        Ok(())
    }

    /// Check whether a unit may attack a target now.
    #[must_use]
    pub fn can_declare_attacker(state: &GameState, attacker: UnitId, target: AttackTarget) -> bool {
        Self::check_attacker(state, attacker, target).is_ok()
    }

    /// Check a block declaration, ignoring blocks already made.
    pub fn check_blocker(state: &GameState, blocker: UnitId, attacker: UnitId) -> Result<(), CombatError> {
        let attacking = state.unit(attacker).ok_or(CombatError::UnknownUnit(attacker))?;
        let unit = state.unit(blocker).ok_or(CombatError::UnknownUnit(blocker))?;
        if unit.owner == attacking.owner {
            return Err(CombatError::WrongController(blocker));
        }
        if unit.is_tapped {
            return Err(CombatError::Tapped(blocker));
        }
        if !Self::within_reach(unit, attacking) {
            return Err(CombatError::OutOfReach {
                unit: blocker,
                other: attacker,
            });
        }
        Ok(())
    }

    /// Check whether a unit may block an attacker now.
    #[must_use]
    pub fn can_declare_blocker(state: &GameState, blocker: UnitId, attacker: UnitId) -> bool {
        Self::check_blocker(state, blocker, attacker).is_ok()
    }

    /// Every legal target for an attacker: enemy units in ID order, then
    /// the defending player.
    #[must_use]
    pub fn attack_targets(state: &GameState, attacker: UnitId) -> Vec<AttackTarget> {
        let Some(unit) = state.unit(attacker) else {
            return Vec::new();
        };
        let defender = unit.owner.opponent();
        state
            .units_of(defender)
            .map(|u| AttackTarget::Unit(u.id))
            .chain(std::iter::once(AttackTarget::Player(defender)))
            .filter(|&t| Self::can_declare_attacker(state, attacker, t))
            .collect()
    }

    /// Units that could block an attacker.
    #[must_use]
    pub fn potential_blockers(state: &GameState, attacker: UnitId) -> Vec<UnitId> {
        let Some(unit) = state.unit(attacker) else {
            return Vec::new();
        };
        state
            .units_of(unit.owner.opponent())
            .filter(|b| Self::can_declare_blocker(state, b.id, attacker))
            .map(|b| b.id)
            .collect()
    }
}

/// One combat phase: declarations plus damage resolution.
#[derive(Clone, Debug)]
pub struct CombatPhase {
    step: CombatStep,
    attacks: Vec<Attack>,
}

impl Default for CombatPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatPhase {
    /// Start a combat phase at the attack declaration step.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: CombatStep::DeclareAttackers,
            attacks: Vec::new(),
        }
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> CombatStep {
        self.step
    }

    /// Declared attacks, in declaration order.
    #[must_use]
    pub fn attacks(&self) -> &[Attack] {
        &self.attacks
    }

    fn expect_step(&self, step: CombatStep) -> Result<(), CombatError> {
        if self.step == step {
            Ok(())
        } else {
            Err(CombatError::WrongStep(self.step))
        }
    }

    fn is_blocking(&self, unit: UnitId) -> bool {
        self.attacks.iter().any(|a| a.blockers.contains(&unit))
    }

    /// Check an attack declaration in the context of this phase.
    #[must_use]
    pub fn can_declare_attacker(&self, state: &GameState, attacker: UnitId, target: AttackTarget) -> bool {
        self.step == CombatStep::DeclareAttackers
            && !self.attacks.iter().any(|a| a.attacker == attacker)
            && CombatSystem::can_declare_attacker(state, attacker, target)
    }

    /// Check a block declaration in the context of this phase.
    #[must_use]
    pub fn can_declare_blocker(&self, state: &GameState, blocker: UnitId, attacker: UnitId) -> bool {
        self.step == CombatStep::DeclareBlockers
            && self.attacks.iter().any(|a| a.attacker == attacker)
            && !self.is_blocking(blocker)
            && CombatSystem::can_declare_blocker(state, blocker, attacker)
    }

    /// Declare an attack. Taps the attacker.
    pub fn declare_attacker(
        &mut self,
        state: &mut GameState,
        attacker: UnitId,
        target: AttackTarget,
    ) -> Result<(), CombatError> {
        self.expect_step(CombatStep::DeclareAttackers)?;
        if self.attacks.iter().any(|a| a.attacker == attacker) {
            return Err(CombatError::AlreadyAttacking(attacker));
        }
        CombatSystem::check_attacker(state, attacker, target)?;

        let Some(unit) = state.unit_mut(attacker) else {
            return Err(CombatError::UnknownUnit(attacker));
        };
        unit.is_tapped = true;
        let name = unit.card.name.clone();
        let defender = unit.owner.opponent();
        let (victim, description) = match target {
            AttackTarget::Unit(id) => (Some(id), format!("{name} attacks {id}")),
            AttackTarget::Player(p) => (None, format!("{name} attacks {p}")),
        };
        state.emit(
            EventKind::AttackDeclared {
                attacker,
                defender,
                target: victim,
            },
            description,
        );
        debug!(%attacker, ?target, "attack declared");
        self.attacks.push(Attack {
            attacker,
            target,
            blockers: SmallVec::new(),
        });
        Ok(())
    }

    /// Close attack declarations.
    pub fn finish_attacks(&mut self) -> Result<(), CombatError> {
        self.expect_step(CombatStep::DeclareAttackers)?;
        self.step = if self.attacks.is_empty() {
            CombatStep::End
        } else {
            CombatStep::DeclareBlockers
        };
        Ok(())
    }

    /// Declare a blocker against a declared attacker.
    pub fn declare_blocker(
        &mut self,
        state: &mut GameState,
        blocker: UnitId,
        attacker: UnitId,
    ) -> Result<(), CombatError> {
        self.expect_step(CombatStep::DeclareBlockers)?;
        if self.is_blocking(blocker) {
            return Err(CombatError::AlreadyBlocking(blocker));
        }
        CombatSystem::check_blocker(state, blocker, attacker)?;
        let attack = self
            .attacks
            .iter_mut()
            .find(|a| a.attacker == attacker)
            .ok_or(CombatError::NotAttacking(attacker))?;
        attack.blockers.push(blocker);

        let name = state.unit(blocker).map(|u| u.card.name.clone()).unwrap_or_default();
        state.emit(
            EventKind::BlockDeclared { blocker, attacker },
            format!("{name} blocks {attacker}"),
        );
        debug!(%blocker, %attacker, "block declared");
        Ok(())
    }

    /// Close block declarations.
    pub fn finish_blocks(&mut self) -> Result<(), CombatError> {
        self.expect_step(CombatStep::DeclareBlockers)?;
        self.step = CombatStep::Damage;
        Ok(())
    }

    /// Compute every damage assignment without touching the state.
    ///
    /// A blocked attacker assigns lethal damage to each blocker in order and
    /// the remainder to the last one; every blocker strikes the attacker.
    /// An attacked unit strikes back.
    #[must_use]
    pub fn assign_damage(&self, state: &GameState) -> Vec<DamageAssignment> {
        let mut assignments = Vec::new();
        for attack in &self.attacks {
            let Some(attacker) = state.unit(attack.attacker) else {
                continue;
            };
            let blockers: SmallVec<[&Unit; 2]> = attack.blockers.iter().filter_map(|&id| state.unit(id)).collect();

            if blockers.is_empty() {
                match attack.target {
                    AttackTarget::Unit(id) => {
                        let Some(victim) = state.unit(id) else {
                            continue;
                        };
                        assignments.push(DamageAssignment {
                            source: attacker.id,
                            target: DamageTarget::Unit(id),
                            amount: attacker.power(),
                        });
                        assignments.push(DamageAssignment {
                            source: id,
                            target: DamageTarget::Unit(attacker.id),
                            amount: victim.power(),
                        });
                    }
                    AttackTarget::Player(p) => assignments.push(DamageAssignment {
                        source: attacker.id,
                        target: DamageTarget::Player(p),
                        amount: attacker.power(),
                    }),
                }
                continue;
            }

            let mut remaining = attacker.power();
            for (i, blocker) in blockers.iter().enumerate() {
                let share = if i + 1 == blockers.len() {
                    remaining
                } else {
                    remaining.min(blocker.remaining_life())
                };
                remaining -= share;
                assignments.push(DamageAssignment {
                    source: attacker.id,
                    target: DamageTarget::Unit(blocker.id),
                    amount: share,
                });
                assignments.push(DamageAssignment {
                    source: blocker.id,
                    target: DamageTarget::Unit(attacker.id),
                    amount: blocker.power(),
                });
            }
        }
        assignments.retain(|a| a.amount > 0);
        assignments
    }

    /// Resolve combat damage simultaneously, then sweep lethal damage once.
    pub fn resolve_combat_damage(&mut self, state: &mut GameState) -> Result<CombatReport, CombatError> {
        if self.step == CombatStep::DeclareBlockers {
            self.step = CombatStep::Damage;
        }
        self.expect_step(CombatStep::Damage)?;

        let assignments = self.assign_damage(state);
        for a in &assignments {
            DamageSystem::apply_damage(state, Some(a.source), a.target, a.amount);
        }
        let destroyed = DamageSystem::check_destroyed_creatures(state);
        DamageSystem::check_game_over(state);
        state.stats.combat_resolutions += 1;
        debug!(
            attacks = self.attacks.len(),
            assignments = assignments.len(),
            destroyed = destroyed.len(),
            "combat resolved"
        );

        self.step = CombatStep::End;
        Ok(CombatReport { assignments, destroyed })
    }
}
