//! Effect targeting.
//!
//! - `Target`: a concrete thing an effect acts on
//! - `TargetSelector`: legal targets for one `TargetSpecification`
//! - `TargetPool`: hands caller-supplied targets out to a spell's effects

use serde::{Deserialize, Serialize};

use super::effect::{Restriction, TargetKind, TargetSpecification};
use crate::board::Position;
use crate::cards::CardId;
use crate::core::{GameState, PlayerId, Unit, UnitId};

/// A concrete effect target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Target {
    Unit(UnitId),
    Player(PlayerId),
    Position(Position),
    Card(CardId),
}

impl Target {
    /// The kind of specification this target satisfies.
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Unit(_) => TargetKind::Unit,
            Target::Player(_) => TargetKind::Player,
            Target::Position(_) => TargetKind::Position,
            Target::Card(_) => TargetKind::Card,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Unit(u) => write!(f, "{u}"),
            Target::Player(p) => write!(f, "{p}"),
            Target::Position(p) => write!(f, "{p}"),
            Target::Card(c) => write!(f, "{c}"),
        }
    }
}

/// Selector for choosing targets based on a spec.
#[derive(Clone, Debug)]
pub struct TargetSelector {
    spec: TargetSpecification,
    caster: PlayerId,
}

impl TargetSelector {
    /// Create a new target selector.
    #[must_use]
    pub fn new(spec: TargetSpecification, caster: PlayerId) -> Self {
        Self { spec, caster }
    }

    /// The specification being selected for.
    #[must_use]
    pub fn spec(&self) -> &TargetSpecification {
        &self.spec
    }

    /// All legal targets, in stable order.
    ///
    /// Units come in ID order, players in seat order, positions row-major.
    /// Cards are never legal: there is no stack to target.
    #[must_use]
    pub fn valid_targets(&self, state: &GameState) -> Vec<Target> {
        match self.spec.kind {
            TargetKind::Unit => state
                .units()
                .filter(|u| self.unit_passes(u))
                .map(|u| Target::Unit(u.id))
                .collect(),
            TargetKind::Player => PlayerId::all()
                .filter(|&p| self.player_passes(p))
                .map(Target::Player)
                .collect(),
            TargetKind::Position => state
                .grid()
                .positions()
                .filter(|&p| self.position_passes(state, p))
                .map(Target::Position)
                .collect(),
            TargetKind::Card => Vec::new(),
        }
    }

    /// Check a single target against the specification.
    #[must_use]
    pub fn is_valid(&self, state: &GameState, target: Target) -> bool {
        match target {
            Target::Unit(id) if self.spec.kind == TargetKind::Unit => {
                state.unit(id).is_some_and(|u| self.unit_passes(u))
            }
            Target::Player(p) if self.spec.kind == TargetKind::Player => self.player_passes(p),
            Target::Position(p) if self.spec.kind == TargetKind::Position => {
                self.position_passes(state, p)
            }
            _ => false,
        }
    }

    fn unit_passes(&self, unit: &Unit) -> bool {
        self.spec.restrictions.iter().all(|r| match *r {
            Restriction::Opponent => unit.owner != self.caster,
            Restriction::Friendly => unit.owner == self.caster,
            Restriction::Element(e) => unit.card.has_element(e),
            Restriction::PowerAtMost(n) => unit.power() <= n,
            Restriction::PowerAtLeast(n) => unit.power() >= n,
            Restriction::NonAvatar => !unit.is_avatar,
        })
    }

    fn player_passes(&self, player: PlayerId) -> bool {
        self.spec.restrictions.iter().all(|r| match r {
            Restriction::Opponent => player != self.caster,
            Restriction::Friendly => player == self.caster,
            _ => true,
        })
    }

    /// A position target is a square holding a site.
    fn position_passes(&self, state: &GameState, pos: Position) -> bool {
        let Some(site) = state.site_at(pos) else {
            return false;
        };
        self.spec.restrictions.iter().all(|r| match *r {
            Restriction::Opponent => site.owner != self.caster,
            Restriction::Friendly => site.owner == self.caster,
            Restriction::Element(e) => site.card.has_element(e),
            _ => true,
        })
    }

    /// Check if the minimum target count can be satisfied.
    #[must_use]
    pub fn has_enough_targets(&self, state: &GameState) -> bool {
        self.spec.optional || !self.valid_targets(state).is_empty()
    }

    /// Validate a selection of targets.
    ///
    /// Required specs need at least one target; nobody may pick more than
    /// `count`, pick twice, or pick an illegal target.
    #[must_use]
    pub fn validate_selection(&self, state: &GameState, selected: &[Target]) -> bool {
        if selected.len() > self.spec.count as usize {
            return false;
        }
        if selected.is_empty() && !self.spec.optional {
            return false;
        }
        let distinct = selected
            .iter()
            .enumerate()
            .all(|(i, t)| !selected[..i].contains(t));
        distinct && selected.iter().all(|&t| self.is_valid(state, t))
    }
}

/// Caller-supplied targets, consumed in order by a spell's effects.
#[derive(Clone, Debug)]
pub struct TargetPool {
    slots: Vec<Option<Target>>,
}

impl TargetPool {
    /// Wrap a list of provided targets.
    #[must_use]
    pub fn new(targets: &[Target]) -> Self {
        Self {
            slots: targets.iter().copied().map(Some).collect(),
        }
    }

    /// Take up to `count` unconsumed targets of a kind, in order.
    pub fn take(&mut self, kind: TargetKind, count: usize) -> Vec<Target> {
        let mut taken = Vec::new();
        for slot in &mut self.slots {
            if taken.len() == count {
                break;
            }
            if slot.is_some_and(|t| t.kind() == kind) {
                taken.extend(slot.take());
            }
        }
        taken
    }

    /// Targets no effect asked for.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}
