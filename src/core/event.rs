//! Game events and the append-only game log.
//!
//! Every state mutation appends one `GameEvent`. The log doubles as the
//! audit trail and as the source for human-readable storylines.
//!
//! ## Determinism
//!
//! Events carry a logical `timestamp` (one tick per applied action) rather
//! than wall-clock time, so two runs with the same seed produce
//! byte-identical logs (`GameLog::to_bytes`).

use im::Vector;
use serde::{Deserialize, Serialize};

use super::ids::{ArtifactId, SiteId, UnitId};
use super::player::{DeckKind, PlayerId};
use super::unit::ModifierKind;
use crate::board::{Position, Region};

/// Receiver of damage or healing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageTarget {
    Unit(UnitId),
    Player(PlayerId),
}

impl std::fmt::Display for DamageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DamageTarget::Unit(u) => write!(f, "{u}"),
            DamageTarget::Player(p) => write!(f, "{p}"),
        }
    }
}

/// Why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    AvatarDestroyed,
    LifeDepleted,
    DeckOut,
    MaxTurnsReached,
    Timeout,
    Error,
}

impl EndReason {
    /// Stable snake_case name used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::AvatarDestroyed => "avatar_destroyed",
            EndReason::LifeDepleted => "life_depleted",
            EndReason::DeckOut => "deck_out",
            EndReason::MaxTurnsReached => "max_turns_reached",
            EndReason::Timeout => "timeout",
            EndReason::Error => "error",
        }
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    TurnStarted { player: PlayerId },
    CardDrawn { player: PlayerId, deck: DeckKind, card: String },
    DeckEmpty { player: PlayerId, deck: DeckKind },
    SitePlayed { player: PlayerId, site: SiteId, card: String, position: Position },
    UnitSummoned { player: PlayerId, unit: UnitId, card: String, position: Position, region: Region },
    ArtifactAttached { player: PlayerId, artifact: ArtifactId, bearer: UnitId, card: String },
    UnitMoved { unit: UnitId, from: Position, to: Position, region: Region },
    SpellCast { player: PlayerId, card: String },
    SpellFizzled { player: PlayerId, card: String, reason: String },
    AttackDeclared { attacker: UnitId, defender: PlayerId, target: Option<UnitId> },
    BlockDeclared { blocker: UnitId, attacker: UnitId },
    DamageDealt { source: Option<UnitId>, target: DamageTarget, amount: u32 },
    DamagePrevented { target: DamageTarget, amount: u32 },
    Healed { target: DamageTarget, amount: u32 },
    UnitDestroyed { unit: UnitId, owner: PlayerId, card: String },
    ModifierApplied { unit: UnitId, kind: ModifierKind, value: i32 },
    ModifierExpired { unit: UnitId, count: u32 },
    RegionConflict { unit: UnitId, position: Position, from: Region, to: Option<Region> },
    CardSearched { player: PlayerId, deck: DeckKind, card: String },
    GameOver { winner: Option<PlayerId>, reason: EndReason },
}

/// One entry in the game log. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Sequence number, unique within a match.
    pub id: u64,
    pub turn: u32,
    pub active_player: PlayerId,
    pub kind: EventKind,
    /// Human-readable storyline line.
    pub description: String,
    pub resolved: bool,
    /// Logical tick of the action that produced the event.
    pub timestamp: u64,
}

/// Append-only event sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    events: Vector<GameEvent>,
}

impl GameLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no events were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate in append order.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    /// Most recent event.
    #[must_use]
    pub fn last(&self) -> Option<&GameEvent> {
        self.events.last()
    }

    /// Events appended at or after sequence number `id`.
    pub fn since(&self, id: u64) -> impl Iterator<Item = &GameEvent> {
        self.events.iter().filter(move |e| e.id >= id)
    }

    /// Storyline: one description per event.
    #[must_use]
    pub fn storyline(&self) -> Vec<String> {
        self.events.iter().map(|e| e.description.clone()).collect()
    }

    /// Canonical binary encoding, used to compare logs across runs.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }
}
