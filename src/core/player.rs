//! Player identification and per-player data.
//!
//! ## PlayerId
//!
//! A match always has exactly two seats. `PlayerId(0)` is `player1`,
//! `PlayerId(1)` is `player2`.
//!
//! ## PlayerMap
//!
//! Fixed two-entry storage indexed by `PlayerId`.
//!
//! ## Player
//!
//! Life, mana, hand, decks, cemetery and site control for one seat.

use im::Vector;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use super::ids::{SiteId, UnitId};
use crate::cards::{CardKind, CardRef, Threshold};

/// Number of seats in a match.
pub const PLAYER_COUNT: usize = 2;

/// Player identifier, `0` or `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The first seat.
    pub const ONE: PlayerId = PlayerId(0);
    /// The second seat.
    pub const TWO: PlayerId = PlayerId(1);

    /// Create a new player ID.
    ///
    /// Panics if `id` is not a valid seat.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        assert!((id as usize) < PLAYER_COUNT, "Player id out of range");
        Self(id)
    }

    /// Get the raw player index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The other seat.
    #[must_use]
    pub const fn opponent(self) -> Self {
        Self(1 - self.0)
    }

    /// Iterate over both player IDs in seat order.
    ///
    /// ```
    /// use realm_sim::core::PlayerId;
    ///
    /// let players: Vec<_> = PlayerId::all().collect();
    /// assert_eq!(players, vec![PlayerId::ONE, PlayerId::TWO]);
    /// ```
    pub fn all() -> impl Iterator<Item = PlayerId> {
        (0..PLAYER_COUNT as u8).map(PlayerId)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player{}", self.0 + 1)
    }
}

/// Per-player data storage with O(1) access.
///
/// ## Example
///
/// ```
/// use realm_sim::core::{PlayerId, PlayerMap};
///
/// let mut life: PlayerMap<u32> = PlayerMap::new(|_| 20);
/// life[PlayerId::TWO] = 15;
/// assert_eq!(life[PlayerId::ONE], 20);
/// assert_eq!(life[PlayerId::TWO], 15);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: [T; PLAYER_COUNT],
}

impl<T> PlayerMap<T> {
    /// Create a new PlayerMap with values from a factory function.
    pub fn new(factory: impl Fn(PlayerId) -> T) -> Self {
        Self {
            data: [factory(PlayerId::ONE), factory(PlayerId::TWO)],
        }
    }

    /// Create a new PlayerMap with default values.
    pub fn with_default() -> Self
    where
        T: Default,
    {
        Self::new(|_| T::default())
    }

    /// Get a reference to a player's data.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> &T {
        &self.data[player.index()]
    }

    /// Get a mutable reference to a player's data.
    pub fn get_mut(&mut self, player: PlayerId) -> &mut T {
        &mut self.data[player.index()]
    }

    /// Iterate over (PlayerId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (PlayerId(i as u8), v))
    }
}

impl<T: Default> Default for PlayerMap<T> {
    fn default() -> Self {
        Self::with_default()
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        self.get(player)
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        self.get_mut(player)
    }
}

/// Which of a player's two decks a card comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckKind {
    /// Spell deck (minions, magic, artifacts).
    Spellbook,
    /// Site deck.
    Atlas,
}

impl std::fmt::Display for DeckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckKind::Spellbook => write!(f, "spellbook"),
            DeckKind::Atlas => write!(f, "atlas"),
        }
    }
}

/// A player's hand, split into spells and sites.
#[derive(Clone, Debug, Default)]
pub struct Hand {
    /// Minions, magic and artifacts.
    pub spells: Vector<CardRef>,
    /// Site cards.
    pub sites: Vector<CardRef>,
}

impl Hand {
    /// Total number of cards in hand.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spells.len() + self.sites.len()
    }

    /// Check if the hand holds no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spells.is_empty() && self.sites.is_empty()
    }

    /// Add a card to the bucket matching its kind.
    pub fn add(&mut self, card: CardRef) {
        if card.kind == CardKind::Site {
            self.sites.push_back(card);
        } else {
            self.spells.push_back(card);
        }
    }
}

/// One seat's full state.
///
/// Fields are read freely; mutation goes through `GameState` so that
/// life and mana stay clamped and the event log stays complete.
#[derive(Clone, Debug)]
pub struct Player {
    /// Seat identifier.
    pub id: PlayerId,
    /// Current life. The player loses at 0.
    pub life: u32,
    /// Life cap for healing.
    pub max_life: u32,
    /// Unspent mana this turn.
    pub mana: u32,
    /// The player's avatar unit.
    pub avatar: UnitId,
    /// Cards in hand.
    pub hand: Hand,
    /// Spell deck; the front is the next draw.
    pub spellbook: Vector<CardRef>,
    /// Site deck; the front is the next draw.
    pub atlas: Vector<CardRef>,
    /// Destroyed and resolved cards.
    pub cemetery: Vector<CardRef>,
    /// Sites this player controls, in the order they were played.
    pub controlled_sites: Vector<SiteId>,
    /// Element counts over controlled sites.
    pub affinity: Threshold,
    /// Sites played during the current turn.
    pub sites_played_this_turn: u32,
    /// Set when the player had to draw from an empty deck.
    pub decked_out: bool,
}

impl Player {
    /// Create a player with empty zones.
    #[must_use]
    pub fn new(id: PlayerId, life: u32, avatar: UnitId) -> Self {
        Self {
            id,
            life,
            max_life: life,
            mana: 0,
            avatar,
            hand: Hand::default(),
            spellbook: Vector::new(),
            atlas: Vector::new(),
            cemetery: Vector::new(),
            controlled_sites: Vector::new(),
            affinity: Threshold::default(),
            sites_played_this_turn: 0,
            decked_out: false,
        }
    }

    /// Get the deck of the given kind.
    #[must_use]
    pub fn deck(&self, kind: DeckKind) -> &Vector<CardRef> {
        match kind {
            DeckKind::Spellbook => &self.spellbook,
            DeckKind::Atlas => &self.atlas,
        }
    }

    /// Check if the player is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.life > 0
    }

    /// Check whether the player can pay for a card right now.
    #[must_use]
    pub fn can_afford(&self, cost: u32, threshold: &Threshold) -> bool {
        self.mana >= cost && self.affinity.meets(threshold)
    }
}
