//! Card catalog keyed by ID and name.
//!
//! The registry is the adapter's output side: raw catalog records go in,
//! shared `CardRef`s come out, and decklists written as card names are
//! resolved against it.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::adapter::{CardDataError, RawCard};
use super::card::{Card, CardId, CardRef};
use super::deck::{DeckError, PlayerDeck};

/// Catalog of canonical cards.
///
/// ## Example
///
/// ```
/// use realm_sim::cards::{Card, CardId, CardRegistry};
///
/// let mut registry = CardRegistry::new();
/// registry.register(Card::minion(CardId::new(1), "Squire", 1, 1, 1));
///
/// assert_eq!(registry.by_name("squire").unwrap().id, CardId::new(1));
/// ```
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: FxHashMap<CardId, CardRef>,
    names: FxHashMap<String, CardId>,
    next_id: u32,
}

impl CardRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from catalog records, assigning IDs in order.
    pub fn from_raw(records: impl IntoIterator<Item = RawCard>) -> Result<Self, CardDataError> {
        let mut registry = Self::new();
        for record in records {
            let id = CardId::new(registry.next_id);
            registry.register(record.into_card(id)?);
        }
        Ok(registry)
    }

    /// Register a card, replacing any card with the same ID.
    pub fn register(&mut self, card: Card) -> CardRef {
        let id = card.id;
        self.next_id = self.next_id.max(id.raw().saturating_add(1));
        self.names.insert(card.name.to_ascii_lowercase(), id);
        let card = Arc::new(card);
        self.cards.insert(id, Arc::clone(&card));
        card
    }

    /// Get a card by ID.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&CardRef> {
        self.cards.get(&id)
    }

    /// Get a card by case-insensitive name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&CardRef> {
        self.names
            .get(&name.trim().to_ascii_lowercase())
            .and_then(|id| self.cards.get(id))
    }

    /// Get the number of registered cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Resolve a decklist given as `(name, copies)` entries.
    ///
    /// The result is not validated; call `PlayerDeck::validate`.
    pub fn build_deck(
        &self,
        avatar: &str,
        spells: &[(&str, usize)],
        sites: &[(&str, usize)],
    ) -> Result<PlayerDeck, DeckError> {
        let lookup = |name: &str| {
            self.by_name(name)
                .cloned()
                .ok_or_else(|| DeckError::UnknownCard(name.to_string()))
        };
        let expand = |entries: &[(&str, usize)]| -> Result<Vec<CardRef>, DeckError> {
            let mut cards = Vec::new();
            for &(name, copies) in entries {
                let card = lookup(name)?;
                cards.extend(std::iter::repeat(card).take(copies));
            }
            Ok(cards)
        };

        Ok(PlayerDeck {
            avatar: lookup(avatar)?,
            spells: expand(spells)?,
            sites: expand(sites)?,
        })
    }
}
