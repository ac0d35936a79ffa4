//! Completed decklists and their validation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::card::{Card, CardKind, CardRef, Element};
use crate::core::Ruleset;

/// Reasons a decklist is not legal.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum DeckError {
    /// The avatar slot holds a non-avatar card.
    #[display("'{_0}' is not an avatar")]
    NotAnAvatar(String),
    /// The spellbook has the wrong number of cards.
    #[display("spellbook must hold {expected} cards, found {actual}")]
    SpellbookSize { expected: usize, actual: usize },
    /// The atlas has the wrong number of cards.
    #[display("atlas must hold {expected} cards, found {actual}")]
    AtlasSize { expected: usize, actual: usize },
    /// The spellbook holds a site or a second avatar.
    #[display("'{_0}' cannot be in the spellbook")]
    InvalidSpell(String),
    /// The atlas holds a non-site card.
    #[display("'{_0}' cannot be in the atlas")]
    InvalidSite(String),
    /// No site in the atlas provides an element a spell needs.
    #[display("'{card}' needs {element} but no site provides it")]
    MissingElement { card: String, element: Element },
    /// A catalog lookup failed while building the deck.
    #[display("unknown card '{_0}'")]
    UnknownCard(String),
}

impl std::error::Error for DeckError {}

/// A completed decklist: one avatar, a spellbook and an atlas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerDeck {
    pub avatar: CardRef,
    pub spells: Vec<CardRef>,
    pub sites: Vec<CardRef>,
}

impl PlayerDeck {
    /// Create a deck from owned cards.
    #[must_use]
    pub fn new(avatar: Card, spells: Vec<Card>, sites: Vec<Card>) -> Self {
        Self {
            avatar: Arc::new(avatar),
            spells: spells.into_iter().map(Arc::new).collect(),
            sites: sites.into_iter().map(Arc::new).collect(),
        }
    }

    /// Check deck legality against the ruleset.
    ///
    /// The first violation found is reported.
    pub fn validate(&self, ruleset: &Ruleset) -> Result<(), DeckError> {
        if self.avatar.kind != CardKind::Avatar {
            return Err(DeckError::NotAnAvatar(self.avatar.name.clone()));
        }
        if self.spells.len() != ruleset.spellbook_size {
            return Err(DeckError::SpellbookSize {
                expected: ruleset.spellbook_size,
                actual: self.spells.len(),
            });
        }
        if self.sites.len() != ruleset.atlas_size {
            return Err(DeckError::AtlasSize {
                expected: ruleset.atlas_size,
                actual: self.sites.len(),
            });
        }
        if let Some(card) = self
            .spells
            .iter()
            .find(|c| matches!(c.kind, CardKind::Site | CardKind::Avatar))
        {
            return Err(DeckError::InvalidSpell(card.name.clone()));
        }
        if let Some(card) = self.sites.iter().find(|c| c.kind != CardKind::Site) {
            return Err(DeckError::InvalidSite(card.name.clone()));
        }

        for card in &self.spells {
            for element in card.threshold.elements() {
                if !self.sites.iter().any(|site| site.has_element(element)) {
                    return Err(DeckError::MissingElement {
                        card: card.name.clone(),
                        element,
                    });
                }
            }
        }
        Ok(())
    }
}
