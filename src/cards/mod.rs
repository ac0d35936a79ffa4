//! Card system: canonical cards, catalog adapter, registry and decks.
//!
//! ## Key Types
//!
//! - `Card`: Immutable card template shared as `CardRef`
//! - `Threshold` / `Element`: Elemental requirements and affinity
//! - `Keywords`: Movement and region keywords parsed from text
//! - `RawCard`: Loose catalog record, converted once at the boundary
//! - `CardRegistry`: Lookup by ID and name
//! - `PlayerDeck`: Avatar + spellbook + atlas, validated before a match

pub mod adapter;
pub mod card;
pub mod deck;
pub mod registry;

pub use adapter::{CardDataError, RawCard};
pub use card::{Card, CardId, CardKind, CardRef, Element, Keywords, Rarity, Threshold};
pub use deck::{DeckError, PlayerDeck};
pub use registry::CardRegistry;
