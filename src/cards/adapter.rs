//! Boundary adapter from loose catalog records to canonical `Card`s.
//!
//! Catalog exports disagree on field names (`cost` vs `mana_cost`,
//! `power` vs `attack`, `life` vs `defense`/`toughness`). `RawCard`
//! accepts every spelling, and `RawCard::into_card` settles them once so
//! the simulation only ever sees `Card`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::card::{Card, CardId, CardKind, Element, Keywords, Rarity, Threshold};

/// Reasons a catalog record cannot become a `Card`.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CardDataError {
    /// The record has an empty name.
    #[display("card record has no name")]
    MissingName,
    /// The type field did not name a known card kind.
    #[display("card '{name}' has unknown type '{kind}'")]
    UnknownKind { name: String, kind: String },
    /// An element or threshold letter was not recognised.
    #[display("card '{name}' has unknown element '{element}'")]
    UnknownElement { name: String, element: String },
}

impl std::error::Error for CardDataError {}

/// A catalog card record with every known field spelling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCard {
    pub name: String,
    #[serde(default, alias = "type", alias = "card_type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub cost: Option<u32>,
    #[serde(default)]
    pub mana_cost: Option<u32>,
    #[serde(default, alias = "attack")]
    pub power: Option<u32>,
    #[serde(default, alias = "defense", alias = "toughness", alias = "health")]
    pub life: Option<u32>,
    #[serde(default)]
    pub movement: Option<u32>,
    /// Compact threshold code, e.g. `"AAW"`.
    #[serde(default)]
    pub threshold: Option<String>,
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default, alias = "rules_text", alias = "description")]
    pub text: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
}

impl RawCard {
    /// Convert into a canonical card with the given template ID.
    ///
    /// `cost` wins over `mana_cost` when both are present. A missing type
    /// defaults to `Minion`. Units without a life value get 1 life.
    ///
    /// ```
    /// use realm_sim::cards::{CardId, CardKind, RawCard};
    ///
    /// let raw: RawCard = serde_json::from_str(
    ///     r#"{"name": "Ember", "type": "Minion", "mana_cost": 2, "attack": 3, "toughness": 1, "threshold": "F"}"#,
    /// ).unwrap();
    /// let card = raw.into_card(CardId::new(7)).unwrap();
    /// assert_eq!(card.kind, CardKind::Minion);
    /// assert_eq!((card.cost, card.power, card.life), (2, 3, 1));
    /// assert_eq!(card.threshold.fire, 1);
    /// ```
    pub fn into_card(self, id: CardId) -> Result<Card, CardDataError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CardDataError::MissingName);
        }

        let kind = match self.kind.as_deref() {
            None => CardKind::Minion,
            Some(raw) => CardKind::from_name(raw).ok_or_else(|| CardDataError::UnknownKind {
                name: name.clone(),
                kind: raw.to_string(),
            })?,
        };

        let threshold = match self.threshold.as_deref() {
            None => Threshold::default(),
            Some(code) => Threshold::from_code(code).ok_or_else(|| {
                CardDataError::UnknownElement {
                    name: name.clone(),
                    element: code.to_string(),
                }
            })?,
        };

        let mut elements: SmallVec<[Element; 2]> = SmallVec::new();
        for raw in &self.elements {
            let element =
                Element::from_name(raw).ok_or_else(|| CardDataError::UnknownElement {
                    name: name.clone(),
                    element: raw.clone(),
                })?;
            if !elements.contains(&element) {
                elements.push(element);
            }
        }

        let is_unit = matches!(kind, CardKind::Avatar | CardKind::Minion);
        let text = self.text.unwrap_or_default();

        let mut card = Card::new(id, name, kind)
            .with_cost(self.cost.or(self.mana_cost).unwrap_or(0))
            .with_stats(
                self.power.unwrap_or(0),
                self.life.unwrap_or(if is_unit { 1 } else { 0 }),
            )
            .with_threshold(threshold)
            .with_rarity(
                self.rarity
                    .as_deref()
                    .and_then(Rarity::from_name)
                    .unwrap_or_default(),
            );
        for element in elements {
            card = card.with_element(element);
        }
        if let Some(movement) = self.movement {
            card = card.with_movement(movement);
        }
        card.keywords = Keywords::from_text(&text);
        card.text = text;
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawCard {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_cost_spellings() {
        let a = raw(r#"{"name": "A", "cost": 3}"#).into_card(CardId::new(1)).unwrap();
        let b = raw(r#"{"name": "B", "mana_cost": 4}"#).into_card(CardId::new(2)).unwrap();
        let c = raw(r#"{"name": "C", "cost": 1, "mana_cost": 5}"#)
            .into_card(CardId::new(3))
            .unwrap();

        assert_eq!(a.cost, 3);
        assert_eq!(b.cost, 4);
        assert_eq!(c.cost, 1);
    }

    #[test]
    fn test_stat_aliases() {
        let card = raw(r#"{"name": "Knight", "card_type": "unit", "attack": 2, "defense": 4}"#)
            .into_card(CardId::new(1))
            .unwrap();
        assert_eq!(card.kind, CardKind::Minion);
        assert_eq!(card.power, 2);
        assert_eq!(card.life, 4);
    }

    #[test]
    fn test_site_elements_and_text() {
        let card = raw(r#"{"name": "Spring", "type": "Site", "elements": ["Water"], "rules_text": ""}"#)
            .into_card(CardId::new(1))
            .unwrap();
        assert_eq!(card.kind, CardKind::Site);
        assert!(card.has_element(Element::Water));
        assert_eq!(card.life, 0);
    }

    #[test]
    fn test_keywords_from_description() {
        let card = raw(r#"{"name": "Mole", "description": "Burrowing"}"#)
            .into_card(CardId::new(1))
            .unwrap();
        assert!(card.keywords.burrowing);
        assert_eq!(card.life, 1);
    }

    #[test]
    fn test_rejects_bad_records() {
        assert_eq!(
            raw(r#"{"name": "  "}"#).into_card(CardId::new(1)),
            Err(CardDataError::MissingName)
        );
        assert!(matches!(
            raw(r#"{"name": "X", "type": "Planeswalker"}"#).into_card(CardId::new(1)),
            Err(CardDataError::UnknownKind { .. })
        ));
        assert!(matches!(
            raw(r#"{"name": "X", "threshold": "FQ"}"#).into_card(CardId::new(1)),
            Err(CardDataError::UnknownElement { .. })
        ));
    }
}
