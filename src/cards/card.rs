//! Canonical card values.
//!
//! `Card` is the one immutable template the simulation core reads. Loose
//! catalog shapes are converted at the boundary (see `adapter`), so nothing
//! below this module branches on which source field was present.
//!
//! Board state that changes during a match (damage, position, modifiers)
//! lives on `Unit`, never on the card.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Shared handle to an immutable card.
pub type CardRef = Arc<Card>;

/// Unique identifier for a card template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a new card ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Broad card category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// The player's identity unit.
    Avatar,
    /// A unit summoned onto the board.
    Minion,
    /// A one-shot spell resolved through the effect system.
    Magic,
    /// Equipment carried by a unit.
    Artifact,
    /// A board-placed card granting mana and terrain.
    Site,
}

impl CardKind {
    /// Parse a loose catalog type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "avatar" => Some(Self::Avatar),
            "minion" | "unit" | "creature" => Some(Self::Minion),
            "magic" | "spell" | "sorcery" | "instant" => Some(Self::Magic),
            "artifact" | "relic" | "equipment" => Some(Self::Artifact),
            "site" => Some(Self::Site),
            _ => None,
        }
    }
}

/// The four elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Air,
    Earth,
    Fire,
    Water,
}

impl Element {
    /// All elements in a fixed order.
    pub const ALL: [Element; 4] = [Element::Air, Element::Earth, Element::Fire, Element::Water];

    /// Parse an element name or its initial.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "air" | "a" => Some(Self::Air),
            "earth" | "e" => Some(Self::Earth),
            "fire" | "f" => Some(Self::Fire),
            "water" | "w" => Some(Self::Water),
            _ => None,
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Element::Air => "air",
            Element::Earth => "earth",
            Element::Fire => "fire",
            Element::Water => "water",
        };
        write!(f, "{name}")
    }
}

/// Per-element counts.
///
/// Used both as a card's threshold requirement and as a player's
/// elemental affinity from controlled sites.
///
/// ```
/// use realm_sim::cards::{Element, Threshold};
///
/// let requirement = Threshold::from_code("FF").unwrap();
/// let mut affinity = Threshold::default();
/// affinity.add(Element::Fire, 1);
/// assert!(!affinity.meets(&requirement));
/// affinity.add(Element::Fire, 1);
/// assert!(affinity.meets(&requirement));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Threshold {
    pub air: u32,
    pub earth: u32,
    pub fire: u32,
    pub water: u32,
}

impl Threshold {
    /// Parse a compact code such as `"AAW"` (one letter per point).
    ///
    /// Returns `None` on an unknown letter.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let mut threshold = Self::default();
        for ch in code.chars().filter(|c| !c.is_whitespace()) {
            let element = Element::from_name(&ch.to_string())?;
            threshold.add(element, 1);
        }
        Some(threshold)
    }

    /// Get the count for an element.
    #[must_use]
    pub fn get(&self, element: Element) -> u32 {
        match element {
            Element::Air => self.air,
            Element::Earth => self.earth,
            Element::Fire => self.fire,
            Element::Water => self.water,
        }
    }

    /// Add to the count for an element.
    pub fn add(&mut self, element: Element, amount: u32) {
        match element {
            Element::Air => self.air += amount,
            Element::Earth => self.earth += amount,
            Element::Fire => self.fire += amount,
            Element::Water => self.water += amount,
        }
    }

    /// Check that every element count reaches `requirement`.
    #[must_use]
    pub fn meets(&self, requirement: &Threshold) -> bool {
        Element::ALL
            .iter()
            .all(|&e| self.get(e) >= requirement.get(e))
    }

    /// Sum over all elements.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.air + self.earth + self.fire + self.water
    }

    /// Elements with a non-zero count.
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        Element::ALL.into_iter().filter(|&e| self.get(e) > 0)
    }
}

/// Card rarity. Carried for reporting only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Ordinary,
    Exceptional,
    Elite,
    Unique,
}

impl Rarity {
    /// Parse a loose catalog rarity name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ordinary" | "common" => Some(Self::Ordinary),
            "exceptional" | "uncommon" => Some(Self::Exceptional),
            "elite" | "rare" => Some(Self::Elite),
            "unique" | "mythic" => Some(Self::Unique),
            _ => None,
        }
    }
}

/// Movement and region keywords printed on a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keywords {
    /// Moves over blocking squares.
    pub airborne: bool,
    /// May occupy the underground region of land sites.
    pub burrowing: bool,
    /// May occupy the underwater region of water sites.
    pub submerge: bool,
    /// May enter and stand in the void.
    pub voidwalk: bool,
    /// May only occupy water sites.
    pub aquatic: bool,
    /// Extra movement budget from `Movement +N`.
    pub movement_bonus: u32,
}

impl Keywords {
    /// Extract keywords from rules text.
    ///
    /// Anything that is not a keyword is ignored here; effect text is
    /// handled by the spell parser.
    ///
    /// ```
    /// use realm_sim::cards::Keywords;
    ///
    /// let kw = Keywords::from_text("Airborne. Movement +1");
    /// assert!(kw.airborne);
    /// assert_eq!(kw.movement_bonus, 1);
    /// ```
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut keywords = Self::default();
        for clause in text.split(['.', ';', ',', '\n']) {
            let words: Vec<String> = clause
                .split_whitespace()
                .map(|w| w.to_ascii_lowercase())
                .collect();
            match words.as_slice() {
                [w] if w == "airborne" => keywords.airborne = true,
                [w] if w == "burrowing" => keywords.burrowing = true,
                [w] if w == "submerge" => keywords.submerge = true,
                [w] if w == "voidwalk" => keywords.voidwalk = true,
                [w] if w == "aquatic" => keywords.aquatic = true,
                [m, n] if m == "movement" => {
                    if let Ok(bonus) = n.trim_start_matches('+').parse::<u32>() {
                        keywords.movement_bonus += bonus;
                    }
                }
                _ => {}
            }
        }
        keywords
    }
}

/// Immutable card template.
///
/// ## Example
///
/// ```
/// use realm_sim::cards::{Card, CardId, CardKind};
///
/// let bolt = Card::magic(CardId::new(1), "Firebolt", 1, "Deal 3 damage to target unit.");
/// assert_eq!(bolt.kind, CardKind::Magic);
/// assert_eq!(bolt.cost, 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Template identifier.
    pub id: CardId,
    /// Display name.
    pub name: String,
    /// Category.
    pub kind: CardKind,
    /// Generic mana cost.
    pub cost: u32,
    /// Elemental requirement.
    pub threshold: Threshold,
    /// Elements the card belongs to (sites provide these as affinity).
    pub elements: SmallVec<[Element; 2]>,
    /// Base power. For artifacts, the power granted to the bearer.
    pub power: u32,
    /// Base life. For artifacts, the life granted to the bearer.
    pub life: u32,
    /// Base movement budget.
    pub movement: u32,
    /// Rules text.
    pub text: String,
    /// Rarity.
    pub rarity: Rarity,
    /// Keywords extracted from the text.
    pub keywords: Keywords,
}

impl Card {
    /// Create a card with zero stats and no text.
    #[must_use]
    pub fn new(id: CardId, name: impl Into<String>, kind: CardKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            cost: 0,
            threshold: Threshold::default(),
            elements: SmallVec::new(),
            power: 0,
            life: 0,
            movement: 1,
            text: String::new(),
            rarity: Rarity::default(),
            keywords: Keywords::default(),
        }
    }

    /// Create an avatar.
    #[must_use]
    pub fn avatar(id: CardId, name: impl Into<String>, power: u32, life: u32) -> Self {
        Self::new(id, name, CardKind::Avatar).with_stats(power, life)
    }

    /// Create a minion.
    #[must_use]
    pub fn minion(id: CardId, name: impl Into<String>, cost: u32, power: u32, life: u32) -> Self {
        Self::new(id, name, CardKind::Minion)
            .with_cost(cost)
            .with_stats(power, life)
    }

    /// Create a magic spell.
    #[must_use]
    pub fn magic(id: CardId, name: impl Into<String>, cost: u32, text: impl Into<String>) -> Self {
        Self::new(id, name, CardKind::Magic)
            .with_cost(cost)
            .with_text(text)
    }

    /// Create an artifact granting `power`/`life` to its bearer.
    #[must_use]
    pub fn artifact(id: CardId, name: impl Into<String>, cost: u32, power: u32, life: u32) -> Self {
        Self::new(id, name, CardKind::Artifact)
            .with_cost(cost)
            .with_stats(power, life)
    }

    /// Create a site.
    #[must_use]
    pub fn site(id: CardId, name: impl Into<String>) -> Self {
        Self::new(id, name, CardKind::Site)
    }

    /// Create a summoned token. Tokens share one template ID.
    #[must_use]
    pub fn token(name: impl Into<String>, power: u32, life: u32) -> Self {
        Self::new(CardId::new(u32::MAX), name, CardKind::Minion).with_stats(power, life)
    }

    /// Set the cost (builder pattern).
    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Set the threshold (builder pattern).
    #[must_use]
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        for element in threshold.elements() {
            if !self.elements.contains(&element) {
                self.elements.push(element);
            }
        }
        self.threshold = threshold;
        self
    }

    /// Add an element (builder pattern).
    #[must_use]
    pub fn with_element(mut self, element: Element) -> Self {
        if !self.elements.contains(&element) {
            self.elements.push(element);
        }
        self
    }

    /// Set power and life (builder pattern).
    #[must_use]
    pub fn with_stats(mut self, power: u32, life: u32) -> Self {
        self.power = power;
        self.life = life;
        self
    }

    /// Set base movement (builder pattern).
    #[must_use]
    pub fn with_movement(mut self, movement: u32) -> Self {
        self.movement = movement;
        self
    }

    /// Set the rules text and derive keywords from it (builder pattern).
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self.keywords = Keywords::from_text(&self.text);
        self
    }

    /// Set rarity (builder pattern).
    #[must_use]
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    /// Check whether the card has an element.
    #[must_use]
    pub fn has_element(&self, element: Element) -> bool {
        self.elements.contains(&element)
    }

    /// Check whether the card becomes a unit on the board.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        matches!(self.kind, CardKind::Avatar | CardKind::Minion)
    }

    /// Movement budget including keyword bonuses.
    #[must_use]
    pub fn movement_budget(&self) -> u32 {
        self.movement + self.keywords.movement_bonus
    }
}
