//! Spell effect AST.
//!
//! `SpellParser` turns card text into an ordered list of `SpellEffect`s;
//! `SpellEffectSystem` executes them. The AST is plain data: it carries no
//! references into a game state and can be cached per card.
//!
//! ## Shape
//!
//! Each effect has a type, target specifications, typed parameters and
//! gating conditions. Parameters unused by a type stay at their defaults.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::Element;
use crate::core::DeckKind;

/// Target count meaning "every legal target".
pub const ALL_TARGETS: u32 = 99;

/// Effect category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Damage,
    Heal,
    Draw,
    Summon,
    Modify,
    Move,
    Destroy,
    Counter,
    Search,
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EffectType::Damage => "damage",
            EffectType::Heal => "heal",
            EffectType::Draw => "draw",
            EffectType::Summon => "summon",
            EffectType::Modify => "modify",
            EffectType::Move => "move",
            EffectType::Destroy => "destroy",
            EffectType::Counter => "counter",
            EffectType::Search => "search",
        };
        f.write_str(name)
    }
}

/// What a target specification selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Unit,
    Player,
    Position,
    Card,
}

/// A filter on legal targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Restriction {
    /// Controlled by an opponent of the caster.
    Opponent,
    /// Controlled by the caster.
    Friendly,
    /// Card has this element.
    Element(Element),
    /// Power at most N.
    PowerAtMost(u32),
    /// Power at least N.
    PowerAtLeast(u32),
    /// Not an avatar.
    NonAvatar,
}

/// Which and how many targets an effect takes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpecification {
    pub kind: TargetKind,
    /// Number of targets; `ALL_TARGETS` means every legal one.
    pub count: u32,
    pub restrictions: SmallVec<[Restriction; 2]>,
    pub optional: bool,
}

impl TargetSpecification {
    /// A single required target.
    #[must_use]
    pub fn single(kind: TargetKind) -> Self {
        Self {
            kind,
            count: 1,
            restrictions: SmallVec::new(),
            optional: false,
        }
    }

    /// Every legal target of a kind.
    #[must_use]
    pub fn all(kind: TargetKind) -> Self {
        Self {
            count: ALL_TARGETS,
            ..Self::single(kind)
        }
    }

    /// Add a restriction (builder pattern).
    #[must_use]
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        if !self.restrictions.contains(&restriction) {
            self.restrictions.push(restriction);
        }
        self
    }

    /// Check whether this target specification selects every legal target.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.count >= ALL_TARGETS
    }
}

/// A property a condition reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionProperty {
    ControlledSites,
    UnitCount,
    Life,
    HandSize,
    Affinity(Element),
}

/// Comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    AtLeast,
    AtMost,
    Equal,
}

impl Comparison {
    /// Apply the comparison.
    #[must_use]
    pub fn compare(self, actual: u32, expected: u32) -> bool {
        match self {
            Comparison::AtLeast => actual >= expected,
            Comparison::AtMost => actual <= expected,
            Comparison::Equal => actual == expected,
        }
    }
}

/// Whose state a condition reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionTarget {
    Caster,
    Opponent,
}

/// A gate on effect execution, e.g. "if you control 3 or more sites".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionCheck {
    pub property: ConditionProperty,
    pub operator: Comparison,
    pub value: u32,
    pub target: ConditionTarget,
}

impl std::fmt::Display for ConditionCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let who = match self.target {
            ConditionTarget::Caster => "caster",
            ConditionTarget::Opponent => "opponent",
        };
        let op = match self.operator {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
            Comparison::Equal => "==",
        };
        write!(f, "{who} {:?} {op} {}", self.property, self.value)
    }
}

/// How long a stat modifier lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Duration {
    /// Until the end of the current turn.
    Turn,
    Permanent,
    /// While the condition holds; re-checked at end of turn.
    Conditional(ConditionCheck),
}

/// What a search effect looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchFilter {
    Any,
    Site,
    Unit,
    Element(Element),
}

/// Typed effect parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectParameters {
    /// Damage, healing, cards drawn, or tokens summoned.
    pub amount: Option<u32>,
    pub token_name: Option<String>,
    pub token_power: Option<u32>,
    pub token_life: Option<u32>,
    pub power_bonus: i32,
    pub life_bonus: i32,
    /// Prevention granted by a modify effect.
    pub prevent: u32,
    pub duration: Option<Duration>,
    /// Deck read by draw and search effects.
    pub deck: Option<DeckKind>,
    pub search: Option<SearchFilter>,
}

/// One executable effect.
///
/// ## Example
///
/// ```
/// use realm_sim::effects::{EffectType, SpellParser, TargetKind};
///
/// let effects = SpellParser::parse("Deal 3 damage to target unit.");
/// assert_eq!(effects.len(), 1);
/// assert_eq!(effects[0].effect_type, EffectType::Damage);
/// assert_eq!(effects[0].parameters.amount, Some(3));
/// assert_eq!(effects[0].targets[0].kind, TargetKind::Unit);
/// assert_eq!(effects[0].targets[0].count, 1);
/// assert!(effects[0].conditions.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEffect {
    pub effect_type: EffectType,
    pub targets: Vec<TargetSpecification>,
    pub parameters: EffectParameters,
    pub conditions: Vec<ConditionCheck>,
}

impl SpellEffect {
    /// Create an effect with no targets, parameters or conditions.
    #[must_use]
    pub fn new(effect_type: EffectType) -> Self {
        Self {
            effect_type,
            targets: Vec::new(),
            parameters: EffectParameters::default(),
            conditions: Vec::new(),
        }
    }

    /// Add a target specification (builder pattern).
    #[must_use]
    pub fn with_target(mut self, target: TargetSpecification) -> Self {
        self.targets.push(target);
        self
    }

    /// Set the amount parameter (builder pattern).
    #[must_use]
    pub fn with_amount(mut self, amount: u32) -> Self {
        self.parameters.amount = Some(amount);
        self
    }

    /// Amount parameter, defaulting to 1.
    #[must_use]
    pub fn amount(&self) -> u32 {
        self.parameters.amount.unwrap_or(1)
    }

    /// Number of targets the caster has to supply.
    #[must_use]
    pub fn chosen_target_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| !t.is_all())
            .map(|t| t.count as usize)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_spec_builders() {
        let spec = TargetSpecification::all(TargetKind::Unit)
            .with_restriction(Restriction::Opponent)
            .with_restriction(Restriction::Opponent);
        assert!(spec.is_all());
        assert_eq!(spec.restrictions.len(), 1);
        assert!(!TargetSpecification::single(TargetKind::Player).is_all());
    }

    #[test]
    fn test_comparison() {
        assert!(Comparison::AtLeast.compare(3, 3));
        assert!(!Comparison::AtLeast.compare(2, 3));
        assert!(Comparison::AtMost.compare(2, 3));
        assert!(Comparison::Equal.compare(4, 4));
    }

    #[test]
    fn test_chosen_target_count() {
        let effect = SpellEffect::new(EffectType::Damage)
            .with_target(TargetSpecification::single(TargetKind::Unit))
            .with_target(TargetSpecification::all(TargetKind::Player));
        assert_eq!(effect.chosen_target_count(), 1);
        assert_eq!(effect.amount(), 1);
    }

    #[test]
    fn test_effect_json() {
        let effect = SpellEffect::new(EffectType::Draw).with_amount(2);
        let json = serde_json::to_string(&effect).unwrap();
        let back: SpellEffect = serde_json::from_str(&json).unwrap();
        assert_eq!(effect, back);
    }
}
