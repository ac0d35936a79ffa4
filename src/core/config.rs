//! Rules configuration.
//!
//! `Ruleset` carries every tunable rule constant the engine reads: board
//! size, life, opening hands, stacking and the empty-deck policy. Matches
//! receive it by value; nothing reads rule constants from globals.

use serde::{Deserialize, Serialize};

use super::PlayerId;
use crate::board::Position;

/// Configuration errors detected before a match starts.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigError {
    /// The turn limit must be positive.
    #[display("max_turns must be at least 1")]
    ZeroMaxTurns,
    /// The grid cannot hold both avatars apart.
    #[display("grid {rows}x{cols} is too small")]
    GridTooSmall { rows: u8, cols: u8 },
    /// At least one unit must fit in a region.
    #[display("stack_limit must be at least 1")]
    ZeroStackLimit,
    /// Strategy name did not match a preset.
    #[display("unknown strategy '{_0}'")]
    UnknownStrategy(String),
}

impl std::error::Error for ConfigError {}

/// What happens when a player must draw from an empty deck.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyDeckRule {
    /// The draw is skipped.
    #[default]
    Ignore,
    /// The player loses at the next terminal check.
    Lose,
}

/// Rule constants for one match.
///
/// ## Example
///
/// ```
/// use realm_sim::core::{EmptyDeckRule, Ruleset};
///
/// let rules = Ruleset::default()
///     .with_starting_life(10)
///     .with_empty_deck_rule(EmptyDeckRule::Lose);
/// assert_eq!(rules.starting_life, 10);
/// assert!(rules.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    /// Grid rows.
    pub rows: u8,
    /// Grid columns.
    pub cols: u8,
    /// Life each player starts with.
    pub starting_life: u32,
    /// Sites drawn into the opening hand.
    pub opening_sites: usize,
    /// Spells drawn into the opening hand.
    pub opening_spells: usize,
    /// Maximum units per region of one square.
    pub stack_limit: usize,
    /// Sites a player may play each turn.
    pub sites_per_turn: u32,
    /// Empty-deck draw policy.
    pub empty_deck: EmptyDeckRule,
    /// Main-phase action cap per turn.
    pub max_actions_per_turn: u32,
    /// Required spellbook size.
    pub spellbook_size: usize,
    /// Required atlas size.
    pub atlas_size: usize,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 5,
            starting_life: 20,
            opening_sites: 3,
            opening_spells: 3,
            stack_limit: 4,
            sites_per_turn: 1,
            empty_deck: EmptyDeckRule::Ignore,
            max_actions_per_turn: 40,
            spellbook_size: 50,
            atlas_size: 30,
        }
    }
}

impl Ruleset {
    /// Set starting life.
    #[must_use]
    pub fn with_starting_life(mut self, life: u32) -> Self {
        self.starting_life = life;
        self
    }

    /// Set the grid size.
    #[must_use]
    pub fn with_grid(mut self, rows: u8, cols: u8) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Set the per-region stacking limit.
    #[must_use]
    pub fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = limit;
        self
    }

    /// Set the empty-deck policy.
    #[must_use]
    pub fn with_empty_deck_rule(mut self, rule: EmptyDeckRule) -> Self {
        self.empty_deck = rule;
        self
    }

    /// Set required deck sizes.
    #[must_use]
    pub fn with_deck_sizes(mut self, spellbook: usize, atlas: usize) -> Self {
        self.spellbook_size = spellbook;
        self.atlas_size = atlas;
        self
    }

    /// Set the main-phase action cap.
    #[must_use]
    pub fn with_max_actions_per_turn(mut self, max: u32) -> Self {
        self.max_actions_per_turn = max;
        self
    }

    /// Check the ruleset for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < 2 || self.cols < 1 {
            return Err(ConfigError::GridTooSmall {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.stack_limit == 0 {
            return Err(ConfigError::ZeroStackLimit);
        }
        Ok(())
    }

    /// Square where a player's avatar starts.
    ///
    /// Player one starts on the bottom row, player two on the top row,
    /// both in the middle column.
    #[must_use]
    pub fn avatar_start(&self, player: PlayerId) -> Position {
        let col = self.cols / 2;
        if player == PlayerId::ONE {
            Position::new(self.rows - 1, col)
        } else {
            Position::new(0, col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ruleset() {
        let rules = Ruleset::default();
        assert_eq!((rules.rows, rules.cols), (4, 5));
        assert_eq!(rules.starting_life, 20);
        assert_eq!(rules.spellbook_size, 50);
        assert_eq!(rules.atlas_size, 30);
        assert_eq!(rules.empty_deck, EmptyDeckRule::Ignore);
    }

    #[test]
    fn test_avatar_start() {
        let rules = Ruleset::default();
        assert_eq!(rules.avatar_start(PlayerId::ONE), Position::new(3, 2));
        assert_eq!(rules.avatar_start(PlayerId::TWO), Position::new(0, 2));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(
            Ruleset::default().with_grid(1, 5).validate(),
            Err(ConfigError::GridTooSmall { rows: 1, cols: 5 })
        );
        assert_eq!(
            Ruleset::default().with_stack_limit(0).validate(),
            Err(ConfigError::ZeroStackLimit)
        );
    }

    #[test]
    fn test_ruleset_serde() {
        let rules = Ruleset::default().with_empty_deck_rule(EmptyDeckRule::Lose);
        let json = serde_json::to_string(&rules).unwrap();
        let back: Ruleset = serde_json::from_str(&json).unwrap();
        assert_eq!(rules, back);
    }
}
