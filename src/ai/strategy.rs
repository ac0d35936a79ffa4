//! AI strategy profiles.

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

/// Weights the AI uses to score positions and pick actions.
///
/// Named presets are plain constructors; a strategy is passed to each
/// `AIEngine` by value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Preset name, for logs and reports.
    pub name: String,

    /// 0.0 = purely defensive, 1.0 = all-in.
    /// Shifts life weighting from own life to opponent life and drives
    /// attack/block decisions.
    pub aggression: f64,

    /// Weight of the life totals.
    pub life_weight: f64,

    /// Weight of board power and life.
    pub board_weight: f64,

    /// Weight of cards in hand.
    pub hand_weight: f64,

    /// Weight of controlled sites.
    pub site_weight: f64,

    /// Weight of units closing in on the enemy avatar.
    pub proximity_weight: f64,

    /// Score margin an action must beat over passing.
    pub pass_threshold: f64,

    /// Sites to control before drawing from the spellbook.
    pub site_target: u32,

    /// Random noise added to action scores (0 = deterministic greedy).
    pub exploration: f64,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::midrange()
    }
}

impl Strategy {
    /// Fast pressure on the opponent's life.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            name: "aggressive".to_string(),
            aggression: 0.85,
            life_weight: 1.0,
            board_weight: 0.8,
            hand_weight: 0.2,
            site_weight: 1.2,
            proximity_weight: 0.6,
            pass_threshold: 0.05,
            site_target: 4,
            exploration: 0.0,
        }
    }

    /// Card advantage and removal first.
    #[must_use]
    pub fn control() -> Self {
        Self {
            name: "control".to_string(),
            aggression: 0.3,
            life_weight: 1.0,
            board_weight: 1.0,
            hand_weight: 0.6,
            site_weight: 1.5,
            proximity_weight: 0.1,
            pass_threshold: 0.1,
            site_target: 6,
            exploration: 0.0,
        }
    }

    /// Balanced.
    #[must_use]
    pub fn midrange() -> Self {
        Self {
            name: "midrange".to_string(),
            aggression: 0.5,
            life_weight: 1.0,
            board_weight: 1.0,
            hand_weight: 0.4,
            site_weight: 1.3,
            proximity_weight: 0.3,
            pass_threshold: 0.05,
            site_target: 5,
            exploration: 0.0,
        }
    }

    /// Protect the avatar and trade only when favourable.
    #[must_use]
    pub fn defensive() -> Self {
        Self {
            name: "defensive".to_string(),
            aggression: 0.15,
            life_weight: 1.5,
            board_weight: 1.2,
            hand_weight: 0.4,
            site_weight: 1.3,
            proximity_weight: 0.05,
            pass_threshold: 0.1,
            site_target: 5,
            exploration: 0.0,
        }
    }

    /// Look up a preset by name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "aggressive" | "aggro" => Ok(Self::aggressive()),
            "control" => Ok(Self::control()),
            "midrange" => Ok(Self::midrange()),
            "defensive" => Ok(Self::defensive()),
            _ => Err(ConfigError::UnknownStrategy(name.to_string())),
        }
    }

    /// Set the aggression weight, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_aggression(mut self, aggression: f64) -> Self {
        self.aggression = aggression.clamp(0.0, 1.0);
        self
    }

    /// Set score noise for exploration.
    #[must_use]
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration.max(0.0);
        self
    }

    /// Set the site target.
    #[must_use]
    pub fn with_site_target(mut self, target: u32) -> Self {
        self.site_target = target;
        self
    }

    /// Whether this profile holds units back to guard its avatar.
    #[must_use]
    pub fn guards_avatar(&self) -> bool {
        self.aggression < 0.35
    }
}
