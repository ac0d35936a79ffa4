//! Per-match telemetry.

use serde::{Deserialize, Serialize};

use crate::core::PlayerMap;

/// Counters collected while a match runs.
///
/// Counters are updated whether or not the event log is recording.
/// `final_life` and `final_board` are filled when the match ends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatistics {
    /// Non-pass actions applied.
    pub total_actions: u32,
    /// Combat damage steps resolved.
    pub combat_resolutions: u32,
    pub spells_cast: u32,
    pub units_played: u32,
    pub sites_played: u32,
    /// Spells that failed a condition or found no targets.
    pub spells_fizzled: u32,
    /// Damage dealt by each player.
    pub damage_dealt: PlayerMap<u32>,
    /// Units each player lost.
    pub units_destroyed: PlayerMap<u32>,
    /// Card-text clauses the parser could not read.
    pub unparsed_clauses: u32,
    pub final_life: PlayerMap<u32>,
    /// Units on the board at the end, avatars included.
    pub final_board: PlayerMap<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;

    #[test]
    fn test_default_is_zeroed() {
        let stats = MatchStatistics::default();
        assert_eq!(stats.total_actions, 0);
        assert_eq!(stats.damage_dealt[PlayerId::ONE], 0);
        assert_eq!(stats.final_board[PlayerId::TWO], 0);
    }

    #[test]
    fn test_serialization() {
        let mut stats = MatchStatistics::default();
        stats.spells_cast = 3;
        stats.damage_dealt[PlayerId::TWO] = 7;
        let json = serde_json::to_string(&stats).unwrap();
        let back: MatchStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, back);
    }
}
