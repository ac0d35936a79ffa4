//! Unit movement: range, paths and atomic execution.
//!
//! ## Rules
//!
//! - Budget is the card's movement (default 1) plus `Movement +N`.
//! - Each step goes to an orthogonally adjacent square the unit may stand
//!   on; void squares are impassable unless the unit is an avatar or has
//!   `Voidwalk`.
//! - A square holding enemy units in the region the mover would use ends
//!   movement: it can be entered, not passed through. `Airborne` ignores
//!   this.
//! - The destination must have room under the stacking limit.
//! - A unit moves at most once per turn and never while tapped.
//!
//! `execute_movement` validates the whole path before touching the state.

use std::collections::VecDeque;
use tracing::debug;

use super::position::Position;
use super::region::{Region, RegionManager};
use crate::core::{EventKind, GameState, Unit, UnitId};

/// Why a move was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MovementError {
    #[display("{_0} is not on the board")]
    UnknownUnit(UnitId),
    #[display("{_0} is tapped")]
    Tapped(UnitId),
    #[display("{_0} has already moved this turn")]
    AlreadyMoved(UnitId),
    #[display("path is empty")]
    EmptyPath,
    #[display("path of {length} steps exceeds budget {budget}")]
    TooFar { length: usize, budget: u32 },
    #[display("{from} and {to} are not adjacent")]
    NotAdjacent { from: Position, to: Position },
    #[display("{_0} is impassable")]
    Impassable(Position),
    #[display("movement must stop at {_0}")]
    Blocked(Position),
    #[display("{_0} is full")]
    Full(Position),
}

impl std::error::Error for MovementError {}

/// Movement rules.
pub struct MovementEngine;

impl MovementEngine {
    /// Manhattan distance.
    #[must_use]
    pub fn get_distance(a: Position, b: Position) -> u32 {
        a.distance(b)
    }

    /// Orthogonal adjacency.
    #[must_use]
    pub fn are_adjacent(a: Position, b: Position) -> bool {
        a.is_adjacent(b)
    }

    /// Region the unit would use on `pos`: its current region if allowed
    /// there, otherwise the terrain's default for it.
    #[must_use]
    pub fn entry_region(state: &GameState, unit: &Unit, pos: Position) -> Option<Region> {
        if !state.grid().contains(pos) {
            return None;
        }
        let terrain = RegionManager::terrain_at(state, pos);
        if RegionManager::unit_can_occupy(unit, terrain, unit.region()) {
            return Some(unit.region());
        }
        RegionManager::default_region(&unit.card, unit.is_avatar, terrain)
    }

    /// Whether enemy units in `region` stop movement on `pos`.
    #[must_use]
    pub fn stops_movement(state: &GameState, unit: &Unit, pos: Position, region: Region) -> bool {
        if unit.card.keywords.airborne {
            return false;
        }
        state
            .grid()
            .occupants(pos)
            .iter()
            .filter_map(|&id| state.unit(id))
            .any(|other| other.owner != unit.owner && other.region() == region)
    }

    fn has_room(state: &GameState, unit: &Unit, pos: Position, region: Region) -> bool {
        if unit.position() == pos && unit.region() == region {
            return true;
        }
        RegionManager::has_capacity(state, pos, region)
    }

    /// Squares the unit could end a move on, row-major.
    ///
    /// Ignores the tapped and moved flags; `execute_movement` checks those.
    #[must_use]
    pub fn get_movement_range(state: &GameState, unit_id: UnitId) -> Vec<Position> {
        let Some(unit) = state.unit(unit_id) else {
            return Vec::new();
        };
        let mut reachable: Vec<Position> = Self::explore(state, unit)
            .into_iter()
            .filter(|&(pos, _)| pos != unit.position())
            .filter(|&(pos, _)| {
                Self::entry_region(state, unit, pos)
                    .is_some_and(|region| Self::has_room(state, unit, pos, region))
            })
            .map(|(pos, _)| pos)
            .collect();
        reachable.sort_unstable();
        reachable
    }

    /// Shortest legal path to `destination`, excluding the start square.
    #[must_use]
    pub fn calculate_movement_path(
        state: &GameState,
        unit_id: UnitId,
        destination: Position,
    ) -> Option<Vec<Position>> {
        let unit = state.unit(unit_id)?;
        let region = Self::entry_region(state, unit, destination)?;
        if destination == unit.position() || !Self::has_room(state, unit, destination, region) {
            return None;
        }

        let visited = Self::explore(state, unit);
        let mut path = vec![destination];
        let mut current = destination;
        while current != unit.position() {
            let &(_, parent) = visited.iter().find(|(p, _)| *p == current)?;
            current = parent?;
            if current != unit.position() {
                path.push(current);
            }
        }
        path.reverse();
        Some(path)
    }

    /// Breadth-first search within the budget. Returns each reached square
    /// with its predecessor, in discovery order.
    fn explore(state: &GameState, unit: &Unit) -> Vec<(Position, Option<Position>)> {
        let budget = unit.movement_budget();
        let start = unit.position();
        let mut visited: Vec<(Position, Option<Position>)> = vec![(start, None)];
        let mut queue = VecDeque::from([(start, 0u32)]);

        while let Some((pos, dist)) = queue.pop_front() {
            if dist == budget {
                continue;
            }
            for next in state.grid().neighbors(pos) {
                if visited.iter().any(|(p, _)| *p == next) {
                    continue;
                }
                let Some(region) = Self::entry_region(state, unit, next) else {
                    continue;
                };
                visited.push((next, Some(pos)));
                if !Self::stops_movement(state, unit, next, region) {
                    queue.push_back((next, dist + 1));
                }
            }
        }
        visited
    }

    /// Check a path step by step without mutating anything.
    ///
    /// Returns the region the unit ends in.
    pub fn validate_path(
        state: &GameState,
        unit_id: UnitId,
        path: &[Position],
    ) -> Result<Region, MovementError> {
        let unit = state.unit(unit_id).ok_or(MovementError::UnknownUnit(unit_id))?;
        if unit.is_tapped {
            return Err(MovementError::Tapped(unit_id));
        }
        if unit.has_moved {
            return Err(MovementError::AlreadyMoved(unit_id));
        }
        let (&destination, _) = path.split_last().ok_or(MovementError::EmptyPath)?;
        let budget = unit.movement_budget();
        if path.len() > budget as usize {
            return Err(MovementError::TooFar {
                length: path.len(),
                budget,
            });
        }

        let mut from = unit.position();
        let mut region = unit.region();
        for (i, &step) in path.iter().enumerate() {
            if !from.is_adjacent(step) {
                return Err(MovementError::NotAdjacent { from, to: step });
            }
            region = Self::entry_region(state, unit, step).ok_or(MovementError::Impassable(step))?;
            let last = i + 1 == path.len();
            if !last && Self::stops_movement(state, unit, step, region) {
                return Err(MovementError::Blocked(step));
            }
            from = step;
        }

        if !Self::has_room(state, unit, destination, region) {
            return Err(MovementError::Full(destination));
        }
        Ok(region)
    }

    /// Move a unit along a path. All-or-nothing.
    pub fn execute_movement(
        state: &mut GameState,
        unit_id: UnitId,
        path: &[Position],
    ) -> Result<Position, MovementError> {
        let region = Self::validate_path(state, unit_id, path)?;
        let destination = path[path.len() - 1];
        Self::finish_move(state, unit_id, destination, region);
        if let Some(unit) = state.unit_mut(unit_id) {
            unit.has_moved = true;
        }
        Ok(destination)
    }

    /// Put a unit directly on a square, ignoring budget and path.
    ///
    /// Used by move and teleport effects. The destination must still be
    /// enterable and have room.
    pub fn relocate(
        state: &mut GameState,
        unit_id: UnitId,
        destination: Position,
    ) -> Result<Position, MovementError> {
        let unit = state.unit(unit_id).ok_or(MovementError::UnknownUnit(unit_id))?;
        let region = Self::entry_region(state, unit, destination)
            .ok_or(MovementError::Impassable(destination))?;
        if !Self::has_room(state, unit, destination, region) {
            return Err(MovementError::Full(destination));
        }
        Self::finish_move(state, unit_id, destination, region);
        Ok(destination)
    }

    fn finish_move(state: &mut GameState, unit_id: UnitId, destination: Position, region: Region) {
        let Some(unit) = state.unit(unit_id) else {
            return;
        };
        let from = unit.position();
        let name = unit.card.name.clone();
        state.relocate_unit(unit_id, destination, region);
        state.emit(
            EventKind::UnitMoved {
                unit: unit_id,
                from,
                to: destination,
                region,
            },
            format!("{name} moves from {from} to {destination}"),
        );
        debug!(unit = %unit_id, %from, to = %destination, "unit moved");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::PositionSystem;
    use crate::cards::{Card, CardId, Element, PlayerDeck};
    use crate::core::{PlayerId, Ruleset};
    use std::sync::Arc;

    fn state() -> GameState {
        let deck = PlayerDeck::new(
            Card::avatar(CardId::new(0), "Avatar", 1, 20),
            vec![Card::minion(CardId::new(1), "Grunt", 0, 1, 1); 6],
            vec![Card::site(CardId::new(2), "Field").with_element(Element::Earth); 6],
        );
        GameState::new(Ruleset::default(), &deck, &deck, 9)
    }

    fn site() -> Arc<Card> {
        Arc::new(Card::site(CardId::new(2), "Field").with_element(Element::Earth))
    }

    /// Lay sites for player one along a list of squares.
    fn lay_sites(state: &mut GameState, squares: &[Position]) {
        for &pos in squares {
            state.player_mut(PlayerId::ONE).sites_played_this_turn = 0;
            PositionSystem::place_card(state, PlayerId::ONE, site(), pos, None).unwrap();
        }
    }

    fn summon(state: &mut GameState, card: Card, pos: Position) -> UnitId {
        match PositionSystem::place_card(state, PlayerId::ONE, Arc::new(card), pos, None).unwrap() {
            crate::board::Placement::Unit(id) => id,
            other => panic!("unexpected placement {other:?}"),
        }
    }

    #[test]
    fn test_distance_helpers() {
        assert_eq!(MovementEngine::get_distance(Position::new(0, 0), Position::new(2, 3)), 5);
        assert!(MovementEngine::are_adjacent(Position::new(1, 1), Position::new(1, 0)));
    }

    #[test]
    fn test_range_respects_void() {
        let mut state = state();
        lay_sites(&mut state, &[Position::new(3, 2), Position::new(2, 2)]);
        let grunt = summon(&mut state, Card::minion(CardId::new(1), "Grunt", 0, 1, 1), Position::new(3, 2));

        assert_eq!(
            MovementEngine::get_movement_range(&state, grunt),
            vec![Position::new(2, 2)]
        );
    }

    #[test]
    fn test_path_with_bonus_movement() {
        let mut state = state();
        lay_sites(
            &mut state,
            &[Position::new(3, 2), Position::new(2, 2), Position::new(1, 2)],
        );
        let scout = summon(
            &mut state,
            Card::minion(CardId::new(3), "Scout", 0, 1, 1).with_text("Movement +1"),
            Position::new(3, 2),
        );

        let path = MovementEngine::calculate_movement_path(&state, scout, Position::new(1, 2)).unwrap();
        assert_eq!(path, vec![Position::new(2, 2), Position::new(1, 2)]);

        MovementEngine::execute_movement(&mut state, scout, &path).unwrap();
        assert_eq!(state.unit(scout).unwrap().position(), Position::new(1, 2));
        assert!(state.unit(scout).unwrap().has_moved);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_illegal_step_moves_nothing() {
        let mut state = state();
        lay_sites(
            &mut state,
            &[Position::new(3, 2), Position::new(2, 2)],
        );
        let scout = summon(
            &mut state,
            Card::minion(CardId::new(3), "Scout", 0, 1, 1).with_text("Movement +1"),
            Position::new(3, 2),
        );
        let log_len = state.log().len();

        // (2, 2) is fine, (2, 1) is void.
        let err = MovementEngine::execute_movement(
            &mut state,
            scout,
            &[Position::new(2, 2), Position::new(2, 1)],
        );
        assert_eq!(err, Err(MovementError::Impassable(Position::new(2, 1))));
        assert_eq!(state.unit(scout).unwrap().position(), Position::new(3, 2));
        assert!(!state.unit(scout).unwrap().has_moved);
        assert_eq!(state.log().len(), log_len);
    }

    #[test]
    fn test_moves_once_per_turn() {
        let mut state = state();
        lay_sites(&mut state, &[Position::new(3, 2), Position::new(2, 2)]);
        let grunt = summon(&mut state, Card::minion(CardId::new(1), "Grunt", 0, 1, 1), Position::new(3, 2));

        MovementEngine::execute_movement(&mut state, grunt, &[Position::new(2, 2)]).unwrap();
        assert_eq!(
            MovementEngine::execute_movement(&mut state, grunt, &[Position::new(3, 2)]),
            Err(MovementError::AlreadyMoved(grunt))
        );
    }

    #[test]
    fn test_tapped_unit_cannot_move() {
        let mut state = state();
        lay_sites(&mut state, &[Position::new(3, 2), Position::new(2, 2)]);
        let grunt = summon(&mut state, Card::minion(CardId::new(1), "Grunt", 0, 1, 1), Position::new(3, 2));
        state.unit_mut(grunt).unwrap().is_tapped = true;
        assert_eq!(
            MovementEngine::validate_path(&state, grunt, &[Position::new(2, 2)]),
            Err(MovementError::Tapped(grunt))
        );
    }

    #[test]
    fn test_avatar_walks_through_void() {
        let mut state = state();
        let avatar = state.player(PlayerId::ONE).avatar;
        let range = MovementEngine::get_movement_range(&state, avatar);
        assert_eq!(
            range,
            vec![Position::new(2, 2), Position::new(3, 1), Position::new(3, 3)]
        );
        MovementEngine::execute_movement(&mut state, avatar, &[Position::new(2, 2)]).unwrap();
        assert_eq!(state.unit(avatar).unwrap().region(), Region::Void);
    }

    #[test]
    fn test_too_far() {
        let mut state = state();
        let avatar = state.player(PlayerId::ONE).avatar;
        assert_eq!(
            MovementEngine::validate_path(&state, avatar, &[Position::new(2, 2), Position::new(1, 2)]),
            Err(MovementError::TooFar { length: 2, budget: 1 })
        );
    }

    #[test]
    fn test_enemy_square_stops_movement() {
        let mut state = state();
        let enemy = state.player(PlayerId::TWO).avatar;
        // Bring the enemy avatar next to player one's avatar through the void.
        state.relocate_unit(enemy, Position::new(2, 2), Region::Void);

        let avatar = state.player(PlayerId::ONE).avatar;
        let mut boosted = (*state.unit(avatar).unwrap().card).clone();
        boosted.keywords.movement_bonus = 1;
        let unit = state.unit_mut(avatar).unwrap();
        unit.card = Arc::new(boosted);

        assert_eq!(
            MovementEngine::validate_path(&state, avatar, &[Position::new(2, 2), Position::new(1, 2)]),
            Err(MovementError::Blocked(Position::new(2, 2)))
        );
        assert!(MovementEngine::validate_path(&state, avatar, &[Position::new(2, 2)]).is_ok());
    }
}
