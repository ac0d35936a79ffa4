//! Placement legality and placement of sites, units and artifacts.
//!
//! ## Rules
//!
//! - **Sites** go on a square without a site. A player's first site goes on
//!   their avatar's square; later ones must be orthogonally adjacent to a
//!   site they control. `Ruleset::sites_per_turn` caps plays per turn.
//! - **Units** enter on a square holding a site their controller owns, in a
//!   region they may occupy, within the stacking limit.
//! - **Artifacts** attach to a friendly unit and grant their printed
//!   power and life to it.
//!
//! Every `place_*` method validates first and leaves the state untouched on
//! rejection.

use std::sync::Arc;
use tracing::debug;

use super::position::Position;
use super::region::{Region, RegionManager};
use crate::cards::{Card, CardKind, CardRef};
use crate::core::{
    ArtifactId, EventKind, GameState, Modifier, ModifierKind, ModifierSource, PlayerId, Site,
    SiteId, UnitId,
};
use crate::effects::Duration;

/// Why a placement was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum PlacementError {
    #[display("{_0} is off the grid")]
    OutOfBounds(Position),
    #[display("'{_0}' cannot be placed this way")]
    WrongKind(String),
    #[display("{_0} already holds a site")]
    SquareOccupied(Position),
    #[display("first site must go on the avatar's square {_0}")]
    NotOnAvatarSquare(Position),
    #[display("{_0} is not adjacent to a controlled site")]
    NotAdjacent(Position),
    #[display("site limit for this turn reached")]
    SiteLimitReached,
    #[display("{_0} has no site controlled by the player")]
    NoControlledSite(Position),
    #[display("unit cannot occupy {region} at {position}")]
    RegionNotAllowed { position: Position, region: Region },
    #[display("{region} at {position} is full")]
    StackFull { position: Position, region: Region },
    #[display("{_0} is not a friendly unit")]
    InvalidBearer(UnitId),
}

impl std::error::Error for PlacementError {}

/// What a successful placement created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Site(SiteId),
    Unit(UnitId),
    Artifact(ArtifactId),
}

/// Placement rules.
pub struct PositionSystem;

impl PositionSystem {
    /// Check whether a card may go on a square.
    ///
    /// For units, returns the region the unit would enter (`region` if
    /// given, otherwise the terrain's default). Sites always report
    /// `Region::Surface`.
    pub fn validate_placement(
        state: &GameState,
        player: PlayerId,
        card: &Card,
        position: Position,
        region: Option<Region>,
    ) -> Result<Region, PlacementError> {
        if !state.grid().contains(position) {
            return Err(PlacementError::OutOfBounds(position));
        }
        match card.kind {
            CardKind::Site => Self::validate_site(state, player, position).map(|()| Region::Surface),
            CardKind::Minion => Self::validate_unit(state, player, card, position, region),
            _ => Err(PlacementError::WrongKind(card.name.clone())),
        }
    }

    fn validate_site(state: &GameState, player: PlayerId, position: Position) -> Result<(), PlacementError> {
        let seat = state.player(player);
        if seat.sites_played_this_turn >= state.ruleset().sites_per_turn {
            return Err(PlacementError::SiteLimitReached);
        }
        if state.site_at(position).is_some() {
            return Err(PlacementError::SquareOccupied(position));
        }
        if seat.controlled_sites.is_empty() {
            let avatar_square = state.avatar(player).map(|a| a.position());
            if avatar_square != Some(position) {
                return Err(PlacementError::NotOnAvatarSquare(position));
            }
            return Ok(());
        }
        let adjacent = seat
            .controlled_sites
            .iter()
            .filter_map(|&id| state.site(id))
            .any(|site| site.position.is_adjacent(position));
        if adjacent {
            Ok(())
        } else {
            Err(PlacementError::NotAdjacent(position))
        }
    }

    fn validate_unit(
        state: &GameState,
        player: PlayerId,
        card: &Card,
        position: Position,
        region: Option<Region>,
    ) -> Result<Region, PlacementError> {
        if state.site_at(position).map(|s| s.owner) != Some(player) {
            return Err(PlacementError::NoControlledSite(position));
        }
        let terrain = RegionManager::terrain_at(state, position);
        let region = match region {
            Some(r) => r,
            None => RegionManager::default_region(card, false, terrain).ok_or(
                PlacementError::RegionNotAllowed {
                    position,
                    region: Region::Surface,
                },
            )?,
        };
        if !RegionManager::can_occupy(card, false, terrain, region) {
            return Err(PlacementError::RegionNotAllowed { position, region });
        }
        if !RegionManager::has_capacity(state, position, region) {
            return Err(PlacementError::StackFull { position, region });
        }
        Ok(region)
    }

    /// Check whether a card may go on a square in its default region.
    #[must_use]
    pub fn can_place_card(state: &GameState, player: PlayerId, card: &Card, position: Position) -> bool {
        Self::validate_placement(state, player, card, position, None).is_ok()
    }

    /// Place a site or minion.
    ///
    /// Playing a site adds one mana immediately and resolves region
    /// conflicts on its square.
    pub fn place_card(
        state: &mut GameState,
        player: PlayerId,
        card: CardRef,
        position: Position,
        region: Option<Region>,
    ) -> Result<Placement, PlacementError> {
        let region = Self::validate_placement(state, player, &card, position, region)?;

        if card.kind == CardKind::Site {
            let name = card.name.clone();
            let id = state.add_site(player, card, position);
            let seat = state.player_mut(player);
            seat.sites_played_this_turn += 1;
            seat.mana += 1;
            state.stats.sites_played += 1;
            state.emit(
                EventKind::SitePlayed {
                    player,
                    site: id,
                    card: name.clone(),
                    position,
                },
                format!("{player} plays {name} at {position}"),
            );
            RegionManager::resolve_conflicts(state, position);
            debug!(%player, site = %id, %position, "site placed");
            return Ok(Placement::Site(id));
        }

        let id = Self::spawn(state, player, card, position, region, false);
        state.stats.units_played += 1;
        Ok(Placement::Unit(id))
    }

    /// Summon a token unit. Tokens follow unit placement rules.
    pub fn place_token(
        state: &mut GameState,
        player: PlayerId,
        card: Card,
        position: Position,
    ) -> Result<UnitId, PlacementError> {
        let region = Self::validate_placement(state, player, &card, position, None)?;
        Ok(Self::spawn(state, player, Arc::new(card), position, region, true))
    }

    fn spawn(
        state: &mut GameState,
        player: PlayerId,
        card: CardRef,
        position: Position,
        region: Region,
        is_token: bool,
    ) -> UnitId {
        let name = card.name.clone();
        let id = state.insert_unit(player, card, position, region);
        if let Some(unit) = state.unit_mut(id) {
            unit.is_token = is_token;
        }
        state.emit(
            EventKind::UnitSummoned {
                player,
                unit: id,
                card: name.clone(),
                position,
                region,
            },
            format!("{player} summons {name} at {position} ({region})"),
        );
        id
    }

    /// Attach an artifact to a friendly unit.
    pub fn attach_artifact(
        state: &mut GameState,
        player: PlayerId,
        card: CardRef,
        bearer: UnitId,
    ) -> Result<ArtifactId, PlacementError> {
        if card.kind != CardKind::Artifact {
            return Err(PlacementError::WrongKind(card.name.clone()));
        }
        if state.unit(bearer).map(|u| u.owner) != Some(player) {
            return Err(PlacementError::InvalidBearer(bearer));
        }

        let name = card.name.clone();
        let (power, life) = (card.power, card.life);
        let id = state
            .add_artifact(player, card, bearer)
            .ok_or(PlacementError::InvalidBearer(bearer))?;

        if let Some(unit) = state.unit_mut(bearer) {
            for (kind, value) in [(ModifierKind::Power, power), (ModifierKind::Life, life)] {
                if value > 0 {
                    unit.modifiers.push(Modifier {
                        kind,
                        value: value as i32,
                        source: ModifierSource::Artifact(id),
                        duration: Duration::Permanent,
                        controller: player,
                    });
                }
            }
        }
        state.emit(
            EventKind::ArtifactAttached {
                player,
                artifact: id,
                bearer,
                card: name.clone(),
            },
            format!("{player} equips {bearer} with {name}"),
        );
        Ok(id)
    }

    /// Remove a site and resolve the resulting region conflicts.
    pub fn remove_site(state: &mut GameState, site: SiteId) -> Option<Site> {
        let removed = state.remove_site(site)?;
        RegionManager::resolve_conflicts(state, removed.position);
        Some(removed)
    }

    /// Positions of a player's sites, in play order.
    #[must_use]
    pub fn site_positions(state: &GameState, player: PlayerId) -> Vec<Position> {
        state
            .player(player)
            .controlled_sites
            .iter()
            .filter_map(|&id| state.site(id))
            .map(|s| s.position)
            .collect()
    }

    /// Every square where a site card could be played now, row-major.
    #[must_use]
    pub fn legal_site_positions(state: &GameState, player: PlayerId) -> Vec<Position> {
        state
            .grid()
            .positions()
            .filter(|&p| Self::validate_site(state, player, p).is_ok())
            .collect()
    }

    /// Every square where a unit card could enter now, row-major.
    #[must_use]
    pub fn legal_unit_positions(state: &GameState, player: PlayerId, card: &Card) -> Vec<(Position, Region)> {
        Self::site_positions(state, player)
            .into_iter()
            .filter_map(|p| {
                Self::validate_unit(state, player, card, p, None)
                    .ok()
                    .map(|r| (p, r))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardId, Element, PlayerDeck};
    use crate::core::Ruleset;

    fn state() -> GameState {
        let deck = PlayerDeck::new(
            Card::avatar(CardId::new(0), "Avatar", 1, 20),
            vec![Card::minion(CardId::new(1), "Grunt", 0, 1, 1); 6],
            vec![Card::site(CardId::new(2), "Field").with_element(Element::Earth); 6],
        );
        GameState::new(Ruleset::default(), &deck, &deck, 5)
    }

    fn site_card() -> CardRef {
        Arc::new(Card::site(CardId::new(2), "Field").with_element(Element::Earth))
    }

    fn grunt() -> CardRef {
        Arc::new(Card::minion(CardId::new(1), "Grunt", 0, 1, 1))
    }

    #[test]
    fn test_first_site_on_avatar_square() {
        let mut state = state();
        let off = PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(2, 2), None);
        assert_eq!(off, Err(PlacementError::NotOnAvatarSquare(Position::new(2, 2))));

        let placed = PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(3, 2), None);
        assert!(matches!(placed, Ok(Placement::Site(_))));
        assert_eq!(state.player(PlayerId::ONE).mana, 1);
    }

    #[test]
    fn test_site_moves_avatar_out_of_void() {
        let mut state = state();
        PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(3, 2), None).unwrap();
        assert_eq!(state.avatar(PlayerId::ONE).unwrap().region(), Region::Surface);
        assert!(state
            .log()
            .iter()
            .any(|e| matches!(e.kind, EventKind::RegionConflict { .. })));
    }

    #[test]
    fn test_one_site_per_turn_and_adjacency() {
        let mut state = state();
        PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(3, 2), None).unwrap();
        assert_eq!(
            PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(2, 2), None),
            Err(PlacementError::SiteLimitReached)
        );

        state.player_mut(PlayerId::ONE).sites_played_this_turn = 0;
        assert_eq!(
            PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(1, 0), None),
            Err(PlacementError::NotAdjacent(Position::new(1, 0)))
        );
        assert!(PositionSystem::can_place_card(&state, PlayerId::ONE, &site_card(), Position::new(2, 2)));
    }

    #[test]
    fn test_unit_needs_controlled_site() {
        let mut state = state();
        let before = state.units().count();
        let err = PositionSystem::place_card(&mut state, PlayerId::ONE, grunt(), Position::new(3, 2), None);
        assert_eq!(err, Err(PlacementError::NoControlledSite(Position::new(3, 2))));
        assert_eq!(state.units().count(), before);

        PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(3, 2), None).unwrap();
        let placed = PositionSystem::place_card(&mut state, PlayerId::ONE, grunt(), Position::new(3, 2), None);
        assert!(matches!(placed, Ok(Placement::Unit(_))));
        assert_eq!(state.statistics().units_played, 1);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_stack_limit() {
        let mut state = state();
        PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(3, 2), None).unwrap();
        // The avatar already stands on the surface here.
        for _ in 0..3 {
            PositionSystem::place_card(&mut state, PlayerId::ONE, grunt(), Position::new(3, 2), None).unwrap();
        }
        assert_eq!(
            PositionSystem::place_card(&mut state, PlayerId::ONE, grunt(), Position::new(3, 2), None),
            Err(PlacementError::StackFull {
                position: Position::new(3, 2),
                region: Region::Surface
            })
        );
    }

    #[test]
    fn test_burrowing_unit_underground() {
        let mut state = state();
        PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(3, 2), None).unwrap();
        let mole = Arc::new(Card::minion(CardId::new(5), "Mole", 1, 1, 1).with_text("Burrowing"));
        let placed = PositionSystem::place_card(
            &mut state,
            PlayerId::ONE,
            mole,
            Position::new(3, 2),
            Some(Region::Underground),
        );
        let Ok(Placement::Unit(id)) = placed else {
            panic!("expected unit placement");
        };
        assert_eq!(state.unit(id).unwrap().region(), Region::Underground);

        let err = PositionSystem::place_card(
            &mut state,
            PlayerId::ONE,
            grunt(),
            Position::new(3, 2),
            Some(Region::Underground),
        );
        assert!(matches!(err, Err(PlacementError::RegionNotAllowed { .. })));
    }

    #[test]
    fn test_artifact_grants_stats() {
        let mut state = state();
        let avatar = state.player(PlayerId::ONE).avatar;
        let sword = Arc::new(Card::artifact(CardId::new(8), "Sword", 1, 2, 1));
        PositionSystem::attach_artifact(&mut state, PlayerId::ONE, sword, avatar).unwrap();

        let unit = state.unit(avatar).unwrap();
        assert_eq!(unit.power(), 3);
        assert_eq!(unit.life(), 21);
        assert_eq!(unit.artifacts.len(), 1);

        let enemy = state.player(PlayerId::TWO).avatar;
        let axe = Arc::new(Card::artifact(CardId::new(9), "Axe", 1, 1, 0));
        assert_eq!(
            PositionSystem::attach_artifact(&mut state, PlayerId::ONE, axe, enemy),
            Err(PlacementError::InvalidBearer(enemy))
        );
    }

    #[test]
    fn test_remove_site_destroys_stranded_units() {
        let mut state = state();
        let Placement::Site(site) =
            PositionSystem::place_card(&mut state, PlayerId::ONE, site_card(), Position::new(3, 2), None).unwrap()
        else {
            panic!("expected site");
        };
        let Placement::Unit(grunt_id) =
            PositionSystem::place_card(&mut state, PlayerId::ONE, grunt(), Position::new(3, 2), None).unwrap()
        else {
            panic!("expected unit");
        };

        PositionSystem::remove_site(&mut state, site).unwrap();
        assert!(state.unit(grunt_id).is_none());
        assert_eq!(state.avatar(PlayerId::ONE).unwrap().region(), Region::Void);
        assert!(state.check_invariants().is_ok());
    }
}
