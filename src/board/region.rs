//! Regions, terrain and region rules.
//!
//! ## Terrain
//!
//! A square's terrain follows its site: no site is `Void`, a site with the
//! water element is `Water`, any other site is `Land`.
//!
//! ## Regions
//!
//! Every unit stands in exactly one region of its square. Which regions a
//! unit may use depends on the terrain and the unit's keywords:
//!
//! | Terrain | Regions                   | Keyword gate                        |
//! |---------|---------------------------|-------------------------------------|
//! | Void    | `Void`                    | avatars and `Voidwalk` only         |
//! | Land    | `Surface`, `Underground`  | `Burrowing` for underground; not `Aquatic` |
//! | Water   | `Surface`, `Underwater`   | `Submerge` for underwater           |

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::position::Position;
use crate::cards::{Card, Element};
use crate::combat::DamageSystem;
use crate::core::{EventKind, GameState, Unit, UnitId};

/// A layer of a square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Surface,
    Underground,
    Underwater,
    Void,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Region::Surface => "surface",
            Region::Underground => "underground",
            Region::Underwater => "underwater",
            Region::Void => "void",
        };
        f.write_str(name)
    }
}

/// What a square is made of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Void,
    Land,
    Water,
}

impl Terrain {
    /// Terrain created by placing a site card.
    #[must_use]
    pub fn for_site(card: &Card) -> Self {
        if card.has_element(Element::Water) {
            Terrain::Water
        } else {
            Terrain::Land
        }
    }

    /// Regions the terrain offers.
    #[must_use]
    pub fn regions(self) -> &'static [Region] {
        match self {
            Terrain::Void => &[Region::Void],
            Terrain::Land => &[Region::Surface, Region::Underground],
            Terrain::Water => &[Region::Surface, Region::Underwater],
        }
    }
}

/// How a region conflict was settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConflictResolution {
    pub unit: UnitId,
    pub from: Region,
    /// New region, or `None` if the unit was destroyed.
    pub to: Option<Region>,
}

/// Region rules and conflict resolution.
pub struct RegionManager;

impl RegionManager {
    /// Terrain of a square.
    #[must_use]
    pub fn terrain_at(state: &GameState, pos: Position) -> Terrain {
        state.grid().terrain(pos)
    }

    /// Check whether a card's unit may stand in `region` on `terrain`.
    #[must_use]
    pub fn can_occupy(card: &Card, is_avatar: bool, terrain: Terrain, region: Region) -> bool {
        let kw = &card.keywords;
        match terrain {
            Terrain::Void => region == Region::Void && (is_avatar || kw.voidwalk),
            Terrain::Land => {
                !kw.aquatic
                    && match region {
                        Region::Surface => true,
                        Region::Underground => kw.burrowing,
                        _ => false,
                    }
            }
            Terrain::Water => match region {
                Region::Surface => true,
                Region::Underwater => kw.submerge,
                _ => false,
            },
        }
    }

    /// `can_occupy` for a unit already on the board.
    #[must_use]
    pub fn unit_can_occupy(unit: &Unit, terrain: Terrain, region: Region) -> bool {
        Self::can_occupy(&unit.card, unit.is_avatar, terrain, region)
    }

    /// Region a card's unit enters by default, if it may stand there at all.
    #[must_use]
    pub fn default_region(card: &Card, is_avatar: bool, terrain: Terrain) -> Option<Region> {
        let preferred = match terrain {
            Terrain::Void => Region::Void,
            Terrain::Land | Terrain::Water => Region::Surface,
        };
        if Self::can_occupy(card, is_avatar, terrain, preferred) {
            return Some(preferred);
        }
        terrain
            .regions()
            .iter()
            .copied()
            .find(|&r| Self::can_occupy(card, is_avatar, terrain, r))
    }

    /// Regions a unit may use on `terrain`.
    #[must_use]
    pub fn regions_for(card: &Card, is_avatar: bool, terrain: Terrain) -> Vec<Region> {
        terrain
            .regions()
            .iter()
            .copied()
            .filter(|&r| Self::can_occupy(card, is_avatar, terrain, r))
            .collect()
    }

    /// Units in one region of a square.
    #[must_use]
    pub fn occupancy(state: &GameState, pos: Position, region: Region) -> usize {
        state
            .grid()
            .occupants(pos)
            .iter()
            .filter_map(|&id| state.unit(id))
            .filter(|u| u.region() == region)
            .count()
    }

    /// Check the stacking limit for one more unit.
    #[must_use]
    pub fn has_capacity(state: &GameState, pos: Position, region: Region) -> bool {
        Self::occupancy(state, pos, region) < state.ruleset().stack_limit
    }

    /// Units on a square whose region the terrain no longer allows.
    #[must_use]
    pub fn detect_conflicts(state: &GameState, pos: Position) -> Vec<UnitId> {
        let terrain = Self::terrain_at(state, pos);
        state
            .grid()
            .occupants(pos)
            .iter()
            .filter_map(|&id| state.unit(id))
            .filter(|u| !Self::unit_can_occupy(u, terrain, u.region()))
            .map(|u| u.id)
            .collect()
    }

    /// Relocate or destroy every conflicting unit on a square.
    ///
    /// A unit moves to its default region for the new terrain when it has
    /// one; otherwise it is destroyed.
    pub fn resolve_conflicts(state: &mut GameState, pos: Position) -> Vec<ConflictResolution> {
        let terrain = Self::terrain_at(state, pos);
        let mut resolutions = Vec::new();

        for id in Self::detect_conflicts(state, pos) {
            let Some(unit) = state.unit(id) else {
                continue;
            };
            let from = unit.region();
            let to = Self::default_region(&unit.card, unit.is_avatar, terrain);
            let name = unit.card.name.clone();

            match to {
                Some(region) => {
                    state.set_unit_region(id, region);
                    state.emit(
                        EventKind::RegionConflict { unit: id, position: pos, from, to },
                        format!("{name} shifts from {from} to {region} at {pos}"),
                    );
                }
                None => {
                    state.emit(
                        EventKind::RegionConflict { unit: id, position: pos, from, to },
                        format!("{name} cannot survive the {terrain:?} terrain at {pos}"),
                    );
                    DamageSystem::destroy_unit(state, id);
                }
            }
            debug!(unit = %id, %from, ?to, "region conflict resolved");
            resolutions.push(ConflictResolution { unit: id, from, to });
        }
        resolutions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardId;

    fn minion(text: &str) -> Card {
        Card::minion(CardId::new(1), "Test", 1, 1, 1).with_text(text)
    }

    #[test]
    fn test_void_needs_voidwalk_or_avatar() {
        assert!(!RegionManager::can_occupy(&minion(""), false, Terrain::Void, Region::Void));
        assert!(RegionManager::can_occupy(&minion("Voidwalk"), false, Terrain::Void, Region::Void));
        assert!(RegionManager::can_occupy(&minion(""), true, Terrain::Void, Region::Void));
    }

    #[test]
    fn test_land_regions() {
        let plain = minion("");
        let mole = minion("Burrowing");
        assert!(RegionManager::can_occupy(&plain, false, Terrain::Land, Region::Surface));
        assert!(!RegionManager::can_occupy(&plain, false, Terrain::Land, Region::Underground));
        assert!(RegionManager::can_occupy(&mole, false, Terrain::Land, Region::Underground));
        assert!(!RegionManager::can_occupy(&mole, false, Terrain::Land, Region::Underwater));
    }

    #[test]
    fn test_aquatic_only_on_water() {
        let fish = minion("Aquatic");
        assert!(!RegionManager::can_occupy(&fish, false, Terrain::Land, Region::Surface));
        assert!(RegionManager::can_occupy(&fish, false, Terrain::Water, Region::Surface));
        assert_eq!(RegionManager::default_region(&fish, false, Terrain::Land), None);
    }

    #[test]
    fn test_default_region() {
        assert_eq!(
            RegionManager::default_region(&minion(""), false, Terrain::Land),
            Some(Region::Surface)
        );
        assert_eq!(
            RegionManager::default_region(&minion(""), true, Terrain::Void),
            Some(Region::Void)
        );
        assert_eq!(RegionManager::default_region(&minion(""), false, Terrain::Void), None);
    }

    #[test]
    fn test_regions_for_submerge() {
        let eel = minion("Submerge");
        assert_eq!(
            RegionManager::regions_for(&eel, false, Terrain::Water),
            vec![Region::Surface, Region::Underwater]
        );
    }

    #[test]
    fn test_terrain_for_site() {
        let spring = Card::site(CardId::new(1), "Spring").with_element(Element::Water);
        let hill = Card::site(CardId::new(2), "Hill").with_element(Element::Earth);
        assert_eq!(Terrain::for_site(&spring), Terrain::Water);
        assert_eq!(Terrain::for_site(&hill), Terrain::Land);
    }
}
