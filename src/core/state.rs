//! Game state: the single owner of everything on the board.
//!
//! ## Ownership
//!
//! Units, sites and artifacts live in ordered `im` maps keyed by ID (an
//! arena); the grid only stores IDs. Cloning a `GameState` is cheap, which
//! the AI uses for lookahead.
//!
//! ## Mutation
//!
//! Reads are public. Structural mutation (`insert_unit`, `remove_unit`,
//! `add_site`, ...) is crate-private and reached through the subsystems
//! (`PositionSystem`, `MovementEngine`, `DamageSystem`, `SpellEffectSystem`,
//! `TurnEngine`), each of which validates before it mutates.
//!
//! ## Invariants
//!
//! `check_invariants` verifies that every unit in the arena sits on exactly
//! one square, that every grid occupant exists, that each living player has
//! exactly one avatar, and that no unit is left holding lethal damage.

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use super::config::Ruleset;
use super::event::{EndReason, EventKind, GameEvent, GameLog};
use super::ids::{ArtifactId, SiteId, UnitId};
use super::player::{DeckKind, Player, PlayerId, PlayerMap};
use super::rng::GameRng;
use super::unit::Unit;
use crate::board::{Grid, Position, Region, Terrain};
use crate::cards::{CardRef, PlayerDeck, Threshold};
use crate::rules::GameResult;
use crate::sim::MatchStatistics;

/// Turn phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Start,
    Main,
    Combat,
    End,
}

/// Current phase, step within it, and the active player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub step: u32,
    pub active: PlayerId,
}

/// A site on the board.
#[derive(Clone, Debug)]
pub struct Site {
    pub id: SiteId,
    pub card: CardRef,
    pub owner: PlayerId,
    pub position: Position,
}

/// An artifact attached to a unit.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub id: ArtifactId,
    pub card: CardRef,
    pub owner: PlayerId,
    pub bearer: UnitId,
}

/// Complete match state.
#[derive(Clone, Debug)]
pub struct GameState {
    turn: u32,
    phase: Phase,
    grid: Grid,
    players: PlayerMap<Player>,
    units: OrdMap<UnitId, Unit>,
    sites: OrdMap<SiteId, Site>,
    artifacts: OrdMap<ArtifactId, Artifact>,
    log: GameLog,
    game_over: bool,
    winner: Option<GameResult>,
    end_reason: Option<EndReason>,
    ruleset: Ruleset,
    pub(crate) stats: MatchStatistics,
    pub(crate) rng: GameRng,
    next_entity_id: u32,
    next_event_id: u64,
    clock: u64,
    recording: bool,
}

impl GameState {
    /// Set up a match: place avatars, shuffle decks, draw opening hands.
    ///
    /// Decks are not validated here; `MatchSimulator` does that before
    /// building the state.
    #[must_use]
    pub fn new(ruleset: Ruleset, player1: &PlayerDeck, player2: &PlayerDeck, seed: u64) -> Self {
        let rng = GameRng::new(seed);
        let mut shuffle_rng = rng.for_context("shuffle");

        let mut state = Self {
            turn: 1,
            phase: Phase {
                kind: PhaseKind::Start,
                step: 0,
                active: PlayerId::ONE,
            },
            grid: Grid::new(ruleset.rows, ruleset.cols),
            players: PlayerMap::new(|p| Player::new(p, ruleset.starting_life, UnitId::new(0))),
            units: OrdMap::new(),
            sites: OrdMap::new(),
            artifacts: OrdMap::new(),
            log: GameLog::new(),
            game_over: false,
            winner: None,
            end_reason: None,
            ruleset,
            stats: MatchStatistics::default(),
            rng,
            next_entity_id: 0,
            next_event_id: 0,
            clock: 0,
            recording: true,
        };

        for (player, deck) in [(PlayerId::ONE, player1), (PlayerId::TWO, player2)] {
            let start = state.ruleset.avatar_start(player);
            let avatar = state.insert_unit(player, deck.avatar.clone(), start, Region::Void);
            if let Some(unit) = state.units.get_mut(&avatar) {
                unit.is_avatar = true;
                unit.summoning_sickness = false;
            }

            let mut spells = deck.spells.clone();
            let mut sites = deck.sites.clone();
            shuffle_rng.shuffle(&mut spells);
            shuffle_rng.shuffle(&mut sites);

            let seat = &mut state.players[player];
            seat.avatar = avatar;
            seat.spellbook = spells.into_iter().collect();
            seat.atlas = sites.into_iter().collect();

            for _ in 0..state.ruleset.opening_sites {
                state.draw(player, DeckKind::Atlas);
            }
            for _ in 0..state.ruleset.opening_spells {
                state.draw(player, DeckKind::Spellbook);
            }
        }
        state
    }

    // === Reads ===

    /// Turn number, starting at 1. Each player-turn counts once.
    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn active_player(&self) -> PlayerId {
        self.phase.active
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id]
    }

    #[must_use]
    pub fn players(&self) -> &PlayerMap<Player> {
        &self.players
    }

    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// All units in ID order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units owned by one player, in ID order.
    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.owner == player)
    }

    /// A player's avatar, if still on the board.
    #[must_use]
    pub fn avatar(&self, player: PlayerId) -> Option<&Unit> {
        self.units
            .get(&self.players[player].avatar)
            .filter(|u| u.is_avatar)
    }

    #[must_use]
    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(&id)
    }

    /// All sites in ID order.
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    /// Site at a position.
    #[must_use]
    pub fn site_at(&self, pos: Position) -> Option<&Site> {
        self.grid
            .square(pos)
            .and_then(|s| s.site())
            .and_then(|id| self.sites.get(&id))
    }

    #[must_use]
    pub fn artifact(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts.get(&id)
    }

    /// All artifacts in ID order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    #[must_use]
    pub fn log(&self) -> &GameLog {
        &self.log
    }

    #[must_use]
    pub fn statistics(&self) -> &MatchStatistics {
        &self.stats
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    #[must_use]
    pub fn winner(&self) -> Option<&GameResult> {
        self.winner.as_ref()
    }

    #[must_use]
    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Logical clock: one tick per applied action.
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// ID the next emitted event will get.
    #[must_use]
    pub fn next_event_id(&self) -> u64 {
        self.next_event_id
    }

    /// Whether events are being stored in the log.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Turn event storage on or off. Events are still numbered when off.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    // === Events ===

    /// Append an event to the log.
    pub(crate) fn emit(&mut self, kind: EventKind, description: impl Into<String>) {
        let id = self.next_event_id;
        self.next_event_id += 1;
        if !self.recording {
            return;
        }
        self.log.push(GameEvent {
            id,
            turn: self.turn,
            active_player: self.phase.active,
            kind,
            description: description.into(),
            resolved: true,
            timestamp: self.clock,
        });
    }

    pub(crate) fn tick(&mut self) {
        self.clock += 1;
    }

    // === Turn bookkeeping ===

    pub(crate) fn set_phase(&mut self, kind: PhaseKind, step: u32) {
        self.phase.kind = kind;
        self.phase.step = step;
    }

    pub(crate) fn pass_turn(&mut self) {
        self.phase = Phase {
            kind: PhaseKind::Start,
            step: 0,
            active: self.phase.active.opponent(),
        };
        self.turn += 1;
    }

    pub(crate) fn end_game(&mut self, result: GameResult, reason: EndReason) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        let winner = match &result {
            GameResult::Winner(p) => Some(*p),
            GameResult::Draw => None,
        };
        self.winner = Some(result);
        self.end_reason = Some(reason);
        for player in PlayerId::all() {
            self.stats.final_life[player] = self.players[player].life;
            self.stats.final_board[player] = self.units_of(player).count() as u32;
        }
        let description = match winner {
            Some(p) => format!("{p} wins ({reason})"),
            None => format!("draw ({reason})"),
        };
        self.emit(EventKind::GameOver { winner, reason }, description);
    }

    // === Players ===

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id]
    }

    /// Reduce life, clamped at zero. Returns the life actually lost.
    pub(crate) fn lose_life(&mut self, player: PlayerId, amount: u32) -> u32 {
        let seat = &mut self.players[player];
        let lost = amount.min(seat.life);
        seat.life -= lost;
        lost
    }

    /// Restore life up to the maximum. Returns the life actually gained.
    pub(crate) fn gain_life(&mut self, player: PlayerId, amount: u32) -> u32 {
        let seat = &mut self.players[player];
        let gained = amount.min(seat.max_life.saturating_sub(seat.life));
        seat.life += gained;
        gained
    }

    /// Pay mana. Fails without change when the player cannot pay.
    pub(crate) fn spend_mana(&mut self, player: PlayerId, amount: u32) -> bool {
        let seat = &mut self.players[player];
        if seat.mana < amount {
            return false;
        }
        seat.mana -= amount;
        true
    }

    /// Set mana to the number of controlled sites and recompute affinity.
    pub(crate) fn refresh_resources(&mut self, player: PlayerId) {
        self.recompute_affinity(player);
        let seat = &mut self.players[player];
        seat.mana = seat.controlled_sites.len() as u32;
    }

    fn recompute_affinity(&mut self, player: PlayerId) {
        let mut affinity = Threshold::default();
        for id in self.players[player].controlled_sites.iter() {
            if let Some(site) = self.sites.get(id) {
                for &element in &site.card.elements {
                    affinity.add(element, 1);
                }
            }
        }
        self.players[player].affinity = affinity;
    }

    /// Draw the front card of a deck into the hand.
    ///
    /// Returns `None` (and logs `DeckEmpty`) when the deck is empty.
    pub(crate) fn draw(&mut self, player: PlayerId, deck: DeckKind) -> Option<CardRef> {
        let seat = &mut self.players[player];
        let card = match deck {
            DeckKind::Spellbook => seat.spellbook.pop_front(),
            DeckKind::Atlas => seat.atlas.pop_front(),
        };
        match card {
            Some(card) => {
                seat.hand.add(card.clone());
                self.emit(
                    EventKind::CardDrawn {
                        player,
                        deck,
                        card: card.name.clone(),
                    },
                    format!("{player} draws {} from their {deck}", card.name),
                );
                Some(card)
            }
            None => {
                self.emit(
                    EventKind::DeckEmpty { player, deck },
                    format!("{player} cannot draw: {deck} is empty"),
                );
                None
            }
        }
    }

    /// Remove a card from a hand bucket.
    pub(crate) fn take_from_hand(
        &mut self,
        player: PlayerId,
        sites: bool,
        index: usize,
    ) -> Option<CardRef> {
        let hand = &mut self.players[player].hand;
        let bucket = if sites { &mut hand.sites } else { &mut hand.spells };
        (index < bucket.len()).then(|| bucket.remove(index))
    }

    /// Remove the first card matching a predicate from a deck.
    pub(crate) fn take_from_deck(
        &mut self,
        player: PlayerId,
        deck: DeckKind,
        predicate: impl Fn(&CardRef) -> bool,
    ) -> Option<CardRef> {
        let seat = &mut self.players[player];
        let cards: &mut Vector<CardRef> = match deck {
            DeckKind::Spellbook => &mut seat.spellbook,
            DeckKind::Atlas => &mut seat.atlas,
        };
        let index = cards.iter().position(|c| predicate(c))?;
        Some(cards.remove(index))
    }

    pub(crate) fn to_cemetery(&mut self, player: PlayerId, card: CardRef) {
        self.players[player].cemetery.push_back(card);
    }

    // === Units ===

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Add a unit to the arena and the grid. Legality is the caller's job.
    pub(crate) fn insert_unit(
        &mut self,
        owner: PlayerId,
        card: CardRef,
        pos: Position,
        region: Region,
    ) -> UnitId {
        let id = UnitId::new(self.alloc_id());
        self.grid.add_occupant(pos, id);
        self.units.insert(id, Unit::new(id, card, owner, pos, region));
        id
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Move a unit to another square and region.
    pub(crate) fn relocate_unit(&mut self, id: UnitId, pos: Position, region: Region) -> bool {
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        let from = unit.position;
        unit.position = pos;
        unit.region = region;
        self.grid.remove_occupant(from, id);
        self.grid.add_occupant(pos, id);
        true
    }

    pub(crate) fn set_unit_region(&mut self, id: UnitId, region: Region) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.region = region;
                true
            }
            None => false,
        }
    }

    /// Take a unit off the board.
    ///
    /// Its card goes to the owner's cemetery unless it is a token; attached
    /// artifacts go to their owners' cemeteries.
    pub(crate) fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        self.grid.remove_occupant(unit.position, id);
        for artifact_id in &unit.artifacts {
            if let Some(artifact) = self.artifacts.remove(artifact_id) {
                self.to_cemetery(artifact.owner, artifact.card);
            }
        }
        if !unit.is_token {
            self.to_cemetery(unit.owner, unit.card.clone());
        }
        Some(unit)
    }

    // === Sites and artifacts ===

    /// Put a site on a square and give its owner control.
    pub(crate) fn add_site(&mut self, owner: PlayerId, card: CardRef, pos: Position) -> SiteId {
        let id = SiteId::new(self.alloc_id());
        self.grid.set_site(pos, Some(id), Terrain::for_site(&card));
        self.sites.insert(
            id,
            Site {
                id,
                card,
                owner,
                position: pos,
            },
        );
        self.players[owner].controlled_sites.push_back(id);
        self.recompute_affinity(owner);
        id
    }

    /// Remove a site; its square returns to void.
    pub(crate) fn remove_site(&mut self, id: SiteId) -> Option<Site> {
        let site = self.sites.remove(&id)?;
        self.grid.set_site(site.position, None, Terrain::Void);
        let controlled = &mut self.players[site.owner].controlled_sites;
        if let Some(i) = controlled.iter().position(|&s| s == id) {
            controlled.remove(i);
        }
        self.recompute_affinity(site.owner);
        self.to_cemetery(site.owner, site.card.clone());
        Some(site)
    }

    /// Attach an artifact to a unit.
    pub(crate) fn add_artifact(
        &mut self,
        owner: PlayerId,
        card: CardRef,
        bearer: UnitId,
    ) -> Option<ArtifactId> {
        if !self.units.contains_key(&bearer) {
            return None;
        }
        let id = ArtifactId::new(self.alloc_id());
        self.artifacts.insert(
            id,
            Artifact {
                id,
                card,
                owner,
                bearer,
            },
        );
        if let Some(unit) = self.units.get_mut(&bearer) {
            unit.artifacts.push(id);
        }
        Some(id)
    }

    // === Invariants ===

    /// Verify arena/grid consistency and player invariants.
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        for unit in self.units.values() {
            let hits = self
                .grid
                .positions()
                .filter(|&p| self.grid.occupants(p).contains(&unit.id))
                .count();
            if hits != 1 {
                return Err(format!("{} is on {hits} squares", unit.id));
            }
            if !self.grid.occupants(unit.position).contains(&unit.id) {
                return Err(format!("{} is not on its own square", unit.id));
            }
            if unit.has_lethal_damage() {
                return Err(format!("{} holds lethal damage", unit.id));
            }
        }

        for pos in self.grid.positions() {
            for id in self.grid.occupants(pos) {
                if !self.units.contains_key(id) {
                    return Err(format!("{id} at {pos} is not in the unit map"));
                }
            }
        }

        for (player, seat) in self.players.iter() {
            let avatars = self.units_of(player).filter(|u| u.is_avatar).count();
            let valid = if self.game_over { avatars <= 1 } else { avatars == 1 };
            if !valid {
                return Err(format!("{player} has {avatars} avatars"));
            }
            if seat.life > seat.max_life {
                return Err(format!("{player} life {} exceeds max", seat.life));
            }
        }

        for artifact in self.artifacts.values() {
            let attached = self
                .units
                .get(&artifact.bearer)
                .is_some_and(|u| u.artifacts.contains(&artifact.id));
            if !attached {
                return Err(format!("{} has no bearer", artifact.id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, CardId, Element};

    fn deck(name: &str, spells: usize, sites: usize) -> PlayerDeck {
        PlayerDeck::new(
            Card::avatar(CardId::new(0), name, 1, 20),
            (0..spells)
                .map(|i| Card::minion(CardId::new(10 + i as u32), "Grunt", 0, 1, 1))
                .collect(),
            (0..sites)
                .map(|i| Card::site(CardId::new(100 + i as u32), "Field").with_element(Element::Earth))
                .collect(),
        )
    }

    fn new_state() -> GameState {
        GameState::new(Ruleset::default(), &deck("A", 10, 10), &deck("B", 10, 10), 42)
    }

    #[test]
    fn test_setup_places_avatars() {
        let state = new_state();
        let a1 = state.avatar(PlayerId::ONE).unwrap();
        let a2 = state.avatar(PlayerId::TWO).unwrap();
        assert_eq!(a1.position(), Position::new(3, 2));
        assert_eq!(a2.position(), Position::new(0, 2));
        assert_eq!(a1.region(), Region::Void);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_setup_draws_opening_hands() {
        let state = new_state();
        let p1 = state.player(PlayerId::ONE);
        assert_eq!(p1.hand.sites.len(), 3);
        assert_eq!(p1.hand.spells.len(), 3);
        assert_eq!(p1.spellbook.len(), 7);
        assert_eq!(p1.atlas.len(), 7);
        assert_eq!(p1.life, 20);
    }

    #[test]
    fn test_draw_from_empty_deck_is_noop() {
        let mut state = GameState::new(Ruleset::default(), &deck("A", 3, 3), &deck("B", 3, 3), 1);
        let before = state.player(PlayerId::ONE).hand.len();
        assert!(state.draw(PlayerId::ONE, DeckKind::Spellbook).is_none());
        assert_eq!(state.player(PlayerId::ONE).hand.len(), before);
        assert!(matches!(
            state.log().last().unwrap().kind,
            EventKind::DeckEmpty { .. }
        ));
    }

    #[test]
    fn test_life_clamps() {
        let mut state = new_state();
        assert_eq!(state.lose_life(PlayerId::ONE, 25), 20);
        assert_eq!(state.player(PlayerId::ONE).life, 0);
        assert_eq!(state.gain_life(PlayerId::ONE, 50), 20);
        assert_eq!(state.gain_life(PlayerId::ONE, 1), 0);
    }

    #[test]
    fn test_site_grants_mana_and_affinity() {
        let mut state = new_state();
        let card = state.player(PlayerId::ONE).hand.sites[0].clone();
        state.add_site(PlayerId::ONE, card, Position::new(3, 2));
        state.refresh_resources(PlayerId::ONE);

        let p1 = state.player(PlayerId::ONE);
        assert_eq!(p1.mana, 1);
        assert_eq!(p1.affinity.earth, 1);
        assert_eq!(state.grid().terrain(Position::new(3, 2)), Terrain::Land);
    }

    #[test]
    fn test_remove_unit_sends_card_to_cemetery() {
        let mut state = new_state();
        let card = state.player(PlayerId::ONE).hand.spells[0].clone();
        let id = state.insert_unit(PlayerId::ONE, card, Position::new(2, 2), Region::Surface);
        assert!(state.check_invariants().is_ok());

        state.remove_unit(id);
        assert!(state.unit(id).is_none());
        assert!(state.grid().occupants(Position::new(2, 2)).is_empty());
        assert_eq!(state.player(PlayerId::ONE).cemetery.len(), 1);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_tokens_skip_cemetery() {
        let mut state = new_state();
        let token = std::sync::Arc::new(Card::token("Spirit", 1, 1));
        let id = state.insert_unit(PlayerId::TWO, token, Position::new(1, 1), Region::Surface);
        state.unit_mut(id).unwrap().is_token = true;
        state.remove_unit(id);
        assert!(state.player(PlayerId::TWO).cemetery.is_empty());
    }

    #[test]
    fn test_mana_spend() {
        let mut state = new_state();
        state.player_mut(PlayerId::ONE).mana = 2;
        assert!(!state.spend_mana(PlayerId::ONE, 3));
        assert!(state.spend_mana(PlayerId::ONE, 2));
        assert_eq!(state.player(PlayerId::ONE).mana, 0);
    }

    #[test]
    fn test_pass_turn_counts_each_player_turn() {
        let mut state = new_state();
        state.pass_turn();
        assert_eq!(state.turn(), 2);
        assert_eq!(state.active_player(), PlayerId::TWO);
        state.pass_turn();
        assert_eq!(state.turn(), 3);
        assert_eq!(state.active_player(), PlayerId::ONE);
    }

    #[test]
    fn test_recording_off_keeps_numbering() {
        let mut state = new_state();
        let before = state.log().len();
        let next = state.next_event_id();
        state.set_recording(false);
        assert!(!state.is_recording());
        state.draw(PlayerId::ONE, DeckKind::Spellbook);
        assert_eq!(state.log().len(), before);
        assert_eq!(state.next_event_id(), next + 1);
    }
}
