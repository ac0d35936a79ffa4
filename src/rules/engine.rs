//! Rules engine: legal actions, action application, terminal check.
//!
//! The AI and the turn engine only ever touch the state through
//! `RulesEngine`:
//! - `legal_actions` enumerates main-phase actions in a stable order
//! - `apply_action` validates, pays costs and dispatches to the board,
//!   effect and damage subsystems
//! - `is_terminal` reports the match result once there is one

use smallvec::SmallVec;
use tracing::debug;

use crate::board::{
    MovementEngine, MovementError, Placement, PlacementError, Position, PositionSystem,
};
use crate::cards::{CardKind, CardRef};
use crate::combat::DamageSystem;
use crate::core::{Action, GameState, PlayerId, UnitId};
use crate::effects::{SpellEffectSystem, SpellParser, SpellResult, Target, TargetSelector};

/// Cap on target combinations enumerated per spell.
const MAX_SPELL_TARGETINGS: usize = 32;

/// Result of a completed game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameResult {
    /// Single winner.
    Winner(PlayerId),
    /// Draw (no winner).
    Draw,
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        match self {
            GameResult::Winner(p) => *p == player,
            GameResult::Draw => false,
        }
    }
}

/// Why an action was rejected. The state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum ActionError {
    #[display("the game is over")]
    GameOver,
    #[display("it is not {_0}'s turn")]
    NotYourTurn(PlayerId),
    #[display("no card at hand index {_0}")]
    InvalidHandIndex(usize),
    #[display("'{_0}' cannot be played this way")]
    WrongKind(String),
    #[display("cannot afford '{_0}'")]
    CannotAfford(String),
    #[display("'{_0}' has no legal way to resolve")]
    NotCastable(String),
    #[display("{_0} belongs to the other player")]
    NotYourUnit(UnitId),
    #[display("{_0}")]
    #[from]
    Placement(PlacementError),
    #[display("{_0}")]
    #[from]
    Movement(MovementError),
}

impl std::error::Error for ActionError {}

/// What an applied action did.
#[derive(Clone, Debug)]
pub enum ActionOutcome {
    Placed(Placement),
    Cast(SpellResult),
    Moved(Position),
    Passed,
}

/// Rules engine trait.
///
/// ## Implementation Notes
///
/// - `legal_actions`: always ends with `Action::Pass`; order is stable
/// - `apply_action`: must be deterministic and leave the state untouched
///   on error
/// - `is_terminal`: return None if the game continues
pub trait RulesEngine {
    /// Enumerate every legal main-phase action for a player.
    fn legal_actions(&self, state: &GameState, player: PlayerId) -> Vec<Action>;

    /// Apply an action to the game state.
    fn apply_action(
        &self,
        state: &mut GameState,
        player: PlayerId,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError>;

    /// Check if the game is over.
    fn is_terminal(&self, state: &GameState) -> Option<GameResult>;

    // === Convenience Methods ===

    /// Check if an action is currently legal.
    fn is_legal(&self, state: &GameState, player: PlayerId, action: &Action) -> bool {
        self.legal_actions(state, player).contains(action)
    }
}

/// The game's rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealmRules;

impl RealmRules {
    fn hand_card(state: &GameState, player: PlayerId, sites: bool, index: usize) -> Result<CardRef, ActionError> {
        let hand = &state.player(player).hand;
        let bucket = if sites { &hand.sites } else { &hand.spells };
        bucket.get(index).cloned().ok_or(ActionError::InvalidHandIndex(index))
    }

    fn check_cost(state: &GameState, player: PlayerId, card: &CardRef, kind: CardKind) -> Result<(), ActionError> {
        if card.kind != kind {
            return Err(ActionError::WrongKind(card.name.clone()));
        }
        if !state.player(player).can_afford(card.cost, &card.threshold) {
            return Err(ActionError::CannotAfford(card.name.clone()));
        }
        Ok(())
    }

    /// Pay for a card and take it out of the spell hand.
    fn pay(state: &mut GameState, player: PlayerId, index: usize, card: &CardRef) -> Result<CardRef, ActionError> {
        if !state.spend_mana(player, card.cost) {
            return Err(ActionError::CannotAfford(card.name.clone()));
        }
        state
            .take_from_hand(player, false, index)
            .ok_or(ActionError::InvalidHandIndex(index))
    }

    /// Indices of the first copy of each distinct card in a hand bucket.
    fn distinct_indices(cards: &im::Vector<CardRef>) -> Vec<usize> {
        let mut seen: Vec<&str> = Vec::new();
        let mut indices = Vec::new();
        for (i, card) in cards.iter().enumerate() {
            if !seen.contains(&card.name.as_str()) {
                seen.push(&card.name);
                indices.push(i);
            }
        }
        indices
    }

    /// Target lists worth trying for a spell, in stable order.
    ///
    /// Single-target specs are combined exhaustively (capped); multi-target
    /// specs take their first legal targets.
    #[must_use]
    pub fn spell_targetings(state: &GameState, player: PlayerId, text: &str) -> Vec<SmallVec<[Target; 2]>> {
        let mut combos: Vec<SmallVec<[Target; 2]>> = vec![SmallVec::new()];
        for effect in SpellParser::parse(text) {
            for spec in effect.targets.iter().filter(|s| !s.is_all()) {
                let candidates = TargetSelector::new(spec.clone(), player).valid_targets(state);
                if spec.count == 1 {
                    let mut next = Vec::new();
                    for combo in &combos {
                        for &t in candidates.iter().filter(|t| !combo.contains(t)) {
                            if next.len() == MAX_SPELL_TARGETINGS {
                                break;
                            }
                            let mut extended = combo.clone();
                            extended.push(t);
                            next.push(extended);
                        }
                        if spec.optional {
                            next.push(combo.clone());
                        }
                    }
                    combos = next;
                } else {
                    for combo in &mut combos {
                        let fresh: Vec<Target> = candidates
                            .iter()
                            .filter(|t| !combo.contains(t))
                            .take(spec.count as usize)
                            .copied()
                            .collect();
                        combo.extend(fresh);
                    }
                }
            }
        }
        combos.truncate(MAX_SPELL_TARGETINGS);
        combos
    }
}

impl RulesEngine for RealmRules {
    fn legal_actions(&self, state: &GameState, player: PlayerId) -> Vec<Action> {
        let mut actions = Vec::new();
        if state.is_game_over() || state.active_player() != player {
            actions.push(Action::Pass);
            return actions;
        }
        let seat = state.player(player);

        let site_squares = PositionSystem::legal_site_positions(state, player);
        for hand_index in Self::distinct_indices(&seat.hand.sites) {
            for &position in &site_squares {
                actions.push(Action::PlaySite { hand_index, position });
            }
        }

        for hand_index in Self::distinct_indices(&seat.hand.spells) {
            let card = &seat.hand.spells[hand_index];
            if !seat.can_afford(card.cost, &card.threshold) {
                continue;
            }
            match card.kind {
                CardKind::Minion => {
                    for (position, region) in PositionSystem::legal_unit_positions(state, player, card) {
                        actions.push(Action::SummonUnit {
                            hand_index,
                            position,
                            region,
                        });
                    }
                }
                CardKind::Artifact => {
                    for bearer in state.units_of(player).map(|u| u.id) {
                        actions.push(Action::PlayArtifact { hand_index, bearer });
                    }
                }
                CardKind::Magic => {
                    if SpellEffectSystem::is_castable(state, card, player) {
                        for targets in Self::spell_targetings(state, player, &card.text) {
                            actions.push(Action::CastSpell { hand_index, targets });
                        }
                    }
                }
                CardKind::Avatar | CardKind::Site => {}
            }
        }

        for unit in state.units_of(player) {
            if unit.is_tapped || unit.has_moved {
                continue;
            }
            for destination in MovementEngine::get_movement_range(state, unit.id) {
                if let Some(path) = MovementEngine::calculate_movement_path(state, unit.id, destination) {
                    actions.push(Action::Move { unit: unit.id, path });
                }
            }
        }

        actions.push(Action::Pass);
        actions
    }

    fn apply_action(
        &self,
        state: &mut GameState,
        player: PlayerId,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError> {
        if state.is_game_over() {
            return Err(ActionError::GameOver);
        }
        if state.active_player() != player {
            return Err(ActionError::NotYourTurn(player));
        }

        let outcome = match action {
            Action::PlaySite { hand_index, position } => {
                let card = Self::hand_card(state, player, true, *hand_index)?;
                PositionSystem::validate_placement(state, player, &card, *position, None)?;
                let card = state
                    .take_from_hand(player, true, *hand_index)
                    .ok_or(ActionError::InvalidHandIndex(*hand_index))?;
                ActionOutcome::Placed(PositionSystem::place_card(state, player, card, *position, None)?)
            }
            Action::SummonUnit {
                hand_index,
                position,
                region,
            } => {
                let card = Self::hand_card(state, player, false, *hand_index)?;
                Self::check_cost(state, player, &card, CardKind::Minion)?;
                PositionSystem::validate_placement(state, player, &card, *position, Some(*region))?;
                let card = Self::pay(state, player, *hand_index, &card)?;
                ActionOutcome::Placed(PositionSystem::place_card(state, player, card, *position, Some(*region))?)
            }
            Action::PlayArtifact { hand_index, bearer } => {
                let card = Self::hand_card(state, player, false, *hand_index)?;
                Self::check_cost(state, player, &card, CardKind::Artifact)?;
                if state.unit(*bearer).map(|u| u.owner) != Some(player) {
                    return Err(PlacementError::InvalidBearer(*bearer).into());
                }
                let card = Self::pay(state, player, *hand_index, &card)?;
                let id = PositionSystem::attach_artifact(state, player, card, *bearer)?;
                ActionOutcome::Placed(Placement::Artifact(id))
            }
            Action::CastSpell { hand_index, targets } => {
                let card = Self::hand_card(state, player, false, *hand_index)?;
                Self::check_cost(state, player, &card, CardKind::Magic)?;
                if !SpellEffectSystem::is_castable(state, &card, player) {
                    return Err(ActionError::NotCastable(card.name.clone()));
                }
                let card = Self::pay(state, player, *hand_index, &card)?;
                let result = SpellEffectSystem::execute_spell(state, &card, player, targets);
                state.to_cemetery(player, card);
                ActionOutcome::Cast(result)
            }
            Action::Move { unit, path } => {
                if state.unit(*unit).is_some_and(|u| u.owner != player) {
                    return Err(ActionError::NotYourUnit(*unit));
                }
                ActionOutcome::Moved(MovementEngine::execute_movement(state, *unit, path)?)
            }
            Action::Pass => ActionOutcome::Passed,
        };

        if !action.is_pass() {
            state.stats.total_actions += 1;
        }
        state.tick();
        DamageSystem::check_game_over(state);
        debug!(%player, action = action.verb(), "action applied");
        Ok(outcome)
    }

    fn is_terminal(&self, state: &GameState) -> Option<GameResult> {
        state.winner().cloned()
    }
}
