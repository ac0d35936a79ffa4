//! Turn state machine.
//!
//! One call to `TurnEngine::play_turn` runs a full player-turn:
//!
//! ```text
//! Start  -> untap, refresh mana, draw
//! Main   -> AI actions until Pass or the action cap
//! Combat -> attackers, blockers, damage
//! End    -> expire modifiers, clear damage, pass to the opponent
//! ```
//!
//! The phase counter in `GameState` is advanced here and nowhere else.
//! With a deadline set, the engine checks the clock before every AI action
//! and ends the match as a timed-out draw once it has passed.

use std::time::Instant;
use tracing::debug;

use crate::ai::AIEngine;
use crate::combat::{CombatError, CombatPhase, CombatReport, CombatStep, DamageSystem};
use crate::core::{
    DeckKind, EmptyDeckRule, EndReason, EventKind, GameState, PhaseKind, PlayerId, PlayerMap, UnitId,
};
use crate::effects::Duration;
use crate::rules::{ActionError, GameResult, RealmRules, RulesEngine};

/// Internal failure while playing a turn.
///
/// The AI only proposes legal moves, so these indicate a rules bug; the
/// match that hits one ends with `EndReason::Error`.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum TurnError {
    #[display("action rejected: {_0}")]
    Action(ActionError),
    #[display("combat declaration rejected: {_0}")]
    Combat(CombatError),
}

impl std::error::Error for TurnError {}

/// What happened during one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnSummary {
    pub player: Option<PlayerId>,
    pub card_drawn: Option<String>,
    pub actions: u32,
    pub combat: Option<CombatReport>,
    pub modifiers_expired: u32,
}

/// Drives phases for both seats.
#[derive(Clone, Debug)]
pub struct TurnEngine {
    rules: RealmRules,
    ais: PlayerMap<AIEngine>,
    deadline: Option<Instant>,
}

impl TurnEngine {
    /// Create a turn engine from the two seats' AIs.
    #[must_use]
    pub fn new(ais: PlayerMap<AIEngine>) -> Self {
        Self {
            rules: RealmRules,
            ais,
            deadline: None,
        }
    }

    /// Wall-clock limit for the match; `None` disables it.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// End the match as a timed-out draw if the deadline has passed.
    fn check_deadline(&self, state: &mut GameState) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                if !state.is_game_over() {
                    debug!(turn = state.turn(), "deadline passed");
                    state.end_game(GameResult::Draw, EndReason::Timeout);
                }
                true
            }
            _ => false,
        }
    }

    /// The AI playing a seat.
    #[must_use]
    pub fn ai(&self, player: PlayerId) -> &AIEngine {
        &self.ais[player]
    }

    /// Play the active player's whole turn.
    ///
    /// Stops early, without passing the turn, once the game is over.
    pub fn play_turn(&mut self, state: &mut GameState) -> Result<TurnSummary, TurnError> {
        let mut summary = TurnSummary {
            player: Some(state.active_player()),
            ..TurnSummary::default()
        };
        summary.card_drawn = self.start_turn(state);
        if state.is_game_over() {
            return Ok(summary);
        }
        summary.actions = self.run_main_phase(state)?;
        if state.is_game_over() || self.check_deadline(state) {
            return Ok(summary);
        }
        summary.combat = self.run_combat_phase(state)?;
        if state.is_game_over() {
            return Ok(summary);
        }
        summary.modifiers_expired = self.end_turn(state);
        Ok(summary)
    }

    /// Start phase: untap, refresh resources and draw.
    ///
    /// Returns the name of the drawn card, if any.
    pub fn start_turn(&mut self, state: &mut GameState) -> Option<String> {
        let player = state.active_player();
        state.set_phase(PhaseKind::Start, 0);
        state.emit(
            EventKind::TurnStarted { player },
            format!("turn {} begins for {player}", state.turn()),
        );

        let ready: Vec<UnitId> = state.units_of(player).map(|u| u.id).collect();
        for id in ready {
            if let Some(unit) = state.unit_mut(id) {
                unit.is_tapped = false;
                unit.summoning_sickness = false;
                unit.has_moved = false;
            }
        }
        state.player_mut(player).sites_played_this_turn = 0;
        state.refresh_resources(player);

        state.set_phase(PhaseKind::Start, 1);
        // The first player skips the draw on the opening turn.
        let drawn = if state.turn() == 1 { None } else { self.draw_step(state, player) };
        DamageSystem::check_game_over(state);
        drawn
    }

    fn draw_step(&self, state: &mut GameState, player: PlayerId) -> Option<String> {
        let seat = state.player(player);
        let preferred = if (seat.controlled_sites.len() as u32) < self.ais[player].site_target() {
            DeckKind::Atlas
        } else {
            DeckKind::Spellbook
        };
        let fallback = match preferred {
            DeckKind::Atlas => DeckKind::Spellbook,
            DeckKind::Spellbook => DeckKind::Atlas,
        };
        let deck = if seat.deck(preferred).is_empty() && !seat.deck(fallback).is_empty() {
            fallback
        } else {
            preferred
        };

        match state.draw(player, deck) {
            Some(card) => Some(card.name.clone()),
            None => {
                if state.ruleset().empty_deck == EmptyDeckRule::Lose {
                    state.player_mut(player).decked_out = true;
                    debug!(%player, "decked out");
                }
                None
            }
        }
    }

    /// Main phase: let the active AI act until it passes.
    ///
    /// Returns the number of non-pass actions taken.
    pub fn run_main_phase(&mut self, state: &mut GameState) -> Result<u32, TurnError> {
        let player = state.active_player();
        let cap = state.ruleset().max_actions_per_turn;
        let mut taken = 0;
        state.set_phase(PhaseKind::Main, 0);

        while taken < cap && !state.is_game_over() && !self.check_deadline(state) {
            let action = self.ais[player].select_action(state);
            if action.is_pass() {
                break;
            }
            self.rules.apply_action(state, player, &action)?;
            taken += 1;
            state.set_phase(PhaseKind::Main, taken);
        }
        Ok(taken)
    }

    /// Combat phase. Returns `None` when nobody attacked.
    pub fn run_combat_phase(&mut self, state: &mut GameState) -> Result<Option<CombatReport>, TurnError> {
        let attacker = state.active_player();
        let defender = attacker.opponent();
        let mut combat = CombatPhase::new();

        state.set_phase(PhaseKind::Combat, 0);
        for (unit, target) in self.ais[attacker].select_attackers(state) {
            combat.declare_attacker(state, unit, target)?;
        }
        combat.finish_attacks()?;
        if combat.step() == CombatStep::End {
            return Ok(None);
        }

        state.set_phase(PhaseKind::Combat, 1);
        for (blocker, target) in self.ais[defender].select_blockers(state, &combat) {
            combat.declare_blocker(state, blocker, target)?;
        }
        combat.finish_blocks()?;

        state.set_phase(PhaseKind::Combat, 2);
        let report = combat.resolve_combat_damage(state)?;
        state.tick();
        Ok(Some(report))
    }

    /// End phase: expire modifiers, clear damage and pass the turn.
    ///
    /// Returns the number of modifiers removed.
    pub fn end_turn(&mut self, state: &mut GameState) -> u32 {
        let player = state.active_player();
        state.set_phase(PhaseKind::End, 0);

        let units: Vec<UnitId> = state.units().map(|u| u.id).collect();
        let mut removed = 0;
        for id in units {
            let expired = Self::expire_modifiers(state, id);
            if expired > 0 {
                state.emit(
                    EventKind::ModifierExpired { unit: id, count: expired },
                    format!("{expired} effect(s) on {id} wear off"),
                );
                removed += expired;
            }
            if let Some(unit) = state.unit_mut(id) {
                unit.damage = 0;
            }
        }

        state.player_mut(player).sites_played_this_turn = 0;
        if !DamageSystem::check_game_over(state) {
            state.pass_turn();
        }
        removed
    }

    /// Drop `Turn` modifiers and `Conditional` ones whose condition no
    /// longer holds.
    fn expire_modifiers(state: &mut GameState, id: UnitId) -> u32 {
        let Some(unit) = state.unit(id) else {
            return 0;
        };
        let keep: Vec<bool> = unit
            .modifiers
            .iter()
            .map(|m| match m.duration {
                Duration::Turn => false,
                Duration::Permanent => true,
                Duration::Conditional(check) => check.evaluate(state, m.controller),
            })
            .collect();
        let expired = keep.iter().filter(|k| !**k).count() as u32;
        if expired == 0 {
            return 0;
        }
        if let Some(unit) = state.unit_mut(id) {
            let mut flags = keep.into_iter();
            unit.modifiers.retain(|_| flags.next().unwrap_or(true));
        }
        expired
    }
}
