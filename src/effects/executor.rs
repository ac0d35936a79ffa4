//! Effect execution - applying parsed spell effects to game state.
//!
//! `SpellEffectSystem::execute_spell` parses a card's text and runs each
//! effect in textual order:
//!
//! 1. Evaluate the effect's conditions. A failed condition aborts the rest
//!    of the spell.
//! 2. Resolve targets: "all/each" specs enumerate every legal target, the
//!    rest consume caller-provided targets in order and are validated. A
//!    required spec that resolves to nothing fails with `NoTargets`.
//! 3. Dispatch to the per-type handler.
//!
//! Effects already applied before a failure stay applied. The failure is
//! reported in `SpellResult` and logged as `SpellFizzled`; it never aborts
//! the match.

use smallvec::SmallVec;
use tracing::debug;

use super::effect::{ConditionCheck, Duration, EffectType, SearchFilter, SpellEffect};
use super::parser::SpellParser;
use super::targeting::{Target, TargetPool, TargetSelector};
use crate::board::{MovementEngine, MovementError, PlacementError, PositionSystem};
use crate::cards::{Card, CardKind};
use crate::combat::DamageSystem;
use crate::core::{
    DamageTarget, DeckKind, EventKind, GameEvent, GameState, Modifier, ModifierKind, ModifierSource,
    PlayerId,
};

/// Why a spell stopped early.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum EffectError {
    #[display("condition not met: {_0}")]
    ConditionFailed(ConditionCheck),
    #[display("no legal targets for {_0} effect")]
    NoTargets(EffectType),
    #[display("illegal target {_0}")]
    InvalidTarget(Target),
    #[display("{_0} effects are not supported")]
    Unsupported(EffectType),
    #[display("move of {distance} squares exceeds limit {limit}")]
    TooFar { distance: u32, limit: u32 },
    #[display("placement failed: {_0}")]
    Placement(PlacementError),
    #[display("movement failed: {_0}")]
    Movement(MovementError),
}

impl std::error::Error for EffectError {}

/// Outcome of casting one spell.
#[derive(Clone, Debug)]
pub struct SpellResult {
    /// True when every effect ran.
    pub success: bool,
    /// Events appended while the spell resolved.
    pub events: Vec<GameEvent>,
    /// Everything the spell acted on, in order.
    pub targeted: Vec<Target>,
    pub error: Option<EffectError>,
}

/// Executes parsed spell effects.
pub struct SpellEffectSystem;

impl SpellEffectSystem {
    /// Cast a spell's text on behalf of `caster`.
    ///
    /// Mana and the hand are the caller's business; this only resolves the
    /// text.
    pub fn execute_spell(
        state: &mut GameState,
        card: &Card,
        caster: PlayerId,
        targets: &[Target],
    ) -> SpellResult {
        let first_event = state.next_event_id();
        let parsed = SpellParser::parse_with_diagnostics(&card.text);
        state.stats.unparsed_clauses += parsed.unparsed.len() as u32;
        state.stats.spells_cast += 1;
        state.emit(
            EventKind::SpellCast {
                player: caster,
                card: card.name.clone(),
            },
            format!("{caster} casts {}", card.name),
        );

        let mut pool = TargetPool::new(targets);
        let mut targeted = Vec::new();
        let mut error = None;

        for effect in &parsed.effects {
            if let Some(failed) = effect.conditions.iter().find(|c| !c.evaluate(state, caster)) {
                error = Some(EffectError::ConditionFailed(*failed));
                break;
            }
            match Self::execute_effect(state, card, caster, effect, &mut pool) {
                Ok(hit) => targeted.extend(hit),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        DamageSystem::check_destroyed_creatures(state);
        DamageSystem::check_game_over(state);

        if let Some(e) = &error {
            state.stats.spells_fizzled += 1;
            state.emit(
                EventKind::SpellFizzled {
                    player: caster,
                    card: card.name.clone(),
                    reason: e.to_string(),
                },
                format!("{} fizzles: {e}", card.name),
            );
            debug!(card = %card.name, %caster, error = %e, "spell fizzled");
        }

        SpellResult {
            success: error.is_none(),
            events: state.log().since(first_event).cloned().collect(),
            targeted,
            error,
        }
    }

    /// Check whether a spell has everything it needs to be cast now:
    /// conditions of its first effect hold and every required target
    /// specification has a legal target.
    #[must_use]
    pub fn is_castable(state: &GameState, card: &Card, caster: PlayerId) -> bool {
        let effects = SpellParser::parse(&card.text);
        let Some(first) = effects.first() else {
            return true;
        };
        first.conditions.iter().all(|c| c.evaluate(state, caster))
            && effects.iter().all(|e| {
                e.effect_type != EffectType::Counter
                    && e.targets
                        .iter()
                        .all(|spec| TargetSelector::new(spec.clone(), caster).has_enough_targets(state))
            })
    }

    /// Run one effect. Returns what it acted on.
    fn execute_effect(
        state: &mut GameState,
        card: &Card,
        caster: PlayerId,
        effect: &SpellEffect,
        pool: &mut TargetPool,
    ) -> Result<Vec<Target>, EffectError> {
        if effect.effect_type == EffectType::Counter {
            return Err(EffectError::Unsupported(EffectType::Counter));
        }
        let targets = Self::resolve_targets(state, effect, caster, pool)?;

        match effect.effect_type {
            EffectType::Damage => Ok(Self::damage(state, effect.amount(), &targets)),
            EffectType::Heal => Ok(Self::heal(state, effect.amount(), caster, targets)),
            EffectType::Draw => Ok(Self::draw(state, effect, caster, targets)),
            EffectType::Summon => Self::summon(state, effect, caster, &targets),
            EffectType::Modify => Ok(Self::modify(state, card, effect, caster, targets)),
            EffectType::Move => Self::move_unit(state, effect, &targets),
            EffectType::Destroy => Ok(Self::destroy(state, targets)),
            EffectType::Search => Ok(Self::search(state, effect, caster)),
            EffectType::Counter => Err(EffectError::Unsupported(EffectType::Counter)),
        }
    }

    fn resolve_targets(
        state: &GameState,
        effect: &SpellEffect,
        caster: PlayerId,
        pool: &mut TargetPool,
    ) -> Result<Vec<Target>, EffectError> {
        let mut resolved = Vec::new();
        for spec in &effect.targets {
            let selector = TargetSelector::new(spec.clone(), caster);
            if spec.is_all() {
                let every = selector.valid_targets(state);
                if every.is_empty() && !spec.optional {
                    return Err(EffectError::NoTargets(effect.effect_type));
                }
                resolved.extend(every);
                continue;
            }
            let chosen = pool.take(spec.kind, spec.count as usize);
            if let Some(&bad) = chosen.iter().find(|&&t| !selector.is_valid(state, t)) {
                return Err(EffectError::InvalidTarget(bad));
            }
            if chosen.is_empty() && !spec.optional {
                return Err(EffectError::NoTargets(effect.effect_type));
            }
            resolved.extend(chosen);
        }
        Ok(resolved)
    }

    fn damage(state: &mut GameState, amount: u32, targets: &[Target]) -> Vec<Target> {
        for &target in targets {
            match target {
                Target::Unit(id) => {
                    DamageSystem::apply_damage(state, None, DamageTarget::Unit(id), amount);
                }
                Target::Player(p) => {
                    DamageSystem::apply_damage(state, None, DamageTarget::Player(p), amount);
                }
                Target::Position(pos) => {
                    let occupants: SmallVec<[_; 4]> = state.grid().occupants(pos).iter().copied().collect();
                    for id in occupants {
                        DamageSystem::apply_damage(state, None, DamageTarget::Unit(id), amount);
                    }
                }
                Target::Card(_) => {}
            }
        }
        targets.to_vec()
    }

    fn heal(state: &mut GameState, amount: u32, caster: PlayerId, mut targets: Vec<Target>) -> Vec<Target> {
        if targets.is_empty() {
            targets.push(Target::Player(caster));
        }
        for &target in &targets {
            match target {
                Target::Unit(id) => {
                    DamageSystem::heal(state, DamageTarget::Unit(id), amount);
                }
                Target::Player(p) => {
                    DamageSystem::heal(state, DamageTarget::Player(p), amount);
                }
                Target::Position(_) | Target::Card(_) => {}
            }
        }
        targets
    }

    fn draw(state: &mut GameState, effect: &SpellEffect, caster: PlayerId, targets: Vec<Target>) -> Vec<Target> {
        let deck = effect.parameters.deck.unwrap_or(DeckKind::Spellbook);
        let mut players: Vec<PlayerId> = targets
            .iter()
            .filter_map(|t| match t {
                Target::Player(p) => Some(*p),
                _ => None,
            })
            .collect();
        if players.is_empty() {
            players.push(caster);
        }
        for &player in &players {
            for _ in 0..effect.amount() {
                // Empty deck: no-op here; deck-out is a turn-draw rule.
                state.draw(player, deck);
            }
        }
        players.into_iter().map(Target::Player).collect()
    }

    fn summon(
        state: &mut GameState,
        effect: &SpellEffect,
        caster: PlayerId,
        targets: &[Target],
    ) -> Result<Vec<Target>, EffectError> {
        let params = &effect.parameters;
        let token = Card::token(
            params.token_name.clone().unwrap_or_else(|| "Token".to_string()),
            params.token_power.unwrap_or(1),
            params.token_life.unwrap_or(1),
        );
        let chosen = targets.iter().find_map(|t| match t {
            Target::Position(p) => Some(*p),
            _ => None,
        });

        let mut placed = Vec::new();
        for _ in 0..effect.amount() {
            let position = match chosen {
                Some(p) => p,
                None => match PositionSystem::legal_unit_positions(state, caster, &token).first() {
                    Some(&(p, _)) => p,
                    None => break,
                },
            };
            match PositionSystem::place_token(state, caster, token.clone(), position) {
                Ok(id) => placed.push(Target::Unit(id)),
                Err(e) if placed.is_empty() => return Err(EffectError::Placement(e)),
                Err(_) => break,
            }
        }
        if placed.is_empty() {
            return Err(EffectError::NoTargets(EffectType::Summon));
        }
        Ok(placed)
    }

    fn modify(
        state: &mut GameState,
        card: &Card,
        effect: &SpellEffect,
        caster: PlayerId,
        targets: Vec<Target>,
    ) -> Vec<Target> {
        let params = &effect.parameters;
        let duration = params.duration.unwrap_or(Duration::Permanent);
        let changes = [
            (ModifierKind::Power, params.power_bonus),
            (ModifierKind::Life, params.life_bonus),
            (ModifierKind::Prevent, params.prevent.min(i32::MAX as u32) as i32),
        ];

        for &target in &targets {
            let Target::Unit(id) = target else {
                continue;
            };
            for (kind, value) in changes {
                if value == 0 {
                    continue;
                }
                let Some(unit) = state.unit_mut(id) else {
                    break;
                };
                unit.modifiers.push(Modifier {
                    kind,
                    value,
                    source: ModifierSource::Spell(card.id),
                    duration,
                    controller: caster,
                });
                let name = unit.card.name.clone();
                state.emit(
                    EventKind::ModifierApplied { unit: id, kind, value },
                    format!("{name} gets {value:+} {kind:?}"),
                );
            }
        }
        targets
    }

    fn move_unit(state: &mut GameState, effect: &SpellEffect, targets: &[Target]) -> Result<Vec<Target>, EffectError> {
        let unit = targets.iter().find_map(|t| match t {
            Target::Unit(id) => Some(*id),
            _ => None,
        });
        let destination = targets.iter().find_map(|t| match t {
            Target::Position(p) => Some(*p),
            _ => None,
        });
        let (Some(unit), Some(destination)) = (unit, destination) else {
            return Err(EffectError::NoTargets(EffectType::Move));
        };

        if let (Some(limit), Some(current)) = (effect.parameters.amount, state.unit(unit)) {
            let distance = MovementEngine::get_distance(current.position(), destination);
            if distance > limit {
                return Err(EffectError::TooFar { distance, limit });
            }
        }
        MovementEngine::relocate(state, unit, destination).map_err(EffectError::Movement)?;
        Ok(vec![Target::Unit(unit), Target::Position(destination)])
    }

    fn destroy(state: &mut GameState, targets: Vec<Target>) -> Vec<Target> {
        for &target in &targets {
            match target {
                Target::Unit(id) => {
                    DamageSystem::destroy_unit(state, id);
                }
                Target::Position(pos) => {
                    if let Some(site) = state.site_at(pos).map(|s| s.id) {
                        PositionSystem::remove_site(state, site);
                    }
                }
                Target::Player(_) | Target::Card(_) => {}
            }
        }
        targets
    }

    fn search(state: &mut GameState, effect: &SpellEffect, caster: PlayerId) -> Vec<Target> {
        let deck = effect.parameters.deck.unwrap_or(DeckKind::Spellbook);
        let filter = effect.parameters.search.unwrap_or(SearchFilter::Any);
        let found = state.take_from_deck(caster, deck, |card| match filter {
            SearchFilter::Any => true,
            SearchFilter::Site => card.kind == CardKind::Site,
            SearchFilter::Unit => card.kind == CardKind::Minion,
            SearchFilter::Element(e) => card.has_element(e),
        });

        match found {
            Some(card) => {
                let name = card.name.clone();
                state.player_mut(caster).hand.add(card);
                state.emit(
                    EventKind::CardSearched {
                        player: caster,
                        deck,
                        card: name.clone(),
                    },
                    format!("{caster} searches their {deck} for {name}"),
                );
            }
            None => debug!(%caster, %deck, "search found nothing"),
        }
        vec![Target::Player(caster)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Placement;
    use crate::cards::{CardId, Element, PlayerDeck};
    use crate::core::{Ruleset, UnitId};
    use std::sync::Arc;

    fn state() -> GameState {
        let deck = PlayerDeck::new(
            Card::avatar(CardId::new(0), "Avatar", 1, 20),
            (0..8)
                .map(|i| Card::minion(CardId::new(10 + i), format!("Grunt {i}"), 0, 1, 1))
                .collect(),
            vec![Card::site(CardId::new(2), "Field").with_element(Element::Earth); 8],
        );
        GameState::new(Ruleset::default(), &deck, &deck, 21)
    }

    fn site() -> Arc<Card> {
        Arc::new(Card::site(CardId::new(2), "Field").with_element(Element::Earth))
    }

    /// Give both players a home site and one 2/3 minion on it.
    fn board(state: &mut GameState) -> (UnitId, UnitId) {
        let mut ids = Vec::new();
        for player in PlayerId::all() {
            let home = state.ruleset().avatar_start(player);
            PositionSystem::place_card(state, player, site(), home, None).unwrap();
            let minion = Arc::new(Card::minion(CardId::new(5), "Knight", 0, 2, 3));
            match PositionSystem::place_card(state, player, minion, home, None).unwrap() {
                Placement::Unit(id) => ids.push(id),
                other => panic!("unexpected {other:?}"),
            }
        }
        (ids[0], ids[1])
    }

    fn spell(text: &str) -> Card {
        Card::magic(CardId::new(99), "Test Spell", 0, text)
    }

    #[test]
    fn test_damage_destroys_unit() {
        let mut state = state();
        let (_, enemy) = board(&mut state);
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Deal 3 damage to target unit."),
            PlayerId::ONE,
            &[Target::Unit(enemy)],
        );
        assert!(result.success, "{:?}", result.error);
        assert!(state.unit(enemy).is_none());
        assert_eq!(state.player(PlayerId::TWO).cemetery.len(), 1);
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.kind, EventKind::UnitDestroyed { unit, .. } if unit == enemy)));
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_damage_to_player() {
        let mut state = state();
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Deal 4 damage to target player."),
            PlayerId::ONE,
            &[Target::Player(PlayerId::TWO)],
        );
        assert!(result.success);
        assert_eq!(state.player(PlayerId::TWO).life, 16);
        assert_eq!(state.statistics().spells_cast, 1);
    }

    #[test]
    fn test_missing_target_fizzles() {
        let mut state = state();
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Deal 3 damage to target unit. Draw 1."),
            PlayerId::ONE,
            &[],
        );
        assert!(!result.success);
        assert_eq!(result.error, Some(EffectError::NoTargets(EffectType::Damage)));
        // The draw after the failed effect never ran.
        assert_eq!(state.player(PlayerId::ONE).hand.len(), 6);
        assert_eq!(state.statistics().spells_fizzled, 1);
    }

    #[test]
    fn test_illegal_target_rejected() {
        let mut state = state();
        let (mine, _) = board(&mut state);
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Deal 1 damage to target enemy unit."),
            PlayerId::ONE,
            &[Target::Unit(mine)],
        );
        assert_eq!(result.error, Some(EffectError::InvalidTarget(Target::Unit(mine))));
        assert_eq!(state.unit(mine).map(|u| u.damage), Some(0));
    }

    #[test]
    fn test_condition_failure_aborts() {
        let mut state = state();
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Draw 1. If you control 3 or more sites, draw 2."),
            PlayerId::ONE,
            &[],
        );
        assert!(!result.success);
        assert!(matches!(result.error, Some(EffectError::ConditionFailed(_))));
        // First draw stays applied.
        assert_eq!(state.player(PlayerId::ONE).hand.len(), 7);
    }

    #[test]
    fn test_all_enemy_units() {
        let mut state = state();
        let (mine, theirs) = board(&mut state);
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Deal 1 damage to each enemy unit."),
            PlayerId::ONE,
            &[],
        );
        assert!(result.success);
        assert_eq!(state.unit(mine).map(|u| u.damage), Some(0));
        assert_eq!(state.unit(theirs).map(|u| u.damage), Some(1));
        // Enemy avatar damage goes to the player.
        assert_eq!(state.player(PlayerId::TWO).life, 19);
    }

    #[test]
    fn test_heal_defaults_to_caster() {
        let mut state = state();
        state.lose_life(PlayerId::ONE, 5);
        let result = SpellEffectSystem::execute_spell(&mut state, &spell("You gain 3 life."), PlayerId::ONE, &[]);
        assert!(result.success);
        assert_eq!(result.targeted, vec![Target::Player(PlayerId::ONE)]);
        assert_eq!(state.player(PlayerId::ONE).life, 18);
    }

    #[test]
    fn test_modify_until_end_of_turn() {
        let mut state = state();
        let (mine, _) = board(&mut state);
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Target unit gets +2/+1 until end of turn."),
            PlayerId::ONE,
            &[Target::Unit(mine)],
        );
        assert!(result.success);
        let unit = state.unit(mine).unwrap();
        assert_eq!(unit.power(), 4);
        assert_eq!(unit.life(), 4);
        assert!(unit.modifiers.iter().all(|m| m.duration == Duration::Turn));
    }

    #[test]
    fn test_summon_tokens_on_controlled_site() {
        let mut state = state();
        board(&mut state);
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Summon two 1/1 Spirit tokens."),
            PlayerId::ONE,
            &[],
        );
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.targeted.len(), 2);
        let tokens = state.units_of(PlayerId::ONE).filter(|u| u.is_token).count();
        assert_eq!(tokens, 2);
    }

    #[test]
    fn test_summon_without_sites_fails() {
        let mut state = state();
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Summon a 1/1 Spirit token."),
            PlayerId::ONE,
            &[],
        );
        assert_eq!(result.error, Some(EffectError::NoTargets(EffectType::Summon)));
    }

    #[test]
    fn test_counter_is_unsupported() {
        let mut state = state();
        let result = SpellEffectSystem::execute_spell(&mut state, &spell("Counter target spell."), PlayerId::ONE, &[]);
        assert_eq!(result.error, Some(EffectError::Unsupported(EffectType::Counter)));
    }

    #[test]
    fn test_search_atlas() {
        let mut state = state();
        let before = state.player(PlayerId::ONE).hand.sites.len();
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Search your atlas for a site card."),
            PlayerId::ONE,
            &[],
        );
        assert!(result.success);
        assert_eq!(state.player(PlayerId::ONE).hand.sites.len(), before + 1);
    }

    #[test]
    fn test_teleport_to_site() {
        let mut state = state();
        let (mine, _) = board(&mut state);
        let far = state.ruleset().avatar_start(PlayerId::TWO);
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Teleport target unit to target site."),
            PlayerId::ONE,
            &[Target::Unit(mine), Target::Position(far)],
        );
        assert!(result.success, "{:?}", result.error);
        assert_eq!(state.unit(mine).map(|u| u.position()), Some(far));
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_destroy_spares_avatars() {
        let mut state = state();
        let avatar = state.avatar(PlayerId::TWO).unwrap().id;
        let result = SpellEffectSystem::execute_spell(
            &mut state,
            &spell("Destroy target unit."),
            PlayerId::ONE,
            &[Target::Unit(avatar)],
        );
        assert_eq!(result.error, Some(EffectError::InvalidTarget(Target::Unit(avatar))));
        assert!(state.avatar(PlayerId::TWO).is_some());
        assert!(!state.is_game_over());
    }

    #[test]
    fn test_empty_group_fizzles() {
        let mut state = state();
        let text = "Destroy all enemy units.";
        assert!(!SpellEffectSystem::is_castable(&state, &spell(text), PlayerId::ONE));

        let result = SpellEffectSystem::execute_spell(&mut state, &spell(text), PlayerId::ONE, &[]);
        assert!(!result.success);
        assert!(result.targeted.is_empty());
        assert_eq!(result.error, Some(EffectError::NoTargets(EffectType::Destroy)));
        assert_eq!(state.statistics().spells_fizzled, 1);
        assert!(state.avatar(PlayerId::TWO).is_some());

        board(&mut state);
        assert!(SpellEffectSystem::is_castable(&state, &spell(text), PlayerId::ONE));
    }

    #[test]
    fn test_is_castable() {
        let mut state = state();
        assert!(!SpellEffectSystem::is_castable(&state, &spell("Destroy target enemy unit."), PlayerId::ONE));
        board(&mut state);
        assert!(SpellEffectSystem::is_castable(&state, &spell("Destroy target enemy unit."), PlayerId::ONE));
    }
}
