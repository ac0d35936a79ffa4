//! Card text to `SpellEffect` compiler.
//!
//! The parser recognises a constrained sublanguage of common ability
//! patterns. It is pure and deterministic: the same text always yields the
//! same effects.
//!
//! ## Pipeline
//!
//! 1. Split text into clauses on `.`, `;`, `:` and newlines. A cost such
//!    as `Sacrifice a unit:` becomes its own clause ahead of the effect.
//! 2. Peel off a gating condition (`If you control 3 or more sites, ...`
//!    or a trailing `... if an opponent has 5 or less life`).
//! 3. Normalise the clause into lowercase word tokens.
//! 4. Classify the clause by keyword and hand it to a per-type extractor
//!    for numbers, targets, restrictions and durations.
//!
//! Clauses that match nothing produce no effect. They are reported through
//! `parse_with_diagnostics` so the fidelity gap can be measured. Keyword
//! clauses (`Airborne`, `Movement +1`, ...) are card keywords, not effects,
//! and are skipped silently.

use smallvec::SmallVec;
use tracing::debug;

use super::effect::{
    Comparison, ConditionCheck, ConditionProperty, ConditionTarget, Duration, EffectType,
    Restriction, SearchFilter, SpellEffect, TargetKind, TargetSpecification,
};
use crate::cards::Element;
use crate::core::DeckKind;

const KEYWORDS: &[&str] = &["airborne", "burrowing", "submerge", "voidwalk", "aquatic", "movement"];

/// Words that end a target's trailing qualifier ("with power 2 or less").
const PHRASE_STOPS: &[&str] = &[
    "and", "then", "target", "gets", "get", "gains", "gain", "while", "until", "to", "this", "if",
    "deals", "deal", "for", "as",
];

/// Parse output with the clauses that matched no pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedText {
    pub effects: Vec<SpellEffect>,
    pub unparsed: Vec<String>,
}

/// Card text parser.
pub struct SpellParser;

impl SpellParser {
    /// Parse card text into effects in textual order.
    ///
    /// ```
    /// use realm_sim::effects::{EffectType, SpellParser};
    ///
    /// let effects = SpellParser::parse("Draw 2.");
    /// assert_eq!(effects[0].effect_type, EffectType::Draw);
    /// assert_eq!(effects[0].parameters.amount, Some(2));
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Vec<SpellEffect> {
        Self::parse_with_diagnostics(text).effects
    }

    /// Parse card text, also returning unrecognised clauses.
    #[must_use]
    pub fn parse_with_diagnostics(text: &str) -> ParsedText {
        let mut parsed = ParsedText::default();

        for clause in text.split(['.', ';', ':', '\n']) {
            let clause = clause.trim();
            if clause.is_empty() || is_keyword_clause(clause) {
                continue;
            }
            match parse_clause(clause) {
                Some(effect) => parsed.effects.push(effect),
                None => {
                    debug!(clause, "unparsed card text");
                    parsed.unparsed.push(clause.to_string());
                }
            }
        }
        parsed
    }
}

/// Lowercase word tokens; keeps `+`, `-` and `/` for stat tokens.
fn words(text: &str) -> Vec<String> {
    text.to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '/') {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn is_keyword_clause(clause: &str) -> bool {
    let w = words(clause);
    !w.is_empty()
        && w.iter()
            .all(|word| KEYWORDS.contains(&word.as_str()) || word.starts_with('+') || word.parse::<u32>().is_ok())
}

fn parse_number_word(word: &str) -> Option<u32> {
    if let Ok(value) = word.parse::<u32>() {
        return Some(value);
    }
    match word {
        "a" | "an" | "one" | "once" => Some(1),
        "two" | "twice" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        _ => None,
    }
}

fn has(words: &[String], word: &str) -> bool {
    words.iter().any(|w| w == word)
}

fn has_any(words: &[String], options: &[&str]) -> bool {
    words.iter().any(|w| options.contains(&w.as_str()))
}

fn position_of(words: &[String], options: &[&str]) -> Option<usize> {
    words.iter().position(|w| options.contains(&w.as_str()))
}

/// Number directly after the first of `options`.
fn number_after(words: &[String], options: &[&str]) -> Option<u32> {
    let i = position_of(words, options)?;
    words.get(i + 1).and_then(|w| parse_number_word(w))
}

/// Number directly before the first of `options`.
fn number_before(words: &[String], options: &[&str]) -> Option<u32> {
    let i = position_of(words, options)?;
    i.checked_sub(1)
        .and_then(|j| words.get(j))
        .and_then(|w| parse_number_word(w))
}

fn element_of(word: &str) -> Option<Element> {
    match word {
        "air" | "airy" => Some(Element::Air),
        "earth" | "earthy" => Some(Element::Earth),
        "fire" | "fiery" => Some(Element::Fire),
        "water" | "watery" => Some(Element::Water),
        _ => None,
    }
}

/// Split off a leading `if ..., ` or trailing `... if ...` condition.
///
/// Returns `(effect text, condition text)`.
fn split_condition(clause: &str) -> (String, Option<String>) {
    let lower = clause.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("if ") {
        if let Some((cond, body)) = rest.split_once(',') {
            return (body.trim().to_string(), Some(cond.trim().to_string()));
        }
    }
    if let Some((body, cond)) = lower.split_once(" if ") {
        return (body.trim().to_string(), Some(cond.trim().to_string()));
    }
    (lower, None)
}

/// Parse condition words such as `you control 3 or more sites`.
fn parse_condition(text: &str) -> Option<ConditionCheck> {
    let w = words(text);
    let target = if has_any(&w, &["opponent", "opponents"]) {
        ConditionTarget::Opponent
    } else {
        ConditionTarget::Caster
    };

    let (value_index, value) = w.iter().enumerate().find_map(|(i, word)| {
        if matches!(word.as_str(), "a" | "an") {
            return None;
        }
        parse_number_word(word).map(|v| (i, v))
    })?;

    let tail = &w[value_index + 1..];
    let before = &w[..value_index];
    let followed_by = |word: &str| tail.first().is_some_and(|x| x == "or") && tail.get(1).is_some_and(|x| x == word);
    let operator = if followed_by("more") || has(before, "least") {
        Comparison::AtLeast
    } else if followed_by("less") || followed_by("fewer") || has(before, "most") {
        Comparison::AtMost
    } else if has(before, "exactly") {
        Comparison::Equal
    } else {
        Comparison::AtLeast
    };

    let property = if let Some(element) = w
        .iter()
        .find_map(|word| element_of(word))
        .filter(|_| has_any(&w, &["threshold", "affinity"]))
    {
        ConditionProperty::Affinity(element)
    } else if has_any(&w, &["site", "sites"]) {
        ConditionProperty::ControlledSites
    } else if has_any(&w, &["unit", "units", "minion", "minions"]) {
        ConditionProperty::UnitCount
    } else if has(&w, "life") {
        ConditionProperty::Life
    } else if has_any(&w, &["card", "cards"]) && has(&w, "hand") {
        ConditionProperty::HandSize
    } else {
        return None;
    };

    Some(ConditionCheck {
        property,
        operator,
        value,
        target,
    })
}

fn parse_clause(clause: &str) -> Option<SpellEffect> {
    let (body, condition_text) = split_condition(clause);
    let condition = match condition_text {
        Some(text) => Some(parse_condition(&text)?),
        None => None,
    };

    let w = words(&body);
    let mut effect = classify(&w)?;
    effect.conditions.extend(condition);
    Some(effect)
}

fn classify(w: &[String]) -> Option<SpellEffect> {
    if counters_something(w) {
        return Some(parse_counter(w));
    }
    if has_any(w, &["search", "tutor"]) {
        return Some(parse_search(w));
    }
    if has(w, "prevent") {
        return parse_prevent(w);
    }
    if has_any(w, &["deal", "deals"]) && has(w, "damage") {
        return parse_damage(w);
    }
    if has_any(w, &["destroy", "sacrifice", "banish"]) {
        return Some(parse_destroy(w));
    }
    if has_any(w, &["summon", "create", "creates"]) {
        return parse_summon(w);
    }
    if has_any(w, &["draw", "draws"]) {
        return Some(parse_draw(w));
    }
    if has_any(w, &["move", "teleport", "moves"]) {
        return Some(parse_move(w));
    }
    if w.iter().any(|word| stat_token(word).is_some()) || !stat_gains(w).is_empty() {
        return parse_modify(w);
    }
    if has_any(w, &["heal", "heals", "restore"]) || (has_any(w, &["gain", "gains"]) && has(w, "life")) {
        return parse_heal(w);
    }
    None
}

/// `counter`/`cancel` used as a verb ("counter target spell"), not as a
/// noun ("put a +1 counter on ...").
fn counters_something(w: &[String]) -> bool {
    const OBJECTS: &[&str] = &["target", "that", "it", "the", "all", "each", "a", "an"];
    let verb = |word: &String| matches!(word.as_str(), "counter" | "cancel");
    w.first().is_some_and(verb) || w.windows(2).any(|p| verb(&p[0]) && OBJECTS.contains(&p[1].as_str()))
}

/// Written-out stat gains on units: "gains 2 power", "gain 1 power and 2
/// life". Life alone only counts when a unit receives it; "you gain 3
/// life" is healing.
fn stat_gains(w: &[String]) -> Vec<(usize, u32)> {
    if !has_any(w, &["gain", "gains"]) {
        return Vec::new();
    }
    let unit_receives = w.iter().any(|word| noun_kind(word) == Some(TargetKind::Unit));
    let gains: Vec<_> = (1..w.len().saturating_sub(1))
        .filter(|&i| matches!(w[i - 1].as_str(), "gain" | "gains" | "and"))
        .filter(|&i| matches!(w[i + 1].as_str(), "power" | "life"))
        .filter_map(|i| parse_number_word(&w[i]).map(|n| (i + 1, n)))
        .collect();
    if unit_receives || gains.iter().any(|&(at, _)| w[at] == "power") {
        gains
    } else {
        Vec::new()
    }
}

/// Read `+N/+M`, `+N` or `-N` stat tokens.
fn stat_token(word: &str) -> Option<(i32, Option<i32>)> {
    if !(word.starts_with('+') || word.starts_with('-')) {
        return None;
    }
    let signed = |s: &str| -> Option<i32> {
        let (neg, digits) = match s.strip_prefix('-') {
            Some(d) => (true, d),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let value: i32 = digits.parse().ok()?;
        Some(if neg { -value } else { value })
    };
    match word.split_once('/') {
        Some((p, l)) => Some((signed(p)?, Some(signed(l)?))),
        None => Some((signed(word)?, None)),
    }
}

/// Read a `P/L` token such as `2/2`.
fn stat_line(word: &str) -> Option<(u32, u32)> {
    let (p, l) = word.split_once('/')?;
    Some((p.parse().ok()?, l.parse().ok()?))
}

fn noun_kind(word: &str) -> Option<TargetKind> {
    match word {
        "unit" | "units" | "minion" | "minions" | "creature" | "creatures" | "avatar" => {
            Some(TargetKind::Unit)
        }
        "player" | "players" | "opponent" | "opponents" => Some(TargetKind::Player),
        "site" | "sites" | "square" | "squares" | "location" | "locations" => Some(TargetKind::Position),
        "spell" | "spells" | "card" | "cards" => Some(TargetKind::Card),
        _ => None,
    }
}

/// Extract every target phrase in a clause.
fn parse_targets(w: &[String]) -> Vec<TargetSpecification> {
    let mut specs = Vec::new();
    let mut i = 0;
    while i < w.len() {
        let word = w[i].as_str();
        let all = matches!(word, "all" | "each" | "every");
        if word != "target" && !all {
            i += 1;
            continue;
        }

        // "up to two target units" / "two target units"
        let (count, optional) = if all {
            (super::effect::ALL_TARGETS, false)
        } else {
            let prev = i.checked_sub(1).and_then(|j| w.get(j));
            let prev2 = i.checked_sub(2).and_then(|j| w.get(j));
            let up_to = i.checked_sub(3).and_then(|j| w.get(j)).is_some_and(|x| x == "up")
                && prev2.is_some_and(|x| x == "to");
            match prev.and_then(|p| parse_number_word(p)) {
                Some(n) if !matches!(prev.map(String::as_str), Some("a" | "an")) => (n, up_to),
                _ => (1, false),
            }
        };

        // Scan forward to the noun, collecting adjectives.
        let mut restrictions: SmallVec<[Restriction; 2]> = SmallVec::new();
        let mut kind = None;
        let mut j = i + 1;
        while j < w.len() && j <= i + 4 {
            let next = w[j].as_str();
            if let Some(k) = noun_kind(next) {
                kind = Some(k);
                if matches!(next, "opponent" | "opponents") {
                    restrictions.push(Restriction::Opponent);
                }
                break;
            }
            match next {
                "enemy" | "opposing" | "hostile" => restrictions.push(Restriction::Opponent),
                "friendly" | "allied" | "your" => restrictions.push(Restriction::Friendly),
                other => {
                    if let Some(element) = element_of(other) {
                        restrictions.push(Restriction::Element(element));
                    }
                }
            }
            j += 1;
        }

        if let Some(kind) = kind {
            let tail = &w[j + 1..];
            let phrase_end = tail
                .iter()
                .position(|x| PHRASE_STOPS.contains(&x.as_str()))
                .unwrap_or(tail.len());
            let phrase = &tail[..phrase_end];
            if kind == TargetKind::Unit {
                if phrase.windows(2).any(|p| p[0] == "you" && p[1] == "control") {
                    restrictions.push(Restriction::Friendly);
                }
                if phrase.windows(3).any(|p| p[0] == "an" && p[1] == "opponent" && p[2] == "controls")
                    || phrase.windows(2).any(|p| p[0] == "opponent" && p[1] == "controls")
                {
                    restrictions.push(Restriction::Opponent);
                }
                if let Some(k) = phrase.iter().position(|x| x == "power") {
                    if let Some(n) = phrase.get(k + 1).and_then(|x| parse_number_word(x)) {
                        let rest = &phrase[k + 2..];
                        if rest.first().is_some_and(|x| x == "or") && rest.get(1).is_some_and(|x| x == "more") {
                            restrictions.push(Restriction::PowerAtLeast(n));
                        } else {
                            restrictions.push(Restriction::PowerAtMost(n));
                        }
                    }
                }
            }
            let mut spec = TargetSpecification {
                kind,
                count,
                restrictions: SmallVec::new(),
                optional,
            };
            for r in restrictions {
                spec = spec.with_restriction(r);
            }
            specs.push(spec);
            i = j + 1;
        } else {
            i += 1;
        }
    }

    if specs.is_empty() {
        specs.extend(implicit_group(w));
    }
    specs
}

/// "units you control", "friendly minions", "enemy units" without a
/// determiner mean every such unit.
fn implicit_group(w: &[String]) -> Option<TargetSpecification> {
    let unit_at = position_of(w, &["units", "minions", "creatures"])?;
    let before = &w[..unit_at];
    let after = &w[unit_at + 1..];
    let spec = TargetSpecification::all(TargetKind::Unit);
    if has_any(before, &["friendly", "allied", "your"])
        || after.windows(2).any(|p| p[0] == "you" && p[1] == "control")
    {
        Some(spec.with_restriction(Restriction::Friendly))
    } else if has_any(before, &["enemy", "opposing"]) || has(after, "opponent") {
        Some(spec.with_restriction(Restriction::Opponent))
    } else {
        None
    }
}

fn parse_damage(w: &[String]) -> Option<SpellEffect> {
    let amount = number_before(w, &["damage"])?;
    let mut effect = SpellEffect::new(EffectType::Damage).with_amount(amount);
    let damage_at = position_of(w, &["damage"]).unwrap_or(0);
    effect.targets = parse_targets(&w[damage_at..]);
    if effect.targets.is_empty() {
        effect.targets.push(TargetSpecification::single(TargetKind::Unit));
    }
    Some(effect)
}

fn parse_heal(w: &[String]) -> Option<SpellEffect> {
    let amount = number_after(w, &["heal", "heals", "gain", "gains", "restore"])
        .or_else(|| number_before(w, &["life", "damage"]))?;
    let mut effect = SpellEffect::new(EffectType::Heal).with_amount(amount);
    effect.targets = parse_targets(w);
    Some(effect)
}

fn parse_draw(w: &[String]) -> SpellEffect {
    let amount = number_after(w, &["draw", "draws"]).unwrap_or(1);
    let mut effect = SpellEffect::new(EffectType::Draw).with_amount(amount);
    effect.parameters.deck = Some(if has_any(w, &["site", "sites", "atlas"]) {
        DeckKind::Atlas
    } else {
        DeckKind::Spellbook
    });
    if has_any(w, &["target", "each"]) {
        effect.targets = parse_targets(w);
    }
    effect
}

fn parse_summon(w: &[String]) -> Option<SpellEffect> {
    let stat_at = w.iter().position(|word| stat_line(word).is_some())?;
    let (power, life) = stat_line(&w[stat_at])?;
    let token_at = position_of(w, &["token", "tokens"]).unwrap_or(w.len());
    let name = w
        .get(stat_at + 1..token_at.max(stat_at + 1))
        .unwrap_or(&[])
        .iter()
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ");
    let count = stat_at
        .checked_sub(1)
        .and_then(|i| parse_number_word(&w[i]))
        .unwrap_or(1);

    let mut effect = SpellEffect::new(EffectType::Summon).with_amount(count);
    effect.parameters.token_name = Some(if name.is_empty() { "Token".to_string() } else { name });
    effect.parameters.token_power = Some(power);
    effect.parameters.token_life = Some(life);
    effect.targets.push(TargetSpecification {
        optional: true,
        ..TargetSpecification::single(TargetKind::Position)
    });
    Some(effect)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn parse_duration(w: &[String]) -> Option<Duration> {
    let joined = w.join(" ");
    if joined.contains("until end of turn") || joined.contains("this turn") || joined.contains("until the end of turn") {
        return Some(Duration::Turn);
    }
    let cond_at = joined
        .find("while ")
        .map(|i| i + "while ".len())
        .or_else(|| joined.find("as long as ").map(|i| i + "as long as ".len()));
    if let Some(start) = cond_at {
        return parse_condition(&joined[start..]).map(Duration::Conditional);
    }
    Some(Duration::Permanent)
}

fn parse_modify(w: &[String]) -> Option<SpellEffect> {
    let mut effect = SpellEffect::new(EffectType::Modify);
    for (i, word) in w.iter().enumerate() {
        let Some((first, second)) = stat_token(word) else {
            continue;
        };
        match second {
            Some(life) => {
                effect.parameters.power_bonus += first;
                effect.parameters.life_bonus += life;
            }
            None => match w.get(i + 1).map(String::as_str) {
                Some("life") => effect.parameters.life_bonus += first,
                _ => effect.parameters.power_bonus += first,
            },
        }
    }
    for (at, amount) in stat_gains(w) {
        let amount = amount as i32;
        if w[at] == "life" {
            effect.parameters.life_bonus += amount;
        } else {
            effect.parameters.power_bonus += amount;
        }
    }
    effect.parameters.duration = Some(parse_duration(w)?);
    effect.targets = parse_targets(w);
    if effect.targets.is_empty() {
        effect.targets.push(TargetSpecification::single(TargetKind::Unit));
    }
    Some(effect)
}

fn parse_prevent(w: &[String]) -> Option<SpellEffect> {
    let amount = number_before(w, &["damage"])
        .or_else(|| number_after(w, &["next"]))
        .or_else(|| has(w, "all").then_some(super::effect::ALL_TARGETS))?;
    let mut effect = SpellEffect::new(EffectType::Modify);
    effect.parameters.prevent = amount;
    effect.parameters.duration = Some(match parse_duration(w)? {
        Duration::Permanent => Duration::Turn,
        other => other,
    });
    effect.targets = parse_targets(w);
    if effect.targets.is_empty() {
        effect.targets.push(TargetSpecification::single(TargetKind::Unit));
    }
    Some(effect)
}

fn parse_destroy(w: &[String]) -> SpellEffect {
    let mut effect = SpellEffect::new(EffectType::Destroy);
    let mut targets = parse_targets(w);
    if targets.is_empty() {
        let mut spec = TargetSpecification::single(TargetKind::Unit);
        if has(w, "sacrifice") {
            spec = spec.with_restriction(Restriction::Friendly);
        }
        targets.push(spec);
    }
    effect.targets = targets
        .into_iter()
        .map(|spec| match spec.kind {
            TargetKind::Unit => spec.with_restriction(Restriction::NonAvatar),
            _ => spec,
        })
        .collect();
    effect
}

fn parse_move(w: &[String]) -> SpellEffect {
    let mut effect = SpellEffect::new(EffectType::Move);
    effect.parameters.amount = number_before(w, &["square", "squares", "space", "spaces", "step", "steps"]);
    let mut targets = parse_targets(w);
    if !targets.iter().any(|t| t.kind == TargetKind::Unit) {
        targets.insert(0, TargetSpecification::single(TargetKind::Unit));
    }
    if !targets.iter().any(|t| t.kind == TargetKind::Position) {
        targets.push(TargetSpecification::single(TargetKind::Position));
    }
    effect.targets = targets;
    effect
}

fn parse_counter(w: &[String]) -> SpellEffect {
    let mut effect = SpellEffect::new(EffectType::Counter);
    effect.targets = parse_targets(w);
    if effect.targets.is_empty() {
        effect.targets.push(TargetSpecification::single(TargetKind::Card));
    }
    effect
}

fn parse_search(w: &[String]) -> SpellEffect {
    let mut effect = SpellEffect::new(EffectType::Search).with_amount(1);
    effect.parameters.deck = Some(if has(w, "atlas") {
        DeckKind::Atlas
    } else {
        DeckKind::Spellbook
    });
    let after_for = position_of(w, &["for"]).map_or(w, |i| &w[i + 1..]);
    let filter = if let Some(element) = after_for.iter().find_map(|x| element_of(x)) {
        SearchFilter::Element(element)
    } else if has_any(after_for, &["site", "sites"]) {
        SearchFilter::Site
    } else if has_any(after_for, &["unit", "units", "minion", "minions"]) {
        SearchFilter::Unit
    } else {
        SearchFilter::Any
    };
    if filter == SearchFilter::Site {
        effect.parameters.deck = Some(DeckKind::Atlas);
    }
    effect.parameters.search = Some(filter);
    effect
}
