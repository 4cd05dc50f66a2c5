//! The damage-resolution pipeline: a proposed action in, a final outcome out.
//!
//! Resolution is a pure function of its inputs: the proposed action, both
//! combatants' public state, the status-effect table, the previous action,
//! the actor's combo chain, the judge's verdict, and the dice. The engine
//! rolls the dice, fetches the verdict, and applies the returned
//! [`Resolution`]; nothing in here touches engine state.
//!
//! # Pipeline order
//!
//! The modifier order is fixed. Steps 2–4 floor at each step; steps 5–7
//! compound in `f64` with a single final floor in step 8, which keeps the
//! full-meter/uncharged SPECIAL outcomes in an exact 1.5 : 0.7 ratio before
//! flooring.
//!
//! 1. Hit/crit roll (a miss short-circuits everything below)
//! 2. `damage = ⌊base_power × judge multiplier⌋`
//! 3. Critical: `damage = ⌊damage × 1.5⌋`
//! 4. Tick + read the *attacker's* status effects: add their flat damage,
//!    then `damage = ⌊damage × compound modifier⌋`
//! 5. SPECIAL gating and meter bookkeeping
//! 6. Combo chain
//! 7. Opposing-stance interaction (previous DEFEND halves, COUNTER dampens)
//! 8. `final = max(1, ⌊damage⌋)`
//! 9. A non-NONE verdict effect attaches to the *defender*

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionKind, JudgeVerdict, Stance};
use crate::combatant::{Combatant, FULL_METER};
use crate::effect::{EffectKind, StatusEffect, StatusEffectTable};
use crate::record::ResolvedAction;

/// Critical hits multiply damage by this factor.
pub const CRIT_MULTIPLIER: f64 = 1.5;

/// Bonus for a SPECIAL fired at full meter.
pub const SPECIAL_FULL_BONUS: f64 = 1.5;

/// Penalty for a SPECIAL fired below full meter.
pub const SPECIAL_UNCHARGED_PENALTY: f64 = 0.7;

/// Combo chain length at which the damage bonus kicks in.
pub const COMBO_THRESHOLD: u32 = 3;

/// Damage bonus for a sustained offensive combo.
pub const COMBO_BONUS: f64 = 1.2;

/// Damage factor against an opponent who just defended.
pub const DEFEND_REDUCTION: f64 = 0.5;

/// Damage factor against an opponent who just countered.
pub const COUNTER_REDUCTION: f64 = 0.7;

/// Meter gained by a landed offensive non-SPECIAL action.
pub const OFFENSIVE_METER_GAIN: u32 = 15;

/// Meter gained by a landed defensive or tactical non-SPECIAL action.
pub const GUARDED_METER_GAIN: u32 = 10;

/// Commentary recorded for a missed action.
pub const MISS_COMMENTARY: &str = "The attack goes wide and finds nothing but air.";

// =============================================================================
// Hit / crit chances
// =============================================================================

/// Percent chance for an action of this kind to land.
#[must_use]
pub const fn hit_chance(kind: ActionKind) -> u32 {
    match kind {
        ActionKind::Attack => 90,
        ActionKind::Defend => 100,
        ActionKind::Counter => 93,
        ActionKind::Special => 95,
        ActionKind::Dodge => 97,
    }
}

/// Percent chance for a landed action to crit, given the actor's meter.
///
/// From meter 50 upward the chance climbs linearly, up to +25 points at a
/// full meter. DEFEND never crits regardless of meter.
#[must_use]
pub const fn crit_chance(kind: ActionKind, meter: u32) -> u32 {
    let base = match kind {
        ActionKind::Attack => 10,
        ActionKind::Defend => return 0,
        ActionKind::Counter => 15,
        ActionKind::Special => 18,
        ActionKind::Dodge => 5,
    };
    let meter_bonus = if meter >= 50 { (meter - 50) / 2 } else { 0 };
    base + meter_bonus
}

/// The dice for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    /// Whether the action lands.
    pub hit: bool,
    /// Whether the landed action crits (never true on a miss).
    pub crit: bool,
}

impl RollOutcome {
    /// A forced clean hit without a crit.
    pub const HIT: Self = Self {
        hit: true,
        crit: false,
    };

    /// A forced critical hit.
    pub const CRIT: Self = Self {
        hit: true,
        crit: true,
    };

    /// A forced miss.
    pub const MISS: Self = Self {
        hit: false,
        crit: false,
    };
}

/// Rolls hit and crit for an action of `kind` by an actor at `meter`.
pub fn roll<R: Rng>(rng: &mut R, kind: ActionKind, meter: u32) -> RollOutcome {
    let hit = rng.gen_range(0..100) < hit_chance(kind);
    let crit = hit && rng.gen_range(0..100) < crit_chance(kind, meter);
    RollOutcome { hit, crit }
}

// =============================================================================
// Resolution
// =============================================================================

/// Everything the resolution pipeline needs to know about the turn.
#[derive(Debug)]
pub struct TurnInput<'a> {
    /// The proposed action.
    pub action: &'a Action,
    /// The acting combatant.
    pub attacker: &'a Combatant,
    /// The opposing combatant.
    pub defender: &'a Combatant,
    /// The previous turn's committed action, if any.
    pub last_action: Option<&'a ResolvedAction>,
    /// The attacker's combo chain length before this turn.
    pub combo: u32,
    /// The turn being resolved (1-based).
    pub turn: u32,
}

/// The resolved outcome the engine applies.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Final damage dealt to the defender (0 exactly on a miss).
    pub damage: u32,
    /// Whether the hit was critical.
    pub crit: bool,
    /// Whether the action missed.
    pub miss: bool,
    /// Effect inflicted on the defender ([`EffectKind::None`] if none).
    pub effect: EffectKind,
    /// The attacker's special meter after this turn.
    pub attacker_meter: u32,
    /// The attacker's combo chain after this turn.
    pub combo: u32,
    /// Judge commentary (or the stock miss line).
    pub commentary: String,
}

/// Resolves one turn.
///
/// Mutates `effects` only as resolution demands: ticking the attacker's
/// table for the current turn, and attaching the verdict's effect to the
/// defender. Everything else is reported back in the [`Resolution`] for the
/// engine to apply.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // damage values stay far below 2^32
pub fn resolve(
    input: &TurnInput<'_>,
    verdict: &JudgeVerdict,
    effects: &mut StatusEffectTable,
    rolls: RollOutcome,
) -> Resolution {
    let action = input.action;

    // A miss short-circuits the whole pipeline: no damage, no effect, no
    // meter movement, combo broken.
    if !rolls.hit {
        return Resolution {
            damage: 0,
            crit: false,
            miss: true,
            effect: EffectKind::None,
            attacker_meter: input.attacker.special_meter(),
            combo: 0,
            commentary: MISS_COMMENTARY.to_string(),
        };
    }

    // Steps 2-3: judge multiplier, then the critical bonus.
    let mut damage = (f64::from(action.base_power()) * verdict.multiplier()).floor() as u32;
    if rolls.crit {
        damage = (f64::from(damage) * CRIT_MULTIPLIER).floor() as u32;
    }

    // Step 4: the attacker's own effects. Tick first so "lasts exactly two
    // full turns" holds, then fold the still-active contributions in.
    let attacker_id = input.attacker.id();
    effects.tick(attacker_id, input.turn);
    let totals = effects.active_totals(attacker_id, input.turn);
    damage += totals.damage;
    damage = (f64::from(damage) * totals.modifier).floor() as u32;

    // Steps 5-7 compound without intermediate flooring.
    let mut staged = f64::from(damage);

    let mut meter = input.attacker.special_meter();
    if action.kind() == ActionKind::Special {
        if meter >= FULL_METER {
            staged *= SPECIAL_FULL_BONUS;
            meter = 0;
        } else {
            staged *= SPECIAL_UNCHARGED_PENALTY;
        }
    } else {
        let gain = match action.stance() {
            Stance::Offensive => OFFENSIVE_METER_GAIN,
            Stance::Defensive | Stance::Tactical => GUARDED_METER_GAIN,
        };
        meter = (meter + gain).min(FULL_METER);
    }

    let mut combo = input.combo;
    if action.stance() == Stance::Offensive {
        combo += 1;
        if combo >= COMBO_THRESHOLD {
            staged *= COMBO_BONUS;
        }
    } else {
        combo = 0;
    }

    if let Some(last) = input.last_action {
        if last.actor() != action.actor() && action.stance() == Stance::Offensive {
            match last.kind() {
                ActionKind::Defend => staged *= DEFEND_REDUCTION,
                ActionKind::Counter => staged *= COUNTER_REDUCTION,
                _ => {}
            }
        }
    }

    // Step 8: a landed action always deals at least 1.
    let final_damage = (staged.floor() as u32).max(1);

    // Step 9: the verdict's effect lands on the defender.
    let effect = verdict.effect();
    if effect != EffectKind::None {
        effects.apply(input.defender.id(), StatusEffect::new(effect, input.turn));
    }

    Resolution {
        damage: final_damage,
        crit: rolls.crit,
        miss: false,
        effect,
        attacker_meter: meter,
        combo,
        commentary: verdict.commentary().to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
