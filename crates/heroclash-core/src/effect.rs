//! Timed status effects and the per-battle effect table.
//!
//! A status effect is a timed modifier attached to one combatant: a flat
//! damage contribution added to that combatant's outgoing damage each turn it
//! is active, plus a multiplicative modifier applied after it. Effects last
//! exactly [`EFFECT_DURATION_TURNS`] full turns and never stack: applying an
//! effect of a kind the combatant already carries replaces the old instance.
//!
//! Reading totals ([`StatusEffectTable::active_totals`]) is a pure operation;
//! expiry pruning happens in the separate [`StatusEffectTable::tick`] step so
//! reads never mutate. `tick` must run once per combatant per turn, before
//! that turn's totals are consulted, which yields the "active on the turn it
//! was applied and the one after, gone on the second turn after" timeline.
//!
//! # Example
//!
//! ```
//! use heroclash_core::combatant::CombatantId;
//! use heroclash_core::effect::{EffectKind, StatusEffect, StatusEffectTable};
//!
//! let target = CombatantId::new(1);
//! let mut table = StatusEffectTable::new();
//! table.apply(target, StatusEffect::new(EffectKind::Burn, 3));
//!
//! assert_eq!(table.active_totals(target, 3).damage, 5);
//! assert_eq!(table.active_totals(target, 4).damage, 5);
//! table.tick(target, 5);
//! assert_eq!(table.active_totals(target, 5).damage, 0);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;

/// Number of full turns a freshly applied effect stays active.
pub const EFFECT_DURATION_TURNS: u32 = 2;

// =============================================================================
// EffectKind
// =============================================================================

/// The closed vocabulary of status effects a judge verdict may name.
///
/// Unknown wire tokens decode to [`EffectKind::None`]; the per-kind tick
/// damage and outgoing-damage modifier are fixed constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// No effect.
    None,
    /// Dazed: no tick damage, heavily dampened output.
    Stun,
    /// On fire: strongest tick damage, slightly dampened output.
    Burn,
    /// Frozen: moderate tick damage, dampened output.
    Freeze,
    /// Bleeding: steady tick damage, dampened output.
    Bleed,
    /// Weakened: no tick damage, strongly dampened output.
    Weakness,
}

impl EffectKind {
    /// Flat damage this effect contributes per active turn.
    #[must_use]
    pub const fn tick_damage(self) -> u32 {
        match self {
            Self::Burn => 5,
            Self::Bleed => 4,
            Self::Freeze => 3,
            Self::None | Self::Stun | Self::Weakness => 0,
        }
    }

    /// Multiplicative modifier applied to the carrier's outgoing damage.
    #[must_use]
    pub const fn outgoing_modifier(self) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Stun => 0.7,
            Self::Burn => 0.9,
            Self::Freeze => 0.8,
            Self::Bleed => 0.85,
            Self::Weakness => 0.75,
        }
    }

    /// Parses a wire token (case-insensitive). Returns `None` for anything
    /// outside the closed set.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "STUN" => Some(Self::Stun),
            "BURN" => Some(Self::Burn),
            "FREEZE" => Some(Self::Freeze),
            "BLEED" => Some(Self::Bleed),
            "WEAKNESS" => Some(Self::Weakness),
            _ => None,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::None => "NONE",
            Self::Stun => "STUN",
            Self::Burn => "BURN",
            Self::Freeze => "FREEZE",
            Self::Bleed => "BLEED",
            Self::Weakness => "WEAKNESS",
        };
        write!(f, "{token}")
    }
}

// =============================================================================
// StatusEffect
// =============================================================================

/// One timed effect instance attached to a combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    kind: EffectKind,
    damage: u32,
    modifier: f64,
    applied_turn: u32,
    expires_turn: u32,
}

impl StatusEffect {
    /// Creates an effect of the given kind applied at `turn`, using the
    /// per-kind constant tables and the fixed duration.
    #[must_use]
    pub fn new(kind: EffectKind, turn: u32) -> Self {
        Self {
            kind,
            damage: kind.tick_damage(),
            modifier: kind.outgoing_modifier(),
            applied_turn: turn,
            expires_turn: turn + EFFECT_DURATION_TURNS,
        }
    }

    /// Returns this effect's kind.
    #[must_use]
    pub const fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Returns the flat per-turn damage contribution.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Returns the outgoing-damage modifier.
    #[must_use]
    pub const fn modifier(&self) -> f64 {
        self.modifier
    }

    /// Returns the turn this effect was applied.
    #[must_use]
    pub const fn applied_turn(&self) -> u32 {
        self.applied_turn
    }

    /// Returns the first turn on which this effect is no longer active.
    #[must_use]
    pub const fn expires_turn(&self) -> u32 {
        self.expires_turn
    }

    /// Returns true while the effect is active at `turn`.
    #[must_use]
    pub const fn is_active(&self, turn: u32) -> bool {
        turn < self.expires_turn
    }
}

// =============================================================================
// StatusEffectTable
// =============================================================================

/// Aggregated contributions of a combatant's active effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTotals {
    /// Sum of per-turn damage contributions.
    pub damage: u32,
    /// Product of outgoing-damage modifiers.
    pub modifier: f64,
}

impl Default for EffectTotals {
    fn default() -> Self {
        Self {
            damage: 0,
            modifier: 1.0,
        }
    }
}

/// Per-battle collection of both combatants' timed effects.
///
/// At most one effect of a given kind is live per combatant at any time:
/// [`StatusEffectTable::apply`] replaces, never stacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusEffectTable {
    effects: HashMap<CombatantId, Vec<StatusEffect>>,
}

impl StatusEffectTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `effect` to `owner`, replacing any existing effect of the
    /// same kind. Idempotent with respect to kind; no error conditions.
    pub fn apply(&mut self, owner: CombatantId, effect: StatusEffect) {
        let effects = self.effects.entry(owner).or_default();
        effects.retain(|e| e.kind() != effect.kind());
        effects.push(effect);
    }

    /// Removes every effect of `owner` whose expiry turn has been reached.
    ///
    /// Must be called exactly once per combatant per turn, before that
    /// turn's [`Self::active_totals`] read.
    pub fn tick(&mut self, owner: CombatantId, current_turn: u32) {
        if let Some(effects) = self.effects.get_mut(&owner) {
            effects.retain(|e| e.expires_turn() > current_turn);
        }
    }

    /// Sums the active contributions for `owner` at `current_turn`.
    ///
    /// Pure read: an empty (or fully expired) set yields damage 0 and
    /// modifier 1.0.
    #[must_use]
    pub fn active_totals(&self, owner: CombatantId, current_turn: u32) -> EffectTotals {
        self.active(owner, current_turn)
            .fold(EffectTotals::default(), |acc, effect| EffectTotals {
                damage: acc.damage + effect.damage(),
                modifier: acc.modifier * effect.modifier(),
            })
    }

    /// Iterates the effects of `owner` active at `current_turn`.
    pub fn active(
        &self,
        owner: CombatantId,
        current_turn: u32,
    ) -> impl Iterator<Item = &StatusEffect> + '_ {
        self.effects
            .get(&owner)
            .into_iter()
            .flatten()
            .filter(move |e| e.is_active(current_turn))
    }
}

// =============================================================================
// Tests
// =============================================================================
