//! Observable battle state: statuses, snapshots, turn records, summaries.
//!
//! Everything in this module is what the outside world (pollers, the
//! persistence sink, subscribers) sees of a battle. [`TurnRecord`]s form the
//! append-only history: immutable once committed, turn indices strictly
//! increasing from 1. [`BattleSnapshot`]s are the point-in-time view, with a
//! *material difference* predicate that suppresses redundant notifications
//! when only bookkeeping fields changed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionKind, Stance};
use crate::combatant::{Combatant, CombatantId};
use crate::effect::{EffectKind, StatusEffectTable};

// =============================================================================
// BattleId
// =============================================================================

/// Identifier for one battle, supplied by the caller at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BattleId(String);

impl BattleId {
    /// Creates a new battle id.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BattleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BattleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BattleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// BattleStatus
// =============================================================================

/// Lifecycle status of a battle. Transitions are one-directional:
/// `Initialized → Active → Ended`; no battle re-enters `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleStatus {
    /// Created but not yet started.
    Initialized,
    /// Turn loop running.
    Active,
    /// Concluded with a winner.
    Ended {
        /// The combatant left standing.
        winner: CombatantId,
    },
}

impl BattleStatus {
    /// Returns true once the battle has concluded.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        matches!(self, Self::Ended { .. })
    }

    /// Returns the winner, if the battle has ended.
    #[must_use]
    pub const fn winner(&self) -> Option<CombatantId> {
        match self {
            Self::Ended { winner } => Some(*winner),
            _ => None,
        }
    }
}

// =============================================================================
// HealthBand
// =============================================================================

/// Coarse presentation banding of a health value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthBand {
    /// Above 75 health.
    Healthy,
    /// 51–75 health.
    Injured,
    /// 26–50 health.
    Wounded,
    /// 1–25 health.
    Critical,
    /// Zero health.
    Defeated,
}

impl HealthBand {
    /// Bands a health value.
    #[must_use]
    pub const fn from_health(health: u32) -> Self {
        match health {
            0 => Self::Defeated,
            1..=25 => Self::Critical,
            26..=50 => Self::Wounded,
            51..=75 => Self::Injured,
            _ => Self::Healthy,
        }
    }
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Healthy => "HEALTHY",
            Self::Injured => "INJURED",
            Self::Wounded => "WOUNDED",
            Self::Critical => "CRITICAL",
            Self::Defeated => "DEFEATED",
        };
        write!(f, "{label}")
    }
}

// =============================================================================
// ResolvedAction
// =============================================================================

/// An action plus its fully resolved outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAction {
    action: Action,
    damage: u32,
    crit: bool,
    miss: bool,
    effect: EffectKind,
    judge_commentary: String,
}

impl ResolvedAction {
    /// Pairs an action with its resolved outcome.
    #[must_use]
    pub fn new(
        action: Action,
        damage: u32,
        crit: bool,
        miss: bool,
        effect: EffectKind,
        judge_commentary: &str,
    ) -> Self {
        Self {
            action,
            damage,
            crit,
            miss,
            effect,
            judge_commentary: judge_commentary.to_string(),
        }
    }

    /// Returns the underlying proposed action.
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// Returns the acting combatant's id.
    #[must_use]
    pub const fn actor(&self) -> CombatantId {
        self.action.actor()
    }

    /// Returns the action kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Returns the stance.
    #[must_use]
    pub const fn stance(&self) -> Stance {
        self.action.stance()
    }

    /// Returns the final damage dealt (0 exactly when this was a miss).
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Returns true if the hit was critical.
    #[must_use]
    pub const fn crit(&self) -> bool {
        self.crit
    }

    /// Returns true if the action missed.
    #[must_use]
    pub const fn miss(&self) -> bool {
        self.miss
    }

    /// Returns the effect inflicted on the opponent.
    #[must_use]
    pub const fn effect(&self) -> EffectKind {
        self.effect
    }

    /// Returns the judge's commentary for this action.
    #[must_use]
    pub fn judge_commentary(&self) -> &str {
        &self.judge_commentary
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// One active effect as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    /// The effect's kind.
    pub kind: EffectKind,
    /// Whole turns the effect remains active, counting the current one.
    pub turns_remaining: u32,
}

/// One combatant's externally visible state after a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    /// The combatant's id.
    pub id: CombatantId,
    /// Display name.
    pub name: String,
    /// Health in `[0, 100]`.
    pub health: u32,
    /// Special meter in `[0, 100]`.
    pub special_meter: u32,
    /// Presentation band of the health value.
    pub band: HealthBand,
    /// Effects active at the snapshot's turn.
    pub effects: Vec<EffectSnapshot>,
}

impl CombatantSnapshot {
    /// Captures a combatant's current state together with its active effects.
    #[must_use]
    pub fn capture(combatant: &Combatant, effects: &StatusEffectTable, turn: u32) -> Self {
        let effects = effects
            .active(combatant.id(), turn)
            .map(|e| EffectSnapshot {
                kind: e.kind(),
                turns_remaining: e.expires_turn() - turn,
            })
            .collect();
        Self {
            id: combatant.id(),
            name: combatant.name().to_string(),
            health: combatant.health(),
            special_meter: combatant.special_meter(),
            band: HealthBand::from_health(combatant.health()),
            effects,
        }
    }
}

/// Point-in-time view of a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// The battle this snapshot belongs to.
    pub battle_id: BattleId,
    /// Lifecycle status at snapshot time.
    pub status: BattleStatus,
    /// Last committed turn index (0 before the first turn).
    pub turn: u32,
    /// Both combatants' post-turn state.
    pub combatants: [CombatantSnapshot; 2],
    /// Latest narrative commentary.
    pub commentary: String,
    /// Final statistics, present only once the battle has ended.
    pub summary: Option<BattleSummary>,
}

impl BattleSnapshot {
    /// Returns true when this snapshot differs from `prior` in a way pollers
    /// care about: health, active status effects, or battle status.
    ///
    /// Commentary and other bookkeeping fields deliberately do not count, so
    /// redundant notifications are suppressed.
    #[must_use]
    pub fn materially_differs(&self, prior: &Self) -> bool {
        if self.status != prior.status {
            return true;
        }
        self.combatants
            .iter()
            .zip(prior.combatants.iter())
            .any(|(a, b)| a.health != b.health || a.effects != b.effects)
    }
}

// =============================================================================
// TurnRecord
// =============================================================================

/// One committed turn: the unit of the append-only battle history.
///
/// Records are immutable once appended and their turn indices increase by
/// exactly 1 per battle, starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// The battle this record belongs to.
    pub battle_id: BattleId,
    /// 1-based turn index, strictly increasing per battle.
    pub turn: u32,
    /// Milliseconds since the Unix epoch at commit time.
    pub timestamp_ms: u64,
    /// The resolved action of this turn.
    pub action: ResolvedAction,
    /// Both combatants' post-turn state.
    pub combatants: [CombatantSnapshot; 2],
    /// Composed narrative commentary for the turn.
    pub commentary: String,
}

// =============================================================================
// BattleSummary
// =============================================================================

/// Final statistics computed when a battle concludes.
///
/// All ties (most-used kind, highest hit) are broken by first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSummary {
    /// Total committed turns.
    pub turns: u32,
    /// The action kind used most often.
    pub most_used_kind: ActionKind,
    /// The largest single hit's damage.
    pub highest_hit_damage: u32,
    /// The turn on which the largest single hit landed.
    pub highest_hit_turn: u32,
    /// Number of status effects inflicted over the battle.
    pub effects_applied: u32,
    /// Number of SPECIAL actions used.
    pub special_uses: u32,
}

impl BattleSummary {
    /// Computes summary statistics from a battle's resolved actions in turn
    /// order (`history[i]` is turn `i + 1`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // battle histories are tiny
    pub fn from_history(history: &[ResolvedAction]) -> Self {
        let mut kind_counts: Vec<(ActionKind, u32)> = Vec::new();
        let mut highest = (0u32, 0u32);
        let mut effects_applied = 0;
        let mut special_uses = 0;

        for (index, resolved) in history.iter().enumerate() {
            let turn = index as u32 + 1;
            match kind_counts.iter_mut().find(|(k, _)| *k == resolved.kind()) {
                Some((_, count)) => *count += 1,
                None => kind_counts.push((resolved.kind(), 1)),
            }
            if resolved.damage() > highest.0 {
                highest = (resolved.damage(), turn);
            }
            if resolved.effect() != EffectKind::None {
                effects_applied += 1;
            }
            if resolved.kind() == ActionKind::Special {
                special_uses += 1;
            }
        }

        // First-seen order wins ties because the scan only replaces on a
        // strictly greater count.
        let mut most_used = (ActionKind::Attack, 0);
        for (kind, count) in kind_counts {
            if count > most_used.1 {
                most_used = (kind, count);
            }
        }

        Self {
            turns: history.len() as u32,
            most_used_kind: most_used.0,
            highest_hit_damage: highest.0,
            highest_hit_turn: highest.1,
            effects_applied,
            special_uses,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
