//! The read-only battle view handed to AI collaborators.
//!
//! A [`BattleContext`] carries everything a prompt needs: both combatants'
//! public state (health, meter, active effects), the last resolved action in
//! full, the last few actions in brief, and the acting combatant's combo
//! chain. It is a value type, cloned per call, so an in-flight collaborator
//! call can outlive the turn that issued it without borrowing engine state.

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::record::{BattleId, CombatantSnapshot, ResolvedAction};

/// How many recent actions the context carries for prompt history.
pub const RECENT_ACTIONS: usize = 3;

/// Immutable view of a battle at the start of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleContext {
    battle_id: BattleId,
    turn: u32,
    actor: CombatantId,
    combatants: [CombatantSnapshot; 2],
    last_action: Option<ResolvedAction>,
    recent: Vec<ResolvedAction>,
    combo: u32,
}

impl BattleContext {
    /// Assembles a context for the given acting combatant.
    ///
    /// `recent` should already be limited to the trailing
    /// [`RECENT_ACTIONS`] entries in turn order.
    #[must_use]
    pub fn new(
        battle_id: BattleId,
        turn: u32,
        actor: CombatantId,
        combatants: [CombatantSnapshot; 2],
        last_action: Option<ResolvedAction>,
        recent: Vec<ResolvedAction>,
        combo: u32,
    ) -> Self {
        Self {
            battle_id,
            turn,
            actor,
            combatants,
            last_action,
            recent,
            combo,
        }
    }

    /// Returns the battle id.
    #[must_use]
    pub const fn battle_id(&self) -> &BattleId {
        &self.battle_id
    }

    /// Returns the turn about to be resolved.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Returns the acting combatant's id.
    #[must_use]
    pub const fn actor(&self) -> CombatantId {
        self.actor
    }

    /// Returns both combatants' snapshots.
    #[must_use]
    pub const fn combatants(&self) -> &[CombatantSnapshot; 2] {
        &self.combatants
    }

    /// Returns the acting combatant's snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the context was assembled with an actor id that matches
    /// neither combatant, which the engine never does.
    #[must_use]
    pub fn actor_state(&self) -> &CombatantSnapshot {
        self.combatants
            .iter()
            .find(|c| c.id == self.actor)
            .expect("context actor is one of the battle's combatants")
    }

    /// Returns the opposing combatant's snapshot.
    ///
    /// # Panics
    ///
    /// Panics under the same (engine-impossible) condition as
    /// [`Self::actor_state`].
    #[must_use]
    pub fn opponent_state(&self) -> &CombatantSnapshot {
        self.combatants
            .iter()
            .find(|c| c.id != self.actor)
            .expect("context holds exactly two combatants")
    }

    /// Returns the previous turn's resolved action, if any.
    #[must_use]
    pub const fn last_action(&self) -> Option<&ResolvedAction> {
        self.last_action.as_ref()
    }

    /// Returns up to the last [`RECENT_ACTIONS`] resolved actions in turn
    /// order.
    #[must_use]
    pub fn recent(&self) -> &[ResolvedAction] {
        &self.recent
    }

    /// Returns the acting combatant's current combo chain length.
    #[must_use]
    pub const fn combo(&self) -> u32 {
        self.combo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{Combatant, HeroConfig};
    use crate::effect::StatusEffectTable;

    fn context() -> BattleContext {
        let table = StatusEffectTable::new();
        let a = Combatant::new(CombatantId::new(0), &HeroConfig::new("A", "a"));
        let b = Combatant::new(CombatantId::new(1), &HeroConfig::new("B", "b"));
        BattleContext::new(
            BattleId::new("b1"),
            4,
            CombatantId::new(1),
            [
                CombatantSnapshot::capture(&a, &table, 3),
                CombatantSnapshot::capture(&b, &table, 3),
            ],
            None,
            Vec::new(),
            2,
        )
    }

    #[test]
    fn actor_and_opponent_lookup() {
        let ctx = context();
        assert_eq!(ctx.actor_state().id, CombatantId::new(1));
        assert_eq!(ctx.opponent_state().id, CombatantId::new(0));
    }

    #[test]
    fn carries_combo_and_turn() {
        let ctx = context();
        assert_eq!(ctx.turn(), 4);
        assert_eq!(ctx.combo(), 2);
        assert!(ctx.last_action().is_none());
    }
}
