//! The turn loop: drives one battle from start to conclusion.
//!
//! A `TurnEngine` owns everything mutable about one battle (both
//! combatants, the effect table, the combo chains, the RNG) and runs as a
//! single sequential task, so no two turns of the same battle ever overlap.
//! Different battles' engines share nothing and run fully concurrently.
//!
//! Each turn the engine consults the external action generator and judge
//! oracle. Both are treated as unreliable network calls: they run under
//! [`BattleConfig::call_timeout`], get exactly one retry after
//! [`BattleConfig::retry_backoff`], and then degrade to deterministic
//! defaults (the fallback attack / the neutral verdict). A turn can
//! therefore always be resolved; the loop never stalls on a collaborator.
//!
//! # Determinism
//!
//! Given a fixed [`BattleConfig::seed`] and deterministic collaborators, an
//! entire battle (first-actor pick, every hit and crit roll) replays
//! identically. Leaving the seed unset draws one from thread-local entropy.
//!
//! # Pacing
//!
//! The loop sleeps [`BattleConfig::turn_delay`] before resolving each turn:
//! no turn commits before the delay from the previous turn has elapsed.
//! This stands in for "time for the narration to play out" and is an
//! observable contract, not a correctness mechanism.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::{Action, JudgeVerdict};
use crate::combatant::Combatant;
use crate::context::{BattleContext, RECENT_ACTIONS};
use crate::effect::StatusEffectTable;
use crate::providers::{call_with_timeout, ActionGenerator, JudgeOracle, PersistenceSink};
use crate::record::{
    BattleId, BattleSnapshot, BattleStatus, BattleSummary, CombatantSnapshot, ResolvedAction,
    TurnRecord,
};
use crate::resolver::{self, Resolution, TurnInput};

// =============================================================================
// BattleConfig
// =============================================================================

/// Tuning knobs for a battle's turn loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Pacing delay observed before each turn commits.
    pub turn_delay: Duration,
    /// Deadline for each external collaborator call.
    pub call_timeout: Duration,
    /// Pause before the single retry of a failed collaborator call.
    pub retry_backoff: Duration,
    /// RNG seed; a fixed seed makes the whole battle reproducible.
    pub seed: Option<u64>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            turn_delay: Duration::from_secs(3),
            call_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_millis(250),
            seed: None,
        }
    }
}

// =============================================================================
// Engine plumbing
// =============================================================================

/// The collaborator handles a turn engine drives.
#[derive(Clone)]
pub(crate) struct EngineProviders {
    /// Proposes each turn's action.
    pub actions: Arc<dyn ActionGenerator>,
    /// Scores each proposed action.
    pub judge: Arc<dyn JudgeOracle>,
    /// Receives the append-only history.
    pub persistence: Arc<dyn PersistenceSink>,
}

/// One state update pushed from an engine to the registry dispatcher.
#[derive(Debug, Clone)]
pub(crate) struct EngineUpdate {
    /// The battle this update belongs to.
    pub battle_id: BattleId,
    /// The committed turn record, absent for opening/terminal updates.
    pub record: Option<TurnRecord>,
    /// The battle state after the update.
    pub snapshot: BattleSnapshot,
    /// True exactly once, for the concluding update.
    pub terminal: bool,
}

// =============================================================================
// TurnEngine
// =============================================================================

/// State machine driving one battle: `Initialized → Active → Ended`.
pub(crate) struct TurnEngine {
    battle_id: BattleId,
    combatants: [Combatant; 2],
    effects: StatusEffectTable,
    status: BattleStatus,
    turn: u32,
    combos: [u32; 2],
    last_action: Option<ResolvedAction>,
    history: Vec<ResolvedAction>,
    rng: ChaCha8Rng,
    providers: EngineProviders,
    updates: Sender<EngineUpdate>,
    cancel: Arc<AtomicBool>,
    config: BattleConfig,
}

impl TurnEngine {
    pub(crate) fn new(
        battle_id: BattleId,
        combatants: [Combatant; 2],
        providers: EngineProviders,
        updates: Sender<EngineUpdate>,
        cancel: Arc<AtomicBool>,
        config: BattleConfig,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self {
            battle_id,
            combatants,
            effects: StatusEffectTable::new(),
            status: BattleStatus::Initialized,
            turn: 0,
            combos: [0, 0],
            last_action: None,
            history: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            providers,
            updates,
            cancel,
            config,
        }
    }

    /// Builds the externally visible snapshot of the current state.
    pub(crate) fn snapshot(&self, commentary: &str, summary: Option<BattleSummary>) -> BattleSnapshot {
        BattleSnapshot {
            battle_id: self.battle_id.clone(),
            status: self.status,
            turn: self.turn,
            combatants: self.combatant_snapshots(),
            commentary: commentary.to_string(),
            summary,
        }
    }

    /// Runs the battle to conclusion (or cancellation). Consumes the engine;
    /// intended to be the body of the battle's thread.
    pub(crate) fn run(mut self) {
        self.status = BattleStatus::Active;
        let mut actor = usize::from(self.rng.gen_bool(0.5));
        info!(battle = %self.battle_id, first = %self.combatants[actor].name(), "battle started");

        let opening = format!(
            "⚔️ {} vs {}: the battle begins!",
            self.combatants[0].name(),
            self.combatants[1].name()
        );
        if !self.emit(None, &opening) {
            return;
        }

        loop {
            thread::sleep(self.config.turn_delay);
            if self.cancelled() {
                info!(battle = %self.battle_id, "battle cancelled before turn start");
                return;
            }
            if !self.run_turn(actor) {
                return;
            }
            if self.combatants.iter().any(Combatant::is_defeated) {
                self.conclude();
                return;
            }
            actor = 1 - actor;
        }
    }

    /// Resolves and commits one turn. Returns false when the engine should
    /// stop without concluding (cancellation or a closed update channel).
    fn run_turn(&mut self, actor: usize) -> bool {
        self.turn += 1;
        let turn = self.turn;
        let context = self.context(actor);

        let action = self.generate_action(&context);
        // The judge is only consulted for actions that land; a miss
        // short-circuits before the multiplier would matter.
        let rolls = resolver::roll(
            &mut self.rng,
            action.kind(),
            self.combatants[actor].special_meter(),
        );
        let verdict = if rolls.hit {
            self.judge_verdict(&action, &context)
        } else {
            JudgeVerdict::default()
        };

        let resolution = {
            let input = TurnInput {
                action: &action,
                attacker: &self.combatants[actor],
                defender: &self.combatants[1 - actor],
                last_action: self.last_action.as_ref(),
                combo: self.combos[actor],
                turn,
            };
            resolver::resolve(&input, &verdict, &mut self.effects, rolls)
        };

        // A delete that raced the collaborator calls discards this turn's
        // result: nothing is committed once the battle is torn down.
        if self.cancelled() {
            info!(battle = %self.battle_id, turn, "battle cancelled mid-turn; result discarded");
            return false;
        }

        self.commit_turn(actor, action, &resolution)
    }

    /// Applies a resolution to battle state and publishes the turn record.
    fn commit_turn(&mut self, actor: usize, action: Action, resolution: &Resolution) -> bool {
        let turn = self.turn;
        self.combos[actor] = resolution.combo;
        self.combatants[1 - actor].apply_damage(resolution.damage);
        self.combatants[actor].set_special_meter(resolution.attacker_meter);

        let resolved = ResolvedAction::new(
            action,
            resolution.damage,
            resolution.crit,
            resolution.miss,
            resolution.effect,
            &resolution.commentary,
        );
        let commentary = self.compose_commentary(actor, &resolved);
        debug!(
            battle = %self.battle_id,
            turn,
            actor = %resolved.actor(),
            kind = %resolved.kind(),
            damage = resolved.damage(),
            crit = resolved.crit(),
            miss = resolved.miss(),
            "turn resolved"
        );

        self.last_action = Some(resolved.clone());
        self.history.push(resolved.clone());

        let record = TurnRecord {
            battle_id: self.battle_id.clone(),
            turn,
            timestamp_ms: now_ms(),
            action: resolved,
            combatants: self.combatant_snapshots(),
            commentary: commentary.clone(),
        };
        if let Err(err) = self.providers.persistence.on_turn_record(&record) {
            warn!(battle = %self.battle_id, turn, %err, "persisting turn record failed");
        }
        self.emit(Some(record), &commentary)
    }

    /// Concludes the battle: winner, summary statistics, terminal update.
    fn conclude(&mut self) {
        let winner_index = usize::from(self.combatants[0].is_defeated());
        let winner = self.combatants[winner_index].id();
        self.status = BattleStatus::Ended { winner };

        let summary = BattleSummary::from_history(&self.history);
        let commentary = format!(
            "🏆 FINAL BLOW: {} emerges victorious! 🏆",
            self.combatants[winner_index].name()
        );
        info!(
            battle = %self.battle_id,
            winner = %self.combatants[winner_index].name(),
            turns = summary.turns,
            "battle ended"
        );

        if let Err(err) = self
            .providers
            .persistence
            .on_battle_ended(&self.battle_id, winner)
        {
            warn!(battle = %self.battle_id, %err, "persisting battle end failed");
        }
        self.emit_with_summary(&commentary, summary);
    }

    /// Obtains the turn's action: one timed call, one timed retry, then the
    /// infallible fallback.
    fn generate_action(&self, context: &BattleContext) -> Action {
        let actor = context.actor();
        for attempt in 0..2 {
            if attempt > 0 {
                thread::sleep(self.config.retry_backoff);
            }
            let generator = Arc::clone(&self.providers.actions);
            let call_context = context.clone();
            let outcome = call_with_timeout(self.config.call_timeout, move || {
                generator.generate(actor, &call_context)
            });
            match outcome {
                Some(Ok(action)) => return action,
                Some(Err(err)) => {
                    warn!(battle = %self.battle_id, attempt, %err, "action generator failed");
                }
                None => {
                    warn!(battle = %self.battle_id, attempt, "action generator timed out");
                }
            }
        }
        debug!(battle = %self.battle_id, "using fallback action");
        self.providers.actions.generate_fallback(actor)
    }

    /// Obtains the judge verdict under the same timeout/retry policy,
    /// degrading to the neutral verdict.
    fn judge_verdict(&self, action: &Action, context: &BattleContext) -> JudgeVerdict {
        for attempt in 0..2 {
            if attempt > 0 {
                thread::sleep(self.config.retry_backoff);
            }
            let judge = Arc::clone(&self.providers.judge);
            let call_action = action.clone();
            let call_context = context.clone();
            let outcome = call_with_timeout(self.config.call_timeout, move || {
                judge.analyze(&call_action, &call_context)
            });
            match outcome {
                Some(Ok(verdict)) => return verdict,
                Some(Err(err)) => {
                    warn!(battle = %self.battle_id, attempt, %err, "judge analysis failed");
                }
                None => {
                    warn!(battle = %self.battle_id, attempt, "judge analysis timed out");
                }
            }
        }
        debug!(battle = %self.battle_id, "using neutral judge verdict");
        JudgeVerdict::default()
    }

    /// Assembles the prompt context for the acting combatant.
    fn context(&self, actor: usize) -> BattleContext {
        let recent_start = self.history.len().saturating_sub(RECENT_ACTIONS);
        BattleContext::new(
            self.battle_id.clone(),
            self.turn,
            self.combatants[actor].id(),
            self.combatant_snapshots(),
            self.last_action.clone(),
            self.history[recent_start..].to_vec(),
            self.combos[actor],
        )
    }

    fn combatant_snapshots(&self) -> [CombatantSnapshot; 2] {
        [
            CombatantSnapshot::capture(&self.combatants[0], &self.effects, self.turn),
            CombatantSnapshot::capture(&self.combatants[1], &self.effects, self.turn),
        ]
    }

    /// Narrative text for a committed turn: move line, description, damage
    /// line.
    fn compose_commentary(&self, actor: usize, resolved: &ResolvedAction) -> String {
        let icon = resolved
            .action()
            .icons()
            .first()
            .map_or("⚔️", String::as_str);
        let move_line = format!(
            "{icon} {}'s {}:",
            self.combatants[actor].name(),
            resolved.kind()
        );
        let damage_line = if resolved.miss() {
            "Glancing blow: the attack fails to connect.".to_string()
        } else if resolved.crit() {
            format!("CRITICAL HIT: {} damage!", resolved.damage())
        } else {
            format!("Hit: {} damage", resolved.damage())
        };
        format!(
            "{move_line}\n{}\n{damage_line}",
            resolved.action().description()
        )
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Publishes a non-terminal update. Returns false if the registry side
    /// is gone, which the loop treats like cancellation.
    fn emit(&self, record: Option<TurnRecord>, commentary: &str) -> bool {
        let update = EngineUpdate {
            battle_id: self.battle_id.clone(),
            record,
            snapshot: self.snapshot(commentary, None),
            terminal: false,
        };
        self.updates.send(update).is_ok()
    }

    fn emit_with_summary(&self, commentary: &str, summary: BattleSummary) {
        let update = EngineUpdate {
            battle_id: self.battle_id.clone(),
            record: None,
            snapshot: self.snapshot(commentary, Some(summary)),
            terminal: true,
        };
        let _ = self.updates.send(update);
    }
}

/// Milliseconds since the Unix epoch, saturating to zero on a pre-epoch
/// clock.
#[allow(clippy::cast_possible_truncation)] // wraps in ~584 million years
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
