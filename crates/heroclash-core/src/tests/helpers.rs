//! Scripted collaborators and setup utilities for battle tests.
//!
//! The scripted generator always proposes the same move, and DEFEND never
//! misses and never crits, so a defend-only battle is exactly reproducible
//! without touching the dice: every turn deals `floor(base_power)` damage.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::action::{Action, ActionKind, JudgeVerdict, Stance};
use crate::combatant::{CombatantId, HeroConfig};
use crate::context::BattleContext;
use crate::effect::EffectKind;
use crate::engine::BattleConfig;
use crate::providers::{
    ActionGenerator, JudgeOracle, PersistenceSink, ProviderError, SubscriberNotifier,
};
use crate::record::{BattleId, BattleSnapshot, TurnRecord};
use crate::registry::BattleRegistry;

// =============================================================================
// Scripted collaborators
// =============================================================================

/// Generator that proposes the same move every turn.
pub struct ScriptedGenerator {
    kind: ActionKind,
    stance: Stance,
    base_power: u32,
}

impl ScriptedGenerator {
    pub fn new(kind: ActionKind, stance: Stance, base_power: u32) -> Self {
        Self {
            kind,
            stance,
            base_power,
        }
    }
}

impl ActionGenerator for ScriptedGenerator {
    fn generate(
        &self,
        actor: CombatantId,
        _context: &BattleContext,
    ) -> Result<Action, ProviderError> {
        Ok(Action::new(
            actor,
            self.kind,
            self.stance,
            self.base_power,
            "Holds the line with practiced form",
        ))
    }
}

/// A generator whose deterministic defend never misses and never crits.
pub fn defend_generator() -> Arc<ScriptedGenerator> {
    Arc::new(ScriptedGenerator::new(
        ActionKind::Defend,
        Stance::Defensive,
        12,
    ))
}

/// Generator that always fails, forcing the engine's fallback attack.
pub struct FailingGenerator;

impl ActionGenerator for FailingGenerator {
    fn generate(
        &self,
        _actor: CombatantId,
        _context: &BattleContext,
    ) -> Result<Action, ProviderError> {
        Err(ProviderError::new("model unavailable"))
    }
}

/// Judge that returns the same verdict every turn.
pub struct FixedJudge {
    multiplier: f64,
    effect: EffectKind,
}

impl FixedJudge {
    pub fn new(multiplier: f64, effect: EffectKind) -> Self {
        Self { multiplier, effect }
    }
}

impl JudgeOracle for FixedJudge {
    fn analyze(
        &self,
        _action: &Action,
        _context: &BattleContext,
    ) -> Result<JudgeVerdict, ProviderError> {
        Ok(JudgeVerdict::new(
            self.multiplier,
            self.effect,
            "The judge nods approvingly.",
        ))
    }
}

/// A neutral judge: multiplier 1.0, no effect.
pub fn neutral_judge() -> Arc<FixedJudge> {
    Arc::new(FixedJudge::new(1.0, EffectKind::None))
}

/// Judge that sleeps past any reasonable deadline before answering.
pub struct SlowJudge {
    delay: Duration,
}

impl SlowJudge {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl JudgeOracle for SlowJudge {
    fn analyze(
        &self,
        _action: &Action,
        _context: &BattleContext,
    ) -> Result<JudgeVerdict, ProviderError> {
        thread::sleep(self.delay);
        Ok(JudgeVerdict::new(2.0, EffectKind::Stun, "too late"))
    }
}

// =============================================================================
// Collecting sinks
// =============================================================================

/// Persistence sink that records everything it is handed.
#[derive(Default)]
pub struct CollectingSink {
    records: Mutex<Vec<TurnRecord>>,
    ended: Mutex<Vec<(BattleId, CombatantId)>>,
}

impl CollectingSink {
    pub fn records(&self) -> Vec<TurnRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ended(&self) -> Vec<(BattleId, CombatantId)> {
        self.ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PersistenceSink for CollectingSink {
    fn on_turn_record(&self, record: &TurnRecord) -> Result<(), ProviderError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn on_battle_ended(
        &self,
        battle_id: &BattleId,
        winner: CombatantId,
    ) -> Result<(), ProviderError> {
        self.ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((battle_id.clone(), winner));
        Ok(())
    }
}

/// Subscriber that keeps every snapshot it is notified with.
#[derive(Default)]
pub struct CollectingNotifier {
    snapshots: Mutex<Vec<BattleSnapshot>>,
}

impl CollectingNotifier {
    pub fn snapshots(&self) -> Vec<BattleSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SubscriberNotifier for CollectingNotifier {
    fn notify(&self, snapshot: &BattleSnapshot) {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());
    }
}

// =============================================================================
// Setup
// =============================================================================

pub fn hero(name: &str) -> HeroConfig {
    HeroConfig::new(name, "A seasoned arena fighter")
}

/// A config that runs battles as fast as the thread scheduler allows.
pub fn fast_config() -> BattleConfig {
    BattleConfig {
        turn_delay: Duration::ZERO,
        call_timeout: Duration::from_millis(250),
        retry_backoff: Duration::from_millis(1),
        seed: Some(7),
    }
}

/// Builds a registry around the given collaborators and a collecting sink.
pub fn registry_with(
    generator: Arc<dyn ActionGenerator>,
    judge: Arc<dyn JudgeOracle>,
    config: BattleConfig,
) -> (BattleRegistry, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    let persistence: Arc<dyn PersistenceSink> = sink.clone();
    let registry = BattleRegistry::new(generator, judge, persistence, config);
    (registry, sink)
}

/// Polls until the battle reports `Ended`, panicking after ten seconds.
pub fn wait_for_end(registry: &BattleRegistry, battle_id: &BattleId) -> BattleSnapshot {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(snapshot) = registry.get_state(battle_id) {
            if snapshot.status.is_ended() {
                return snapshot;
            }
        }
        assert!(
            Instant::now() < deadline,
            "battle {battle_id} did not finish in time"
        );
        thread::sleep(Duration::from_millis(2));
    }
}
