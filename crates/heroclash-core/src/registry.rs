//! Ownership of all concurrently running battles.
//!
//! The `BattleRegistry` is the only structure shared between battles: a map
//! from battle id to its running engine, plus the [`SnapshotStore`] pollers
//! read. Each created battle gets its own engine and (once started) its own
//! thread; engines share no mutable state with each other.
//!
//! State propagation is explicit message passing: every engine pushes its
//! per-turn [`EngineUpdate`] into one `mpsc` channel, and a single
//! dispatcher thread drains it: appending records to the store, suppressing
//! snapshots that are not materially different from the previous one,
//! fanning the rest out to subscribers, and reaping engines whose battles
//! have ended. One channel, one consumer: per-battle ordering holds without
//! any global event emitter.
//!
//! # Lifecycle
//!
//! ```
//! use std::sync::Arc;
//! use heroclash_core::{BattleConfig, BattleRegistry, HeroConfig};
//! # use heroclash_core::providers::{
//! #     ActionGenerator, JudgeOracle, PersistenceSink, ProviderError,
//! # };
//! # use heroclash_core::{Action, BattleContext, BattleId, CombatantId, JudgeVerdict, TurnRecord};
//! # struct Stub;
//! # impl ActionGenerator for Stub {
//! #     fn generate(&self, actor: CombatantId, _: &BattleContext) -> Result<Action, ProviderError> {
//! #         Ok(Action::fallback(actor))
//! #     }
//! # }
//! # impl JudgeOracle for Stub {
//! #     fn analyze(&self, _: &Action, _: &BattleContext) -> Result<JudgeVerdict, ProviderError> {
//! #         Ok(JudgeVerdict::default())
//! #     }
//! # }
//! # impl PersistenceSink for Stub {
//! #     fn on_turn_record(&self, _: &TurnRecord) -> Result<(), ProviderError> { Ok(()) }
//! #     fn on_battle_ended(&self, _: &BattleId, _: CombatantId) -> Result<(), ProviderError> {
//! #         Ok(())
//! #     }
//! # }
//!
//! let registry = BattleRegistry::new(
//!     Arc::new(Stub),
//!     Arc::new(Stub),
//!     Arc::new(Stub),
//!     BattleConfig::default(),
//! );
//! let handle = registry
//!     .create_battle("battle-1", [
//!         HeroConfig::new("Pyra", "Flame duelist"),
//!         HeroConfig::new("Galen", "Stone warden"),
//!     ])
//!     .expect("fresh id");
//! handle.start().expect("not yet started");
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread;

use tracing::info;

use crate::combatant::{Combatant, CombatantId, HeroConfig};
use crate::engine::{BattleConfig, EngineProviders, EngineUpdate, TurnEngine};
use crate::error::{BattleError, Result};
use crate::history::SnapshotStore;
use crate::providers::{ActionGenerator, JudgeOracle, PersistenceSink, SubscriberNotifier};
use crate::record::{BattleId, BattleSnapshot, TurnRecord};

struct EngineSlot {
    /// Present until the battle is started, then taken by the battle thread.
    engine: Option<TurnEngine>,
    cancel: Arc<AtomicBool>,
}

/// State shared between the registry, its handles, and the dispatcher.
struct Shared {
    engines: Mutex<HashMap<BattleId, EngineSlot>>,
    store: SnapshotStore,
    subscribers: RwLock<Vec<Arc<dyn SubscriberNotifier>>>,
}

// =============================================================================
// BattleRegistry
// =============================================================================

/// Creates, tracks, and tears down concurrently running battles.
pub struct BattleRegistry {
    shared: Arc<Shared>,
    updates: Sender<EngineUpdate>,
    generator: Arc<dyn ActionGenerator>,
    judge: Arc<dyn JudgeOracle>,
    persistence: Arc<dyn PersistenceSink>,
    config: BattleConfig,
}

impl BattleRegistry {
    /// Creates a registry wired to the given collaborators and spawns its
    /// dispatcher thread.
    #[must_use]
    pub fn new(
        generator: Arc<dyn ActionGenerator>,
        judge: Arc<dyn JudgeOracle>,
        persistence: Arc<dyn PersistenceSink>,
        config: BattleConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            engines: Mutex::new(HashMap::new()),
            store: SnapshotStore::new(),
            subscribers: RwLock::new(Vec::new()),
        });
        let (updates, receiver) = mpsc::channel();
        let dispatch_shared = Arc::clone(&shared);
        thread::spawn(move || dispatch_loop(&dispatch_shared, &receiver));

        Self {
            shared,
            updates,
            generator,
            judge,
            persistence,
            config,
        }
    }

    /// Creates a new battle from two hero configs.
    ///
    /// The battle is registered in `Initialized` state; nothing runs until
    /// the returned handle's [`BattleHandle::start`] is called.
    ///
    /// # Errors
    ///
    /// [`BattleError::DuplicateBattleId`] if the id is live or has recorded
    /// history; [`BattleError::InvalidConfig`] for an empty hero name.
    pub fn create_battle(
        &self,
        battle_id: impl Into<BattleId>,
        heroes: [HeroConfig; 2],
    ) -> Result<BattleHandle> {
        let battle_id = battle_id.into();
        for hero in &heroes {
            if hero.name.trim().is_empty() {
                return Err(BattleError::InvalidConfig(
                    "hero name must not be empty".to_string(),
                ));
            }
        }

        let mut engines = self
            .shared
            .engines
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if engines.contains_key(&battle_id) || self.shared.store.contains(&battle_id) {
            return Err(BattleError::DuplicateBattleId(battle_id));
        }

        let combatants = [
            Combatant::new(CombatantId::new(0), &heroes[0]),
            Combatant::new(CombatantId::new(1), &heroes[1]),
        ];
        let cancel = Arc::new(AtomicBool::new(false));
        let engine = TurnEngine::new(
            battle_id.clone(),
            combatants,
            EngineProviders {
                actions: Arc::clone(&self.generator),
                judge: Arc::clone(&self.judge),
                persistence: Arc::clone(&self.persistence),
            },
            self.updates.clone(),
            Arc::clone(&cancel),
            self.config.clone(),
        );
        self.shared
            .store
            .put_latest(engine.snapshot("The combatants take their places.", None));
        engines.insert(
            battle_id.clone(),
            EngineSlot {
                engine: Some(engine),
                cancel,
            },
        );
        info!(battle = %battle_id, "battle created");

        Ok(BattleHandle {
            battle_id,
            shared: Arc::downgrade(&self.shared),
        })
    }

    /// Returns the latest snapshot for a battle.
    ///
    /// # Errors
    ///
    /// [`BattleError::BattleNotFound`] if the id is unknown or was deleted.
    pub fn get_state(&self, battle_id: &BattleId) -> Result<BattleSnapshot> {
        self.shared
            .store
            .latest(battle_id)
            .ok_or_else(|| BattleError::BattleNotFound(battle_id.clone()))
    }

    /// Returns every committed turn record after `since_turn`, in order.
    ///
    /// # Errors
    ///
    /// [`BattleError::BattleNotFound`] if the battle has no history at all.
    pub fn changes_since(&self, battle_id: &BattleId, since_turn: u32) -> Result<Vec<TurnRecord>> {
        self.shared
            .store
            .changes_since(battle_id, since_turn)
            .ok_or_else(|| BattleError::BattleNotFound(battle_id.clone()))
    }

    /// Tears down a battle: no further turns start, the live engine and its
    /// latest snapshot go away, historical turn records remain queryable.
    ///
    /// An in-flight collaborator call is not interrupted; its turn's result
    /// is discarded when it returns.
    ///
    /// # Errors
    ///
    /// [`BattleError::BattleNotFound`] if the id is neither live nor in the
    /// history store.
    pub fn delete(&self, battle_id: &BattleId) -> Result<()> {
        let removed = {
            let mut engines = self
                .shared
                .engines
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            engines.remove(battle_id)
        };
        match removed {
            Some(slot) => {
                slot.cancel.store(true, Ordering::SeqCst);
                self.shared.store.clear_latest(battle_id);
                info!(battle = %battle_id, "battle deleted");
                Ok(())
            }
            None if self.shared.store.contains(battle_id) => {
                self.shared.store.clear_latest(battle_id);
                info!(battle = %battle_id, "ended battle deleted");
                Ok(())
            }
            None => Err(BattleError::BattleNotFound(battle_id.clone())),
        }
    }

    /// Registers a subscriber for materially changed snapshots.
    pub fn subscribe(&self, subscriber: Arc<dyn SubscriberNotifier>) {
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// Returns the ids of all battles with a live engine, in id order.
    #[must_use]
    pub fn active_battles(&self) -> Vec<BattleId> {
        let engines = self
            .shared
            .engines
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<BattleId> = engines.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Drop for BattleRegistry {
    fn drop(&mut self) {
        // Wake every sleeping battle loop so detached threads exit promptly.
        // Clearing the map also drops never-started engines (and their update
        // senders), letting the dispatcher drain and finish.
        let mut engines = self
            .shared
            .engines
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for slot in engines.values() {
            slot.cancel.store(true, Ordering::SeqCst);
        }
        engines.clear();
    }
}

// =============================================================================
// BattleHandle
// =============================================================================

/// Capability to start the battle returned by
/// [`BattleRegistry::create_battle`].
pub struct BattleHandle {
    battle_id: BattleId,
    shared: Weak<Shared>,
}

impl BattleHandle {
    /// Returns the battle id this handle controls.
    #[must_use]
    pub const fn id(&self) -> &BattleId {
        &self.battle_id
    }

    /// Starts the battle's turn loop on its own thread.
    ///
    /// # Errors
    ///
    /// [`BattleError::AlreadyStarted`] on a second call,
    /// [`BattleError::BattleNotFound`] if the battle (or the registry) is
    /// gone.
    pub fn start(&self) -> Result<()> {
        let shared = self
            .shared
            .upgrade()
            .ok_or_else(|| BattleError::BattleNotFound(self.battle_id.clone()))?;
        let mut engines = shared.engines.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = engines
            .get_mut(&self.battle_id)
            .ok_or_else(|| BattleError::BattleNotFound(self.battle_id.clone()))?;
        let engine = slot
            .engine
            .take()
            .ok_or_else(|| BattleError::AlreadyStarted(self.battle_id.clone()))?;
        thread::spawn(move || engine.run());
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Drains engine updates: record append, material-change suppression,
/// subscriber fan-out, terminal reaping. Runs until every update sender is
/// gone.
fn dispatch_loop(shared: &Shared, receiver: &Receiver<EngineUpdate>) {
    while let Ok(update) = receiver.recv() {
        // An update racing a delete is discarded wholesale: the battle's
        // engine entry is gone, and a torn-down battle's in-flight turn must
        // leave no trace.
        let live = {
            let engines = shared.engines.lock().unwrap_or_else(PoisonError::into_inner);
            engines.contains_key(&update.battle_id)
        };
        if !live {
            continue;
        }

        if let Some(record) = update.record {
            shared.store.append(record);
        }

        let material = shared
            .store
            .latest(&update.battle_id)
            .is_none_or(|prior| update.snapshot.materially_differs(&prior));

        if update.terminal {
            let mut engines = shared.engines.lock().unwrap_or_else(PoisonError::into_inner);
            engines.remove(&update.battle_id);
        }
        if material {
            let subscribers = shared
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for subscriber in subscribers.iter() {
                subscriber.notify(&update.snapshot);
            }
        }

        // Publishing the snapshot comes last: once a poller observes a state,
        // every side effect of the update (records, fan-out, reaping) has
        // already happened.
        shared.store.put_latest(update.snapshot);
    }
}
