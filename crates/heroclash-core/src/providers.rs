//! Collaborator seams: the narrow interfaces the core consumes.
//!
//! Implementations (an LLM HTTP client, an ORM-backed store, a websocket
//! broadcaster) live outside this crate. The turn loop treats the two AI
//! collaborators as unreliable: calls run under a deadline via
//! [`call_with_timeout`], get one bounded retry, and then degrade to
//! deterministic defaults. A collaborator can be slow, wrong, or down
//! without ever stalling or aborting a battle.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::action::{Action, JudgeVerdict};
use crate::combatant::CombatantId;
use crate::context::BattleContext;
use crate::record::{BattleId, BattleSnapshot, TurnRecord};

/// Error raised by a collaborator implementation.
///
/// The engine only logs these; they never propagate out of the turn loop.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProviderError(String);

impl ProviderError {
    /// Creates a provider error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Produces each turn's proposed action.
pub trait ActionGenerator: Send + Sync {
    /// Proposes an action for the acting combatant given the full battle
    /// context. May fail or hang; the engine applies timeout + retry.
    ///
    /// # Errors
    ///
    /// Implementations return [`ProviderError`] on any upstream failure;
    /// the engine then falls back to [`Self::generate_fallback`].
    fn generate(&self, actor: CombatantId, context: &BattleContext)
        -> Result<Action, ProviderError>;

    /// Returns the deterministic action used when generation fails.
    /// Must never fail; the default is a plain attack.
    fn generate_fallback(&self, actor: CombatantId) -> Action {
        Action::fallback(actor)
    }
}

/// Scores an action's narrative effectiveness.
pub trait JudgeOracle: Send + Sync {
    /// Analyzes the proposed action in context. On any failure the engine
    /// degrades to [`JudgeVerdict::default`].
    ///
    /// # Errors
    ///
    /// Implementations return [`ProviderError`] on any upstream failure.
    fn analyze(
        &self,
        action: &Action,
        context: &BattleContext,
    ) -> Result<JudgeVerdict, ProviderError>;
}

/// Receives the append-only battle history, in order, per battle.
///
/// Calls are fire-and-forget from the turn loop's perspective: failures are
/// logged and do not block turn progression.
pub trait PersistenceSink: Send + Sync {
    /// Called once per committed turn, in turn order for a given battle.
    ///
    /// # Errors
    ///
    /// Implementations return [`ProviderError`] on write failure; the engine
    /// logs and continues.
    fn on_turn_record(&self, record: &TurnRecord) -> Result<(), ProviderError>;

    /// Called exactly once when a battle concludes.
    ///
    /// # Errors
    ///
    /// Implementations return [`ProviderError`] on write failure; the engine
    /// logs and continues.
    fn on_battle_ended(&self, battle_id: &BattleId, winner: CombatantId)
        -> Result<(), ProviderError>;
}

/// Receives a snapshot once per materially changed battle state.
pub trait SubscriberNotifier: Send + Sync {
    /// Called by the registry dispatcher for every material state change.
    /// Implementations handle their own errors.
    fn notify(&self, snapshot: &BattleSnapshot);
}

/// Runs `call` on a short-lived worker thread and waits at most `timeout`
/// for its result.
///
/// Returns `None` when the deadline passes, the worker panics, or the
/// worker cannot be spawned. A late result is simply dropped with the
/// channel, which is exactly the cancellation contract for in-flight
/// collaborator calls.
pub(crate) fn call_with_timeout<T, F>(timeout: Duration, call: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("collab-call".to_string())
        .spawn(move || {
            let _ = tx.send(call());
        });
    if spawned.is_err() {
        return None;
    }
    rx.recv_timeout(timeout).ok()
}
