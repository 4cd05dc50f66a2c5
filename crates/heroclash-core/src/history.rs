//! Versioned, append-only battle history for polling clients.
//!
//! The store keeps, per battle, the ordered list of committed
//! [`TurnRecord`]s plus the latest [`BattleSnapshot`]. Appends and reads are
//! safe to interleave from any thread: a reader always observes a prefix of
//! the committed history, never a partial or reordered record, and
//! [`SnapshotStore::changes_since`] never returns records out of turn order.
//!
//! Turn records outlive the live battle: deleting a battle clears its
//! latest snapshot but leaves its history queryable.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::error;

use crate::record::{BattleId, BattleSnapshot, TurnRecord};

#[derive(Debug, Default)]
struct BattleHistory {
    records: Vec<TurnRecord>,
    latest: Option<BattleSnapshot>,
}

/// Thread-safe append-only store of battle histories.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<HashMap<BattleId, BattleHistory>>,
}

impl SnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a committed turn record.
    ///
    /// Records must arrive in turn order per battle; an out-of-order record
    /// is an internal bug, asserted in debug builds and dropped (with an
    /// error log) in release builds so the ordering guarantee to readers
    /// survives.
    pub fn append(&self, record: TurnRecord) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let history = inner.entry(record.battle_id.clone()).or_default();
        if let Some(last) = history.records.last() {
            debug_assert_eq!(record.turn, last.turn + 1, "non-monotonic turn index");
            if record.turn <= last.turn {
                error!(
                    battle = %record.battle_id,
                    turn = record.turn,
                    last = last.turn,
                    "dropping out-of-order turn record"
                );
                return;
            }
        }
        history.records.push(record);
    }

    /// Stores the latest snapshot for a battle.
    pub fn put_latest(&self, snapshot: BattleSnapshot) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let battle_id = snapshot.battle_id.clone();
        inner.entry(battle_id).or_default().latest = Some(snapshot);
    }

    /// Returns the latest snapshot for a battle, if one exists.
    #[must_use]
    pub fn latest(&self, battle_id: &BattleId) -> Option<BattleSnapshot> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(battle_id).and_then(|h| h.latest.clone())
    }

    /// Clears the latest snapshot while keeping the turn records.
    pub fn clear_latest(&self, battle_id: &BattleId) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(history) = inner.get_mut(battle_id) {
            history.latest = None;
        }
    }

    /// Returns true if the store has ever seen this battle.
    #[must_use]
    pub fn contains(&self, battle_id: &BattleId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.contains_key(battle_id)
    }

    /// Returns every record with a turn index greater than `since_turn`, in
    /// turn order. `None` means the battle is unknown to the store.
    ///
    /// Pass 0 to read the full history. Because appends only ever extend
    /// the tail, repeated calls with each response's last turn index observe
    /// a strictly growing prefix.
    #[must_use]
    pub fn changes_since(&self, battle_id: &BattleId, since_turn: u32) -> Option<Vec<TurnRecord>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let history = inner.get(battle_id)?;
        let start = history
            .records
            .partition_point(|record| record.turn <= since_turn);
        Some(history.records[start..].to_vec())
    }

    /// Returns the number of committed records for a battle.
    #[must_use]
    pub fn record_count(&self, battle_id: &BattleId) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(battle_id).map_or(0, |h| h.records.len())
    }
}

// =============================================================================
// Tests
// =============================================================================
