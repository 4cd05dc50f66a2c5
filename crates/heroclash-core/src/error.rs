//! Error types for the battle registry surface.
//!
//! These cover configuration-time failures only, the fail-fast cases a
//! caller sees synchronously. Mid-battle collaborator failures never surface
//! here; the turn loop degrades to fallbacks instead (see
//! [`crate::providers`]).

use thiserror::Error;

use crate::record::BattleId;

/// Errors surfaced by [`crate::registry::BattleRegistry`].
#[derive(Debug, Clone, Error)]
pub enum BattleError {
    /// A battle with this id is live or has recorded history.
    #[error("duplicate battle id: {0}")]
    DuplicateBattleId(BattleId),

    /// No battle with this id is known.
    #[error("battle not found: {0}")]
    BattleNotFound(BattleId),

    /// The battle was already started once.
    #[error("battle already started: {0}")]
    AlreadyStarted(BattleId),

    /// A hero config failed validation; the battle never starts.
    #[error("invalid hero config: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used across the crate's public surface.
pub type Result<T> = std::result::Result<T, BattleError>;
