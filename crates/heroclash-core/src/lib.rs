//! # Heroclash Core
//!
//! Turn-resolution engine for AI-narrated hero battles.
//!
//! This crate is the in-process core behind a battle service: it tracks two
//! combatants' mutable state, serializes turns deterministically while
//! folding in latency-bearing external inputs (an AI action generator and an
//! AI judge), computes outcomes through a layered modifier pipeline, and
//! exposes each battle as an append-only history safe for concurrent
//! pollers. HTTP routing, storage, and rendering live elsewhere and talk to
//! the core only through the narrow seams in [`providers`].
//!
//! ## Architecture
//!
//! - [`registry::BattleRegistry`] owns the set of running battles and fans
//!   state changes out to subscribers over an explicit channel.
//! - Each battle runs a `TurnEngine` turn loop on its own thread; battles
//!   share no mutable state.
//! - [`resolver`] turns a proposed [`Action`] plus battle context into a
//!   final outcome: hit/crit roll, judge multiplier, status effects,
//!   special-meter gating, combo chain, stance interaction.
//! - [`history::SnapshotStore`] serves `changes_since` queries to polling
//!   clients without ever exposing a partial or reordered history.
//!
//! ## Degradation
//!
//! The AI collaborators are treated as unreliable: calls run under a
//! deadline with one bounded retry, then fall back to deterministic
//! defaults. A battle that is running never surfaces a collaborator failure
//! to its audience.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use heroclash_core::{BattleConfig, BattleRegistry, HeroConfig};
//!
//! let registry = BattleRegistry::new(generator, judge, persistence, BattleConfig::default());
//! let handle = registry.create_battle("battle-1", [hero_a, hero_b])?;
//! handle.start()?;
//! let state = registry.get_state(handle.id())?;
//! let news = registry.changes_since(handle.id(), state.turn)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod codec;
pub mod combatant;
pub mod context;
pub mod effect;
mod engine;
pub mod error;
pub mod history;
pub mod providers;
pub mod record;
pub mod registry;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use action::{Action, ActionKind, JudgeVerdict, Stance};
pub use combatant::{Combatant, CombatantId, HeroConfig};
pub use context::BattleContext;
pub use effect::{EffectKind, StatusEffect, StatusEffectTable};
pub use engine::BattleConfig;
pub use error::{BattleError, Result};
pub use record::{
    BattleId, BattleSnapshot, BattleStatus, BattleSummary, CombatantSnapshot, TurnRecord,
};
pub use registry::{BattleHandle, BattleRegistry};
