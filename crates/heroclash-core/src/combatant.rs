//! Combatant identity and per-battle mutable fighter state.
//!
//! A battle always has exactly two combatants. Each holds the mutable state
//! the turn loop operates on: health and the special-action meter, both
//! clamped to `[0, 100]` by every mutator. Name and description are fixed at
//! creation and only feed the narrative context handed to AI collaborators.
//!
//! # Example
//!
//! ```
//! use heroclash_core::combatant::{Combatant, CombatantId, HeroConfig};
//!
//! let config = HeroConfig::new("Pyra", "A duelist wreathed in flame");
//! let mut fighter = Combatant::new(CombatantId::new(0), &config);
//!
//! assert_eq!(fighter.health(), 100);
//! fighter.apply_damage(130);
//! assert_eq!(fighter.health(), 0); // never negative
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum (and starting) health for every combatant.
pub const MAX_HEALTH: u32 = 100;

/// Meter value at which a SPECIAL action is fully charged.
pub const FULL_METER: u32 = 100;

// =============================================================================
// CombatantId
// =============================================================================

/// Identifier for one of a battle's two fighters.
///
/// Ids are assigned by the registry when a battle is created: the first hero
/// config becomes id 0, the second id 1. Ids are only meaningful within their
/// own battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(u32);

impl CombatantId {
    /// Creates a new combatant id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value of this id.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CombatantId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// HeroConfig
// =============================================================================

/// Immutable hero description supplied by the caller when creating a battle.
///
/// The name and description never influence numeric resolution; they exist
/// for the narrative context interpolated into AI prompts and commentary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroConfig {
    /// Display name of the hero.
    pub name: String,
    /// Flavor description of the hero.
    pub description: String,
}

impl HeroConfig {
    /// Creates a new hero config.
    #[must_use]
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

// =============================================================================
// Combatant
// =============================================================================

/// One fighter's live battle state.
///
/// Owned exclusively by the battle's `TurnEngine` for the battle's lifetime;
/// only turn snapshots outlive it. Health is mutated solely with the damage
/// produced by action resolution, and the special meter only through the
/// gains and drains the resolution pipeline computes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    id: CombatantId,
    name: String,
    description: String,
    health: u32,
    special_meter: u32,
}

impl Combatant {
    /// Creates a combatant from a hero config at full health and empty meter.
    #[must_use]
    pub fn new(id: CombatantId, config: &HeroConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            description: config.description.clone(),
            health: MAX_HEALTH,
            special_meter: 0,
        }
    }

    /// Returns this combatant's id.
    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the flavor description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns current health in `[0, 100]`.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Returns the current special meter in `[0, 100]`.
    #[must_use]
    pub const fn special_meter(&self) -> u32 {
        self.special_meter
    }

    /// Returns true once health has reached zero.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.health == 0
    }

    /// Applies resolved damage, saturating at zero.
    pub fn apply_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    /// Sets the special meter to the value the resolution pipeline computed,
    /// clamped to `[0, 100]`.
    pub fn set_special_meter(&mut self, value: u32) {
        self.special_meter = value.min(FULL_METER);
    }
}

// =============================================================================
// Tests
// =============================================================================
