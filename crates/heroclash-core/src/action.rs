//! Action vocabulary: what a combatant proposes to do on its turn.
//!
//! Actions are produced fresh every turn by the external action generator and
//! consumed immediately by the resolution pipeline; only the resolved outcome
//! is persisted. The action and stance vocabularies are closed sets: the
//! wire decode in [`crate::codec`] maps anything else to the documented
//! fallback variant rather than erroring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::effect::EffectKind;

/// Smallest base power an action may carry.
pub const MIN_BASE_POWER: u32 = 8;

/// Largest base power an action may carry.
pub const MAX_BASE_POWER: u32 = 22;

/// Base power used when the generator supplies none, and by the fallback
/// attack the engine forces when generation fails outright.
pub const DEFAULT_BASE_POWER: u32 = 15;

/// Most icons an action may carry (presentation metadata only).
pub const MAX_ICONS: usize = 3;

// =============================================================================
// ActionKind / Stance
// =============================================================================

/// The closed set of action kinds. Unknown wire tokens decode to `Attack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// A direct strike.
    Attack,
    /// A guarded posture; always hits, never crits, halves the opponent's
    /// next offensive action.
    Defend,
    /// A riposte; dampens the opponent's next offensive action.
    Counter,
    /// The meter-gated ultimate technique.
    Special,
    /// An evasive maneuver.
    Dodge,
}

impl ActionKind {
    /// Parses a wire token (case-insensitive). Returns `None` outside the
    /// closed set.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "ATTACK" => Some(Self::Attack),
            "DEFEND" => Some(Self::Defend),
            "COUNTER" => Some(Self::Counter),
            "SPECIAL" => Some(Self::Special),
            "DODGE" => Some(Self::Dodge),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Attack => "ATTACK",
            Self::Defend => "DEFEND",
            Self::Counter => "COUNTER",
            Self::Special => "SPECIAL",
            Self::Dodge => "DODGE",
        };
        write!(f, "{token}")
    }
}

/// The stance an action targets. Unknown wire tokens decode to `Offensive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    /// Pressing the attack; feeds the combo chain.
    Offensive,
    /// Guarding; resets the combo chain.
    Defensive,
    /// Maneuvering; resets the combo chain.
    Tactical,
}

impl Stance {
    /// Parses a wire token (case-insensitive). Returns `None` outside the
    /// closed set.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "OFFENSIVE" => Some(Self::Offensive),
            "DEFENSIVE" => Some(Self::Defensive),
            "TACTICAL" => Some(Self::Tactical),
            _ => None,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Offensive => "OFFENSIVE",
            Self::Defensive => "DEFENSIVE",
            Self::Tactical => "TACTICAL",
        };
        write!(f, "{token}")
    }
}

// =============================================================================
// Action
// =============================================================================

/// One turn's proposed move.
///
/// Base power is clamped to `[8, 22]` at construction. Icons are
/// presentation metadata carried through to records; they never influence
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    actor: CombatantId,
    kind: ActionKind,
    description: String,
    stance: Stance,
    base_power: u32,
    icons: Vec<String>,
    reasoning: String,
}

impl Action {
    /// Creates an action, clamping `base_power` into `[8, 22]`.
    #[must_use]
    pub fn new(
        actor: CombatantId,
        kind: ActionKind,
        stance: Stance,
        base_power: u32,
        description: &str,
    ) -> Self {
        Self {
            actor,
            kind,
            description: description.to_string(),
            stance,
            base_power: base_power.clamp(MIN_BASE_POWER, MAX_BASE_POWER),
            icons: Vec::new(),
            reasoning: String::new(),
        }
    }

    /// Sets the presentation icons (truncated to [`MAX_ICONS`]).
    #[must_use]
    pub fn with_icons(mut self, icons: Vec<String>) -> Self {
        self.icons = icons;
        self.icons.truncate(MAX_ICONS);
        self
    }

    /// Sets the tactical reasoning line.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: &str) -> Self {
        self.reasoning = reasoning.to_string();
        self
    }

    /// The deterministic action the engine forces when generation fails:
    /// a plain attack at the default base power.
    #[must_use]
    pub fn fallback(actor: CombatantId) -> Self {
        Self::new(
            actor,
            ActionKind::Attack,
            Stance::Offensive,
            DEFAULT_BASE_POWER,
            "Performs a basic attack",
        )
        .with_icons(vec!["⚔️".to_string()])
        .with_reasoning("Fallback action due to processing error")
    }

    /// Returns the acting combatant's id.
    #[must_use]
    pub const fn actor(&self) -> CombatantId {
        self.actor
    }

    /// Returns the action kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Returns the short natural-language description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the stance.
    #[must_use]
    pub const fn stance(&self) -> Stance {
        self.stance
    }

    /// Returns the base power in `[8, 22]`.
    #[must_use]
    pub const fn base_power(&self) -> u32 {
        self.base_power
    }

    /// Returns the presentation icons.
    #[must_use]
    pub fn icons(&self) -> &[String] {
        &self.icons
    }

    /// Returns the tactical reasoning line.
    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }
}

// =============================================================================
// JudgeVerdict
// =============================================================================

/// Fallback commentary used when the judge oracle cannot be consulted.
pub const DEFAULT_JUDGE_COMMENTARY: &str = "The judge maintains balance in the battle.";

/// The judge oracle's scoring of an action.
///
/// The multiplier is clamped to `[0.1, 2.0]` at construction; the effect is
/// already a member of the closed [`EffectKind`] set. `Default` is the
/// degraded-mode verdict: neutral multiplier, no effect, stock commentary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    multiplier: f64,
    effect: EffectKind,
    commentary: String,
}

impl JudgeVerdict {
    /// Creates a verdict, clamping the multiplier into `[0.1, 2.0]` and
    /// mapping non-finite values to 1.0.
    #[must_use]
    pub fn new(multiplier: f64, effect: EffectKind, commentary: &str) -> Self {
        let multiplier = if multiplier.is_finite() {
            multiplier.clamp(0.1, 2.0)
        } else {
            1.0
        };
        Self {
            multiplier,
            effect,
            commentary: commentary.to_string(),
        }
    }

    /// Returns the clamped effectiveness multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns the named status effect ([`EffectKind::None`] when absent).
    #[must_use]
    pub const fn effect(&self) -> EffectKind {
        self.effect
    }

    /// Returns the judge's commentary line.
    #[must_use]
    pub fn commentary(&self) -> &str {
        &self.commentary
    }
}

impl Default for JudgeVerdict {
    fn default() -> Self {
        Self::new(1.0, EffectKind::None, DEFAULT_JUDGE_COMMENTARY)
    }
}

// =============================================================================
// Tests
// =============================================================================
