//! Strict decode of the `||`-delimited AI wire format.
//!
//! Both collaborators answer prompts with a single `||`-separated line:
//!
//! ```text
//! ATTACK||Launches a rapid series of strikes||OFFENSIVE||18||⚔️,💨||Exploiting a gap
//! 1.2||BURN||A powerful strike that leaves the opponent vulnerable.
//! ```
//!
//! Decoding is *total*: every field validates against its closed vocabulary
//! or numeric range and falls back to a documented default on any failure.
//! A completely garbled response therefore still yields a usable value;
//! malformed AI output must never abort turn resolution.

use crate::action::{Action, ActionKind, JudgeVerdict, Stance, DEFAULT_BASE_POWER, MAX_ICONS};
use crate::combatant::CombatantId;
use crate::effect::EffectKind;

/// Description used when the generator supplies none.
pub const DEFAULT_ACTION_DESCRIPTION: &str = "Performs a tactical move";

/// Reasoning used when the generator supplies none.
pub const DEFAULT_ACTION_REASONING: &str = "Tactical decision based on battle conditions";

/// Commentary used when the judge supplies none.
pub const DEFAULT_VERDICT_COMMENTARY: &str = "The judge observes the exchange carefully.";

/// Icon used when the generator supplies none.
const DEFAULT_ICON: &str = "⚔️";

/// Strips the wrapping noise models tend to add: stray quotes, braces,
/// brackets, and embedded newlines.
fn clean(raw: &str) -> String {
    raw.replace(['\n', '\r'], " ")
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '{' | '['))
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '}' | ']'))
        .to_string()
}

/// Returns the trimmed field at `index`, if present and non-empty.
fn field(parts: &[&str], index: usize) -> Option<String> {
    parts
        .get(index)
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
}

/// Decodes a generator response line into an [`Action`] for `actor`.
///
/// Field order: kind, description, stance, base power, icons, reasoning.
/// Every field falls back independently: unknown kind → `Attack`, unknown
/// stance → `Offensive`, unparseable power → 15 (then clamped to `[8, 22]`
/// by the `Action` constructor), missing icons → a single default icon.
#[must_use]
pub fn decode_action(actor: CombatantId, raw: &str) -> Action {
    let cleaned = clean(raw);
    let parts: Vec<&str> = cleaned.split("||").collect();

    let kind = field(&parts, 0)
        .and_then(|token| ActionKind::from_token(&token))
        .unwrap_or(ActionKind::Attack);
    let description =
        field(&parts, 1).unwrap_or_else(|| DEFAULT_ACTION_DESCRIPTION.to_string());
    let stance = field(&parts, 2)
        .and_then(|token| Stance::from_token(&token))
        .unwrap_or(Stance::Offensive);
    let base_power = field(&parts, 3)
        .and_then(|token| token.parse::<u32>().ok())
        .unwrap_or(DEFAULT_BASE_POWER);
    let icons: Vec<String> = field(&parts, 4)
        .map(|raw_icons| {
            raw_icons
                .split(',')
                .map(str::trim)
                .filter(|icon| !icon.is_empty())
                .take(MAX_ICONS)
                .map(ToString::to_string)
                .collect()
        })
        .filter(|icons: &Vec<String>| !icons.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_ICON.to_string()]);
    let reasoning = field(&parts, 5).unwrap_or_else(|| DEFAULT_ACTION_REASONING.to_string());

    Action::new(actor, kind, stance, base_power, &description)
        .with_icons(icons)
        .with_reasoning(&reasoning)
}

/// Decodes a judge response line into a [`JudgeVerdict`].
///
/// Field order: multiplier, effect, commentary. An unparseable multiplier
/// decodes to 1.0 (the constructor additionally clamps to `[0.1, 2.0]`),
/// an unknown effect token to [`EffectKind::None`], and missing commentary
/// to a stock line.
#[must_use]
pub fn decode_verdict(raw: &str) -> JudgeVerdict {
    let cleaned = clean(raw);
    let parts: Vec<&str> = cleaned.split("||").collect();

    let multiplier = field(&parts, 0)
        .and_then(|token| token.parse::<f64>().ok())
        .unwrap_or(1.0);
    let effect = field(&parts, 1)
        .and_then(|token| EffectKind::from_token(&token))
        .unwrap_or(EffectKind::None);
    let commentary =
        field(&parts, 2).unwrap_or_else(|| DEFAULT_VERDICT_COMMENTARY.to_string());

    JudgeVerdict::new(multiplier, effect, &commentary)
}

// =============================================================================
// Tests
// =============================================================================
