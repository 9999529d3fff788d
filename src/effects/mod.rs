//! The atomic effect library and its orchestration: catalog lookup, timing
//! dispatch, conflict resolution, and state application.
//!
//! Effects are data, not subclasses: one `AtomicEffect` enum of category
//! sub-enums, each implementing the same three-operation contract —
//! construction validates (`AtomKind::instantiate`), `can_trigger_at` gates
//! timing, `execute` reads the context and returns descriptive results.

pub mod applicator;
pub mod catalog;
pub mod conflict;
pub mod damage;
pub mod defense;
pub mod heal;
pub mod modifier;
pub mod special;
pub mod stat_stage;
pub mod status;
pub mod trigger;

use thiserror::Error;

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::timing::Timing;

pub use catalog::{AtomKind, CatalogEntry, EffectCatalog};
pub use damage::DamageEffect;
pub use defense::DefenseEffect;
pub use heal::HealEffect;
pub use modifier::ModifierEffect;
pub use special::SpecialEffect;
pub use stat_stage::StatStageEffect;
pub use status::AilmentEffect;

/// Rejected effect construction or lookup. None of these abort a battle; the
/// offending effect simply contributes nothing.
#[derive(Debug, Error, PartialEq)]
pub enum EffectError {
    #[error("effect argument {index} out of range: {value}")]
    ArgOutOfRange { index: usize, value: f64 },
    #[error("unknown effect id {0}")]
    UnknownId(u16),
    #[error("unknown atom kind name '{0}'")]
    UnknownKind(String),
}

/// One atomic effect, fully parameterized from its skill argument slice.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicEffect {
    Damage(DamageEffect),
    Heal(HealEffect),
    StatStage(StatStageEffect),
    Ailment(AilmentEffect),
    Defense(DefenseEffect),
    Modifier(ModifierEffect),
    Special(SpecialEffect),
}

impl AtomicEffect {
    /// Intrinsic timing eligibility for this effect kind. The catalog entry's
    /// timing list further narrows where it is dispatched.
    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        match self {
            AtomicEffect::Damage(e) => e.can_trigger_at(timing),
            AtomicEffect::Heal(e) => e.can_trigger_at(timing),
            AtomicEffect::StatStage(e) => e.can_trigger_at(timing),
            AtomicEffect::Ailment(e) => e.can_trigger_at(timing),
            AtomicEffect::Defense(e) => e.can_trigger_at(timing),
            AtomicEffect::Modifier(e) => e.can_trigger_at(timing),
            AtomicEffect::Special(e) => e.can_trigger_at(timing),
        }
    }

    /// Run the effect against the context. Descriptive: combatant mutation is
    /// the applicator's job; only the context's in-flight numbers may change.
    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match self {
            AtomicEffect::Damage(e) => e.execute(ctx),
            AtomicEffect::Heal(e) => e.execute(ctx),
            AtomicEffect::StatStage(e) => e.execute(ctx),
            AtomicEffect::Ailment(e) => e.execute(ctx),
            AtomicEffect::Defense(e) => e.execute(ctx),
            AtomicEffect::Modifier(e) => e.execute(ctx),
            AtomicEffect::Special(e) => e.execute(ctx),
        }
    }
}

/// Result constructor used by every category module; the trigger fills in the
/// catalog name afterwards.
pub(crate) fn emit(
    ctx: &EffectContext<'_>,
    target: EffectTarget,
    outcome: Outcome,
    message: String,
) -> EffectResult {
    EffectResult {
        effect_id: ctx.effect_id,
        name: String::new(),
        success: true,
        target,
        outcome,
        message,
    }
}

/// A result that records the effect fired but achieved nothing.
pub(crate) fn emit_failed(ctx: &EffectContext<'_>, message: String) -> EffectResult {
    EffectResult {
        effect_id: ctx.effect_id,
        name: String::new(),
        success: false,
        target: EffectTarget::Attacker,
        outcome: Outcome::Message,
        message,
    }
}

/// Validate a chance argument into [0, 100].
pub(crate) fn chance_arg(value: f64, index: usize) -> Result<f64, EffectError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(EffectError::ArgOutOfRange { index, value });
    }
    Ok(value)
}

/// Validate a positive (or zero) argument.
pub(crate) fn non_negative_arg(value: f64, index: usize) -> Result<f64, EffectError> {
    if value < 0.0 || !value.is_finite() {
        return Err(EffectError::ArgOutOfRange { index, value });
    }
    Ok(value)
}

/// Turn-count argument: 0 means "until battle end" (stored as -1).
pub(crate) fn turns_arg(value: f64, index: usize) -> Result<i32, EffectError> {
    if value < 0.0 || value > 99.0 {
        return Err(EffectError::ArgOutOfRange { index, value });
    }
    let turns = value as i32;
    Ok(if turns == 0 { -1 } else { turns })
}
