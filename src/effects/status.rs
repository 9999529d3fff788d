//! Status ailment atoms: targeted infliction, random pool picks,
//! escalating-chance attempts, and the flinch rider.

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::state::StatusKind;
use crate::battle::timing::Timing;
use crate::effects::{chance_arg, emit, emit_failed, EffectError};

/// Pool used by the random infliction atom.
const RANDOM_POOL: [StatusKind; 5] = [
    StatusKind::Poison,
    StatusKind::Burn,
    StatusKind::Paralysis,
    StatusKind::Sleep,
    StatusKind::Confusion,
];

#[derive(Debug, Clone, PartialEq)]
pub enum AilmentEffect {
    /// Inflict one status on the defender with a percent chance.
    Inflict { status: StatusKind, chance: f64, duration: u8 },
    /// Inflict a random status from the standard pool.
    RandomPool { chance: f64, duration: u8 },
    /// Chance grows by `step` for every previous failed attempt in this
    /// battle; resets once it lands.
    CumulativeChance { status: StatusKind, base_chance: f64, step: f64, duration: u8 },
    /// One-turn flinch rider on a damaging hit.
    Flinch { chance: f64 },
}

fn status_arg(value: f64, index: usize) -> Result<StatusKind, EffectError> {
    if value < 0.0 {
        return Err(EffectError::ArgOutOfRange { index, value });
    }
    StatusKind::from_slot(value as usize).ok_or(EffectError::ArgOutOfRange { index, value })
}

fn duration_arg(value: f64, index: usize) -> Result<u8, EffectError> {
    if !(1.0..=9.0).contains(&value) {
        return Err(EffectError::ArgOutOfRange { index, value });
    }
    Ok(value as u8)
}

impl AilmentEffect {
    pub fn inflict(args: &[f64]) -> Result<Self, EffectError> {
        let status = status_arg(args.first().copied().unwrap_or(-1.0), 0)?;
        let chance = chance_arg(args.get(1).copied().unwrap_or(100.0), 1)?;
        let duration = duration_arg(args.get(2).copied().unwrap_or(0.0), 2)?;
        Ok(AilmentEffect::Inflict { status, chance, duration })
    }

    pub fn random_pool(args: &[f64]) -> Result<Self, EffectError> {
        let chance = chance_arg(args.first().copied().unwrap_or(100.0), 0)?;
        let duration = duration_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(AilmentEffect::RandomPool { chance, duration })
    }

    pub fn cumulative(args: &[f64]) -> Result<Self, EffectError> {
        let status = status_arg(args.first().copied().unwrap_or(-1.0), 0)?;
        let base = chance_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        let step = chance_arg(args.get(2).copied().unwrap_or(0.0), 2)?;
        let duration = duration_arg(args.get(3).copied().unwrap_or(0.0), 3)?;
        Ok(AilmentEffect::CumulativeChance { status, base_chance: base, step, duration })
    }

    pub fn flinch(args: &[f64]) -> Result<Self, EffectError> {
        let chance = chance_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(AilmentEffect::Flinch { chance })
    }

    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        match self {
            // Flinch checks the damage actually dealt, so it rides the apply
            // step; everything else rolls once per landed skill.
            AilmentEffect::Flinch { .. } => matches!(timing, Timing::AfterDamageApply),
            _ => matches!(timing, Timing::AfterSkill),
        }
    }

    fn try_inflict(
        ctx: &EffectContext<'_>,
        status: StatusKind,
        duration: u8,
    ) -> Vec<EffectResult> {
        if ctx.defender.active_status().is_some() {
            return vec![emit_failed(
                ctx,
                format!("{} already has a status", ctx.defender.name),
            )];
        }
        vec![emit(
            ctx,
            EffectTarget::Defender,
            Outcome::Status { status, duration },
            format!("{} is afflicted with {}", ctx.defender.name, status.as_str()),
        )]
    }

    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match *self {
            AilmentEffect::Inflict { status, chance, duration } => {
                if !ctx.rng.chance(chance) {
                    return Vec::new();
                }
                Self::try_inflict(ctx, status, duration)
            }
            AilmentEffect::RandomPool { chance, duration } => {
                if !ctx.rng.chance(chance) {
                    return Vec::new();
                }
                let pick = RANDOM_POOL[ctx.rng.range_i32(0, RANDOM_POOL.len() as i32 - 1) as usize];
                Self::try_inflict(ctx, pick, duration)
            }
            AilmentEffect::CumulativeChance { status, base_chance, step, duration } => {
                let key = format!("status_streak:{}", ctx.effect_id);
                let attempts = ctx.attacker.counter(&key).abs();
                let chance = (base_chance + step * attempts as f64).min(100.0);
                if ctx.rng.chance(chance) {
                    let mut results = Self::try_inflict(ctx, status, duration);
                    results.push(emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::SetCounter { key, turns: 0 },
                        String::new(),
                    ));
                    results
                } else {
                    vec![emit(
                        ctx,
                        EffectTarget::Attacker,
                        // Permanent counter; negative values are not ticked down.
                        Outcome::SetCounter { key, turns: -(attempts + 1) },
                        String::new(),
                    )]
                }
            }
            AilmentEffect::Flinch { chance } => {
                if ctx.original_damage <= 0 || !ctx.rng.chance(chance) {
                    return Vec::new();
                }
                Self::try_inflict(ctx, StatusKind::Flinch, 1)
            }
        }
    }
}
