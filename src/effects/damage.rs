//! Direct damage atoms: fixed and proportional hits, recoil, drain,
//! HP-for-power conversion, multi-hit, and the delayed damage timer.

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::state::{PersistentEffect, PersistentKind};
use crate::battle::timing::Timing;
use crate::effects::{emit, emit_failed, non_negative_arg, turns_arg, EffectError};

pub const DELAYED_DAMAGE_KEY: &str = "delayed_damage";

#[derive(Debug, Clone, PartialEq)]
pub enum DamageEffect {
    /// Flat extra damage to the defender.
    Fixed { amount: i32 },
    /// Damage equal to a fraction of the defender's max HP.
    MaxHpPercent { percent: f64 },
    /// Damage equal to a fraction of the defender's current HP.
    CurrentHpPercent { percent: f64 },
    /// Attacker takes a fraction of the damage dealt this attack.
    Recoil { percent: f64 },
    /// Attacker heals a fraction of the damage dealt this attack.
    Drain { percent: f64 },
    /// Attacker pays HP up front; the working damage is boosted.
    HpCostPower { hp_percent: f64, power_percent: f64 },
    /// The computed hit lands several times.
    MultiHit { min_hits: u8, max_hits: u8 },
    /// Fraction of the defender's max HP dealt after a countdown.
    Delayed { turns: i32, percent: f64 },
}

impl DamageEffect {
    pub fn fixed(args: &[f64]) -> Result<Self, EffectError> {
        let amount = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(DamageEffect::Fixed { amount: amount as i32 })
    }

    pub fn max_hp_percent(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(DamageEffect::MaxHpPercent { percent })
    }

    pub fn current_hp_percent(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(DamageEffect::CurrentHpPercent { percent })
    }

    pub fn recoil(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(DamageEffect::Recoil { percent })
    }

    pub fn drain(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(DamageEffect::Drain { percent })
    }

    pub fn hp_cost_power(args: &[f64]) -> Result<Self, EffectError> {
        let hp_percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let power_percent = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DamageEffect::HpCostPower { hp_percent, power_percent })
    }

    pub fn multi_hit(args: &[f64]) -> Result<Self, EffectError> {
        let min = args.first().copied().unwrap_or(0.0);
        let max = args.get(1).copied().unwrap_or(0.0);
        if !(1.0..=9.0).contains(&min) {
            return Err(EffectError::ArgOutOfRange { index: 0, value: min });
        }
        if max < min || max > 9.0 {
            return Err(EffectError::ArgOutOfRange { index: 1, value: max });
        }
        Ok(DamageEffect::MultiHit { min_hits: min as u8, max_hits: max as u8 })
    }

    pub fn delayed(args: &[f64]) -> Result<Self, EffectError> {
        let turns = turns_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let percent = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DamageEffect::Delayed { turns, percent })
    }

    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        match self {
            // Extra damage lands once, after the main hit resolves; works for
            // status-category skills too.
            DamageEffect::Fixed { .. }
            | DamageEffect::MaxHpPercent { .. }
            | DamageEffect::CurrentHpPercent { .. } => {
                matches!(timing, Timing::AfterSkill | Timing::TurnEnd)
            }
            DamageEffect::Recoil { .. } | DamageEffect::Drain { .. } => {
                matches!(timing, Timing::AfterDamageApply)
            }
            DamageEffect::HpCostPower { .. } => matches!(timing, Timing::BeforeDamageCalc),
            DamageEffect::MultiHit { .. } => matches!(timing, Timing::AfterDamageCalc),
            DamageEffect::Delayed { .. } => matches!(timing, Timing::AfterSkill),
        }
    }

    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match *self {
            DamageEffect::Fixed { amount } => vec![emit(
                ctx,
                EffectTarget::Defender,
                Outcome::Damage { amount },
                format!("{} takes {amount} extra damage", ctx.defender.name),
            )],
            DamageEffect::MaxHpPercent { percent } => {
                let amount = (ctx.defender.max_hp() as f64 * percent / 100.0) as i32;
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::Damage { amount },
                    format!("{} loses {percent}% of max HP", ctx.defender.name),
                )]
            }
            DamageEffect::CurrentHpPercent { percent } => {
                let amount = (ctx.defender.current_hp as f64 * percent / 100.0) as i32;
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::Damage { amount },
                    format!("{} loses {percent}% of current HP", ctx.defender.name),
                )]
            }
            DamageEffect::Recoil { percent } => {
                let amount = (ctx.original_damage as f64 * percent / 100.0) as i32;
                if amount <= 0 {
                    return vec![emit_failed(ctx, "no damage to recoil from".to_string())];
                }
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Damage { amount },
                    format!("{} is hurt by recoil", ctx.attacker.name),
                )]
            }
            DamageEffect::Drain { percent } => {
                let amount = (ctx.original_damage as f64 * percent / 100.0) as i32;
                if amount <= 0 {
                    return vec![emit_failed(ctx, "no damage to drain".to_string())];
                }
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Heal { amount },
                    format!("{} drains {amount} HP", ctx.attacker.name),
                )]
            }
            DamageEffect::HpCostPower { hp_percent, power_percent } => {
                let cost = (ctx.attacker.max_hp() as f64 * hp_percent / 100.0) as i32;
                if cost >= ctx.attacker.current_hp {
                    return vec![emit_failed(ctx, "not enough HP to sacrifice".to_string())];
                }
                ctx.damage_multiplier *= 1.0 + power_percent / 100.0;
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Damage { amount: cost },
                    format!("{} sacrifices {cost} HP for power", ctx.attacker.name),
                )]
            }
            DamageEffect::MultiHit { min_hits, max_hits } => {
                let count = ctx.rng.range_i32(min_hits as i32, max_hits as i32).max(1);
                let hits = vec![ctx.damage.max(1); count as usize];
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::MultiHit { hits },
                    format!("hit {count} times"),
                )]
            }
            DamageEffect::Delayed { turns, percent } => {
                let amount = (ctx.defender.max_hp() as f64 * percent / 100.0) as i32;
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::InstallPersistent {
                        name: DELAYED_DAMAGE_KEY.to_string(),
                        effect: PersistentEffect {
                            kind: PersistentKind::DelayedDamage,
                            turns_left: turns,
                            magnitude: amount as f64,
                            element: None,
                        },
                    },
                    format!("{} is marked for delayed damage", ctx.defender.name),
                )]
            }
        }
    }
}
