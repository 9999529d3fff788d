//! In-flight number modifiers: power, accuracy, crit rate, and priority via
//! multiply/add/set modes, plus the certain-outcome judgments (always hit,
//! always crit, crit guard) and the miss self-penalty.

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::state::{PersistentEffect, PersistentKind};
use crate::battle::stats::crit_rate;
use crate::battle::timing::Timing;
use crate::effects::{emit, non_negative_arg, turns_arg, EffectError};

pub const CRIT_GUARD_KEY: &str = "crit_guard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyMode {
    /// Value is a percent of the current number (120 = ×1.2).
    Multiply,
    /// Value is added to the current number.
    Add,
    /// Value replaces the current number.
    Set,
}

impl ModifyMode {
    fn from_code(code: f64, index: usize) -> Result<ModifyMode, EffectError> {
        match code as i32 {
            0 => Ok(ModifyMode::Multiply),
            1 => Ok(ModifyMode::Add),
            2 => Ok(ModifyMode::Set),
            _ => Err(EffectError::ArgOutOfRange { index, value: code }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModifierEffect {
    Power { mode: ModifyMode, value: f64 },
    Accuracy { mode: ModifyMode, value: f64 },
    CritRate { mode: ModifyMode, value: f64 },
    Priority { mode: ModifyMode, value: f64 },
    /// This attack cannot miss.
    AlwaysHit,
    /// This attack is a guaranteed crit.
    AlwaysCrit,
    /// Incoming crits suppressed for a few turns.
    CritGuard { turns: i32 },
    /// Attacker hurts itself for a fraction of max HP when the skill misses.
    MissPenalty { percent: f64 },
}

impl ModifierEffect {
    pub fn power(args: &[f64]) -> Result<Self, EffectError> {
        let mode = ModifyMode::from_code(args.first().copied().unwrap_or(0.0), 0)?;
        let value = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(ModifierEffect::Power { mode, value })
    }

    pub fn accuracy(args: &[f64]) -> Result<Self, EffectError> {
        let mode = ModifyMode::from_code(args.first().copied().unwrap_or(0.0), 0)?;
        let value = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(ModifierEffect::Accuracy { mode, value })
    }

    pub fn crit(args: &[f64]) -> Result<Self, EffectError> {
        let mode = ModifyMode::from_code(args.first().copied().unwrap_or(0.0), 0)?;
        let value = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(ModifierEffect::CritRate { mode, value })
    }

    pub fn priority(args: &[f64]) -> Result<Self, EffectError> {
        let mode = ModifyMode::from_code(args.first().copied().unwrap_or(0.0), 0)?;
        let value = args.get(1).copied().unwrap_or(0.0);
        if !value.is_finite() || value.abs() > 9.0 {
            return Err(EffectError::ArgOutOfRange { index: 1, value });
        }
        Ok(ModifierEffect::Priority { mode, value })
    }

    pub fn always_hit(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(ModifierEffect::AlwaysHit)
    }

    pub fn always_crit(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(ModifierEffect::AlwaysCrit)
    }

    pub fn crit_guard(args: &[f64]) -> Result<Self, EffectError> {
        let turns = turns_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(ModifierEffect::CritGuard { turns })
    }

    pub fn miss_penalty(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if percent > 100.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: percent });
        }
        Ok(ModifierEffect::MissPenalty { percent })
    }

    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        match self {
            ModifierEffect::Power { .. } => {
                matches!(timing, Timing::BeforeDamageCalc | Timing::AfterDamageCalc)
            }
            ModifierEffect::Accuracy { .. } => matches!(timing, Timing::BeforeHitCheck),
            ModifierEffect::CritRate { .. } => matches!(timing, Timing::BeforeCritCheck),
            ModifierEffect::Priority { .. } => matches!(timing, Timing::BeforeSpeedCheck),
            ModifierEffect::AlwaysHit => matches!(timing, Timing::HitCheck),
            ModifierEffect::AlwaysCrit => matches!(timing, Timing::CritCheck),
            ModifierEffect::CritGuard { .. } => {
                matches!(timing, Timing::AfterSkill | Timing::BattleStart)
            }
            ModifierEffect::MissPenalty { .. } => matches!(timing, Timing::OnEvade),
        }
    }

    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match *self {
            ModifierEffect::Power { mode, value } => {
                match mode {
                    ModifyMode::Multiply => ctx.damage_multiplier *= value / 100.0,
                    ModifyMode::Add => ctx.damage += value as i32,
                    ModifyMode::Set => ctx.damage = value as i32,
                }
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Message,
                    format!("power adjusted ({mode:?} {value})"),
                )]
            }
            ModifierEffect::Accuracy { mode, value } => {
                let base = ctx.skill.accuracy;
                ctx.hit_rate_delta += match mode {
                    ModifyMode::Multiply => base * (value / 100.0 - 1.0),
                    ModifyMode::Add => value,
                    ModifyMode::Set => value - base,
                };
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Message,
                    format!("accuracy adjusted ({mode:?} {value})"),
                )]
            }
            ModifierEffect::CritRate { mode, value } => {
                let base = crit_rate(ctx.skill.crit_stage);
                ctx.crit_rate_delta += match mode {
                    ModifyMode::Multiply => base * (value / 100.0 - 1.0),
                    ModifyMode::Add => value,
                    ModifyMode::Set => value - base,
                };
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Message,
                    format!("crit rate adjusted ({mode:?} {value})"),
                )]
            }
            ModifierEffect::Priority { mode, value } => {
                ctx.priority_delta += match mode {
                    ModifyMode::Multiply => (ctx.skill.priority as f64 * (value / 100.0 - 1.0)) as i32,
                    ModifyMode::Add => value as i32,
                    ModifyMode::Set => value as i32 - ctx.skill.priority,
                };
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Message,
                    format!("priority adjusted ({mode:?} {value})"),
                )]
            }
            ModifierEffect::AlwaysHit => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::AlwaysHit,
                "the attack cannot miss".to_string(),
            )],
            ModifierEffect::AlwaysCrit => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::AlwaysCrit,
                "the attack aims for a weak point".to_string(),
            )],
            ModifierEffect::CritGuard { turns } => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::InstallPersistent {
                    name: CRIT_GUARD_KEY.to_string(),
                    effect: PersistentEffect {
                        kind: PersistentKind::CritGuard,
                        turns_left: turns,
                        magnitude: 0.0,
                        element: None,
                    },
                },
                format!("{} shrouds its weak points", ctx.attacker.name),
            )],
            ModifierEffect::MissPenalty { percent } => {
                if !ctx.missed {
                    return Vec::new();
                }
                let amount = (ctx.attacker.max_hp() as f64 * percent / 100.0) as i32;
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Damage { amount },
                    format!("{} crashes from the missed attack", ctx.attacker.name),
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::rng::Rng;
    use crate::battle::state::{PetState, SkillDefinition};
    use crate::battle::stats::{calculate_stats, BaseStats, Nature};
    use crate::battle::type_chart::element;

    fn pet(name: &str) -> PetState {
        let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 50, Nature::NEUTRAL);
        PetState::new(1, name, 1, 50, (element::WIND, None), stats, Vec::new())
    }

    struct Run {
        results: Vec<EffectResult>,
        damage: i32,
        damage_multiplier: f64,
        hit_rate_delta: f64,
        crit_rate_delta: f64,
        priority_delta: i32,
    }

    fn run(effect: &ModifierEffect, missed: bool) -> Run {
        let attacker = pet("a");
        let defender = pet("d");
        let mut skill = SkillDefinition::plain_attack(5, "gust", element::WIND, 60);
        skill.accuracy = 80.0;
        skill.priority = 1;
        let mut rng = Rng::new(6);
        let mut ctx = EffectContext {
            attacker: &attacker,
            defender: &defender,
            skill: &skill,
            timing: Timing::BeforeDamageCalc,
            turn: 1,
            effect_id: 55,
            args: &[],
            original_damage: 50,
            damage: 50,
            is_crit: false,
            missed,
            blocked: false,
            damage_multiplier: 1.0,
            hit_rate_delta: 0.0,
            crit_rate_delta: 0.0,
            priority_delta: 0,
            rng: &mut rng,
        };
        let results = effect.execute(&mut ctx);
        Run {
            results,
            damage: ctx.damage,
            damage_multiplier: ctx.damage_multiplier,
            hit_rate_delta: ctx.hit_rate_delta,
            crit_rate_delta: ctx.crit_rate_delta,
            priority_delta: ctx.priority_delta,
        }
    }

    #[test]
    fn power_modes_touch_the_right_number() {
        let mul = run(&ModifierEffect::power(&[0.0, 150.0]).unwrap(), false);
        assert_eq!(mul.damage_multiplier, 1.5);
        assert_eq!(mul.damage, 50);

        let add = run(&ModifierEffect::power(&[1.0, 25.0]).unwrap(), false);
        assert_eq!(add.damage, 75);

        let set = run(&ModifierEffect::power(&[2.0, 10.0]).unwrap(), false);
        assert_eq!(set.damage, 10);
    }

    #[test]
    fn accuracy_set_mode_lands_on_target_value() {
        // Base 80: set to 100 -> delta +20.
        let set = run(&ModifierEffect::accuracy(&[2.0, 100.0]).unwrap(), false);
        assert_eq!(set.hit_rate_delta, 20.0);
        let mul = run(&ModifierEffect::accuracy(&[0.0, 50.0]).unwrap(), false);
        assert_eq!(mul.hit_rate_delta, -40.0);
    }

    #[test]
    fn crit_add_mode_accumulates_delta() {
        let add = run(&ModifierEffect::crit(&[1.0, 25.0]).unwrap(), false);
        assert_eq!(add.crit_rate_delta, 25.0);
    }

    #[test]
    fn priority_set_mode_accounts_for_skill_priority() {
        // Skill priority 1: set to 3 -> delta +2.
        let set = run(&ModifierEffect::priority(&[2.0, 3.0]).unwrap(), false);
        assert_eq!(set.priority_delta, 2);
    }

    #[test]
    fn miss_penalty_only_fires_on_a_miss() {
        let effect = ModifierEffect::miss_penalty(&[25.0]).unwrap();
        assert!(run(&effect, false).results.is_empty());
        let missed = run(&effect, true);
        let expected = pet("a").max_hp() / 4;
        assert_eq!(missed.results[0].outcome, Outcome::Damage { amount: expected });
        assert_eq!(missed.results[0].target, EffectTarget::Attacker);
    }

    #[test]
    fn judgment_outcomes_are_certain_class() {
        let hit = run(&ModifierEffect::always_hit(&[]).unwrap(), false);
        assert_eq!(hit.results[0].outcome, Outcome::AlwaysHit);
        let crit = run(&ModifierEffect::always_crit(&[]).unwrap(), false);
        assert_eq!(crit.results[0].outcome, Outcome::AlwaysCrit);
    }

    #[test]
    fn unknown_mode_code_is_rejected() {
        assert!(ModifierEffect::power(&[3.0, 100.0]).is_err());
    }
}
