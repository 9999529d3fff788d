//! Healing atoms: flat and proportional recovery, regeneration auras, status
//! cures, and PP restoration.

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::state::{PersistentEffect, PersistentKind, StatusKind};
use crate::battle::timing::Timing;
use crate::effects::{emit, emit_failed, non_negative_arg, turns_arg, EffectError};

pub const REGEN_KEY: &str = "regeneration";

#[derive(Debug, Clone, PartialEq)]
pub enum HealEffect {
    /// Flat HP restored to the user.
    Fixed { amount: i32 },
    /// Fraction of the user's max HP restored.
    MaxHpPercent { percent: f64 },
    /// Heals a fraction of max HP at every turn start for a few turns.
    Regeneration { turns: i32, percent: f64 },
    /// Removes the user's active status; `status` of None cures anything.
    Cure { status: Option<StatusKind> },
    /// Restores uses of one of the user's skill slots.
    PpRestore { slot: usize, amount: u8 },
}

impl HealEffect {
    pub fn fixed(args: &[f64]) -> Result<Self, EffectError> {
        let amount = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(HealEffect::Fixed { amount: amount as i32 })
    }

    pub fn max_hp_percent(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(HealEffect::MaxHpPercent { percent })
    }

    pub fn regeneration(args: &[f64]) -> Result<Self, EffectError> {
        let turns = turns_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let percent = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(HealEffect::Regeneration { turns, percent })
    }

    /// Slot 99 (or any slot past the table) cures whatever is active.
    pub fn cure(args: &[f64]) -> Result<Self, EffectError> {
        let raw = non_negative_arg(args.first().copied().unwrap_or(99.0), 0)?;
        Ok(HealEffect::Cure { status: StatusKind::from_slot(raw as usize) })
    }

    pub fn pp_restore(args: &[f64]) -> Result<Self, EffectError> {
        let slot = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let amount = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        if amount > 99.0 {
            return Err(EffectError::ArgOutOfRange { index: 1, value: amount });
        }
        Ok(HealEffect::PpRestore { slot: slot as usize, amount: amount as u8 })
    }

    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        match self {
            HealEffect::Fixed { .. } | HealEffect::MaxHpPercent { .. } => matches!(
                timing,
                Timing::AfterSkill | Timing::TurnEnd | Timing::OnHpChange
            ),
            HealEffect::Regeneration { .. } => matches!(timing, Timing::AfterSkill),
            HealEffect::Cure { .. } => matches!(timing, Timing::AfterSkill | Timing::TurnStart),
            HealEffect::PpRestore { .. } => matches!(timing, Timing::AfterSkill),
        }
    }

    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match *self {
            HealEffect::Fixed { amount } => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::Heal { amount },
                format!("{} restores {amount} HP", ctx.attacker.name),
            )],
            HealEffect::MaxHpPercent { percent } => {
                let amount = (ctx.attacker.max_hp() as f64 * percent / 100.0) as i32;
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Heal { amount },
                    format!("{} restores {percent}% of max HP", ctx.attacker.name),
                )]
            }
            HealEffect::Regeneration { turns, percent } => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::InstallPersistent {
                    name: REGEN_KEY.to_string(),
                    effect: PersistentEffect {
                        kind: PersistentKind::RegenAura,
                        turns_left: turns,
                        magnitude: percent / 100.0,
                        element: None,
                    },
                },
                format!("{} is wrapped in regenerating light", ctx.attacker.name),
            )],
            HealEffect::Cure { status } => {
                let active = ctx.attacker.active_status();
                let cured = match (status, active) {
                    (None, Some(_)) => true,
                    (Some(wanted), Some(active)) => wanted == active,
                    (_, None) => false,
                };
                if !cured {
                    return vec![emit_failed(ctx, "nothing to cure".to_string())];
                }
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::CureStatus { status },
                    format!("{} shakes off its ailment", ctx.attacker.name),
                )]
            }
            HealEffect::PpRestore { slot, amount } => {
                if slot >= ctx.attacker.skills.len() {
                    return vec![emit_failed(ctx, format!("no skill in slot {slot}"))];
                }
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::PpRestore { slot, amount },
                    format!("{} recovers {amount} PP", ctx.attacker.name),
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

    fn pet() -> PetState {
        let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 50, Nature::NEUTRAL);
        PetState::new(
            1,
            "healer",
            1,
            50,
            (element::GRASS, None),
            stats,
            vec![SkillDefinition::plain_attack(1, "tackle", element::NORMAL, 40)],
        )
    }

    fn run(effect: HealEffect, attacker: &PetState) -> Vec<EffectResult> {
        let defender = pet();
        let skill = SkillDefinition::plain_attack(2, "mend", element::GRASS, 0);
        let mut rng = Rng::new(8);
        let mut ctx = EffectContext {
            attacker,
            defender: &defender,
            skill: &skill,
            timing: Timing::AfterSkill,
            turn: 1,
            effect_id: 11,
            args: &[],
            original_damage: 0,
            damage: 0,
            is_crit: false,
            missed: false,
            blocked: false,
            damage_multiplier: 1.0,
            hit_rate_delta: 0.0,
            crit_rate_delta: 0.0,
            priority_delta: 0,
            rng: &mut rng,
        };
        effect.execute(&mut ctx)
    }

    #[test]
    fn percent_heal_scales_from_own_max() {
        let p = pet();
        let results = run(HealEffect::max_hp_percent(&[50.0]).unwrap(), &p);
        assert_eq!(
            results[0].outcome,
            Outcome::Heal { amount: p.max_hp() / 2 }
        );
        assert_eq!(results[0].target, EffectTarget::Attacker);
    }

    #[test]
    fn cure_fails_without_matching_status() {
        let mut p = pet();
        let miss = run(HealEffect::cure(&[99.0]).unwrap(), &p);
        assert!(!miss[0].success);

        p.set_status(StatusKind::Poison, 3);
        let any = run(HealEffect::cure(&[99.0]).unwrap(), &p);
        assert!(any[0].success);

        let wrong = run(HealEffect::cure(&[StatusKind::Burn.slot() as f64]).unwrap(), &p);
        assert!(!wrong[0].success);
    }

    #[test]
    fn regeneration_installs_aura() {
        let p = pet();
        let results = run(HealEffect::regeneration(&[3.0, 12.5]).unwrap(), &p);
        match &results[0].outcome {
            Outcome::InstallPersistent { name, effect } => {
                assert_eq!(name, REGEN_KEY);
                assert_eq!(effect.kind, PersistentKind::RegenAura);
                assert_eq!(effect.turns_left, 3);
                assert_eq!(effect.magnitude, 0.125);
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn pp_restore_checks_slot() {
        let p = pet();
        assert!(run(HealEffect::pp_restore(&[0.0, 5.0]).unwrap(), &p)[0].success);
        assert!(!run(HealEffect::pp_restore(&[4.0, 5.0]).unwrap(), &p)[0].success);
    }
}
