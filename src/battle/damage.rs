//! Damage pipeline: base formula from level/power/attack-defense ratio, then
//! STAB, type effectiveness, crit, stage-modified stats, caller bonuses, the
//! offensive floor of 1, and the 85–100% variance roll last.

use serde::Serialize;

use crate::battle::rng::Rng;
use crate::battle::state::{PetState, SkillCategory, SkillDefinition};
use crate::battle::stats::StatKind;
use crate::battle::type_chart::{stab_multiplier, TypeChart};

pub const CRIT_MULTIPLIER: f64 = 1.5;

/// Multiplier breakdown alongside the final number, for traces and the API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageBreakdown {
    pub base: i32,
    pub stab: f64,
    pub effectiveness: f64,
    pub crit: f64,
    pub bonus: f64,
    pub variance: f64,
    pub final_damage: i32,
}

impl DamageBreakdown {
    pub fn zero() -> DamageBreakdown {
        DamageBreakdown {
            base: 0,
            stab: 1.0,
            effectiveness: 1.0,
            crit: 1.0,
            bonus: 1.0,
            variance: 1.0,
            final_damage: 0,
        }
    }
}

/// Attack/defense pair for the skill category, stage-modified. Defense is
/// clamped to 1 so a zeroed stat inflates damage instead of dividing by zero.
fn battle_stats(attacker: &PetState, defender: &PetState, skill: &SkillDefinition) -> (i32, i32) {
    match skill.category {
        SkillCategory::Physical => (
            attacker.effective_stat(StatKind::Attack).max(1),
            defender.effective_stat(StatKind::Defense).max(1),
        ),
        SkillCategory::Special => (
            attacker.effective_stat(StatKind::SpAttack).max(1),
            defender.effective_stat(StatKind::SpDefense).max(1),
        ),
        SkillCategory::Status => (0, 1),
    }
}

/// Damage with an explicit variance factor (pass 1.0 for deterministic
/// expectations; the turn engine rolls 0.85–1.0).
pub fn compute_damage_with_variance(
    attacker: &PetState,
    defender: &PetState,
    skill: &SkillDefinition,
    chart: &TypeChart,
    is_crit: bool,
    bonus_multiplier: f64,
    variance: f64,
) -> DamageBreakdown {
    if !skill.category.is_offensive() || skill.power <= 0 {
        return DamageBreakdown::zero();
    }

    let (attack, defense) = battle_stats(attacker, defender, skill);
    let level = attacker.level.clamp(1, 100) as f64;
    let base =
        ((2.0 * level / 5.0 + 2.0) * skill.power as f64 * attack as f64 / defense as f64) / 50.0
            + 2.0;

    let stab = stab_multiplier(skill.element, attacker.types);
    let effectiveness = chart.effectiveness_vs(skill.element, defender.types);
    let crit = if is_crit { CRIT_MULTIPLIER } else { 1.0 };
    let bonus = if bonus_multiplier > 0.0 { bonus_multiplier } else { 1.0 };

    let scaled = base * stab * effectiveness * crit * bonus;
    // Immune match-ups deal nothing; otherwise an offensive skill with real
    // power always lands at least 1 before and after variance.
    let final_damage = if effectiveness == 0.0 {
        0
    } else {
        let floored = (scaled.floor() as i32).max(1);
        ((floored as f64 * variance).floor() as i32).max(1)
    };

    DamageBreakdown {
        base: base.floor() as i32,
        stab,
        effectiveness,
        crit,
        bonus,
        variance,
        final_damage,
    }
}

/// Damage with a fresh variance roll from the battle RNG.
pub fn compute_damage(
    attacker: &PetState,
    defender: &PetState,
    skill: &SkillDefinition,
    chart: &TypeChart,
    is_crit: bool,
    bonus_multiplier: f64,
    rng: &mut Rng,
) -> DamageBreakdown {
    let variance = rng.variance();
    compute_damage_with_variance(attacker, defender, skill, chart, is_crit, bonus_multiplier, variance)
}
