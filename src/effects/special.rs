//! The long tail: sacrifice mechanics, charge-and-release, transform,
//! substitute, encore/disable, delayed kill, type manipulation, max-HP
//! shifts, PP drain, battle-end rewards, instant KO, and leech seed.

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::state::{PersistentEffect, PersistentKind, PetState};
use crate::battle::timing::Timing;
use crate::battle::type_chart::TypeId;
use crate::effects::{chance_arg, emit, emit_failed, non_negative_arg, turns_arg, EffectError};

pub const CHARGE_KEY: &str = "charge";
pub const SUBSTITUTE_KEY: &str = "substitute";
pub const ENCORE_KEY: &str = "encore";
pub const DISABLE_KEY: &str = "disable";
pub const DELAYED_KILL_KEY: &str = "delayed_kill";
pub const LEECH_SEED_KEY: &str = "leech_seed";

/// Counter key holding a pet's last used skill slot, written by the turn
/// engine as `-(slot + 1)` so the per-turn decrement never touches it.
pub const LAST_SLOT_KEY: &str = "last_slot";

pub fn last_used_slot(pet: &PetState) -> Option<usize> {
    let value = pet.counter(LAST_SLOT_KEY);
    if value < 0 {
        Some((-value - 1) as usize)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecialEffect {
    /// Pay HP for a crit-rate bonus on this attack.
    SacrificeCrit { hp_percent: f64, crit_bonus: f64 },
    /// Spend a turn charging, then release with multiplied damage.
    ChargeRelease { multiplier: f64 },
    /// Become a copy of the opponent (stats, types, stages; HP unchanged).
    Transform,
    /// Pay HP for a decoy that soaks hits.
    Substitute { hp_percent: f64 },
    /// Lock the opponent into its last used skill.
    Encore { turns: i32 },
    /// Forbid the opponent's last used skill.
    Disable { turns: i32 },
    /// The opponent faints when the countdown expires.
    DelayedKill { turns: i32 },
    /// Exchange element types with the opponent.
    TypeSwap,
    /// Copy the opponent's element types.
    TypeCopy,
    /// Become a chosen element.
    TypeShift { element: TypeId },
    /// Shift own max HP by a percent of its current maximum.
    MaxHpModify { percent: f64 },
    /// Remove PP from the opponent's last used skill.
    PpDrain { amount: u8 },
    /// Battle-end payout: 0 = experience, 1 = coins, 2 = item roll.
    Reward { kind_code: u8, amount: i32 },
    /// Chance to end the opponent outright.
    InstantKill { chance: f64 },
    /// Seed the opponent: HP drains to the seeder every turn end. Pets of the
    /// immune element shake it off.
    LeechSeed { percent: f64, immune_element: TypeId },
}

impl SpecialEffect {
    pub fn sacrifice_crit(args: &[f64]) -> Result<Self, EffectError> {
        let hp_percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if hp_percent >= 100.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: hp_percent });
        }
        let crit_bonus = chance_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(SpecialEffect::SacrificeCrit { hp_percent, crit_bonus })
    }

    pub fn charge_release(args: &[f64]) -> Result<Self, EffectError> {
        let multiplier = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if multiplier < 1.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: multiplier });
        }
        Ok(SpecialEffect::ChargeRelease { multiplier })
    }

    pub fn transform(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(SpecialEffect::Transform)
    }

    pub fn substitute(args: &[f64]) -> Result<Self, EffectError> {
        let hp_percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if !(1.0..100.0).contains(&hp_percent) {
            return Err(EffectError::ArgOutOfRange { index: 0, value: hp_percent });
        }
        Ok(SpecialEffect::Substitute { hp_percent })
    }

    pub fn encore(args: &[f64]) -> Result<Self, EffectError> {
        let turns = turns_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(SpecialEffect::Encore { turns })
    }

    pub fn disable(args: &[f64]) -> Result<Self, EffectError> {
        let turns = turns_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(SpecialEffect::Disable { turns })
    }

    pub fn delayed_kill(args: &[f64]) -> Result<Self, EffectError> {
        let turns = args.first().copied().unwrap_or(0.0);
        if !(1.0..=9.0).contains(&turns) {
            return Err(EffectError::ArgOutOfRange { index: 0, value: turns });
        }
        Ok(SpecialEffect::DelayedKill { turns: turns as i32 })
    }

    pub fn type_swap(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(SpecialEffect::TypeSwap)
    }

    pub fn type_copy(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(SpecialEffect::TypeCopy)
    }

    pub fn type_shift(args: &[f64]) -> Result<Self, EffectError> {
        let element = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if element < 1.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: element });
        }
        Ok(SpecialEffect::TypeShift { element: TypeId(element as u16) })
    }

    pub fn max_hp_modify(args: &[f64]) -> Result<Self, EffectError> {
        let percent = args.first().copied().unwrap_or(0.0);
        if !percent.is_finite() || percent.abs() > 100.0 || percent == 0.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: percent });
        }
        Ok(SpecialEffect::MaxHpModify { percent })
    }

    pub fn pp_drain(args: &[f64]) -> Result<Self, EffectError> {
        let amount = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if !(1.0..=99.0).contains(&amount) {
            return Err(EffectError::ArgOutOfRange { index: 0, value: amount });
        }
        Ok(SpecialEffect::PpDrain { amount: amount as u8 })
    }

    pub fn reward(args: &[f64]) -> Result<Self, EffectError> {
        let code = args.first().copied().unwrap_or(0.0);
        if !(0.0..=2.0).contains(&code) {
            return Err(EffectError::ArgOutOfRange { index: 0, value: code });
        }
        let amount = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(SpecialEffect::Reward { kind_code: code as u8, amount: amount as i32 })
    }

    pub fn instant_kill(args: &[f64]) -> Result<Self, EffectError> {
        let chance = chance_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(SpecialEffect::InstantKill { chance })
    }

    pub fn leech_seed(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if !(1.0..=50.0).contains(&percent) {
            return Err(EffectError::ArgOutOfRange { index: 0, value: percent });
        }
        let immune = non_negative_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(SpecialEffect::LeechSeed { percent, immune_element: TypeId(immune as u16) })
    }

    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        match self {
            SpecialEffect::SacrificeCrit { .. } => matches!(timing, Timing::BeforeCritCheck),
            SpecialEffect::ChargeRelease { .. } => {
                matches!(timing, Timing::BeforeSkill | Timing::BeforeDamageCalc)
            }
            SpecialEffect::InstantKill { .. } => matches!(timing, Timing::BeforeDamageApply),
            SpecialEffect::Reward { .. } => matches!(timing, Timing::BattleEnd),
            _ => matches!(timing, Timing::AfterSkill),
        }
    }

    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match *self {
            SpecialEffect::SacrificeCrit { hp_percent, crit_bonus } => {
                let cost = (ctx.attacker.max_hp() as f64 * hp_percent / 100.0) as i32;
                if cost >= ctx.attacker.current_hp {
                    return vec![emit_failed(ctx, "not enough HP to sacrifice".to_string())];
                }
                ctx.crit_rate_delta += crit_bonus;
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Damage { amount: cost },
                    format!("{} cuts itself to sharpen its aim", ctx.attacker.name),
                )]
            }
            SpecialEffect::ChargeRelease { multiplier } => {
                match ctx.timing {
                    Timing::BeforeSkill => {
                        if ctx.attacker.has_persistent_kind(PersistentKind::Charge) {
                            return Vec::new();
                        }
                        vec![emit(
                            ctx,
                            EffectTarget::Attacker,
                            Outcome::InstallPersistent {
                                name: CHARGE_KEY.to_string(),
                                effect: PersistentEffect {
                                    kind: PersistentKind::Charge,
                                    // Consumed by the release, not by the
                                    // turn countdown.
                                    turns_left: -1,
                                    magnitude: multiplier,
                                    element: None,
                                },
                            },
                            format!("{} is gathering power", ctx.attacker.name),
                        )]
                    }
                    Timing::BeforeDamageCalc => {
                        let Some((_, charge)) =
                            ctx.attacker.persistent_of_kind(PersistentKind::Charge)
                        else {
                            return Vec::new();
                        };
                        ctx.damage_multiplier *= charge.magnitude;
                        vec![emit(
                            ctx,
                            EffectTarget::Attacker,
                            Outcome::RemovePersistent { name: CHARGE_KEY.to_string() },
                            format!("{} unleashes its stored power", ctx.attacker.name),
                        )]
                    }
                    _ => Vec::new(),
                }
            }
            SpecialEffect::Transform => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::Transform,
                format!("{} transforms into {}", ctx.attacker.name, ctx.defender.name),
            )],
            SpecialEffect::Substitute { hp_percent } => {
                let cost = (ctx.attacker.max_hp() as f64 * hp_percent / 100.0) as i32;
                if cost >= ctx.attacker.current_hp {
                    return vec![emit_failed(ctx, "too weak to make a substitute".to_string())];
                }
                vec![
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::Damage { amount: cost },
                        String::new(),
                    ),
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::InstallPersistent {
                            name: SUBSTITUTE_KEY.to_string(),
                            effect: PersistentEffect {
                                kind: PersistentKind::Substitute,
                                turns_left: -1,
                                magnitude: cost as f64,
                                element: None,
                            },
                        },
                        format!("{} puts up a substitute", ctx.attacker.name),
                    ),
                ]
            }
            SpecialEffect::Encore { turns } => {
                let Some(slot) = last_used_slot(ctx.defender) else {
                    return vec![emit_failed(ctx, "the foe has not moved yet".to_string())];
                };
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::InstallPersistent {
                        name: ENCORE_KEY.to_string(),
                        effect: PersistentEffect {
                            kind: PersistentKind::Encore,
                            turns_left: turns,
                            magnitude: slot as f64,
                            element: None,
                        },
                    },
                    format!("{} must repeat its last move", ctx.defender.name),
                )]
            }
            SpecialEffect::Disable { turns } => {
                let Some(slot) = last_used_slot(ctx.defender) else {
                    return vec![emit_failed(ctx, "the foe has not moved yet".to_string())];
                };
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::InstallPersistent {
                        name: DISABLE_KEY.to_string(),
                        effect: PersistentEffect {
                            kind: PersistentKind::Disable,
                            turns_left: turns,
                            magnitude: slot as f64,
                            element: None,
                        },
                    },
                    format!("{}'s last move is sealed", ctx.defender.name),
                )]
            }
            SpecialEffect::DelayedKill { turns } => {
                if ctx.defender.has_persistent_kind(PersistentKind::DelayedKill) {
                    return vec![emit_failed(ctx, "already doomed".to_string())];
                }
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::InstallPersistent {
                        name: DELAYED_KILL_KEY.to_string(),
                        effect: PersistentEffect {
                            kind: PersistentKind::DelayedKill,
                            turns_left: turns,
                            magnitude: 0.0,
                            element: None,
                        },
                    },
                    format!("doom hangs over {} ({turns} turns)", ctx.defender.name),
                )]
            }
            SpecialEffect::TypeSwap => {
                let (mine, theirs) = (ctx.attacker.types, ctx.defender.types);
                vec![
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::TypeSet { primary: theirs.0, secondary: theirs.1 },
                        format!("{} trades elements with the foe", ctx.attacker.name),
                    ),
                    emit(
                        ctx,
                        EffectTarget::Defender,
                        Outcome::TypeSet { primary: mine.0, secondary: mine.1 },
                        String::new(),
                    ),
                ]
            }
            SpecialEffect::TypeCopy => {
                let theirs = ctx.defender.types;
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::TypeSet { primary: theirs.0, secondary: theirs.1 },
                    format!("{} mirrors the foe's element", ctx.attacker.name),
                )]
            }
            SpecialEffect::TypeShift { element } => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::TypeSet { primary: element, secondary: None },
                format!("{} changes element", ctx.attacker.name),
            )],
            SpecialEffect::MaxHpModify { percent } => {
                let delta = (ctx.attacker.max_hp() as f64 * percent / 100.0) as i32;
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::MaxHpShift { delta },
                    format!("{}'s vitality shifts by {delta}", ctx.attacker.name),
                )]
            }
            SpecialEffect::PpDrain { amount } => {
                let Some(slot) = last_used_slot(ctx.defender) else {
                    return vec![emit_failed(ctx, "the foe has not moved yet".to_string())];
                };
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::PpDrain { slot, amount },
                    format!("{} loses {amount} PP", ctx.defender.name),
                )]
            }
            SpecialEffect::Reward { kind_code, amount } => {
                let reward = match kind_code {
                    0 => "experience",
                    1 => "coins",
                    _ => "item",
                };
                vec![emit(
                    ctx,
                    EffectTarget::Attacker,
                    Outcome::Reward { reward: reward.to_string(), amount },
                    format!("bonus {reward} earned"),
                )]
            }
            SpecialEffect::InstantKill { chance } => {
                if !ctx.rng.chance(chance) {
                    return Vec::new();
                }
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::InstantKill,
                    format!("{} is taken out in one blow", ctx.defender.name),
                )]
            }
            SpecialEffect::LeechSeed { percent, immune_element } => {
                if ctx.defender.types.0 == immune_element
                    || ctx.defender.types.1 == Some(immune_element)
                {
                    return vec![emit_failed(
                        ctx,
                        format!("{} is unaffected by the seed", ctx.defender.name),
                    )];
                }
                if ctx.defender.has_persistent_kind(PersistentKind::DrainAura) {
                    return vec![emit_failed(ctx, "already seeded".to_string())];
                }
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::InstallPersistent {
                        name: LEECH_SEED_KEY.to_string(),
                        effect: PersistentEffect {
                            kind: PersistentKind::DrainAura,
                            turns_left: -1,
                            magnitude: percent / 100.0,
                            element: Some(immune_element),
                        },
                    },
                    format!("{} is seeded", ctx.defender.name),
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::rng::Rng;
    use crate::battle::state::SkillDefinition;
    use crate::battle::stats::{calculate_stats, BaseStats, Nature};
    use crate::battle::type_chart::element;

    fn pet(name: &str, primary: TypeId) -> PetState {
        let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 50, Nature::NEUTRAL);
        PetState::new(
            1,
            name,
            1,
            50,
            (primary, None),
            stats,
            vec![SkillDefinition::plain_attack(1, "tackle", element::NORMAL, 40)],
        )
    }

    fn run(
        effect: &SpecialEffect,
        attacker: &PetState,
        defender: &PetState,
        timing: Timing,
    ) -> (Vec<EffectResult>, f64, f64) {
        let skill = SkillDefinition::plain_attack(7, "ritual", element::DARK, 80);
        let mut rng = Rng::new(13);
        let mut ctx = EffectContext {
            attacker,
            defender,
            skill: &skill,
            timing,
            turn: 1,
            effect_id: 70,
            args: &[],
            original_damage: 40,
            damage: 40,
            is_crit: false,
            missed: false,
            blocked: false,
            damage_multiplier: 1.0,
            hit_rate_delta: 0.0,
            crit_rate_delta: 0.0,
            priority_delta: 0,
            rng: &mut rng,
        };
        let results = effect.execute(&mut ctx);
        (results, ctx.damage_multiplier, ctx.crit_rate_delta)
    }

    #[test]
    fn charge_installs_then_releases() {
        let mut a = pet("a", element::FIRE);
        let d = pet("d", element::GRASS);
        let effect = SpecialEffect::charge_release(&[2.0]).unwrap();

        let (install, _, _) = run(&effect, &a, &d, Timing::BeforeSkill);
        match &install[0].outcome {
            Outcome::InstallPersistent { name, effect } => {
                assert_eq!(name, CHARGE_KEY);
                assert_eq!(effect.magnitude, 2.0);
            }
            other => panic!("expected install, got {other:?}"),
        }

        a.persistent.insert(
            CHARGE_KEY.to_string(),
            PersistentEffect {
                kind: PersistentKind::Charge,
                turns_left: 1,
                magnitude: 2.0,
                element: None,
            },
        );
        let (release, multiplier, _) = run(&effect, &a, &d, Timing::BeforeDamageCalc);
        assert_eq!(multiplier, 2.0);
        assert_eq!(
            release[0].outcome,
            Outcome::RemovePersistent { name: CHARGE_KEY.to_string() }
        );
    }

    #[test]
    fn encore_and_pp_drain_need_a_last_move() {
        let a = pet("a", element::DARK);
        let mut d = pet("d", element::NORMAL);
        let encore = SpecialEffect::encore(&[3.0]).unwrap();
        let (fail, _, _) = run(&encore, &a, &d, Timing::AfterSkill);
        assert!(!fail[0].success);

        d.set_counter(LAST_SLOT_KEY, -1);
        assert_eq!(last_used_slot(&d), Some(0));
        let (hit, _, _) = run(&encore, &a, &d, Timing::AfterSkill);
        assert!(hit[0].success);

        let drain = SpecialEffect::pp_drain(&[3.0]).unwrap();
        let (drained, _, _) = run(&drain, &a, &d, Timing::AfterSkill);
        assert_eq!(drained[0].outcome, Outcome::PpDrain { slot: 0, amount: 3 });
    }

    #[test]
    fn leech_seed_respects_elemental_immunity() {
        let a = pet("a", element::GRASS);
        let immune = pet("d", element::GRASS);
        let seed = SpecialEffect::leech_seed(&[12.5, element::GRASS.0 as f64]).unwrap();
        let (blocked, _, _) = run(&seed, &a, &immune, Timing::AfterSkill);
        assert!(!blocked[0].success);

        let vulnerable = pet("d", element::WATER);
        let (applied, _, _) = run(&seed, &a, &vulnerable, Timing::AfterSkill);
        match &applied[0].outcome {
            Outcome::InstallPersistent { name, effect } => {
                assert_eq!(name, LEECH_SEED_KEY);
                assert_eq!(effect.kind, PersistentKind::DrainAura);
                assert_eq!(effect.magnitude, 0.125);
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn substitute_pays_hp_and_installs_decoy() {
        let a = pet("a", element::NORMAL);
        let d = pet("d", element::NORMAL);
        let effect = SpecialEffect::substitute(&[25.0]).unwrap();
        let (results, _, _) = run(&effect, &a, &d, Timing::AfterSkill);
        assert_eq!(results.len(), 2);
        let cost = a.max_hp() / 4;
        assert_eq!(results[0].outcome, Outcome::Damage { amount: cost });
        match &results[1].outcome {
            Outcome::InstallPersistent { effect, .. } => {
                assert_eq!(effect.magnitude, cost as f64)
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn sacrifice_crit_requires_spare_hp() {
        let mut a = pet("a", element::NORMAL);
        let d = pet("d", element::NORMAL);
        let effect = SpecialEffect::sacrifice_crit(&[30.0, 40.0]).unwrap();
        let (ok, _, crit_delta) = run(&effect, &a, &d, Timing::BeforeCritCheck);
        assert!(ok[0].success);
        assert_eq!(crit_delta, 40.0);

        a.current_hp = 5;
        let (starved, _, _) = run(&effect, &a, &d, Timing::BeforeCritCheck);
        assert!(!starved[0].success);
    }

    #[test]
    fn type_swap_emits_both_sides() {
        let a = pet("a", element::FIRE);
        let d = pet("d", element::WATER);
        let (results, _, _) = run(&SpecialEffect::type_swap(&[]).unwrap(), &a, &d, Timing::AfterSkill);
        assert_eq!(
            results[0].outcome,
            Outcome::TypeSet { primary: element::WATER, secondary: None }
        );
        assert_eq!(
            results[1].outcome,
            Outcome::TypeSet { primary: element::FIRE, secondary: None }
        );
    }

    #[test]
    fn validation_limits() {
        assert!(SpecialEffect::substitute(&[0.0]).is_err());
        assert!(SpecialEffect::leech_seed(&[80.0, 2.0]).is_err());
        assert!(SpecialEffect::delayed_kill(&[0.0]).is_err());
        assert!(SpecialEffect::max_hp_modify(&[0.0]).is_err());
    }
}
