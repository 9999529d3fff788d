//! Battle-stage atoms: single/random/all-stat changes, cumulative stacks,
//! stage transfer between combatants, and counter-backed temporary boosts.
//!
//! Target convention for stage deltas: positive deltas raise the user,
//! negative deltas lower the opponent.

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::state::PetState;
use crate::battle::stats::StatKind;
use crate::battle::timing::Timing;
use crate::effects::{chance_arg, emit, emit_failed, non_negative_arg, EffectError};

/// Argument slots 6 and 7 address the accuracy and evasion stages, which live
/// outside the six-stat stage array.
pub const ACCURACY_SLOT: usize = 6;
pub const EVASION_SLOT: usize = 7;

/// Counter key prefix for temporary boosts; the turn engine parses
/// `stat_boost:<stat_index>:<delta>` to revert the delta on expiry.
pub const TEMP_BOOST_PREFIX: &str = "stat_boost";

pub fn temp_boost_key(stat: StatKind, delta: i8) -> String {
    format!("{TEMP_BOOST_PREFIX}:{}:{delta}", stat.index())
}

/// Parse a temp-boost counter key back into (stat, delta).
pub fn parse_temp_boost_key(key: &str) -> Option<(StatKind, i8)> {
    let mut parts = key.split(':');
    if parts.next() != Some(TEMP_BOOST_PREFIX) {
        return None;
    }
    let stat = StatKind::from_index(parts.next()?.parse::<usize>().ok()?)?;
    let delta = parts.next()?.parse::<i8>().ok()?;
    Some((stat, delta))
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatStageEffect {
    /// One stage slot (0-5 stats, 6 accuracy, 7 evasion) moved by `delta`
    /// with a percent chance.
    Change { slot: usize, chance: f64, delta: i8 },
    /// A random non-HP stat moved by `delta`.
    Random { chance: f64, delta: i8 },
    /// Every stat stage moved by `delta`.
    All { chance: f64, delta: i8 },
    /// Like `Change` but capped at `max_stacks` applications per battle.
    Cumulative { slot: usize, delta: i8, max_stacks: i32 },
    /// Take the opponent's positive stages for yourself.
    Steal,
    /// Copy the opponent's stage spread.
    Copy,
    /// Swap stage spreads with the opponent.
    Swap,
    /// Reset stages: 0 = opponent's, 1 = own, 2 = both.
    Clear { target_code: u8 },
    /// Immediate stage delta that reverts when the named counter expires.
    TempBoost { stat: StatKind, delta: i8, turns: i32 },
}

fn delta_arg(value: f64, index: usize) -> Result<i8, EffectError> {
    if !(-6.0..=6.0).contains(&value) || value == 0.0 {
        return Err(EffectError::ArgOutOfRange { index, value });
    }
    Ok(value as i8)
}

fn slot_arg(value: f64, index: usize) -> Result<usize, EffectError> {
    if !(0.0..=7.0).contains(&value) {
        return Err(EffectError::ArgOutOfRange { index, value });
    }
    Ok(value as usize)
}

impl StatStageEffect {
    pub fn change(args: &[f64]) -> Result<Self, EffectError> {
        let slot = slot_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let chance = chance_arg(args.get(1).copied().unwrap_or(100.0), 1)?;
        let delta = delta_arg(args.get(2).copied().unwrap_or(0.0), 2)?;
        Ok(StatStageEffect::Change { slot, chance, delta })
    }

    pub fn random(args: &[f64]) -> Result<Self, EffectError> {
        let chance = chance_arg(args.first().copied().unwrap_or(100.0), 0)?;
        let delta = delta_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(StatStageEffect::Random { chance, delta })
    }

    pub fn all(args: &[f64]) -> Result<Self, EffectError> {
        let chance = chance_arg(args.first().copied().unwrap_or(100.0), 0)?;
        let delta = delta_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(StatStageEffect::All { chance, delta })
    }

    pub fn cumulative(args: &[f64]) -> Result<Self, EffectError> {
        let slot = slot_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let delta = delta_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        let max = non_negative_arg(args.get(2).copied().unwrap_or(0.0), 2)?;
        if max < 1.0 {
            return Err(EffectError::ArgOutOfRange { index: 2, value: max });
        }
        Ok(StatStageEffect::Cumulative { slot, delta, max_stacks: max as i32 })
    }

    pub fn steal(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(StatStageEffect::Steal)
    }

    pub fn copy(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(StatStageEffect::Copy)
    }

    pub fn swap(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(StatStageEffect::Swap)
    }

    pub fn clear(args: &[f64]) -> Result<Self, EffectError> {
        let code = args.first().copied().unwrap_or(0.0);
        if !(0.0..=2.0).contains(&code) {
            return Err(EffectError::ArgOutOfRange { index: 0, value: code });
        }
        Ok(StatStageEffect::Clear { target_code: code as u8 })
    }

    pub fn temp_boost(args: &[f64]) -> Result<Self, EffectError> {
        let slot = slot_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let stat = StatKind::from_index(slot)
            .ok_or(EffectError::ArgOutOfRange { index: 0, value: slot as f64 })?;
        let delta = delta_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        let turns = non_negative_arg(args.get(2).copied().unwrap_or(0.0), 2)?;
        if turns < 1.0 {
            return Err(EffectError::ArgOutOfRange { index: 2, value: turns });
        }
        Ok(StatStageEffect::TempBoost { stat, delta, turns: turns as i32 })
    }

    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        matches!(timing, Timing::AfterSkill | Timing::BattleStart | Timing::TurnStart)
    }

    fn stage_target(delta: i8) -> EffectTarget {
        if delta >= 0 {
            EffectTarget::Attacker
        } else {
            EffectTarget::Defender
        }
    }

    fn slot_outcome(slot: usize, delta: i8) -> Outcome {
        match slot {
            ACCURACY_SLOT => Outcome::AccuracyStage { delta },
            EVASION_SLOT => Outcome::EvasionStage { delta },
            _ => Outcome::StatChange {
                stat: StatKind::from_index(slot).unwrap_or(StatKind::Attack),
                delta,
            },
        }
    }

    fn target_pet<'c>(ctx: &'c EffectContext<'_>, delta: i8) -> &'c PetState {
        if delta >= 0 {
            ctx.attacker
        } else {
            ctx.defender
        }
    }

    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match *self {
            StatStageEffect::Change { slot, chance, delta } => {
                if !ctx.rng.chance(chance) {
                    return Vec::new();
                }
                let target = Self::target_pet(ctx, delta);
                let name = target.name.clone();
                vec![emit(
                    ctx,
                    Self::stage_target(delta),
                    Self::slot_outcome(slot, delta),
                    format!("{name}'s stage slot {slot} moves by {delta}"),
                )]
            }
            StatStageEffect::Random { chance, delta } => {
                if !ctx.rng.chance(chance) {
                    return Vec::new();
                }
                // Non-HP combat stats only.
                let pick = ctx.rng.range_i32(1, 5) as usize;
                let stat = StatKind::from_index(pick).unwrap_or(StatKind::Attack);
                vec![emit(
                    ctx,
                    Self::stage_target(delta),
                    Outcome::StatChange { stat, delta },
                    format!("a random stat moves by {delta}"),
                )]
            }
            StatStageEffect::All { chance, delta } => {
                if !ctx.rng.chance(chance) {
                    return Vec::new();
                }
                StatKind::ALL
                    .iter()
                    .map(|&stat| {
                        emit(
                            ctx,
                            Self::stage_target(delta),
                            Outcome::StatChange { stat, delta },
                            format!("{} stage moves by {delta}", stat.as_str()),
                        )
                    })
                    .collect()
            }
            StatStageEffect::Cumulative { slot, delta, max_stacks } => {
                let key = format!("stage_stacks:{}", ctx.effect_id);
                let stacks = ctx.attacker.counter(&key);
                if stacks >= max_stacks {
                    return vec![emit_failed(ctx, "stacked to its limit".to_string())];
                }
                vec![
                    emit(
                        ctx,
                        Self::stage_target(delta),
                        Self::slot_outcome(slot, delta),
                        format!("stack {} of {max_stacks}", stacks + 1),
                    ),
                    // Permanent stack counter: negative values survive the
                    // per-turn decrement.
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::SetCounter { key, turns: -(stacks + 1) },
                        String::new(),
                    ),
                ]
            }
            StatStageEffect::Steal => {
                if !ctx.defender.has_positive_stage() {
                    return vec![emit_failed(ctx, "no boosts to steal".to_string())];
                }
                vec![emit(
                    ctx,
                    EffectTarget::Both,
                    Outcome::StealStages,
                    format!("{} steals the foe's boosts", ctx.attacker.name),
                )]
            }
            StatStageEffect::Copy => vec![emit(
                ctx,
                EffectTarget::Attacker,
                Outcome::CopyStages,
                format!("{} copies the foe's stat changes", ctx.attacker.name),
            )],
            StatStageEffect::Swap => vec![emit(
                ctx,
                EffectTarget::Both,
                Outcome::SwapStages,
                "stat changes swap sides".to_string(),
            )],
            StatStageEffect::Clear { target_code } => {
                let target = match target_code {
                    1 => EffectTarget::Attacker,
                    2 => EffectTarget::Both,
                    _ => EffectTarget::Defender,
                };
                vec![emit(ctx, target, Outcome::ClearStages, "stat changes fade".to_string())]
            }
            StatStageEffect::TempBoost { stat, delta, turns } => {
                let key = temp_boost_key(stat, delta);
                if ctx.attacker.counter(&key) > 0 {
                    return vec![emit_failed(ctx, "boost already active".to_string())];
                }
                vec![
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::StatChange { stat, delta },
                        format!("{} surges for {turns} turns", stat.as_str()),
                    ),
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::SetCounter { key, turns },
                        String::new(),
                    ),
                ]
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

    fn pet(name: &str) -> PetState {
        let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 50, Nature::NEUTRAL);
        PetState::new(1, name, 1, 50, (element::EARTH, None), stats, Vec::new())
    }

    fn run_with(
        effect: &StatStageEffect,
        attacker: &PetState,
        defender: &PetState,
    ) -> Vec<EffectResult> {
        let skill = SkillDefinition::plain_attack(3, "stomp", element::EARTH, 50);
        let mut rng = Rng::new(21);
        let mut ctx = EffectContext {
            attacker,
            defender,
            skill: &skill,
            timing: Timing::AfterSkill,
            turn: 1,
            effect_id: 4,
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
    fn change_validates_slot_chance_delta() {
        assert!(StatStageEffect::change(&[0.0, 100.0, 1.0]).is_ok());
        assert!(StatStageEffect::change(&[8.0, 100.0, 1.0]).is_err());
        assert!(StatStageEffect::change(&[0.0, 120.0, 1.0]).is_err());
        assert!(StatStageEffect::change(&[0.0, 100.0, 0.0]).is_err());
        assert!(StatStageEffect::change(&[0.0, 100.0, 7.0]).is_err());
    }

    #[test]
    fn positive_delta_targets_self_negative_targets_foe() {
        let a = pet("a");
        let d = pet("d");
        let up = StatStageEffect::change(&[1.0, 100.0, 2.0]).unwrap();
        let results = run_with(&up, &a, &d);
        assert_eq!(results[0].target, EffectTarget::Attacker);

        let down = StatStageEffect::change(&[1.0, 100.0, -2.0]).unwrap();
        let results = run_with(&down, &a, &d);
        assert_eq!(results[0].target, EffectTarget::Defender);
        assert_eq!(
            results[0].outcome,
            Outcome::StatChange { stat: StatKind::Attack, delta: -2 }
        );
    }

    #[test]
    fn accuracy_and_evasion_slots_use_their_own_outcomes() {
        let a = pet("a");
        let d = pet("d");
        let acc = StatStageEffect::change(&[6.0, 100.0, 1.0]).unwrap();
        assert_eq!(run_with(&acc, &a, &d)[0].outcome, Outcome::AccuracyStage { delta: 1 });
        let eva = StatStageEffect::change(&[7.0, 100.0, -1.0]).unwrap();
        assert_eq!(run_with(&eva, &a, &d)[0].outcome, Outcome::EvasionStage { delta: -1 });
    }

    #[test]
    fn all_emits_six_changes() {
        let a = pet("a");
        let d = pet("d");
        let all = StatStageEffect::all(&[100.0, 1.0]).unwrap();
        let results = run_with(&all, &a, &d);
        assert_eq!(results.len(), 6);
    }

    #[test]
    fn zero_chance_emits_nothing() {
        let a = pet("a");
        let d = pet("d");
        let never = StatStageEffect::change(&[0.0, 0.0, 1.0]).unwrap();
        assert!(run_with(&never, &a, &d).is_empty());
    }

    #[test]
    fn cumulative_respects_stack_limit() {
        let mut a = pet("a");
        let d = pet("d");
        let effect = StatStageEffect::cumulative(&[1.0, 1.0, 2.0]).unwrap();
        assert!(run_with(&effect, &a, &d)[0].success);
        a.set_counter("stage_stacks:4", -2);
        let capped = run_with(&effect, &a, &d);
        assert!(!capped[0].success);
    }

    #[test]
    fn steal_needs_positive_foe_stages() {
        let a = pet("a");
        let mut d = pet("d");
        let steal = StatStageEffect::steal(&[]).unwrap();
        assert!(!run_with(&steal, &a, &d)[0].success);
        d.bump_stage(StatKind::Attack, 2);
        assert!(run_with(&steal, &a, &d)[0].success);
    }

    #[test]
    fn temp_boost_key_round_trips() {
        let key = temp_boost_key(StatKind::Speed, -3);
        assert_eq!(parse_temp_boost_key(&key), Some((StatKind::Speed, -3)));
        assert_eq!(parse_temp_boost_key("focus"), None);
        assert_eq!(parse_temp_boost_key("stat_boost:9:1"), None);
    }

    #[test]
    fn temp_boost_refuses_double_application() {
        let mut a = pet("a");
        let d = pet("d");
        let effect = StatStageEffect::temp_boost(&[5.0, 2.0, 3.0]).unwrap();
        let first = run_with(&effect, &a, &d);
        assert_eq!(first.len(), 2);
        a.set_counter(&temp_boost_key(StatKind::Speed, 2), 3);
        let second = run_with(&effect, &a, &d);
        assert!(!second[0].success);
    }
}
