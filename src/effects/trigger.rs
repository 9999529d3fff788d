//! Timing dispatch: resolves a skill's side-effect ids, slices the flat
//! argument list by each entry's fixed arity, and runs every eligible atom.
//! One bad id or a panicking atom contributes nothing; siblings still run.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::battle::context::{EffectContext, EffectResult};
use crate::battle::rng::Rng;
use crate::battle::state::{PetState, SkillDefinition};
use crate::battle::timing::Timing;
use crate::effects::EffectCatalog;

/// Flags describing the attack in flight when a timing fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerFlags {
    pub is_crit: bool,
    pub missed: bool,
    pub blocked: bool,
}

/// Everything a timing invocation produced: the collected results plus the
/// final in-flight numbers the effects were allowed to adjust.
#[derive(Debug, Clone)]
pub struct TriggerOutput {
    pub results: Vec<EffectResult>,
    pub damage: i32,
    pub damage_multiplier: f64,
    pub hit_rate_delta: f64,
    pub crit_rate_delta: f64,
    pub priority_delta: i32,
}

impl TriggerOutput {
    fn empty(damage: i32) -> TriggerOutput {
        TriggerOutput {
            results: Vec::new(),
            damage,
            damage_multiplier: 1.0,
            hit_rate_delta: 0.0,
            crit_rate_delta: 0.0,
            priority_delta: 0,
        }
    }
}

/// Walk a skill's side-effect encoding and return every atom kind with its
/// argument slice, without executing anything. Used by the AI's skill
/// classification and by data validation. Unknown ids are skipped and consume
/// no arguments, mirroring the dispatch path.
pub fn decode_atoms(
    catalog: &EffectCatalog,
    skill: &SkillDefinition,
) -> Vec<(crate::effects::AtomKind, Vec<f64>)> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for &effect_id in &skill.side_effects {
        let Some(entry) = catalog.entry(effect_id) else {
            continue;
        };
        let arity = entry.arity();
        // Short argument lists degrade to empty slices, never a panic.
        let slice_start = cursor.min(skill.effect_args.len());
        let slice_end = (cursor + arity).min(skill.effect_args.len());
        let entry_args = &skill.effect_args[slice_start..slice_end];
        cursor += arity;

        let mut atom_cursor = 0usize;
        for atom in &entry.atoms {
            let atom_start = atom_cursor.min(entry_args.len());
            let atom_end = (atom_cursor + atom.arity()).min(entry_args.len());
            out.push((*atom, entry_args[atom_start..atom_end].to_vec()));
            atom_cursor += atom.arity();
        }
    }
    out
}

/// Fire every effect of `skill` that is eligible at `timing`.
///
/// Argument slicing is positional and independent of the timing: every id in
/// the side-effect list consumes its full arity before the next id is
/// examined, so a skipped timing never shifts later slices. An id missing
/// from the catalog consumes zero arguments and is logged.
#[allow(clippy::too_many_arguments)]
pub fn fire(
    catalog: &EffectCatalog,
    attacker: &PetState,
    defender: &PetState,
    skill: &SkillDefinition,
    timing: Timing,
    turn: u32,
    damage: i32,
    flags: TriggerFlags,
    rng: &mut Rng,
) -> TriggerOutput {
    if skill.side_effects.is_empty() {
        return TriggerOutput::empty(damage);
    }

    let mut ctx = EffectContext {
        attacker,
        defender,
        skill,
        timing,
        turn,
        effect_id: 0,
        args: &[],
        original_damage: damage,
        damage,
        is_crit: flags.is_crit,
        missed: flags.missed,
        blocked: flags.blocked,
        damage_multiplier: 1.0,
        hit_rate_delta: 0.0,
        crit_rate_delta: 0.0,
        priority_delta: 0,
        rng,
    };

    let mut results = Vec::new();
    let mut cursor = 0usize;

    for &effect_id in &skill.side_effects {
        let Some(entry) = catalog.entry(effect_id) else {
            warn!(
                skill = skill.id,
                effect_id, "skill references an unknown effect id; consuming no arguments"
            );
            continue;
        };

        let arity = entry.arity();
        // Short argument lists degrade to empty slices, never a panic.
        let slice_start = cursor.min(skill.effect_args.len());
        let slice_end = (cursor + arity).min(skill.effect_args.len());
        let entry_args = &skill.effect_args[slice_start..slice_end];
        cursor += arity;

        if !entry.timings.contains(&timing) {
            continue;
        }

        let mut atom_cursor = 0usize;
        for atom in &entry.atoms {
            let atom_arity = atom.arity();
            let atom_start = atom_cursor.min(entry_args.len());
            let atom_end = (atom_cursor + atom_arity).min(entry_args.len());
            let atom_args = &entry_args[atom_start..atom_end];
            atom_cursor += atom_arity;

            let effect = match atom.instantiate(atom_args) {
                Ok(effect) => effect,
                Err(err) => {
                    warn!(skill = skill.id, effect_id, ?atom, %err, "atom rejected its arguments");
                    continue;
                }
            };
            if !effect.can_trigger_at(timing) {
                continue;
            }

            ctx.effect_id = effect_id;
            ctx.args = atom_args;

            // A panicking atom is isolated: it produced no results, siblings
            // and the caller keep going.
            let executed =
                panic::catch_unwind(AssertUnwindSafe(|| effect.execute(&mut ctx)));
            match executed {
                Ok(mut atom_results) => {
                    for result in &mut atom_results {
                        result.name = entry.name.clone();
                    }
                    results.extend(atom_results);
                }
                Err(_) => {
                    warn!(skill = skill.id, effect_id, ?atom, "atom panicked during execute; skipped");
                }
            }
        }
    }

    debug!(
        skill = skill.id,
        timing = timing.as_str(),
        produced = results.len(),
        "effect trigger pass complete"
    );

    TriggerOutput {
        results,
        damage: ctx.damage,
        damage_multiplier: ctx.damage_multiplier,
        hit_rate_delta: ctx.hit_rate_delta,
        crit_rate_delta: ctx.crit_rate_delta,
        priority_delta: ctx.priority_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::context::Outcome;
    use crate::battle::stats::{calculate_stats, BaseStats, Nature, StatKind};
    use crate::battle::type_chart::element;

    fn pet(name: &str) -> PetState {
        let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 50, Nature::NEUTRAL);
        PetState::new(1, name, 1, 50, (element::FIRE, None), stats, Vec::new())
    }

    fn skill_with(side_effects: Vec<u16>, args: Vec<f64>) -> SkillDefinition {
        let mut skill = SkillDefinition::plain_attack(77, "test skill", element::FIRE, 60);
        skill.side_effects = side_effects;
        skill.effect_args = args;
        skill
    }

    #[test]
    fn six_stat_shift_encoding_hits_all_stats() {
        let catalog = EffectCatalog::builtin();
        let attacker = pet("a");
        let defender = pet("d");
        let skill = skill_with(
            vec![4, 4, 4, 4, 4, 4],
            vec![
                0.0, 100.0, 1.0, 1.0, 100.0, 1.0, 2.0, 100.0, 1.0, 3.0, 100.0, 1.0, 4.0, 100.0,
                1.0, 5.0, 100.0, 1.0,
            ],
        );
        let mut rng = Rng::new(5);
        let output = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::AfterSkill,
            1,
            0,
            TriggerFlags::default(),
            &mut rng,
        );
        assert_eq!(output.results.len(), 6);
        let stats: Vec<StatKind> = output
            .results
            .iter()
            .map(|r| match r.outcome {
                Outcome::StatChange { stat, delta } => {
                    assert_eq!(delta, 1);
                    stat
                }
                ref other => panic!("expected stat change, got {other:?}"),
            })
            .collect();
        assert_eq!(stats, StatKind::ALL.to_vec());
    }

    #[test]
    fn unknown_id_consumes_no_arguments() {
        let catalog = EffectCatalog::builtin();
        let attacker = pet("a");
        let defender = pet("d");
        // 999 is unknown; the stat change after it must still read its own
        // three arguments from the front.
        let skill = skill_with(vec![999, 4], vec![5.0, 100.0, 2.0]);
        let mut rng = Rng::new(5);
        let output = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::AfterSkill,
            1,
            0,
            TriggerFlags::default(),
            &mut rng,
        );
        assert_eq!(output.results.len(), 1);
        assert_eq!(
            output.results[0].outcome,
            Outcome::StatChange { stat: StatKind::Speed, delta: 2 }
        );
    }

    #[test]
    fn timing_mismatch_still_consumes_arguments() {
        let catalog = EffectCatalog::builtin();
        let attacker = pet("a");
        let defender = pet("d");
        // Entry 12 (percent heal, after_skill) then entry 4. At after_skill
        // both fire; at turn_end neither does, but slicing never shifts.
        let skill = skill_with(vec![12, 4], vec![50.0, 1.0, 100.0, 1.0]);
        let mut rng = Rng::new(5);
        let at_wrong_timing = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::TurnEnd,
            1,
            0,
            TriggerFlags::default(),
            &mut rng,
        );
        assert!(at_wrong_timing.results.is_empty());

        let at_right_timing = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::AfterSkill,
            1,
            0,
            TriggerFlags::default(),
            &mut rng,
        );
        assert_eq!(at_right_timing.results.len(), 2);
        assert!(matches!(at_right_timing.results[0].outcome, Outcome::Heal { .. }));
        assert_eq!(
            at_right_timing.results[1].outcome,
            Outcome::StatChange { stat: StatKind::Attack, delta: 1 }
        );
    }

    #[test]
    fn malformed_atom_args_do_not_abort_siblings() {
        let catalog = EffectCatalog::builtin();
        let attacker = pet("a");
        let defender = pet("d");
        // Entry 4 with an out-of-range slot (12) fails validation; the second
        // entry 4 still fires.
        let skill = skill_with(vec![4, 4], vec![12.0, 100.0, 1.0, 1.0, 100.0, 1.0]);
        let mut rng = Rng::new(5);
        let output = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::AfterSkill,
            1,
            0,
            TriggerFlags::default(),
            &mut rng,
        );
        assert_eq!(output.results.len(), 1);
        assert_eq!(
            output.results[0].outcome,
            Outcome::StatChange { stat: StatKind::Attack, delta: 1 }
        );
    }

    #[test]
    fn short_argument_lists_degrade_without_panicking() {
        let catalog = EffectCatalog::builtin();
        let attacker = pet("a");
        let defender = pet("d");
        // Two stat-change entries want six arguments; only one is provided.
        // Both atoms reject their (truncated) slices and nothing fires.
        let skill = skill_with(vec![4, 4], vec![1.0]);
        let mut rng = Rng::new(5);
        let output = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::AfterSkill,
            1,
            0,
            TriggerFlags::default(),
            &mut rng,
        );
        assert!(output.results.is_empty());
    }

    #[test]
    fn results_carry_the_catalog_name() {
        let catalog = EffectCatalog::builtin();
        let attacker = pet("a");
        let defender = pet("d");
        let skill = skill_with(vec![4], vec![1.0, 100.0, 1.0]);
        let mut rng = Rng::new(5);
        let output = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::AfterSkill,
            1,
            0,
            TriggerFlags::default(),
            &mut rng,
        );
        assert_eq!(output.results[0].name, "Stat Shift");
        assert_eq!(output.results[0].effect_id, 4);
    }

    #[test]
    fn working_damage_flows_through_caps() {
        let catalog = EffectCatalog::builtin();
        let attacker = pet("a");
        let defender = pet("d");
        // Entry 40: damage cap at 25.
        let skill = skill_with(vec![40], vec![25.0]);
        let mut rng = Rng::new(5);
        let output = fire(
            &catalog,
            &attacker,
            &defender,
            &skill,
            Timing::AfterDamageCalc,
            1,
            90,
            TriggerFlags::default(),
            &mut rng,
        );
        assert_eq!(output.damage, 25);
        assert!(matches!(output.results[0].outcome, Outcome::DamageCap { max: 25 }));
    }
}
