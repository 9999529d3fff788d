//! Conflict resolution for effect results produced at one timing: a fixed
//! priority order, mutually-exclusive group filtering, and (kind, target)
//! deduplication with a repeat whitelist for damage-like outcomes.

use std::collections::HashSet;

use tracing::debug;

use crate::battle::context::{EffectResult, ExclusionGroup};

/// Order, filter, and deduplicate one timing's results.
///
/// 1. Stable sort by conflict class then in-class rank, so certain outcomes
///    (instant KO, guaranteed hit/crit) lead, judgment modifiers (caps,
///    floors) follow, ordinary effects next, minor bookkeeping last.
/// 2. Within each declared exclusion group only the best-ranked member
///    survives (always-crit beats never-crit).
/// 3. Results collapsing to the same (kind, target) pair keep only the first,
///    unless the kind is whitelisted to repeat (damage, heal, multi-hit).
pub fn resolve(mut results: Vec<EffectResult>) -> Vec<EffectResult> {
    if results.len() <= 1 {
        return results;
    }

    results.sort_by_key(|r| (r.outcome.class(), r.outcome.rank()));

    let mut taken_groups: Vec<ExclusionGroup> = Vec::new();
    let mut seen: HashSet<(&'static str, crate::battle::context::EffectTarget)> = HashSet::new();
    let mut resolved = Vec::with_capacity(results.len());

    for result in results {
        if let Some(group) = result.outcome.exclusion_group() {
            if taken_groups.contains(&group) {
                debug!(
                    effect = %result.name,
                    kind = result.kind_tag(),
                    "dropped by exclusion group"
                );
                continue;
            }
            taken_groups.push(group);
        }

        if !result.outcome.repeatable() {
            let key = (result.kind_tag(), result.target);
            if !seen.insert(key) {
                debug!(
                    effect = %result.name,
                    kind = result.kind_tag(),
                    "dropped as duplicate for target"
                );
                continue;
            }
        }

        resolved.push(result);
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::context::{EffectResult, EffectTarget, Outcome};
    use crate::battle::state::StatusKind;
    use crate::battle::stats::StatKind;

    fn result(target: EffectTarget, outcome: Outcome) -> EffectResult {
        EffectResult::new(1, "test", target, outcome, String::new())
    }

    #[test]
    fn certain_outcomes_sort_first() {
        let resolved = resolve(vec![
            result(EffectTarget::Defender, Outcome::Damage { amount: 10 }),
            result(EffectTarget::Defender, Outcome::DamageCap { max: 5 }),
            result(EffectTarget::Defender, Outcome::InstantKill),
        ]);
        assert_eq!(resolved[0].outcome, Outcome::InstantKill);
        assert_eq!(resolved[1].outcome, Outcome::DamageCap { max: 5 });
        assert_eq!(resolved[2].outcome, Outcome::Damage { amount: 10 });
    }

    #[test]
    fn always_crit_survives_over_never_crit() {
        let resolved = resolve(vec![
            result(EffectTarget::Attacker, Outcome::NeverCrit),
            result(EffectTarget::Attacker, Outcome::AlwaysCrit),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].outcome, Outcome::AlwaysCrit);
    }

    #[test]
    fn hit_judgments_are_their_own_group() {
        let resolved = resolve(vec![
            result(EffectTarget::Attacker, Outcome::ForceMiss),
            result(EffectTarget::Attacker, Outcome::AlwaysHit),
            result(EffectTarget::Attacker, Outcome::AlwaysCrit),
        ]);
        // Hit group keeps always-hit; the crit judgment is untouched.
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].outcome, Outcome::AlwaysHit);
        assert_eq!(resolved[1].outcome, Outcome::AlwaysCrit);
    }

    #[test]
    fn duplicate_status_for_one_target_keeps_first() {
        let resolved = resolve(vec![
            result(
                EffectTarget::Defender,
                Outcome::Status { status: StatusKind::Poison, duration: 3 },
            ),
            result(
                EffectTarget::Defender,
                Outcome::Status { status: StatusKind::Burn, duration: 2 },
            ),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved[0].outcome,
            Outcome::Status { status: StatusKind::Poison, duration: 3 }
        );
    }

    #[test]
    fn same_kind_different_targets_both_survive() {
        let resolved = resolve(vec![
            result(EffectTarget::Defender, Outcome::StatChange { stat: StatKind::Attack, delta: -1 }),
            result(EffectTarget::Attacker, Outcome::StatChange { stat: StatKind::Attack, delta: 1 }),
        ]);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn damage_and_heal_repeat_freely() {
        let resolved = resolve(vec![
            result(EffectTarget::Defender, Outcome::Damage { amount: 10 }),
            result(EffectTarget::Defender, Outcome::Damage { amount: 12 }),
            result(EffectTarget::Attacker, Outcome::Heal { amount: 4 }),
            result(EffectTarget::Attacker, Outcome::Heal { amount: 6 }),
        ]);
        assert_eq!(resolved.len(), 4);
    }

    #[test]
    fn stable_order_preserved_for_equal_rank() {
        let resolved = resolve(vec![
            result(EffectTarget::Defender, Outcome::Damage { amount: 1 }),
            result(EffectTarget::Defender, Outcome::Damage { amount: 2 }),
            result(EffectTarget::Defender, Outcome::Damage { amount: 3 }),
        ]);
        let amounts: Vec<i32> = resolved
            .iter()
            .map(|r| match r.outcome {
                Outcome::Damage { amount } => amount,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(amounts, vec![1, 2, 3]);
    }
}
