//! The single mutation pass: applies a resolved result list onto the two
//! combatants. Effects only describe; every write to pet state funnels
//! through here (and through the turn engine's own bookkeeping), always
//! clamped at the point of mutation.

use tracing::debug;

use crate::battle::context::{EffectResult, EffectTarget, Outcome};
use crate::battle::state::PetState;

/// Judgment flags surfaced to the turn engine instead of being written to
/// state: hit/crit certainty and the instant-KO marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedFlags {
    pub always_hit: bool,
    pub force_miss: bool,
    pub always_crit: bool,
    pub never_crit: bool,
    pub instant_kill: bool,
}

fn stage_arrays(pet: &PetState) -> ([i8; 6], i8, i8) {
    (pet.stages, pet.accuracy_stage, pet.evasion_stage)
}

fn set_stage_arrays(pet: &mut PetState, stages: [i8; 6], accuracy: i8, evasion: i8) {
    pet.stages = stages;
    pet.accuracy_stage = accuracy.clamp(-6, 6);
    pet.evasion_stage = evasion.clamp(-6, 6);
}

fn clear_stages(pet: &mut PetState) {
    set_stage_arrays(pet, [0; 6], 0, 0);
}

/// Apply one outcome to one pet. `other` is the opposite combatant, needed by
/// the cross-pet stage operations and transform.
fn apply_to(pet: &mut PetState, other: &mut PetState, result: &EffectResult, flags: &mut AppliedFlags) {
    match &result.outcome {
        Outcome::Damage { amount } => {
            pet.apply_damage(*amount);
        }
        Outcome::MultiHit { hits } => {
            let total: i32 = hits.iter().sum();
            pet.apply_damage(total);
        }
        Outcome::Heal { amount } => {
            pet.apply_heal(*amount);
        }
        Outcome::StatChange { stat, delta } => {
            pet.bump_stage(*stat, *delta);
        }
        Outcome::AccuracyStage { delta } => {
            pet.accuracy_stage = (pet.accuracy_stage.saturating_add(*delta)).clamp(-6, 6);
        }
        Outcome::EvasionStage { delta } => {
            pet.evasion_stage = (pet.evasion_stage.saturating_add(*delta)).clamp(-6, 6);
        }
        Outcome::Status { status, duration } => {
            if pet.active_status() == Some(*status) {
                let slot = status.slot();
                pet.status_durations[slot] = pet.status_durations[slot].saturating_add(*duration).min(99);
            } else {
                pet.set_status(*status, *duration);
            }
        }
        Outcome::CureStatus { status } => {
            let active = pet.active_status();
            let matches = match (status, active) {
                (None, Some(_)) => true,
                (Some(wanted), Some(active)) => *wanted == active,
                (_, None) => false,
            };
            if matches {
                pet.clear_status();
            }
        }
        Outcome::SetCounter { key, turns } => {
            pet.set_counter(key, *turns);
        }
        Outcome::InstallPersistent { name, effect } => {
            pet.persistent.insert(name.clone(), effect.clone());
        }
        Outcome::RemovePersistent { name } => {
            pet.persistent.remove(name);
        }
        // Caps and floors already bit on the in-flight damage.
        Outcome::DamageCap { .. } | Outcome::DamageFloor { .. } => {}
        Outcome::AlwaysHit => flags.always_hit = true,
        Outcome::ForceMiss => flags.force_miss = true,
        Outcome::AlwaysCrit => flags.always_crit = true,
        Outcome::NeverCrit => flags.never_crit = true,
        Outcome::InstantKill => {
            flags.instant_kill = true;
            let lethal = pet.current_hp;
            pet.apply_damage(lethal);
        }
        Outcome::PpDrain { slot, amount } => {
            if let Some(learned) = pet.skills.get_mut(*slot) {
                learned.pp = learned.pp.saturating_sub(*amount);
            }
        }
        Outcome::PpRestore { slot, amount } => {
            if let Some(learned) = pet.skills.get_mut(*slot) {
                learned.pp = (learned.pp + amount).min(learned.skill.max_pp);
            }
        }
        Outcome::MaxHpShift { delta } => {
            pet.shift_max_hp(*delta);
        }
        Outcome::TypeSet { primary, secondary } => {
            pet.types = (*primary, *secondary);
        }
        Outcome::Transform => {
            let hp = pet.stats.hp;
            let current = pet.current_hp;
            pet.stats = other.stats;
            pet.stats.hp = hp;
            pet.current_hp = current;
            pet.types = other.types;
            let (stages, acc, eva) = stage_arrays(other);
            set_stage_arrays(pet, stages, acc, eva);
            pet.skills = other.skills.clone();
        }
        Outcome::ClearStages => clear_stages(pet),
        Outcome::StealStages => {
            // pet is the thief; positive foe stages move across.
            for index in 0..6 {
                if other.stages[index] > 0 {
                    pet.stages[index] =
                        (pet.stages[index].saturating_add(other.stages[index])).clamp(-6, 6);
                    other.stages[index] = 0;
                }
            }
        }
        Outcome::CopyStages => {
            let (stages, acc, eva) = stage_arrays(other);
            set_stage_arrays(pet, stages, acc, eva);
        }
        Outcome::SwapStages => {
            let mine = stage_arrays(pet);
            let theirs = stage_arrays(other);
            set_stage_arrays(pet, theirs.0, theirs.1, theirs.2);
            set_stage_arrays(other, mine.0, mine.1, mine.2);
        }
        Outcome::Reward { .. } | Outcome::Message => {}
    }
}

/// Apply every successful result in order. Returns the judgment flags the
/// engine consumes during hit/crit resolution.
pub fn apply(
    results: &[EffectResult],
    attacker: &mut PetState,
    defender: &mut PetState,
) -> AppliedFlags {
    let mut flags = AppliedFlags::default();
    for result in results {
        if !result.success {
            continue;
        }
        debug!(
            effect = %result.name,
            kind = result.kind_tag(),
            target = ?result.target,
            "applying effect result"
        );
        match result.target {
            EffectTarget::Attacker => apply_to(attacker, defender, result, &mut flags),
            EffectTarget::Defender => apply_to(defender, attacker, result, &mut flags),
            EffectTarget::Both => match result.outcome {
                // Cross-pet operations act once, from the attacker's side.
                Outcome::StealStages | Outcome::SwapStages => {
                    apply_to(attacker, defender, result, &mut flags)
                }
                _ => {
                    apply_to(attacker, defender, result, &mut flags);
                    apply_to(defender, attacker, result, &mut flags);
                }
            },
        }
    }
    flags
}
