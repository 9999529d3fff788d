//! Per-invocation effect context and the descriptive result records effects
//! produce. Effects never mutate combatants; they read the context, may adjust
//! its in-flight numbers (working damage, rate deltas), and return results the
//! applicator later writes to state in one pass.

use serde::Serialize;

use crate::battle::rng::Rng;
use crate::battle::state::{PersistentEffect, PetState, SkillDefinition, StatusKind};
use crate::battle::stats::StatKind;
use crate::battle::timing::Timing;
use crate::battle::type_chart::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    Attacker,
    Defender,
    Both,
}

/// Transient view of one effect invocation. Built by the trigger, dropped
/// when the invocation ends; never persisted.
pub struct EffectContext<'a> {
    pub attacker: &'a PetState,
    pub defender: &'a PetState,
    pub skill: &'a SkillDefinition,
    pub timing: Timing,
    pub turn: u32,
    pub effect_id: u16,
    pub args: &'a [f64],
    /// Damage as originally computed for this attack.
    pub original_damage: i32,
    /// Working damage; caps/floors/boosts adjust it so later stages see it.
    pub damage: i32,
    pub is_crit: bool,
    pub missed: bool,
    pub blocked: bool,
    pub damage_multiplier: f64,
    pub hit_rate_delta: f64,
    pub crit_rate_delta: f64,
    pub priority_delta: i32,
    pub rng: &'a mut Rng,
}

impl<'a> EffectContext<'a> {
    pub fn arg(&self, index: usize) -> f64 {
        self.args.get(index).copied().unwrap_or(0.0)
    }
}

/// What an effect wants done, as data. Application happens in the applicator;
/// classification drives conflict resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Damage { amount: i32 },
    MultiHit { hits: Vec<i32> },
    Heal { amount: i32 },
    StatChange { stat: StatKind, delta: i8 },
    AccuracyStage { delta: i8 },
    EvasionStage { delta: i8 },
    Status { status: StatusKind, duration: u8 },
    CureStatus { status: Option<StatusKind> },
    SetCounter { key: String, turns: i32 },
    InstallPersistent { name: String, effect: PersistentEffect },
    RemovePersistent { name: String },
    DamageCap { max: i32 },
    DamageFloor { min: i32 },
    AlwaysHit,
    ForceMiss,
    AlwaysCrit,
    NeverCrit,
    InstantKill,
    PpDrain { slot: usize, amount: u8 },
    PpRestore { slot: usize, amount: u8 },
    MaxHpShift { delta: i32 },
    TypeSet { primary: TypeId, secondary: Option<TypeId> },
    Transform,
    ClearStages,
    StealStages,
    CopyStages,
    SwapStages,
    Reward { reward: String, amount: i32 },
    Message,
}

/// Resolution classes, most binding first. Certain outcomes beat judgment
/// modifiers, which beat ordinary state changes, which beat minor bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConflictClass {
    Certain,
    Judgment,
    Ordinary,
    Minor,
}

/// Mutually exclusive outcome families: only the highest-priority member of a
/// group survives resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionGroup {
    HitJudgment,
    CritJudgment,
}

impl Outcome {
    /// Stable string tag, used for dedup keys, logs, and the API payload.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Outcome::Damage { .. } => "damage",
            Outcome::MultiHit { .. } => "multi_hit",
            Outcome::Heal { .. } => "heal",
            Outcome::StatChange { .. } => "stat_change",
            Outcome::AccuracyStage { .. } => "accuracy_stage",
            Outcome::EvasionStage { .. } => "evasion_stage",
            Outcome::Status { .. } => "status",
            Outcome::CureStatus { .. } => "status_cure",
            Outcome::SetCounter { .. } => "counter",
            Outcome::InstallPersistent { .. } => "persistent",
            Outcome::RemovePersistent { .. } => "persistent_remove",
            Outcome::DamageCap { .. } => "damage_cap",
            Outcome::DamageFloor { .. } => "damage_floor",
            Outcome::AlwaysHit => "always_hit",
            Outcome::ForceMiss => "force_miss",
            Outcome::AlwaysCrit => "always_crit",
            Outcome::NeverCrit => "never_crit",
            Outcome::InstantKill => "instant_kill",
            Outcome::PpDrain { .. } => "pp_drain",
            Outcome::PpRestore { .. } => "pp_restore",
            Outcome::MaxHpShift { .. } => "max_hp",
            Outcome::TypeSet { .. } => "type_set",
            Outcome::Transform => "transform",
            Outcome::ClearStages => "stage_clear",
            Outcome::StealStages => "stage_steal",
            Outcome::CopyStages => "stage_copy",
            Outcome::SwapStages => "stage_swap",
            Outcome::Reward { .. } => "reward",
            Outcome::Message => "message",
        }
    }

    pub fn class(&self) -> ConflictClass {
        match self {
            Outcome::InstantKill
            | Outcome::AlwaysHit
            | Outcome::ForceMiss
            | Outcome::AlwaysCrit
            | Outcome::NeverCrit => ConflictClass::Certain,
            Outcome::DamageCap { .. } | Outcome::DamageFloor { .. } => ConflictClass::Judgment,
            Outcome::PpDrain { .. }
            | Outcome::PpRestore { .. }
            | Outcome::Reward { .. }
            | Outcome::Message => ConflictClass::Minor,
            _ => ConflictClass::Ordinary,
        }
    }

    /// Rank within the class; lower wins. Keeps e.g. always-crit ahead of
    /// never-crit inside their exclusion group.
    pub fn rank(&self) -> u8 {
        match self {
            Outcome::InstantKill => 0,
            Outcome::AlwaysHit => 1,
            Outcome::AlwaysCrit => 2,
            Outcome::ForceMiss => 3,
            Outcome::NeverCrit => 4,
            Outcome::DamageCap { .. } => 10,
            Outcome::DamageFloor { .. } => 11,
            Outcome::Damage { .. } | Outcome::MultiHit { .. } => 20,
            Outcome::Heal { .. } => 21,
            Outcome::Status { .. } | Outcome::CureStatus { .. } => 22,
            Outcome::StatChange { .. }
            | Outcome::AccuracyStage { .. }
            | Outcome::EvasionStage { .. } => 23,
            Outcome::InstallPersistent { .. } | Outcome::RemovePersistent { .. } => 24,
            _ => 25,
        }
    }

    pub fn exclusion_group(&self) -> Option<ExclusionGroup> {
        match self {
            Outcome::AlwaysHit | Outcome::ForceMiss => Some(ExclusionGroup::HitJudgment),
            Outcome::AlwaysCrit | Outcome::NeverCrit => Some(ExclusionGroup::CritJudgment),
            _ => None,
        }
    }

    /// Whether several results of this kind may coexist for one target.
    pub fn repeatable(&self) -> bool {
        matches!(
            self,
            Outcome::Damage { .. } | Outcome::MultiHit { .. } | Outcome::Heal { .. }
        )
    }

    /// Headline numeric value, when one exists.
    pub fn value(&self) -> Option<f64> {
        match self {
            Outcome::Damage { amount } => Some(*amount as f64),
            Outcome::MultiHit { hits } => Some(hits.iter().sum::<i32>() as f64),
            Outcome::Heal { amount } => Some(*amount as f64),
            Outcome::StatChange { delta, .. } => Some(*delta as f64),
            Outcome::AccuracyStage { delta } | Outcome::EvasionStage { delta } => {
                Some(*delta as f64)
            }
            Outcome::Status { duration, .. } => Some(*duration as f64),
            Outcome::SetCounter { turns, .. } => Some(*turns as f64),
            Outcome::DamageCap { max } => Some(*max as f64),
            Outcome::DamageFloor { min } => Some(*min as f64),
            Outcome::PpDrain { amount, .. } | Outcome::PpRestore { amount, .. } => {
                Some(*amount as f64)
            }
            Outcome::MaxHpShift { delta } => Some(*delta as f64),
            Outcome::Reward { amount, .. } => Some(*amount as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectResult {
    pub effect_id: u16,
    pub name: String,
    pub success: bool,
    pub target: EffectTarget,
    pub outcome: Outcome,
    pub message: String,
}

impl EffectResult {
    pub fn new(
        effect_id: u16,
        name: &str,
        target: EffectTarget,
        outcome: Outcome,
        message: String,
    ) -> EffectResult {
        EffectResult { effect_id, name: name.to_string(), success: true, target, outcome, message }
    }

    pub fn kind_tag(&self) -> &'static str {
        self.outcome.kind_tag()
    }
}
