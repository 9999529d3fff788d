//! Mutable battle-side state for one pet, plus the skill model the engine
//! consumes. A battle owns exactly two `PetState` values; every mutation path
//! clamps at the point of write so invariants cannot drift.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::stats::{apply_stage_modifier, clamp_stage, RealizedStats, StatKind};
use crate::battle::type_chart::TypeId;

/// Number of status-duration slots. The duration array is the source of
/// truth; `status` mirrors the currently active slot.
pub const STATUS_SLOTS: usize = 20;

/// Status ailments, identified by their duration-array slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Burn,
    Poison,
    Paralysis,
    Sleep,
    Freeze,
    Confusion,
    Flinch,
    Fear,
    Silence,
    Blind,
    Curse,
    Weakness,
    Bleed,
    Petrify,
    Drowsy,
    Stun,
}

impl StatusKind {
    pub const ALL: [StatusKind; 16] = [
        StatusKind::Burn,
        StatusKind::Poison,
        StatusKind::Paralysis,
        StatusKind::Sleep,
        StatusKind::Freeze,
        StatusKind::Confusion,
        StatusKind::Flinch,
        StatusKind::Fear,
        StatusKind::Silence,
        StatusKind::Blind,
        StatusKind::Curse,
        StatusKind::Weakness,
        StatusKind::Bleed,
        StatusKind::Petrify,
        StatusKind::Drowsy,
        StatusKind::Stun,
    ];

    pub const fn slot(self) -> usize {
        match self {
            StatusKind::Burn => 0,
            StatusKind::Poison => 1,
            StatusKind::Paralysis => 2,
            StatusKind::Sleep => 3,
            StatusKind::Freeze => 4,
            StatusKind::Confusion => 5,
            StatusKind::Flinch => 6,
            StatusKind::Fear => 7,
            StatusKind::Silence => 8,
            StatusKind::Blind => 9,
            StatusKind::Curse => 10,
            StatusKind::Weakness => 11,
            StatusKind::Bleed => 12,
            StatusKind::Petrify => 13,
            StatusKind::Drowsy => 14,
            StatusKind::Stun => 15,
        }
    }

    pub fn from_slot(slot: usize) -> Option<StatusKind> {
        StatusKind::ALL.iter().copied().find(|s| s.slot() == slot)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            StatusKind::Burn => "burn",
            StatusKind::Poison => "poison",
            StatusKind::Paralysis => "paralysis",
            StatusKind::Sleep => "sleep",
            StatusKind::Freeze => "freeze",
            StatusKind::Confusion => "confusion",
            StatusKind::Flinch => "flinch",
            StatusKind::Fear => "fear",
            StatusKind::Silence => "silence",
            StatusKind::Blind => "blind",
            StatusKind::Curse => "curse",
            StatusKind::Weakness => "weakness",
            StatusKind::Bleed => "bleed",
            StatusKind::Petrify => "petrify",
            StatusKind::Drowsy => "drowsy",
            StatusKind::Stun => "stun",
        }
    }

    /// Statuses that remove the victim's action outright. The AI treats these
    /// as hard control.
    pub const fn is_hard_control(self) -> bool {
        matches!(
            self,
            StatusKind::Sleep
                | StatusKind::Freeze
                | StatusKind::Confusion
                | StatusKind::Flinch
                | StatusKind::Petrify
                | StatusKind::Stun
        )
    }

    /// Per-turn chip damage as a fraction of max HP, applied at turn start.
    pub const fn tick_damage_fraction(self) -> f64 {
        match self {
            StatusKind::Burn => 0.0625,
            StatusKind::Poison => 0.125,
            StatusKind::Curse => 0.25,
            StatusKind::Bleed => 0.0625,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Physical,
    Special,
    Status,
}

impl SkillCategory {
    pub const fn is_offensive(self) -> bool {
        !matches!(self, SkillCategory::Status)
    }
}

/// A fully resolved skill. The side-effect encoding stays positional: one or
/// more effect ids plus a single flat argument list sliced in order by each
/// effect's fixed arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: u32,
    pub name: String,
    pub category: SkillCategory,
    pub element: TypeId,
    pub power: i32,
    pub accuracy: f64,
    #[serde(default)]
    pub crit_stage: u8,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub always_hits: bool,
    #[serde(default)]
    pub side_effects: Vec<u16>,
    #[serde(default)]
    pub effect_args: Vec<f64>,
    #[serde(default = "default_max_pp")]
    pub max_pp: u8,
}

fn default_max_pp() -> u8 {
    20
}

impl SkillDefinition {
    /// Plain attack with no side effects; test and struggle fallback.
    pub fn plain_attack(id: u32, name: &str, element: TypeId, power: i32) -> SkillDefinition {
        SkillDefinition {
            id,
            name: name.to_string(),
            category: SkillCategory::Physical,
            element,
            power,
            accuracy: 100.0,
            crit_stage: 0,
            priority: 0,
            always_hits: false,
            side_effects: Vec::new(),
            effect_args: Vec::new(),
            max_pp: 20,
        }
    }
}

/// A skill slot on a pet: definition plus remaining uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedSkill {
    pub skill: SkillDefinition,
    pub pp: u8,
}

impl LearnedSkill {
    pub fn new(skill: SkillDefinition) -> LearnedSkill {
        let pp = skill.max_pp;
        LearnedSkill { skill, pp }
    }
}

/// Richer-than-a-counter state for auras, delayed effects, and transforms,
/// keyed by effect name in [PetState::persistent].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentEffect {
    pub kind: PersistentKind,
    /// Remaining turns; negative means "until battle end".
    pub turns_left: i32,
    /// Kind-specific magnitude (fraction, multiplier, flat amount, or slot).
    pub magnitude: f64,
    #[serde(default)]
    pub element: Option<TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistentKind {
    /// Transfers magnitude×max-HP from this pet to the opponent each turn end.
    DrainAura,
    /// Heals magnitude×max-HP each turn start.
    RegenAura,
    /// Outgoing damage multiplied by magnitude.
    DamageBoost,
    /// Incoming damage multiplied by (1 - magnitude).
    DamageReduction,
    /// Incoming damage reduced by a flat magnitude.
    FlatReduction,
    /// Absorbs damage; magnitude is the remaining shield HP.
    Shield,
    /// Returns magnitude×damage to a physical attacker.
    CounterPhysical,
    /// Returns magnitude×damage to a special attacker.
    CounterSpecial,
    /// Immune to skills of `element`.
    ElementImmunity,
    /// KO when the countdown expires.
    DelayedKill,
    /// Deals `magnitude` damage when the countdown expires.
    DelayedDamage,
    /// Charged power multiplier released by the next offensive skill.
    Charge,
    /// Locked to the skill slot in `magnitude`.
    Encore,
    /// Skill slot in `magnitude` cannot be used.
    Disable,
    /// Decoy that absorbs hits; magnitude is its remaining HP.
    Substitute,
    /// Guaranteed hit aura on outgoing skills.
    SureHit,
    /// Incoming crits suppressed.
    CritGuard,
}

/// Everything the engine mutates for one combatant during a battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetState {
    pub id: u64,
    pub name: String,
    pub species_id: u32,
    pub level: u32,
    pub types: (TypeId, Option<TypeId>),
    pub stats: RealizedStats,
    pub current_hp: i32,
    pub skills: Vec<LearnedSkill>,
    pub stages: [i8; 6],
    pub accuracy_stage: i8,
    pub evasion_stage: i8,
    pub status: Option<StatusKind>,
    pub status_durations: [u8; STATUS_SLOTS],
    // BTreeMaps keep tick and expiry iteration deterministic across runs.
    pub counters: BTreeMap<String, i32>,
    pub persistent: BTreeMap<String, PersistentEffect>,
}

impl PetState {
    pub fn new(
        id: u64,
        name: &str,
        species_id: u32,
        level: u32,
        types: (TypeId, Option<TypeId>),
        stats: RealizedStats,
        skills: Vec<SkillDefinition>,
    ) -> PetState {
        PetState {
            id,
            name: name.to_string(),
            species_id,
            level,
            types,
            current_hp: stats.hp,
            stats,
            skills: skills.into_iter().map(LearnedSkill::new).collect(),
            stages: [0; 6],
            accuracy_stage: 0,
            evasion_stage: 0,
            status: None,
            status_durations: [0; STATUS_SLOTS],
            counters: BTreeMap::new(),
            persistent: BTreeMap::new(),
        }
    }

    pub fn max_hp(&self) -> i32 {
        self.stats.hp
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp <= 0
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp() <= 0 {
            return 0.0;
        }
        self.current_hp as f64 / self.max_hp() as f64
    }

    /// Damage clamped to current HP; returns the amount actually removed.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let dealt = amount.max(0).min(self.current_hp);
        self.current_hp -= dealt;
        dealt
    }

    /// Healing clamped to max HP; returns the amount actually restored.
    pub fn apply_heal(&mut self, amount: i32) -> i32 {
        let healed = amount.max(0).min(self.max_hp() - self.current_hp);
        self.current_hp += healed;
        healed
    }

    /// Shift max HP, keeping current HP inside the new bound. Max HP never
    /// drops below 1.
    pub fn shift_max_hp(&mut self, delta: i32) {
        self.stats.hp = (self.stats.hp + delta).max(1);
        self.current_hp = self.current_hp.min(self.stats.hp);
    }

    pub fn stage(&self, stat: StatKind) -> i8 {
        self.stages[stat.index()]
    }

    /// Apply a stage delta, clamped to [-6, 6]. Returns the delta actually
    /// applied (0 when already pinned at the bound).
    pub fn bump_stage(&mut self, stat: StatKind, delta: i8) -> i8 {
        let before = self.stages[stat.index()];
        let after = clamp_stage(before.saturating_add(delta));
        self.stages[stat.index()] = after;
        after - before
    }

    /// Stage-modified realized stat.
    pub fn effective_stat(&self, stat: StatKind) -> i32 {
        apply_stage_modifier(self.stats.get(stat), self.stage(stat))
    }

    pub fn has_positive_stage(&self) -> bool {
        self.stages.iter().any(|&s| s > 0)
    }

    pub fn has_negative_stage(&self) -> bool {
        self.stages.iter().any(|&s| s < 0)
    }

    /// Active status derived from the duration array.
    pub fn active_status(&self) -> Option<StatusKind> {
        self.status_durations
            .iter()
            .position(|&d| d > 0)
            .and_then(StatusKind::from_slot)
    }

    /// Inflict a status. At most one status may be active; returns false when
    /// one already is (including the same one).
    pub fn set_status(&mut self, status: StatusKind, duration: u8) -> bool {
        if self.status.is_some() || duration == 0 {
            return false;
        }
        self.status_durations[status.slot()] = duration;
        self.status = Some(status);
        true
    }

    pub fn clear_status(&mut self) {
        if let Some(status) = self.status.take() {
            self.status_durations[status.slot()] = 0;
        }
    }

    pub fn counter(&self, key: &str) -> i32 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn set_counter(&mut self, key: &str, turns: i32) {
        if turns == 0 {
            self.counters.remove(key);
        } else {
            self.counters.insert(key.to_string(), turns);
        }
    }

    pub fn bump_counter(&mut self, key: &str, delta: i32) -> i32 {
        let next = self.counter(key) + delta;
        self.set_counter(key, next);
        next
    }

    pub fn persistent_mut(&mut self, name: &str) -> Option<&mut PersistentEffect> {
        self.persistent.get_mut(name)
    }

    /// First persistent entry of a kind, if any.
    pub fn persistent_of_kind(&self, kind: PersistentKind) -> Option<(&str, &PersistentEffect)> {
        self.persistent
            .iter()
            .find(|(_, e)| e.kind == kind)
            .map(|(name, e)| (name.as_str(), e))
    }

    pub fn has_persistent_kind(&self, kind: PersistentKind) -> bool {
        self.persistent.values().any(|e| e.kind == kind)
    }

    /// Skill slots with remaining PP.
    pub fn usable_skills(&self) -> Vec<usize> {
        self.skills
            .iter()
            .enumerate()
            .filter(|(slot, learned)| learned.pp > 0 && !self.is_slot_disabled(*slot))
            .map(|(slot, _)| slot)
            .collect()
    }

    pub fn is_slot_disabled(&self, slot: usize) -> bool {
        self.persistent
            .values()
            .any(|e| e.kind == PersistentKind::Disable && e.magnitude as usize == slot)
    }

    /// Encore lock, if one is active and points at a usable slot.
    pub fn encore_slot(&self) -> Option<usize> {
        self.persistent
            .values()
            .find(|e| e.kind == PersistentKind::Encore)
            .map(|e| e.magnitude as usize)
            .filter(|&slot| slot < self.skills.len())
    }

    /// Drop all accumulated battle state. The only point where stages,
    /// counters, statuses, and persistent effects are discarded wholesale.
    pub fn reset_battle_state(&mut self) {
        self.stages = [0; 6];
        self.accuracy_stage = 0;
        self.evasion_stage = 0;
        self.status = None;
        self.status_durations = [0; STATUS_SLOTS];
        self.counters.clear();
        self.persistent.clear();
    }
}
