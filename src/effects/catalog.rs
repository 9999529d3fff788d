//! Effect catalog: maps the numeric side-effect ids found in skill records to
//! named entries — eligible timings plus an ordered list of atom kinds. Each
//! atom kind has a fixed argument arity; an entry's arity is the sum over its
//! atoms, which is how skill argument strings are sliced.
//!
//! A built-in table covers the shipped ids; data/effects.yaml can add or
//! override entries. Unknown ids are a warning, never a crash.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::battle::timing::Timing;
use crate::effects::{
    AilmentEffect, AtomicEffect, DamageEffect, DefenseEffect, EffectError, HealEffect,
    ModifierEffect, SpecialEffect, StatStageEffect,
};

/// Atom vocabulary: every single-purpose effect the engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomKind {
    // Damage.
    FixedDamage,
    MaxHpPercentDamage,
    CurrentHpPercentDamage,
    Recoil,
    Drain,
    HpCostPower,
    MultiHit,
    DelayedDamage,
    // Heal.
    FixedHeal,
    MaxHpPercentHeal,
    Regeneration,
    CureStatus,
    PpRestore,
    // Stat stages.
    StatChange,
    RandomStatChange,
    AllStatsChange,
    CumulativeStatChange,
    StealStages,
    CopyStages,
    SwapStages,
    ClearStages,
    TempStatBoost,
    // Status ailments.
    InflictStatus,
    RandomStatus,
    CumulativeStatus,
    Flinch,
    // Defense.
    DamageCap,
    DamageFloor,
    FlatReduction,
    PercentReduction,
    PercentBoost,
    Shield,
    Endure,
    CounterPhysical,
    CounterSpecial,
    ElementImmunity,
    // In-flight modifiers.
    PowerModify,
    AccuracyModify,
    CritModify,
    PriorityModify,
    AlwaysHit,
    AlwaysCrit,
    CritGuard,
    MissPenalty,
    // Specials.
    SacrificeCrit,
    ChargeRelease,
    Transform,
    Substitute,
    Encore,
    Disable,
    DelayedKill,
    TypeSwap,
    TypeCopy,
    TypeShift,
    MaxHpModify,
    PpDrain,
    BattleReward,
    InstantKill,
    LeechSeed,
}

impl AtomKind {
    /// Fixed argument count consumed from the skill's flat argument list.
    pub const fn arity(self) -> usize {
        match self {
            AtomKind::FixedDamage
            | AtomKind::MaxHpPercentDamage
            | AtomKind::CurrentHpPercentDamage
            | AtomKind::Recoil
            | AtomKind::Drain
            | AtomKind::FixedHeal
            | AtomKind::MaxHpPercentHeal
            | AtomKind::CureStatus
            | AtomKind::ClearStages
            | AtomKind::Flinch
            | AtomKind::DamageCap
            | AtomKind::DamageFloor
            | AtomKind::CritGuard
            | AtomKind::MissPenalty
            | AtomKind::ChargeRelease
            | AtomKind::Substitute
            | AtomKind::Encore
            | AtomKind::Disable
            | AtomKind::DelayedKill
            | AtomKind::TypeShift
            | AtomKind::MaxHpModify
            | AtomKind::PpDrain
            | AtomKind::InstantKill => 1,
            AtomKind::HpCostPower
            | AtomKind::MultiHit
            | AtomKind::DelayedDamage
            | AtomKind::Regeneration
            | AtomKind::PpRestore
            | AtomKind::RandomStatChange
            | AtomKind::AllStatsChange
            | AtomKind::RandomStatus
            | AtomKind::FlatReduction
            | AtomKind::PercentReduction
            | AtomKind::PercentBoost
            | AtomKind::Shield
            | AtomKind::CounterPhysical
            | AtomKind::CounterSpecial
            | AtomKind::ElementImmunity
            | AtomKind::PowerModify
            | AtomKind::AccuracyModify
            | AtomKind::CritModify
            | AtomKind::PriorityModify
            | AtomKind::SacrificeCrit
            | AtomKind::BattleReward
            | AtomKind::LeechSeed => 2,
            AtomKind::StatChange
            | AtomKind::CumulativeStatChange
            | AtomKind::TempStatBoost
            | AtomKind::InflictStatus => 3,
            AtomKind::CumulativeStatus => 4,
            AtomKind::StealStages
            | AtomKind::CopyStages
            | AtomKind::SwapStages
            | AtomKind::Endure
            | AtomKind::AlwaysHit
            | AtomKind::AlwaysCrit
            | AtomKind::Transform
            | AtomKind::TypeSwap
            | AtomKind::TypeCopy => 0,
        }
    }

    /// Validate the argument slice and build the parameterized atom.
    pub fn instantiate(self, args: &[f64]) -> Result<AtomicEffect, EffectError> {
        Ok(match self {
            AtomKind::FixedDamage => AtomicEffect::Damage(DamageEffect::fixed(args)?),
            AtomKind::MaxHpPercentDamage => {
                AtomicEffect::Damage(DamageEffect::max_hp_percent(args)?)
            }
            AtomKind::CurrentHpPercentDamage => {
                AtomicEffect::Damage(DamageEffect::current_hp_percent(args)?)
            }
            AtomKind::Recoil => AtomicEffect::Damage(DamageEffect::recoil(args)?),
            AtomKind::Drain => AtomicEffect::Damage(DamageEffect::drain(args)?),
            AtomKind::HpCostPower => AtomicEffect::Damage(DamageEffect::hp_cost_power(args)?),
            AtomKind::MultiHit => AtomicEffect::Damage(DamageEffect::multi_hit(args)?),
            AtomKind::DelayedDamage => AtomicEffect::Damage(DamageEffect::delayed(args)?),
            AtomKind::FixedHeal => AtomicEffect::Heal(HealEffect::fixed(args)?),
            AtomKind::MaxHpPercentHeal => AtomicEffect::Heal(HealEffect::max_hp_percent(args)?),
            AtomKind::Regeneration => AtomicEffect::Heal(HealEffect::regeneration(args)?),
            AtomKind::CureStatus => AtomicEffect::Heal(HealEffect::cure(args)?),
            AtomKind::PpRestore => AtomicEffect::Heal(HealEffect::pp_restore(args)?),
            AtomKind::StatChange => AtomicEffect::StatStage(StatStageEffect::change(args)?),
            AtomKind::RandomStatChange => AtomicEffect::StatStage(StatStageEffect::random(args)?),
            AtomKind::AllStatsChange => AtomicEffect::StatStage(StatStageEffect::all(args)?),
            AtomKind::CumulativeStatChange => {
                AtomicEffect::StatStage(StatStageEffect::cumulative(args)?)
            }
            AtomKind::StealStages => AtomicEffect::StatStage(StatStageEffect::steal(args)?),
            AtomKind::CopyStages => AtomicEffect::StatStage(StatStageEffect::copy(args)?),
            AtomKind::SwapStages => AtomicEffect::StatStage(StatStageEffect::swap(args)?),
            AtomKind::ClearStages => AtomicEffect::StatStage(StatStageEffect::clear(args)?),
            AtomKind::TempStatBoost => AtomicEffect::StatStage(StatStageEffect::temp_boost(args)?),
            AtomKind::InflictStatus => AtomicEffect::Ailment(AilmentEffect::inflict(args)?),
            AtomKind::RandomStatus => AtomicEffect::Ailment(AilmentEffect::random_pool(args)?),
            AtomKind::CumulativeStatus => AtomicEffect::Ailment(AilmentEffect::cumulative(args)?),
            AtomKind::Flinch => AtomicEffect::Ailment(AilmentEffect::flinch(args)?),
            AtomKind::DamageCap => AtomicEffect::Defense(DefenseEffect::cap(args)?),
            AtomKind::DamageFloor => AtomicEffect::Defense(DefenseEffect::floor(args)?),
            AtomKind::FlatReduction => AtomicEffect::Defense(DefenseEffect::flat_reduction(args)?),
            AtomKind::PercentReduction => {
                AtomicEffect::Defense(DefenseEffect::percent_reduction(args)?)
            }
            AtomKind::PercentBoost => AtomicEffect::Defense(DefenseEffect::percent_boost(args)?),
            AtomKind::Shield => AtomicEffect::Defense(DefenseEffect::shield(args)?),
            AtomKind::Endure => AtomicEffect::Defense(DefenseEffect::endure(args)?),
            AtomKind::CounterPhysical => {
                AtomicEffect::Defense(DefenseEffect::counter_physical(args)?)
            }
            AtomKind::CounterSpecial => {
                AtomicEffect::Defense(DefenseEffect::counter_special(args)?)
            }
            AtomKind::ElementImmunity => {
                AtomicEffect::Defense(DefenseEffect::element_immunity(args)?)
            }
            AtomKind::PowerModify => AtomicEffect::Modifier(ModifierEffect::power(args)?),
            AtomKind::AccuracyModify => AtomicEffect::Modifier(ModifierEffect::accuracy(args)?),
            AtomKind::CritModify => AtomicEffect::Modifier(ModifierEffect::crit(args)?),
            AtomKind::PriorityModify => AtomicEffect::Modifier(ModifierEffect::priority(args)?),
            AtomKind::AlwaysHit => AtomicEffect::Modifier(ModifierEffect::always_hit(args)?),
            AtomKind::AlwaysCrit => AtomicEffect::Modifier(ModifierEffect::always_crit(args)?),
            AtomKind::CritGuard => AtomicEffect::Modifier(ModifierEffect::crit_guard(args)?),
            AtomKind::MissPenalty => AtomicEffect::Modifier(ModifierEffect::miss_penalty(args)?),
            AtomKind::SacrificeCrit => AtomicEffect::Special(SpecialEffect::sacrifice_crit(args)?),
            AtomKind::ChargeRelease => AtomicEffect::Special(SpecialEffect::charge_release(args)?),
            AtomKind::Transform => AtomicEffect::Special(SpecialEffect::transform(args)?),
            AtomKind::Substitute => AtomicEffect::Special(SpecialEffect::substitute(args)?),
            AtomKind::Encore => AtomicEffect::Special(SpecialEffect::encore(args)?),
            AtomKind::Disable => AtomicEffect::Special(SpecialEffect::disable(args)?),
            AtomKind::DelayedKill => AtomicEffect::Special(SpecialEffect::delayed_kill(args)?),
            AtomKind::TypeSwap => AtomicEffect::Special(SpecialEffect::type_swap(args)?),
            AtomKind::TypeCopy => AtomicEffect::Special(SpecialEffect::type_copy(args)?),
            AtomKind::TypeShift => AtomicEffect::Special(SpecialEffect::type_shift(args)?),
            AtomKind::MaxHpModify => AtomicEffect::Special(SpecialEffect::max_hp_modify(args)?),
            AtomKind::PpDrain => AtomicEffect::Special(SpecialEffect::pp_drain(args)?),
            AtomKind::BattleReward => AtomicEffect::Special(SpecialEffect::reward(args)?),
            AtomKind::InstantKill => AtomicEffect::Special(SpecialEffect::instant_kill(args)?),
            AtomKind::LeechSeed => AtomicEffect::Special(SpecialEffect::leech_seed(args)?),
        })
    }
}

/// One catalog entry: a composite is simply an entry with several atoms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u16,
    pub name: String,
    pub timings: Vec<Timing>,
    pub atoms: Vec<AtomKind>,
}

impl CatalogEntry {
    pub fn arity(&self) -> usize {
        self.atoms.iter().map(|a| a.arity()).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EffectCatalog {
    entries: HashMap<u16, CatalogEntry>,
}

impl EffectCatalog {
    pub fn entry(&self, id: u16) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    /// Summed argument arity for an id; None when the id is unknown.
    pub fn arity_of(&self, id: u16) -> Option<usize> {
        self.entries.get(&id).map(CatalogEntry::arity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.id, entry);
    }

    /// Built-in catalog plus an optional YAML overlay. Overlay entries with an
    /// existing id replace the built-in one; malformed overlays are logged and
    /// ignored.
    pub fn load(overlay_path: &Path) -> EffectCatalog {
        let mut catalog = EffectCatalog::builtin();
        if !overlay_path.exists() {
            return catalog;
        }
        let raw = match fs::read_to_string(overlay_path) {
            Ok(s) => s,
            Err(err) => {
                warn!(path = %overlay_path.display(), %err, "effect overlay unreadable, using built-ins");
                return catalog;
            }
        };
        match serde_yaml::from_str::<Vec<CatalogEntry>>(&raw) {
            Ok(overlay) => {
                for entry in overlay {
                    if entry.atoms.is_empty() {
                        error!(id = entry.id, "overlay entry has no atoms, skipping");
                        continue;
                    }
                    catalog.insert(entry);
                }
            }
            Err(err) => {
                error!(path = %overlay_path.display(), %err, "effect overlay malformed, using built-ins");
            }
        }
        catalog
    }

    pub fn builtin() -> EffectCatalog {
        use AtomKind::*;
        use Timing::*;

        let mut catalog = EffectCatalog::default();
        let mut add = |id: u16, name: &str, timings: &[Timing], atoms: &[AtomKind]| {
            catalog.insert(CatalogEntry {
                id,
                name: name.to_string(),
                timings: timings.to_vec(),
                atoms: atoms.to_vec(),
            });
        };

        // 1-19: direct damage and healing.
        add(1, "Flat Strike", &[AfterSkill], &[FixedDamage]);
        add(2, "Rend", &[AfterSkill], &[MaxHpPercentDamage]);
        add(3, "Cleave", &[AfterSkill], &[CurrentHpPercentDamage]);
        add(4, "Stat Shift", &[AfterSkill], &[StatChange]);
        add(5, "Reckless Recoil", &[AfterDamageApply], &[Recoil]);
        add(6, "Siphon", &[AfterDamageApply], &[Drain]);
        add(7, "Blood Price", &[BeforeDamageCalc], &[HpCostPower]);
        add(8, "Fury Flurry", &[AfterDamageCalc], &[MultiHit]);
        add(9, "Time Bomb", &[AfterSkill], &[DelayedDamage]);
        add(10, "Guillotine", &[BeforeDamageApply], &[InstantKill]);
        add(11, "Mend", &[AfterSkill], &[FixedHeal]);
        add(12, "Recover", &[AfterSkill], &[MaxHpPercentHeal]);
        add(13, "Verdant Pulse", &[AfterSkill], &[Regeneration]);
        add(14, "Cleanse", &[AfterSkill], &[CureStatus]);
        add(15, "Focus Tonic", &[AfterSkill], &[PpRestore]);
        add(16, "Purifying Rest", &[AfterSkill], &[MaxHpPercentHeal, CureStatus]);
        add(17, "Crimson Feast", &[AfterDamageApply], &[Drain, Recoil]);
        add(18, "Splinter Volley", &[AfterDamageCalc, AfterDamageApply], &[MultiHit, Flinch]);
        add(19, "Gravel Spray", &[AfterSkill], &[FixedDamage, StatChange]);

        // 20-29: stage manipulation.
        add(20, "Wild Surge", &[AfterSkill], &[RandomStatChange]);
        add(21, "War Cry", &[AfterSkill], &[AllStatsChange]);
        add(22, "Rising Fury", &[AfterSkill], &[CumulativeStatChange]);
        add(23, "Plunder", &[AfterSkill], &[StealStages]);
        add(24, "Mimic Stance", &[AfterSkill], &[CopyStages]);
        add(25, "Topsy-Turvy", &[AfterSkill], &[SwapStages]);
        add(26, "White Mist", &[AfterSkill], &[ClearStages]);
        add(27, "Battle Trance", &[AfterSkill], &[TempStatBoost]);
        add(28, "Twin Shift", &[AfterSkill], &[StatChange, StatChange]);
        add(29, "Overwhelm", &[AfterSkill], &[StatChange, StatChange, StatChange]);

        // 30-39: status ailments.
        add(30, "Afflict", &[AfterSkill], &[InflictStatus]);
        add(31, "Chaos Cloud", &[AfterSkill], &[RandomStatus]);
        add(32, "Creeping Dread", &[AfterSkill], &[CumulativeStatus]);
        add(33, "Skull Rattle", &[AfterDamageApply], &[Flinch]);
        add(34, "Venom Fang", &[AfterSkill], &[InflictStatus, StatChange]);
        add(35, "Nerve Jolt", &[AfterDamageApply, AfterSkill], &[Flinch, StatChange]);
        add(36, "Toxin Wave", &[AfterSkill], &[InflictStatus, MaxHpPercentDamage]);
        add(37, "Slumber Spore", &[AfterSkill, BeforeHitCheck], &[InflictStatus, AccuracyModify]);
        add(38, "Maddening Howl", &[AfterSkill], &[RandomStatus, StatChange]);
        add(39, "Lingering Rot", &[AfterSkill], &[InflictStatus, DelayedDamage]);

        // 40-54: defensive effects.
        add(40, "Bulwark Limit", &[AfterDamageCalc], &[DamageCap]);
        add(41, "Savage Minimum", &[AfterDamageCalc], &[DamageFloor]);
        add(42, "Stone Hide", &[AfterSkill], &[FlatReduction]);
        add(43, "Brace", &[AfterSkill], &[PercentReduction]);
        add(44, "Battle Rhythm", &[AfterSkill], &[PercentBoost]);
        add(45, "Aegis", &[AfterSkill], &[Shield]);
        add(46, "Last Stand", &[BeforeSkill], &[Endure]);
        add(47, "Thorn Mail", &[AfterSkill], &[CounterPhysical]);
        add(48, "Mirror Veil", &[AfterSkill], &[CounterSpecial]);
        add(49, "Null Field", &[AfterSkill], &[ElementImmunity]);
        add(50, "Bastion", &[AfterSkill], &[Shield, PercentReduction]);
        add(51, "Spiked Bastion", &[AfterSkill], &[Shield, CounterPhysical]);
        add(52, "Fortify Ritual", &[AfterSkill], &[PercentReduction, StatChange]);
        add(53, "Sacred Ward", &[AfterSkill], &[ElementImmunity, MaxHpPercentHeal]);
        add(54, "Iron Resolve", &[BeforeSkill, AfterSkill], &[Endure, StatChange]);

        // 55-69: in-flight modifiers.
        add(55, "Power Tune", &[BeforeDamageCalc], &[PowerModify]);
        add(56, "Aim Tune", &[BeforeHitCheck], &[AccuracyModify]);
        add(57, "Edge Tune", &[BeforeCritCheck], &[CritModify]);
        add(58, "Tempo Tune", &[BeforeSpeedCheck], &[PriorityModify]);
        add(59, "True Strike", &[HitCheck], &[AlwaysHit]);
        add(60, "Killing Intent", &[CritCheck], &[AlwaysCrit]);
        add(61, "Veiled Core", &[AfterSkill], &[CritGuard]);
        add(62, "Crash Risk", &[OnEvade], &[MissPenalty]);
        add(63, "Lock On", &[HitCheck, BeforeDamageCalc], &[AlwaysHit, PowerModify]);
        add(64, "Assassin Focus", &[CritCheck, BeforeCritCheck], &[AlwaysCrit, CritModify]);
        add(65, "Haste Veil", &[BeforeSpeedCheck, BeforeHitCheck], &[PriorityModify, AccuracyModify]);
        add(66, "Reckless Aim", &[BeforeHitCheck, OnEvade], &[AccuracyModify, MissPenalty]);
        add(67, "Steady Barrage", &[BeforeHitCheck, AfterDamageCalc], &[AccuracyModify, MultiHit]);
        add(68, "Hidden Edge", &[BeforeCritCheck, AfterDamageApply], &[CritModify, Drain]);
        add(69, "Bitter Tempo", &[BeforeSpeedCheck, AfterSkill], &[PriorityModify, StatChange]);

        // 70-89: specials.
        add(70, "Blood Oath", &[BeforeCritCheck], &[SacrificeCrit]);
        add(71, "Sky Charge", &[BeforeSkill, BeforeDamageCalc], &[ChargeRelease]);
        add(72, "Mirror Soul", &[AfterSkill], &[Transform]);
        add(73, "Straw Double", &[AfterSkill], &[Substitute]);
        add(74, "Taunting Echo", &[AfterSkill], &[Encore]);
        add(75, "Sealing Sigil", &[AfterSkill], &[Disable]);
        add(76, "Doom Chant", &[AfterSkill], &[DelayedKill]);
        add(77, "Element Trade", &[AfterSkill], &[TypeSwap]);
        add(78, "Element Mirror", &[AfterSkill], &[TypeCopy]);
        add(79, "Element Shift", &[AfterSkill], &[TypeShift]);
        add(80, "Vital Bloom", &[AfterSkill], &[MaxHpModify]);
        add(81, "Spirit Leech", &[AfterSkill], &[PpDrain]);
        add(82, "Victor's Spoils", &[BattleEnd], &[BattleReward]);
        add(83, "Parasite Seed", &[AfterSkill], &[LeechSeed]);
        add(84, "Wild Slam", &[AfterDamageApply], &[Recoil, Flinch]);
        add(85, "Vampiric Kiss", &[AfterDamageApply, AfterSkill], &[Drain, InflictStatus]);
        add(86, "Doom Trade", &[AfterSkill], &[DelayedKill, MaxHpPercentHeal]);
        add(87, "High Stakes", &[OnEvade, BeforeDamageCalc], &[MissPenalty, PowerModify]);
        add(88, "Seeded Gale", &[AfterSkill, BeforeSpeedCheck], &[LeechSeed, PriorityModify]);
        add(89, "Hero's Finale", &[BattleEnd, AfterSkill], &[BattleReward, StatChange]);

        catalog
    }
}
