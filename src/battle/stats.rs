//! Realized stat computation and the shared stage/crit/accuracy curves.
//!
//! All curves clamp at the point of use: levels to [1,100], stages to [-6,6],
//! rates to [0,100]. Integer stat math floors, matching the live servers.

use serde::{Deserialize, Serialize};

pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 100;
pub const MIN_STAGE: i8 = -6;
pub const MAX_STAGE: i8 = 6;
pub const BASE_CRIT_RATE: f64 = 6.25;

/// The six combat stats. `index` matches the positional encoding used by
/// skill side-effect arguments (0 = HP .. 5 = Speed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Hp,
    Attack,
    Defense,
    SpAttack,
    SpDefense,
    Speed,
}

impl StatKind {
    pub const ALL: [StatKind; 6] = [
        StatKind::Hp,
        StatKind::Attack,
        StatKind::Defense,
        StatKind::SpAttack,
        StatKind::SpDefense,
        StatKind::Speed,
    ];

    pub const fn index(self) -> usize {
        match self {
            StatKind::Hp => 0,
            StatKind::Attack => 1,
            StatKind::Defense => 2,
            StatKind::SpAttack => 3,
            StatKind::SpDefense => 4,
            StatKind::Speed => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<StatKind> {
        StatKind::ALL.get(index).copied()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            StatKind::Hp => "hp",
            StatKind::Attack => "attack",
            StatKind::Defense => "defense",
            StatKind::SpAttack => "sp_attack",
            StatKind::SpDefense => "sp_defense",
            StatKind::Speed => "speed",
        }
    }
}

/// Nature raises one non-HP stat by 10% and lowers another by 10%.
/// Neutral natures raise and lower nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nature {
    #[serde(default)]
    pub raised: Option<StatKind>,
    #[serde(default)]
    pub lowered: Option<StatKind>,
}

impl Nature {
    pub const NEUTRAL: Nature = Nature { raised: None, lowered: None };

    /// Multiplier for one stat. HP is never affected by nature.
    pub fn coefficient(&self, stat: StatKind) -> f64 {
        if stat == StatKind::Hp {
            return 1.0;
        }
        if self.raised == Some(stat) && self.lowered != Some(stat) {
            1.1
        } else if self.lowered == Some(stat) && self.raised != Some(stat) {
            0.9
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
}

impl BaseStats {
    pub fn get(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::Hp => self.hp,
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::SpAttack => self.sp_attack,
            StatKind::SpDefense => self.sp_defense,
            StatKind::Speed => self.speed,
        }
    }

    pub fn uniform(value: u32) -> BaseStats {
        BaseStats {
            hp: value,
            attack: value,
            defense: value,
            sp_attack: value,
            sp_defense: value,
            speed: value,
        }
    }
}

/// Realized combat stats at a given level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedStats {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub sp_attack: i32,
    pub sp_defense: i32,
    pub speed: i32,
}

impl RealizedStats {
    pub fn get(&self, stat: StatKind) -> i32 {
        match stat {
            StatKind::Hp => self.hp,
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::SpAttack => self.sp_attack,
            StatKind::SpDefense => self.sp_defense,
            StatKind::Speed => self.speed,
        }
    }

    pub fn set(&mut self, stat: StatKind, value: i32) {
        match stat {
            StatKind::Hp => self.hp = value,
            StatKind::Attack => self.attack = value,
            StatKind::Defense => self.defense = value,
            StatKind::SpAttack => self.sp_attack = value,
            StatKind::SpDefense => self.sp_defense = value,
            StatKind::Speed => self.speed = value,
        }
    }
}

pub fn clamp_level(level: u32) -> u32 {
    level.clamp(MIN_LEVEL, MAX_LEVEL)
}

pub fn clamp_stage(stage: i8) -> i8 {
    stage.clamp(MIN_STAGE, MAX_STAGE)
}

/// One realized stat. `iv` in [0,31]; `ev` defaults to 0 upstream when the
/// record omits it.
pub fn calculate_stat(
    base: u32,
    iv: u32,
    ev: u32,
    level: u32,
    stat: StatKind,
    nature: Nature,
) -> i32 {
    let level = clamp_level(level);
    let core = ((2 * base + iv + ev / 4) * level / 100) as i32;
    match stat {
        StatKind::Hp => core + level as i32 + 10,
        _ => (((core + 5) as f64) * nature.coefficient(stat)).floor() as i32,
    }
}

/// All six realized stats from one base record.
pub fn calculate_stats(base: &BaseStats, iv: u32, ev: u32, level: u32, nature: Nature) -> RealizedStats {
    let mut out = RealizedStats::default();
    for stat in StatKind::ALL {
        out.set(stat, calculate_stat(base.get(stat), iv, ev, level, stat, nature));
    }
    out
}

/// Stage-modified stat value. Integer math: (100,+1)=150, (100,-1)=66.
pub fn apply_stage_modifier(value: i32, stage: i8) -> i32 {
    let stage = clamp_stage(stage) as i32;
    if stage >= 0 {
        value * (2 + stage) / 2
    } else {
        value * 2 / (2 - stage)
    }
}

/// Stage multiplier as a ratio, for accuracy/evasion composition.
pub fn stage_multiplier(stage: i8) -> f64 {
    let stage = clamp_stage(stage) as f64;
    if stage >= 0.0 {
        (2.0 + stage) / 2.0
    } else {
        2.0 / (2.0 - stage)
    }
}

/// Crit rate percent for a crit stage: 6.25% base, ×(stage+1), clamped to 100.
pub fn crit_rate(stage: u8) -> f64 {
    (BASE_CRIT_RATE * (stage as f64 + 1.0)).min(100.0)
}

/// Final hit chance percent from base accuracy and the two stage levels.
pub fn calculate_accuracy(base_accuracy: f64, accuracy_stage: i8, evasion_stage: i8) -> f64 {
    let raw = base_accuracy * stage_multiplier(accuracy_stage) / stage_multiplier(evasion_stage);
    raw.clamp(0.0, 100.0)
}

/// Which side moves first. Priority always wins; equal priority compares
/// speed; an exact speed tie is an unbiased coin flip.
pub fn first_mover(
    priority_a: i32,
    speed_a: i32,
    priority_b: i32,
    speed_b: i32,
    rng: &mut crate::battle::rng::Rng,
) -> usize {
    if priority_a != priority_b {
        return if priority_a > priority_b { 0 } else { 1 };
    }
    if speed_a != speed_b {
        return if speed_a > speed_b { 0 } else { 1 };
    }
    if rng.coin_flip() {
        0
    } else {
        1
    }
}
