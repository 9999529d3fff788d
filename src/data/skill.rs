//! Skill data: per-skill records with the space-separated side-effect
//! encoding, parsed into engine [SkillDefinition]s at load time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::battle::state::{SkillCategory, SkillDefinition};
use crate::battle::type_chart::TypeId;

pub const DEFAULT_SKILLS_PATH: &str = "data/skills.json";

/// Raw skill record as stored on disk. `side_effects` is one or more effect
/// ids separated by spaces; `effect_args` is the single flat numeric list the
/// trigger slices positionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: u32,
    pub name: String,
    pub category: SkillCategory,
    pub element: u16,
    pub power: i32,
    pub accuracy: f64,
    #[serde(default)]
    pub crit_stage: u8,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub always_hits: bool,
    #[serde(default)]
    pub side_effects: String,
    #[serde(default)]
    pub effect_args: String,
    #[serde(default = "default_pp")]
    pub max_pp: u8,
}

fn default_pp() -> u8 {
    20
}

/// Tokenize a space-separated number list, dropping malformed tokens with a
/// warning rather than failing the whole skill.
fn parse_number_list<T: std::str::FromStr>(raw: &str, skill: u32, field: &str) -> Vec<T> {
    raw.split_whitespace()
        .filter_map(|token| match token.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(skill, field, token, "unparseable token in skill encoding, dropped");
                None
            }
        })
        .collect()
}

impl SkillRecord {
    pub fn to_definition(&self) -> SkillDefinition {
        SkillDefinition {
            id: self.id,
            name: self.name.clone(),
            category: self.category,
            element: TypeId(self.element),
            power: self.power,
            accuracy: self.accuracy,
            crit_stage: self.crit_stage,
            priority: self.priority,
            always_hits: self.always_hits,
            side_effects: parse_number_list(&self.side_effects, self.id, "side_effects"),
            effect_args: parse_number_list(&self.effect_args, self.id, "effect_args"),
            max_pp: self.max_pp,
        }
    }
}

/// Load the skill list. None when missing or invalid; callers fall back to
/// [builtin_skills].
pub fn load_skills(path: &Path) -> Option<Vec<SkillRecord>> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

struct SkillSpec {
    id: u32,
    name: &'static str,
    category: SkillCategory,
    element: u16,
    power: i32,
    accuracy: f64,
    priority: i32,
    always_hits: bool,
    side_effects: &'static str,
    effect_args: &'static str,
    max_pp: u8,
}

fn build(spec: SkillSpec) -> SkillRecord {
    SkillRecord {
        id: spec.id,
        name: spec.name.to_string(),
        category: spec.category,
        element: spec.element,
        power: spec.power,
        accuracy: spec.accuracy,
        crit_stage: 0,
        priority: spec.priority,
        always_hits: spec.always_hits,
        side_effects: spec.side_effects.to_string(),
        effect_args: spec.effect_args.to_string(),
        max_pp: spec.max_pp,
    }
}

/// Built-in move list covering the effect catalog's main families.
pub fn builtin_skills() -> Vec<SkillRecord> {
    use SkillCategory::*;

    vec![
        build(SkillSpec { id: 101, name: "Tackle", category: Physical, element: 1, power: 40, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "", effect_args: "", max_pp: 35 }),
        build(SkillSpec { id: 102, name: "Quick Jab", category: Physical, element: 1, power: 40, accuracy: 100.0, priority: 1, always_hits: false, side_effects: "", effect_args: "", max_pp: 30 }),
        build(SkillSpec { id: 103, name: "Flame Burst", category: Special, element: 4, power: 90, accuracy: 95.0, priority: 0, always_hits: false, side_effects: "30", effect_args: "0 30 3", max_pp: 15 }),
        build(SkillSpec { id: 104, name: "Tide Crash", category: Special, element: 3, power: 85, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "", effect_args: "", max_pp: 15 }),
        build(SkillSpec { id: 105, name: "Leaf Blade", category: Physical, element: 2, power: 90, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "", effect_args: "", max_pp: 15 }),
        build(SkillSpec { id: 106, name: "Thunder Coil", category: Special, element: 7, power: 95, accuracy: 90.0, priority: 0, always_hits: false, side_effects: "30", effect_args: "2 30 3", max_pp: 10 }),
        build(SkillSpec { id: 107, name: "Stone Spire", category: Physical, element: 10, power: 100, accuracy: 80.0, priority: 0, always_hits: false, side_effects: "", effect_args: "", max_pp: 10 }),
        build(SkillSpec { id: 108, name: "Gale Dance", category: Status, element: 5, power: 0, accuracy: 100.0, priority: 0, always_hits: true, side_effects: "28", effect_args: "5 100 1 6 100 1", max_pp: 20 }),
        build(SkillSpec { id: 109, name: "Frost Lance", category: Physical, element: 8, power: 85, accuracy: 95.0, priority: 0, always_hits: false, side_effects: "30", effect_args: "4 20 2", max_pp: 15 }),
        build(SkillSpec { id: 110, name: "Dream Mist", category: Status, element: 19, power: 0, accuracy: 75.0, priority: 0, always_hits: false, side_effects: "30", effect_args: "3 100 3", max_pp: 15 }),
        build(SkillSpec { id: 111, name: "Soothing Light", category: Status, element: 11, power: 0, accuracy: 100.0, priority: 0, always_hits: true, side_effects: "12", effect_args: "50", max_pp: 10 }),
        build(SkillSpec { id: 112, name: "Verdant Bloom", category: Status, element: 2, power: 0, accuracy: 100.0, priority: 0, always_hits: true, side_effects: "13", effect_args: "4 12", max_pp: 10 }),
        build(SkillSpec { id: 113, name: "Overdrive", category: Status, element: 1, power: 0, accuracy: 100.0, priority: 0, always_hits: true, side_effects: "4 4 4 4 4 4", effect_args: "0 100 1 1 100 1 2 100 1 3 100 1 4 100 1 5 100 1", max_pp: 5 }),
        build(SkillSpec { id: 114, name: "Withering Glare", category: Status, element: 12, power: 0, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "28", effect_args: "1 100 -1 2 100 -1", max_pp: 20 }),
        build(SkillSpec { id: 115, name: "Parasite Seed", category: Status, element: 2, power: 0, accuracy: 90.0, priority: 0, always_hits: false, side_effects: "83", effect_args: "12.5 2", max_pp: 10 }),
        build(SkillSpec { id: 116, name: "Doom Chant", category: Status, element: 16, power: 0, accuracy: 100.0, priority: 0, always_hits: true, side_effects: "76", effect_args: "3", max_pp: 5 }),
        build(SkillSpec { id: 117, name: "Sky Charge", category: Physical, element: 14, power: 110, accuracy: 95.0, priority: 0, always_hits: false, side_effects: "71", effect_args: "2", max_pp: 10 }),
        build(SkillSpec { id: 118, name: "Blood Feast", category: Physical, element: 12, power: 75, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "6", effect_args: "50", max_pp: 10 }),
        build(SkillSpec { id: 119, name: "Reckless Charge", category: Physical, element: 1, power: 120, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "5", effect_args: "25", max_pp: 15 }),
        build(SkillSpec { id: 120, name: "Aegis Ward", category: Status, element: 18, power: 0, accuracy: 100.0, priority: 0, always_hits: true, side_effects: "45", effect_args: "60 3", max_pp: 10 }),
        build(SkillSpec { id: 121, name: "Last Stand", category: Status, element: 9, power: 0, accuracy: 100.0, priority: 2, always_hits: true, side_effects: "46", effect_args: "", max_pp: 5 }),
        build(SkillSpec { id: 122, name: "Fury Swipes", category: Physical, element: 1, power: 25, accuracy: 85.0, priority: 0, always_hits: false, side_effects: "8", effect_args: "2 5", max_pp: 20 }),
        build(SkillSpec { id: 123, name: "Guillotine", category: Physical, element: 1, power: 1, accuracy: 30.0, priority: 0, always_hits: false, side_effects: "10", effect_args: "100", max_pp: 5 }),
        build(SkillSpec { id: 124, name: "Mirror Soul", category: Status, element: 19, power: 0, accuracy: 100.0, priority: 0, always_hits: true, side_effects: "72", effect_args: "", max_pp: 5 }),
        build(SkillSpec { id: 125, name: "Spirit Leech", category: Status, element: 16, power: 0, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "81", effect_args: "3", max_pp: 10 }),
        build(SkillSpec { id: 126, name: "True Strike", category: Physical, element: 1, power: 70, accuracy: 100.0, priority: 0, always_hits: false, side_effects: "59", effect_args: "", max_pp: 15 }),
        build(SkillSpec { id: 127, name: "Killing Intent", category: Physical, element: 12, power: 65, accuracy: 90.0, priority: 0, always_hits: false, side_effects: "60", effect_args: "", max_pp: 10 }),
        build(SkillSpec { id: 128, name: "Venom Fang", category: Physical, element: 13, power: 65, accuracy: 95.0, priority: 0, always_hits: false, side_effects: "34", effect_args: "1 40 3 2 50 -1", max_pp: 15 }),
    ]
}
