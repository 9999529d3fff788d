//! Elemental effectiveness: sparse id→id→multiplier table with neutral 1.0
//! fallback, dual-type averaging, and the same-type attack bonus.
//!
//! The chart can be replaced by data/types.json; a missing or malformed file
//! degrades to all-neutral rather than failing the battle service.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const STAB_MULTIPLIER: f64 = 1.5;
pub const NEUTRAL: f64 = 1.0;

/// Numeric element id as it appears in skill and species records. Unknown ids
/// are legal everywhere and resolve to neutral effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u16);

/// Canonical element ids used by the built-in chart and the bundled data.
pub mod element {
    use super::TypeId;

    pub const NORMAL: TypeId = TypeId(1);
    pub const GRASS: TypeId = TypeId(2);
    pub const WATER: TypeId = TypeId(3);
    pub const FIRE: TypeId = TypeId(4);
    pub const WIND: TypeId = TypeId(5);
    pub const EARTH: TypeId = TypeId(6);
    pub const ELECTRIC: TypeId = TypeId(7);
    pub const ICE: TypeId = TypeId(8);
    pub const FIGHTING: TypeId = TypeId(9);
    pub const ROCK: TypeId = TypeId(10);
    pub const LIGHT: TypeId = TypeId(11);
    pub const DARK: TypeId = TypeId(12);
    pub const POISON: TypeId = TypeId(13);
    pub const FLYING: TypeId = TypeId(14);
    pub const DRAGON: TypeId = TypeId(15);
    pub const GHOST: TypeId = TypeId(16);
    pub const BUG: TypeId = TypeId(17);
    pub const STEEL: TypeId = TypeId(18);
    pub const PSYCHIC: TypeId = TypeId(19);
    pub const FAIRY: TypeId = TypeId(20);
    pub const SOUND: TypeId = TypeId(21);
    pub const SAND: TypeId = TypeId(22);
    pub const SHADOW: TypeId = TypeId(23);
    pub const CRYSTAL: TypeId = TypeId(24);
    pub const ANCIENT: TypeId = TypeId(25);
    pub const HOLY: TypeId = TypeId(26);
}

/// One row of data/types.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeChartRow {
    pub attacker: u16,
    pub defender: u16,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TypeChart {
    table: HashMap<(u16, u16), f64>,
}

impl TypeChart {
    /// All-neutral chart (every lookup returns 1.0).
    pub fn empty() -> TypeChart {
        TypeChart { table: HashMap::new() }
    }

    /// Load from a JSON array of rows. Missing or malformed files degrade to
    /// the all-neutral chart with a warning; battles keep running.
    pub fn load(path: &Path) -> TypeChart {
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                warn!(path = %path.display(), %err, "type chart missing, using neutral effectiveness");
                return TypeChart::empty();
            }
        };
        match serde_json::from_str::<Vec<TypeChartRow>>(&raw) {
            Ok(rows) => {
                let mut chart = TypeChart::empty();
                for row in rows {
                    chart.set(TypeId(row.attacker), TypeId(row.defender), row.multiplier);
                }
                chart
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "type chart malformed, using neutral effectiveness");
                TypeChart::empty()
            }
        }
    }

    /// Load from disk, falling back to the built-in matrix (rather than the
    /// neutral one) when the file is absent. Used by the data registry.
    pub fn load_or_builtin(path: &Path) -> TypeChart {
        if path.exists() {
            TypeChart::load(path)
        } else {
            TypeChart::builtin()
        }
    }

    pub fn set(&mut self, attacker: TypeId, defender: TypeId, multiplier: f64) {
        self.table.insert((attacker.0, defender.0), multiplier);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Single attacker element vs single defender element. Absent pairs and
    /// unknown ids are neutral.
    pub fn effectiveness(&self, attacker: TypeId, defender: TypeId) -> f64 {
        self.table.get(&(attacker.0, defender.0)).copied().unwrap_or(NEUTRAL)
    }

    /// Single attacker element vs a possibly dual defender: dual defenders
    /// average the two component match-ups (2.0 and 0.5 give 1.25).
    pub fn effectiveness_vs(&self, attacker: TypeId, defender: (TypeId, Option<TypeId>)) -> f64 {
        match defender.1 {
            None => self.effectiveness(attacker, defender.0),
            Some(second) => {
                (self.effectiveness(attacker, defender.0) + self.effectiveness(attacker, second))
                    / 2.0
            }
        }
    }

    /// General lookup covering all four arities. A dual attacker against a
    /// single defender averages its two match-ups; when both sides are dual,
    /// each attacker element averages across the defender pair and the two
    /// per-element results compose multiplicatively (extremes 4.0 and 0.25).
    pub fn dual_effectiveness(
        &self,
        attacker: (TypeId, Option<TypeId>),
        defender: (TypeId, Option<TypeId>),
    ) -> f64 {
        match (attacker.1, defender.1) {
            (None, _) => self.effectiveness_vs(attacker.0, defender),
            (Some(second), None) => {
                (self.effectiveness(attacker.0, defender.0)
                    + self.effectiveness(second, defender.0))
                    / 2.0
            }
            (Some(second), Some(_)) => {
                self.effectiveness_vs(attacker.0, defender)
                    * self.effectiveness_vs(second, defender)
            }
        }
    }

    /// Built-in effectiveness matrix over the canonical 26 elements.
    pub fn builtin() -> TypeChart {
        use element::*;

        let mut chart = TypeChart::empty();
        let mut add = |atk: TypeId, def: TypeId, mult: f64| chart.set(atk, def, mult);

        // Grass / water / fire triangle.
        add(GRASS, WATER, 2.0);
        add(GRASS, EARTH, 2.0);
        add(GRASS, ROCK, 2.0);
        add(GRASS, FIRE, 0.5);
        add(GRASS, GRASS, 0.5);
        add(GRASS, FLYING, 0.5);
        add(GRASS, POISON, 0.5);
        add(GRASS, BUG, 0.5);
        add(GRASS, DRAGON, 0.5);
        add(WATER, FIRE, 2.0);
        add(WATER, EARTH, 2.0);
        add(WATER, ROCK, 2.0);
        add(WATER, SAND, 2.0);
        add(WATER, WATER, 0.5);
        add(WATER, GRASS, 0.5);
        add(WATER, DRAGON, 0.5);
        add(FIRE, GRASS, 2.0);
        add(FIRE, ICE, 2.0);
        add(FIRE, BUG, 2.0);
        add(FIRE, STEEL, 2.0);
        add(FIRE, CRYSTAL, 2.0);
        add(FIRE, FIRE, 0.5);
        add(FIRE, WATER, 0.5);
        add(FIRE, ROCK, 0.5);
        add(FIRE, DRAGON, 0.5);

        // Wind / earth / electric block.
        add(WIND, GRASS, 2.0);
        add(WIND, BUG, 2.0);
        add(WIND, FIGHTING, 2.0);
        add(WIND, ELECTRIC, 0.5);
        add(WIND, ROCK, 0.5);
        add(WIND, STEEL, 0.5);
        add(EARTH, FIRE, 2.0);
        add(EARTH, ELECTRIC, 2.0);
        add(EARTH, POISON, 2.0);
        add(EARTH, ROCK, 2.0);
        add(EARTH, STEEL, 2.0);
        add(EARTH, GRASS, 0.5);
        add(EARTH, BUG, 0.5);
        add(EARTH, FLYING, 0.0);
        add(ELECTRIC, WATER, 2.0);
        add(ELECTRIC, FLYING, 2.0);
        add(ELECTRIC, WIND, 2.0);
        add(ELECTRIC, ELECTRIC, 0.5);
        add(ELECTRIC, GRASS, 0.5);
        add(ELECTRIC, DRAGON, 0.5);
        add(ELECTRIC, EARTH, 0.0);

        // Ice / fighting / rock block.
        add(ICE, GRASS, 2.0);
        add(ICE, EARTH, 2.0);
        add(ICE, FLYING, 2.0);
        add(ICE, DRAGON, 2.0);
        add(ICE, FIRE, 0.5);
        add(ICE, WATER, 0.5);
        add(ICE, ICE, 0.5);
        add(ICE, STEEL, 0.5);
        add(FIGHTING, NORMAL, 2.0);
        add(FIGHTING, ICE, 2.0);
        add(FIGHTING, ROCK, 2.0);
        add(FIGHTING, STEEL, 2.0);
        add(FIGHTING, DARK, 2.0);
        add(FIGHTING, FLYING, 0.5);
        add(FIGHTING, POISON, 0.5);
        add(FIGHTING, PSYCHIC, 0.5);
        add(FIGHTING, BUG, 0.5);
        add(FIGHTING, FAIRY, 0.5);
        add(FIGHTING, GHOST, 0.0);
        add(ROCK, FIRE, 2.0);
        add(ROCK, ICE, 2.0);
        add(ROCK, FLYING, 2.0);
        add(ROCK, BUG, 2.0);
        add(ROCK, FIGHTING, 0.5);
        add(ROCK, EARTH, 0.5);
        add(ROCK, STEEL, 0.5);

        // Light / dark / ghost / psychic block.
        add(LIGHT, DARK, 2.0);
        add(LIGHT, GHOST, 2.0);
        add(LIGHT, SHADOW, 2.0);
        add(LIGHT, LIGHT, 0.5);
        add(LIGHT, STEEL, 0.5);
        add(DARK, PSYCHIC, 2.0);
        add(DARK, GHOST, 2.0);
        add(DARK, LIGHT, 0.5);
        add(DARK, DARK, 0.5);
        add(DARK, FIGHTING, 0.5);
        add(DARK, FAIRY, 0.5);
        add(GHOST, GHOST, 2.0);
        add(GHOST, PSYCHIC, 2.0);
        add(GHOST, NORMAL, 0.0);
        add(GHOST, DARK, 0.5);
        add(PSYCHIC, FIGHTING, 2.0);
        add(PSYCHIC, POISON, 2.0);
        add(PSYCHIC, PSYCHIC, 0.5);
        add(PSYCHIC, STEEL, 0.5);
        add(PSYCHIC, DARK, 0.0);
        add(SHADOW, PSYCHIC, 2.0);
        add(SHADOW, GHOST, 2.0);
        add(SHADOW, LIGHT, 0.5);
        add(SHADOW, HOLY, 0.5);

        // Poison / flying / bug block.
        add(POISON, GRASS, 2.0);
        add(POISON, FAIRY, 2.0);
        add(POISON, POISON, 0.5);
        add(POISON, EARTH, 0.5);
        add(POISON, ROCK, 0.5);
        add(POISON, GHOST, 0.5);
        add(POISON, STEEL, 0.0);
        add(FLYING, GRASS, 2.0);
        add(FLYING, FIGHTING, 2.0);
        add(FLYING, BUG, 2.0);
        add(FLYING, ELECTRIC, 0.5);
        add(FLYING, ROCK, 0.5);
        add(FLYING, STEEL, 0.5);
        add(BUG, GRASS, 2.0);
        add(BUG, PSYCHIC, 2.0);
        add(BUG, DARK, 2.0);
        add(BUG, FIRE, 0.5);
        add(BUG, FIGHTING, 0.5);
        add(BUG, POISON, 0.5);
        add(BUG, FLYING, 0.5);
        add(BUG, GHOST, 0.5);
        add(BUG, STEEL, 0.5);
        add(BUG, FAIRY, 0.5);

        // Dragon / steel / fairy block.
        add(DRAGON, DRAGON, 2.0);
        add(DRAGON, STEEL, 0.5);
        add(DRAGON, FAIRY, 0.0);
        add(STEEL, ICE, 2.0);
        add(STEEL, ROCK, 2.0);
        add(STEEL, FAIRY, 2.0);
        add(STEEL, CRYSTAL, 2.0);
        add(STEEL, STEEL, 0.5);
        add(STEEL, FIRE, 0.5);
        add(STEEL, WATER, 0.5);
        add(STEEL, ELECTRIC, 0.5);
        add(FAIRY, FIGHTING, 2.0);
        add(FAIRY, DRAGON, 2.0);
        add(FAIRY, DARK, 2.0);
        add(FAIRY, FIRE, 0.5);
        add(FAIRY, POISON, 0.5);
        add(FAIRY, STEEL, 0.5);

        // Extended elements.
        add(SOUND, PSYCHIC, 2.0);
        add(SOUND, CRYSTAL, 2.0);
        add(SOUND, ROCK, 0.5);
        add(SOUND, STEEL, 0.5);
        add(SAND, ELECTRIC, 2.0);
        add(SAND, FIRE, 2.0);
        add(SAND, WATER, 0.5);
        add(SAND, GRASS, 0.5);
        add(CRYSTAL, DRAGON, 2.0);
        add(CRYSTAL, SHADOW, 2.0);
        add(CRYSTAL, STEEL, 0.5);
        add(CRYSTAL, FIRE, 0.5);
        add(ANCIENT, DRAGON, 2.0);
        add(ANCIENT, NORMAL, 2.0);
        add(ANCIENT, HOLY, 0.5);
        add(ANCIENT, FAIRY, 0.5);
        add(HOLY, DARK, 2.0);
        add(HOLY, SHADOW, 2.0);
        add(HOLY, GHOST, 2.0);
        add(HOLY, HOLY, 0.5);
        add(HOLY, ANCIENT, 0.5);

        chart
    }
}

/// STAB: 1.5 when the skill element matches either attacker element.
pub fn stab_multiplier(skill_element: TypeId, attacker_types: (TypeId, Option<TypeId>)) -> f64 {
    if attacker_types.0 == skill_element || attacker_types.1 == Some(skill_element) {
        STAB_MULTIPLIER
    } else {
        NEUTRAL
    }
}

#[cfg(test)]
mod tests {
    use super::element::*;
    use super::*;

    #[test]
    fn unknown_pairs_are_neutral() {
        let chart = TypeChart::builtin();
        assert_eq!(chart.effectiveness(TypeId(999), TypeId(3)), 1.0);
        assert_eq!(chart.effectiveness(FIRE, TypeId(12345)), 1.0);
        assert_eq!(TypeChart::empty().effectiveness(FIRE, GRASS), 1.0);
    }

    #[test]
    fn single_lookups_match_table() {
        let chart = TypeChart::builtin();
        assert_eq!(chart.effectiveness(FIRE, GRASS), 2.0);
        assert_eq!(chart.effectiveness(FIRE, WATER), 0.5);
        assert_eq!(chart.effectiveness(GHOST, NORMAL), 0.0);
        assert_eq!(chart.effectiveness(NORMAL, NORMAL), 1.0);
    }

    #[test]
    fn dual_defender_averages() {
        let chart = TypeChart::builtin();
        // 2.0 vs grass, 0.5 vs water -> 1.25.
        assert_eq!(chart.effectiveness_vs(FIRE, (GRASS, Some(WATER))), 1.25);
        // 0.5 vs fighting, 0.0 vs ghost -> 0.25.
        assert_eq!(chart.effectiveness_vs(FIGHTING, (FLYING, Some(GHOST))), 0.25);
    }

    #[test]
    fn dual_attacker_vs_single_averages() {
        let chart = TypeChart::builtin();
        // fire 2.0 + water 0.5 vs grass -> 1.25.
        assert_eq!(chart.dual_effectiveness((FIRE, Some(WATER)), (GRASS, None)), 1.25);
    }

    #[test]
    fn dual_vs_dual_composes_per_attacker_averages() {
        let chart = TypeChart::builtin();
        // fire vs grass/bug averages 2.0; same for the second fire element -> 4.0.
        let value = chart.dual_effectiveness((FIRE, Some(FIRE)), (GRASS, Some(BUG)));
        assert_eq!(value, 4.0);
        // water vs fire/dragon averages (2.0+0.5)/2; grass vs fire/dragon (0.5+0.5)/2.
        let mixed = chart.dual_effectiveness((WATER, Some(GRASS)), (FIRE, Some(DRAGON)));
        assert_eq!(mixed, 1.25 * 0.5);
    }

    #[test]
    fn dual_entry_point_degrades_to_simple_forms() {
        let chart = TypeChart::builtin();
        assert_eq!(
            chart.dual_effectiveness((FIRE, None), (GRASS, None)),
            chart.effectiveness(FIRE, GRASS)
        );
        assert_eq!(
            chart.dual_effectiveness((FIRE, None), (GRASS, Some(WATER))),
            chart.effectiveness_vs(FIRE, (GRASS, Some(WATER)))
        );
    }

    #[test]
    fn stab_matches_either_attacker_element() {
        assert_eq!(stab_multiplier(FIRE, (FIRE, None)), 1.5);
        assert_eq!(stab_multiplier(FIRE, (WATER, Some(FIRE))), 1.5);
        assert_eq!(stab_multiplier(FIRE, (WATER, Some(GRASS))), 1.0);
    }

    #[test]
    fn missing_file_loads_neutral() {
        let chart = TypeChart::load(Path::new("data/does_not_exist.json"));
        assert!(chart.is_empty());
        assert_eq!(chart.effectiveness(FIRE, GRASS), 1.0);
    }
}
