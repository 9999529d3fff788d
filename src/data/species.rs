//! Species data: base stats and element types per species id, loaded from
//! data/species.json with a built-in roster fallback.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::stats::BaseStats;
use crate::battle::type_chart::{element, TypeId};

pub const DEFAULT_SPECIES_PATH: &str = "data/species.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub id: u32,
    pub name: String,
    pub base: BaseStats,
    pub primary_type: u16,
    #[serde(default)]
    pub secondary_type: Option<u16>,
}

impl SpeciesRecord {
    pub fn types(&self) -> (TypeId, Option<TypeId>) {
        (TypeId(self.primary_type), self.secondary_type.map(TypeId))
    }
}

/// Load the species list. Returns None when the file is missing or invalid;
/// callers fall back to [builtin_species].
pub fn load_species(path: &Path) -> Option<Vec<SpeciesRecord>> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn record(
    id: u32,
    name: &str,
    stats: [u32; 6],
    primary: TypeId,
    secondary: Option<TypeId>,
) -> SpeciesRecord {
    SpeciesRecord {
        id,
        name: name.to_string(),
        base: BaseStats {
            hp: stats[0],
            attack: stats[1],
            defense: stats[2],
            sp_attack: stats[3],
            sp_defense: stats[4],
            speed: stats[5],
        },
        primary_type: primary.0,
        secondary_type: secondary.map(|t| t.0),
    }
}

/// Built-in roster used when no data directory is present (tests, demos).
pub fn builtin_species() -> Vec<SpeciesRecord> {
    vec![
        record(1, "Emberling", [65, 85, 60, 95, 65, 90], element::FIRE, None),
        record(2, "Tidecub", [80, 70, 85, 80, 90, 55], element::WATER, None),
        record(3, "Thornpup", [75, 80, 90, 70, 75, 60], element::GRASS, None),
        record(4, "Voltkit", [60, 75, 55, 100, 70, 110], element::ELECTRIC, None),
        record(5, "Stonehorn", [95, 100, 110, 45, 70, 35], element::ROCK, Some(element::EARTH)),
        record(6, "Galewing", [70, 85, 60, 75, 65, 105], element::WIND, Some(element::FLYING)),
        record(7, "Frostfang", [75, 90, 70, 85, 75, 80], element::ICE, None),
        record(8, "Shadepaw", [70, 95, 65, 85, 70, 95], element::DARK, Some(element::GHOST)),
        record(9, "Lumivine", [85, 60, 75, 95, 95, 65], element::LIGHT, Some(element::GRASS)),
        record(10, "Dunetail", [90, 85, 95, 60, 80, 50], element::SAND, None),
        record(11, "Mistral", [65, 70, 60, 105, 85, 100], element::PSYCHIC, None),
        record(12, "Drakelet", [85, 105, 85, 95, 80, 75], element::DRAGON, Some(element::FIRE)),
    ]
}
