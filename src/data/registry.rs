//! Startup-loaded data cache. Load once, share via Arc across server
//! handlers, the CLI, and the batch simulator; battles clone what they need.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::battle::state::{PetState, SkillDefinition};
use crate::battle::stats::{calculate_stats, Nature};
use crate::battle::type_chart::TypeChart;
use crate::data::skill::{builtin_skills, load_skills, DEFAULT_SKILLS_PATH};
use crate::data::species::{builtin_species, load_species, SpeciesRecord, DEFAULT_SPECIES_PATH};
use crate::data::DataError;
use crate::effects::EffectCatalog;

pub const DEFAULT_TYPE_CHART_PATH: &str = "data/types.json";
pub const DEFAULT_EFFECTS_OVERLAY_PATH: &str = "data/effects.yaml";

#[derive(Debug)]
pub struct DataRegistry {
    species: Vec<SpeciesRecord>,
    species_by_id: HashMap<u32, usize>,
    skills: Vec<SkillDefinition>,
    skills_by_id: HashMap<u32, usize>,
    chart: Arc<TypeChart>,
    catalog: Arc<EffectCatalog>,
}

impl DataRegistry {
    /// Load everything from the data directory, falling back to built-ins
    /// per file. Never fails: a fully absent data directory yields the
    /// built-in roster, move list, chart, and catalog.
    pub fn load() -> Arc<DataRegistry> {
        let species =
            load_species(Path::new(DEFAULT_SPECIES_PATH)).unwrap_or_else(builtin_species);
        let skills: Vec<SkillDefinition> = load_skills(Path::new(DEFAULT_SKILLS_PATH))
            .unwrap_or_else(builtin_skills)
            .iter()
            .map(|r| r.to_definition())
            .collect();
        let chart = Arc::new(TypeChart::load_or_builtin(Path::new(DEFAULT_TYPE_CHART_PATH)));
        let catalog = Arc::new(EffectCatalog::load(Path::new(DEFAULT_EFFECTS_OVERLAY_PATH)));
        info!(
            species = species.len(),
            skills = skills.len(),
            effects = catalog.len(),
            "data registry loaded"
        );
        Arc::new(Self::from_parts(species, skills, chart, catalog))
    }

    /// Assemble a registry from in-memory parts (tests, embedded use).
    pub fn from_parts(
        species: Vec<SpeciesRecord>,
        skills: Vec<SkillDefinition>,
        chart: Arc<TypeChart>,
        catalog: Arc<EffectCatalog>,
    ) -> DataRegistry {
        let species_by_id = species.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let skills_by_id = skills.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        DataRegistry { species, species_by_id, skills, skills_by_id, chart, catalog }
    }

    pub fn builtin() -> Arc<DataRegistry> {
        Arc::new(Self::from_parts(
            builtin_species(),
            builtin_skills().iter().map(|r| r.to_definition()).collect(),
            Arc::new(TypeChart::builtin()),
            Arc::new(EffectCatalog::builtin()),
        ))
    }

    pub fn species(&self) -> &[SpeciesRecord] {
        &self.species
    }

    pub fn skills(&self) -> &[SkillDefinition] {
        &self.skills
    }

    pub fn chart(&self) -> Arc<TypeChart> {
        Arc::clone(&self.chart)
    }

    pub fn catalog(&self) -> Arc<EffectCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn species_by_id(&self, id: u32) -> Option<&SpeciesRecord> {
        self.species_by_id.get(&id).map(|&i| &self.species[i])
    }

    /// Case-insensitive species resolution by id-as-string or name.
    pub fn resolve_species(&self, name_or_id: &str) -> Option<&SpeciesRecord> {
        if let Ok(id) = name_or_id.parse::<u32>() {
            if let Some(found) = self.species_by_id(id) {
                return Some(found);
            }
        }
        self.species.iter().find(|s| s.name.eq_ignore_ascii_case(name_or_id.trim()))
    }

    pub fn skill_by_id(&self, id: u32) -> Option<&SkillDefinition> {
        self.skills_by_id.get(&id).map(|&i| &self.skills[i])
    }

    /// Build a battle-ready pet from a species and a skill list.
    pub fn build_pet(
        &self,
        pet_id: u64,
        species: &str,
        level: u32,
        iv: u32,
        nature: Nature,
        skill_ids: &[u32],
    ) -> Result<PetState, DataError> {
        let record = self
            .resolve_species(species)
            .ok_or_else(|| DataError::UnknownSpecies(species.to_string()))?;
        let mut skills = Vec::with_capacity(skill_ids.len());
        for &id in skill_ids {
            let skill = self.skill_by_id(id).ok_or(DataError::UnknownSkill(id))?;
            skills.push(skill.clone());
        }
        let stats = calculate_stats(&record.base, iv.min(31), 0, level, nature);
        Ok(PetState::new(pet_id, &record.name, record.id, level, record.types(), stats, skills))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_builds_pets() {
        let registry = DataRegistry::builtin();
        let pet = registry
            .build_pet(1, "Emberling", 50, 31, Nature::NEUTRAL, &[101, 103])
            .unwrap();
        assert_eq!(pet.skills.len(), 2);
        assert_eq!(pet.level, 50);
        assert!(pet.max_hp() > 0);
    }

    #[test]
    fn resolve_species_accepts_id_and_name() {
        let registry = DataRegistry::builtin();
        assert_eq!(registry.resolve_species("1").unwrap().name, "Emberling");
        assert_eq!(registry.resolve_species("emberling").unwrap().id, 1);
        assert!(registry.resolve_species("nonexistent").is_none());
    }

    #[test]
    fn unknown_references_error_cleanly() {
        let registry = DataRegistry::builtin();
        assert!(matches!(
            registry.build_pet(1, "ghostpet", 50, 31, Nature::NEUTRAL, &[101]),
            Err(DataError::UnknownSpecies(_))
        ));
        assert!(matches!(
            registry.build_pet(1, "Emberling", 50, 31, Nature::NEUTRAL, &[9999]),
            Err(DataError::UnknownSkill(9999))
        ));
    }
}
