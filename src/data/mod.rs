//! Data layer: species and skill records, the startup registry, the
//! validation pass, and the pet record store seam.

pub mod registry;
pub mod skill;
pub mod species;
pub mod store;
pub mod validate;

use thiserror::Error;

pub use registry::{DataRegistry, DEFAULT_EFFECTS_OVERLAY_PATH, DEFAULT_TYPE_CHART_PATH};
pub use skill::{builtin_skills, load_skills, SkillRecord, DEFAULT_SKILLS_PATH};
pub use species::{builtin_species, load_species, SpeciesRecord, DEFAULT_SPECIES_PATH};
pub use store::{assign_ability, MemoryPetStore, OwnerRecord, PetRecord, PetStore};
pub use validate::{
    validate_dataset, validate_skills, validate_species, ValidationDiagnostic, ValidationReport,
    ValidationSeverity,
};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("unknown skill id {0}")]
    UnknownSkill(u32),
    #[error("store failure: {0}")]
    Store(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}
