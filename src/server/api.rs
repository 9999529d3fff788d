//! Request/response payloads for the battle API, plus the pure builders the
//! handlers delegate to. Keeping these free of axum types lets tests call
//! them directly.

use serde::{Deserialize, Serialize};

use crate::battle::events::BattleEvent;
use crate::battle::state::PetState;
use crate::battle::stats::Nature;
use crate::battle::turn::TurnReport;
use crate::data::{DataError, DataRegistry};

pub const MAX_SKILLS_PER_PET: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct PetSpec {
    pub species: String,
    #[serde(default = "default_level")]
    pub level: u32,
    pub skills: Vec<u32>,
    #[serde(default = "default_iv")]
    pub iv: u32,
}

fn default_level() -> u32 {
    50
}

fn default_iv() -> u32 {
    31
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBattleRequest {
    pub player: PetSpec,
    pub opponent: PetSpec,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UseSkillRequest {
    pub slot: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UseItemRequest {
    pub item: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignAbilityRequest {
    pub owner_id: u64,
    pub captured_at: i64,
    pub ability: String,
}

/// Public view of one combatant; no internals like counters or persistent
/// effect state leak through the API.
#[derive(Debug, Clone, Serialize)]
pub struct PetView {
    pub name: String,
    pub species_id: u32,
    pub level: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub status: Option<String>,
    pub stages: [i8; 6],
    pub skills: Vec<SkillView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillView {
    pub id: u32,
    pub name: String,
    pub pp: u8,
    pub max_pp: u8,
}

impl PetView {
    pub fn from_state(pet: &PetState) -> PetView {
        PetView {
            name: pet.name.clone(),
            species_id: pet.species_id,
            level: pet.level,
            hp: pet.current_hp,
            max_hp: pet.max_hp(),
            status: pet.active_status().map(|s| s.as_str().to_string()),
            stages: pet.stages,
            skills: pet
                .skills
                .iter()
                .map(|learned| SkillView {
                    id: learned.skill.id,
                    name: learned.skill.name.clone(),
                    pp: learned.pp,
                    max_pp: learned.skill.max_pp,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleView {
    pub battle_id: String,
    pub turn: u32,
    pub over: bool,
    pub winner: Option<usize>,
    pub pets: Vec<PetView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub battle: BattleView,
    pub order: [usize; 2],
    pub events: Vec<BattleEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command: &'static str,
    pub success: bool,
    pub chance: Option<f64>,
    pub message: String,
    pub events: Vec<BattleEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> ErrorResponse {
        ErrorResponse { status: "error", message: message.into() }
    }
}

pub fn health_payload() -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "service": "menagerie-api",
        "version": env!("CARGO_PKG_VERSION"),
    })
}

pub fn species_payload(registry: &DataRegistry) -> serde_json::Value {
    serde_json::json!(registry.species())
}

pub fn skills_payload(registry: &DataRegistry) -> serde_json::Value {
    serde_json::json!(registry.skills())
}

/// Validate a pet spec and build the battle-ready state.
pub fn build_pet_from_spec(
    registry: &DataRegistry,
    pet_id: u64,
    spec: &PetSpec,
) -> Result<PetState, DataError> {
    if spec.skills.is_empty() || spec.skills.len() > MAX_SKILLS_PER_PET {
        return Err(DataError::Store(format!(
            "a pet carries between 1 and {MAX_SKILLS_PER_PET} skills"
        )));
    }
    registry.build_pet(pet_id, &spec.species, spec.level, spec.iv, Nature::NEUTRAL, &spec.skills)
}

pub fn battle_view(battle: &crate::battle::turn::Battle) -> BattleView {
    BattleView {
        battle_id: battle.id.to_string(),
        turn: battle.turn,
        over: battle.over,
        winner: battle.winner,
        pets: battle.pets.iter().map(PetView::from_state).collect(),
    }
}

pub fn turn_response(
    battle: &crate::battle::turn::Battle,
    report: TurnReport,
    events: Vec<BattleEvent>,
) -> TurnResponse {
    TurnResponse { battle: battle_view(battle), order: report.order, events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::turn::Battle;

    #[test]
    fn health_payload_names_the_service() {
        let payload = health_payload();
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["service"], "menagerie-api");
    }

    #[test]
    fn pet_spec_validation_limits_skill_count() {
        let registry = DataRegistry::builtin();
        let empty = PetSpec { species: "Emberling".into(), level: 50, skills: vec![], iv: 31 };
        assert!(build_pet_from_spec(&registry, 1, &empty).is_err());

        let overloaded =
            PetSpec { species: "Emberling".into(), level: 50, skills: vec![101; 5], iv: 31 };
        assert!(build_pet_from_spec(&registry, 1, &overloaded).is_err());

        let fine =
            PetSpec { species: "Emberling".into(), level: 50, skills: vec![101, 103], iv: 31 };
        assert!(build_pet_from_spec(&registry, 1, &fine).is_ok());
    }

    #[test]
    fn battle_view_hides_internals() {
        let registry = DataRegistry::builtin();
        let spec =
            PetSpec { species: "Emberling".into(), level: 50, skills: vec![101], iv: 31 };
        let a = build_pet_from_spec(&registry, 1, &spec).unwrap();
        let b = build_pet_from_spec(&registry, 2, &spec).unwrap();
        let battle = Battle::new([a, b], registry.catalog(), registry.chart(), 1);
        let view = serde_json::to_value(battle_view(&battle)).unwrap();
        assert!(view["pets"][0].get("counters").is_none());
        assert!(view["pets"][0].get("persistent").is_none());
        assert_eq!(view["pets"][0]["skills"][0]["id"], 101);
    }
}
