pub mod ai;
pub mod context;
pub mod damage;
pub mod events;
pub mod export_csv;
pub mod rng;
pub mod state;
pub mod stats;
pub mod timing;
pub mod turn;
pub mod type_chart;

pub use ai::{choose_skill, AiConfig, AiDecision, BattlePhase, ContextSummary};
pub use context::{EffectContext, EffectResult, EffectTarget, Outcome};
pub use damage::{compute_damage, compute_damage_with_variance, DamageBreakdown, CRIT_MULTIPLIER};
pub use events::{BattleEvent, EventKind};
pub use export_csv::{battle_to_csv, events_to_csv};
pub use rng::Rng;
pub use state::{
    LearnedSkill, PersistentEffect, PersistentKind, PetState, SkillCategory, SkillDefinition,
    StatusKind, STATUS_SLOTS,
};
pub use stats::{
    apply_stage_modifier, calculate_accuracy, calculate_stat, calculate_stats, crit_rate,
    first_mover, stage_multiplier, BaseStats, Nature, RealizedStats, StatKind, BASE_CRIT_RATE,
    MAX_LEVEL, MAX_STAGE, MIN_LEVEL, MIN_STAGE,
};
pub use timing::Timing;
pub use turn::{Battle, TurnAction, TurnReport};
pub use type_chart::{element, stab_multiplier, TypeChart, TypeId, STAB_MULTIPLIER};
