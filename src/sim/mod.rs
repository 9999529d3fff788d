//! Batch matchup simulation: run many seeded AI-vs-AI battles between two
//! pet builds in parallel and summarize win rates. Each battle instance is
//! fully independent; rayon only fans out whole battles, never the inside of
//! one.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battle::ai::{choose_skill, AiConfig};
use crate::battle::rng::Rng;
use crate::battle::stats::Nature;
use crate::battle::turn::{Battle, TurnAction};
use crate::data::{DataError, DataRegistry};

/// Safety cap so degenerate stall matchups terminate.
pub const MAX_TURNS: u32 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct MatchupSpec {
    pub species_a: String,
    pub skills_a: Vec<u32>,
    pub species_b: String,
    pub skills_b: Vec<u32>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_sims")]
    pub sims: u32,
    #[serde(default)]
    pub seed: u64,
}

fn default_level() -> u32 {
    50
}

fn default_sims() -> u32 {
    1000
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MatchupSummary {
    pub battles: u32,
    pub wins_a: u32,
    pub wins_b: u32,
    pub draws: u32,
    pub win_rate_a: f64,
    pub avg_turns: f64,
    pub avg_hp_ratio_a: f64,
    pub avg_hp_ratio_b: f64,
}

#[derive(Debug, Clone, Copy)]
struct SingleOutcome {
    winner: Option<usize>,
    turns: u32,
    hp_ratio_a: f64,
    hp_ratio_b: f64,
}

fn run_single(registry: &DataRegistry, spec: &MatchupSpec, seed: u64) -> Result<SingleOutcome, DataError> {
    let pet_a = registry.build_pet(1, &spec.species_a, spec.level, 31, Nature::NEUTRAL, &spec.skills_a)?;
    let pet_b = registry.build_pet(2, &spec.species_b, spec.level, 31, Nature::NEUTRAL, &spec.skills_b)?;
    let mut battle = Battle::new([pet_a, pet_b], registry.catalog(), registry.chart(), seed);
    let mut ai_rng = Rng::new(seed ^ 0xa5a5_5a5a_dead_beef);

    while !battle.over && battle.turn < MAX_TURNS {
        let mut actions = [TurnAction::Pass, TurnAction::Pass];
        for side in 0..2 {
            let decision = choose_skill(
                battle.catalog(),
                battle.chart(),
                &battle.pets[side],
                &battle.pets[1 - side],
                battle.last_skill[side],
                AiConfig::default(),
                &mut ai_rng,
            );
            if let Some(decision) = decision {
                actions[side] = TurnAction::UseSkill(decision.slot);
            }
        }
        battle.run_turn(actions);
    }

    Ok(SingleOutcome {
        winner: battle.winner,
        turns: battle.turn,
        hp_ratio_a: battle.pets[0].hp_ratio(),
        hp_ratio_b: battle.pets[1].hp_ratio(),
    })
}

/// Run the full matchup batch across the thread pool.
pub fn run_matchup(registry: &DataRegistry, spec: &MatchupSpec) -> Result<MatchupSummary, DataError> {
    // Fail fast on bad references before fanning out.
    registry
        .resolve_species(&spec.species_a)
        .ok_or_else(|| DataError::UnknownSpecies(spec.species_a.clone()))?;
    registry
        .resolve_species(&spec.species_b)
        .ok_or_else(|| DataError::UnknownSpecies(spec.species_b.clone()))?;

    let sims = spec.sims.max(1);
    let outcomes: Vec<SingleOutcome> = (0..sims)
        .into_par_iter()
        .filter_map(|index| {
            // Independent, well-spread per-battle seed.
            let seed = Rng::new(spec.seed.wrapping_add(index as u64)).next_u64();
            run_single(registry, spec, seed).ok()
        })
        .collect();

    let battles = outcomes.len() as u32;
    let mut summary = MatchupSummary { battles, ..MatchupSummary::default() };
    if battles == 0 {
        return Ok(summary);
    }
    for outcome in &outcomes {
        match outcome.winner {
            Some(0) => summary.wins_a += 1,
            Some(1) => summary.wins_b += 1,
            _ => summary.draws += 1,
        }
        summary.avg_turns += outcome.turns as f64;
        summary.avg_hp_ratio_a += outcome.hp_ratio_a;
        summary.avg_hp_ratio_b += outcome.hp_ratio_b;
    }
    summary.win_rate_a = summary.wins_a as f64 / battles as f64;
    summary.avg_turns /= battles as f64;
    summary.avg_hp_ratio_a /= battles as f64;
    summary.avg_hp_ratio_b /= battles as f64;

    info!(
        battles,
        win_rate_a = summary.win_rate_a,
        avg_turns = summary.avg_turns,
        "matchup complete"
    );
    Ok(summary)
}
