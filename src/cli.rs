use std::env;

use crate::battle::ai::{choose_skill, AiConfig};
use crate::battle::export_csv::battle_to_csv;
use crate::battle::rng::Rng;
use crate::battle::turn::{Battle, TurnAction};
use crate::battle::type_chart::element;
use crate::data::{validate_dataset, DataRegistry};
use crate::server;
use crate::sim::{run_matchup, MatchupSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Duel,
    Matchup,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("duel") => Some(Command::Duel),
        Some("matchup") => Some(Command::Matchup),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(),
        Some(Command::Duel) => handle_duel(args),
        Some(Command::Matchup) => handle_matchup(args),
        Some(Command::Validate) => handle_validate(),
        None => {
            eprintln!("usage: menagerie <serve|duel|matchup|validate>");
            2
        }
    }
}

fn handle_serve() -> i32 {
    let bind_addr = env::var("MENAGERIE_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    match server::run_server(&bind_addr) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

/// Demo move kit: one element-matched attack, one generic attack, one utility.
fn demo_kit(registry: &DataRegistry, species: &str) -> Vec<u32> {
    let Some(record) = registry.resolve_species(species) else {
        return vec![101, 102];
    };
    let attack = match crate::battle::type_chart::TypeId(record.primary_type) {
        t if t == element::FIRE => 103,
        t if t == element::WATER => 104,
        t if t == element::GRASS => 105,
        t if t == element::ELECTRIC => 106,
        t if t == element::ROCK || t == element::EARTH => 107,
        t if t == element::ICE => 109,
        t if t == element::WIND => 117,
        t if t == element::DARK || t == element::GHOST => 118,
        t if t == element::LIGHT => 111,
        t if t == element::PSYCHIC => 110,
        _ => 119,
    };
    vec![attack, 101, 113, 111]
}

fn handle_duel(args: &[String]) -> i32 {
    let species_a = args.get(2).map(String::as_str).unwrap_or("Emberling");
    let species_b = args.get(3).map(String::as_str).unwrap_or("Thornpup");
    let seed = parse_u64_arg(args.get(4), "seed", 7);
    let as_csv = args.iter().any(|arg| arg == "--csv");

    let registry = DataRegistry::load();
    let kit_a = demo_kit(&registry, species_a);
    let kit_b = demo_kit(&registry, species_b);
    let pet_a = match registry.build_pet(1, species_a, 50, 31, Default::default(), &kit_a) {
        Ok(pet) => pet,
        Err(err) => {
            eprintln!("duel setup failed: {err}");
            return 1;
        }
    };
    let pet_b = match registry.build_pet(2, species_b, 50, 31, Default::default(), &kit_b) {
        Ok(pet) => pet,
        Err(err) => {
            eprintln!("duel setup failed: {err}");
            return 1;
        }
    };

    let mut battle = Battle::new([pet_a, pet_b], registry.catalog(), registry.chart(), seed);
    let mut ai_rng = Rng::new(seed.wrapping_mul(0x9e37_79b9));
    while !battle.over && battle.turn < crate::sim::MAX_TURNS {
        let mut actions = [TurnAction::Pass, TurnAction::Pass];
        for side in 0..2 {
            if let Some(decision) = choose_skill(
                battle.catalog(),
                battle.chart(),
                &battle.pets[side],
                &battle.pets[1 - side],
                battle.last_skill[side],
                AiConfig::default(),
                &mut ai_rng,
            ) {
                actions[side] = TurnAction::UseSkill(decision.slot);
            }
        }
        battle.run_turn(actions);
    }

    if as_csv {
        match battle_to_csv(&battle) {
            Ok(csv) => println!("{csv}"),
            Err(err) => {
                eprintln!("failed to serialize duel trace: {err}");
                return 1;
            }
        }
    } else {
        for event in &battle.events {
            let side = event.side.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
            println!("[t{:>3} {side}] {:?}: {}", event.turn, event.kind, event.message);
        }
    }
    0
}

fn handle_matchup(args: &[String]) -> i32 {
    let species_a = args.get(2).map(String::as_str).unwrap_or("Emberling");
    let species_b = args.get(3).map(String::as_str).unwrap_or("Tidecub");
    let sims = parse_u32_arg(args.get(4), "sims", 1000);
    let seed = parse_u64_arg(args.get(5), "seed", 0);

    let registry = DataRegistry::load();
    let spec = MatchupSpec {
        species_a: species_a.to_string(),
        skills_a: demo_kit(&registry, species_a),
        species_b: species_b.to_string(),
        skills_b: demo_kit(&registry, species_b),
        level: 50,
        sims,
        seed,
    };

    match run_matchup(&registry, &spec) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(payload) => {
                println!("{payload}");
                0
            }
            Err(err) => {
                eprintln!("failed to serialize matchup result: {err}");
                1
            }
        },
        Err(err) => {
            eprintln!("matchup failed: {err}");
            1
        }
    }
}

fn handle_validate() -> i32 {
    let registry = DataRegistry::load();
    let skills: Vec<crate::data::SkillRecord> = crate::data::load_skills(std::path::Path::new(
        crate::data::DEFAULT_SKILLS_PATH,
    ))
    .unwrap_or_else(crate::data::builtin_skills);
    let report = validate_dataset(registry.species(), &skills, &registry.catalog());
    print!("{}", report.render());
    if report.has_errors() {
        1
    } else {
        0
    }
}

fn parse_u32_arg(raw: Option<&String>, name: &str, default: u32) -> u32 {
    raw.and_then(|value| value.parse::<u32>().ok()).unwrap_or_else(|| {
        if let Some(value) = raw {
            eprintln!("invalid {name} '{value}', defaulting to {default}");
        }
        default
    })
}

fn parse_u64_arg(raw: Option<&String>, name: &str, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok()).unwrap_or_else(|| {
        if let Some(value) = raw {
            eprintln!("invalid {name} '{value}', defaulting to {default}");
        }
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        let args = |cmd: &str| vec!["menagerie".to_string(), cmd.to_string()];
        assert_eq!(parse_command(&args("serve")), Some(Command::Serve));
        assert_eq!(parse_command(&args("duel")), Some(Command::Duel));
        assert_eq!(parse_command(&args("matchup")), Some(Command::Matchup));
        assert_eq!(parse_command(&args("validate")), Some(Command::Validate));
        assert_eq!(parse_command(&args("bogus")), None);
        assert_eq!(parse_command(&["menagerie".to_string()]), None);
    }

    #[test]
    fn demo_kit_matches_primary_element() {
        let registry = DataRegistry::builtin();
        assert_eq!(demo_kit(&registry, "Emberling")[0], 103);
        assert_eq!(demo_kit(&registry, "Tidecub")[0], 104);
        assert_eq!(demo_kit(&registry, "unknown"), vec![101, 102]);
    }
}
