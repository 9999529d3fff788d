use menagerie::battle::{
    apply_stage_modifier, calculate_accuracy, calculate_stats, compute_damage_with_variance,
    crit_rate, element, first_mover, BaseStats, Nature, PetState, Rng, SkillCategory,
    SkillDefinition, StatKind, TypeChart, TypeId,
};

fn pet_with(base: BaseStats, level: u32, types: (TypeId, Option<TypeId>)) -> PetState {
    let stats = calculate_stats(&base, 31, 0, level, Nature::NEUTRAL);
    PetState::new(1, "test pet", 1, level, types, stats, Vec::new())
}

#[test]
fn golden_stats_at_level_100() {
    let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 100, Nature::NEUTRAL);
    assert_eq!(stats.hp, 341);
    for stat in [
        StatKind::Attack,
        StatKind::Defense,
        StatKind::SpAttack,
        StatKind::SpDefense,
        StatKind::Speed,
    ] {
        assert_eq!(stats.get(stat), 236);
    }
}

#[test]
fn stats_monotonic_over_full_level_and_iv_ranges() {
    let base = BaseStats::uniform(85);
    for iv in [0, 15, 31] {
        let mut prior = calculate_stats(&base, iv, 0, 1, Nature::NEUTRAL);
        for level in 2..=100 {
            let next = calculate_stats(&base, iv, 0, level, Nature::NEUTRAL);
            for stat in StatKind::ALL {
                assert!(
                    next.get(stat) >= prior.get(stat),
                    "stat {stat:?} decreased from level {} to {level} at iv {iv}",
                    level - 1
                );
            }
            prior = next;
        }
    }
    for level in [10, 50, 100] {
        let mut prior = calculate_stats(&base, 0, 0, level, Nature::NEUTRAL);
        for iv in 1..=31 {
            let next = calculate_stats(&base, iv, 0, level, Nature::NEUTRAL);
            for stat in StatKind::ALL {
                assert!(next.get(stat) >= prior.get(stat));
            }
            prior = next;
        }
    }
}

#[test]
fn level_clamps_to_the_playable_range() {
    let base = BaseStats::uniform(77);
    assert_eq!(
        calculate_stats(&base, 20, 0, 0, Nature::NEUTRAL),
        calculate_stats(&base, 20, 0, 1, Nature::NEUTRAL)
    );
    assert_eq!(
        calculate_stats(&base, 20, 0, 200, Nature::NEUTRAL),
        calculate_stats(&base, 20, 0, 100, Nature::NEUTRAL)
    );
}

#[test]
fn stage_modifier_golden_table() {
    assert_eq!(apply_stage_modifier(100, 1), 150);
    assert_eq!(apply_stage_modifier(100, 2), 200);
    assert_eq!(apply_stage_modifier(100, -1), 66);
    assert_eq!(apply_stage_modifier(100, -2), 50);
    assert_eq!(apply_stage_modifier(100, 7), apply_stage_modifier(100, 6));
    assert_eq!(apply_stage_modifier(100, -7), apply_stage_modifier(100, -6));
}

#[test]
fn crit_rate_curve_and_clamp() {
    assert_eq!(crit_rate(0), 6.25);
    assert_eq!(crit_rate(1), 12.5);
    assert_eq!(crit_rate(2), 18.75);
    assert_eq!(crit_rate(4), 31.25);
    assert_eq!(crit_rate(200), 100.0);
}

#[test]
fn accuracy_golden_and_always_bounded() {
    assert_eq!(calculate_accuracy(50.0, 1, -1), 100.0);
    for base in [0.0, 25.0, 50.0, 75.0, 100.0] {
        for acc in -6..=6 {
            for eva in -6..=6 {
                let value = calculate_accuracy(base, acc, eva);
                assert!((0.0..=100.0).contains(&value));
            }
        }
    }
}

#[test]
fn type_effectiveness_is_pure_and_total() {
    let chart = TypeChart::builtin();
    let allowed = [0.0, 0.5, 1.0, 2.0];
    for attacker in 1..=30u16 {
        for defender in 1..=30u16 {
            let value = chart.effectiveness(TypeId(attacker), TypeId(defender));
            assert!(
                allowed.contains(&value),
                "unexpected single-type multiplier {value} for {attacker}->{defender}"
            );
            // Same inputs, same output.
            assert_eq!(value, chart.effectiveness(TypeId(attacker), TypeId(defender)));
        }
    }
    assert_eq!(chart.effectiveness(TypeId(4000), TypeId(2)), 1.0);
}

#[test]
fn dual_lookups_average_and_compose() {
    let chart = TypeChart::builtin();
    assert_eq!(chart.effectiveness_vs(element::FIRE, (element::GRASS, Some(element::WATER))), 1.25);
    assert_eq!(
        chart.effectiveness_vs(element::FIGHTING, (element::FLYING, Some(element::GHOST))),
        0.25
    );
    assert_eq!(
        chart.dual_effectiveness((element::FIRE, Some(element::FIRE)), (element::GRASS, Some(element::BUG))),
        4.0
    );
    // Degrades to the single forms.
    assert_eq!(
        chart.dual_effectiveness((element::FIRE, None), (element::GRASS, None)),
        chart.effectiveness(element::FIRE, element::GRASS)
    );
}

#[test]
fn status_skills_always_deal_zero() {
    let chart = TypeChart::builtin();
    let attacker = pet_with(BaseStats::uniform(120), 80, (element::FIRE, None));
    let defender = pet_with(BaseStats::uniform(60), 80, (element::GRASS, None));
    let mut skill = SkillDefinition::plain_attack(1, "Howl", element::FIRE, 0);
    skill.category = SkillCategory::Status;
    let out = compute_damage_with_variance(&attacker, &defender, &skill, &chart, true, 2.0, 1.0);
    assert_eq!(out.final_damage, 0);
}

#[test]
fn zero_power_offense_never_goes_negative() {
    let chart = TypeChart::builtin();
    let attacker = pet_with(BaseStats::uniform(10), 5, (element::NORMAL, None));
    let defender = pet_with(BaseStats::uniform(200), 100, (element::NORMAL, None));
    let skill = SkillDefinition::plain_attack(1, "Feint", element::NORMAL, 0);
    let out = compute_damage_with_variance(&attacker, &defender, &skill, &chart, false, 1.0, 0.85);
    assert_eq!(out.final_damage, 0);
}

#[test]
fn offensive_floor_of_one_holds_under_variance() {
    let chart = TypeChart::builtin();
    let mut attacker = pet_with(BaseStats::uniform(1), 1, (element::NORMAL, None));
    attacker.stats.attack = 1;
    let mut defender = pet_with(BaseStats::uniform(200), 100, (element::NORMAL, None));
    defender.stats.defense = 50_000;
    let skill = SkillDefinition::plain_attack(1, "Poke", element::NORMAL, 1);
    for variance in [0.85, 0.9, 1.0] {
        let out =
            compute_damage_with_variance(&attacker, &defender, &skill, &chart, false, 1.0, variance);
        assert_eq!(out.final_damage, 1);
    }
}

#[test]
fn zero_defense_inflates_rather_than_panics() {
    let chart = TypeChart::builtin();
    let attacker = pet_with(BaseStats::uniform(100), 50, (element::NORMAL, None));
    let mut defender = pet_with(BaseStats::uniform(100), 50, (element::NORMAL, None));
    defender.stats.defense = 0;
    let skill = SkillDefinition::plain_attack(1, "Slam", element::NORMAL, 80);
    let out = compute_damage_with_variance(&attacker, &defender, &skill, &chart, false, 1.0, 1.0);
    assert!(out.final_damage > 1000, "expected inflated damage, got {}", out.final_damage);
}

#[test]
fn stab_applies_for_either_attacker_type() {
    let chart = TypeChart::builtin();
    let defender = pet_with(BaseStats::uniform(100), 50, (element::NORMAL, None));
    let skill = SkillDefinition::plain_attack(1, "Surge", element::WATER, 80);

    let primary = pet_with(BaseStats::uniform(100), 50, (element::WATER, None));
    let secondary = pet_with(BaseStats::uniform(100), 50, (element::FIRE, Some(element::WATER)));
    let neither = pet_with(BaseStats::uniform(100), 50, (element::FIRE, None));

    let with_primary = compute_damage_with_variance(&primary, &defender, &skill, &chart, false, 1.0, 1.0);
    let with_secondary =
        compute_damage_with_variance(&secondary, &defender, &skill, &chart, false, 1.0, 1.0);
    let without = compute_damage_with_variance(&neither, &defender, &skill, &chart, false, 1.0, 1.0);

    assert_eq!(with_primary.stab, 1.5);
    assert_eq!(with_secondary.stab, 1.5);
    assert_eq!(without.stab, 1.0);
    assert_eq!(with_primary.final_damage, with_secondary.final_damage);
    assert!(with_primary.final_damage > without.final_damage);
}

#[test]
fn first_mover_priority_speed_and_fair_tiebreak() {
    let mut rng = Rng::new(3);
    assert_eq!(first_mover(2, 1, 0, 999, &mut rng), 0);
    assert_eq!(first_mover(0, 999, 2, 1, &mut rng), 1);
    assert_eq!(first_mover(0, 200, 0, 100, &mut rng), 0);
    assert_eq!(first_mover(0, 100, 0, 200, &mut rng), 1);

    let mut outcomes = [0u32; 2];
    for _ in 0..2000 {
        outcomes[first_mover(0, 150, 0, 150, &mut rng)] += 1;
    }
    assert!(outcomes[0] > 700 && outcomes[1] > 700, "coin flip is biased: {outcomes:?}");
}
