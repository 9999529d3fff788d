//! Heuristic skill selection for non-player combatants: a battle-context
//! summary feeds an ordered rule list evaluated top to bottom, first match
//! wins per skill, and every score receives a multiplicative jitter so
//! identical situations do not always repeat the identical choice.

use tracing::debug;

use crate::battle::rng::Rng;
use crate::battle::state::{PetState, SkillDefinition, StatusKind};
use crate::battle::type_chart::TypeChart;
use crate::effects::trigger::decode_atoms;
use crate::effects::{AtomKind, EffectCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    Early,
    Mid,
    End,
}

/// Coarse summary the rules consume instead of raw state.
#[derive(Debug, Clone, Copy)]
pub struct ContextSummary {
    pub own_hp_ratio: f64,
    pub foe_hp_ratio: f64,
    pub own_has_positive_stage: bool,
    pub foe_has_positive_stage: bool,
    pub foe_has_negative_stage: bool,
    pub own_has_status: bool,
    pub foe_has_status: bool,
    pub phase: BattlePhase,
}

impl ContextSummary {
    pub fn build(own: &PetState, foe: &PetState) -> ContextSummary {
        let own_hp_ratio = own.hp_ratio();
        let foe_hp_ratio = foe.hp_ratio();
        let phase = if own_hp_ratio > 0.7 && foe_hp_ratio > 0.7 {
            BattlePhase::Early
        } else if own_hp_ratio > 0.3 && foe_hp_ratio > 0.3 {
            BattlePhase::Mid
        } else {
            BattlePhase::End
        };
        ContextSummary {
            own_hp_ratio,
            foe_hp_ratio,
            own_has_positive_stage: own.has_positive_stage(),
            foe_has_positive_stage: foe.has_positive_stage(),
            foe_has_negative_stage: foe.has_negative_stage(),
            own_has_status: own.active_status().is_some(),
            foe_has_status: foe.active_status().is_some(),
            phase,
        }
    }
}

/// Traits of one candidate skill, derived from its side-effect encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillTraits {
    pub heal_fraction: f64,
    pub is_hard_control: bool,
    pub is_ailment: bool,
    pub is_buff: bool,
    pub is_debuff: bool,
}

pub fn classify_skill(catalog: &EffectCatalog, skill: &SkillDefinition) -> SkillTraits {
    let mut traits = SkillTraits::default();
    for (atom, args) in decode_atoms(catalog, skill) {
        match atom {
            AtomKind::FixedHeal => traits.heal_fraction += 0.2,
            AtomKind::MaxHpPercentHeal => {
                traits.heal_fraction += args.first().copied().unwrap_or(0.0) / 100.0
            }
            AtomKind::Regeneration => {
                traits.heal_fraction += args.get(1).copied().unwrap_or(0.0) / 100.0
            }
            AtomKind::Drain => traits.heal_fraction += 0.1,
            AtomKind::InflictStatus | AtomKind::CumulativeStatus => {
                traits.is_ailment = true;
                let slot = args.first().copied().unwrap_or(-1.0);
                if slot >= 0.0 {
                    if let Some(status) = StatusKind::from_slot(slot as usize) {
                        traits.is_hard_control |= status.is_hard_control();
                    }
                }
            }
            AtomKind::RandomStatus => traits.is_ailment = true,
            AtomKind::Flinch => {
                traits.is_ailment = true;
                traits.is_hard_control = true;
            }
            AtomKind::StatChange | AtomKind::CumulativeStatChange => {
                let delta_index = if atom == AtomKind::StatChange { 2 } else { 1 };
                let delta = args.get(delta_index).copied().unwrap_or(0.0);
                if delta > 0.0 {
                    traits.is_buff = true;
                } else if delta < 0.0 {
                    traits.is_debuff = true;
                }
            }
            AtomKind::AllStatsChange | AtomKind::RandomStatChange => {
                let delta = args.get(1).copied().unwrap_or(0.0);
                if delta > 0.0 {
                    traits.is_buff = true;
                } else if delta < 0.0 {
                    traits.is_debuff = true;
                }
            }
            AtomKind::TempStatBoost
            | AtomKind::PercentBoost
            | AtomKind::Shield
            | AtomKind::PercentReduction
            | AtomKind::FlatReduction
            | AtomKind::CritGuard => traits.is_buff = true,
            _ => {}
        }
    }
    traits
}

/// Everything one rule may look at for one candidate skill.
pub struct RuleInput<'a> {
    pub summary: ContextSummary,
    pub skill: &'a SkillDefinition,
    pub traits: SkillTraits,
    pub effectiveness: f64,
    /// Skill id the AI used on the previous turn, for combo detection.
    pub last_skill: Option<u32>,
}

pub struct ScoreRule {
    pub name: &'static str,
    pub apply: fn(&RuleInput<'_>) -> Option<f64>,
}

/// The cascade, most urgent first. The first rule returning a score wins for
/// that skill; the offensive formula and the flat fallback close the list.
pub const RULES: &[ScoreRule] = &[
    ScoreRule {
        name: "critical_heal",
        apply: |input| {
            if input.summary.own_hp_ratio >= 0.25 {
                return None;
            }
            if input.traits.heal_fraction > 0.0 {
                Some(1000.0 + input.traits.heal_fraction * 200.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        name: "last_stand",
        apply: |input| {
            if input.summary.own_hp_ratio >= 0.25 {
                return None;
            }
            if input.skill.category.is_offensive() && input.skill.power >= 80 {
                Some(800.0 + input.skill.power as f64)
            } else {
                None
            }
        },
    },
    ScoreRule {
        name: "hard_control",
        apply: |input| {
            if input.traits.is_hard_control && !input.summary.foe_has_status {
                Some(700.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        name: "early_buff",
        apply: |input| {
            if input.summary.phase == BattlePhase::Early
                && input.traits.is_buff
                && !input.summary.own_has_positive_stage
            {
                Some(500.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        name: "early_debuff",
        apply: |input| {
            if input.summary.foe_hp_ratio > 0.6
                && input.traits.is_debuff
                && !input.summary.foe_has_negative_stage
            {
                Some(400.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        name: "ailment",
        apply: |input| {
            if input.traits.is_ailment && !input.summary.foe_has_status {
                // Worth more while the opponent is healthy.
                Some(250.0 + 150.0 * input.summary.foe_hp_ratio)
            } else {
                None
            }
        },
    },
    ScoreRule {
        name: "moderate_heal",
        apply: |input| {
            if input.summary.own_hp_ratio < 0.5 && input.traits.heal_fraction >= 0.2 {
                Some(350.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        name: "offensive",
        apply: |input| {
            if !input.skill.category.is_offensive() || input.skill.power <= 0 {
                return None;
            }
            let mut score = input.skill.power as f64
                * input.effectiveness
                * (input.skill.accuracy / 100.0);
            if input.skill.priority > 0 || input.skill.always_hits {
                score *= 1.1;
            }
            match input.summary.phase {
                BattlePhase::End => {
                    score *= if input.summary.foe_hp_ratio < 0.25 { 2.0 } else { 1.3 };
                }
                BattlePhase::Mid => score *= 1.15,
                BattlePhase::Early => {}
            }
            if input.effectiveness >= 2.0 {
                score *= 1.25;
            } else if input.effectiveness <= 0.5 {
                score *= 0.75;
            }
            if input.last_skill == Some(input.skill.id) {
                score *= 1.2;
            }
            if input.summary.foe_has_positive_stage && input.skill.power >= 90 {
                score *= 1.3;
            }
            Some(score)
        },
    },
    ScoreRule {
        name: "fallback",
        apply: |input| {
            let mut score = 60.0;
            if input.traits.is_buff && input.summary.own_has_positive_stage {
                score = 30.0;
            }
            if input.traits.is_debuff && input.summary.foe_has_negative_stage {
                score = 30.0;
            }
            Some(score)
        },
    },
];

#[derive(Debug, Clone, Copy)]
pub struct AiConfig {
    /// Jitter spread applied multiplicatively to every score.
    pub jitter: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig { jitter: 0.15 }
    }
}

#[derive(Debug, Clone)]
pub struct SkillScore {
    pub slot: usize,
    pub skill_id: u32,
    pub rule: &'static str,
    pub base_score: f64,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct AiDecision {
    pub slot: usize,
    pub scores: Vec<SkillScore>,
}

/// Score one skill without jitter. Exposed for deterministic tests.
pub fn score_skill(
    catalog: &EffectCatalog,
    chart: &TypeChart,
    own: &PetState,
    foe: &PetState,
    skill: &SkillDefinition,
    last_skill: Option<u32>,
) -> (f64, &'static str) {
    let input = RuleInput {
        summary: ContextSummary::build(own, foe),
        skill,
        traits: classify_skill(catalog, skill),
        effectiveness: chart.effectiveness_vs(skill.element, foe.types),
        last_skill,
    };
    for rule in RULES {
        if let Some(score) = (rule.apply)(&input) {
            return (score, rule.name);
        }
    }
    (0.0, "none")
}

/// Pick the highest post-jitter score among the usable skills. Returns None
/// when no skill has PP left.
pub fn choose_skill(
    catalog: &EffectCatalog,
    chart: &TypeChart,
    own: &PetState,
    foe: &PetState,
    last_skill: Option<u32>,
    config: AiConfig,
    rng: &mut Rng,
) -> Option<AiDecision> {
    let usable = own.usable_skills();
    if usable.is_empty() {
        return None;
    }

    let mut scores = Vec::with_capacity(usable.len());
    for slot in usable {
        let skill = &own.skills[slot].skill;
        let (base_score, rule) = score_skill(catalog, chart, own, foe, skill, last_skill);
        let score = base_score * rng.jitter(config.jitter);
        debug!(slot, skill = %skill.name, rule, base_score, score, "AI scored skill");
        scores.push(SkillScore { slot, skill_id: skill.id, rule, base_score, score });
    }

    let best = scores
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|s| s.slot)?;
    Some(AiDecision { slot: best, scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::SkillCategory;
    use crate::battle::stats::{calculate_stats, BaseStats, Nature};
    use crate::battle::type_chart::element;

    fn pet(name: &str, types: (crate::battle::type_chart::TypeId, Option<crate::battle::type_chart::TypeId>), skills: Vec<SkillDefinition>) -> PetState {
        let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 50, Nature::NEUTRAL);
        PetState::new(1, name, 1, 50, types, stats, skills)
    }

    fn heal_skill() -> SkillDefinition {
        let mut skill = SkillDefinition::plain_attack(21, "Soothing Light", element::LIGHT, 0);
        skill.category = SkillCategory::Status;
        skill.side_effects = vec![12];
        skill.effect_args = vec![50.0];
        skill
    }

    fn nuke_skill() -> SkillDefinition {
        SkillDefinition::plain_attack(22, "Mega Slam", element::NORMAL, 120)
    }

    fn sleep_skill() -> SkillDefinition {
        let mut skill = SkillDefinition::plain_attack(23, "Dream Mist", element::PSYCHIC, 0);
        skill.category = SkillCategory::Status;
        skill.side_effects = vec![30];
        skill.effect_args = vec![StatusKind::Sleep.slot() as f64, 90.0, 3.0];
        skill
    }

    #[test]
    fn classification_reads_the_encoding() {
        let catalog = EffectCatalog::builtin();
        let heal = classify_skill(&catalog, &heal_skill());
        assert_eq!(heal.heal_fraction, 0.5);
        let sleep = classify_skill(&catalog, &sleep_skill());
        assert!(sleep.is_ailment);
        assert!(sleep.is_hard_control);
    }

    #[test]
    fn phase_classification_thresholds() {
        let a = pet("a", (element::NORMAL, None), vec![]);
        let b = pet("b", (element::NORMAL, None), vec![]);
        assert_eq!(ContextSummary::build(&a, &b).phase, BattlePhase::Early);

        let mut hurt = pet("hurt", (element::NORMAL, None), vec![]);
        hurt.current_hp = hurt.max_hp() / 2;
        assert_eq!(ContextSummary::build(&hurt, &b).phase, BattlePhase::Mid);

        hurt.current_hp = hurt.max_hp() / 5;
        assert_eq!(ContextSummary::build(&hurt, &b).phase, BattlePhase::End);
    }

    #[test]
    fn wounded_ai_prefers_healing_without_jitter() {
        let catalog = EffectCatalog::builtin();
        let chart = TypeChart::builtin();
        let mut own = pet("wounded", (element::NORMAL, None), vec![heal_skill(), nuke_skill()]);
        own.current_hp = own.max_hp() / 10;
        let foe = pet("foe", (element::NORMAL, None), vec![nuke_skill()]);

        let (heal_score, heal_rule) =
            score_skill(&catalog, &chart, &own, &foe, &own.skills[0].skill, None);
        let (nuke_score, _) =
            score_skill(&catalog, &chart, &own, &foe, &own.skills[1].skill, None);
        assert_eq!(heal_rule, "critical_heal");
        assert!(heal_score > nuke_score);
    }

    #[test]
    fn wounded_ai_heals_in_a_dominant_share_of_jittered_trials() {
        let catalog = EffectCatalog::builtin();
        let chart = TypeChart::builtin();
        let mut own = pet("wounded", (element::NORMAL, None), vec![heal_skill(), nuke_skill()]);
        own.current_hp = own.max_hp() / 10;
        let foe = pet("foe", (element::NORMAL, None), vec![nuke_skill()]);

        let mut rng = Rng::new(99);
        let mut heal_picks = 0;
        for _ in 0..200 {
            let decision =
                choose_skill(&catalog, &chart, &own, &foe, None, AiConfig::default(), &mut rng)
                    .unwrap();
            if decision.slot == 0 {
                heal_picks += 1;
            }
        }
        // The last-stand rule keeps the nuke competitive, so jitter lets it
        // through occasionally; healing must still dominate.
        assert!(heal_picks > 160, "healing won only {heal_picks}/200 trials");
    }

    #[test]
    fn hard_control_wins_against_status_free_foe() {
        let catalog = EffectCatalog::builtin();
        let chart = TypeChart::builtin();
        let own = pet("controller", (element::PSYCHIC, None), vec![sleep_skill(), nuke_skill()]);
        let foe = pet("foe", (element::NORMAL, None), vec![nuke_skill()]);

        let (sleep_score, rule) =
            score_skill(&catalog, &chart, &own, &foe, &own.skills[0].skill, None);
        assert_eq!(rule, "hard_control");
        let (nuke_score, _) =
            score_skill(&catalog, &chart, &own, &foe, &own.skills[1].skill, None);
        assert!(sleep_score > nuke_score);

        // Once the foe has a status, control loses its urgency.
        let mut statused = pet("foe", (element::NORMAL, None), vec![nuke_skill()]);
        statused.set_status(StatusKind::Burn, 3);
        let (_, rule_after) =
            score_skill(&catalog, &chart, &own, &statused, &own.skills[0].skill, None);
        assert_ne!(rule_after, "hard_control");
    }

    #[test]
    fn effectiveness_drives_offensive_choice() {
        let catalog = EffectCatalog::builtin();
        let chart = TypeChart::builtin();
        let mut ember = SkillDefinition::plain_attack(31, "Ember", element::FIRE, 80);
        ember.element = element::FIRE;
        let splash = SkillDefinition::plain_attack(32, "Splash", element::WATER, 80);
        let own = pet("attacker", (element::FIRE, None), vec![ember, splash]);
        let foe = pet("grass foe", (element::GRASS, None), vec![nuke_skill()]);

        let (fire_score, _) =
            score_skill(&catalog, &chart, &own, &foe, &own.skills[0].skill, None);
        let (water_score, _) =
            score_skill(&catalog, &chart, &own, &foe, &own.skills[1].skill, None);
        assert!(fire_score > water_score);
    }

    #[test]
    fn combo_multiplier_rewards_repeats() {
        let catalog = EffectCatalog::builtin();
        let chart = TypeChart::builtin();
        let own = pet("combo", (element::NORMAL, None), vec![nuke_skill()]);
        let foe = pet("foe", (element::NORMAL, None), vec![nuke_skill()]);
        let (fresh, _) = score_skill(&catalog, &chart, &own, &foe, &own.skills[0].skill, None);
        let (chained, _) =
            score_skill(&catalog, &chart, &own, &foe, &own.skills[0].skill, Some(22));
        assert!(chained > fresh);
    }

    #[test]
    fn no_pp_means_no_decision() {
        let catalog = EffectCatalog::builtin();
        let chart = TypeChart::builtin();
        let mut own = pet("dry", (element::NORMAL, None), vec![nuke_skill()]);
        own.skills[0].pp = 0;
        let foe = pet("foe", (element::NORMAL, None), vec![nuke_skill()]);
        let mut rng = Rng::new(4);
        assert!(choose_skill(&catalog, &chart, &own, &foe, None, AiConfig::default(), &mut rng)
            .is_none());
    }
}
