//! Timing vocabulary for effect dispatch: fixed, totally ordered points within
//! one attack resolution and one battle turn, plus reactive hooks fired by the
//! orchestrator when the matching situation occurs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    BattleStart,
    TurnStart,
    BeforeSkill,
    BeforeSpeedCheck,
    BeforeHitCheck,
    HitCheck,
    AfterHitCheck,
    BeforeCritCheck,
    CritCheck,
    BeforeDamageCalc,
    AfterDamageCalc,
    BeforeDamageApply,
    AfterDamageApply,
    AfterSkill,
    OnKo,
    TurnEnd,
    BattleEnd,
    // Reactive hooks.
    OnHpChange,
    OnAttack,
    OnAttacked,
    OnReceiveDamage,
    OnEvade,
}

impl Timing {
    pub const ALL: [Timing; 22] = [
        Timing::BattleStart,
        Timing::TurnStart,
        Timing::BeforeSkill,
        Timing::BeforeSpeedCheck,
        Timing::BeforeHitCheck,
        Timing::HitCheck,
        Timing::AfterHitCheck,
        Timing::BeforeCritCheck,
        Timing::CritCheck,
        Timing::BeforeDamageCalc,
        Timing::AfterDamageCalc,
        Timing::BeforeDamageApply,
        Timing::AfterDamageApply,
        Timing::AfterSkill,
        Timing::OnKo,
        Timing::TurnEnd,
        Timing::BattleEnd,
        Timing::OnHpChange,
        Timing::OnAttack,
        Timing::OnAttacked,
        Timing::OnReceiveDamage,
        Timing::OnEvade,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Timing::BattleStart => "battle_start",
            Timing::TurnStart => "turn_start",
            Timing::BeforeSkill => "before_skill",
            Timing::BeforeSpeedCheck => "before_speed_check",
            Timing::BeforeHitCheck => "before_hit_check",
            Timing::HitCheck => "hit_check",
            Timing::AfterHitCheck => "after_hit_check",
            Timing::BeforeCritCheck => "before_crit_check",
            Timing::CritCheck => "crit_check",
            Timing::BeforeDamageCalc => "before_damage_calc",
            Timing::AfterDamageCalc => "after_damage_calc",
            Timing::BeforeDamageApply => "before_damage_apply",
            Timing::AfterDamageApply => "after_damage_apply",
            Timing::AfterSkill => "after_skill",
            Timing::OnKo => "on_ko",
            Timing::TurnEnd => "turn_end",
            Timing::BattleEnd => "battle_end",
            Timing::OnHpChange => "on_hp_change",
            Timing::OnAttack => "on_attack",
            Timing::OnAttacked => "on_attacked",
            Timing::OnReceiveDamage => "on_receive_damage",
            Timing::OnEvade => "on_evade",
        }
    }

    /// Parse the snake_case name used in effect catalog files.
    pub fn parse(name: &str) -> Option<Timing> {
        Timing::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for timing in Timing::ALL {
            assert_eq!(Timing::parse(timing.as_str()), Some(timing));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Timing::parse("mid_flight"), None);
    }
}
