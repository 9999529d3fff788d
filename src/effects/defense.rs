//! Defensive atoms: in-flight damage caps and floors, reduction/boost auras,
//! shields, the once-per-battle endure, counters, and elemental immunity.

use crate::battle::context::{EffectContext, EffectResult, EffectTarget, Outcome};
use crate::battle::state::{PersistentEffect, PersistentKind};
use crate::battle::timing::Timing;
use crate::battle::type_chart::TypeId;
use crate::effects::{emit, emit_failed, non_negative_arg, turns_arg, EffectError};

pub const FLAT_REDUCTION_KEY: &str = "flat_reduction";
pub const DAMAGE_REDUCTION_KEY: &str = "damage_reduction";
pub const DAMAGE_BOOST_KEY: &str = "damage_boost";
pub const SHIELD_KEY: &str = "shield";
pub const COUNTER_PHYSICAL_KEY: &str = "counter_physical";
pub const COUNTER_SPECIAL_KEY: &str = "counter_special";
pub const ELEMENT_IMMUNITY_KEY: &str = "element_immunity";
pub const ENDURE_USED_KEY: &str = "endure_used";
pub const ENDURE_ACTIVE_KEY: &str = "endure_active";

#[derive(Debug, Clone, PartialEq)]
pub enum DefenseEffect {
    /// Clamp the working damage from above.
    Cap { max: i32 },
    /// Clamp the working damage from below.
    Floor { min: i32 },
    /// Flat reduction aura on incoming damage.
    FlatReduction { amount: f64, turns: i32 },
    /// Percent reduction aura on incoming damage.
    PercentReduction { percent: f64, turns: i32 },
    /// Percent boost aura on outgoing damage.
    PercentBoost { percent: f64, turns: i32 },
    /// Absorbing shield with its own HP pool.
    Shield { amount: f64, turns: i32 },
    /// Survive one lethal hit at 1 HP; once per battle.
    Endure,
    /// Reflect a fraction of physical damage taken.
    CounterPhysical { percent: f64, turns: i32 },
    /// Reflect a fraction of special damage taken.
    CounterSpecial { percent: f64, turns: i32 },
    /// Ignore skills of one element entirely.
    ElementImmunity { element: TypeId, turns: i32 },
}

impl DefenseEffect {
    pub fn cap(args: &[f64]) -> Result<Self, EffectError> {
        let max = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(DefenseEffect::Cap { max: max as i32 })
    }

    pub fn floor(args: &[f64]) -> Result<Self, EffectError> {
        let min = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        Ok(DefenseEffect::Floor { min: min as i32 })
    }

    pub fn flat_reduction(args: &[f64]) -> Result<Self, EffectError> {
        let amount = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let turns = turns_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DefenseEffect::FlatReduction { amount, turns })
    }

    pub fn percent_reduction(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if percent > 100.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: percent });
        }
        let turns = turns_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DefenseEffect::PercentReduction { percent, turns })
    }

    pub fn percent_boost(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let turns = turns_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DefenseEffect::PercentBoost { percent, turns })
    }

    pub fn shield(args: &[f64]) -> Result<Self, EffectError> {
        let amount = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if amount < 1.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: amount });
        }
        let turns = turns_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DefenseEffect::Shield { amount, turns })
    }

    pub fn endure(_args: &[f64]) -> Result<Self, EffectError> {
        Ok(DefenseEffect::Endure)
    }

    pub fn counter_physical(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let turns = turns_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DefenseEffect::CounterPhysical { percent, turns })
    }

    pub fn counter_special(args: &[f64]) -> Result<Self, EffectError> {
        let percent = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        let turns = turns_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DefenseEffect::CounterSpecial { percent, turns })
    }

    pub fn element_immunity(args: &[f64]) -> Result<Self, EffectError> {
        let element = non_negative_arg(args.first().copied().unwrap_or(0.0), 0)?;
        if element < 1.0 {
            return Err(EffectError::ArgOutOfRange { index: 0, value: element });
        }
        let turns = turns_arg(args.get(1).copied().unwrap_or(0.0), 1)?;
        Ok(DefenseEffect::ElementImmunity { element: TypeId(element as u16), turns })
    }

    pub fn can_trigger_at(&self, timing: Timing) -> bool {
        match self {
            DefenseEffect::Cap { .. } | DefenseEffect::Floor { .. } => {
                matches!(timing, Timing::AfterDamageCalc | Timing::BeforeDamageApply)
            }
            DefenseEffect::Endure => matches!(timing, Timing::BeforeSkill | Timing::AfterSkill),
            _ => matches!(timing, Timing::AfterSkill | Timing::BattleStart),
        }
    }

    fn install(
        ctx: &EffectContext<'_>,
        key: &str,
        kind: PersistentKind,
        turns: i32,
        magnitude: f64,
        element: Option<TypeId>,
        message: String,
    ) -> Vec<EffectResult> {
        vec![emit(
            ctx,
            EffectTarget::Attacker,
            Outcome::InstallPersistent {
                name: key.to_string(),
                effect: PersistentEffect { kind, turns_left: turns, magnitude, element },
            },
            message,
        )]
    }

    pub fn execute(&self, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match *self {
            DefenseEffect::Cap { max } => {
                if ctx.damage <= max {
                    return Vec::new();
                }
                // Caps must bite immediately so later stages see the clamp.
                ctx.damage = max;
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::DamageCap { max },
                    format!("damage capped at {max}"),
                )]
            }
            DefenseEffect::Floor { min } => {
                if ctx.damage >= min {
                    return Vec::new();
                }
                ctx.damage = min;
                vec![emit(
                    ctx,
                    EffectTarget::Defender,
                    Outcome::DamageFloor { min },
                    format!("damage raised to {min}"),
                )]
            }
            DefenseEffect::FlatReduction { amount, turns } => Self::install(
                ctx,
                FLAT_REDUCTION_KEY,
                PersistentKind::FlatReduction,
                turns,
                amount,
                None,
                format!("{} hardens its hide", ctx.attacker.name),
            ),
            DefenseEffect::PercentReduction { percent, turns } => Self::install(
                ctx,
                DAMAGE_REDUCTION_KEY,
                PersistentKind::DamageReduction,
                turns,
                percent / 100.0,
                None,
                format!("{} braces against attacks", ctx.attacker.name),
            ),
            DefenseEffect::PercentBoost { percent, turns } => Self::install(
                ctx,
                DAMAGE_BOOST_KEY,
                PersistentKind::DamageBoost,
                turns,
                1.0 + percent / 100.0,
                None,
                format!("{} radiates power", ctx.attacker.name),
            ),
            DefenseEffect::Shield { amount, turns } => Self::install(
                ctx,
                SHIELD_KEY,
                PersistentKind::Shield,
                turns,
                amount,
                None,
                format!("{} raises a shield of {amount} HP", ctx.attacker.name),
            ),
            DefenseEffect::Endure => {
                if ctx.attacker.counter(ENDURE_USED_KEY) != 0 {
                    return vec![emit_failed(ctx, "already endured once this battle".to_string())];
                }
                vec![
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::SetCounter { key: ENDURE_USED_KEY.to_string(), turns: -1 },
                        String::new(),
                    ),
                    emit(
                        ctx,
                        EffectTarget::Attacker,
                        Outcome::SetCounter { key: ENDURE_ACTIVE_KEY.to_string(), turns: 1 },
                        format!("{} steels itself to endure", ctx.attacker.name),
                    ),
                ]
            }
            DefenseEffect::CounterPhysical { percent, turns } => Self::install(
                ctx,
                COUNTER_PHYSICAL_KEY,
                PersistentKind::CounterPhysical,
                turns,
                percent / 100.0,
                None,
                format!("{} readies a counter", ctx.attacker.name),
            ),
            DefenseEffect::CounterSpecial { percent, turns } => Self::install(
                ctx,
                COUNTER_SPECIAL_KEY,
                PersistentKind::CounterSpecial,
                turns,
                percent / 100.0,
                None,
                format!("{} readies a mirror", ctx.attacker.name),
            ),
            DefenseEffect::ElementImmunity { element, turns } => Self::install(
                ctx,
                ELEMENT_IMMUNITY_KEY,
                PersistentKind::ElementImmunity,
                turns,
                0.0,
                Some(element),
                format!("{} becomes immune to an element", ctx.attacker.name),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::rng::Rng;
    use crate::battle::state::{PetState, SkillDefinition};
    use crate::battle::stats::{calculate_stats, BaseStats, Nature};
    use crate::battle::type_chart::element;

    fn pet(name: &str) -> PetState {
        let stats = calculate_stats(&BaseStats::uniform(100), 31, 0, 50, Nature::NEUTRAL);
        PetState::new(1, name, 1, 50, (element::ROCK, None), stats, Vec::new())
    }

    fn run(effect: &DefenseEffect, attacker: &PetState, damage: i32) -> (Vec<EffectResult>, i32) {
        let defender = pet("defender");
        let skill = SkillDefinition::plain_attack(8, "guard", element::ROCK, 0);
        let mut rng = Rng::new(2);
        let mut ctx = EffectContext {
            attacker,
            defender: &defender,
            skill: &skill,
            timing: Timing::AfterDamageCalc,
            turn: 1,
            effect_id: 40,
            args: &[],
            original_damage: damage,
            damage,
            is_crit: false,
            missed: false,
            blocked: false,
            damage_multiplier: 1.0,
            hit_rate_delta: 0.0,
            crit_rate_delta: 0.0,
            priority_delta: 0,
            rng: &mut rng,
        };
        let results = effect.execute(&mut ctx);
        (results, ctx.damage)
    }

    #[test]
    fn cap_clamps_working_damage_in_place() {
        let a = pet("a");
        let cap = DefenseEffect::cap(&[30.0]).unwrap();
        let (results, damage) = run(&cap, &a, 95);
        assert_eq!(damage, 30);
        assert_eq!(results[0].outcome, Outcome::DamageCap { max: 30 });

        let (quiet, untouched) = run(&cap, &a, 20);
        assert!(quiet.is_empty());
        assert_eq!(untouched, 20);
    }

    #[test]
    fn floor_raises_working_damage() {
        let a = pet("a");
        let floor = DefenseEffect::floor(&[15.0]).unwrap();
        let (results, damage) = run(&floor, &a, 3);
        assert_eq!(damage, 15);
        assert_eq!(results[0].outcome, Outcome::DamageFloor { min: 15 });
    }

    #[test]
    fn endure_is_once_per_battle() {
        let mut a = pet("a");
        let endure = DefenseEffect::endure(&[]).unwrap();
        let (first, _) = run(&endure, &a, 0);
        assert_eq!(first.len(), 2);
        a.set_counter(ENDURE_USED_KEY, -1);
        let (second, _) = run(&endure, &a, 0);
        assert!(!second[0].success);
    }

    #[test]
    fn percent_reduction_installs_fractional_magnitude() {
        let a = pet("a");
        let guard = DefenseEffect::percent_reduction(&[40.0, 3.0]).unwrap();
        let (results, _) = run(&guard, &a, 0);
        match &results[0].outcome {
            Outcome::InstallPersistent { name, effect } => {
                assert_eq!(name, DAMAGE_REDUCTION_KEY);
                assert_eq!(effect.magnitude, 0.4);
                assert_eq!(effect.turns_left, 3);
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn zero_turns_means_until_battle_end() {
        let a = pet("a");
        let boost = DefenseEffect::percent_boost(&[25.0, 0.0]).unwrap();
        let (results, _) = run(&boost, &a, 0);
        match &results[0].outcome {
            Outcome::InstallPersistent { effect, .. } => assert_eq!(effect.turns_left, -1),
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn reduction_over_100_percent_is_rejected() {
        assert!(DefenseEffect::percent_reduction(&[150.0, 2.0]).is_err());
        assert!(DefenseEffect::shield(&[0.0, 2.0]).is_err());
        assert!(DefenseEffect::element_immunity(&[0.0, 2.0]).is_err());
    }
}
