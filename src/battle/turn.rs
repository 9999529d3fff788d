//! Turn lifecycle orchestrator. One `Battle` owns two pets, the RNG, and the
//! event trace; a turn is a fixed sequence of timing callbacks over both
//! chosen actions. All per-battle effect bookkeeping (counters, persistent
//! auras, streaks) lives here and in the pets it owns — nothing is shared
//! between concurrent battles.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::battle::context::{EffectResult, Outcome};
use crate::battle::damage::compute_damage;
use crate::battle::events::{BattleEvent, EventKind};
use crate::battle::rng::Rng;
use crate::battle::state::{PersistentKind, PetState, SkillDefinition, StatusKind};
use crate::battle::stats::{calculate_accuracy, crit_rate, first_mover, StatKind};
use crate::battle::timing::Timing;
use crate::battle::type_chart::TypeChart;
use crate::effects::applicator::{self, AppliedFlags};
use crate::effects::conflict;
use crate::effects::special::LAST_SLOT_KEY;
use crate::effects::stat_stage::parse_temp_boost_key;
use crate::effects::trigger::{self, TriggerFlags};
use crate::effects::EffectCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAction {
    UseSkill(usize),
    Pass,
}

#[derive(Debug, Clone, Copy)]
pub struct TurnReport {
    pub turn: u32,
    /// Sides in the order they acted.
    pub order: [usize; 2],
    pub over: bool,
    pub winner: Option<usize>,
}

pub struct Battle {
    pub id: Uuid,
    pub pets: [PetState; 2],
    pub rng: Rng,
    pub turn: u32,
    pub events: Vec<BattleEvent>,
    pub over: bool,
    pub winner: Option<usize>,
    /// Per-side memory of the previous turn's skill, for AI combo detection.
    /// Reset when a battle starts; never shared across battles.
    pub last_skill: [Option<u32>; 2],
    catalog: Arc<EffectCatalog>,
    chart: Arc<TypeChart>,
}

impl Battle {
    pub fn new(
        pets: [PetState; 2],
        catalog: Arc<EffectCatalog>,
        chart: Arc<TypeChart>,
        seed: u64,
    ) -> Battle {
        let mut battle = Battle {
            id: Uuid::new_v4(),
            pets,
            rng: Rng::new(seed),
            turn: 0,
            events: Vec::new(),
            over: false,
            winner: None,
            last_skill: [None, None],
            catalog,
            chart,
        };
        battle.on_battle_start();
        battle
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    pub fn chart(&self) -> &TypeChart {
        &self.chart
    }

    fn push_event(&mut self, side: Option<usize>, kind: EventKind, message: String) {
        self.events.push(BattleEvent::new(self.turn, side, kind, message));
    }

    fn push_value_event(&mut self, side: Option<usize>, kind: EventKind, value: f64, message: String) {
        self.events.push(BattleEvent::with_value(self.turn, side, kind, value, message));
    }

    fn pair_mut(&mut self, side: usize) -> (&mut PetState, &mut PetState) {
        let (left, right) = self.pets.split_at_mut(1);
        if side == 0 {
            (&mut left[0], &mut right[0])
        } else {
            (&mut right[0], &mut left[0])
        }
    }

    /// Fire one timing for a skill, resolve conflicts, apply the survivors,
    /// and record their events. Returns the applied results, the judgment
    /// flags, and the post-trigger in-flight numbers.
    pub fn fire_skill_timing(
        &mut self,
        side: usize,
        skill: &SkillDefinition,
        timing: Timing,
        damage: i32,
        flags: TriggerFlags,
    ) -> (Vec<EffectResult>, AppliedFlags, trigger::TriggerOutput) {
        let output = {
            let attacker = &self.pets[side];
            let defender = &self.pets[1 - side];
            trigger::fire(
                &self.catalog,
                attacker,
                defender,
                skill,
                timing,
                self.turn,
                damage,
                flags,
                &mut self.rng,
            )
        };
        let resolved = conflict::resolve(output.results.clone());
        let applied_flags = {
            let (attacker, defender) = self.pair_mut(side);
            applicator::apply(&resolved, attacker, defender)
        };
        for result in resolved.iter().filter(|r| r.success && !r.message.is_empty()) {
            let kind = match &result.outcome {
                Outcome::Damage { .. } | Outcome::MultiHit { .. } => EventKind::Damage,
                Outcome::Heal { .. } => EventKind::Heal,
                Outcome::Status { .. } => EventKind::StatusApplied,
                Outcome::CureStatus { .. } => EventKind::StatusCleared,
                Outcome::StatChange { .. }
                | Outcome::AccuracyStage { .. }
                | Outcome::EvasionStage { .. } => EventKind::StatChanged,
                _ => EventKind::EffectApplied,
            };
            let value = result.outcome.value();
            match value {
                Some(v) => self.push_value_event(Some(side), kind, v, result.message.clone()),
                None => self.push_event(Some(side), kind, result.message.clone()),
            }
        }
        (resolved, applied_flags, output)
    }

    pub fn on_battle_start(&mut self) {
        let names = format!("{} vs {}", self.pets[0].name, self.pets[1].name);
        info!(battle = %self.id, %names, "battle started");
        self.last_skill = [None, None];
        self.push_event(None, EventKind::BattleStart, names);
    }

    /// Turn-start bookkeeping for one side: regeneration and status chip
    /// damage first, then status durations, then effect counters (reverting
    /// temp boosts at zero), then persistent-effect countdowns.
    fn tick_turn_start(&mut self, side: usize) {
        // Regeneration aura.
        let regen = self.pets[side]
            .persistent_of_kind(PersistentKind::RegenAura)
            .map(|(_, e)| e.magnitude);
        if let Some(fraction) = regen {
            let amount = (self.pets[side].max_hp() as f64 * fraction) as i32;
            let healed = self.pets[side].apply_heal(amount);
            if healed > 0 {
                let name = self.pets[side].name.clone();
                self.push_value_event(
                    Some(side),
                    EventKind::Heal,
                    healed as f64,
                    format!("{name} regenerates {healed} HP"),
                );
            }
        }

        // Poison-like chip damage from the active status.
        if let Some(status) = self.pets[side].active_status() {
            let fraction = status.tick_damage_fraction();
            if fraction > 0.0 {
                let amount = ((self.pets[side].max_hp() as f64 * fraction) as i32).max(1);
                let dealt = self.pets[side].apply_damage(amount);
                let name = self.pets[side].name.clone();
                self.push_value_event(
                    Some(side),
                    EventKind::Damage,
                    dealt as f64,
                    format!("{name} is hurt by {}", status.as_str()),
                );
            }
        }

        // Status durations; clearing the active slot on the same tick it
        // reaches zero.
        for slot in 0..self.pets[side].status_durations.len() {
            let duration = self.pets[side].status_durations[slot];
            if duration == 0 {
                continue;
            }
            self.pets[side].status_durations[slot] = duration - 1;
            if duration == 1 {
                if let Some(status) = StatusKind::from_slot(slot) {
                    if self.pets[side].status == Some(status) {
                        self.pets[side].status = None;
                        let name = self.pets[side].name.clone();
                        self.push_event(
                            Some(side),
                            EventKind::StatusCleared,
                            format!("{name} recovered from {}", status.as_str()),
                        );
                    }
                }
            }
        }

        // Effect counters. Positive counters tick down; negative counters are
        // permanent flags. A temp-boost key reverts its stage delta at zero.
        let keys: Vec<String> = self.pets[side]
            .counters
            .iter()
            .filter(|(_, &v)| v > 0)
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            let remaining = self.pets[side].bump_counter(&key, -1);
            if remaining == 0 {
                if let Some((stat, delta)) = parse_temp_boost_key(&key) {
                    self.pets[side].bump_stage(stat, -delta);
                    let name = self.pets[side].name.clone();
                    self.push_event(
                        Some(side),
                        EventKind::EffectExpired,
                        format!("{name}'s temporary {} boost wore off", stat.as_str()),
                    );
                }
            }
        }

        // Persistent countdowns, with kind-specific expiry.
        let expiring: Vec<(String, PersistentKind, f64)> = {
            let pet = &mut self.pets[side];
            let mut out = Vec::new();
            for (name, effect) in pet.persistent.iter_mut() {
                if effect.turns_left > 0 {
                    effect.turns_left -= 1;
                    if effect.turns_left == 0 {
                        out.push((name.clone(), effect.kind, effect.magnitude));
                    }
                }
            }
            out
        };
        for (name, kind, magnitude) in expiring {
            self.pets[side].persistent.remove(&name);
            let pet_name = self.pets[side].name.clone();
            match kind {
                PersistentKind::DelayedDamage => {
                    let dealt = self.pets[side].apply_damage(magnitude as i32);
                    self.push_value_event(
                        Some(side),
                        EventKind::Damage,
                        dealt as f64,
                        format!("the delayed blast hits {pet_name}"),
                    );
                }
                PersistentKind::DelayedKill => {
                    let lethal = self.pets[side].current_hp;
                    self.pets[side].apply_damage(lethal);
                    self.push_event(
                        Some(side),
                        EventKind::Damage,
                        format!("doom claims {pet_name}"),
                    );
                }
                _ => {
                    self.push_event(
                        Some(side),
                        EventKind::EffectExpired,
                        format!("{pet_name}'s {name} wore off"),
                    );
                }
            }
        }
    }

    pub fn on_turn_start(&mut self) {
        self.push_event(None, EventKind::TurnStart, format!("turn {}", self.turn));
        for side in 0..2 {
            self.tick_turn_start(side);
        }
    }

    /// Turn-end bookkeeping: leech-style drains transfer HP across, clamped
    /// to both combatants' bounds.
    pub fn on_turn_end(&mut self) {
        for side in 0..2 {
            let drain = self.pets[side]
                .persistent_of_kind(PersistentKind::DrainAura)
                .map(|(_, e)| e.magnitude);
            if let Some(fraction) = drain {
                let amount = (self.pets[side].max_hp() as f64 * fraction) as i32;
                let (victim, other) = self.pair_mut(side);
                let drained = victim.apply_damage(amount);
                let healed = other.apply_heal(drained);
                let victim_name = victim.name.clone();
                self.push_value_event(
                    Some(side),
                    EventKind::Damage,
                    drained as f64,
                    format!("the seed drains {drained} HP from {victim_name} ({healed} restored)"),
                );
            }
        }
        self.push_event(None, EventKind::TurnEnd, String::new());
    }

    /// Battle-end bookkeeping: reward effects fire, then both pets drop all
    /// accumulated battle state. The only point where that state is discarded.
    pub fn on_battle_end(&mut self) {
        for side in 0..2 {
            if let Some(slot) = crate::effects::special::last_used_slot(&self.pets[side]) {
                if let Some(learned) = self.pets[side].skills.get(slot) {
                    let skill = learned.skill.clone();
                    self.fire_skill_timing(side, &skill, Timing::BattleEnd, 0, TriggerFlags::default());
                }
            }
        }
        for pet in &mut self.pets {
            pet.reset_battle_state();
        }
        let message = match self.winner {
            Some(side) => format!("{} wins", self.pets[side].name),
            None => "the battle ends in a draw".to_string(),
        };
        info!(battle = %self.id, %message, "battle over");
        self.push_event(None, EventKind::BattleEnd, message);
    }

    fn check_faints(&mut self) {
        if self.over {
            return;
        }
        let fainted = [self.pets[0].is_fainted(), self.pets[1].is_fainted()];
        if !fainted[0] && !fainted[1] {
            return;
        }
        for side in 0..2 {
            if fainted[side] {
                let name = self.pets[side].name.clone();
                self.push_event(Some(side), EventKind::Fainted, format!("{name} fainted"));
            }
        }
        self.winner = match fainted {
            [true, false] => Some(1),
            [false, true] => Some(0),
            _ => None,
        };
        self.over = true;
    }

    /// Whether the active status removes or disrupts this side's action.
    fn action_prevented(&mut self, side: usize) -> bool {
        let Some(status) = self.pets[side].active_status() else {
            return false;
        };
        let name = self.pets[side].name.clone();
        match status {
            StatusKind::Sleep | StatusKind::Freeze | StatusKind::Petrify | StatusKind::Stun => {
                self.push_event(
                    Some(side),
                    EventKind::Info,
                    format!("{name} cannot move ({})", status.as_str()),
                );
                true
            }
            StatusKind::Flinch => {
                self.push_event(Some(side), EventKind::Info, format!("{name} flinched"));
                true
            }
            StatusKind::Confusion => {
                if self.rng.chance(33.0) {
                    let amount = (self.pets[side].max_hp() / 8).max(1);
                    let dealt = self.pets[side].apply_damage(amount);
                    self.push_value_event(
                        Some(side),
                        EventKind::Damage,
                        dealt as f64,
                        format!("{name} hurt itself in confusion"),
                    );
                    true
                } else {
                    false
                }
            }
            StatusKind::Paralysis | StatusKind::Fear => {
                if self.rng.chance(25.0) {
                    self.push_event(
                        Some(side),
                        EventKind::Info,
                        format!("{name} is held back by {}", status.as_str()),
                    );
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Validate and normalize a requested action: encore locks, disabled
    /// slots, and exhausted PP all downgrade or redirect the choice.
    fn resolve_action(&mut self, side: usize, action: TurnAction) -> TurnAction {
        let TurnAction::UseSkill(mut slot) = action else {
            return TurnAction::Pass;
        };
        if let Some(locked) = self.pets[side].encore_slot() {
            slot = locked;
        }
        let usable = slot < self.pets[side].skills.len()
            && self.pets[side].skills[slot].pp > 0
            && !self.pets[side].is_slot_disabled(slot);
        if !usable {
            let name = self.pets[side].name.clone();
            self.push_event(
                Some(side),
                EventKind::Info,
                format!("{name} has no usable move"),
            );
            return TurnAction::Pass;
        }
        TurnAction::UseSkill(slot)
    }

    /// Incoming attack damage against one side, through substitute, percent
    /// and flat reductions, shield, and endure. Returns HP actually removed.
    fn apply_incoming_damage(&mut self, defender_side: usize, amount: i32) -> i32 {
        let mut damage = amount.max(0);
        if damage == 0 {
            return 0;
        }

        // Substitute soaks the whole hit.
        if let Some((key, sub)) = self.pets[defender_side]
            .persistent_of_kind(PersistentKind::Substitute)
            .map(|(k, e)| (k.to_string(), e.magnitude))
        {
            let name = self.pets[defender_side].name.clone();
            if (damage as f64) < sub {
                if let Some(entry) = self.pets[defender_side].persistent_mut(&key) {
                    entry.magnitude -= damage as f64;
                }
                self.push_event(
                    Some(defender_side),
                    EventKind::Blocked,
                    format!("{name}'s substitute takes the hit"),
                );
            } else {
                self.pets[defender_side].persistent.remove(&key);
                self.push_event(
                    Some(defender_side),
                    EventKind::Blocked,
                    format!("{name}'s substitute broke"),
                );
            }
            return 0;
        }

        if let Some((_, guard)) =
            self.pets[defender_side].persistent_of_kind(PersistentKind::DamageReduction)
        {
            damage = (damage as f64 * (1.0 - guard.magnitude)).floor() as i32;
        }
        if let Some((_, guard)) =
            self.pets[defender_side].persistent_of_kind(PersistentKind::FlatReduction)
        {
            damage = (damage - guard.magnitude as i32).max(0);
        }

        // Shield pool.
        if damage > 0 {
            if let Some((key, shield)) = self.pets[defender_side]
                .persistent_of_kind(PersistentKind::Shield)
                .map(|(k, e)| (k.to_string(), e.magnitude))
            {
                let absorbed = (damage as f64).min(shield);
                damage -= absorbed as i32;
                let name = self.pets[defender_side].name.clone();
                if absorbed >= shield {
                    self.pets[defender_side].persistent.remove(&key);
                    self.push_event(
                        Some(defender_side),
                        EventKind::Blocked,
                        format!("{name}'s shield shatters"),
                    );
                } else if let Some(entry) = self.pets[defender_side].persistent_mut(&key) {
                    entry.magnitude -= absorbed;
                }
            }
        }

        // Endure pins HP at 1.
        if damage >= self.pets[defender_side].current_hp
            && self.pets[defender_side].counter(crate::effects::defense::ENDURE_ACTIVE_KEY) > 0
        {
            damage = self.pets[defender_side].current_hp - 1;
            let name = self.pets[defender_side].name.clone();
            self.push_event(
                Some(defender_side),
                EventKind::Info,
                format!("{name} endures the hit"),
            );
        }

        let dealt = self.pets[defender_side].apply_damage(damage);
        if dealt > 0 {
            let name = self.pets[defender_side].name.clone();
            self.push_value_event(
                Some(defender_side),
                EventKind::Damage,
                dealt as f64,
                format!("{name} takes {dealt} damage"),
            );
        }
        dealt
    }

    /// Reactive hook on the defending side, dispatched through its last used
    /// skill (a pet that has not moved yet has nothing to react with).
    fn fire_foe_reactive(&mut self, foe: usize, timing: Timing, damage: i32) {
        let Some(slot) = crate::effects::special::last_used_slot(&self.pets[foe]) else {
            return;
        };
        let Some(learned) = self.pets[foe].skills.get(slot) else {
            return;
        };
        let foe_skill = learned.skill.clone();
        self.fire_skill_timing(foe, &foe_skill, timing, damage, TriggerFlags::default());
    }

    /// One side's full attack resolution across the timing chain.
    fn execute_attack(&mut self, side: usize, slot: usize) {
        let skill = self.pets[side].skills[slot].skill.clone();
        let foe = 1 - side;

        self.pets[side].skills[slot].pp = self.pets[side].skills[slot].pp.saturating_sub(1);
        self.pets[side].set_counter(LAST_SLOT_KEY, -(slot as i32 + 1));
        let attacker_name = self.pets[side].name.clone();
        self.push_event(
            Some(side),
            EventKind::SkillUsed,
            format!("{attacker_name} uses {}", skill.name),
        );

        // before_skill: charge installs end the turn here.
        let (before_results, _, _) =
            self.fire_skill_timing(side, &skill, Timing::BeforeSkill, 0, TriggerFlags::default());
        let started_charging = before_results.iter().any(|r| {
            matches!(
                &r.outcome,
                Outcome::InstallPersistent { effect, .. } if effect.kind == PersistentKind::Charge
            )
        });
        if started_charging {
            self.push_event(Some(side), EventKind::Charging, format!("{attacker_name} is charging up"));
            self.last_skill[side] = Some(skill.id);
            return;
        }

        // A matching immunity aura blanks the whole skill.
        let blocked = self.pets[foe]
            .persistent
            .values()
            .any(|e| e.kind == PersistentKind::ElementImmunity && e.element == Some(skill.element));
        if blocked {
            let foe_name = self.pets[foe].name.clone();
            self.push_event(
                Some(foe),
                EventKind::Blocked,
                format!("{foe_name} is immune to the attack"),
            );
            self.last_skill[side] = Some(skill.id);
            return;
        }

        // on_attacked: the defender's reactive hook for incoming skills.
        self.fire_foe_reactive(foe, Timing::OnAttacked, 0);

        // Hit determination.
        let mut hit = true;
        if !skill.always_hits {
            let (_, _, pre_hit) = self.fire_skill_timing(
                side,
                &skill,
                Timing::BeforeHitCheck,
                0,
                TriggerFlags::default(),
            );
            let (_, judgment, _) =
                self.fire_skill_timing(side, &skill, Timing::HitCheck, 0, TriggerFlags::default());
            let sure_hit = self.pets[side].has_persistent_kind(PersistentKind::SureHit);
            if judgment.force_miss {
                hit = false;
            } else if judgment.always_hit || sure_hit {
                hit = true;
            } else {
                let base = (skill.accuracy + pre_hit.hit_rate_delta).clamp(0.0, 100.0);
                let accuracy = calculate_accuracy(
                    base,
                    self.pets[side].accuracy_stage,
                    self.pets[foe].evasion_stage,
                );
                hit = self.rng.chance(accuracy);
            }
            self.fire_skill_timing(side, &skill, Timing::AfterHitCheck, 0, TriggerFlags::default());
        }

        if !hit {
            let foe_name = self.pets[foe].name.clone();
            self.push_event(Some(side), EventKind::Missed, format!("{attacker_name} missed"));
            self.push_event(Some(foe), EventKind::Evaded, format!("{foe_name} evaded"));
            self.fire_skill_timing(
                side,
                &skill,
                Timing::OnEvade,
                0,
                TriggerFlags { missed: true, ..TriggerFlags::default() },
            );
            self.last_skill[side] = Some(skill.id);
            self.check_faints();
            return;
        }

        // Crit determination (offensive skills only).
        let mut is_crit = false;
        if skill.category.is_offensive() && skill.power > 0 {
            let (_, _, pre_crit) = self.fire_skill_timing(
                side,
                &skill,
                Timing::BeforeCritCheck,
                0,
                TriggerFlags::default(),
            );
            let (_, judgment, _) =
                self.fire_skill_timing(side, &skill, Timing::CritCheck, 0, TriggerFlags::default());
            let guarded = self.pets[foe].has_persistent_kind(PersistentKind::CritGuard);
            if judgment.always_crit && !guarded {
                is_crit = true;
            } else if !guarded {
                let rate = (crit_rate(skill.crit_stage) + pre_crit.crit_rate_delta).clamp(0.0, 100.0);
                is_crit = self.rng.chance(rate);
            }
            if is_crit {
                self.push_event(Some(side), EventKind::Crit, "a critical hit".to_string());
            }
        }

        // Damage pipeline.
        let mut damage = 0;
        if skill.category.is_offensive() && skill.power > 0 {
            let flags = TriggerFlags { is_crit, ..TriggerFlags::default() };
            let (_, _, pre_calc) =
                self.fire_skill_timing(side, &skill, Timing::BeforeDamageCalc, 0, flags);
            let breakdown = compute_damage(
                &self.pets[side],
                &self.pets[foe],
                &skill,
                &self.chart,
                is_crit,
                1.0,
                &mut self.rng,
            );
            let boost = self.pets[side]
                .persistent_of_kind(PersistentKind::DamageBoost)
                .map(|(_, e)| e.magnitude)
                .unwrap_or(1.0);
            damage =
                (breakdown.final_damage as f64 * pre_calc.damage_multiplier * boost).floor() as i32;
            debug!(
                side,
                base = breakdown.final_damage,
                multiplier = pre_calc.damage_multiplier,
                boost,
                damage,
                "damage computed"
            );

            // after_damage_calc: caps, floors, extra hits. Multi-hit results
            // replace the single working value.
            let (calc_results, _, post_calc) =
                self.fire_skill_timing(side, &skill, Timing::AfterDamageCalc, damage, flags);
            damage = post_calc.damage;
            for result in &calc_results {
                if let Outcome::MultiHit { hits } = &result.outcome {
                    damage = hits.iter().sum();
                }
            }

            // before_damage_apply: instant-KO judgments.
            let (_, judgment, _) =
                self.fire_skill_timing(side, &skill, Timing::BeforeDamageApply, damage, flags);
            if judgment.instant_kill {
                self.last_skill[side] = Some(skill.id);
                self.check_faints();
                if self.over {
                    self.on_battle_end();
                }
                return;
            }

            let dealt = self.apply_incoming_damage(foe, damage);

            // Reactive hooks and riders on the landed hit.
            let rider_flags = TriggerFlags { is_crit, ..TriggerFlags::default() };
            self.fire_skill_timing(side, &skill, Timing::OnAttack, dealt, rider_flags);
            if dealt > 0 {
                self.fire_foe_reactive(foe, Timing::OnReceiveDamage, dealt);
                self.fire_foe_reactive(foe, Timing::OnHpChange, dealt);
            }
            self.fire_skill_timing(side, &skill, Timing::AfterDamageApply, dealt, rider_flags);

            // Counters reflect a share of the damage back.
            if dealt > 0 {
                let counter_kind = match skill.category {
                    crate::battle::state::SkillCategory::Physical => {
                        Some(PersistentKind::CounterPhysical)
                    }
                    crate::battle::state::SkillCategory::Special => {
                        Some(PersistentKind::CounterSpecial)
                    }
                    crate::battle::state::SkillCategory::Status => None,
                };
                if let Some(kind) = counter_kind {
                    if let Some((_, counter)) = self.pets[foe].persistent_of_kind(kind) {
                        let reflected = (dealt as f64 * counter.magnitude) as i32;
                        if reflected > 0 {
                            let returned = self.pets[side].apply_damage(reflected);
                            self.push_value_event(
                                Some(side),
                                EventKind::Damage,
                                returned as f64,
                                format!("{attacker_name} is struck by the counter"),
                            );
                        }
                    }
                }
            }
        }

        // after_skill: the broad setup/rider timing.
        let flags = TriggerFlags { is_crit, ..TriggerFlags::default() };
        self.fire_skill_timing(side, &skill, Timing::AfterSkill, damage, flags);

        self.last_skill[side] = Some(skill.id);
        self.check_faints();
        if self.pets[foe].is_fainted() {
            self.fire_skill_timing(side, &skill, Timing::OnKo, damage, flags);
        }
    }

    /// Resolve one full turn from both sides' chosen actions.
    pub fn run_turn(&mut self, actions: [TurnAction; 2]) -> TurnReport {
        assert!(!self.over, "run_turn on a finished battle");
        self.turn += 1;
        self.on_turn_start();
        self.check_faints();
        if self.over {
            self.on_battle_end();
            return TurnReport { turn: self.turn, order: [0, 1], over: true, winner: self.winner };
        }

        let resolved = [
            self.resolve_action(0, actions[0]),
            self.resolve_action(1, actions[1]),
        ];

        // Priorities may be adjusted by before_speed_check effects.
        let mut priorities = [0i32; 2];
        for side in 0..2 {
            if let TurnAction::UseSkill(slot) = resolved[side] {
                let skill = self.pets[side].skills[slot].skill.clone();
                let (_, _, output) = self.fire_skill_timing(
                    side,
                    &skill,
                    Timing::BeforeSpeedCheck,
                    0,
                    TriggerFlags::default(),
                );
                priorities[side] = skill.priority + output.priority_delta;
            }
        }

        let first = first_mover(
            priorities[0],
            self.pets[0].effective_stat(StatKind::Speed),
            priorities[1],
            self.pets[1].effective_stat(StatKind::Speed),
            &mut self.rng,
        );
        let order = [first, 1 - first];

        for &side in &order {
            if self.over || self.pets[side].is_fainted() {
                continue;
            }
            match resolved[side] {
                TurnAction::Pass => {
                    let name = self.pets[side].name.clone();
                    self.push_event(Some(side), EventKind::Info, format!("{name} waits"));
                }
                TurnAction::UseSkill(slot) => {
                    if !self.action_prevented(side) {
                        self.execute_attack(side, slot);
                    }
                    self.check_faints();
                }
            }
        }

        if !self.over {
            self.on_turn_end();
            self.check_faints();
        }
        if self.over && self.events.iter().all(|e| e.kind != EventKind::BattleEnd) {
            self.on_battle_end();
        }

        TurnReport { turn: self.turn, order, over: self.over, winner: self.winner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::{PersistentEffect, SkillCategory};
    use crate::battle::stats::{calculate_stats, BaseStats, Nature};
    use crate::battle::type_chart::element;

    fn pet(name: &str, speed: u32, skills: Vec<SkillDefinition>) -> PetState {
        let mut base = BaseStats::uniform(100);
        base.speed = speed;
        let stats = calculate_stats(&base, 31, 0, 50, Nature::NEUTRAL);
        PetState::new(1, name, 1, 50, (element::NORMAL, None), stats, skills)
    }

    fn tackle() -> SkillDefinition {
        SkillDefinition::plain_attack(1, "Tackle", element::NORMAL, 40)
    }

    fn battle(pets: [PetState; 2]) -> Battle {
        Battle::new(
            pets,
            Arc::new(EffectCatalog::builtin()),
            Arc::new(TypeChart::builtin()),
            7,
        )
    }

    #[test]
    fn faster_pet_attacks_first() {
        let a = pet("fast", 200, vec![tackle()]);
        let b = pet("slow", 10, vec![tackle()]);
        let mut battle = battle([a, b]);
        let report = battle.run_turn([TurnAction::UseSkill(0), TurnAction::UseSkill(0)]);
        assert_eq!(report.order, [0, 1]);
        assert!(battle.pets[0].current_hp < battle.pets[0].max_hp());
        assert!(battle.pets[1].current_hp < battle.pets[1].max_hp());
    }

    #[test]
    fn priority_skill_outruns_speed() {
        let mut quick = tackle();
        quick.priority = 1;
        let a = pet("slowpoke", 10, vec![quick]);
        let b = pet("speedy", 200, vec![tackle()]);
        let mut battle = battle([a, b]);
        let report = battle.run_turn([TurnAction::UseSkill(0), TurnAction::UseSkill(0)]);
        assert_eq!(report.order, [0, 1]);
    }

    #[test]
    fn status_duration_clears_on_its_zero_tick() {
        let a = pet("a", 100, vec![tackle()]);
        let b = pet("b", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        battle.pets[0].set_status(StatusKind::Silence, 2);

        battle.run_turn([TurnAction::Pass, TurnAction::Pass]);
        assert_eq!(battle.pets[0].active_status(), Some(StatusKind::Silence));
        battle.run_turn([TurnAction::Pass, TurnAction::Pass]);
        assert_eq!(battle.pets[0].active_status(), None);
    }

    #[test]
    fn temp_boost_counter_reverts_stage_on_expiry() {
        let a = pet("a", 100, vec![tackle()]);
        let b = pet("b", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        let key = crate::effects::stat_stage::temp_boost_key(StatKind::Attack, 2);
        battle.pets[0].bump_stage(StatKind::Attack, 2);
        battle.pets[0].set_counter(&key, 1);

        battle.run_turn([TurnAction::Pass, TurnAction::Pass]);
        assert_eq!(battle.pets[0].stage(StatKind::Attack), 0);
        assert_eq!(battle.pets[0].counter(&key), 0);
    }

    #[test]
    fn leech_drain_transfers_hp_at_turn_end() {
        let a = pet("seeded", 100, vec![tackle()]);
        let b = pet("seeder", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        battle.pets[1].apply_damage(40);
        battle.pets[0].persistent.insert(
            "leech_seed".to_string(),
            PersistentEffect {
                kind: PersistentKind::DrainAura,
                turns_left: -1,
                magnitude: 0.125,
                element: None,
            },
        );
        let seeded_max = battle.pets[0].max_hp();
        let seeder_hp = battle.pets[1].current_hp;

        battle.run_turn([TurnAction::Pass, TurnAction::Pass]);
        let drained = seeded_max / 8;
        assert_eq!(battle.pets[0].current_hp, seeded_max - drained);
        assert_eq!(battle.pets[1].current_hp, seeder_hp + drained);
    }

    #[test]
    fn battle_end_resets_all_accumulated_state() {
        let a = pet("a", 100, vec![tackle()]);
        let mut b = pet("b", 90, vec![tackle()]);
        b.current_hp = 1;
        let mut battle = battle([a, b]);
        battle.pets[0].bump_stage(StatKind::Attack, 3);
        battle.pets[0].set_counter("focus", 4);
        battle.pets[1].set_status(StatusKind::Poison, 9);

        let report = battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert!(report.over);
        assert_eq!(report.winner, Some(0));
        assert_eq!(battle.pets[0].stages, [0; 6]);
        assert!(battle.pets[0].counters.is_empty());
        assert_eq!(battle.pets[1].status_durations, [0; 20]);
    }

    #[test]
    fn sleeping_pet_loses_its_action() {
        let a = pet("sleeper", 200, vec![tackle()]);
        let b = pet("waker", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        battle.pets[0].set_status(StatusKind::Sleep, 5);
        let b_hp = battle.pets[1].current_hp;
        battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert_eq!(battle.pets[1].current_hp, b_hp);
    }

    #[test]
    fn stat_shift_skill_raises_all_six_stages_and_clamps() {
        let mut buff = SkillDefinition::plain_attack(9, "Overdrive", element::NORMAL, 0);
        buff.category = SkillCategory::Status;
        buff.accuracy = 100.0;
        buff.always_hits = true;
        buff.max_pp = 40;
        buff.side_effects = vec![4, 4, 4, 4, 4, 4];
        buff.effect_args = vec![
            0.0, 100.0, 1.0, 1.0, 100.0, 1.0, 2.0, 100.0, 1.0, 3.0, 100.0, 1.0, 4.0, 100.0, 1.0,
            5.0, 100.0, 1.0,
        ];
        let a = pet("booster", 100, vec![buff]);
        let b = pet("bystander", 90, vec![tackle()]);
        let mut battle = battle([a, b]);

        battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert_eq!(battle.pets[0].stages, [1; 6]);

        for _ in 0..10 {
            if battle.over {
                break;
            }
            battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        }
        assert_eq!(battle.pets[0].stages, [6; 6]);
    }

    #[test]
    fn substitute_soaks_the_first_hit() {
        let a = pet("attacker", 200, vec![tackle()]);
        let b = pet("decoyed", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        battle.pets[1].persistent.insert(
            "substitute".to_string(),
            PersistentEffect {
                kind: PersistentKind::Substitute,
                turns_left: -1,
                magnitude: 500.0,
                element: None,
            },
        );
        let hp = battle.pets[1].current_hp;
        battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert_eq!(battle.pets[1].current_hp, hp);
        assert!(battle.pets[1].has_persistent_kind(PersistentKind::Substitute));
    }

    #[test]
    fn endure_leaves_one_hp() {
        let mut nuke = tackle();
        nuke.power = 500;
        let a = pet("nuker", 200, vec![nuke]);
        let mut b = pet("survivor", 90, vec![tackle()]);
        b.current_hp = 50;
        let mut battle = battle([a, b]);
        battle.pets[1].set_counter(crate::effects::defense::ENDURE_ACTIVE_KEY, 1);
        battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert_eq!(battle.pets[1].current_hp, 1);
        assert!(!battle.over);
    }

    #[test]
    fn charge_skill_spends_a_turn_then_releases() {
        let mut beam = SkillDefinition::plain_attack(11, "Sky Beam", element::NORMAL, 60);
        beam.side_effects = vec![71];
        beam.effect_args = vec![2.0];
        beam.always_hits = true;
        let a = pet("charger", 200, vec![beam]);
        let b = pet("target", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        let hp = battle.pets[1].current_hp;

        battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert_eq!(battle.pets[1].current_hp, hp, "charging turn deals nothing");
        assert!(battle.pets[0].has_persistent_kind(PersistentKind::Charge));

        battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert!(battle.pets[1].current_hp < hp);
        assert!(!battle.pets[0].has_persistent_kind(PersistentKind::Charge));
    }

    #[test]
    fn element_immunity_blanks_matching_skills() {
        let mut ember = tackle();
        ember.element = element::FIRE;
        let a = pet("firebug", 200, vec![ember]);
        let b = pet("warded", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        battle.pets[1].persistent.insert(
            "element_immunity".to_string(),
            PersistentEffect {
                kind: PersistentKind::ElementImmunity,
                turns_left: -1,
                magnitude: 0.0,
                element: Some(element::FIRE),
            },
        );
        let hp = battle.pets[1].current_hp;
        battle.run_turn([TurnAction::UseSkill(0), TurnAction::Pass]);
        assert_eq!(battle.pets[1].current_hp, hp);
    }

    #[test]
    fn encore_forces_the_locked_slot() {
        let other = SkillDefinition::plain_attack(2, "Scratch", element::NORMAL, 40);
        let a = pet("locked", 200, vec![tackle(), other]);
        let b = pet("foe", 90, vec![tackle()]);
        let mut battle = battle([a, b]);
        battle.pets[0].persistent.insert(
            "encore".to_string(),
            PersistentEffect {
                kind: PersistentKind::Encore,
                turns_left: 3,
                magnitude: 0.0,
                element: None,
            },
        );
        battle.run_turn([TurnAction::UseSkill(1), TurnAction::Pass]);
        // Slot 0 was forced: its PP dropped, slot 1 untouched.
        assert_eq!(battle.pets[0].skills[0].pp, battle.pets[0].skills[0].skill.max_pp - 1);
        assert_eq!(battle.pets[0].skills[1].pp, battle.pets[0].skills[1].skill.max_pp);
    }
}
