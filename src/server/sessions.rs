//! Live battle sessions held by the server. Each session owns one battle
//! (two pets, RNG, trace) plus a broadcast channel fanning freshly produced
//! events out to SSE subscribers. Sessions are independent; the registry
//! lock is only held around one battle's command.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::battle::ai::{choose_skill, AiConfig};
use crate::battle::events::BattleEvent;
use crate::battle::rng::Rng;
use crate::battle::stats::StatKind;
use crate::battle::turn::{Battle, TurnAction, TurnReport};

/// Player is always side 0; the AI drives side 1.
pub const PLAYER_SIDE: usize = 0;
pub const AI_SIDE: usize = 1;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct BattleSession {
    pub battle: Battle,
    pub ai_rng: Rng,
    pub notifier: broadcast::Sender<String>,
}

impl BattleSession {
    pub fn new(battle: Battle, seed: u64) -> BattleSession {
        let (notifier, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        BattleSession { battle, ai_rng: Rng::new(seed ^ 0x00c0_ffee_badd_cafe), notifier }
    }

    /// Publish every event past `from` to SSE subscribers; returns them for
    /// the HTTP response as well.
    pub fn publish_events_from(&self, from: usize) -> Vec<BattleEvent> {
        let fresh: Vec<BattleEvent> = self.battle.events[from..].to_vec();
        for event in &fresh {
            if let Ok(payload) = serde_json::to_string(event) {
                // No subscribers is fine; notification loss never affects
                // battle outcomes.
                let _ = self.notifier.send(payload);
            }
        }
        fresh
    }

    /// The AI's action for this turn.
    pub fn ai_action(&mut self) -> TurnAction {
        let decision = choose_skill(
            self.battle.catalog(),
            self.battle.chart(),
            &self.battle.pets[AI_SIDE],
            &self.battle.pets[PLAYER_SIDE],
            self.battle.last_skill[AI_SIDE],
            AiConfig::default(),
            &mut self.ai_rng,
        );
        match decision {
            Some(decision) => TurnAction::UseSkill(decision.slot),
            None => TurnAction::Pass,
        }
    }

    /// Run one turn with the player's action; the AI answers.
    pub fn play_turn(&mut self, player_action: TurnAction) -> (TurnReport, Vec<BattleEvent>) {
        let from = self.battle.events.len();
        let ai_action = self.ai_action();
        let report = self.battle.run_turn([player_action, ai_action]);
        let events = self.publish_events_from(from);
        (report, events)
    }

    /// Catch odds scale with missing HP and an active status.
    pub fn catch_chance(&self) -> f64 {
        let target = &self.battle.pets[AI_SIDE];
        let mut chance = 30.0 + 50.0 * (1.0 - target.hp_ratio());
        if target.active_status().is_some() {
            chance += 15.0;
        }
        chance.clamp(5.0, 95.0)
    }

    /// Escape odds from the speed comparison.
    pub fn escape_chance(&self) -> f64 {
        let mine = self.battle.pets[PLAYER_SIDE].effective_stat(StatKind::Speed);
        let theirs = self.battle.pets[AI_SIDE].effective_stat(StatKind::Speed);
        if mine >= theirs {
            95.0
        } else {
            (40.0 + 50.0 * mine as f64 / theirs.max(1) as f64).clamp(10.0, 95.0)
        }
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, BattleSession>>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    pub fn insert(&self, session: BattleSession) -> Uuid {
        let id = session.battle.id;
        match self.sessions.lock() {
            Ok(mut sessions) => {
                sessions.insert(id, session);
            }
            Err(err) => warn!(%err, "session registry lock poisoned on insert"),
        }
        id
    }

    pub fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut BattleSession) -> T,
    ) -> Option<T> {
        let mut sessions = self.sessions.lock().ok()?;
        sessions.get_mut(&id).map(f)
    }

    pub fn remove(&self, id: Uuid) -> Option<BattleSession> {
        self.sessions.lock().ok()?.remove(&id)
    }

    pub fn subscribe(&self, id: Uuid) -> Option<broadcast::Receiver<String>> {
        self.with_session(id, |session| session.notifier.subscribe())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataRegistry;
    use crate::battle::stats::Nature;

    fn session() -> BattleSession {
        let registry = DataRegistry::builtin();
        let player = registry.build_pet(1, "Emberling", 50, 31, Nature::NEUTRAL, &[103, 101]).unwrap();
        let foe = registry.build_pet(2, "Thornpup", 50, 31, Nature::NEUTRAL, &[105, 101]).unwrap();
        let battle = Battle::new([player, foe], registry.catalog(), registry.chart(), 21);
        BattleSession::new(battle, 21)
    }

    #[test]
    fn play_turn_produces_fresh_events() {
        let mut session = session();
        let (report, events) = session.play_turn(TurnAction::UseSkill(0));
        assert_eq!(report.turn, 1);
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.turn == 1));
    }

    #[test]
    fn catch_chance_grows_as_target_weakens() {
        let mut session = session();
        let healthy = session.catch_chance();
        let max = session.battle.pets[AI_SIDE].max_hp();
        session.battle.pets[AI_SIDE].current_hp = max / 10;
        let weakened = session.catch_chance();
        assert!(weakened > healthy);
        assert!((5.0..=95.0).contains(&weakened));
    }

    #[test]
    fn registry_stores_and_removes_sessions() {
        let registry = SessionRegistry::new();
        let id = registry.insert(session());
        assert_eq!(registry.len(), 1);
        assert!(registry.with_session(id, |s| s.battle.turn).is_some());
        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn subscribers_receive_published_events() {
        let registry = SessionRegistry::new();
        let id = registry.insert(session());
        let mut receiver = registry.subscribe(id).unwrap();
        registry.with_session(id, |s| {
            s.play_turn(TurnAction::UseSkill(0));
        });
        let payload = receiver.try_recv().expect("event should be broadcast");
        assert!(payload.contains("turn"));
    }
}
