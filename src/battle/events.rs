//! Battle event trace: every phase transition and applied outcome is recorded
//! as one event, for the API, the SSE stream, the duel printout, and CSV
//! export.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BattleStart,
    TurnStart,
    SkillUsed,
    Charging,
    Missed,
    Evaded,
    Blocked,
    Crit,
    Damage,
    Heal,
    StatusApplied,
    StatusCleared,
    StatChanged,
    EffectApplied,
    EffectExpired,
    Fainted,
    TurnEnd,
    BattleEnd,
    Info,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleEvent {
    pub turn: u32,
    /// Acting side (0/1); None for battle-level events.
    pub side: Option<usize>,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl BattleEvent {
    pub fn new(turn: u32, side: Option<usize>, kind: EventKind, message: String) -> BattleEvent {
        BattleEvent { turn, side, kind, value: None, message, at: Utc::now() }
    }

    pub fn with_value(
        turn: u32,
        side: Option<usize>,
        kind: EventKind,
        value: f64,
        message: String,
    ) -> BattleEvent {
        BattleEvent { turn, side, kind, value: Some(value), message, at: Utc::now() }
    }
}
