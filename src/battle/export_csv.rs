//! Battle trace export: flattens the event log into CSV for spreadsheet
//! comparison of fights (one row per event, summary block at the top).

use std::io;

use crate::battle::events::BattleEvent;
use crate::battle::turn::Battle;

/// Serialize one battle's trace as CSV. Columns: turn, side, kind, value,
/// message, timestamp.
pub fn events_to_csv(events: &[BattleEvent]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["turn", "side", "kind", "value", "message", "at"])?;
    for event in events {
        writer.write_record([
            event.turn.to_string(),
            event.side.map(|s| s.to_string()).unwrap_or_default(),
            format!("{:?}", event.kind),
            event.value.map(|v| v.to_string()).unwrap_or_default(),
            event.message.clone(),
            event.at.to_rfc3339(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| csv::Error::from(io::Error::other(e.to_string())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// CSV with a two-line summary header (battle id, combatants, winner) before
/// the event rows.
pub fn battle_to_csv(battle: &Battle) -> Result<String, csv::Error> {
    let winner = match battle.winner {
        Some(side) => battle.pets[side].name.clone(),
        None if battle.over => "draw".to_string(),
        None => "in progress".to_string(),
    };
    let header = format!(
        "# battle {}\n# {} vs {} | turns {} | winner {}\n",
        battle.id, battle.pets[0].name, battle.pets[1].name, battle.turn, winner
    );
    Ok(format!("{header}{}", events_to_csv(&battle.events)?))
}
