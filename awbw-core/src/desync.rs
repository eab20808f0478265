//! Desync detection: compare the board produced by replaying a turn's
//! actions against the next turn's recorded snapshot.
//!
//! Desyncs are data-quality findings, never errors. The recorded snapshot
//! stays authoritative; reports exist so a broken source log can be spotted.

use crate::grid::Coord;
use crate::state::{
    income_buildings, recompute_player_stats, GameState, PlayerId, ReplayBuilding, ReplayUnit, UnitId,
};
use awbw_data::Catalog;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesyncEntry {
    /// In the snapshot, missing from the replayed board.
    UnitAdded { expected: ReplayUnit },
    /// On the replayed board, missing from the snapshot.
    UnitRemoved { actual: ReplayUnit },
    UnitChanged {
        expected: ReplayUnit,
        actual: ReplayUnit,
        fields: Vec<String>,
    },
    BuildingAdded { expected: ReplayBuilding },
    BuildingRemoved { actual: ReplayBuilding },
    BuildingChanged {
        expected: ReplayBuilding,
        actual: ReplayBuilding,
    },
    Funds {
        player: PlayerId,
        expected: i64,
        actual: i64,
    },
    PropertyValue {
        player: PlayerId,
        expected: i64,
        actual: i64,
    },
    Power {
        player: PlayerId,
        expected: i64,
        actual: i64,
    },
}

impl std::fmt::Display for DesyncEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesyncEntry::UnitAdded { expected } => write!(
                f,
                "[UNIT ADDED] {} {} at {}",
                expected.unit_type,
                expected.id,
                describe_position(expected.position)
            ),
            DesyncEntry::UnitRemoved { actual } => write!(
                f,
                "[UNIT REMOVED] {} {} at {}",
                actual.unit_type,
                actual.id,
                describe_position(actual.position)
            ),
            DesyncEntry::UnitChanged {
                expected, fields, ..
            } => write!(
                f,
                "[UNIT CHANGED] {} {}: {}",
                expected.unit_type,
                expected.id,
                fields.join(", ")
            ),
            DesyncEntry::BuildingAdded { expected } => {
                write!(f, "[BUILDING ADDED] {}", expected.position)
            }
            DesyncEntry::BuildingRemoved { actual } => {
                write!(f, "[BUILDING REMOVED] {}", actual.position)
            }
            DesyncEntry::BuildingChanged { expected, actual } => write!(
                f,
                "[BUILDING CHANGED] {}: owner {:?} -> {:?}, terrain {} -> {}, capture {} -> {}",
                expected.position,
                actual.owner,
                expected.owner,
                actual.terrain_id,
                expected.terrain_id,
                actual.capture.get(),
                expected.capture.get()
            ),
            DesyncEntry::Funds {
                player,
                expected,
                actual,
            } => write!(f, "[FUNDS] player {}: expected={}, actual={}", player, expected, actual),
            DesyncEntry::PropertyValue {
                player,
                expected,
                actual,
            } => write!(
                f,
                "[PROPERTY VALUE] player {}: expected={}, actual={}",
                player, expected, actual
            ),
            DesyncEntry::Power {
                player,
                expected,
                actual,
            } => write!(f, "[POWER] player {}: expected={}, actual={}", player, expected, actual),
        }
    }
}

fn describe_position(position: Option<Coord>) -> String {
    position.map_or_else(|| "cargo".to_string(), |p| p.to_string())
}

/// Findings for one turn transition: turn `turn` replayed, compared with
/// the snapshot of turn `turn + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesyncReport {
    pub turn: usize,
    pub day: u32,
    pub entries: Vec<DesyncEntry>,
}

impl DesyncReport {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `player` moves in the turn `state` starts.
fn is_next_to_move(state: &GameState, player: PlayerId) -> bool {
    match &state.active_team {
        Some(team) => state
            .players
            .get(&player)
            .is_some_and(|p| p.team.as_deref() == Some(team.as_str())),
        None => state.active_player == player,
    }
}

/// Turn-start repair and resupply: the next player's units standing on their
/// own properties.
fn serviced_at_turn_start(expected_state: &GameState, unit: &ReplayUnit) -> bool {
    let Some(owner) = unit.player else { return false };
    is_next_to_move(expected_state, owner)
        && unit
            .position
            .and_then(|p| expected_state.try_building(p))
            .is_some_and(|b| b.owner == Some(owner))
}

fn unit_differences(expected_state: &GameState, expected: &ReplayUnit, actual: &ReplayUnit) -> Vec<String> {
    let serviced = serviced_at_turn_start(expected_state, expected);
    let mut fields = Vec::new();
    if expected.unit_type != actual.unit_type {
        fields.push("unit_type".to_string());
    }
    if expected.player != actual.player {
        fields.push("player".to_string());
    }
    if expected.position != actual.position {
        fields.push("position".to_string());
    }
    if !serviced && expected.hit_points != actual.hit_points {
        fields.push(format!(
            "hit_points {} -> {}",
            f32::from(actual.hit_points),
            f32::from(expected.hit_points)
        ));
    }
    if !serviced && expected.ammo != actual.ammo {
        fields.push(format!("ammo {} -> {}", actual.ammo, expected.ammo));
    }
    if expected.hidden != actual.hidden {
        fields.push("hidden".to_string());
    }
    if expected.being_carried != actual.being_carried {
        fields.push("being_carried".to_string());
    }
    let mut expected_cargo = expected.cargo.clone();
    let mut actual_cargo = actual.cargo.clone();
    expected_cargo.sort_unstable();
    actual_cargo.sort_unstable();
    if expected_cargo != actual_cargo {
        fields.push("cargo".to_string());
    }
    fields
}

fn building_matches(expected: &ReplayBuilding, actual: &ReplayBuilding) -> bool {
    expected.owner == actual.owner && expected.terrain_id == actual.terrain_id && expected.capture == actual.capture
}

/// Compare the replayed board `live` with the recorded next-turn snapshot.
#[instrument(skip_all, fields(turn = turn))]
pub fn compute_desync(
    turn: usize,
    live: &GameState,
    expected: &GameState,
    catalog: &Catalog,
    funds_per_building: i64,
) -> DesyncReport {
    let mut entries = Vec::new();

    for (id, actual) in &live.units {
        match expected.units.get(id) {
            None => entries.push(DesyncEntry::UnitRemoved {
                actual: actual.clone(),
            }),
            Some(recorded) => {
                let fields = unit_differences(expected, recorded, actual);
                if !fields.is_empty() {
                    entries.push(DesyncEntry::UnitChanged {
                        expected: recorded.clone(),
                        actual: actual.clone(),
                        fields,
                    });
                }
            }
        }
    }
    let missing: Vec<UnitId> = expected
        .units
        .keys()
        .filter(|id| !live.units.contains_key(id))
        .copied()
        .collect();
    for id in missing {
        entries.push(DesyncEntry::UnitAdded {
            expected: expected.units[&id].clone(),
        });
    }

    for (at, actual) in &live.buildings {
        match expected.buildings.get(at) {
            None => entries.push(DesyncEntry::BuildingRemoved {
                actual: actual.clone(),
            }),
            Some(recorded) if !building_matches(recorded, actual) => {
                entries.push(DesyncEntry::BuildingChanged {
                    expected: recorded.clone(),
                    actual: actual.clone(),
                })
            }
            Some(_) => {}
        }
    }
    for (at, recorded) in &expected.buildings {
        if !live.buildings.contains_key(at) {
            entries.push(DesyncEntry::BuildingAdded {
                expected: recorded.clone(),
            });
        }
    }

    let live_stats = recompute_player_stats(live, catalog, funds_per_building);
    let expected_stats = recompute_player_stats(expected, catalog, funds_per_building);
    for (id, recorded) in &expected.players {
        let Some(actual) = live.players.get(id) else {
            continue;
        };

        // The next player has been paid their income already.
        let actual_funds = if is_next_to_move(expected, *id) && !recorded.is_eliminated() {
            actual.funds + funds_per_building * income_buildings(live, catalog, *id) as i64
        } else {
            actual.funds
        };
        if actual_funds != recorded.funds {
            entries.push(DesyncEntry::Funds {
                player: *id,
                expected: recorded.funds,
                actual: actual_funds,
            });
        }

        let expected_value = expected_stats.get(id).map_or(0, |s| s.property_value);
        let actual_value = live_stats.get(id).map_or(0, |s| s.property_value);
        if expected_value != actual_value {
            entries.push(DesyncEntry::PropertyValue {
                player: *id,
                expected: expected_value,
                actual: actual_value,
            });
        }

        if recorded.power != actual.power {
            entries.push(DesyncEntry::Power {
                player: *id,
                expected: recorded.power,
                actual: actual.power,
            });
        }
    }

    DesyncReport {
        turn,
        day: live.day,
        entries,
    }
}

/// Human-readable summary of every turn transition checked.
pub fn print_report(reports: &[DesyncReport], writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(writer, "\n=== Desync Report ===")?;
    writeln!(writer)?;

    let desynced: Vec<_> = reports.iter().filter(|r| !r.is_clean()).collect();
    writeln!(
        writer,
        "Turns checked: {} | Clean: {} | Desynced: {}",
        reports.len(),
        reports.len() - desynced.len(),
        desynced.len()
    )?;
    writeln!(writer)?;

    for report in desynced {
        writeln!(
            writer,
            "--- Turn {} (day {}): {} differences ---",
            report.turn,
            report.day,
            report.entries.len()
        )?;
        for entry in &report.entries {
            writeln!(writer, "{}", entry)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

pub fn json_report(reports: &[DesyncReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}
