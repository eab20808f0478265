//! Fully-parsed replay data handed to the engine by the loading layer.

use crate::action::Action;
use crate::error::ReplayError;
use crate::grid::Coord;
use crate::state::{
    CoId, CountryId, GameState, PlayerId, PlayerState, PowerKind, ReplayBuilding, ReplayMap,
    ReplayUnit, TagCo, UnitId, Weather,
};
use awbw_data::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Static per-player information that does not change between turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub username: String,
    pub round_order: u32,
    #[serde(default)]
    pub team: Option<String>,
    pub country: CountryId,
    pub co: CoId,
    #[serde(default)]
    pub tag_co: Option<CoId>,
    #[serde(default)]
    pub eliminated_on: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayInfo {
    pub id: u64,
    pub name: String,
    pub players: BTreeMap<PlayerId, PlayerRecord>,
    pub fog: bool,
    pub funds_per_building: i64,
}

/// Per-player values recorded at the start of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTurnState {
    pub funds: i64,
    #[serde(default)]
    pub power: i64,
    #[serde(default)]
    pub required_power: Option<i64>,
    #[serde(default)]
    pub required_super_power: Option<i64>,
    #[serde(default)]
    pub active_power: PowerKind,
    #[serde(default)]
    pub tag_power: Option<i64>,
    #[serde(default)]
    pub eliminated: bool,
}

/// Authoritative snapshot of one turn plus the actions played in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnData {
    pub day: u32,
    pub active_player: PlayerId,
    #[serde(default)]
    pub active_team: Option<String>,
    pub players: BTreeMap<PlayerId, PlayerTurnState>,
    pub units: BTreeMap<UnitId, ReplayUnit>,
    pub buildings: Vec<ReplayBuilding>,
    /// `None` slots mark actions the source log could not provide.
    #[serde(default)]
    pub actions: Vec<Option<Action>>,
    #[serde(default)]
    pub weather: Weather,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayData {
    pub info: ReplayInfo,
    pub turns: Vec<TurnData>,
}

impl TurnData {
    /// Build the live board for this turn's starting snapshot.
    pub fn to_game_state(&self, info: &ReplayInfo, map: Arc<ReplayMap>) -> Result<GameState, ReplayError> {
        let mut state = GameState::new(map);
        state.day = self.day;
        state.active_player = self.active_player;
        state.active_team = self.active_team.clone();
        state.weather = self.weather;

        for (id, record) in &info.players {
            let turn_state = self.players.get(id).ok_or_else(|| {
                ReplayError::malformed(format!(
                    "day {}: no turn state for player {} ({})",
                    self.day, id, record.username
                ))
            })?;
            let eliminated_on = match (turn_state.eliminated, record.eliminated_on) {
                (false, _) => None,
                (true, Some(day)) => Some(day),
                (true, None) => Some(self.day),
            };
            state.players.insert(
                *id,
                PlayerState {
                    id: *id,
                    username: record.username.clone(),
                    round_order: record.round_order,
                    team: record.team.clone(),
                    eliminated_on,
                    country: record.country,
                    funds: turn_state.funds,
                    co: record.co,
                    power: turn_state.power,
                    required_power: turn_state.required_power,
                    required_super_power: turn_state.required_super_power,
                    active_power: turn_state.active_power,
                    tag: record.tag_co.map(|co| TagCo {
                        co,
                        power: turn_state.tag_power.unwrap_or(0),
                    }),
                },
            );
        }

        for (id, unit) in &self.units {
            if *id != unit.id {
                return Err(ReplayError::malformed(format!(
                    "day {}: unit keyed {} carries id {}",
                    self.day, id, unit.id
                )));
            }
            state.units.insert(*id, unit.clone());
        }
        for building in &self.buildings {
            state.buildings.insert(building.position, building.clone());
        }

        Ok(state)
    }

    /// Check this snapshot against the catalogs and the map.
    pub fn validate(&self, info: &ReplayInfo, map: &ReplayMap, catalog: &Catalog) -> Result<(), ReplayError> {
        let fail = |reason: String| Err(ReplayError::malformed(format!("day {}: {}", self.day, reason)));

        if !info.players.contains_key(&self.active_player) {
            return fail(format!("active player {} is not in the replay", self.active_player));
        }

        let mut occupied: BTreeSet<Coord> = BTreeSet::new();
        for unit in self.units.values() {
            catalog.require_unit(&unit.unit_type)?;
            if let Some(owner) = unit.player {
                if !info.players.contains_key(&owner) {
                    return fail(format!("unit {} owned by unknown player {}", unit.id, owner));
                }
            }
            match unit.position {
                Some(pos) if !map.contains(pos) => {
                    return fail(format!("unit {} is off the map at {}", unit.id, pos));
                }
                Some(pos) if !unit.being_carried && !occupied.insert(pos) => {
                    return fail(format!("two units share tile {}", pos));
                }
                _ => {}
            }
            for cargo in &unit.cargo {
                if !self.units.contains_key(cargo) {
                    return fail(format!("unit {} carries missing unit {}", unit.id, cargo));
                }
            }
        }

        for building in &self.buildings {
            if !map.contains(building.position) {
                return fail(format!("building off the map at {}", building.position));
            }
            if catalog.building(building.terrain_id).is_none() {
                catalog.require_terrain(building.terrain_id)?;
                return fail(format!(
                    "terrain {} at {} is not a building",
                    building.terrain_id, building.position
                ));
            }
        }

        for action in self.actions.iter().flatten() {
            for code in action.unit_types() {
                catalog.require_unit(code)?;
            }
        }

        Ok(())
    }
}

impl ReplayInfo {
    pub fn validate(&self, catalog: &Catalog) -> Result<(), ReplayError> {
        if self.players.is_empty() {
            return Err(ReplayError::malformed("replay has no players"));
        }
        for record in self.players.values() {
            catalog.require_co(record.co)?;
            catalog.require_country(record.country)?;
            if let Some(tag) = record.tag_co {
                catalog.require_co(tag)?;
            }
        }
        Ok(())
    }
}

pub fn validate_map(map: &ReplayMap, catalog: &Catalog) -> Result<(), ReplayError> {
    let expected = map.width as usize * map.height as usize;
    if map.terrain.len() != expected {
        return Err(ReplayError::malformed(format!(
            "map {} has {} tiles, expected {}x{}",
            map.name,
            map.terrain.len(),
            map.width,
            map.height
        )));
    }
    let unknown: BTreeSet<_> = map
        .terrain
        .iter()
        .filter(|id| catalog.terrain(**id).is_none())
        .collect();
    if let Some(id) = unknown.into_iter().next() {
        catalog.require_terrain(*id)?;
    }
    Ok(())
}
