use crate::bounded::{CaptureProgress, HitPoints};
use crate::error::NotFound;
use crate::grid::Coord;
use awbw_data::Catalog;
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use awbw_data::{CoId, CountryId, TerrainId};

pub type UnitId = u64;
pub type PlayerId = u64;

/// One unit as recorded in a turn snapshot or action payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayUnit {
    pub id: UnitId,
    /// Unit code, key into the unit catalog.
    pub unit_type: String,
    /// `None` while a unit is being built.
    pub player: Option<PlayerId>,
    /// `None` while carried by a transport.
    pub position: Option<Coord>,
    #[serde(default)]
    pub hit_points: HitPoints,
    #[serde(default)]
    pub ammo: i32,
    #[serde(default)]
    pub fuel: i32,
    #[serde(default)]
    pub times_moved: u32,
    #[serde(default)]
    pub capturing: bool,
    /// Submerged or stealthed.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub being_carried: bool,
    /// Ids of loaded units, transports only.
    #[serde(default)]
    pub cargo: Vec<UnitId>,
}

impl ReplayUnit {
    pub fn value(&self, cost: i64) -> i64 {
        self.hit_points.value_of(cost)
    }
}

/// A property tile. Never moves; keyed by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayBuilding {
    pub position: Coord,
    pub terrain_id: TerrainId,
    pub owner: Option<PlayerId>,
    #[serde(default)]
    pub capture: CaptureProgress,
    /// Progress before the most recent capture step.
    #[serde(default)]
    pub last_capture: CaptureProgress,
    /// Already produced a unit this turn.
    #[serde(default)]
    pub has_acted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Snow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerKind {
    #[default]
    None,
    Normal,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCo {
    pub co: CoId,
    pub power: i64,
}

/// Authoritative per-player state. Derived counts live in [`PlayerStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub username: String,
    pub round_order: u32,
    pub team: Option<String>,
    pub eliminated_on: Option<u32>,
    pub country: CountryId,
    pub funds: i64,
    pub co: CoId,
    /// Current power meter.
    pub power: i64,
    pub required_power: Option<i64>,
    pub required_super_power: Option<i64>,
    pub active_power: PowerKind,
    pub tag: Option<TagCo>,
}

impl PlayerState {
    pub fn is_eliminated(&self) -> bool {
        self.eliminated_on.is_some()
    }
}

/// Terrain layout of a map. Buildings override the terrain of their tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major, `width * height` entries.
    pub terrain: Vec<TerrainId>,
}

impl ReplayMap {
    pub fn contains(&self, coord: Coord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }

    pub fn index_of(&self, coord: Coord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub fn terrain_at(&self, coord: Coord) -> Option<TerrainId> {
        self.index_of(coord).and_then(|i| self.terrain.get(i).copied())
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Coord::new(x, y)))
    }
}

/// Tiles that need an explosion effect after units were removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedUnits {
    pub ids: Vec<UnitId>,
    pub explosions: Vec<Coord>,
}

/// The live board for one point in a replay.
///
/// Maps are `im::OrdMap` so snapshots clone in O(1) and iterate in id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub map: Arc<ReplayMap>,
    pub day: u32,
    pub active_player: PlayerId,
    /// Set when the turn belongs to a whole team.
    pub active_team: Option<String>,
    pub weather: Weather,
    pub units: OrdMap<UnitId, ReplayUnit>,
    pub buildings: OrdMap<Coord, ReplayBuilding>,
    pub players: OrdMap<PlayerId, PlayerState>,
}

impl GameState {
    pub fn new(map: Arc<ReplayMap>) -> Self {
        Self {
            map,
            day: 1,
            active_player: 0,
            active_team: None,
            weather: Weather::Clear,
            units: OrdMap::new(),
            buildings: OrdMap::new(),
            players: OrdMap::new(),
        }
    }

    pub fn try_unit(&self, id: UnitId) -> Option<&ReplayUnit> {
        self.units.get(&id)
    }

    pub fn unit(&self, id: UnitId) -> Result<&ReplayUnit, NotFound> {
        self.try_unit(id).ok_or(NotFound::Unit(id))
    }

    /// The non-carried unit standing on `coord`.
    pub fn try_unit_at(&self, coord: Coord) -> Option<&ReplayUnit> {
        self.units
            .values()
            .find(|u| !u.being_carried && u.position == Some(coord))
    }

    pub fn unit_at(&self, coord: Coord) -> Result<&ReplayUnit, NotFound> {
        self.try_unit_at(coord).ok_or(NotFound::UnitAt(coord))
    }

    pub fn try_building(&self, coord: Coord) -> Option<&ReplayBuilding> {
        self.buildings.get(&coord)
    }

    pub fn building(&self, coord: Coord) -> Result<&ReplayBuilding, NotFound> {
        self.try_building(coord).ok_or(NotFound::Building(coord))
    }

    pub fn player(&self, id: PlayerId) -> Result<&PlayerState, NotFound> {
        self.players.get(&id).ok_or(NotFound::Player(id))
    }

    /// Terrain of a tile, taking the building standing on it into account.
    pub fn terrain_at(&self, coord: Coord) -> Option<TerrainId> {
        match self.buildings.get(&coord) {
            Some(building) => Some(building.terrain_id),
            None => self.map.terrain_at(coord),
        }
    }

    /// Overwrite-or-insert. Returns `true` when the unit was new.
    pub fn apply_unit_delta(&mut self, unit: ReplayUnit) -> bool {
        self.units.insert(unit.id, unit).is_none()
    }

    /// Remove a unit and, recursively, everything it carries.
    ///
    /// Does not draw anything: the tiles that should show an explosion are
    /// reported back when `caused_explosion` is set.
    pub fn remove_unit(&mut self, id: UnitId, caused_explosion: bool) -> Result<RemovedUnits, NotFound> {
        let unit = self.units.remove(&id).ok_or(NotFound::Unit(id))?;
        let mut removed = RemovedUnits::default();
        if caused_explosion {
            if let Some(position) = unit.position {
                removed.explosions.push(position);
            }
        }
        removed.ids.push(id);

        if unit.being_carried {
            let carriers: Vec<UnitId> = self
                .units
                .values()
                .filter(|t| t.cargo.contains(&id))
                .map(|t| t.id)
                .collect();
            for carrier in carriers {
                if let Some(transport) = self.units.get_mut(&carrier) {
                    transport.cargo.retain(|c| *c != id);
                }
            }
        }

        let mut pending = unit.cargo;
        while let Some(cargo_id) = pending.pop() {
            if let Some(cargo) = self.units.remove(&cargo_id) {
                removed.ids.push(cargo_id);
                pending.extend(cargo.cargo);
            }
        }

        Ok(removed)
    }

    /// Insert or replace a building record.
    ///
    /// An ownership change clears the capture progress back to full, keeping
    /// the incoming progress as `last_capture`. A new turn clears `has_acted`.
    pub fn update_building(&mut self, delta: ReplayBuilding, is_new_turn: bool) {
        let mut building = delta;
        if let Some(existing) = self.buildings.get(&building.position) {
            if existing.owner != building.owner {
                building.last_capture = building.capture;
                building.capture = CaptureProgress::full();
            }
        }
        if is_new_turn {
            building.has_acted = false;
        }
        self.buildings.insert(building.position, building);
    }

    /// Players on the given team, in id order.
    pub fn team_members(&self, team: &str) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.team.as_deref() == Some(team))
            .map(|p| p.id)
            .collect()
    }

    pub fn are_allies(&self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return true;
        }
        match (self.players.get(&a), self.players.get(&b)) {
            (Some(pa), Some(pb)) => pa.team.is_some() && pa.team == pb.team,
            _ => false,
        }
    }
}

/// Derived per-player numbers. Recomputed after every mutation, never stored
/// as ground truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub unit_count: u32,
    pub unit_value: i64,
    pub income_buildings: u32,
    pub property_value: i64,
}

/// Income-producing buildings owned by `player`.
pub fn income_buildings(state: &GameState, catalog: &Catalog, player: PlayerId) -> u32 {
    state
        .buildings
        .values()
        .filter(|b| b.owner == Some(player))
        .filter(|b| catalog.building(b.terrain_id).is_some_and(|d| d.gives_funds))
        .count() as u32
}

pub fn recompute_player_stats(
    state: &GameState,
    catalog: &Catalog,
    funds_per_building: i64,
) -> BTreeMap<PlayerId, PlayerStats> {
    let mut stats: BTreeMap<PlayerId, PlayerStats> = state
        .players
        .keys()
        .map(|id| (*id, PlayerStats::default()))
        .collect();

    for unit in state.units.values() {
        let Some(owner) = unit.player else { continue };
        let entry = stats.entry(owner).or_default();
        entry.unit_count += 1;
        match catalog.unit(&unit.unit_type) {
            Some(data) => entry.unit_value += unit.value(data.cost),
            None => log::warn!("Unit {} has unknown type {}", unit.id, unit.unit_type),
        }
    }

    for building in state.buildings.values() {
        let Some(owner) = building.owner else { continue };
        if catalog
            .building(building.terrain_id)
            .is_some_and(|d| d.gives_funds)
        {
            let entry = stats.entry(owner).or_default();
            entry.income_buildings += 1;
            entry.property_value += funds_per_building;
        }
    }

    stats
}
