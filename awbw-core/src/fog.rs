//! Fog of war.
//!
//! Each tile is in one of three states from a viewer's perspective:
//! - Hidden: nothing on it is shown
//! - AirUnitsOnly: only flying units are shown (woods and reefs seen from afar)
//! - AllVisible
//!
//! A team viewer sees the union of what each teammate sees.

use crate::config::EngineConfig;
use crate::grid::Coord;
use crate::powers::PowerLog;
use crate::state::{GameState, PlayerId, ReplayUnit, Weather};
use awbw_data::Catalog;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Ordered from least to most visible; union takes the maximum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Hidden = 0,
    AirUnitsOnly = 1,
    AllVisible = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FogViewer {
    Player(PlayerId),
    Team(String),
}

impl FogViewer {
    /// Whoever is taking the current turn.
    pub fn active(state: &GameState) -> Self {
        match &state.active_team {
            Some(team) => FogViewer::Team(team.clone()),
            None => FogViewer::Player(state.active_player),
        }
    }

    pub fn players(&self, state: &GameState) -> Vec<PlayerId> {
        match self {
            FogViewer::Player(id) => vec![*id],
            FogViewer::Team(team) => state.team_members(team),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogGrid {
    width: u32,
    height: u32,
    tiles: Vec<Visibility>,
}

impl FogGrid {
    pub fn new(width: u32, height: u32, fill: Visibility) -> Self {
        Self {
            width,
            height,
            tiles: vec![fill; (width * height) as usize],
        }
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x as u32 >= self.width || coord.y as u32 >= self.height {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    /// Off-grid tiles are Hidden.
    pub fn get(&self, coord: Coord) -> Visibility {
        self.index(coord)
            .map_or(Visibility::Hidden, |i| self.tiles[i])
    }

    /// Raise a tile to at least `visibility`; never lowers it.
    fn raise(&mut self, coord: Coord, visibility: Visibility) {
        if let Some(i) = self.index(coord) {
            if self.tiles[i] < visibility {
                self.tiles[i] = visibility;
            }
        }
    }

    pub fn union_with(&mut self, other: &FogGrid) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (mine, theirs) in self.tiles.iter_mut().zip(&other.tiles) {
            *mine = (*mine).max(*theirs);
        }
    }

    pub fn visible_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|v| **v == Visibility::AllVisible)
            .count()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major `0/1/2` bytes for the presentation layer.
    pub fn to_byte_raster(&self) -> Vec<u8> {
        self.tiles.iter().map(|v| *v as u8).collect()
    }
}

/// Recompute the grid for `viewer`. Pure: the same inputs give the same grid.
#[instrument(skip_all, fields(viewer = ?viewer))]
pub fn compute_fog(
    state: &GameState,
    catalog: &Catalog,
    viewer: &FogViewer,
    fog_enabled: bool,
    powers: &PowerLog,
    config: &EngineConfig,
) -> FogGrid {
    let (width, height) = (state.map.width, state.map.height);
    if !fog_enabled {
        return FogGrid::new(width, height, Visibility::AllVisible);
    }

    let players = viewer.players(state);
    if players.is_empty() {
        log::warn!("Fog viewer {:?} has no players", viewer);
    }
    let mut grid = FogGrid::new(width, height, Visibility::Hidden);
    for player in players {
        grid.union_with(&player_fog(state, catalog, player, powers, config));
    }
    grid
}

fn player_fog(state: &GameState, catalog: &Catalog, player: PlayerId, powers: &PowerLog, config: &EngineConfig) -> FogGrid {
    let mut grid = FogGrid::new(state.map.width, state.map.height, Visibility::Hidden);

    for building in state.buildings.values().filter(|b| b.owner == Some(player)) {
        grid.raise(building.position, Visibility::AllVisible);
    }

    let see_hidden = powers.sees_hidden_tiles(player);
    let weather_penalty = if state.weather == Weather::Rain {
        config.rain_vision_penalty
    } else {
        0
    };

    for unit in state.units.values() {
        if unit.player != Some(player) || unit.being_carried {
            continue;
        }
        let Some(origin) = unit.position else { continue };
        let Some(data) = catalog.unit(&unit.unit_type) else {
            log::warn!("Unit {} has unknown type {}", unit.id, unit.unit_type);
            continue;
        };

        let mut vision = (data.vision + powers.vision_bonus(player) - weather_penalty).max(1);
        if !data.is_air() {
            let sight = state
                .terrain_at(origin)
                .and_then(|t| catalog.terrain(t))
                .map_or(0, |t| t.sight_increase);
            vision = (vision + sight).max(0);
        }

        for tile in origin.diamond(vision as u32) {
            if !state.map.contains(tile) {
                continue;
            }
            let limit = state
                .terrain_at(tile)
                .and_then(|t| catalog.terrain(t))
                .map_or(0, |t| t.fog_sight_limit);
            if limit > 0 && tile.manhattan(origin) > limit && !see_hidden {
                grid.raise(tile, Visibility::AirUnitsOnly);
            } else {
                grid.raise(tile, Visibility::AllVisible);
            }
        }
    }

    grid
}

/// Whether `unit` should be drawn for `viewer`.
///
/// Own and allied units always are. Hidden enemies only show next to one of
/// the viewer's units; air units show on AirUnitsOnly tiles.
pub fn is_unit_visible(
    state: &GameState,
    catalog: &Catalog,
    fog: &FogGrid,
    viewer: &FogViewer,
    unit: &ReplayUnit,
) -> bool {
    let viewers = viewer.players(state);
    if let Some(owner) = unit.player {
        if viewers.iter().any(|v| state.are_allies(*v, owner)) {
            return true;
        }
    }
    if unit.being_carried {
        return false;
    }
    let Some(position) = unit.position else {
        return false;
    };

    if unit.hidden {
        return state.units.values().any(|u| {
            !u.being_carried
                && u.player.is_some_and(|p| viewers.contains(&p))
                && u.position.is_some_and(|p| p.manhattan(position) == 1)
        });
    }

    match fog.get(position) {
        Visibility::AllVisible => true,
        Visibility::AirUnitsOnly => catalog.unit(&unit.unit_type).is_some_and(|d| d.is_air()),
        Visibility::Hidden => false,
    }
}
