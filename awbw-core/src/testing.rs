use crate::action::Action;
use crate::bounded::CaptureProgress;
use crate::grid::Coord;
use crate::input::{PlayerRecord, PlayerTurnState, ReplayData, ReplayInfo, TurnData};
use crate::state::{
    CoId, CountryId, GameState, PlayerId, PlayerState, PowerKind, ReplayBuilding, ReplayMap,
    ReplayUnit, TerrainId, UnitId, Weather,
};
use awbw_data::Catalog;
use std::collections::BTreeMap;
use std::sync::Arc;

const PLAIN: TerrainId = 1;

fn plain_map(width: u32, height: u32) -> ReplayMap {
    ReplayMap {
        name: format!("{}x{} test map", width, height),
        width,
        height,
        terrain: vec![PLAIN; (width * height) as usize],
    }
}

/// A full-health unit with catalog ammo and fuel.
pub fn unit(id: UnitId, code: &str, player: PlayerId, (x, y): (i32, i32)) -> ReplayUnit {
    let catalog = Catalog::standard();
    let data = catalog.unit(code);
    ReplayUnit {
        id,
        unit_type: code.to_string(),
        player: Some(player),
        position: Some(Coord::new(x, y)),
        hit_points: Default::default(),
        ammo: data.map_or(0, |d| d.max_ammo),
        fuel: data.map_or(99, |d| d.max_fuel),
        times_moved: 0,
        capturing: false,
        hidden: false,
        being_carried: false,
        cargo: Vec::new(),
    }
}

pub struct GameStateBuilder {
    state: GameState,
}

impl GameStateBuilder {
    /// All-plains map, day 1, no players.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: GameState::new(Arc::new(plain_map(width, height))),
        }
    }

    pub fn day(mut self, day: u32) -> Self {
        self.state.day = day;
        self
    }

    pub fn active_player(mut self, id: PlayerId) -> Self {
        self.state.active_player = id;
        self
    }

    pub fn weather(mut self, weather: Weather) -> Self {
        self.state.weather = weather;
        self
    }

    pub fn with_terrain(mut self, (x, y): (i32, i32), terrain: TerrainId) -> Self {
        let map = Arc::make_mut(&mut self.state.map);
        if let Some(i) = map.index_of(Coord::new(x, y)) {
            map.terrain[i] = terrain;
        }
        self
    }

    /// Adds a player running Andy. The first player added is active.
    pub fn with_player(mut self, id: PlayerId, country: CountryId) -> Self {
        if self.state.players.is_empty() {
            self.state.active_player = id;
        }
        let round_order = self.state.players.len() as u32 + 1;
        self.state.players.insert(
            id,
            PlayerState {
                id,
                username: format!("player{}", id),
                round_order,
                team: None,
                eliminated_on: None,
                country,
                funds: 0,
                co: 1,
                power: 0,
                required_power: Some(90_000),
                required_super_power: Some(180_000),
                active_power: PowerKind::None,
                tag: None,
            },
        );
        self
    }

    fn with_player_mut(mut self, id: PlayerId, f: impl FnOnce(&mut PlayerState)) -> Self {
        if let Some(player) = self.state.players.get_mut(&id) {
            f(player);
        }
        self
    }

    pub fn with_team(self, id: PlayerId, team: &str) -> Self {
        self.with_player_mut(id, |p| p.team = Some(team.to_string()))
    }

    pub fn with_funds(self, id: PlayerId, funds: i64) -> Self {
        self.with_player_mut(id, |p| p.funds = funds)
    }

    pub fn with_co(self, id: PlayerId, co: CoId) -> Self {
        self.with_player_mut(id, |p| p.co = co)
    }

    pub fn with_unit(mut self, id: UnitId, code: &str, player: PlayerId, at: (i32, i32)) -> Self {
        self.state.units.insert(id, unit(id, code, player, at));
        self
    }

    /// Same as [`with_unit`](Self::with_unit) with the unit already modified.
    pub fn with_unit_where(
        mut self,
        id: UnitId,
        code: &str,
        player: PlayerId,
        at: (i32, i32),
        f: impl FnOnce(&mut ReplayUnit),
    ) -> Self {
        let mut u = unit(id, code, player, at);
        f(&mut u);
        self.state.units.insert(id, u);
        self
    }

    /// A unit loaded into an existing transport.
    pub fn with_carried_unit(mut self, id: UnitId, code: &str, player: PlayerId, transport: UnitId) -> Self {
        let mut cargo = unit(id, code, player, (0, 0));
        cargo.position = None;
        cargo.being_carried = true;
        self.state.units.insert(id, cargo);
        if let Some(t) = self.state.units.get_mut(&transport) {
            t.cargo.push(id);
        }
        self
    }

    /// Places a building and paints its terrain onto the map.
    pub fn with_building(mut self, at: (i32, i32), terrain: TerrainId, owner: Option<PlayerId>) -> Self {
        let position = Coord::new(at.0, at.1);
        self.state.buildings.insert(
            position,
            ReplayBuilding {
                position,
                terrain_id: terrain,
                owner,
                capture: CaptureProgress::full(),
                last_capture: CaptureProgress::full(),
                has_acted: false,
            },
        );
        self.with_terrain(at, terrain)
    }

    pub fn build(self) -> GameState {
        self.state
    }
}

/// Turn snapshot of `state` with the given action list.
pub fn turn_from_state(state: &GameState, actions: Vec<Option<Action>>) -> TurnData {
    TurnData {
        day: state.day,
        active_player: state.active_player,
        active_team: state.active_team.clone(),
        players: state
            .players
            .values()
            .map(|p| {
                (
                    p.id,
                    PlayerTurnState {
                        funds: p.funds,
                        power: p.power,
                        required_power: p.required_power,
                        required_super_power: p.required_super_power,
                        active_power: p.active_power,
                        tag_power: p.tag.as_ref().map(|t| t.power),
                        eliminated: p.is_eliminated(),
                    },
                )
            })
            .collect(),
        units: state.units.iter().map(|(id, u)| (*id, u.clone())).collect(),
        buildings: state.buildings.values().cloned().collect(),
        actions,
        weather: state.weather,
    }
}

/// Assembles a replay from hand-built turn snapshots.
///
/// Player records and the map come from the first snapshot.
pub struct ReplayBuilder {
    fog: bool,
    funds_per_building: i64,
    turns: Vec<(GameState, Vec<Option<Action>>)>,
}

impl ReplayBuilder {
    pub fn new() -> Self {
        Self {
            fog: false,
            funds_per_building: 1000,
            turns: Vec::new(),
        }
    }

    pub fn fog(mut self, fog: bool) -> Self {
        self.fog = fog;
        self
    }

    pub fn funds_per_building(mut self, funds: i64) -> Self {
        self.funds_per_building = funds;
        self
    }

    pub fn turn(mut self, snapshot: GameState, actions: Vec<Action>) -> Self {
        self.turns
            .push((snapshot, actions.into_iter().map(Some).collect()));
        self
    }

    /// A turn whose action list may contain empty slots.
    pub fn turn_with_slots(mut self, snapshot: GameState, actions: Vec<Option<Action>>) -> Self {
        self.turns.push((snapshot, actions));
        self
    }

    pub fn build(self) -> (ReplayData, ReplayMap) {
        let first = self
            .turns
            .first()
            .map(|(state, _)| state.clone())
            .unwrap_or_else(|| GameState::new(Arc::new(plain_map(1, 1))));
        let players: BTreeMap<PlayerId, PlayerRecord> = first
            .players
            .values()
            .map(|p| {
                (
                    p.id,
                    PlayerRecord {
                        id: p.id,
                        username: p.username.clone(),
                        round_order: p.round_order,
                        team: p.team.clone(),
                        country: p.country,
                        co: p.co,
                        tag_co: p.tag.as_ref().map(|t| t.co),
                        eliminated_on: None,
                    },
                )
            })
            .collect();
        let data = ReplayData {
            info: ReplayInfo {
                id: 1,
                name: "fixture".to_string(),
                players,
                fog: self.fog,
                funds_per_building: self.funds_per_building,
            },
            turns: self
                .turns
                .iter()
                .map(|(state, actions)| turn_from_state(state, actions.clone()))
                .collect(),
        };
        (data, (*first.map).clone())
    }
}

impl Default for ReplayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let state = GameStateBuilder::new(4, 4)
            .with_player(1, 1)
            .with_player(2, 2)
            .with_funds(2, 5000)
            .with_unit(1, "Infantry", 1, (0, 0))
            .with_building((3, 3), 47, Some(2))
            .build();

        assert_eq!(state.active_player, 1);
        assert_eq!(state.players[&2].funds, 5000);
        assert_eq!(state.players[&2].round_order, 2);
        assert_eq!(state.units[&1].fuel, 99);
        assert_eq!(state.map.terrain_at(Coord::new(3, 3)), Some(47));
    }

    #[test]
    fn test_replay_builder_round_trips_snapshot() {
        let state = GameStateBuilder::new(3, 3)
            .with_player(1, 1)
            .with_unit(5, "Tank", 1, (1, 1))
            .build();
        let (data, map) = ReplayBuilder::new().turn(state.clone(), vec![]).build();

        let rebuilt = data.turns[0]
            .to_game_state(&data.info, Arc::new(map))
            .unwrap();
        assert_eq!(rebuilt, state);
    }
}
