//! Tile graph for movement-cost searches.

use crate::grid::Coord;
use crate::state::ReplayMap;
use awbw_data::{Catalog, MovementType};
use game_pathfinding::{AStar, Dijkstra, Graph};
use std::collections::HashMap;

/// A map seen as a graph: 4-adjacent tiles, entering a tile costs its
/// terrain's movement cost for the context movement type.
pub struct TerrainGraph<'a> {
    map: &'a ReplayMap,
    catalog: &'a Catalog,
}

impl<'a> TerrainGraph<'a> {
    pub fn new(map: &'a ReplayMap, catalog: &'a Catalog) -> Self {
        Self { map, catalog }
    }

    /// Cost of entering `coord`, `None` when off the map or impassable.
    pub fn entry_cost(&self, coord: Coord, movement: MovementType) -> Option<u32> {
        let terrain = self.map.terrain_at(coord)?;
        self.catalog.terrain(terrain)?.movement_cost(movement)
    }

    /// Cheapest cost to every tile reachable from `start` within `budget`.
    pub fn costs_from(&self, start: Coord, movement: MovementType, budget: u32) -> HashMap<Coord, u32> {
        Dijkstra::costs_within(self, start, budget, &movement)
    }

    pub fn path(&self, from: Coord, to: Coord, movement: MovementType) -> Option<(Vec<Coord>, u32)> {
        AStar::find_path(self, from, to, &movement)
    }
}

impl Graph<Coord, MovementType> for TerrainGraph<'_> {
    fn neighbors(&self, node: Coord, movement: &MovementType) -> Vec<Coord> {
        node.neighbours()
            .into_iter()
            .filter(|n| self.entry_cost(*n, *movement).is_some())
            .collect()
    }

    fn cost(&self, _from: Coord, to: Coord, movement: &MovementType) -> u32 {
        self.entry_cost(to, *movement).unwrap_or(u32::MAX)
    }

    // Every passable tile costs at least 1.
    fn heuristic(&self, from: Coord, target: Coord, _movement: &MovementType) -> u32 {
        from.manhattan(target)
    }
}
