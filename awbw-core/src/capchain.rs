//! Capture-chain planning for the map overlay.
//!
//! Predicts which neutral properties each army grabs early on, assuming every
//! factory builds one capturer per day and each capturer walks greedily to
//! the nearest property its army is expected to win.
//!
//! Armies are the countries implied by the terrain ids of owned factories.
//! Unreachable properties are simply left out, never reported as errors.

use crate::config::PlannerConfig;
use crate::grid::Coord;
use crate::movement::TerrainGraph;
use crate::state::{CountryId, GameState, ReplayMap};
use awbw_data::{BuildingKind, Catalog, CatalogError, MovementType};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyClass {
    Factory,
    Income,
}

#[derive(Debug, Clone, Copy)]
struct Property {
    coord: Coord,
    class: PropertyClass,
    owner: Option<CountryId>,
}

/// One capture in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapStop {
    pub coord: Coord,
    /// Turns spent walking beyond the first before arriving.
    pub extra_turns: u32,
    /// Day the capture completes.
    pub captured_on: u32,
    /// The capture of the chain's own (neutral) factory.
    #[serde(default)]
    pub artificial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapChain {
    pub stops: Vec<CapStop>,
    /// Funds days collected within the planning horizon.
    pub income: u32,
    /// Walked tiles for each real stop, in order.
    pub paths: Vec<Vec<Coord>>,
}

impl CapChain {
    pub fn real_stops(&self) -> impl Iterator<Item = &CapStop> {
        self.stops.iter().filter(|s| !s.artificial)
    }
}

/// A neutral factory predicted to fall to `army`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedFactory {
    pub factory: Coord,
    pub army: CountryId,
    /// The owned factory whose capturer gets there first.
    pub from: Coord,
    pub cost: u32,
    pub captured_on: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryChains {
    pub factory: Coord,
    pub army: CountryId,
    /// Best first.
    pub chains: Vec<CapChain>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerResult {
    pub contested: BTreeSet<Coord>,
    pub cap_chains: Vec<FactoryChains>,
    pub assigned_factories: Vec<AssignedFactory>,
}

impl PlannerResult {
    pub fn chains_for(&self, factory: Coord) -> &[CapChain] {
        self.cap_chains
            .iter()
            .find(|f| f.factory == factory)
            .map(|f| f.chains.as_slice())
            .unwrap_or_default()
    }
}

/// Chain-building progress of one factory.
struct Producer {
    factory: Coord,
    army: CountryId,
    /// Day the next capturer is built; it moves the day after.
    next_build: u32,
    credit: Option<CapStop>,
    chains: Vec<CapChain>,
    retired: bool,
}

pub struct CapChainPlanner<'a> {
    graph: TerrainGraph<'a>,
    config: &'a PlannerConfig,
    movement: MovementType,
    range: u32,
    properties: Vec<Property>,
    floods: FxHashMap<Coord, HashMap<Coord, u32>>,
}

impl<'a> CapChainPlanner<'a> {
    pub fn new(map: &'a ReplayMap, catalog: &'a Catalog, config: &'a PlannerConfig) -> Result<Self, CatalogError> {
        let capturer = catalog.require_unit(&config.capturer_unit)?;
        let properties = map
            .coords()
            .filter_map(|coord| {
                let building = catalog.building(map.terrain_at(coord)?)?;
                let class = if building.kind.is_factory() {
                    PropertyClass::Factory
                } else if building.gives_funds && building.kind != BuildingKind::Hq {
                    PropertyClass::Income
                } else {
                    return None;
                };
                Some(Property {
                    coord,
                    class,
                    owner: building.country,
                })
            })
            .collect();

        Ok(Self {
            graph: TerrainGraph::new(map, catalog),
            config,
            movement: capturer.movement_type,
            range: capturer.movement_points.max(1),
            properties,
            floods: FxHashMap::default(),
        })
    }

    fn distance(&mut self, from: Coord, to: Coord) -> Option<u32> {
        let flood = self
            .floods
            .entry(from)
            .or_insert_with(|| self.graph.costs_from(from, self.movement, u32::MAX));
        flood.get(&to).copied()
    }

    /// `(walking turns, capture day)` for a capturer setting out on day `start`
    /// towards a property `cost` away.
    fn schedule(&self, start: u32, cost: u32) -> (u32, u32) {
        let legs = cost.div_ceil(self.range).max(1);
        let arrive = start + legs - 1;
        (legs, arrive + self.config.capture_turns.max(1) - 1)
    }

    fn of_class(&self, class: PropertyClass) -> Vec<Property> {
        self.properties.iter().filter(|p| p.class == class).copied().collect()
    }

    #[instrument(skip_all, fields(properties = self.properties.len()))]
    pub fn plan(mut self) -> PlannerResult {
        let factories = self.of_class(PropertyClass::Factory);
        let owned: Vec<(Coord, CountryId)> = factories
            .iter()
            .filter_map(|p| p.owner.map(|army| (p.coord, army)))
            .collect();

        let assigned = self.assign_neutral_factories(&factories, &owned);
        let mut army_factories: BTreeMap<CountryId, Vec<Coord>> = BTreeMap::new();
        for (coord, army) in &owned {
            army_factories.entry(*army).or_default().push(*coord);
        }
        for a in &assigned {
            army_factories.entry(a.army).or_default().push(a.factory);
        }

        let (claims, contested) = self.claim_properties(&army_factories);
        log::debug!(
            "{} armies, {} claimed, {} contested, {} neutral factories assigned",
            army_factories.len(),
            claims.len(),
            contested.len(),
            assigned.len()
        );

        let mut producers: Vec<Producer> = owned
            .iter()
            .map(|(factory, army)| Producer {
                factory: *factory,
                army: *army,
                next_build: 0,
                credit: None,
                chains: Vec::new(),
                retired: false,
            })
            .chain(assigned.iter().map(|a| Producer {
                factory: a.factory,
                army: a.army,
                next_build: a.captured_on,
                credit: Some(CapStop {
                    coord: a.factory,
                    extra_turns: a.captured_on,
                    captured_on: a.captured_on,
                    artificial: true,
                }),
                chains: Vec::new(),
                retired: false,
            }))
            .collect();

        let mut taken = BTreeSet::new();
        while producers.iter().any(|p| !p.retired) {
            for producer in producers.iter_mut().filter(|p| !p.retired) {
                let chain = self.build_chain(producer, &claims, &mut taken);
                if chain.real_stops().next().is_none() {
                    producer.retired = true;
                } else {
                    producer.chains.push(chain);
                    producer.next_build += 1;
                }
            }
        }

        let mut cap_chains: Vec<FactoryChains> = producers
            .into_iter()
            .filter(|p| !p.chains.is_empty())
            .map(|mut p| {
                p.chains.sort_by(|a, b| b.income.cmp(&a.income));
                FactoryChains {
                    factory: p.factory,
                    army: p.army,
                    chains: p.chains,
                }
            })
            .collect();
        cap_chains.sort_by_key(|f| f.factory);

        PlannerResult {
            contested,
            cap_chains,
            assigned_factories: assigned,
        }
    }

    /// Each neutral factory goes to the army whose owned factory is cheapest
    /// to walk from. Equal costs go to the first factory in map order.
    fn assign_neutral_factories(&mut self, factories: &[Property], owned: &[(Coord, CountryId)]) -> Vec<AssignedFactory> {
        let mut assigned = Vec::new();
        for neutral in factories.iter().filter(|p| p.owner.is_none()) {
            let mut best: Option<(u32, Coord, CountryId)> = None;
            for (from, army) in owned {
                let Some(cost) = self.distance(*from, neutral.coord) else {
                    continue;
                };
                match best {
                    Some((best_cost, ..)) if best_cost <= cost => {}
                    _ => best = Some((cost, *from, *army)),
                }
            }
            if let Some((cost, from, army)) = best {
                let (_, captured_on) = self.schedule(1, cost);
                assigned.push(AssignedFactory {
                    factory: neutral.coord,
                    army,
                    from,
                    cost,
                    captured_on,
                });
            }
        }
        assigned
    }

    /// Neutral income properties go to the strictly nearest army, unless a
    /// rival is within one move of it.
    fn claim_properties(
        &mut self,
        army_factories: &BTreeMap<CountryId, Vec<Coord>>,
    ) -> (BTreeMap<Coord, CountryId>, BTreeSet<Coord>) {
        let mut claims = BTreeMap::new();
        let mut contested = BTreeSet::new();

        for property in self.of_class(PropertyClass::Income) {
            if property.owner.is_some() {
                continue;
            }
            let mut distances: Vec<(u32, CountryId)> = Vec::new();
            for (army, factories) in army_factories {
                let nearest = factories
                    .iter()
                    .filter_map(|f| self.distance(*f, property.coord))
                    .min();
                if let Some(cost) = nearest {
                    distances.push((cost, *army));
                }
            }
            distances.sort_by_key(|(cost, _)| *cost);

            let Some(&(best, army)) = distances.first() else {
                continue;
            };
            let rivals = distances[1..]
                .iter()
                .any(|(cost, _)| cost - best <= self.range);
            if rivals {
                contested.insert(property.coord);
            } else {
                claims.insert(property.coord, army);
            }
        }
        (claims, contested)
    }

    fn build_chain(
        &mut self,
        producer: &Producer,
        claims: &BTreeMap<Coord, CountryId>,
        taken: &mut BTreeSet<Coord>,
    ) -> CapChain {
        let budget = self.range * (self.config.lookahead_turns + 1);
        let mut stops: Vec<CapStop> = producer.credit.into_iter().collect();
        let mut paths = Vec::new();
        let mut position = producer.factory;
        let mut day = producer.next_build + 1;

        loop {
            let flood = self
                .floods
                .entry(position)
                .or_insert_with(|| self.graph.costs_from(position, self.movement, u32::MAX));
            let target = claims
                .iter()
                .filter(|(coord, army)| **army == producer.army && !taken.contains(*coord))
                .filter_map(|(coord, _)| flood.get(coord).map(|cost| (*cost, *coord)))
                .filter(|(cost, _)| *cost <= budget)
                .min();
            let Some((cost, coord)) = target else { break };

            let (legs, captured_on) = self.schedule(day, cost);
            if captured_on >= self.config.turn_limit {
                break;
            }
            if let Some((path, _)) = self.graph.path(position, coord, self.movement) {
                paths.push(path);
            }
            taken.insert(coord);
            stops.push(CapStop {
                coord,
                extra_turns: legs - 1,
                captured_on,
                artificial: false,
            });
            position = coord;
            day = captured_on + 1;
        }

        let income = stops
            .iter()
            .map(|s| self.config.turn_limit.saturating_sub(s.captured_on))
            .sum();
        CapChain { stops, income, paths }
    }
}

/// Plan on a bare map whose terrain ids carry property ownership.
pub fn plan_capture_chains(
    map: &ReplayMap,
    catalog: &Catalog,
    config: &PlannerConfig,
) -> Result<PlannerResult, CatalogError> {
    Ok(CapChainPlanner::new(map, catalog, config)?.plan())
}

/// Plan on a live board, using the current building terrain.
pub fn plan_for_state(state: &GameState, catalog: &Catalog, config: &PlannerConfig) -> Result<PlannerResult, CatalogError> {
    let mut map = (*state.map).clone();
    for building in state.buildings.values() {
        if let Some(i) = map.index_of(building.position) {
            map.terrain[i] = building.terrain_id;
        }
    }
    plan_capture_chains(&map, catalog, config)
}
