use crate::units::MovementType;
use crate::CountryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TerrainId = u32;

/// Kind of property standing on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    Hq,
    City,
    Base,
    Airport,
    Port,
    ComTower,
    Lab,
    MissileSilo,
    EmptySilo,
}

impl BuildingKind {
    /// Buildings that can produce units.
    pub fn is_factory(self) -> bool {
        matches!(self, BuildingKind::Base | BuildingKind::Airport | BuildingKind::Port)
    }

    /// Buildings a unit can capture. Silos are used, never owned.
    pub fn is_capturable(self) -> bool {
        !matches!(self, BuildingKind::MissileSilo | BuildingKind::EmptySilo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingData {
    pub kind: BuildingKind,
    /// Owning country implied by this terrain id (`None` = neutral).
    pub country: Option<CountryId>,
    /// Counts towards per-turn income.
    pub gives_funds: bool,
}

/// Static description of a terrain id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainData {
    pub id: TerrainId,
    pub name: String,
    /// Movement cost per movement type. Absent types cannot enter.
    pub movement_costs: BTreeMap<MovementType, u32>,
    /// Vision bonus (or penalty) for non-air units standing here.
    #[serde(default)]
    pub sight_increase: i32,
    /// Units on this tile are only seen from this Manhattan distance or closer (0 = no limit).
    #[serde(default)]
    pub fog_sight_limit: u32,
    #[serde(default)]
    pub building: Option<BuildingData>,
}

impl TerrainData {
    pub fn movement_cost(&self, movement: MovementType) -> Option<u32> {
        self.movement_costs.get(&movement).copied()
    }

    pub fn is_building(&self) -> bool {
        self.building.is_some()
    }
}

fn costs(entries: &[(MovementType, u32)]) -> BTreeMap<MovementType, u32> {
    entries.iter().copied().collect()
}

fn land_costs() -> BTreeMap<MovementType, u32> {
    use MovementType::*;
    costs(&[(Foot, 1), (Boot, 1), (Treads, 1), (Tires, 1), (Air, 1)])
}

fn plain_terrain(id: TerrainId, name: &str, movement_costs: BTreeMap<MovementType, u32>) -> TerrainData {
    TerrainData {
        id,
        name: name.to_string(),
        movement_costs,
        sight_increase: 0,
        fog_sight_limit: 0,
        building: None,
    }
}

fn building(
    id: TerrainId,
    name: &str,
    kind: BuildingKind,
    country: Option<CountryId>,
) -> TerrainData {
    use MovementType::*;
    let mut movement_costs = land_costs();
    match kind {
        BuildingKind::Base => {
            movement_costs.insert(Pipe, 1);
        }
        BuildingKind::Port => {
            movement_costs.insert(Sea, 1);
            movement_costs.insert(Lander, 1);
        }
        _ => {}
    }
    let gives_funds = !matches!(
        kind,
        BuildingKind::ComTower | BuildingKind::Lab | BuildingKind::MissileSilo | BuildingKind::EmptySilo
    );
    TerrainData {
        id,
        name: name.to_string(),
        movement_costs,
        sight_increase: 0,
        fog_sight_limit: 0,
        building: Some(BuildingData {
            kind,
            country,
            gives_funds,
        }),
    }
}

/// (country, city, base, airport, port, hq, com tower, lab) terrain ids.
const OWNED_PROPERTY_IDS: [(Option<CountryId>, [TerrainId; 7]); 5] = [
    (None, [34, 35, 36, 37, 0, 133, 145]),
    (Some(1), [38, 39, 40, 41, 42, 134, 146]),
    (Some(2), [43, 44, 45, 46, 47, 129, 140]),
    (Some(3), [48, 49, 50, 51, 52, 131, 142]),
    (Some(4), [53, 54, 55, 56, 57, 136, 148]),
];

/// The standard terrain table, including every country's properties.
pub fn standard_terrain() -> Vec<TerrainData> {
    use MovementType::*;
    let mut table = Vec::new();

    table.push(plain_terrain(
        1,
        "Plain",
        costs(&[(Foot, 1), (Boot, 1), (Treads, 1), (Tires, 2), (Air, 1)]),
    ));
    let mut mountain = plain_terrain(2, "Mountain", costs(&[(Foot, 2), (Boot, 1), (Air, 1)]));
    mountain.sight_increase = 3;
    table.push(mountain);
    let mut wood = plain_terrain(
        3,
        "Wood",
        costs(&[(Foot, 1), (Boot, 1), (Treads, 2), (Tires, 3), (Air, 1)]),
    );
    wood.fog_sight_limit = 1;
    table.push(wood);
    for id in 4..=14 {
        table.push(plain_terrain(id, "River", costs(&[(Foot, 2), (Boot, 1), (Air, 1)])));
    }
    for id in 15..=25 {
        table.push(plain_terrain(id, "Road", land_costs()));
    }
    for id in 26..=27 {
        let mut bridge = land_costs();
        bridge.insert(Sea, 1);
        bridge.insert(Lander, 1);
        table.push(plain_terrain(id, "Bridge", bridge));
    }
    table.push(plain_terrain(28, "Sea", costs(&[(Air, 1), (Sea, 1), (Lander, 1)])));
    for id in 29..=32 {
        let mut shoal = land_costs();
        shoal.insert(Lander, 1);
        table.push(plain_terrain(id, "Shoal", shoal));
    }
    let mut reef = plain_terrain(33, "Reef", costs(&[(Air, 1), (Sea, 2), (Lander, 2)]));
    reef.fog_sight_limit = 1;
    table.push(reef);
    for id in 101..=110 {
        table.push(plain_terrain(id, "Pipe", costs(&[(Pipe, 1)])));
    }

    for (country, [city, base, airport, port, hq, tower, lab]) in OWNED_PROPERTY_IDS {
        let prefix = match country {
            None => "Neutral".to_string(),
            Some(id) => format!("Country {}", id),
        };
        table.push(building(city, &format!("{} City", prefix), BuildingKind::City, country));
        table.push(building(base, &format!("{} Base", prefix), BuildingKind::Base, country));
        table.push(building(airport, &format!("{} Airport", prefix), BuildingKind::Airport, country));
        table.push(building(port, &format!("{} Port", prefix), BuildingKind::Port, country));
        if hq != 0 {
            table.push(building(hq, &format!("{} HQ", prefix), BuildingKind::Hq, country));
        }
        table.push(building(tower, &format!("{} Com Tower", prefix), BuildingKind::ComTower, country));
        table.push(building(lab, &format!("{} Lab", prefix), BuildingKind::Lab, country));
    }

    table.push(building(111, "Missile Silo", BuildingKind::MissileSilo, None));
    table.push(building(112, "Missile Silo Empty", BuildingKind::EmptySilo, None));

    table
}
