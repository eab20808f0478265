use serde::{Deserialize, Serialize};

/// How a unit pays for terrain. Each terrain lists a cost per movement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MovementType {
    Foot,
    Boot,
    Treads,
    Tires,
    Air,
    Sea,
    Lander,
    Pipe,
}

/// Which units a transport can load, and how many at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoSpec {
    pub capacity: u8,
    /// Unit codes this transport accepts.
    pub carries: Vec<String>,
}

/// Static description of a unit type, keyed by its code (e.g. `"Infantry"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    pub code: String,
    pub name: String,
    pub cost: i64,
    pub movement_points: u32,
    pub movement_type: MovementType,
    pub vision: i32,
    pub max_ammo: i32,
    pub max_fuel: i32,
    pub fuel_per_turn: i32,
    #[serde(default)]
    pub cargo: CargoSpec,
    /// Can submerge or stealth (HideUnit/UnhideUnit).
    #[serde(default)]
    pub can_hide: bool,
}

impl UnitData {
    pub fn is_air(&self) -> bool {
        self.movement_type == MovementType::Air
    }

    pub fn is_transport(&self) -> bool {
        self.cargo.capacity > 0
    }

    pub fn can_carry(&self, code: &str) -> bool {
        self.cargo.carries.iter().any(|c| c == code)
    }
}

#[allow(clippy::too_many_arguments)]
fn unit(
    code: &str,
    cost: i64,
    movement_points: u32,
    movement_type: MovementType,
    vision: i32,
    max_ammo: i32,
    max_fuel: i32,
    fuel_per_turn: i32,
) -> UnitData {
    UnitData {
        code: code.to_string(),
        name: code.to_string(),
        cost,
        movement_points,
        movement_type,
        vision,
        max_ammo,
        max_fuel,
        fuel_per_turn,
        cargo: CargoSpec::default(),
        can_hide: false,
    }
}

fn carrying(mut data: UnitData, capacity: u8, carries: &[&str]) -> UnitData {
    data.cargo = CargoSpec {
        capacity,
        carries: carries.iter().map(|c| c.to_string()).collect(),
    };
    data
}

fn hiding(mut data: UnitData) -> UnitData {
    data.can_hide = true;
    data
}

const FOOT_SOLDIERS: [&str; 2] = ["Infantry", "Mech"];
const GROUND: [&str; 13] = [
    "Infantry",
    "Mech",
    "Recon",
    "APC",
    "Artillery",
    "Tank",
    "Anti-Air",
    "Missile",
    "Rocket",
    "Md.Tank",
    "Neotank",
    "Mega Tank",
    "Piperunner",
];

/// The standard unit roster.
pub fn standard_units() -> Vec<UnitData> {
    use MovementType::*;
    vec![
        unit("Infantry", 1000, 3, Foot, 2, 0, 99, 0),
        unit("Mech", 3000, 2, Boot, 2, 3, 70, 0),
        unit("Recon", 4000, 8, Tires, 5, 0, 80, 0),
        carrying(unit("APC", 5000, 6, Treads, 1, 0, 70, 0), 1, &FOOT_SOLDIERS),
        unit("Artillery", 6000, 5, Treads, 1, 9, 50, 0),
        unit("Tank", 7000, 6, Treads, 3, 9, 70, 0),
        unit("Anti-Air", 8000, 6, Treads, 2, 9, 60, 0),
        unit("Missile", 12000, 4, Tires, 5, 6, 50, 0),
        unit("Rocket", 15000, 5, Tires, 1, 6, 50, 0),
        unit("Md.Tank", 16000, 5, Treads, 1, 8, 50, 0),
        unit("Piperunner", 20000, 9, Pipe, 4, 9, 99, 0),
        unit("Neotank", 22000, 6, Treads, 1, 9, 99, 0),
        unit("Mega Tank", 28000, 4, Treads, 1, 3, 50, 0),
        carrying(unit("T-Copter", 5000, 6, Air, 2, 0, 99, 2), 1, &FOOT_SOLDIERS),
        unit("B-Copter", 9000, 6, Air, 3, 6, 99, 2),
        unit("Fighter", 20000, 9, Air, 2, 9, 99, 5),
        unit("Bomber", 22000, 7, Air, 2, 9, 99, 5),
        hiding(unit("Stealth", 24000, 6, Air, 4, 6, 60, 5)),
        unit("Black Bomb", 25000, 9, Air, 1, 0, 45, 5),
        carrying(unit("Black Boat", 7500, 7, Lander, 1, 0, 60, 1), 2, &FOOT_SOLDIERS),
        carrying(unit("Lander", 12000, 6, Lander, 1, 0, 99, 1), 2, &GROUND),
        carrying(
            unit("Cruiser", 18000, 6, Sea, 3, 9, 99, 1),
            2,
            &["T-Copter", "B-Copter"],
        ),
        hiding(unit("Sub", 20000, 5, Sea, 5, 6, 60, 1)),
        unit("Battleship", 28000, 5, Sea, 2, 9, 99, 1),
        carrying(
            unit("Carrier", 30000, 5, Sea, 4, 9, 99, 1),
            2,
            &[
                "T-Copter",
                "B-Copter",
                "Fighter",
                "Bomber",
                "Stealth",
                "Black Bomb",
            ],
        ),
    ]
}
