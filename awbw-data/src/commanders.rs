use serde::{Deserialize, Serialize};

pub type CountryId = u32;
pub type CoId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryData {
    pub id: CountryId,
    /// Short code used in replay files (e.g. `"os"`).
    pub code: String,
    pub name: String,
}

/// What an activated power changes for fog-of-war purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerEffect {
    pub vision_bonus: i32,
    /// Units can see into woods and reefs from any distance.
    pub see_hidden_tiles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoData {
    pub id: CoId,
    pub name: String,
    #[serde(default)]
    pub power: PowerEffect,
    #[serde(default)]
    pub super_power: PowerEffect,
}

pub fn standard_countries() -> Vec<CountryData> {
    [
        (1, "os", "Orange Star"),
        (2, "bm", "Blue Moon"),
        (3, "ge", "Green Earth"),
        (4, "yc", "Yellow Comet"),
    ]
    .into_iter()
    .map(|(id, code, name)| CountryData {
        id,
        code: code.to_string(),
        name: name.to_string(),
    })
    .collect()
}

fn co(id: CoId, name: &str) -> CoData {
    CoData {
        id,
        name: name.to_string(),
        power: PowerEffect::default(),
        super_power: PowerEffect::default(),
    }
}

pub fn standard_cos() -> Vec<CoData> {
    let mut sonja = co(18, "Sonja");
    sonja.power = PowerEffect {
        vision_bonus: 1,
        see_hidden_tiles: true,
    };
    sonja.super_power = PowerEffect {
        vision_bonus: 1,
        see_hidden_tiles: true,
    };

    vec![
        co(1, "Andy"),
        co(2, "Grit"),
        co(3, "Kanbei"),
        co(5, "Drake"),
        co(7, "Max"),
        co(8, "Sami"),
        co(9, "Olaf"),
        co(10, "Eagle"),
        co(11, "Adder"),
        co(12, "Hawke"),
        co(14, "Jess"),
        co(15, "Colin"),
        co(16, "Lash"),
        co(17, "Hachi"),
        sonja,
        co(19, "Sasha"),
        co(22, "Jake"),
        co(24, "Nell"),
        co(28, "Rachel"),
    ]
}
