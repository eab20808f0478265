//! Static lookup tables for replay simulation.
//!
//! The catalog is built once (from the built-in standard tables, optionally
//! patched by a JSON override file) and is read-only afterwards.

pub mod commanders;
pub mod terrain;
pub mod units;

pub use commanders::{CoData, CoId, CountryData, CountryId, PowerEffect};
pub use terrain::{BuildingData, BuildingKind, TerrainData, TerrainId};
pub use units::{CargoSpec, MovementType, UnitData};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate {kind} entry: {key}")]
    Duplicate { kind: &'static str, key: String },
    #[error("Unknown unit type: {0}")]
    UnknownUnit(String),
    #[error("Unknown terrain id: {0}")]
    UnknownTerrain(TerrainId),
    #[error("Unknown country id: {0}")]
    UnknownCountry(CountryId),
    #[error("Unknown CO id: {0}")]
    UnknownCo(CoId),
}

/// On-disk shape of a catalog override file. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub units: Vec<UnitData>,
    #[serde(default)]
    pub terrain: Vec<TerrainData>,
    #[serde(default)]
    pub countries: Vec<CountryData>,
    #[serde(default)]
    pub cos: Vec<CoData>,
}

/// Immutable unit/terrain/country/CO tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    units: BTreeMap<String, UnitData>,
    terrain: BTreeMap<TerrainId, TerrainData>,
    countries: BTreeMap<CountryId, CountryData>,
    cos: BTreeMap<CoId, CoData>,
}

impl Catalog {
    /// Built-in standard tables.
    pub fn standard() -> Self {
        let mut catalog = Catalog::default();
        let file = CatalogFile {
            units: units::standard_units(),
            terrain: terrain::standard_terrain(),
            countries: commanders::standard_countries(),
            cos: commanders::standard_cos(),
        };
        for unit in file.units {
            catalog.units.insert(unit.code.clone(), unit);
        }
        for terrain in file.terrain {
            catalog.terrain.insert(terrain.id, terrain);
        }
        for country in file.countries {
            catalog.countries.insert(country.id, country);
        }
        for co in file.cos {
            catalog.cos.insert(co.id, co);
        }
        catalog
    }

    /// Standard tables patched with the entries of `file`.
    ///
    /// Entries replace standard ones with the same key. A key repeated inside
    /// `file` itself is an error.
    pub fn with_overrides(mut self, file: CatalogFile) -> Result<Self, CatalogError> {
        let mut seen_units = std::collections::BTreeSet::new();
        for unit in file.units {
            if !seen_units.insert(unit.code.clone()) {
                return Err(CatalogError::Duplicate {
                    kind: "unit",
                    key: unit.code,
                });
            }
            self.units.insert(unit.code.clone(), unit);
        }
        let mut seen_terrain = std::collections::BTreeSet::new();
        for terrain in file.terrain {
            if !seen_terrain.insert(terrain.id) {
                return Err(CatalogError::Duplicate {
                    kind: "terrain",
                    key: terrain.id.to_string(),
                });
            }
            self.terrain.insert(terrain.id, terrain);
        }
        for country in file.countries {
            self.countries.insert(country.id, country);
        }
        for co in file.cos {
            self.cos.insert(co.id, co);
        }
        log::debug!(
            "Catalog: {} units, {} terrain, {} countries, {} COs",
            self.units.len(),
            self.terrain.len(),
            self.countries.len(),
            self.cos.len()
        );
        Ok(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::standard().with_overrides(file)
    }

    /// Load an override file on top of the standard tables.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        log::info!("Loading catalog overrides from {:?}", path);
        Self::from_json_str(&json)
    }

    pub fn unit(&self, code: &str) -> Option<&UnitData> {
        self.units.get(code)
    }

    pub fn terrain(&self, id: TerrainId) -> Option<&TerrainData> {
        self.terrain.get(&id)
    }

    pub fn country(&self, id: CountryId) -> Option<&CountryData> {
        self.countries.get(&id)
    }

    pub fn co(&self, id: CoId) -> Option<&CoData> {
        self.cos.get(&id)
    }

    pub fn require_unit(&self, code: &str) -> Result<&UnitData, CatalogError> {
        self.unit(code)
            .ok_or_else(|| CatalogError::UnknownUnit(code.to_string()))
    }

    pub fn require_terrain(&self, id: TerrainId) -> Result<&TerrainData, CatalogError> {
        self.terrain(id).ok_or(CatalogError::UnknownTerrain(id))
    }

    pub fn require_country(&self, id: CountryId) -> Result<&CountryData, CatalogError> {
        self.country(id).ok_or(CatalogError::UnknownCountry(id))
    }

    pub fn require_co(&self, id: CoId) -> Result<&CoData, CatalogError> {
        self.co(id).ok_or(CatalogError::UnknownCo(id))
    }

    /// Building data of a terrain id, if that terrain is a property.
    pub fn building(&self, id: TerrainId) -> Option<&BuildingData> {
        self.terrain(id).and_then(|t| t.building.as_ref())
    }

    /// Terrain id of the building of `kind` owned by `country` (`None` = neutral).
    ///
    /// Used when a capture flips a property to its new owner's variant.
    pub fn building_terrain(&self, kind: BuildingKind, country: Option<CountryId>) -> Option<TerrainId> {
        self.terrain.values().find_map(|t| match &t.building {
            Some(b) if b.kind == kind && b.country == country => Some(t.id),
            _ => None,
        })
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitData> {
        self.units.values()
    }

    pub fn terrain_types(&self) -> impl Iterator<Item = &TerrainData> {
        self.terrain.values()
    }
}
