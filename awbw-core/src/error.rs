use crate::grid::Coord;
use crate::state::{PlayerId, UnitId};
use thiserror::Error;

/// A required lookup that found nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    #[error("unit {0}")]
    Unit(UnitId),
    #[error("unit at {0}")]
    UnitAt(Coord),
    #[error("building at {0}")]
    Building(Coord),
    #[error("player {0}")]
    Player(PlayerId),
}

#[derive(Error, Debug)]
pub enum ReplayError {
    /// Replay data that cannot be loaded at all.
    #[error("Malformed replay: {0}")]
    MalformedReplay(String),
    #[error("Not found: {0}")]
    NotFound(#[from] NotFound),
    #[error("No replay loaded")]
    NotLoaded,
}

impl ReplayError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        ReplayError::MalformedReplay(reason.into())
    }
}

impl From<awbw_data::CatalogError> for ReplayError {
    fn from(err: awbw_data::CatalogError) -> Self {
        ReplayError::MalformedReplay(err.to_string())
    }
}
