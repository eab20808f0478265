//! Change notifications for whatever draws the board.
//!
//! Every navigation step produces a list of [`BoardEvent`]s describing what
//! changed. Observers receive the events together with an immutable
//! [`Snapshot`] of the board after the step; they cannot affect replay state.
//!
//! ```ignore
//! let mut registry = ObserverRegistry::new();
//! registry.register(Box::new(EventLogObserver::stdout()));
//!
//! // after each navigation step:
//! registry.notify(&snapshot, &events);
//! ```

pub mod event_log;

use crate::grid::Coord;
use crate::replay::Cursor;
use crate::state::{GameState, PlayerId, UnitId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// One change to the board, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    UnitAdded { id: UnitId },
    UnitUpdated { id: UnitId },
    UnitRemoved { id: UnitId },
    /// Draw an explosion; the unit is already gone.
    Explosion { at: Coord },
    BuildingChanged { at: Coord },
    PlayerChanged { id: PlayerId },
    FogChanged,
    /// The whole board was replaced by a turn snapshot.
    TurnStarted {
        turn: usize,
        day: u32,
        active_player: PlayerId,
    },
}

/// Immutable board state after a navigation step.
///
/// `GameState` clones in O(1) thanks to `im::OrdMap`.
#[derive(Clone)]
pub struct Snapshot {
    pub state: Arc<GameState>,
    pub cursor: Cursor,
}

impl Snapshot {
    pub fn new(state: GameState, cursor: Cursor) -> Self {
        Self {
            state: Arc::new(state),
            cursor,
        }
    }
}

#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Render error: {0}")]
    Render(String),
}

/// Errors returned from `on_step` are logged and never stop the replay.
pub trait ReplayObserver: Send + Sync {
    fn on_step(&self, snapshot: &Snapshot, events: &[BoardEvent]) -> Result<(), ObserverError>;

    fn name(&self) -> &str;

    fn on_shutdown(&self) {}
}

pub struct ObserverRegistry {
    observers: Vec<Box<dyn ReplayObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self { observers: vec![] }
    }

    pub fn register(&mut self, observer: Box<dyn ReplayObserver>) {
        log::info!("Registered observer: {}", observer.name());
        self.observers.push(observer);
    }

    /// Steps that changed nothing are not delivered.
    pub fn notify(&self, snapshot: &Snapshot, events: &[BoardEvent]) {
        if events.is_empty() {
            return;
        }
        for observer in &self.observers {
            if let Err(e) = observer.on_step(snapshot, events) {
                log::warn!("Observer '{}' error: {}", observer.name(), e);
            }
        }
    }

    pub fn shutdown(&self) {
        for observer in &self.observers {
            observer.on_shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
