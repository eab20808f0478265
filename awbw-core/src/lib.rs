//! # AWBW Replay Core
//!
//! Deterministic replay engine for Advance Wars By Web matches: the board
//! model, the action taxonomy with exact undo, fog of war, desync detection
//! and the capture-chain planner used by the map overlay.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ ReplayData  │────▶│ ReplayState  │────▶│ apply_action │
//! │ (snapshots) │     │ (cursor)     │     │ (Transaction)│
//! └─────────────┘     └──────┬───────┘     └──────┬───────┘
//!                            │                    │
//!                     ┌──────▼───────┐     ┌──────▼──────┐
//!                     │  Observers   │◀────│  GameState  │──▶ compute_fog
//!                     │  (drawing)   │     │  (live)     │
//!                     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`GameState`] | One board: units, buildings, players |
//! | [`Action`] | Closed set of replay actions with recorded post-states |
//! | [`ReplayState`] | Cursor, live board and undo stack of a loaded replay |
//! | [`ReplayEngine`] | Loaded/not-loaded front door with observers and playback |
//! | [`FogGrid`] | Tri-state visibility for a player or team |
//! | [`DesyncReport`] | Differences between replayed and recorded turns |
//! | [`PlannerResult`] | Predicted capture chains and contested properties |

pub mod action;
pub mod bounded;
pub mod capchain;
pub mod config;
pub mod desync;
pub mod effects;
pub mod error;
pub mod fog;
pub mod grid;
pub mod input;
pub mod movement;
pub mod observer;
pub mod playback;
pub mod powers;
pub mod profiling;
pub mod replay;
pub mod state;
pub mod testing;
pub mod undo;

pub use action::{Action, MoveAction, PowerChange};
pub use bounded::{BoundedInt, CaptureProgress, HitPoints};
pub use capchain::{plan_capture_chains, plan_for_state, CapChain, CapStop, PlannerResult};
pub use config::{EngineConfig, PlannerConfig};
pub use desync::{compute_desync, DesyncEntry, DesyncReport};
pub use error::{NotFound, ReplayError};
pub use fog::{compute_fog, is_unit_visible, FogGrid, FogViewer, Visibility};
pub use grid::Coord;
pub use input::{PlayerRecord, PlayerTurnState, ReplayData, ReplayInfo, TurnData};
pub use observer::event_log::EventLogObserver;
pub use observer::{BoardEvent, ObserverError, ObserverRegistry, ReplayObserver, Snapshot};
pub use playback::{PlaybackQueue, PlaybackSequence, PlaybackStep};
pub use powers::PowerLog;
pub use replay::{Cursor, EngineStatus, ReplayEngine, ReplayState};
pub use state::{
    recompute_player_stats, GameState, PlayerId, PlayerState, PlayerStats, PowerKind, ReplayBuilding, ReplayMap,
    ReplayUnit, UnitId, Weather,
};
