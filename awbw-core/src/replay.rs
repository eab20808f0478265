//! The replay state machine.
//!
//! [`ReplayState`] holds everything about one loaded replay: the authoritative
//! turn snapshots, the live board, the cursor and the undo stack for the
//! actions applied in the current turn. [`ReplayEngine`] wraps it with the
//! not-loaded state, observers and the playback queue.
//!
//! Jumping to a turn always restores that turn's recorded snapshot. Actions
//! are only ever replayed within a turn, in recorded order.

use crate::action::Action;
use crate::config::EngineConfig;
use crate::desync::{compute_desync, DesyncReport};
use crate::effects::{apply_action, ApplyContext};
use crate::error::ReplayError;
use crate::fog::{compute_fog, FogGrid, FogViewer};
use crate::input::{validate_map, ReplayData, ReplayInfo, TurnData};
use crate::observer::{BoardEvent, ObserverRegistry, ReplayObserver, Snapshot};
use crate::playback::{PlaybackQueue, PlaybackSequence};
use crate::powers::PowerLog;
use crate::state::{recompute_player_stats, GameState, PlayerId, PlayerStats, ReplayMap};
use crate::undo::{Transaction, UndoRecord};
use awbw_data::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Position in a replay. `action == -1` means the start of `turn`, before
/// any of its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cursor {
    pub turn: usize,
    pub action: i32,
}

impl Cursor {
    pub const fn start() -> Self {
        Self { turn: 0, action: -1 }
    }

    pub const fn turn_start(turn: usize) -> Self {
        Self { turn, action: -1 }
    }

    pub fn is_turn_start(&self) -> bool {
        self.action < 0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn {} action {}", self.turn, self.action)
    }
}

/// Replay every slot of `turn` on `state`, stopping at the first end of turn.
fn replay_turn_actions(
    state: &mut GameState,
    powers: &mut PowerLog,
    turn: &TurnData,
    ctx: &ApplyContext<'_>,
) -> Result<(), ReplayError> {
    for action in turn.actions.iter().flatten() {
        if action.is_end_turn() {
            break;
        }
        let mut txn = Transaction::new(state, powers);
        apply_action(&mut txn, action, ctx)?;
        let _ = txn.commit();
    }
    Ok(())
}

/// Explicit state of a loaded replay.
#[derive(Debug, Clone)]
pub struct ReplayState {
    info: ReplayInfo,
    map: Arc<ReplayMap>,
    turns: Vec<TurnData>,
    /// Authoritative board at the start of each turn.
    snapshots: Vec<GameState>,
    desyncs: Vec<DesyncReport>,
    config: EngineConfig,
    fog_enabled: bool,

    cursor: Cursor,
    live: GameState,
    powers: PowerLog,
    /// One entry per slot applied in the current turn, `None` for skipped
    /// slots. Its length is always `cursor.action + 1`.
    undo_stack: Vec<Option<UndoRecord>>,
    fog: FogGrid,
    stats: BTreeMap<PlayerId, PlayerStats>,
}

impl ReplayState {
    /// Validate the replay, precompute every turn snapshot and the desync
    /// report for each turn transition, and position the cursor at (0, -1).
    pub fn load(
        data: ReplayData,
        map: ReplayMap,
        catalog: &Catalog,
        config: &EngineConfig,
    ) -> Result<Self, ReplayError> {
        Self::load_with_events(data, map, catalog, config).map(|(state, _)| state)
    }

    /// [`ReplayState::load`], also returning the events that present the
    /// first turn. The initial fog grid is always reported as changed.
    #[instrument(skip_all, fields(replay = data.info.id))]
    pub fn load_with_events(
        data: ReplayData,
        map: ReplayMap,
        catalog: &Catalog,
        config: &EngineConfig,
    ) -> Result<(Self, Vec<BoardEvent>), ReplayError> {
        let ReplayData { info, turns } = data;
        if turns.is_empty() {
            return Err(ReplayError::malformed("replay has no turns"));
        }
        validate_map(&map, catalog)?;
        info.validate(catalog)?;
        for turn in &turns {
            turn.validate(&info, &map, catalog)?;
        }

        let map = Arc::new(map);
        let snapshots = turns
            .iter()
            .map(|turn| turn.to_game_state(&info, map.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "Loaded replay {} '{}': {} turns on {} ({}x{})",
            info.id,
            info.name,
            turns.len(),
            map.name,
            map.width,
            map.height
        );

        let ctx = ApplyContext { catalog, config };
        let mut desyncs = Vec::with_capacity(turns.len().saturating_sub(1));
        for (index, turn) in turns.iter().enumerate() {
            let mut scratch = snapshots[index].clone();
            let mut powers = PowerLog::new();
            powers.sync_with_snapshot(&scratch, catalog);
            replay_turn_actions(&mut scratch, &mut powers, turn, &ctx).map_err(|e| match e {
                ReplayError::NotFound(missing) => ReplayError::malformed(format!(
                    "turn {} (day {}) references missing {}",
                    index, turn.day, missing
                )),
                other => other,
            })?;

            if let Some(next) = snapshots.get(index + 1) {
                let report = compute_desync(index, &scratch, next, catalog, info.funds_per_building);
                if !report.is_clean() {
                    log::warn!(
                        "Desync after turn {} (day {}): {} differences",
                        index,
                        turn.day,
                        report.entries.len()
                    );
                }
                desyncs.push(report);
            }
        }

        let fog_enabled = config.fog_enabled(info.fog);
        let live = snapshots[0].clone();
        let fog = FogGrid::new(map.width, map.height, Default::default());
        let mut state = Self {
            info,
            map,
            turns,
            snapshots,
            desyncs,
            config: config.clone(),
            fog_enabled,
            cursor: Cursor::start(),
            live,
            powers: PowerLog::new(),
            undo_stack: Vec::new(),
            fog,
            stats: BTreeMap::new(),
        };
        let mut events = state.go_to_turn(0, catalog);
        if !events.contains(&BoardEvent::FogChanged) {
            events.push(BoardEvent::FogChanged);
        }
        Ok((state, events))
    }

    pub fn info(&self) -> &ReplayInfo {
        &self.info
    }

    pub fn map(&self) -> &Arc<ReplayMap> {
        &self.map
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn current_turn(&self) -> &TurnData {
        &self.turns[self.cursor.turn]
    }

    /// The action the cursor sits on, if any.
    pub fn current_action(&self) -> Option<&Action> {
        if self.cursor.is_turn_start() {
            return None;
        }
        self.current_turn()
            .actions
            .get(self.cursor.action as usize)
            .and_then(Option::as_ref)
    }

    pub fn live(&self) -> &GameState {
        &self.live
    }

    pub fn fog(&self) -> &FogGrid {
        &self.fog
    }

    pub fn fog_enabled(&self) -> bool {
        self.fog_enabled
    }

    pub fn powers(&self) -> &PowerLog {
        &self.powers
    }

    pub fn stats(&self) -> &BTreeMap<PlayerId, PlayerStats> {
        &self.stats
    }

    pub fn desync_reports(&self) -> &[DesyncReport] {
        &self.desyncs
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.live.clone(), self.cursor)
    }

    /// Whether a later slot of this turn has something to apply.
    fn has_action_ahead(&self) -> bool {
        let next = (self.cursor.action + 1) as usize;
        self.current_turn()
            .actions
            .iter()
            .skip(next)
            .flatten()
            .take_while(|a| !a.is_end_turn())
            .next()
            .is_some()
    }

    pub fn has_next_action(&self) -> bool {
        self.cursor.turn + 1 < self.turns.len() || self.has_action_ahead()
    }

    pub fn has_previous_action(&self) -> bool {
        self.cursor.turn > 0 || !self.cursor.is_turn_start()
    }

    /// Recompute derived stats and fog. Adds a fog event when the grid moved.
    fn refresh(&mut self, catalog: &Catalog, events: &mut Vec<BoardEvent>) {
        self.stats = recompute_player_stats(&self.live, catalog, self.info.funds_per_building);
        let viewer = FogViewer::active(&self.live);
        let fog = compute_fog(
            &self.live,
            catalog,
            &viewer,
            self.fog_enabled,
            &self.powers,
            &self.config,
        );
        if fog != self.fog {
            self.fog = fog;
            events.push(BoardEvent::FogChanged);
        }
    }

    /// Jump to the start of turn `index` (clamped), restoring its recorded
    /// snapshot.
    pub fn go_to_turn(&mut self, index: usize, catalog: &Catalog) -> Vec<BoardEvent> {
        let index = index.min(self.turns.len() - 1);
        crate::profiling::frame_mark_turn();

        self.cursor = Cursor::turn_start(index);
        self.undo_stack.clear();
        self.live = self.snapshots[index].clone();

        let expired = self.powers.expire(self.live.day);
        if expired > 0 {
            log::debug!("Expired {} powers entering day {}", expired, self.live.day);
        }
        // Powers activated by actions of this or a later turn are not part
        // of the snapshot.
        self.powers = PowerLog::new();
        self.powers.sync_with_snapshot(&self.live, catalog);

        let mut events = vec![BoardEvent::TurnStarted {
            turn: index,
            day: self.live.day,
            active_player: self.live.active_player,
        }];
        self.refresh(catalog, &mut events);
        log::debug!("At {} (day {})", self.cursor, self.live.day);
        events
    }

    /// Apply the next action, moving into the next turn when this one is
    /// exhausted or reaches an end of turn. Empty slots are stepped over.
    pub fn go_to_next_action(&mut self, catalog: &Catalog) -> Vec<BoardEvent> {
        if !self.has_next_action() {
            return Vec::new();
        }
        let config = self.config.clone();
        let ctx = ApplyContext {
            catalog,
            config: &config,
        };

        loop {
            let next = (self.cursor.action + 1) as usize;
            let slot = self.turns[self.cursor.turn].actions.get(next).cloned();
            let action = match slot {
                None => return self.go_to_turn(self.cursor.turn + 1, catalog),
                Some(Some(action)) if action.is_end_turn() => {
                    return self.go_to_turn(self.cursor.turn + 1, catalog);
                }
                Some(None) => {
                    log::trace!("Skipping empty slot {} of turn {}", next, self.cursor.turn);
                    self.undo_stack.push(None);
                    self.cursor.action += 1;
                    continue;
                }
                Some(Some(action)) => action,
            };

            let mut txn = Transaction::new(&mut self.live, &mut self.powers);
            self.cursor.action += 1;
            match apply_action(&mut txn, &action, &ctx) {
                Ok(()) => {
                    let (record, mut events) = txn.commit();
                    self.undo_stack.push(Some(record));
                    self.refresh(catalog, &mut events);
                    return events;
                }
                Err(e) => {
                    log::warn!("Failed to apply {} at {}: {}", action, self.cursor, e);
                    txn.rollback();
                    self.undo_stack.push(None);
                    if !self.has_action_ahead() {
                        return Vec::new();
                    }
                }
            }
        }
    }

    /// Undo the last applied action. At the start of a turn, go back to the
    /// previous turn positioned after its last action before the end of turn.
    pub fn go_to_previous_action(&mut self, catalog: &Catalog) -> Vec<BoardEvent> {
        if self.cursor.is_turn_start() {
            if self.cursor.turn == 0 {
                return Vec::new();
            }
            let mut events = self.go_to_turn(self.cursor.turn - 1, catalog);
            events.extend(self.fast_forward_turn(catalog));
            return events;
        }

        let mut events = Vec::new();
        while let Some(record) = self.undo_stack.pop() {
            self.cursor.action -= 1;
            if let Some(record) = record {
                events.extend(record.restore(&mut self.live, &mut self.powers));
                break;
            }
        }
        while matches!(self.undo_stack.last(), Some(None)) {
            self.undo_stack.pop();
            self.cursor.action -= 1;
        }
        self.refresh(catalog, &mut events);
        events
    }

    /// Apply every remaining slot of the current turn up to its end of turn.
    fn fast_forward_turn(&mut self, catalog: &Catalog) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        let turn = self.cursor.turn;
        while self.has_action_ahead() {
            events.extend(self.go_to_next_action(catalog));
        }
        debug_assert_eq!(self.cursor.turn, turn);
        events
    }
}

/// Whether a replay has been loaded.
#[derive(Debug, Default)]
pub enum EngineStatus {
    #[default]
    NotLoaded,
    Ready(Box<ReplayState>),
}

/// Front door for a presentation layer.
///
/// Every cursor move first completes pending playback, then updates the
/// board, then notifies observers and queues the cosmetic playback of the
/// step.
pub struct ReplayEngine {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    status: EngineStatus,
    observers: ObserverRegistry,
    playback: PlaybackQueue,
}

impl ReplayEngine {
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self {
            catalog,
            config,
            status: EngineStatus::NotLoaded,
            observers: ObserverRegistry::new(),
            playback: PlaybackQueue::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn register_observer(&mut self, observer: Box<dyn ReplayObserver>) {
        self.observers.register(observer);
    }

    /// Replace whatever was loaded. On failure the engine is left unloaded.
    pub fn load_replay(&mut self, data: ReplayData, map: ReplayMap) -> Result<(), ReplayError> {
        self.complete_all_actions();
        self.status = EngineStatus::NotLoaded;
        let (state, events) = ReplayState::load_with_events(data, map, &self.catalog, &self.config)?;
        self.observers.notify(&state.snapshot(), &events);
        self.status = EngineStatus::Ready(Box::new(state));
        Ok(())
    }

    pub fn state(&self) -> Result<&ReplayState, ReplayError> {
        match &self.status {
            EngineStatus::Ready(state) => Ok(state.as_ref()),
            EngineStatus::NotLoaded => Err(ReplayError::NotLoaded),
        }
    }

    pub fn desync_reports(&self) -> &[DesyncReport] {
        match &self.status {
            EngineStatus::Ready(state) => state.desync_reports(),
            EngineStatus::NotLoaded => &[],
        }
    }

    pub fn has_next_action(&self) -> bool {
        self.state().is_ok_and(ReplayState::has_next_action)
    }

    pub fn has_previous_action(&self) -> bool {
        self.state().is_ok_and(ReplayState::has_previous_action)
    }

    pub fn go_to_next_action(&mut self) -> Result<Vec<BoardEvent>, ReplayError> {
        self.navigate(|state, catalog| {
            let turn = state.cursor().turn;
            let events = state.go_to_next_action(catalog);
            let action = (state.cursor().turn == turn)
                .then(|| state.current_action().cloned())
                .flatten();
            (events, action)
        })
    }

    pub fn go_to_previous_action(&mut self) -> Result<Vec<BoardEvent>, ReplayError> {
        self.navigate(|state, catalog| (state.go_to_previous_action(catalog), None))
    }

    pub fn go_to_turn(&mut self, index: usize) -> Result<Vec<BoardEvent>, ReplayError> {
        self.navigate(|state, catalog| (state.go_to_turn(index, catalog), None))
    }

    fn navigate(
        &mut self,
        step: impl FnOnce(&mut ReplayState, &Catalog) -> (Vec<BoardEvent>, Option<Action>),
    ) -> Result<Vec<BoardEvent>, ReplayError> {
        self.complete_all_actions();
        let EngineStatus::Ready(state) = &mut self.status else {
            return Err(ReplayError::NotLoaded);
        };
        let (events, applied) = step(state.as_mut(), &self.catalog);
        if let Some(action) = applied {
            self.playback
                .enqueue(PlaybackSequence::for_action(&action, &events, self.config.step_seconds));
        }
        self.observers.notify(&state.snapshot(), &events);
        Ok(events)
    }

    /// Advance cosmetic playback by `dt` seconds.
    pub fn advance_playback(&mut self, dt: f32) -> usize {
        self.playback.advance(dt)
    }

    pub fn playback(&self) -> &PlaybackQueue {
        &self.playback
    }

    pub fn complete_all_actions(&mut self) -> usize {
        self.playback.complete_all()
    }

    pub fn shutdown(&self) {
        self.observers.shutdown();
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
