//! Undo-recording mutation of the live board.
//!
//! Every write goes through a [`Transaction`], which keeps the first-touch
//! pre-image of each unit, building and player it changes. Committing yields
//! the [`UndoRecord`]; undo writes the pre-images back verbatim.

use crate::error::NotFound;
use crate::grid::Coord;
use crate::observer::BoardEvent;
use crate::powers::PowerLog;
use crate::state::{GameState, PlayerId, PlayerState, RemovedUnits, ReplayBuilding, ReplayUnit, UnitId};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoRecord {
    units: Vec<(UnitId, Option<ReplayUnit>)>,
    buildings: Vec<(Coord, Option<ReplayBuilding>)>,
    players: Vec<PlayerState>,
    powers: Option<PowerLog>,
}

impl UndoRecord {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.buildings.is_empty() && self.players.is_empty() && self.powers.is_none()
    }

    /// Write the recorded pre-images back into `state`.
    pub fn restore(self, state: &mut GameState, powers: &mut PowerLog) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        for (id, before) in self.units {
            match before {
                Some(unit) => {
                    let added = state.apply_unit_delta(unit);
                    events.push(if added {
                        BoardEvent::UnitAdded { id }
                    } else {
                        BoardEvent::UnitUpdated { id }
                    });
                }
                None => {
                    if state.units.remove(&id).is_some() {
                        events.push(BoardEvent::UnitRemoved { id });
                    }
                }
            }
        }
        for (at, before) in self.buildings {
            match before {
                Some(building) => {
                    state.buildings.insert(at, building);
                }
                None => {
                    state.buildings.remove(&at);
                }
            }
            events.push(BoardEvent::BuildingChanged { at });
        }
        for player in self.players {
            events.push(BoardEvent::PlayerChanged { id: player.id });
            state.players.insert(player.id, player);
        }
        if let Some(log) = self.powers {
            *powers = log;
        }
        events
    }
}

pub struct Transaction<'a> {
    state: &'a mut GameState,
    powers: &'a mut PowerLog,
    undo: UndoRecord,
    events: Vec<BoardEvent>,
    seen_units: FxHashSet<UnitId>,
    seen_buildings: FxHashSet<Coord>,
    seen_players: FxHashSet<PlayerId>,
}

impl<'a> Transaction<'a> {
    pub fn new(state: &'a mut GameState, powers: &'a mut PowerLog) -> Self {
        Self {
            state,
            powers,
            undo: UndoRecord::default(),
            events: Vec::new(),
            seen_units: FxHashSet::default(),
            seen_buildings: FxHashSet::default(),
            seen_players: FxHashSet::default(),
        }
    }

    pub fn state(&self) -> &GameState {
        self.state
    }

    pub fn powers(&self) -> &PowerLog {
        self.powers
    }

    fn touch_unit(&mut self, id: UnitId) {
        if self.seen_units.insert(id) {
            let before = self.state.units.get(&id).cloned();
            self.undo.units.push((id, before));
        }
    }

    fn touch_building(&mut self, at: Coord) {
        if self.seen_buildings.insert(at) {
            let before = self.state.buildings.get(&at).cloned();
            self.undo.buildings.push((at, before));
        }
    }

    fn touch_player(&mut self, id: PlayerId) -> Result<(), NotFound> {
        if !self.seen_players.contains(&id) {
            let before = self.state.player(id)?.clone();
            self.seen_players.insert(id);
            self.undo.players.push(before);
        }
        Ok(())
    }

    /// Overwrite-or-insert a unit.
    pub fn put_unit(&mut self, unit: ReplayUnit) {
        let id = unit.id;
        self.touch_unit(id);
        let added = self.state.apply_unit_delta(unit);
        self.events.push(if added {
            BoardEvent::UnitAdded { id }
        } else {
            BoardEvent::UnitUpdated { id }
        });
    }

    pub fn update_unit(&mut self, id: UnitId, f: impl FnOnce(&mut ReplayUnit)) -> Result<(), NotFound> {
        let mut unit = self.state.unit(id)?.clone();
        f(&mut unit);
        self.put_unit(unit);
        Ok(())
    }

    /// Remove a unit with its cargo, detaching it from any carrier.
    pub fn remove_unit(&mut self, id: UnitId, caused_explosion: bool) -> Result<RemovedUnits, NotFound> {
        let unit = self.state.unit(id)?.clone();

        let mut affected = vec![id];
        let mut pending = unit.cargo.clone();
        while let Some(cargo_id) = pending.pop() {
            affected.push(cargo_id);
            if let Some(cargo) = self.state.try_unit(cargo_id) {
                pending.extend(cargo.cargo.iter().copied());
            }
        }
        let carriers: Vec<UnitId> = if unit.being_carried {
            self.state
                .units
                .values()
                .filter(|t| t.cargo.contains(&id))
                .map(|t| t.id)
                .collect()
        } else {
            Vec::new()
        };
        for touched in affected.into_iter().chain(carriers.iter().copied()) {
            self.touch_unit(touched);
        }

        let removed = self.state.remove_unit(id, caused_explosion)?;
        for removed_id in &removed.ids {
            self.events.push(BoardEvent::UnitRemoved { id: *removed_id });
        }
        for at in &removed.explosions {
            self.events.push(BoardEvent::Explosion { at: *at });
        }
        for carrier in carriers {
            self.events.push(BoardEvent::UnitUpdated { id: carrier });
        }
        Ok(removed)
    }

    pub fn put_building(&mut self, building: ReplayBuilding) {
        let at = building.position;
        self.touch_building(at);
        self.state.update_building(building, false);
        self.events.push(BoardEvent::BuildingChanged { at });
    }

    pub fn update_building(&mut self, at: Coord, f: impl FnOnce(&mut ReplayBuilding)) -> Result<(), NotFound> {
        let mut building = self.state.building(at)?.clone();
        f(&mut building);
        self.put_building(building);
        Ok(())
    }

    pub fn update_player(&mut self, id: PlayerId, f: impl FnOnce(&mut PlayerState)) -> Result<(), NotFound> {
        self.touch_player(id)?;
        if let Some(player) = self.state.players.get_mut(&id) {
            f(player);
        }
        self.events.push(BoardEvent::PlayerChanged { id });
        Ok(())
    }

    pub fn powers_mut(&mut self) -> &mut PowerLog {
        if self.undo.powers.is_none() {
            self.undo.powers = Some(self.powers.clone());
        }
        self.powers
    }

    pub fn commit(self) -> (UndoRecord, Vec<BoardEvent>) {
        (self.undo, self.events)
    }

    /// Put everything back as it was before the transaction.
    pub fn rollback(self) {
        let _ = self.undo.restore(self.state, self.powers);
    }
}
