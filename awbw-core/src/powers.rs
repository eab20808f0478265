//! Active CO powers and their fog-of-war effects.
//!
//! A power applies only on the day it was activated. Entries are expired on
//! each turn transition, before fog is recomputed.

use crate::state::{GameState, PlayerId, PowerKind};
use awbw_data::{Catalog, PowerEffect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePower {
    pub player: PlayerId,
    pub kind: PowerKind,
    pub effect: PowerEffect,
    pub day: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerLog {
    entries: Vec<ActivePower>,
}

impl PowerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a power. A player has at most one entry per day; a later
    /// activation replaces the earlier one.
    pub fn add_power_activation(&mut self, player: PlayerId, kind: PowerKind, effect: PowerEffect, day: u32) {
        log::debug!("Player {} activates {:?} power on day {}", player, kind, day);
        let entry = ActivePower {
            player,
            kind,
            effect,
            day,
        };
        match self.entries.iter_mut().find(|e| e.player == player && e.day == day) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Drop every entry not activated on `day`. Returns how many were dropped.
    pub fn expire(&mut self, day: u32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.day == day);
        before - self.entries.len()
    }

    /// Add entries for powers the snapshot reports active but the log lacks.
    pub fn sync_with_snapshot(&mut self, state: &GameState, catalog: &Catalog) {
        for player in state.players.values() {
            if player.active_power == PowerKind::None || self.is_active(player.id) {
                continue;
            }
            let effect = effect_of(catalog, player.co, player.active_power);
            self.add_power_activation(player.id, player.active_power, effect, state.day);
        }
    }

    pub fn is_active(&self, player: PlayerId) -> bool {
        self.entries.iter().any(|e| e.player == player)
    }

    pub fn vision_bonus(&self, player: PlayerId) -> i32 {
        self.entries
            .iter()
            .filter(|e| e.player == player)
            .map(|e| e.effect.vision_bonus)
            .sum()
    }

    pub fn sees_hidden_tiles(&self, player: PlayerId) -> bool {
        self.entries
            .iter()
            .any(|e| e.player == player && e.effect.see_hidden_tiles)
    }

    pub fn entries(&self) -> &[ActivePower] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The fog effect of `co`'s power of the given kind. Unknown COs have none.
pub fn effect_of(catalog: &Catalog, co: awbw_data::CoId, kind: PowerKind) -> PowerEffect {
    let Some(data) = catalog.co(co) else {
        log::warn!("Unknown CO {} activated a power", co);
        return PowerEffect::default();
    };
    match kind {
        PowerKind::None => PowerEffect::default(),
        PowerKind::Normal => data.power,
        PowerKind::Super => data.super_power,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GameStateBuilder;

    const SONJA: awbw_data::CoId = 18;

    #[test]
    fn test_expire_keeps_same_day() {
        let mut log = PowerLog::new();
        let effect = PowerEffect {
            vision_bonus: 1,
            see_hidden_tiles: true,
        };
        log.add_power_activation(1, PowerKind::Normal, effect, 3);
        log.add_power_activation(2, PowerKind::Super, PowerEffect::default(), 4);

        assert_eq!(log.expire(4), 1);
        assert!(!log.is_active(1));
        assert!(log.is_active(2));
        assert_eq!(log.vision_bonus(1), 0);
    }

    #[test]
    fn test_same_day_activation_replaces_entry() {
        let mut log = PowerLog::new();
        let sight = PowerEffect {
            vision_bonus: 1,
            see_hidden_tiles: false,
        };
        log.add_power_activation(1, PowerKind::Normal, sight, 3);
        log.add_power_activation(1, PowerKind::Normal, sight, 3);
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.vision_bonus(1), 1);

        log.add_power_activation(1, PowerKind::Super, PowerEffect::default(), 3);
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].kind, PowerKind::Super);
        assert_eq!(log.vision_bonus(1), 0);
    }

    #[test]
    fn test_sync_with_snapshot() {
        let catalog = Catalog::standard();
        let mut state = GameStateBuilder::new(2, 2)
            .day(5)
            .with_player(1, 1)
            .with_player(2, 2)
            .with_co(1, SONJA)
            .build();
        state.players.get_mut(&1).unwrap().active_power = PowerKind::Super;

        let mut log = PowerLog::new();
        log.sync_with_snapshot(&state, &catalog);
        log.sync_with_snapshot(&state, &catalog);

        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].day, 5);
        assert_eq!(log.vision_bonus(1), 1);
        assert!(log.sees_hidden_tiles(1));
        assert!(!log.sees_hidden_tiles(2));
    }
}
