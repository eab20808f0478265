//! The closed set of replay actions.
//!
//! Payloads carry the post-action state the game recorded (units after
//! combat, the building after a capture step) so forward application is a
//! write of recorded values, and undo restores the pre-images captured by
//! [`Transaction`](crate::undo::Transaction).

use crate::grid::Coord;
use crate::state::{PlayerId, PowerKind, ReplayBuilding, ReplayUnit, UnitId};
use serde::{Deserialize, Serialize};

/// Unit repositioning, standalone or preceding another action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAction {
    /// The moving unit after the move.
    pub unit: ReplayUnit,
    /// Tiles walked, start tile first. May be empty for an in-place action.
    #[serde(default)]
    pub path: Vec<Coord>,
    /// Stopped early by a hidden enemy.
    #[serde(default)]
    pub trapped: bool,
}

impl MoveAction {
    pub fn destination(&self) -> Option<Coord> {
        self.path.last().copied().or(self.unit.position)
    }
}

/// A player's power meter after combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerChange {
    pub player: PlayerId,
    pub power: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Move(MoveAction),
    AttackUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        attacker: ReplayUnit,
        defender: ReplayUnit,
        #[serde(default)]
        power_changes: Vec<PowerChange>,
    },
    BuildUnit {
        unit: ReplayUnit,
        /// Price actually paid, when it differs from the catalog.
        #[serde(default)]
        cost: Option<i64>,
    },
    CaptureBuilding {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        unit: UnitId,
        building: ReplayBuilding,
    },
    DeleteUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        unit: UnitId,
    },
    ExplodeUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        unit: UnitId,
        radius: u32,
        /// Whole hit points, negative for damage.
        hp_change: i32,
    },
    LaunchRocket {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        unit: UnitId,
        silo: Coord,
        target: Coord,
        radius: u32,
        hp_change: i32,
    },
    HideUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        unit: UnitId,
    },
    UnhideUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        unit: UnitId,
    },
    LoadUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        loaded: UnitId,
        transport: UnitId,
    },
    UnloadUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        transport: UnitId,
        unloaded: ReplayUnit,
    },
    JoinUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        joining: UnitId,
        target: UnitId,
    },
    RepairUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        supplier: UnitId,
        repaired: UnitId,
        /// Displayed hit points after the repair.
        hp_after: i32,
    },
    SupplyUnit {
        #[serde(default, rename = "move")]
        movement: Option<MoveAction>,
        supplier: UnitId,
        supplied: Vec<UnitId>,
    },
    EndTurn {
        next_player: PlayerId,
        next_day: u32,
    },
    PowerActivation {
        player: PlayerId,
        power: PowerKind,
        /// Meter after paying for the power.
        power_after: i64,
        #[serde(default)]
        unit_changes: Vec<ReplayUnit>,
        #[serde(default)]
        funds_after: Option<i64>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Move(_) => "Move",
            Action::AttackUnit { .. } => "AttackUnit",
            Action::BuildUnit { .. } => "BuildUnit",
            Action::CaptureBuilding { .. } => "CaptureBuilding",
            Action::DeleteUnit { .. } => "DeleteUnit",
            Action::ExplodeUnit { .. } => "ExplodeUnit",
            Action::LaunchRocket { .. } => "LaunchRocket",
            Action::HideUnit { .. } => "HideUnit",
            Action::UnhideUnit { .. } => "UnhideUnit",
            Action::LoadUnit { .. } => "LoadUnit",
            Action::UnloadUnit { .. } => "UnloadUnit",
            Action::JoinUnit { .. } => "JoinUnit",
            Action::RepairUnit { .. } => "RepairUnit",
            Action::SupplyUnit { .. } => "SupplyUnit",
            Action::EndTurn { .. } => "EndTurn",
            Action::PowerActivation { .. } => "PowerActivation",
        }
    }

    pub fn is_end_turn(&self) -> bool {
        matches!(self, Action::EndTurn { .. })
    }

    /// The move preceding the main effect, or the move itself.
    pub fn movement(&self) -> Option<&MoveAction> {
        match self {
            Action::Move(m) => Some(m),
            Action::AttackUnit { movement, .. }
            | Action::CaptureBuilding { movement, .. }
            | Action::DeleteUnit { movement, .. }
            | Action::ExplodeUnit { movement, .. }
            | Action::LaunchRocket { movement, .. }
            | Action::HideUnit { movement, .. }
            | Action::UnhideUnit { movement, .. }
            | Action::LoadUnit { movement, .. }
            | Action::UnloadUnit { movement, .. }
            | Action::JoinUnit { movement, .. }
            | Action::RepairUnit { movement, .. }
            | Action::SupplyUnit { movement, .. } => movement.as_ref(),
            Action::BuildUnit { .. } | Action::EndTurn { .. } | Action::PowerActivation { .. } => None,
        }
    }

    /// Unit codes named by full unit payloads, for catalog validation.
    pub fn unit_types(&self) -> Vec<&str> {
        let mut units: Vec<&ReplayUnit> = Vec::new();
        if let Some(m) = self.movement() {
            units.push(&m.unit);
        }
        match self {
            Action::AttackUnit {
                attacker, defender, ..
            } => {
                units.push(attacker);
                units.push(defender);
            }
            Action::BuildUnit { unit, .. } => units.push(unit),
            Action::UnloadUnit { unloaded, .. } => units.push(unloaded),
            Action::PowerActivation { unit_changes, .. } => units.extend(unit_changes),
            _ => {}
        }
        units.into_iter().map(|u| u.unit_type.as_str()).collect()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Move(m) => match m.destination() {
                Some(to) => write!(f, "Move unit {} to {}", m.unit.id, to),
                None => write!(f, "Move unit {}", m.unit.id),
            },
            Action::AttackUnit {
                attacker, defender, ..
            } => write!(f, "Unit {} attacks unit {}", attacker.id, defender.id),
            Action::BuildUnit { unit, .. } => write!(f, "Build {} (unit {})", unit.unit_type, unit.id),
            Action::CaptureBuilding { unit, building, .. } => write!(
                f,
                "Unit {} captures {} ({} left)",
                unit,
                building.position,
                building.capture.get()
            ),
            Action::ExplodeUnit { unit, radius, .. } => {
                write!(f, "Unit {} explodes (radius {})", unit, radius)
            }
            Action::LaunchRocket { unit, target, .. } => {
                write!(f, "Unit {} launches a rocket at {}", unit, target)
            }
            Action::LoadUnit {
                loaded, transport, ..
            } => write!(f, "Load unit {} into {}", loaded, transport),
            Action::UnloadUnit {
                transport, unloaded, ..
            } => write!(f, "Unload unit {} from {}", unloaded.id, transport),
            Action::JoinUnit { joining, target, .. } => write!(f, "Join unit {} into {}", joining, target),
            Action::RepairUnit {
                supplier, repaired, ..
            } => write!(f, "Unit {} repairs {}", supplier, repaired),
            Action::SupplyUnit {
                supplier, supplied, ..
            } => write!(f, "Unit {} supplies {} units", supplier, supplied.len()),
            Action::EndTurn {
                next_player,
                next_day,
            } => write!(f, "End turn, player {} on day {}", next_player, next_day),
            Action::PowerActivation { player, power, .. } => {
                write!(f, "Player {} activates {:?} power", player, power)
            }
            Action::DeleteUnit { unit, .. } | Action::HideUnit { unit, .. } | Action::UnhideUnit { unit, .. } => {
                write!(f, "{} unit {}", self.name(), unit)
            }
        }
    }
}
