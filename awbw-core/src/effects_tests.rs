//! Unit tests for effects.rs action application.
use super::*;
use crate::error::NotFound;
use crate::observer::BoardEvent;
use crate::powers::PowerLog;
use crate::state::{income_buildings, recompute_player_stats, GameState};
use crate::testing::{unit, GameStateBuilder};
use crate::undo::UndoRecord;

fn apply(
    state: &mut GameState,
    powers: &mut PowerLog,
    action: &Action,
) -> Result<(UndoRecord, Vec<BoardEvent>), ReplayError> {
    let catalog = Catalog::standard();
    let config = EngineConfig::default();
    let ctx = ApplyContext {
        catalog: &catalog,
        config: &config,
    };
    let mut txn = Transaction::new(state, powers);
    match apply_action(&mut txn, action, &ctx) {
        Ok(()) => Ok(txn.commit()),
        Err(e) => {
            txn.rollback();
            Err(e)
        }
    }
}

/// Applies `action` and checks that its undo record restores the exact
/// pre-action board.
fn apply_checked(state: &mut GameState, powers: &mut PowerLog, action: &Action) -> Vec<BoardEvent> {
    let before = state.clone();
    let powers_before = powers.clone();
    let (undo, events) = apply(state, powers, action).unwrap();

    let mut undone = state.clone();
    let mut undone_powers = powers.clone();
    undo.restore(&mut undone, &mut undone_powers);
    assert_eq!(undone, before, "undo of {} is not exact", action);
    assert_eq!(undone_powers, powers_before);
    events
}

fn mv(post: ReplayUnit, path: &[(i32, i32)]) -> MoveAction {
    MoveAction {
        unit: post,
        path: path.iter().map(|(x, y)| Coord::new(*x, *y)).collect(),
        trapped: false,
    }
}

fn hp(whole: i32) -> HitPoints {
    HitPoints::from_whole(whole)
}

#[test]
fn test_move_relocates_unit() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_unit(1, "Infantry", 1, (0, 0))
        .build();
    let mut post = unit(1, "Infantry", 1, (0, 2));
    post.fuel = 97;

    let events = apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::Move(mv(post, &[(0, 0), (0, 1), (0, 2)])),
    );

    let moved = state.unit(1).unwrap();
    assert_eq!(moved.position, Some(Coord::new(0, 2)));
    assert_eq!(moved.fuel, 97);
    assert_eq!(moved.times_moved, 1);
    assert_eq!(events, vec![BoardEvent::UnitUpdated { id: 1 }]);
}

#[test]
fn test_trapped_move_cancels_attack() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_player(2, 2)
        .with_unit(1, "Tank", 1, (0, 0))
        .with_unit(2, "Infantry", 2, (3, 0))
        .build();
    let mut movement = mv(unit(1, "Tank", 1, (1, 0)), &[(0, 0), (1, 0)]);
    movement.trapped = true;
    let mut defender = unit(2, "Infantry", 2, (3, 0));
    defender.hit_points = hp(0);

    apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::AttackUnit {
            movement: Some(movement),
            attacker: unit(1, "Tank", 1, (1, 0)),
            defender,
            power_changes: vec![],
        },
    );

    assert_eq!(state.unit(1).unwrap().position, Some(Coord::new(1, 0)));
    assert_eq!(state.unit(2).unwrap().hit_points, HitPoints::FULL);
}

#[test]
fn test_moving_capturer_resets_progress() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_unit_where(1, "Infantry", 1, (2, 2), |u| u.capturing = true)
        .with_building((2, 2), 34, None)
        .build();
    state.buildings.get_mut(&Coord::new(2, 2)).unwrap().capture = CaptureProgress::new(10);

    apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::Move(mv(unit(1, "Infantry", 1, (2, 3)), &[(2, 2), (2, 3)])),
    );

    let building = state.building(Coord::new(2, 2)).unwrap();
    assert!(building.capture.is_untouched());
    assert_eq!(building.last_capture.get(), 10);
    assert!(!state.unit(1).unwrap().capturing);
}

#[test]
fn test_attack_destroys_defender() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_player(2, 2)
        .with_unit(1, "Tank", 1, (0, 0))
        .with_unit(2, "Infantry", 2, (2, 0))
        .build();
    let mut attacker = unit(1, "Tank", 1, (1, 0));
    attacker.ammo = 8;
    let mut defender = unit(2, "Infantry", 2, (2, 0));
    defender.hit_points = hp(0);

    let events = apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::AttackUnit {
            movement: Some(mv(unit(1, "Tank", 1, (1, 0)), &[(0, 0), (1, 0)])),
            attacker,
            defender,
            power_changes: vec![
                PowerChange { player: 1, power: 1200 },
                PowerChange { player: 2, power: 2000 },
            ],
        },
    );

    assert_eq!(state.unit(1).unwrap().ammo, 8);
    assert_eq!(state.unit(1).unwrap().position, Some(Coord::new(1, 0)));
    assert!(state.try_unit(2).is_none());
    assert!(events.contains(&BoardEvent::Explosion { at: Coord::new(2, 0) }));
    assert_eq!(state.players[&2].power, 2000);
}

#[test]
fn test_build_unit() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_funds(1, 10_000)
        .with_building((1, 1), 39, Some(1))
        .build();
    let mut powers = PowerLog::new();
    let action = Action::BuildUnit {
        unit: unit(9, "Tank", 1, (1, 1)),
        cost: None,
    };

    apply_checked(&mut state, &mut powers, &action);

    assert_eq!(state.players[&1].funds, 3000);
    assert!(state.building(Coord::new(1, 1)).unwrap().has_acted);
    assert_eq!(state.unit(9).unwrap().unit_type, "Tank");

    // Same id again: rejected and rolled back.
    let before = state.clone();
    let err = apply(&mut state, &mut powers, &action).unwrap_err();
    assert!(matches!(err, ReplayError::MalformedReplay(_)));
    assert_eq!(state, before);
}

#[test]
fn test_build_requires_building() {
    let mut state = GameStateBuilder::new(5, 5).with_player(1, 1).build();
    let err = apply(
        &mut state,
        &mut PowerLog::new(),
        &Action::BuildUnit {
            unit: unit(9, "Tank", 1, (1, 1)),
            cost: Some(7000),
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ReplayError::NotFound(NotFound::Building(c)) if c == Coord::new(1, 1)
    ));
}

fn capture_fixture() -> GameState {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_player(2, 2)
        .with_unit_where(1, "Infantry", 1, (2, 2), |u| u.capturing = true)
        .with_building((2, 2), 34, None)
        .build();
    state.buildings.get_mut(&Coord::new(2, 2)).unwrap().capture = CaptureProgress::new(10);
    state
}

fn capture_step(progress: i32) -> Action {
    Action::CaptureBuilding {
        movement: None,
        unit: 1,
        building: ReplayBuilding {
            position: Coord::new(2, 2),
            terrain_id: 34,
            owner: None,
            capture: CaptureProgress::new(progress),
            last_capture: CaptureProgress::new(10),
            has_acted: false,
        },
    }
}

#[test]
fn test_capture_short_of_zero_keeps_owner() {
    let catalog = Catalog::standard();
    let mut state = capture_fixture();

    apply_checked(&mut state, &mut PowerLog::new(), &capture_step(1));

    let building = state.building(Coord::new(2, 2)).unwrap();
    assert_eq!(building.owner, None);
    assert_eq!(building.capture.get(), 1);
    assert_eq!(building.last_capture.get(), 10);
    assert!(state.unit(1).unwrap().capturing);
    assert_eq!(income_buildings(&state, &catalog, 1), 0);
}

#[test]
fn test_capture_flips_owner_at_zero() {
    let catalog = Catalog::standard();
    let mut state = capture_fixture();
    let before = recompute_player_stats(&state, &catalog, 1000);

    apply_checked(&mut state, &mut PowerLog::new(), &capture_step(0));

    let building = state.building(Coord::new(2, 2)).unwrap();
    assert_eq!(building.owner, Some(1));
    assert_eq!(building.terrain_id, 38);
    assert!(building.capture.is_untouched());
    assert!(!state.unit(1).unwrap().capturing);

    let after = recompute_player_stats(&state, &catalog, 1000);
    assert_eq!(before[&1].property_value, 0);
    assert_eq!(after[&1].property_value, 1000);
    assert_eq!(after[&1].income_buildings, 1);
}

#[test]
fn test_hq_capture_eliminates_owner() {
    let mut state = GameStateBuilder::new(6, 6)
        .day(9)
        .with_player(1, 1)
        .with_player(2, 2)
        .with_unit(1, "Infantry", 1, (4, 4))
        .with_unit(5, "Tank", 2, (0, 0))
        .with_unit(6, "APC", 2, (1, 0))
        .with_carried_unit(7, "Infantry", 2, 6)
        .with_building((4, 4), 47, Some(2))
        .with_building((0, 4), 43, Some(2))
        .build();

    apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::CaptureBuilding {
            movement: None,
            unit: 1,
            building: ReplayBuilding {
                position: Coord::new(4, 4),
                terrain_id: 47,
                owner: Some(2),
                capture: CaptureProgress::new(0),
                last_capture: CaptureProgress::full(),
                has_acted: false,
            },
        },
    );

    assert_eq!(state.players[&2].eliminated_on, Some(9));
    assert_eq!(state.building(Coord::new(4, 4)).unwrap().terrain_id, 38);
    let city = state.building(Coord::new(0, 4)).unwrap();
    assert_eq!((city.owner, city.terrain_id), (Some(1), 38));
    assert_eq!(state.units.keys().copied().collect::<Vec<_>>(), vec![1]);
}

fn join_fixture(hp_each: i32) -> GameState {
    GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_unit_where(1, "Infantry", 1, (1, 1), |u| u.hit_points = hp(hp_each))
        .with_unit_where(2, "Infantry", 1, (1, 2), |u| u.hit_points = hp(hp_each))
        .build()
}

fn join_action(hp_each: i32) -> Action {
    let mut moved = unit(1, "Infantry", 1, (1, 2));
    moved.hit_points = hp(hp_each);
    Action::JoinUnit {
        movement: Some(mv(moved, &[(1, 1), (1, 2)])),
        joining: 1,
        target: 2,
    }
}

#[test]
fn test_join_at_exact_cap_refunds_nothing() {
    let mut state = join_fixture(5);

    apply_checked(&mut state, &mut PowerLog::new(), &join_action(5));

    assert!(state.try_unit(1).is_none());
    assert_eq!(state.unit(2).unwrap().hit_points.display(), 10);
    assert_eq!(state.players[&1].funds, 0);
}

#[test]
fn test_join_overflow_refunds_excess() {
    let mut state = join_fixture(8);

    apply_checked(&mut state, &mut PowerLog::new(), &join_action(8));

    assert_eq!(state.unit(2).unwrap().hit_points, HitPoints::FULL);
    // 16 - 10 = 6 HP over, 6 * 1000 / 10
    assert_eq!(state.players[&1].funds, 600);
}

#[test]
fn test_black_bomb_explosion() {
    let catalog = Catalog::standard();
    let mut state = GameStateBuilder::new(9, 9)
        .with_player(1, 1)
        .with_player(2, 2)
        .with_unit(1, "Black Bomb", 1, (4, 4))
        .with_unit(2, "Tank", 2, (4, 5))
        .with_unit(3, "Tank", 2, (6, 4))
        .with_unit_where(4, "Infantry", 2, (4, 1), |u| u.hit_points = hp(2))
        .with_unit(5, "Tank", 2, (8, 4))
        .with_unit(6, "Infantry", 1, (3, 4))
        .build();
    let before = recompute_player_stats(&state, &catalog, 1000);
    assert_eq!(before[&1].unit_value, 26_000);
    assert_eq!(before[&2].unit_value, 21_000 + 200);

    let events = apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::ExplodeUnit {
            movement: None,
            unit: 1,
            radius: 3,
            hp_change: -3,
        },
    );

    assert!(state.try_unit(1).is_none());
    assert_eq!(state.unit(2).unwrap().hit_points, hp(7));
    assert_eq!(state.unit(3).unwrap().hit_points, hp(7));
    assert!(state.try_unit(4).is_none());
    assert_eq!(state.unit(5).unwrap().hit_points, HitPoints::FULL);
    assert_eq!(state.unit(6).unwrap().hit_points, hp(7));
    assert!(events.contains(&BoardEvent::Explosion { at: Coord::new(4, 4) }));
    assert!(events.contains(&BoardEvent::Explosion { at: Coord::new(4, 1) }));

    let after = recompute_player_stats(&state, &catalog, 1000);
    assert_eq!(after[&1].unit_value, 700);
    assert_eq!(after[&2].unit_value, 4900 + 4900 + 7000);
}

#[test]
fn test_launch_rocket_empties_silo() {
    let mut state = GameStateBuilder::new(8, 8)
        .with_player(1, 1)
        .with_player(2, 2)
        .with_unit(1, "Infantry", 1, (0, 0))
        .with_unit(2, "Tank", 2, (5, 6))
        .with_unit(3, "Tank", 2, (7, 7))
        .with_building((0, 0), 111, None)
        .build();

    apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::LaunchRocket {
            movement: None,
            unit: 1,
            silo: Coord::new(0, 0),
            target: Coord::new(5, 5),
            radius: 2,
            hp_change: -3,
        },
    );

    assert_eq!(state.terrain_at(Coord::new(0, 0)), Some(112));
    assert_eq!(state.unit(2).unwrap().hit_points, hp(7));
    assert_eq!(state.unit(3).unwrap().hit_points, HitPoints::FULL);
}

#[test]
fn test_load_then_unload() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_unit(1, "APC", 1, (2, 2))
        .with_unit(2, "Infantry", 1, (2, 1))
        .build();
    let mut powers = PowerLog::new();

    apply_checked(
        &mut state,
        &mut powers,
        &Action::LoadUnit {
            movement: Some(mv(unit(2, "Infantry", 1, (2, 2)), &[(2, 1), (2, 2)])),
            loaded: 2,
            transport: 1,
        },
    );
    let cargo = state.unit(2).unwrap();
    assert!(cargo.being_carried);
    assert_eq!(cargo.position, None);
    assert_eq!(state.unit(1).unwrap().cargo, vec![2]);
    assert!(state.try_unit_at(Coord::new(2, 2)).is_some_and(|u| u.id == 1));

    apply_checked(
        &mut state,
        &mut powers,
        &Action::UnloadUnit {
            movement: None,
            transport: 1,
            unloaded: unit(2, "Infantry", 1, (3, 2)),
        },
    );
    let cargo = state.unit(2).unwrap();
    assert!(!cargo.being_carried);
    assert_eq!(cargo.position, Some(Coord::new(3, 2)));
    assert!(state.unit(1).unwrap().cargo.is_empty());
}

#[test]
fn test_repair_charges_for_restored_hp() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_funds(1, 5000)
        .with_unit(1, "Black Boat", 1, (0, 0))
        .with_unit_where(2, "Tank", 1, (0, 1), |u| {
            u.hit_points = hp(6);
            u.ammo = 2;
        })
        .build();

    apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::RepairUnit {
            movement: None,
            supplier: 1,
            repaired: 2,
            hp_after: 7,
        },
    );

    let tank = state.unit(2).unwrap();
    assert_eq!(tank.hit_points, hp(7));
    assert_eq!(tank.ammo, 9);
    assert_eq!(state.players[&1].funds, 4300);
}

#[test]
fn test_supply_refills_ammo_and_fuel() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_unit(1, "APC", 1, (0, 0))
        .with_unit_where(2, "Tank", 1, (0, 1), |u| {
            u.ammo = 0;
            u.fuel = 10;
        })
        .build();

    apply_checked(
        &mut state,
        &mut PowerLog::new(),
        &Action::SupplyUnit {
            movement: None,
            supplier: 1,
            supplied: vec![2],
        },
    );

    let tank = state.unit(2).unwrap();
    assert_eq!((tank.ammo, tank.fuel), (9, 70));
}

#[test]
fn test_hide_and_unhide() {
    let mut state = GameStateBuilder::new(5, 5)
        .with_player(1, 1)
        .with_unit(1, "Sub", 1, (0, 0))
        .build();
    let mut powers = PowerLog::new();

    apply_checked(&mut state, &mut powers, &Action::HideUnit { movement: None, unit: 1 });
    assert!(state.unit(1).unwrap().hidden);
    apply_checked(&mut state, &mut powers, &Action::UnhideUnit { movement: None, unit: 1 });
    assert!(!state.unit(1).unwrap().hidden);
}

#[test]
fn test_power_activation_logs_effect() {
    let mut state = GameStateBuilder::new(5, 5)
        .day(4)
        .with_player(1, 1)
        .with_co(1, 18)
        .with_unit(1, "Tank", 1, (0, 0))
        .build();
    let mut powers = PowerLog::new();
    let mut healed = unit(1, "Tank", 1, (0, 0));
    healed.hit_points = hp(10);

    apply_checked(
        &mut state,
        &mut powers,
        &Action::PowerActivation {
            player: 1,
            power: PowerKind::Super,
            power_after: 0,
            unit_changes: vec![healed],
            funds_after: Some(100),
        },
    );

    let player = &state.players[&1];
    assert_eq!(player.active_power, PowerKind::Super);
    assert_eq!(player.funds, 100);
    assert_eq!(powers.vision_bonus(1), 1);
    assert_eq!(powers.entries()[0].day, 4);
}

#[test]
fn test_unknown_unit_is_not_found() {
    let mut state = GameStateBuilder::new(5, 5).with_player(1, 1).build();
    let err = apply(
        &mut state,
        &mut PowerLog::new(),
        &Action::DeleteUnit {
            movement: None,
            unit: 99,
        },
    )
    .unwrap_err();
    assert!(matches!(err, ReplayError::NotFound(NotFound::Unit(99))));
}
