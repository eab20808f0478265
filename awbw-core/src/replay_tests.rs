//! Scenario tests for replay navigation, desync precomputation and the
//! engine front door.
use super::*;
use crate::action::MoveAction;
use crate::bounded::CaptureProgress;
use crate::desync::DesyncEntry;
use crate::grid::Coord;
use crate::observer::ObserverError;
use crate::state::{income_buildings, PowerKind, ReplayBuilding};
use crate::testing::{unit, GameStateBuilder, ReplayBuilder};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const FUNDS_PER_BUILDING: i64 = 1000;

fn board() -> GameStateBuilder {
    GameStateBuilder::new(6, 6)
        .with_player(1, 1)
        .with_player(2, 2)
        .with_building((0, 0), 38, Some(1))
        .with_building((0, 1), 39, Some(1))
        .with_building((5, 5), 43, Some(2))
        .with_building((3, 3), 34, None)
}

fn walk(id: u64, code: &str, player: u64, path: &[(i32, i32)]) -> Action {
    let (x, y) = path[path.len() - 1];
    let mut post = unit(id, code, player, (x, y));
    post.fuel -= path.len() as i32 - 1;
    Action::Move(MoveAction {
        unit: post,
        path: path.iter().map(|(x, y)| Coord::new(*x, *y)).collect(),
        trapped: false,
    })
}

fn end_turn(next_player: u64, next_day: u32) -> Action {
    Action::EndTurn {
        next_player,
        next_day,
    }
}

fn with_capture_progress(mut state: GameState, at: (i32, i32), progress: i32) -> GameState {
    if let Some(building) = state.buildings.get_mut(&Coord::new(at.0, at.1)) {
        building.capture = CaptureProgress::new(progress);
    }
    state
}

/// Three turns: player 1 moves, half-captures a city and builds; player 2
/// moves; then day 2 starts. Every snapshot agrees with the actions.
fn snapshots() -> Vec<GameState> {
    let catalog = Catalog::standard();

    let start = board()
        .with_funds(1, 5000)
        .with_funds(2, 3000)
        .with_unit(1, "Infantry", 1, (2, 3))
        .with_unit(2, "Infantry", 2, (5, 0))
        .build();

    let p2_income = FUNDS_PER_BUILDING * income_buildings(&start, &catalog, 2) as i64;
    let second = with_capture_progress(
        board()
            .active_player(2)
            .with_funds(1, 4000)
            .with_funds(2, 3000 + p2_income)
            .with_unit_where(1, "Infantry", 1, (3, 3), |u| u.capturing = true)
            .with_unit(2, "Infantry", 2, (5, 0))
            .with_unit(3, "Infantry", 1, (0, 1))
            .build(),
        (3, 3),
        10,
    );

    let p1_income = FUNDS_PER_BUILDING * income_buildings(&start, &catalog, 1) as i64;
    let third = with_capture_progress(
        board()
            .day(2)
            .with_funds(1, 4000 + p1_income)
            .with_funds(2, 3000 + p2_income)
            .with_unit_where(1, "Infantry", 1, (3, 3), |u| u.capturing = true)
            .with_unit(2, "Infantry", 2, (5, 2))
            .with_unit(3, "Infantry", 1, (0, 1))
            .build(),
        (3, 3),
        10,
    );

    vec![start, second, third]
}

fn fixture_with(snapshots: &[GameState]) -> (ReplayData, ReplayMap) {
    let capture_step = ReplayBuilding {
        position: Coord::new(3, 3),
        terrain_id: 34,
        owner: None,
        capture: CaptureProgress::new(10),
        last_capture: CaptureProgress::full(),
        has_acted: false,
    };
    ReplayBuilder::new()
        .funds_per_building(FUNDS_PER_BUILDING)
        .turn(
            snapshots[0].clone(),
            vec![
                walk(1, "Infantry", 1, &[(2, 3), (3, 3)]),
                Action::CaptureBuilding {
                    movement: None,
                    unit: 1,
                    building: capture_step,
                },
                Action::BuildUnit {
                    unit: unit(3, "Infantry", 1, (0, 1)),
                    cost: None,
                },
                end_turn(2, 1),
            ],
        )
        .turn(
            snapshots[1].clone(),
            vec![walk(2, "Infantry", 2, &[(5, 0), (5, 1), (5, 2)]), end_turn(1, 2)],
        )
        .turn(snapshots[2].clone(), vec![])
        .build()
}

fn load(data: ReplayData, map: ReplayMap) -> ReplayState {
    ReplayState::load(data, map, &Catalog::standard(), &EngineConfig::default()).unwrap()
}

fn loaded() -> ReplayState {
    let (data, map) = fixture_with(&snapshots());
    load(data, map)
}

#[test]
fn test_load_starts_at_first_turn() {
    let state = loaded();
    assert_eq!(state.cursor(), Cursor::start());
    assert_eq!(state.turn_count(), 3);
    assert_eq!(state.live(), &snapshots()[0]);
    assert_eq!(state.stats()[&1].unit_count, 1);
    assert!(!state.fog_enabled());
    assert_eq!(state.fog().visible_count(), 36);
    assert!(state.has_next_action());
    assert!(!state.has_previous_action());
}

#[test]
fn test_load_reports_first_fog_grid() {
    let (data, map) = fixture_with(&snapshots());
    let (state, events) =
        ReplayState::load_with_events(data, map, &Catalog::standard(), &EngineConfig::default()).unwrap();

    assert_eq!(
        events[0],
        BoardEvent::TurnStarted {
            turn: 0,
            day: 1,
            active_player: 1,
        }
    );
    assert_eq!(events.iter().filter(|e| **e == BoardEvent::FogChanged).count(), 1);
    assert_eq!(state.cursor(), Cursor::start());

    // Fog on with nothing in sight still announces the grid.
    let (data, map) = ReplayBuilder::new()
        .fog(true)
        .turn(GameStateBuilder::new(3, 3).with_player(1, 1).build(), vec![])
        .build();
    let (state, events) =
        ReplayState::load_with_events(data, map, &Catalog::standard(), &EngineConfig::default()).unwrap();
    assert_eq!(state.fog().visible_count(), 0);
    assert!(events.contains(&BoardEvent::FogChanged));
}

#[test]
fn test_consistent_replay_has_no_desyncs() {
    let state = loaded();
    assert_eq!(state.desync_reports().len(), 2);
    for report in state.desync_reports() {
        assert!(report.is_clean(), "turn {}: {:?}", report.turn, report.entries);
    }
}

#[test]
fn test_desync_is_reported_and_snapshot_wins() {
    let mut turns = snapshots();
    turns[1].players.get_mut(&1).unwrap().funds = 9999;
    let (data, map) = fixture_with(&turns);
    let catalog = Catalog::standard();
    let mut state = load(data, map);

    let report = &state.desync_reports()[0];
    assert_eq!(
        report.entries,
        vec![DesyncEntry::Funds {
            player: 1,
            expected: 9999,
            actual: 4000,
        }]
    );
    // The bad figure is authoritative from turn 1 on, so the next
    // comparison carries it forward.
    let p1_income = FUNDS_PER_BUILDING * income_buildings(&turns[0], &catalog, 1) as i64;
    assert_eq!(
        state.desync_reports()[1].entries,
        vec![DesyncEntry::Funds {
            player: 1,
            expected: 4000 + p1_income,
            actual: 9999 + p1_income,
        }]
    );

    state.go_to_turn(1, &catalog);
    assert_eq!(state.live().player(1).unwrap().funds, 9999);
}

#[test]
fn test_next_action_plays_turn_then_crosses_end_turn() {
    let catalog = Catalog::standard();
    let mut state = loaded();

    let events = state.go_to_next_action(&catalog);
    assert_eq!(state.cursor(), Cursor { turn: 0, action: 0 });
    assert_eq!(events, vec![BoardEvent::UnitUpdated { id: 1 }]);
    assert_eq!(state.live().unit(1).unwrap().position, Some(Coord::new(3, 3)));

    state.go_to_next_action(&catalog);
    assert_eq!(
        state.live().building(Coord::new(3, 3)).unwrap().capture.get(),
        10
    );

    state.go_to_next_action(&catalog);
    assert_eq!(state.cursor(), Cursor { turn: 0, action: 2 });
    assert_eq!(state.live().player(1).unwrap().funds, 4000);
    assert_eq!(state.stats()[&1].unit_count, 2);

    // The end of turn is a transition, not a board change.
    let events = state.go_to_next_action(&catalog);
    assert_eq!(state.cursor(), Cursor::turn_start(1));
    assert_eq!(
        events[0],
        BoardEvent::TurnStarted {
            turn: 1,
            day: 1,
            active_player: 2,
        }
    );
    assert_eq!(state.live(), &snapshots()[1]);
}

#[test]
fn test_previous_action_restores_exact_state() {
    let catalog = Catalog::standard();
    let mut state = loaded();
    let start = state.live().clone();

    for _ in 0..3 {
        state.go_to_next_action(&catalog);
    }
    for _ in 0..3 {
        state.go_to_previous_action(&catalog);
    }

    assert_eq!(state.cursor(), Cursor::start());
    assert_eq!(state.live(), &start);
    assert!(state.go_to_previous_action(&catalog).is_empty());
}

#[test]
fn test_previous_from_turn_start_replays_previous_turn() {
    let catalog = Catalog::standard();
    let mut state = loaded();
    state.go_to_turn(1, &catalog);

    state.go_to_previous_action(&catalog);
    assert_eq!(state.cursor(), Cursor { turn: 0, action: 2 });
    assert!(state.live().try_unit(3).is_some());
    assert_eq!(state.live().player(1).unwrap().funds, 4000);
}

#[test]
fn test_go_to_turn_clamps_and_loads_snapshot() {
    let catalog = Catalog::standard();
    let mut state = loaded();
    state.go_to_next_action(&catalog);

    state.go_to_turn(99, &catalog);
    assert_eq!(state.cursor(), Cursor::turn_start(2));
    assert_eq!(state.live(), &snapshots()[2]);
    assert!(!state.has_next_action());
    assert!(state.go_to_next_action(&catalog).is_empty());
    assert_eq!(state.cursor(), Cursor::turn_start(2));
}

#[test]
fn test_empty_slots_are_skipped_both_ways() {
    let catalog = Catalog::standard();
    let start = board()
        .with_unit(1, "Infantry", 1, (2, 3))
        .with_unit(2, "Infantry", 2, (5, 0))
        .build();
    let next = board()
        .active_player(2)
        .with_unit(1, "Infantry", 1, (2, 4))
        .with_unit(2, "Infantry", 2, (5, 0))
        .build();
    let (data, map) = ReplayBuilder::new()
        .turn_with_slots(
            start.clone(),
            vec![
                None,
                Some(walk(1, "Infantry", 1, &[(2, 3), (2, 4)])),
                None,
                Some(end_turn(2, 1)),
            ],
        )
        .turn(next, vec![])
        .build();
    let mut state = load(data, map);

    state.go_to_next_action(&catalog);
    assert_eq!(state.cursor(), Cursor { turn: 0, action: 1 });
    assert_eq!(state.live().unit(1).unwrap().position, Some(Coord::new(2, 4)));

    state.go_to_next_action(&catalog);
    assert_eq!(state.cursor(), Cursor::turn_start(1));

    state.go_to_previous_action(&catalog);
    assert_eq!(state.cursor(), Cursor { turn: 0, action: 1 });

    state.go_to_previous_action(&catalog);
    assert_eq!(state.cursor(), Cursor::start());
    assert_eq!(state.live(), &start);
}

#[test]
fn test_power_expires_on_next_day() {
    let catalog = Catalog::standard();
    let (data, map) = ReplayBuilder::new()
        .turn(
            board().build(),
            vec![
                Action::PowerActivation {
                    player: 1,
                    power: PowerKind::Normal,
                    power_after: 0,
                    unit_changes: vec![],
                    funds_after: None,
                },
                end_turn(2, 2),
            ],
        )
        .turn(board().day(2).active_player(2).build(), vec![])
        .build();
    let mut state = load(data, map);

    state.go_to_next_action(&catalog);
    assert!(state.powers().is_active(1));
    assert_eq!(state.live().player(1).unwrap().active_power, PowerKind::Normal);

    state.go_to_next_action(&catalog);
    assert_eq!(state.cursor(), Cursor::turn_start(1));
    assert!(state.powers().is_empty());

    state.go_to_previous_action(&catalog);
    assert!(state.powers().is_active(1));
}

#[test]
fn test_jump_back_drops_powers_from_later_actions() {
    const SONJA: awbw_data::CoId = 18;
    let catalog = Catalog::standard();
    let sonja = || board().with_co(1, SONJA).with_unit(1, "Infantry", 1, (2, 2));
    let (data, map) = ReplayBuilder::new()
        .fog(true)
        .turn(
            sonja().build(),
            vec![
                Action::PowerActivation {
                    player: 1,
                    power: PowerKind::Normal,
                    power_after: 0,
                    unit_changes: vec![],
                    funds_after: None,
                },
                end_turn(2, 1),
            ],
        )
        .turn(sonja().active_player(2).build(), vec![])
        .build();
    let mut state = load(data, map);
    let fresh_fog = state.fog().clone();

    state.go_to_next_action(&catalog);
    assert!(state.powers().is_active(1));
    assert!(state.fog().visible_count() > fresh_fog.visible_count());
    state.go_to_next_action(&catalog);
    assert_eq!(state.cursor(), Cursor::turn_start(1));

    // Same day, but the power came from an action, not the snapshot.
    state.go_to_turn(0, &catalog);
    assert!(state.powers().is_empty());
    assert_eq!(state.fog(), &fresh_fog);

    state.go_to_next_action(&catalog);
    assert_eq!(state.powers().entries().len(), 1);
    assert_eq!(state.powers().vision_bonus(1), 1);
}

#[test]
fn test_unknown_unit_in_action_is_malformed() {
    let (data, map) = ReplayBuilder::new()
        .turn(
            board().with_unit(1, "Infantry", 1, (0, 0)).build(),
            vec![walk(99, "Infantry", 1, &[(1, 1), (1, 2)])],
        )
        .build();

    let err = ReplayState::load(data, map, &Catalog::standard(), &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, ReplayError::MalformedReplay(ref msg) if msg.contains("unit 99")), "{}", err);
}

#[test]
fn test_missing_turns_or_catalog_entries_are_malformed() {
    let (mut data, map) = fixture_with(&snapshots());
    let catalog = Catalog::standard();
    let config = EngineConfig::default();

    let mut empty = data.clone();
    empty.turns.clear();
    assert!(matches!(
        ReplayState::load(empty, map.clone(), &catalog, &config),
        Err(ReplayError::MalformedReplay(_))
    ));

    data.turns[0].units.get_mut(&1).unwrap().unit_type = "Zeppelin".to_string();
    assert!(matches!(
        ReplayState::load(data, map, &catalog, &config),
        Err(ReplayError::MalformedReplay(_))
    ));
}

struct CountingObserver {
    steps: Arc<AtomicUsize>,
}

impl ReplayObserver for CountingObserver {
    fn on_step(&self, _snapshot: &Snapshot, _events: &[BoardEvent]) -> Result<(), ObserverError> {
        self.steps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[test]
fn test_engine_requires_a_replay() {
    let mut engine = ReplayEngine::new(Arc::new(Catalog::standard()), EngineConfig::default());
    assert!(matches!(engine.status(), EngineStatus::NotLoaded));
    assert!(matches!(engine.go_to_next_action(), Err(ReplayError::NotLoaded)));
    assert!(!engine.has_next_action());
    assert!(engine.desync_reports().is_empty());
}

#[test]
fn test_engine_notifies_and_flushes_playback() {
    let steps = Arc::new(AtomicUsize::new(0));
    let mut engine = ReplayEngine::new(Arc::new(Catalog::standard()), EngineConfig::default());
    engine.register_observer(Box::new(CountingObserver {
        steps: steps.clone(),
    }));
    let (data, map) = fixture_with(&snapshots());
    engine.load_replay(data, map).unwrap();
    assert_eq!(steps.load(Ordering::SeqCst), 1);

    // One path tile.
    engine.go_to_next_action().unwrap();
    assert_eq!(engine.playback().pending_steps(), 1);

    // The move finishes instantly before the capture is shown.
    engine.go_to_next_action().unwrap();
    assert_eq!(engine.playback().pending_steps(), 1);
    assert_eq!(engine.playback().current().unwrap().label, "CaptureBuilding");
    assert_eq!(engine.advance_playback(1.0), 1);
    assert!(engine.playback().is_idle());

    engine.go_to_turn(2).unwrap();
    assert!(engine.playback().is_idle());
    assert_eq!(engine.state().unwrap().cursor(), Cursor::turn_start(2));
    assert_eq!(steps.load(Ordering::SeqCst), 4);
}

proptest! {
    #[test]
    fn prop_undo_retraces_every_step(steps in 0usize..=6) {
        let catalog = Catalog::standard();
        let mut state = loaded();

        let mut trail = vec![(state.cursor(), state.live().clone())];
        for _ in 0..steps {
            state.go_to_next_action(&catalog);
            trail.push((state.cursor(), state.live().clone()));
        }
        trail.pop();
        while let Some((cursor, live)) = trail.pop() {
            state.go_to_previous_action(&catalog);
            prop_assert_eq!(state.cursor(), cursor);
            prop_assert_eq!(state.live(), &live);
        }
    }
}
