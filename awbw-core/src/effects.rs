//! Forward application of each action variant.
//!
//! All writes go through a [`Transaction`] so the caller gets an undo record
//! for free. A compound action runs its embedded move first; if that move was
//! trapped the main effect never happens.

use crate::action::{Action, MoveAction, PowerChange};
use crate::bounded::{CaptureProgress, HitPoints};
use crate::config::EngineConfig;
use crate::error::ReplayError;
use crate::grid::Coord;
use crate::powers;
use crate::state::{CountryId, PlayerId, PowerKind, ReplayBuilding, ReplayUnit, TerrainId, UnitId};
use crate::undo::Transaction;
use awbw_data::{BuildingKind, Catalog};

/// Read-only inputs shared by every action.
#[derive(Clone, Copy)]
pub struct ApplyContext<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a EngineConfig,
}

pub fn apply_action(txn: &mut Transaction<'_>, action: &Action, ctx: &ApplyContext<'_>) -> Result<(), ReplayError> {
    log::trace!("Applying {}", action);
    match action {
        Action::Move(movement) => apply_move(txn, movement).map(|_| ()),
        Action::AttackUnit {
            movement,
            attacker,
            defender,
            power_changes,
        } => {
            if run_move(txn, movement)? {
                attack(txn, attacker, defender, power_changes)?;
            }
            Ok(())
        }
        Action::BuildUnit { unit, cost } => build(txn, ctx, unit, *cost),
        Action::CaptureBuilding {
            movement,
            unit,
            building,
        } => {
            if run_move(txn, movement)? {
                capture(txn, ctx, *unit, building)?;
            }
            Ok(())
        }
        Action::DeleteUnit { movement, unit } => {
            if run_move(txn, movement)? {
                remove_tracking_capture(txn, *unit, false)?;
            }
            Ok(())
        }
        Action::ExplodeUnit {
            movement,
            unit,
            radius,
            hp_change,
        } => {
            if run_move(txn, movement)? {
                let center = txn
                    .state()
                    .unit(*unit)?
                    .position
                    .ok_or_else(|| ReplayError::malformed(format!("exploding unit {} has no position", unit)))?;
                remove_tracking_capture(txn, *unit, true)?;
                damage_area(txn, ctx, center, *radius, *hp_change)?;
            }
            Ok(())
        }
        Action::LaunchRocket {
            movement,
            unit,
            silo,
            target,
            radius,
            hp_change,
        } => {
            if run_move(txn, movement)? {
                launch(txn, ctx, *unit, *silo)?;
                damage_area(txn, ctx, *target, *radius, *hp_change)?;
            }
            Ok(())
        }
        Action::HideUnit { movement, unit } => {
            if run_move(txn, movement)? {
                txn.update_unit(*unit, |u| u.hidden = true)?;
            }
            Ok(())
        }
        Action::UnhideUnit { movement, unit } => {
            if run_move(txn, movement)? {
                txn.update_unit(*unit, |u| u.hidden = false)?;
            }
            Ok(())
        }
        Action::LoadUnit {
            movement,
            loaded,
            transport,
        } => {
            if run_move(txn, movement)? {
                load(txn, ctx, *loaded, *transport)?;
            }
            Ok(())
        }
        Action::UnloadUnit {
            movement,
            transport,
            unloaded,
        } => {
            if run_move(txn, movement)? {
                unload(txn, *transport, unloaded)?;
            }
            Ok(())
        }
        Action::JoinUnit {
            movement,
            joining,
            target,
        } => {
            if run_move(txn, movement)? {
                join(txn, ctx, *joining, *target)?;
            }
            Ok(())
        }
        Action::RepairUnit {
            movement,
            supplier,
            repaired,
            hp_after,
        } => {
            if run_move(txn, movement)? {
                txn.state().unit(*supplier)?;
                repair(txn, ctx, *repaired, *hp_after)?;
            }
            Ok(())
        }
        Action::SupplyUnit {
            movement,
            supplier,
            supplied,
        } => {
            if run_move(txn, movement)? {
                txn.state().unit(*supplier)?;
                for id in supplied {
                    resupply(txn, ctx, *id)?;
                }
            }
            Ok(())
        }
        // Turn transitions are handled by the engine, not applied.
        Action::EndTurn { .. } => Ok(()),
        Action::PowerActivation {
            player,
            power,
            power_after,
            unit_changes,
            funds_after,
        } => activate_power(txn, ctx, *player, *power, *power_after, unit_changes, *funds_after),
    }
}

/// Recorded combat values over the live unit's identity and placement.
fn merge_post_state(live: &ReplayUnit, post: &ReplayUnit) -> ReplayUnit {
    ReplayUnit {
        hit_points: post.hit_points,
        ammo: post.ammo,
        fuel: post.fuel,
        hidden: post.hidden,
        ..live.clone()
    }
}

fn run_move(txn: &mut Transaction<'_>, movement: &Option<MoveAction>) -> Result<bool, ReplayError> {
    match movement {
        Some(m) => apply_move(txn, m),
        None => Ok(true),
    }
}

/// Returns `false` when the unit was trapped.
fn apply_move(txn: &mut Transaction<'_>, movement: &MoveAction) -> Result<bool, ReplayError> {
    let live = txn.state().unit(movement.unit.id)?.clone();
    let destination = movement.destination().or(live.position);
    if let Some(to) = destination {
        if !txn.state().map.contains(to) {
            return Err(ReplayError::malformed(format!(
                "unit {} moves off the map to {}",
                live.id, to
            )));
        }
    }

    let moved = destination != live.position;
    if live.capturing && moved {
        reset_capture(txn, live.position)?;
    }

    let mut unit = merge_post_state(&live, &movement.unit);
    unit.position = destination;
    unit.capturing = live.capturing && !moved;
    unit.times_moved = live.times_moved + 1;
    txn.put_unit(unit);

    if movement.trapped {
        log::debug!("Unit {} was trapped at {:?}", live.id, destination);
    }
    Ok(!movement.trapped)
}

fn reset_capture(txn: &mut Transaction<'_>, at: Option<Coord>) -> Result<(), ReplayError> {
    let Some(at) = at else { return Ok(()) };
    let in_progress = txn
        .state()
        .try_building(at)
        .is_some_and(|b| !b.capture.is_untouched());
    if in_progress {
        txn.update_building(at, |b| {
            b.last_capture = b.capture;
            b.capture = CaptureProgress::full();
        })?;
    }
    Ok(())
}

/// Remove a unit, abandoning any capture it was making.
fn remove_tracking_capture(txn: &mut Transaction<'_>, id: UnitId, explode: bool) -> Result<(), ReplayError> {
    let unit = txn.state().unit(id)?.clone();
    if unit.capturing {
        reset_capture(txn, unit.position)?;
    }
    txn.remove_unit(id, explode)?;
    Ok(())
}

fn attack(
    txn: &mut Transaction<'_>,
    attacker: &ReplayUnit,
    defender: &ReplayUnit,
    power_changes: &[PowerChange],
) -> Result<(), ReplayError> {
    for post in [attacker, defender] {
        let live = txn.state().unit(post.id)?.clone();
        if post.hit_points.is_dead() {
            remove_tracking_capture(txn, post.id, true)?;
        } else {
            txn.put_unit(merge_post_state(&live, post));
        }
    }
    for change in power_changes {
        txn.update_player(change.player, |p| p.power = change.power)?;
    }
    Ok(())
}

fn build(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, unit: &ReplayUnit, cost: Option<i64>) -> Result<(), ReplayError> {
    let data = ctx.catalog.require_unit(&unit.unit_type)?;
    if txn.state().try_unit(unit.id).is_some() {
        return Err(ReplayError::malformed(format!("unit id {} built twice", unit.id)));
    }
    let at = unit
        .position
        .ok_or_else(|| ReplayError::malformed(format!("unit {} built without a position", unit.id)))?;
    let owner = unit
        .player
        .ok_or_else(|| ReplayError::malformed(format!("unit {} built without an owner", unit.id)))?;
    txn.state().building(at)?;

    let mut built = unit.clone();
    built.being_carried = false;
    built.cargo.clear();
    txn.put_unit(built);
    txn.update_building(at, |b| b.has_acted = true)?;
    let price = cost.unwrap_or(data.cost);
    txn.update_player(owner, |p| p.funds -= price)?;
    Ok(())
}

/// Terrain id of `terrain`'s building kind in `country`'s colours.
fn recoloured(
    ctx: &ApplyContext<'_>,
    terrain: TerrainId,
    kind: Option<BuildingKind>,
    country: CountryId,
) -> TerrainId {
    kind.or_else(|| ctx.catalog.building(terrain).map(|b| b.kind))
        .and_then(|k| ctx.catalog.building_terrain(k, Some(country)))
        .unwrap_or(terrain)
}

fn capture(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, unit: UnitId, post: &ReplayBuilding) -> Result<(), ReplayError> {
    let capturer = txn.state().unit(unit)?.clone();
    let at = post.position;
    let live = txn.state().building(at)?.clone();

    if !post.capture.is_complete() {
        txn.put_building(ReplayBuilding {
            capture: post.capture,
            last_capture: live.capture,
            ..live
        });
        txn.update_unit(unit, |u| u.capturing = true)?;
        return Ok(());
    }

    let new_owner = capturer
        .player
        .ok_or_else(|| ReplayError::malformed(format!("unowned unit {} captured {}", unit, at)))?;
    let country = txn.state().player(new_owner)?.country;
    let kind = ctx.catalog.building(live.terrain_id).map(|b| b.kind);
    // A taken HQ stands as a city for its captor.
    let target_kind = match kind {
        Some(BuildingKind::Hq) => Some(BuildingKind::City),
        other => other,
    };
    let terrain_id = recoloured(ctx, live.terrain_id, target_kind, country);
    log::debug!(
        "Player {} captures {} from {:?}",
        new_owner,
        at,
        live.owner
    );

    txn.put_building(ReplayBuilding {
        position: at,
        terrain_id,
        owner: Some(new_owner),
        capture: post.capture,
        last_capture: live.capture,
        has_acted: live.has_acted,
    });
    txn.update_unit(unit, |u| u.capturing = false)?;

    if kind == Some(BuildingKind::Hq) {
        if let Some(loser) = live.owner {
            eliminate(txn, ctx, loser, new_owner)?;
        }
    }
    Ok(())
}

/// Hand everything `loser` owns to `winner` and clear their army.
fn eliminate(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, loser: PlayerId, winner: PlayerId) -> Result<(), ReplayError> {
    let day = txn.state().day;
    log::info!("Player {} eliminated by player {} on day {}", loser, winner, day);
    txn.update_player(loser, |p| p.eliminated_on = Some(day))?;

    let country = txn.state().player(winner)?.country;
    let owned: Vec<ReplayBuilding> = txn
        .state()
        .buildings
        .values()
        .filter(|b| b.owner == Some(loser))
        .cloned()
        .collect();
    for building in owned {
        let terrain_id = recoloured(ctx, building.terrain_id, None, country);
        txn.put_building(ReplayBuilding {
            terrain_id,
            owner: Some(winner),
            ..building
        });
    }

    let units: Vec<UnitId> = txn
        .state()
        .units
        .values()
        .filter(|u| u.player == Some(loser))
        .map(|u| u.id)
        .collect();
    for id in units {
        // Cargo goes with its transport.
        if txn.state().try_unit(id).is_some() {
            txn.remove_unit(id, false)?;
        }
    }
    Ok(())
}

fn damage_area(
    txn: &mut Transaction<'_>,
    ctx: &ApplyContext<'_>,
    center: Coord,
    radius: u32,
    hp_change: i32,
) -> Result<(), ReplayError> {
    let targets: Vec<ReplayUnit> = txn
        .state()
        .units
        .values()
        .filter(|u| !u.being_carried && u.position.is_some_and(|p| p.manhattan(center) <= radius))
        .cloned()
        .collect();

    for target in targets {
        let (hp, raw) = target.hit_points.with_change(hp_change * 10);
        if raw <= 0 {
            if ctx.config.explosions_can_kill {
                remove_tracking_capture(txn, target.id, true)?;
            } else {
                txn.update_unit(target.id, |u| u.hit_points = HitPoints::from_tenths(1))?;
            }
        } else {
            txn.update_unit(target.id, |u| u.hit_points = hp)?;
        }
    }
    Ok(())
}

fn launch(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, unit: UnitId, silo: Coord) -> Result<(), ReplayError> {
    txn.state().unit(unit)?;
    let building = txn.state().building(silo)?.clone();
    let empty = ctx
        .catalog
        .building_terrain(BuildingKind::EmptySilo, None)
        .ok_or_else(|| ReplayError::malformed("catalog has no empty silo terrain"))?;
    txn.put_building(ReplayBuilding {
        terrain_id: empty,
        ..building
    });
    Ok(())
}

fn load(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, loaded: UnitId, transport: UnitId) -> Result<(), ReplayError> {
    let carrier = txn.state().unit(transport)?.clone();
    let cargo = txn.state().unit(loaded)?.clone();
    if let Some(data) = ctx.catalog.unit(&carrier.unit_type) {
        if !data.can_carry(&cargo.unit_type) {
            log::warn!(
                "{} {} cannot carry {} {}",
                carrier.unit_type,
                transport,
                cargo.unit_type,
                loaded
            );
        }
    }
    if !carrier.cargo.contains(&loaded) {
        txn.update_unit(transport, |t| t.cargo.push(loaded))?;
    }
    txn.update_unit(loaded, |u| {
        u.being_carried = true;
        u.position = None;
    })?;
    Ok(())
}

fn unload(txn: &mut Transaction<'_>, transport: UnitId, post: &ReplayUnit) -> Result<(), ReplayError> {
    let live = txn.state().unit(post.id)?.clone();
    let to = post
        .position
        .filter(|p| txn.state().map.contains(*p))
        .ok_or_else(|| ReplayError::malformed(format!("unit {} unloaded off the map", post.id)))?;

    txn.update_unit(transport, |t| t.cargo.retain(|c| *c != post.id))?;
    let mut unit = merge_post_state(&live, post);
    unit.position = Some(to);
    unit.being_carried = false;
    unit.times_moved = live.times_moved + 1;
    txn.put_unit(unit);
    Ok(())
}

fn join(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, joining: UnitId, target: UnitId) -> Result<(), ReplayError> {
    let joiner = txn.state().unit(joining)?.clone();
    let host = txn.state().unit(target)?.clone();
    let data = ctx.catalog.require_unit(&host.unit_type)?;

    let total = joiner.hit_points.display() + host.hit_points.display();
    let joined = total.min(HitPoints::FULL.display());
    let refund = (total - joined) as i64 * data.cost / ctx.config.hp_cost_divisor;

    txn.remove_unit(joining, false)?;
    txn.update_unit(target, |u| {
        u.hit_points = HitPoints::from_whole(joined);
        u.ammo = (u.ammo + joiner.ammo).min(data.max_ammo);
        u.fuel = (u.fuel + joiner.fuel).min(data.max_fuel);
        u.times_moved = joiner.times_moved;
    })?;
    if refund > 0 {
        if let Some(owner) = host.player {
            txn.update_player(owner, |p| p.funds += refund)?;
        }
    }
    Ok(())
}

fn repair(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, repaired: UnitId, hp_after: i32) -> Result<(), ReplayError> {
    let unit = txn.state().unit(repaired)?.clone();
    let data = ctx.catalog.require_unit(&unit.unit_type)?;
    let before = unit.hit_points.display();
    let after = hp_after.clamp(before, HitPoints::FULL.display());
    let charge = (after - before) as i64 * data.cost / ctx.config.hp_cost_divisor;

    let (max_ammo, max_fuel) = (data.max_ammo, data.max_fuel);
    txn.update_unit(repaired, |u| {
        if after > before {
            u.hit_points = HitPoints::from_whole(after);
        }
        u.ammo = max_ammo;
        u.fuel = max_fuel;
    })?;
    if charge > 0 {
        if let Some(owner) = unit.player {
            txn.update_player(owner, |p| p.funds -= charge)?;
        }
    }
    Ok(())
}

fn resupply(txn: &mut Transaction<'_>, ctx: &ApplyContext<'_>, id: UnitId) -> Result<(), ReplayError> {
    let code = txn.state().unit(id)?.unit_type.clone();
    let data = ctx.catalog.require_unit(&code)?;
    let (max_ammo, max_fuel) = (data.max_ammo, data.max_fuel);
    txn.update_unit(id, |u| {
        u.ammo = max_ammo;
        u.fuel = max_fuel;
    })?;
    Ok(())
}

fn activate_power(
    txn: &mut Transaction<'_>,
    ctx: &ApplyContext<'_>,
    player: PlayerId,
    power: PowerKind,
    power_after: i64,
    unit_changes: &[ReplayUnit],
    funds_after: Option<i64>,
) -> Result<(), ReplayError> {
    let co = txn.state().player(player)?.co;
    let effect = powers::effect_of(ctx.catalog, co, power);
    txn.update_player(player, |p| {
        p.active_power = power;
        p.power = power_after;
        if let Some(funds) = funds_after {
            p.funds = funds;
        }
    })?;

    for post in unit_changes {
        let Some(live) = txn.state().try_unit(post.id).cloned() else {
            log::warn!("Power of player {} changes missing unit {}", player, post.id);
            continue;
        };
        if post.hit_points.is_dead() {
            remove_tracking_capture(txn, post.id, true)?;
        } else {
            txn.put_unit(merge_post_state(&live, post));
        }
    }

    let day = txn.state().day;
    txn.powers_mut().add_power_activation(player, power, effect, day);
    Ok(())
}

#[cfg(test)]
#[path = "effects_tests.rs"]
mod tests;
