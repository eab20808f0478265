//! File loading and report helpers behind the `awbw-replay` binary.

use anyhow::{Context, Result};
use awbw_core::capchain::PlannerResult;
use awbw_core::{EngineConfig, PlannerConfig, ReplayData, ReplayEngine, ReplayMap};
use awbw_data::Catalog;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Optional settings file: `{"engine": {...}, "planner": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub engine: EngineConfig,
    pub planner: PlannerConfig,
}

pub fn load_replay(path: &Path) -> Result<ReplayData> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read replay {}", path.display()))?;
    let data: ReplayData =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse replay {}", path.display()))?;
    log::info!(
        "Loaded replay {} \"{}\": {} players, {} turns",
        data.info.id,
        data.info.name,
        data.info.players.len(),
        data.turns.len()
    );
    Ok(data)
}

pub fn load_map(path: &Path) -> Result<ReplayMap> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read map {}", path.display()))?;
    let map: ReplayMap = serde_json::from_str(&json).with_context(|| format!("Failed to parse map {}", path.display()))?;
    log::info!("Loaded map \"{}\" ({}x{})", map.name, map.width, map.height);
    Ok(map)
}

/// Standard tables, patched by `path` when given.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display())),
        None => Ok(Catalog::standard()),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<ToolConfig> {
    let Some(path) = path else {
        return Ok(ToolConfig::default());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Counts gathered while stepping through a loaded replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub turns: usize,
    pub steps: usize,
    pub events: usize,
}

/// Jump to `start_turn`, then step forward to the end of the replay.
pub fn walk_replay(engine: &mut ReplayEngine, start_turn: usize) -> Result<WalkSummary> {
    let mut summary = WalkSummary {
        turns: 1,
        ..Default::default()
    };
    summary.events += engine.go_to_turn(start_turn)?.len();

    let mut turn = engine.state()?.cursor().turn;
    while engine.has_next_action() {
        let events = engine.go_to_next_action()?;
        summary.steps += 1;
        summary.events += events.len();

        let cursor = engine.state()?.cursor();
        if cursor.turn != turn {
            turn = cursor.turn;
            summary.turns += 1;
        }
    }
    engine.complete_all_actions();
    Ok(summary)
}

pub fn print_capchains(result: &PlannerResult, writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(writer, "\n=== Capture Chains ===")?;
    writeln!(
        writer,
        "Factories: {} | Assigned neutral factories: {} | Contested properties: {}",
        result.cap_chains.len(),
        result.assigned_factories.len(),
        result.contested.len()
    )?;

    for assigned in &result.assigned_factories {
        writeln!(
            writer,
            "  neutral factory {} -> country {} from {} (day {})",
            assigned.factory, assigned.army, assigned.from, assigned.captured_on
        )?;
    }

    for factory in &result.cap_chains {
        writeln!(writer, "\n--- Factory {} (country {}) ---", factory.factory, factory.army)?;
        for chain in &factory.chains {
            let stops: Vec<String> = chain
                .real_stops()
                .map(|s| format!("{} day {}", s.coord, s.captured_on))
                .collect();
            writeln!(writer, "  income {:>3}: {}", chain.income, stops.join(" -> "))?;
        }
    }

    if !result.contested.is_empty() {
        let contested: Vec<String> = result.contested.iter().map(|c| c.to_string()).collect();
        writeln!(writer, "\nContested: {}", contested.join(", "))?;
    }
    Ok(())
}
