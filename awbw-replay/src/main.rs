use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use awbw_core::desync::{json_report, print_report};
use awbw_core::profiling::{init_tracy, TraceLevel};
use awbw_core::{plan_capture_chains, EventLogObserver, ReplayEngine};
use awbw_replay::{load_catalog, load_config, load_map, load_replay, print_capchains, walk_replay};

#[derive(Parser)]
#[command(name = "awbw-replay")]
#[command(about = "Check Advance Wars By Web replays and plan capture chains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog override file (units, terrain, countries, COs)
    #[arg(long, global = true, env = "AWBW_CATALOG")]
    catalog: Option<PathBuf>,

    /// Engine and planner settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report spans to Tracy at this level (needs the `tracy` feature)
    #[arg(long, global = true)]
    trace_level: Option<TraceLevel>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay every turn and compare against the recorded snapshots
    Check {
        /// Replay file (JSON)
        replay: PathBuf,

        /// Map file (JSON)
        map: PathBuf,

        /// Output report as JSON
        #[arg(long)]
        json: bool,

        /// Write report to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Step through a replay action by action
    Walk {
        /// Replay file (JSON)
        replay: PathBuf,

        /// Map file (JSON)
        map: PathBuf,

        /// Turn to start from
        #[arg(short, long, default_value = "0")]
        turn: usize,

        /// Write board events as JSON lines to this file
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Predict early capture chains for a map
    Capchains {
        /// Map file (JSON)
        map: PathBuf,

        /// Output result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
    if let Some(level) = cli.trace_level {
        init_tracy(level);
    }

    let catalog = Arc::new(load_catalog(cli.catalog.as_deref())?);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check {
            replay,
            map,
            json,
            output,
        } => {
            let data = load_replay(&replay)?;
            let map = load_map(&map)?;

            let mut engine = ReplayEngine::new(catalog, config.engine);
            engine
                .load_replay(data, map)
                .with_context(|| format!("Failed to load {}", replay.display()))?;
            let reports = engine.desync_reports();

            if json {
                let json_output = json_report(reports)?;
                if let Some(path) = output {
                    std::fs::write(&path, &json_output)?;
                    log::info!("Report written to: {}", path.display());
                } else {
                    println!("{}", json_output);
                }
            } else {
                let mut writer: Box<dyn std::io::Write> = if let Some(path) = output {
                    Box::new(std::fs::File::create(&path)?)
                } else {
                    Box::new(std::io::stdout())
                };
                print_report(reports, &mut writer)?;
            }

            if reports.iter().any(|r| !r.is_clean()) {
                std::process::exit(1);
            }
        }

        Commands::Walk {
            replay,
            map,
            turn,
            events,
        } => {
            let data = load_replay(&replay)?;
            let map = load_map(&map)?;

            let mut engine = ReplayEngine::new(catalog, config.engine);
            if let Some(path) = events {
                let observer = EventLogObserver::file(&path)
                    .with_context(|| format!("Failed to create event log {}", path.display()))?;
                engine.register_observer(Box::new(observer));
            }
            engine.load_replay(data, map)?;

            let summary = walk_replay(&mut engine, turn)?;
            engine.shutdown();

            let state = engine.state()?;
            println!("\n=== Walk ===");
            println!(
                "Turns: {} | Steps: {} | Board events: {}",
                summary.turns, summary.steps, summary.events
            );
            println!("Final position: {}", state.cursor());
            for (id, stats) in state.stats() {
                println!(
                    "  player {}: {} units worth {}, {} income buildings",
                    id, stats.unit_count, stats.unit_value, stats.income_buildings
                );
            }
        }

        Commands::Capchains { map, json } => {
            let map = load_map(&map)?;
            let result = plan_capture_chains(&map, &catalog, &config.planner)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_capchains(&result, &mut std::io::stdout())?;
            }
        }
    }

    Ok(())
}
