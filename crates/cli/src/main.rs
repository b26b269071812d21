mod cli;
mod config;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use skirmish_core::config::load_dotenv;
use skirmish_core::EngineConfig;

use crate::cli::CliArgs;
use crate::config::SimConfig;
use crate::scenario::Simulation;

fn main() -> Result<()> {
    load_dotenv();
    let args = CliArgs::parse();

    let engine = match args.profile.as_deref() {
        Some(profile) => EngineConfig::for_profile(profile),
        None => EngineConfig::from_env(),
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&engine.log_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let scenario = SimConfig::load(args.scenario.as_deref())
        .context("failed to load scenario")?;

    if args.print_scenario {
        println!("{}", scenario.to_toml()?);
        return Ok(());
    }

    engine.log_summary();
    let tuning = engine.load_tuning().context("failed to load tuning")?;
    let catalog = engine.load_catalog().context("failed to load unit catalog")?;
    info!(defs = catalog.len(), spots = scenario.spots.len(), "scenario ready");

    let mut sim = Simulation::new(&scenario, tuning, catalog)?;
    sim.run_for(args.seconds.unwrap_or(scenario.seconds));

    if args.dump {
        let report = serde_json::to_string_pretty(&sim.report())
            .context("failed to serialize report")?;
        println!("{report}");
    } else {
        let report = sim.report();
        info!(
            seconds = sim.elapsed(),
            state = ?report.state,
            groups = sim.commander().groups().len(),
            units = report.owned_units,
            spots = report.spots_owned,
            evaluations = report.evaluations,
            assignments = report.assignments,
            "final state"
        );
    }

    Ok(())
}
