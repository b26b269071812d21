use std::path::PathBuf;

use clap::Parser;

/// Offline skirmish simulation.
///
/// Drives the commander through a scripted sandbox scenario and logs what
/// it decides to build and attack.
#[derive(Parser, Debug)]
#[command(name = "skirmish-sim", about = "Run the skirmish agent against a sandbox scenario")]
pub struct CliArgs {
    /// Scenario file (TOML). The built-in scenario is used when unset.
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Config profile; overrides SKIRMISH_PROFILE.
    #[arg(long, env = "SKIRMISH_PROFILE")]
    pub profile: Option<String>,

    /// Simulated seconds, overriding the scenario.
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Print the final report as JSON on stdout.
    #[arg(long)]
    pub dump: bool,

    /// Print the built-in scenario as TOML and exit.
    #[arg(long)]
    pub print_scenario: bool,
}
