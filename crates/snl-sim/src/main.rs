use std::error::Error;

use clap::{Parser, Subcommand};
use snl_sim::commands::{
    run::{self, RunArgs},
    sample::{self, SampleArgs},
    simulators::{self, SimulatorsArgs},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "snl-sim", about = "Sequential neural likelihood CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run SNL from a YAML run file and write the run directory.
    Run(RunArgs),
    /// Draw posterior samples from a stored run as CSV on stdout.
    Sample(SampleArgs),
    /// List the built-in simulators.
    Simulators(SimulatorsArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Sample(args) => sample::run(&args),
        Command::Simulators(args) => simulators::run(&args),
    }
}
