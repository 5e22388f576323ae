use std::error::Error;

use clap::Args;
use serde::Serialize;
use snl_core::Simulator;

use crate::simulators::ToySimulator;

#[derive(Args, Debug)]
pub struct SimulatorsArgs {
    /// Dimension used for the listed default settings.
    #[arg(long, default_value_t = 2)]
    pub dim: usize,
}

#[derive(Debug, Serialize)]
pub struct SimulatorInfo {
    pub name: String,
    pub parameter_dim: usize,
    pub observation_dim: usize,
    pub description: String,
    pub defaults: ToySimulator,
}

pub fn list(args: &SimulatorsArgs) -> Vec<SimulatorInfo> {
    ToySimulator::catalogue(args.dim)
        .into_iter()
        .map(|simulator| SimulatorInfo {
            name: simulator.name().to_string(),
            parameter_dim: simulator.parameter_dim(),
            observation_dim: simulator.observation_dim(),
            description: simulator.describe().to_string(),
            defaults: simulator,
        })
        .collect()
}

pub fn run(args: &SimulatorsArgs) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(&list(args))?);
    Ok(())
}
