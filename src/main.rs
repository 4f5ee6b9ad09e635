//! Command-line entry point
//!
//! Runs the forecasting pipeline with the built-in defaults, optionally
//! overridden by a configuration file and a few flags.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use energy_forecast::{pipeline, PipelineConfig, Result};

#[derive(Parser)]
#[command(name = "energy-forecast")]
#[command(version, about = "Capped-growth forecast with a chronological train/test evaluation", long_about = None)]
struct Cli {
    /// Configuration file (TOML or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input workbook or CSV file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Save the chart here (.svg or .png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the uncertainty simulation
    #[arg(long)]
    seed: Option<u64>,
}

fn build_config(cli: Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(input) = cli.input {
        config.input = input;
    }
    if cli.output.is_some() {
        config.output = cli.output;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = build_config(cli).and_then(|config| pipeline::run(&config));
    match result {
        Ok(output) => {
            if let Some(metrics) = &output.metrics {
                match serde_json::to_string(metrics) {
                    Ok(json) => info!("Metrics: {}", json),
                    Err(e) => error!("Could not serialize metrics: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
