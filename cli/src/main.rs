//! Contact center simulator
//!
//! Loads a run configuration, simulates it in virtual time and prints the
//! run report as JSON.
//!
//! Usage: `contact-sim --config <file> [--seed N|NAME] [--duration SECS] [--workers N]`

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use contact_simulator_core_rs::{driver, SeedSpec, SimulationConfig};

#[derive(Parser, Debug)]
#[command(name = "contact-sim")]
#[command(about = "Simulate contact-center tasks and workers from a property schema")]
struct Args {
    /// Path to the JSON run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Override the configured seed (number or name)
    #[arg(long)]
    seed: Option<String>,

    /// Override simulated duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Override number of simulated workers
    #[arg(long)]
    workers: Option<usize>,

    /// Print the report on one line
    #[arg(long)]
    compact: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,contact_simulator_core_rs=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args = Args::parse();

    let mut config = match SimulationConfig::from_path(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {}", args.config.display(), e);
            process::exit(1);
        }
    };

    if let Some(seed) = &args.seed {
        config.seed = SeedSpec::parse(seed);
    }
    if let Some(duration) = args.duration {
        config.driver.duration_secs = duration;
    }
    if let Some(workers) = args.workers {
        config.driver.worker_count = workers;
    }

    let mut engine = match config.build_engine() {
        Ok(engine) => engine,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    info!(
        "Simulating {}s with {} workers (seed {})",
        config.driver.duration_secs, config.driver.worker_count, config.seed
    );

    let report = match driver::run(&mut engine, &config.driver) {
        Ok(report) => report,
        Err(e) => {
            error!("Simulation failed: {}", e);
            process::exit(1);
        }
    };

    let output = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    };
    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            process::exit(1);
        }
    }
}
