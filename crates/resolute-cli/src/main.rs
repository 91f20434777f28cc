use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use resolute_registration::AntsEngine;
use tracing::{debug, error, info};

mod config;
mod logging;
mod pipeline;

use config::ResoluteConfig;

#[derive(Parser)]
#[command(name = "resolute")]
#[command(version)]
#[command(about = "Pseudo-CT generation from UTE MR acquisitions")]
struct Cli {
    /// Run the pipeline from a JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Write a configuration skeleton to FILE and exit
    #[arg(long, value_name = "FILE", conflicts_with = "json")]
    create_json: Option<PathBuf>,

    /// DICOM session directory providing the MRAC and UTE series
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Log directory, overriding `logDir` from the configuration
    #[arg(short, long, value_name = "DIR")]
    log: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(path) = &cli.create_json {
        if !init_logging(None) {
            return ExitCode::FAILURE;
        }
        return report(create_json(path));
    }

    let Some(json) = &cli.json else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("resolute: {}", e);
        }
        return ExitCode::SUCCESS;
    };

    let config = ResoluteConfig::from_file(json);
    let log_dir = cli
        .log
        .clone()
        .or_else(|| config.as_ref().ok().and_then(|c| c.log_dir.clone()));
    if !init_logging(log_dir.as_deref()) {
        return ExitCode::FAILURE;
    }

    report(config.map_err(anyhow::Error::from).and_then(|config| run(&cli, &config)))
}

fn init_logging(log_dir: Option<&Path>) -> bool {
    match logging::init(log_dir) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("resolute: {:#}", e);
            false
        }
    }
}

fn report(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn create_json(path: &Path) -> Result<()> {
    ResoluteConfig::write_skeleton(path)?;
    info!("Wrote configuration skeleton to {}", path.display());
    Ok(())
}

fn run(cli: &Cli, config: &ResoluteConfig) -> Result<()> {
    let start = Instant::now();
    info!("RESOLUTE {}", env!("CARGO_PKG_VERSION"));
    info!("Started: {} (unix time)", unix_seconds());
    if let Ok(json) = serde_json::to_string_pretty(config) {
        debug!("Configuration:\n{}", json);
    }

    let result = run_pipeline(cli, config);

    info!("Ended: {} (unix time)", unix_seconds());
    info!("Time taken: {:.1} s", start.elapsed().as_secs_f64());
    result
}

fn run_pipeline(cli: &Cli, config: &ResoluteConfig) -> Result<()> {
    config.validate(cli.input.is_some())?;
    let engine = AntsEngine::new(&config.registration.engine);
    let output = pipeline::run(config, cli.input.as_deref(), engine)?;
    info!("Pseudo-CT written to {}", output.display());
    Ok(())
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
