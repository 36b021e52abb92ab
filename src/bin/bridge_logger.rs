//! Bridge Logger
//!
//! Logs every configured sensor bridge until Ctrl+C.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bridge_logger::{
    calibration::{fit, CalibrationPoint},
    config::AppConfig,
    constants::STATS_INTERVAL_SECS,
    logfile::read_log,
    supervisor::ChannelSupervisor,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log all included channels from a config file until Ctrl+C
    Run {
        /// TOML file with [service] settings and [[channels]] entries
        #[arg(short, long)]
        config: PathBuf,
        /// Override the output directory from the config
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Print the final per-channel summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fit slope and intercept from BIT:TORQUE calibration points
    Fit {
        #[arg(short, long = "point", value_parser = parse_point, required = true)]
        points: Vec<CalibrationPoint>,
    },
    /// Summarize a finished log file
    Show {
        path: PathBuf,
    },
}

fn parse_point(s: &str) -> Result<CalibrationPoint, String> {
    let (bit, torque) = s
        .split_once(':')
        .ok_or_else(|| format!("expected BIT:TORQUE, got {:?}", s))?;
    let bit = bit.trim().parse().map_err(|_| format!("invalid bit value {:?}", bit))?;
    let torque = torque
        .trim()
        .parse()
        .map_err(|_| format!("invalid torque value {:?}", torque))?;
    Ok(CalibrationPoint::new(bit, torque))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Args::parse().command {
        Command::Run {
            config,
            output_dir,
            json,
        } => run(config, output_dir, json).await,
        Command::Fit { points } => {
            let calibration = fit(&points)?;
            println!(
                "Slope = {}, Y-Intercept = {}",
                calibration.slope, calibration.intercept
            );
            Ok(())
        }
        Command::Show { path } => show(path),
    }
}

async fn run(config_path: PathBuf, output_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(dir) = output_dir {
        config.service.output_dir = dir;
    }

    if !config.channels.iter().any(|c| c.include) {
        bail!("no included channels in {}", config_path.display());
    }

    std::fs::create_dir_all(&config.service.output_dir)
        .with_context(|| format!("creating {}", config.service.output_dir.display()))?;

    tracing::info!("Starting Bridge Logger");
    tracing::info!("Writing logs to {}", config.service.output_dir.display());

    let supervisor = ChannelSupervisor::new(config.service.clone());
    let started = supervisor.start_all(&config.channels);

    tracing::info!("Logging started - press Ctrl+C to stop");

    let mut stats_timer = tokio::time::interval(Duration::from_secs(STATS_INTERVAL_SECS));
    stats_timer.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl+C")?;
                tracing::info!("Stopping data collection");
                break;
            }
            _ = stats_timer.tick() => {
                for handle in supervisor.handles() {
                    let stats = handle.stats();
                    tracing::info!(
                        "Channel {} ({}, port {}): {} - {} datagrams, {} samples, \
                         {} malformed, {} wraps",
                        handle.id(),
                        handle.name(),
                        handle.port(),
                        handle.state(),
                        stats.datagrams_received,
                        stats.samples_written,
                        stats.malformed_records,
                        stats.wraps
                    );
                }

                if started.values().all(|h| h.state().is_terminal()) {
                    tracing::warn!("All channels have stopped");
                    break;
                }
            }
        }
    }

    let results = supervisor.stop_all().await;

    if json {
        let summary: Vec<serde_json::Value> = supervisor
            .handles()
            .iter()
            .map(|handle| {
                serde_json::json!({
                    "id": handle.id(),
                    "name": handle.name(),
                    "port": handle.port(),
                    "state": handle.state().to_string(),
                    "log_path": handle.log_path(),
                    "stats": handle.stats(),
                    "warnings": handle.warnings(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for handle in supervisor.handles() {
        if let Some(state) = results.get(&handle.id()) {
            println!(
                "{:>3}  {:<20} {:>5}  {:<30} {}",
                handle.id(),
                handle.name(),
                handle.port(),
                state.to_string(),
                handle.log_path().display()
            );
        }
        for warning in handle.warnings() {
            println!("     warning: {}", warning);
        }
    }

    Ok(())
}

fn show(path: PathBuf) -> Result<()> {
    let contents = read_log(&path).with_context(|| format!("reading {}", path.display()))?;

    if let Some(port) = contents.header_value("Port") {
        println!("Port:     {}", port);
    }
    println!("Samples:  {}", contents.samples.len());
    println!("Duration: {} us", contents.duration());
    if contents.skipped_lines > 0 {
        println!("Skipped:  {} unreadable line(s)", contents.skipped_lines);
    }

    let values = contents.samples.iter().map(|s| s.1);
    if let Some(min) = values.clone().reduce(f64::min) {
        let max = values.reduce(f64::max).unwrap_or(min);
        println!("Range:    {:.1} .. {:.1}", min, max);
    }

    Ok(())
}
