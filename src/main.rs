#![warn(clippy::all)]

use anyhow::{Context, Result};
use clap::Parser;
use frontier_life::{Driver, NiceInt, Simulation, SimulationConfig, Speed};
use std::path::PathBuf;
use tracing::info;

/// Runs a large Game of Life soup headless and logs what a renderer would receive.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// TOML file with simulation settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    #[arg(long, value_enum)]
    speed: Option<Speed>,
    /// Minimum milliseconds between tick starts.
    #[arg(long)]
    tick_budget_ms: Option<u64>,
    /// Multiplier for the coordinates of reported cells, e.g. pixels per cell.
    #[arg(long)]
    resolution_scale: Option<usize>,
    #[arg(long)]
    threads: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    fill_rate: Option<f64>,
    /// Stop after this many ticks; runs until Ctrl-C otherwise.
    #[arg(long)]
    ticks: Option<u64>,
    /// Log every n-th tick at info level.
    #[arg(long, default_value_t = 10)]
    report_every: u64,
}

impl Args {
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        config.width = self.width.unwrap_or(config.width);
        config.height = self.height.unwrap_or(config.height);
        config.speed = self.speed.unwrap_or(config.speed);
        config.tick_budget_ms = self.tick_budget_ms.or(config.tick_budget_ms);
        config.resolution_scale = self.resolution_scale.unwrap_or(config.resolution_scale);
        config.threads = self.threads.or(config.threads);
        config.seed = self.seed.or(config.seed);
        config.fill_rate = self.fill_rate.unwrap_or(config.fill_rate);
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = args.simulation_config()?;

    let simulation = tokio::task::spawn_blocking({
        let config = config.clone();
        move || Simulation::from_config(&config)
    })
    .await??;
    let (driver, mut reports) = Driver::spawn(simulation, config.speed);
    driver.set_tick_budget_ms(config.tick_budget().as_millis() as u64);
    info!(
        speed = driver.speed().label(),
        budget_ms = driver.tick_budget().as_millis() as u64,
        "driver ready"
    );
    driver.start();

    loop {
        tokio::select! {
            report = reports.recv() => {
                let Some(report) = report else { break };
                if report.generation % args.report_every.max(1) == 0 {
                    info!(
                        generation = report.generation,
                        changed = %NiceInt::from_usize(report.changed.len()),
                        population = %NiceInt::from(report.population),
                        frontier = %NiceInt::from_usize(report.frontier_len),
                        duration_ms = report.elapsed.as_millis() as u64,
                        "tick"
                    );
                }
                if args.ticks.is_some_and(|limit| report.generation >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    let (generation, population) = driver
        .with_simulation(|s| (s.generation(), s.population()))
        .await;
    driver.shutdown().await?;
    info!(
        generation,
        population = %NiceInt::from(population),
        "finished"
    );
    Ok(())
}
