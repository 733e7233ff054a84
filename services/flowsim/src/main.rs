//! Flow meter simulator
//!
//! Runs the sensor simulation and flow calculation pipeline described by a
//! configuration file and writes one record per flow sample.

use std::path::PathBuf;

use clap::Parser;
use common::service_bootstrap::{self, ServiceInfo};
use common::ServiceArgs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use flowsim::core::config::DEFAULT_CONFIG_FILE;
use flowsim::{create_sink, run_pipeline, Config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "flowsim", version, about = "Flow meter sensor simulator")]
struct Args {
    /// Path to the configuration file (JSON, or YAML by extension)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override temperature with a constant value
    #[arg(long, allow_hyphen_values = true)]
    temp: Option<i32>,

    /// Override pressure with a constant value
    #[arg(long, allow_hyphen_values = true)]
    pressure: Option<i32>,

    /// Number of flow samples to produce
    #[arg(long)]
    samples: Option<u64>,

    /// Base random seed for the sensors
    #[arg(long)]
    seed: Option<u64>,

    /// Validate the configuration and exit
    #[arg(long)]
    validate: bool,

    #[command(flatten)]
    service: ServiceArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let service_info = ServiceInfo::new(
        "flowsim",
        env!("CARGO_PKG_VERSION"),
        "Flow Meter Simulation - Sensors, Filters, Flow Calculation",
    );
    service_bootstrap::init_logging(&service_info, &args.service)?;
    if !args.service.no_color {
        service_bootstrap::print_startup_banner(&service_info);
    }

    let config = Config::load(&args.config)?;
    config.validate()?;
    if args.service.is_development() {
        debug!(?config, "Loaded configuration from {}", args.config.display());
    }

    if args.validate {
        info!("Validation completed successfully");
        return Ok(());
    }

    let overrides = Overrides {
        pressure: args.pressure,
        temperature: args.temp,
        samples: args.samples,
        seed: args.seed,
    };
    if overrides.samples == Some(0) {
        anyhow::bail!("--samples must be greater than 0");
    }

    let sink = create_sink(&config.output)?;

    let shutdown = CancellationToken::new();
    common::shutdown::cancel_on_shutdown(shutdown.clone());

    let summary = run_pipeline(&config, &overrides, sink, shutdown.clone()).await?;
    shutdown.cancel();

    info!(
        "Run complete: {} samples ({} failed), {} pressure updates, {} temperature updates, {} write errors",
        summary.samples,
        summary.failed_samples,
        summary.pressure_updates,
        summary.temperature_updates,
        summary.write_errors
    );
    Ok(())
}
