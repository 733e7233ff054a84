//! Pipeline wiring and teardown

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::config::Config;
use crate::core::processor::Processor;
use crate::core::sensors::{SensorGenerator, SensorType};
use crate::error::Result;
use crate::output::OutputSink;
use crate::runtime::acquisition::{
    run_acquisition, run_timeout, AcquisitionSettings, RunSummary, Streams,
};
use crate::runtime::generator::{spawn_sensor, SensorStream};

/// Command-line overrides applied on top of the configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Constant pressure; the pressure sensor is not started
    pub pressure: Option<i32>,
    /// Constant temperature; the temperature sensor is not started
    pub temperature: Option<i32>,
    pub samples: Option<u64>,
    pub seed: Option<u64>,
}

/// Build the processor and sensors, run the acquisition loop, tear down
///
/// All generators are built before any task starts, so a bad sensor
/// equation fails the run without leaving tasks behind. On return every
/// sensor task has finished and `sink` has been closed exactly once.
pub async fn run_pipeline(
    config: &Config,
    overrides: &Overrides,
    mut sink: Box<dyn OutputSink>,
    shutdown: CancellationToken,
) -> Result<RunSummary> {
    let references = config.simulation.references();

    let mut processor = Processor::new(&config.processing)?;
    processor.initialize_filters(&references);
    if let Some(pressure) = overrides.pressure {
        processor.override_pressure(pressure);
        info!("Pressure override: {}", pressure);
    }
    if let Some(temperature) = overrides.temperature {
        processor.override_temperature(temperature);
        info!("Temperature override: {}", temperature);
    }

    let seed = overrides
        .seed
        .or(config.simulation.seed)
        .unwrap_or_else(rand::random);
    info!(seed, "Random seed");

    let build = |sensor: SensorType| {
        SensorGenerator::new(
            sensor,
            config.sensors.get(sensor),
            references,
            seed.wrapping_add(sensor.seed_offset()),
        )
    };
    let flow = build(SensorType::Flow)?;
    let pressure = match overrides.pressure {
        Some(_) => None,
        None => Some(build(SensorType::Pressure)?),
    };
    let temperature = match overrides.temperature {
        Some(_) => None,
        None => Some(build(SensorType::Temperature)?),
    };

    let max_samples = overrides.samples.unwrap_or_else(|| config.samples());
    let settings = AcquisitionSettings {
        flow_equation: config.processing.flow_equation.clone(),
        references,
        max_samples,
        timeout: run_timeout(max_samples, flow.frequency_hz()),
    };

    let sensors = shutdown.child_token();
    let flow = spawn_sensor(flow, sensors.clone());
    let pressure = pressure.map(|g| spawn_sensor(g, sensors.clone()));
    let temperature = temperature.map(|g| spawn_sensor(g, sensors.clone()));

    let mut handles = vec![flow.handle];
    let mut detach = |stream: Option<SensorStream>| {
        stream.map(|s| {
            handles.push(s.handle);
            s.receiver
        })
    };
    let streams = Streams {
        flow: flow.receiver,
        pressure: detach(pressure),
        temperature: detach(temperature),
    };

    let summary = run_acquisition(
        &settings,
        &mut processor,
        streams,
        sink.as_mut(),
        &shutdown,
    )
    .await;

    sensors.cancel();
    for result in join_all(handles).await {
        if let Err(e) = result {
            error!("Sensor task failed: {}", e);
        }
    }

    if let Err(e) = sink.close().await {
        warn!("Error closing output: {}", e);
    }

    Ok(summary)
}
