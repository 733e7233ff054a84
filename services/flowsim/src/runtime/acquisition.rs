//! Acquisition loop
//!
//! A single consumer merges the sensor streams. Pressure and temperature
//! samples update the processor; each flow sample produces one output
//! record. The loop ends on the sample limit, the timeout, a shutdown
//! signal or when every stream has closed.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::processor::{Processor, ReferenceValues};
use crate::core::sensors::SensorData;
use crate::output::{OutputData, OutputSink};

/// Extra time allowed on top of the nominal run length
pub const TIMEOUT_MARGIN: Duration = Duration::from_secs(2);

/// `ceil(samples / flow_hz)` seconds plus [`TIMEOUT_MARGIN`]
pub fn run_timeout(samples: u64, flow_frequency_hz: u32) -> Duration {
    let hz = u64::from(flow_frequency_hz.max(1));
    Duration::from_secs(samples.div_ceil(hz)) + TIMEOUT_MARGIN
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SampleLimit,
    Timeout,
    Shutdown,
    StreamsClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::SampleLimit => "sample limit reached",
            Self::Timeout => "timeout",
            Self::Shutdown => "shutdown requested",
            Self::StreamsClosed => "all sensor streams closed",
        };
        f.write_str(reason)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Flow samples received
    pub samples: u64,
    /// Flow samples whose calculation failed
    pub failed_samples: u64,
    pub pressure_updates: u64,
    pub temperature_updates: u64,
    /// Records the sink refused
    pub write_errors: u64,
    pub stop_reason: StopReason,
}

/// Receivers merged by the loop; overridden sensors are `None`
pub struct Streams {
    pub flow: mpsc::Receiver<SensorData>,
    pub pressure: Option<mpsc::Receiver<SensorData>>,
    pub temperature: Option<mpsc::Receiver<SensorData>>,
}

/// Fixed parameters of one run
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub flow_equation: String,
    pub references: ReferenceValues,
    pub max_samples: u64,
    pub timeout: Duration,
}

async fn recv_optional(receiver: &mut Option<mpsc::Receiver<SensorData>>) -> Option<SensorData> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Run until a stop condition is met
pub async fn run_acquisition(
    settings: &AcquisitionSettings,
    processor: &mut Processor,
    mut streams: Streams,
    sink: &mut dyn OutputSink,
    shutdown: &CancellationToken,
) -> RunSummary {
    let start = Instant::now();
    let deadline = tokio::time::sleep(settings.timeout);
    tokio::pin!(deadline);

    let mut flow_open = true;
    let mut pressure_open = streams.pressure.is_some();
    let mut temperature_open = streams.temperature.is_some();

    let mut samples = 0u64;
    let mut failed_samples = 0u64;
    let mut pressure_updates = 0u64;
    let mut temperature_updates = 0u64;
    let mut write_errors = 0u64;

    info!(
        max_samples = settings.max_samples,
        timeout = ?settings.timeout,
        "Listening for sensor data"
    );

    let stop_reason = loop {
        if samples >= settings.max_samples {
            break StopReason::SampleLimit;
        }
        if !flow_open && !pressure_open && !temperature_open {
            break StopReason::StreamsClosed;
        }

        // Fixed branch order keeps runs reproducible: pressure and temperature
        // readings ready at the same instant as a flow sample are applied first
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break StopReason::Shutdown,
            _ = &mut deadline => break StopReason::Timeout,

            data = recv_optional(&mut streams.pressure), if pressure_open => match data {
                Some(data) => {
                    let filtered = processor.update_pressure(data.value);
                    pressure_updates += 1;
                    debug!(raw = data.value, filtered, "pressure update");
                },
                None => {
                    debug!("pressure stream closed");
                    pressure_open = false;
                },
            },

            data = recv_optional(&mut streams.temperature), if temperature_open => match data {
                Some(data) => {
                    let filtered = processor.update_temperature(data.value);
                    temperature_updates += 1;
                    debug!(raw = data.value, filtered, "temperature update");
                },
                None => {
                    debug!("temperature stream closed");
                    temperature_open = false;
                },
            },

            data = streams.flow.recv(), if flow_open => match data {
                Some(data) => {
                    samples += 1;
                    let elapsed = start.elapsed().as_secs_f64();

                    let calculated = match processor.calculate_flow(
                        &settings.flow_equation,
                        data.value,
                        elapsed,
                        &settings.references,
                    ) {
                        Ok(value) => value,
                        Err(e) => {
                            failed_samples += 1;
                            if e.is_per_sample() {
                                warn!(sample = samples, "Error calculating flow: {}", e);
                            } else {
                                error!(sample = samples, "Error calculating flow: {}", e);
                            }
                            continue;
                        },
                    };

                    let record = OutputData {
                        sample_number: samples as i64,
                        raw_flow: data.value,
                        pressure: processor.latest_pressure(),
                        temperature: processor.latest_temperature(),
                        calculated_flow: calculated,
                    };

                    if let Err(e) = sink.write(&record).await {
                        write_errors += 1;
                        warn!(sample = samples, "Error writing output: {}", e);
                    }
                },
                None => {
                    debug!("flow stream closed");
                    flow_open = false;
                },
            },
        }
    };

    let summary = RunSummary {
        samples,
        failed_samples,
        pressure_updates,
        temperature_updates,
        write_errors,
        stop_reason,
    };
    info!(
        samples = summary.samples,
        failed = summary.failed_samples,
        write_errors = summary.write_errors,
        "Simulation finished: {}",
        summary.stop_reason
    );
    summary
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::core::config::ProcessingConfig;
    use crate::core::sensors::SensorType;
    use crate::error::{FlowSimError, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingSink {
        records: Vec<OutputData>,
        fail_writes: bool,
    }

    #[async_trait]
    impl OutputSink for RecordingSink {
        async fn write(&mut self, data: &OutputData) -> Result<()> {
            if self.fail_writes {
                return Err(FlowSimError::output("sink unavailable"));
            }
            self.records.push(*data);
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    fn sample(sensor_type: SensorType, value: i32, sequence: u64) -> SensorData {
        SensorData {
            sensor_type,
            value,
            timestamp: Utc::now(),
            sequence,
        }
    }

    fn settings(equation: &str, max_samples: u64) -> AcquisitionSettings {
        AcquisitionSettings {
            flow_equation: equation.to_string(),
            references: ReferenceValues::default(),
            max_samples,
            timeout: Duration::from_secs(5),
        }
    }

    fn processor() -> Processor {
        Processor::new(&ProcessingConfig::default()).unwrap()
    }

    /// Feed a fixed list of flow values through an already-closed channel
    fn flow_only(values: &[i32]) -> Streams {
        let (tx, rx) = mpsc::channel(values.len().max(1));
        for (i, value) in values.iter().enumerate() {
            tx.try_send(sample(SensorType::Flow, *value, i as u64)).unwrap();
        }
        Streams {
            flow: rx,
            pressure: None,
            temperature: None,
        }
    }

    #[test]
    fn test_run_timeout() {
        assert_eq!(run_timeout(100, 10), Duration::from_secs(12));
        assert_eq!(run_timeout(101, 10), Duration::from_secs(13));
        assert_eq!(run_timeout(5, 10), Duration::from_secs(3));
        assert_eq!(run_timeout(0, 0), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_sample_limit() {
        let mut processor = processor();
        processor.override_pressure(255);
        processor.override_temperature(255);
        let mut sink = RecordingSink::default();

        let summary = run_acquisition(
            &settings("F * (P / 255) * (T / 255)", 3),
            &mut processor,
            flow_only(&[10, 20, 30, 40, 50]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(summary.stop_reason, StopReason::SampleLimit);
        assert_eq!(summary.samples, 3);
        let numbers: Vec<i64> = sink.records.iter().map(|r| r.sample_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(sink.records[2].raw_flow, 30);
        assert_eq!(sink.records[2].calculated_flow, 30);
        assert_eq!(sink.records[2].pressure, 255);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_streams_close() {
        let mut processor = processor();
        let mut sink = RecordingSink::default();

        let summary = run_acquisition(
            &settings("F", 100),
            &mut processor,
            flow_only(&[1, 2]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(summary.stop_reason, StopReason::StreamsClosed);
        assert_eq!(summary.samples, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_timeout() {
        let (_tx, rx) = mpsc::channel(1);
        let streams = Streams {
            flow: rx,
            pressure: None,
            temperature: None,
        };
        let mut processor = processor();
        let mut sink = RecordingSink::default();

        let summary = run_acquisition(
            &settings("F", 10),
            &mut processor,
            streams,
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(summary.stop_reason, StopReason::Timeout);
        assert_eq!(summary.samples, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_shutdown() {
        let (_tx, rx) = mpsc::channel(1);
        let streams = Streams {
            flow: rx,
            pressure: None,
            temperature: None,
        };
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let summary = run_acquisition(
            &settings("F", 10),
            &mut processor(),
            streams,
            &mut RecordingSink::default(),
            &shutdown,
        )
        .await;

        assert_eq!(summary.stop_reason, StopReason::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_calculation_error_skips_sample() {
        let mut sink = RecordingSink::default();
        let summary = run_acquisition(
            &settings("1000000000.0 * F", 10),
            &mut processor(),
            flow_only(&[1, 5, 2]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(summary.samples, 3);
        assert_eq!(summary.failed_samples, 1);
        let numbers: Vec<i64> = sink.records.iter().map(|r| r.sample_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert!(logs_contain("Error calculating flow"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_errors_do_not_stop_the_loop() {
        let mut sink = RecordingSink {
            fail_writes: true,
            ..Default::default()
        };
        let summary = run_acquisition(
            &settings("F", 3),
            &mut processor(),
            flow_only(&[1, 2, 3]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(summary.stop_reason, StopReason::SampleLimit);
        assert_eq!(summary.write_errors, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pressure_and_temperature_update_processor() {
        let (pressure_tx, pressure_rx) = mpsc::channel(1);
        let (temperature_tx, temperature_rx) = mpsc::channel(1);
        let (flow_tx, flow_rx) = mpsc::channel(1);
        let streams = Streams {
            flow: flow_rx,
            pressure: Some(pressure_rx),
            temperature: Some(temperature_rx),
        };

        let feeder = tokio::spawn(async move {
            pressure_tx.send(sample(SensorType::Pressure, 255, 0)).await.unwrap();
            temperature_tx
                .send(sample(SensorType::Temperature, 255, 0))
                .await
                .unwrap();
            // Let the loop drain both updates before the flow sample arrives
            tokio::time::sleep(Duration::from_millis(100)).await;
            flow_tx.send(sample(SensorType::Flow, 1000, 0)).await.unwrap();
        });

        let mut processor = processor();
        let mut sink = RecordingSink::default();
        let summary = run_acquisition(
            &settings("F * (P / 255) * (T / 255)", 1),
            &mut processor,
            streams,
            &mut sink,
            &CancellationToken::new(),
        )
        .await;
        feeder.await.unwrap();

        assert_eq!(summary.pressure_updates, 1);
        assert_eq!(summary.temperature_updates, 1);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].calculated_flow, 1000);
        assert_eq!(sink.records[0].pressure, 255);
        assert_eq!(sink.records[0].temperature, 255);
    }
}
