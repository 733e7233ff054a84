//! Virtual sensors
//!
//! A [`SensorGenerator`] turns a [`SensorConfig`] into a sequence of
//! quantized samples: the waveform equation is evaluated at the tick's
//! nominal time, noise from the sensor's own seeded source is added, and the
//! result is clamped to the resolution range and truncated.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use flow_calc::Formula;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::core::config::{NoiseDistribution, SensorConfig};
use crate::core::processor::ReferenceValues;
use crate::error::{FlowSimError, Result};

/// Sensor category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Flow,
    Pressure,
    Temperature,
}

impl SensorType {
    pub const ALL: [SensorType; 3] = [Self::Flow, Self::Pressure, Self::Temperature];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Pressure => "pressure",
            Self::Temperature => "temperature",
        }
    }

    /// Offset added to the base seed so each sensor gets its own stream
    pub fn seed_offset(&self) -> u64 {
        match self {
            Self::Flow => 0,
            Self::Pressure => 1,
            Self::Temperature => 2,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = FlowSimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "flow" => Ok(Self::Flow),
            "pressure" => Ok(Self::Pressure),
            "temperature" => Ok(Self::Temperature),
            other => Err(FlowSimError::config(format!(
                "unknown sensor '{}' (expected flow, pressure or temperature)",
                other
            ))),
        }
    }
}

/// One quantized reading
#[derive(Debug, Clone, PartialEq)]
pub struct SensorData {
    pub sensor_type: SensorType,
    pub value: i32,
    pub timestamp: DateTime<Utc>,
    /// Tick index within the sensor's stream
    pub sequence: u64,
}

#[derive(Debug, Clone)]
enum Noise {
    None,
    Uniform(f64),
    Normal(Normal<f64>),
}

impl Noise {
    fn from_config(config: &SensorConfig) -> Result<Self> {
        let amplitude = config.noise_amplitude;
        if !amplitude.is_finite() || amplitude < 0.0 {
            return Err(FlowSimError::sensor(format!(
                "noise_amplitude must be finite and >= 0, got {}",
                amplitude
            )));
        }
        if amplitude == 0.0 {
            return Ok(Self::None);
        }

        match config.noise_distribution {
            NoiseDistribution::Normal => Normal::new(0.0, amplitude)
                .map(Self::Normal)
                .map_err(|e| FlowSimError::sensor(format!("invalid normal noise: {}", e))),
            NoiseDistribution::Uniform => Ok(Self::Uniform(amplitude)),
        }
    }

    fn sample(&self, rng: &mut ChaCha8Rng) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Uniform(amplitude) => (rng.gen::<f64>() * 2.0 - 1.0) * amplitude,
            Self::Normal(dist) => dist.sample(rng),
        }
    }
}

/// Deterministic sample source for one sensor
#[derive(Debug, Clone)]
pub struct SensorGenerator {
    sensor_type: SensorType,
    formula: Formula,
    frequency_hz: u32,
    max_value: f64,
    noise: Noise,
    references: ReferenceValues,
    rng: ChaCha8Rng,
    tick: u64,
}

impl SensorGenerator {
    /// Build a generator, compiling its equation up front
    pub fn new(
        sensor_type: SensorType,
        config: &SensorConfig,
        references: ReferenceValues,
        seed: u64,
    ) -> Result<Self> {
        if config.frequency_hz <= 0 {
            return Err(FlowSimError::sensor(format!(
                "{}: frequency_hz must be positive, got {}",
                sensor_type, config.frequency_hz
            )));
        }
        if !(1..=31).contains(&config.resolution_bits) {
            return Err(FlowSimError::sensor(format!(
                "{}: resolution_bits must be within 1..=31, got {}",
                sensor_type, config.resolution_bits
            )));
        }

        let formula = Formula::parse(&config.equation)?;
        let noise = Noise::from_config(config)?;

        Ok(Self {
            sensor_type,
            formula,
            frequency_hz: config.frequency_hz as u32,
            max_value: f64::from((1u32 << config.resolution_bits) - 1),
            noise,
            references,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
        })
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Largest value the sensor can report
    pub fn max_value(&self) -> i32 {
        self.max_value as i32
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frequency_hz))
    }

    /// Evaluate, add noise, clamp and truncate at time `t`
    pub fn sample_at(&mut self, t: f64) -> Result<i32> {
        let mut variables = HashMap::with_capacity(4);
        variables.insert("t".to_string(), t);
        self.references.bind(&mut variables);

        let base = self.formula.evaluate(&variables)?;
        if base.is_nan() {
            return Err(FlowSimError::sensor(format!(
                "{}: equation '{}' produced NaN at t={}",
                self.sensor_type,
                self.formula.source(),
                t
            )));
        }

        let value = (base + self.noise.sample(&mut self.rng)).clamp(0.0, self.max_value);
        Ok(value as i32)
    }

    /// Produce the next tick's sample
    ///
    /// The tick counter advances even when evaluation fails, so a skipped
    /// tick keeps later samples on their nominal schedule.
    pub fn next_sample(&mut self) -> Result<SensorData> {
        let sequence = self.tick;
        self.tick += 1;

        let t = sequence as f64 / f64::from(self.frequency_hz);
        let value = self.sample_at(t)?;

        Ok(SensorData {
            sensor_type: self.sensor_type,
            value,
            timestamp: Utc::now(),
            sequence,
        })
    }
}
