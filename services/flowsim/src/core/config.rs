//! Simulator configuration
//!
//! Loaded from a JSON file (YAML when the extension is `.yaml`/`.yml`) with
//! `FLOWSIM_`-prefixed environment variables layered on top. Nested keys are
//! separated by a double underscore, e.g.
//! `FLOWSIM_SIMULATION__DEFAULT_SAMPLES=500`.

use std::path::Path;
use std::str::FromStr;

use figment::{
    providers::{Env, Format, Json, Yaml},
    Figment,
};
use flow_calc::Formula;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::filters::{FilterKind, MAX_WINDOW_SIZE};
use crate::core::processor::ReferenceValues;
use crate::core::sensors::SensorType;
use crate::error::{FlowSimError, Result};
use crate::output::OutputKind;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FLOWSIM_";

/// Default configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub sensors: SensorsConfig,
    pub processing: ProcessingConfig,
    pub output: OutputConfig,
}

/// Run length, reference values and seed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of flow samples to produce
    pub default_samples: u64,
    pub default_flow: Option<i32>,
    pub default_pressure: Option<i32>,
    pub default_temperature: Option<i32>,
    /// Base seed; a random one is drawn when unset
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_samples: 100,
            default_flow: None,
            default_pressure: None,
            default_temperature: None,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn references(&self) -> ReferenceValues {
        ReferenceValues {
            flow: self.default_flow,
            pressure: self.default_pressure,
            temperature: self.default_temperature,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorsConfig {
    pub flow: SensorConfig,
    pub pressure: SensorConfig,
    pub temperature: SensorConfig,
}

impl SensorsConfig {
    pub fn get(&self, sensor: SensorType) -> &SensorConfig {
        match sensor {
            SensorType::Flow => &self.flow,
            SensorType::Pressure => &self.pressure,
            SensorType::Temperature => &self.temperature,
        }
    }
}

/// Noise shape added to each sample
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoiseDistribution {
    Normal,
    /// Anything other than `normal` is uniform
    #[default]
    #[serde(other)]
    Uniform,
}

/// One virtual sensor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    pub frequency_hz: i32,
    pub resolution_bits: i32,
    /// Waveform over `t` seconds, may use `RefF`, `RefP`, `RefT`
    pub equation: String,
    pub noise_amplitude: f64,
    pub noise_distribution: NoiseDistribution,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 10,
            resolution_bits: 8,
            equation: "128".to_string(),
            noise_amplitude: 0.0,
            noise_distribution: NoiseDistribution::Uniform,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    pub flow_equation: String,
    /// Type used by filters that omit `type`
    pub default_filter: String,
    /// Applied per target in this order
    pub filters: Vec<FilterConfig>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            flow_equation: "F * (P / 255) * (T / 255)".to_string(),
            default_filter: FilterKind::LowPass.as_str().to_string(),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    pub target: String,
    #[serde(default)]
    pub alpha: f64,
    #[serde(default)]
    pub window_size: i32,
}

impl FilterConfig {
    pub fn kind(&self, default_filter: &str) -> Result<FilterKind> {
        FilterKind::from_str(self.filter_type.as_deref().unwrap_or(default_filter))
    }

    pub fn target(&self) -> Result<SensorType> {
        SensorType::from_str(&self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// `file`, `console` or `network`
    #[serde(rename = "type")]
    pub output_type: String,
    /// File path or URL
    pub target: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_type: OutputKind::Console.as_str().to_string(),
            target: String::new(),
        }
    }
}

impl OutputConfig {
    pub fn kind(&self) -> Result<OutputKind> {
        OutputKind::from_str(&self.output_type)
    }
}

impl Config {
    /// Load from `path` with `FLOWSIM_` environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    pub fn load_with_env_prefix(path: impl AsRef<Path>, env_prefix: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FlowSimError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Figment::new().merge(Yaml::file(path)),
            _ => Figment::new().merge(Json::file(path)),
        };

        let config: Config = figment
            .merge(Env::prefixed(env_prefix).split("__"))
            .extract()
            .map_err(|e| {
                FlowSimError::config(format!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Check everything the pipeline relies on before it starts
    pub fn validate(&self) -> Result<()> {
        if self.simulation.default_samples == 0 {
            return Err(FlowSimError::config(
                "simulation.default_samples must be greater than 0",
            ));
        }

        for sensor in SensorType::ALL {
            validate_sensor(sensor, self.sensors.get(sensor))?;
        }

        self.validate_processing()?;
        self.validate_output()?;
        Ok(())
    }

    fn validate_processing(&self) -> Result<()> {
        let processing = &self.processing;
        validate_equation("processing.flow_equation", &processing.flow_equation)?;

        for (index, filter) in processing.filters.iter().enumerate() {
            let in_filter = |e: FlowSimError| match e {
                FlowSimError::ConfigError(msg) => {
                    FlowSimError::config(format!("processing.filters[{}]: {}", index, msg))
                },
                other => other,
            };
            let kind = filter.kind(&processing.default_filter).map_err(in_filter)?;
            filter.target().map_err(in_filter)?;

            match kind {
                FilterKind::LowPass if !(0.0..=1.0).contains(&filter.alpha) => {
                    warn!(
                        "processing.filters[{}]: alpha {} outside [0, 1], it will be clamped",
                        index, filter.alpha
                    );
                },
                FilterKind::Median if filter.window_size <= 0 => {
                    warn!(
                        "processing.filters[{}]: window_size {} is not positive, using 5",
                        index, filter.window_size
                    );
                },
                FilterKind::Median if filter.window_size as usize > MAX_WINDOW_SIZE => {
                    return Err(FlowSimError::config(format!(
                        "processing.filters[{}]: window_size {} exceeds {}",
                        index, filter.window_size, MAX_WINDOW_SIZE
                    )));
                },
                _ => {},
            }
        }
        Ok(())
    }

    fn validate_output(&self) -> Result<()> {
        let kind = self.output.kind()?;
        let target = self.output.target.trim();

        match kind {
            OutputKind::File if target.is_empty() => Err(FlowSimError::config(
                "output.target must name a file for file output",
            )),
            OutputKind::Network if target.is_empty() => Err(FlowSimError::config(
                "output.target must be a URL for network output",
            )),
            OutputKind::Network if !is_http_url(target) => Err(FlowSimError::config(format!(
                "output.target '{}' is not an http(s) URL",
                target
            ))),
            _ => Ok(()),
        }
    }

    /// Flow sample count of the run
    pub fn samples(&self) -> u64 {
        self.simulation.default_samples
    }
}

fn is_http_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn validate_sensor(sensor: SensorType, config: &SensorConfig) -> Result<()> {
    if config.frequency_hz <= 0 {
        return Err(FlowSimError::config(format!(
            "sensors.{}.frequency_hz must be positive, got {}",
            sensor, config.frequency_hz
        )));
    }
    if !(1..=31).contains(&config.resolution_bits) {
        return Err(FlowSimError::config(format!(
            "sensors.{}.resolution_bits must be within 1..=31, got {}",
            sensor, config.resolution_bits
        )));
    }
    if !config.noise_amplitude.is_finite() || config.noise_amplitude < 0.0 {
        return Err(FlowSimError::config(format!(
            "sensors.{}.noise_amplitude must be finite and >= 0, got {}",
            sensor, config.noise_amplitude
        )));
    }
    validate_equation(&format!("sensors.{}.equation", sensor), &config.equation)
}

fn validate_equation(field: &str, equation: &str) -> Result<()> {
    if equation.trim().is_empty() {
        return Err(FlowSimError::config(format!("{} cannot be empty", field)));
    }
    Formula::parse(equation)
        .map(|_| ())
        .map_err(|e| FlowSimError::config(format!("{}: {}", field, e)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_JSON: &str = r#"{
        "simulation": { "default_samples": 50, "default_flow": 1000, "seed": 42 },
        "sensors": {
            "flow": {
                "frequency_hz": 20,
                "resolution_bits": 12,
                "equation": "2000 + 500 * sin(t)",
                "noise_amplitude": 15.5,
                "noise_distribution": "normal"
            },
            "pressure": { "frequency_hz": 5, "resolution_bits": 8, "equation": "200" }
        },
        "processing": {
            "flow_equation": "F * (P / 255)",
            "filters": [
                { "type": "median", "target": "flow", "window_size": 3 },
                { "target": "pressure", "alpha": 0.2 }
            ]
        },
        "output": { "type": "file", "target": "out.csv" }
    }"#;

    fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json() {
        let file = write_temp(".json", SAMPLE_JSON);
        let config = Config::load_with_env_prefix(file.path(), "FLOWSIM_TEST_JSON_").unwrap();

        assert_eq!(config.samples(), 50);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.references().flow, Some(1000));
        assert_eq!(config.simulation.references().pressure, None);
        assert_eq!(config.sensors.flow.frequency_hz, 20);
        assert_eq!(config.sensors.flow.noise_distribution, NoiseDistribution::Normal);
        // Missing sensor fields and sections fall back to defaults
        assert_eq!(config.sensors.pressure.noise_distribution, NoiseDistribution::Uniform);
        assert_eq!(config.sensors.temperature, SensorConfig::default());
        assert_eq!(config.processing.filters.len(), 2);
        assert_eq!(config.processing.filters[1].filter_type, None);
        assert_eq!(config.output.kind().unwrap(), OutputKind::File);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
simulation:
  default_samples: 7
processing:
  flow_equation: "F * 2"
output:
  type: console
"#;
        let file = write_temp(".yaml", yaml);
        let config = Config::load_with_env_prefix(file.path(), "FLOWSIM_TEST_YAML_").unwrap();
        assert_eq!(config.samples(), 7);
        assert_eq!(config.processing.flow_equation, "F * 2");
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_temp(".json", SAMPLE_JSON);
        std::env::set_var("FLOWSIM_TEST_ENV_SIMULATION__DEFAULT_SAMPLES", "500");
        std::env::set_var("FLOWSIM_TEST_ENV_OUTPUT__TYPE", "console");

        let config = Config::load_with_env_prefix(file.path(), "FLOWSIM_TEST_ENV_").unwrap();
        std::env::remove_var("FLOWSIM_TEST_ENV_SIMULATION__DEFAULT_SAMPLES");
        std::env::remove_var("FLOWSIM_TEST_ENV_OUTPUT__TYPE");

        assert_eq!(config.samples(), 500);
        assert_eq!(config.output.kind().unwrap(), OutputKind::Console);
        assert_eq!(config.sensors.flow.frequency_hz, 20);
    }

    #[test]
    fn test_unknown_noise_distribution_is_uniform() {
        let json = r#"{ "sensors": { "flow": { "noise_distribution": "pink" } } }"#;
        let file = write_temp(".json", json);
        let config = Config::load_with_env_prefix(file.path(), "FLOWSIM_TEST_NOISE_").unwrap();
        assert_eq!(config.sensors.flow.noise_distribution, NoiseDistribution::Uniform);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/flowsim.json").unwrap_err();
        assert!(matches!(err, FlowSimError::ConfigError(_)));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_temp(".json", "{ not json");
        assert!(Config::load_with_env_prefix(file.path(), "FLOWSIM_TEST_BAD_").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    fn assert_invalid(mutate: impl FnOnce(&mut Config)) {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(FlowSimError::ConfigError(_))),
            "expected a configuration error for {:?}",
            config
        );
    }

    #[test]
    fn test_validation_rejects_bad_sensors() {
        assert_invalid(|c| c.simulation.default_samples = 0);
        assert_invalid(|c| c.sensors.flow.frequency_hz = 0);
        assert_invalid(|c| c.sensors.pressure.frequency_hz = -10);
        assert_invalid(|c| c.sensors.temperature.resolution_bits = 0);
        assert_invalid(|c| c.sensors.temperature.resolution_bits = 32);
        assert_invalid(|c| c.sensors.flow.noise_amplitude = -1.0);
        assert_invalid(|c| c.sensors.flow.noise_amplitude = f64::INFINITY);
        assert_invalid(|c| c.sensors.flow.equation = "  ".to_string());
        assert_invalid(|c| c.sensors.flow.equation = "sin(".to_string());
    }

    #[test]
    fn test_validation_rejects_bad_processing() {
        assert_invalid(|c| c.processing.flow_equation = String::new());
        assert_invalid(|c| {
            c.processing.filters.push(FilterConfig {
                filter_type: Some("kalman".to_string()),
                target: "flow".to_string(),
                alpha: 0.5,
                window_size: 0,
            })
        });
        assert_invalid(|c| {
            c.processing.filters.push(FilterConfig {
                filter_type: Some("median".to_string()),
                target: "density".to_string(),
                alpha: 0.0,
                window_size: 3,
            })
        });
        assert_invalid(|c| {
            c.processing.default_filter = "unknown".to_string();
            c.processing.filters.push(FilterConfig {
                filter_type: None,
                target: "flow".to_string(),
                alpha: 0.5,
                window_size: 0,
            })
        });
    }

    #[test]
    fn test_validation_rejects_oversized_median_window() {
        let median = |window_size| FilterConfig {
            filter_type: Some("median".to_string()),
            target: "flow".to_string(),
            alpha: 0.0,
            window_size,
        };
        assert_invalid(|c| c.processing.filters.push(median(i32::MAX)));

        let mut config = Config::default();
        config.processing.filters.push(median(MAX_WINDOW_SIZE as i32));
        config.validate().unwrap();
    }

    #[test]
    fn test_out_of_range_alpha_is_only_a_warning() {
        let mut config = Config::default();
        config.processing.filters.push(FilterConfig {
            filter_type: Some("low_pass".to_string()),
            target: "pressure".to_string(),
            alpha: 1.5,
            window_size: 0,
        });
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_output() {
        assert_invalid(|c| c.output.output_type = "smoke-signal".to_string());
        assert_invalid(|c| c.output.output_type = "file".to_string());
        assert_invalid(|c| c.output.output_type = "network".to_string());
        assert_invalid(|c| {
            c.output.output_type = "network".to_string();
            c.output.target = "localhost:8080".to_string();
        });
    }
}
