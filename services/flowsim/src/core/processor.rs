//! Flow processor
//!
//! Holds the latest filtered pressure and temperature, runs each flow sample
//! through the flow filter chain and evaluates the configured flow equation
//! against the current state.

use std::collections::HashMap;

use flow_calc::{CalcEngine, CalcError};
use tracing::debug;

use crate::core::checked_math;
use crate::core::config::ProcessingConfig;
use crate::core::filters::{Filter, FilterChain};
use crate::core::sensors::SensorType;
use crate::error::Result;

/// Optional calibration baseline passed to every equation as `RefF/RefP/RefT`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceValues {
    pub flow: Option<i32>,
    pub pressure: Option<i32>,
    pub temperature: Option<i32>,
}

impl ReferenceValues {
    pub fn new(flow: i32, pressure: i32, temperature: i32) -> Self {
        Self {
            flow: Some(flow),
            pressure: Some(pressure),
            temperature: Some(temperature),
        }
    }

    /// Insert the values that are set; absent ones stay unbound
    pub fn bind(&self, variables: &mut HashMap<String, f64>) {
        for (name, value) in [
            ("RefF", self.flow),
            ("RefP", self.pressure),
            ("RefT", self.temperature),
        ] {
            if let Some(value) = value {
                variables.insert(name.to_string(), f64::from(value));
            }
        }
    }
}

/// Processing state owned by the acquisition loop
#[derive(Debug, Default)]
pub struct Processor {
    latest_pressure: i32,
    latest_temperature: i32,
    pressure_filters: FilterChain,
    temperature_filters: FilterChain,
    flow_filters: FilterChain,
    engine: CalcEngine,
}

impl Processor {
    /// Build the filter chains in configuration order
    ///
    /// Filters without an explicit type use `default_filter`. Unknown types
    /// and targets are configuration errors.
    pub fn new(config: &ProcessingConfig) -> Result<Self> {
        let mut processor = Self::default();

        for filter_config in &config.filters {
            let kind = filter_config.kind(&config.default_filter)?;
            let target = filter_config.target()?;
            let filter = Filter::new(kind, filter_config.alpha, filter_config.window_size);

            debug!(
                filter = %kind,
                target = %target,
                alpha = filter_config.alpha,
                window_size = filter_config.window_size,
                "filter registered"
            );
            processor.chain_mut(target).push(filter);
        }

        Ok(processor)
    }

    fn chain_mut(&mut self, target: SensorType) -> &mut FilterChain {
        match target {
            SensorType::Flow => &mut self.flow_filters,
            SensorType::Pressure => &mut self.pressure_filters,
            SensorType::Temperature => &mut self.temperature_filters,
        }
    }

    pub fn chain(&self, target: SensorType) -> &FilterChain {
        match target {
            SensorType::Flow => &self.flow_filters,
            SensorType::Pressure => &self.pressure_filters,
            SensorType::Temperature => &self.temperature_filters,
        }
    }

    /// Pre-seed each chain that has a reference value
    pub fn initialize_filters(&mut self, references: &ReferenceValues) {
        if let Some(flow) = references.flow {
            self.flow_filters.initialize(flow);
        }
        if let Some(pressure) = references.pressure {
            self.pressure_filters.initialize(pressure);
        }
        if let Some(temperature) = references.temperature {
            self.temperature_filters.initialize(temperature);
        }
    }

    pub fn latest_pressure(&self) -> i32 {
        self.latest_pressure
    }

    pub fn latest_temperature(&self) -> i32 {
        self.latest_temperature
    }

    pub fn update_pressure(&mut self, raw: i32) -> i32 {
        self.latest_pressure = self.pressure_filters.process(raw);
        self.latest_pressure
    }

    pub fn update_temperature(&mut self, raw: i32) -> i32 {
        self.latest_temperature = self.temperature_filters.process(raw);
        self.latest_temperature
    }

    /// Pin pressure to a constant, bypassing the pressure filters
    pub fn override_pressure(&mut self, value: i32) {
        self.latest_pressure = value;
    }

    /// Pin temperature to a constant, bypassing the temperature filters
    pub fn override_temperature(&mut self, value: i32) {
        self.latest_temperature = value;
    }

    /// Filter `raw_flow` and evaluate `equation` against the current state
    ///
    /// Bound variables: `flow`/`F`, `pressure`/`P`, `temperature`/`T`, `t`
    /// and whichever of `RefF`, `RefP`, `RefT` are set. The flow chain
    /// advances even when evaluation fails.
    pub fn calculate_flow(
        &mut self,
        equation: &str,
        raw_flow: i32,
        elapsed_secs: f64,
        references: &ReferenceValues,
    ) -> Result<i32> {
        let filtered_flow = f64::from(self.flow_filters.process(raw_flow));
        let pressure = f64::from(self.latest_pressure);
        let temperature = f64::from(self.latest_temperature);

        let mut variables = HashMap::with_capacity(10);
        variables.insert("flow".to_string(), filtered_flow);
        variables.insert("pressure".to_string(), pressure);
        variables.insert("temperature".to_string(), temperature);
        variables.insert("t".to_string(), elapsed_secs);
        variables.insert("F".to_string(), filtered_flow);
        variables.insert("P".to_string(), pressure);
        variables.insert("T".to_string(), temperature);
        references.bind(&mut variables);

        let result = self.engine.evaluate(equation, &variables)?;
        if result.is_nan() {
            return Err(CalcError::evaluation(format!("'{}' evaluated to NaN", equation)).into());
        }

        checked_math::to_i32(result)
    }

    /// Number of distinct flow equations compiled so far
    pub fn cached_equations(&self) -> usize {
        self.engine.cached_formulas()
    }
}
