//! Error handling for the flow meter simulator
//!
//! A failed evaluation or an overflowing result only costs the sample that
//! produced it; configuration and sink-initialisation errors are fatal at
//! startup.

use flow_calc::CalcError;
use thiserror::Error;

/// Flow simulator error type
#[derive(Error, Debug, Clone)]
pub enum FlowSimError {
    /// Formula parse or evaluation errors
    #[error("Calculation error: {0}")]
    Calc(#[from] CalcError),

    /// Result does not fit a signed 32-bit integer
    #[error("Integer overflow: {0}")]
    Overflow(String),

    /// Integer division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sensor sampling errors
    #[error("Sensor error: {0}")]
    SensorError(String),

    /// Output sink errors (write, flush, close)
    #[error("Output error: {0}")]
    OutputError(String),

    /// Input/Output operation errors
    #[error("IO error: {0}")]
    IoError(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Serialization errors (JSON, CSV)
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for the flow simulator
pub type Result<T> = std::result::Result<T, FlowSimError>;

impl FlowSimError {
    pub fn overflow(value: impl std::fmt::Display) -> Self {
        Self::Overflow(format!("{} is outside the i32 range", value))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn sensor(msg: impl Into<String>) -> Self {
        Self::SensorError(msg.into())
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::OutputError(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self::HttpError(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether the error only affects a single sample
    pub fn is_per_sample(&self) -> bool {
        matches!(self, Self::Calc(_) | Self::Overflow(_) | Self::DivisionByZero)
    }
}

// From implementations for external error types

impl From<std::io::Error> for FlowSimError {
    fn from(err: std::io::Error) -> Self {
        FlowSimError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for FlowSimError {
    fn from(err: serde_json::Error) -> Self {
        FlowSimError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for FlowSimError {
    fn from(err: csv::Error) -> Self {
        FlowSimError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for FlowSimError {
    fn from(err: reqwest::Error) -> Self {
        FlowSimError::HttpError(err.to_string())
    }
}

impl From<figment::Error> for FlowSimError {
    fn from(err: figment::Error) -> Self {
        FlowSimError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_error_conversion() {
        let err: FlowSimError = CalcError::variable_not_found("Q").into();
        assert!(err.is_per_sample());
        assert_eq!(err.to_string(), "Calculation error: Variable not found: Q");
    }

    #[test]
    fn test_overflow_message() {
        let err = FlowSimError::overflow(3e9);
        assert!(err.is_per_sample());
        assert!(err.to_string().contains("3000000000"));
    }

    #[test]
    fn test_io_error_is_not_per_sample() {
        let err: FlowSimError = std::io::Error::other("disk full").into();
        assert!(!err.is_per_sample());
        assert!(matches!(err, FlowSimError::IoError(_)));
    }
}
