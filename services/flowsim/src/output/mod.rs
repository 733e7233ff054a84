//! Output sinks for calculated flow records

pub mod console;
pub mod file;
pub mod http;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::config::OutputConfig;
use crate::error::{FlowSimError, Result};

pub use console::ConsoleSink;
pub use file::CsvFileSink;
pub use http::HttpSink;

/// One calculated flow sample, produced once per flow reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputData {
    pub sample_number: i64,
    pub raw_flow: i32,
    pub pressure: i32,
    pub temperature: i32,
    pub calculated_flow: i32,
}

/// Destination for output records
#[async_trait]
pub trait OutputSink: Send {
    /// Deliver one record
    async fn write(&mut self, data: &OutputData) -> Result<()>;

    /// Release the sink; called once when the run ends
    async fn close(&mut self) -> Result<()>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Configured output type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    File,
    Console,
    Network,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Console => "console",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = FlowSimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "console" => Ok(Self::Console),
            "network" => Ok(Self::Network),
            other => Err(FlowSimError::config(format!(
                "unknown output type '{}' (expected file, console or network)",
                other
            ))),
        }
    }
}

/// Create the sink described by the configuration
pub fn create_sink(config: &OutputConfig) -> Result<Box<dyn OutputSink>> {
    let sink: Box<dyn OutputSink> = match config.kind()? {
        OutputKind::File => Box::new(CsvFileSink::create(&config.target)?),
        OutputKind::Console => Box::new(ConsoleSink::stdout()),
        OutputKind::Network => Box::new(HttpSink::new(&config.target)?),
    };

    info!("Output: {}", sink.describe());
    Ok(sink)
}
