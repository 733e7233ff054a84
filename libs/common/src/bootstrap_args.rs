//! Common command-line arguments for flow meter binaries
//!
//! Flattened into each binary's own `clap` parser.

use clap::Args;
use std::path::PathBuf;

/// Common service startup arguments
#[derive(Debug, Clone, Args)]
pub struct ServiceArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,

    /// Directory for daily log files (console only when unset)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Disable colored output (useful for log files)
    #[arg(long)]
    pub no_color: bool,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            no_color: false,
        }
    }
}

impl ServiceArgs {
    /// Parse log level string to tracing::Level
    pub fn parse_log_level(&self) -> tracing::Level {
        crate::logging::parse_level(&self.log_level)
    }

    /// Check if running with verbose logging
    pub fn is_development(&self) -> bool {
        self.log_level == "debug" || self.log_level == "trace"
    }
}
