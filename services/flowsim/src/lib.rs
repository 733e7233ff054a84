//! flowsim - Flow meter simulator
//!
//! Virtual flow, pressure and temperature sensors feed a filtering and
//! flow-calculation pipeline whose results go to a CSV file, the console or
//! an HTTP endpoint.
//!
//! ```text
//! SensorConfig -> SensorGenerator -> channel -> acquisition loop
//!     -> Processor (filters + flow equation) -> OutputData -> OutputSink
//! ```

pub mod core;
pub mod error;
pub mod output;
pub mod receiver;
pub mod runtime;

pub use crate::core::config::Config;
pub use crate::core::processor::{Processor, ReferenceValues};
pub use crate::error::{FlowSimError, Result};
pub use crate::output::{create_sink, OutputData, OutputSink};
pub use crate::runtime::{run_pipeline, Overrides, RunSummary, StopReason};
