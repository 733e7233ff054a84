//! Async runtime: sensor tasks, the acquisition loop and pipeline wiring

pub mod acquisition;
pub mod generator;
pub mod pipeline;

pub use acquisition::{run_acquisition, RunSummary, StopReason};
pub use generator::spawn_sensor;
pub use pipeline::{run_pipeline, Overrides};
