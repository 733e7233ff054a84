//! Core simulation logic: configuration, sensors, filters and the processor

pub mod checked_math;
pub mod config;
pub mod filters;
pub mod processor;
pub mod sensors;
