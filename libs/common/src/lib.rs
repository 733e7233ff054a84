//! Flow meter basic library
//!
//! Provides functions shared by the simulator and receiver binaries:
//! - logging initialisation
//! - shutdown signal handling
//! - common command-line arguments and startup banner

pub mod bootstrap_args;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

pub use bootstrap_args::ServiceArgs;
pub use service_bootstrap::ServiceInfo;

// Re-export common dependencies
pub use anyhow;
pub use tokio;
