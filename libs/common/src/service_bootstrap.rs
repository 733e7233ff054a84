//! Unified service bootstrap utilities
//!
//! Startup banner and logging initialisation shared by the flow meter binaries.

use crate::bootstrap_args::ServiceArgs;
use crate::logging::{self, LogConfig};
use tracing::info;

/// Service metadata for startup
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Service name (e.g., "flowsim")
    pub name: String,
    /// Service version
    pub version: String,
    /// Service description
    pub description: String,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

/// Print startup banner
pub fn print_startup_banner(service: &ServiceInfo) {
    let banner = r#"
 ███████╗██╗      ██████╗ ██╗    ██╗
 ██╔════╝██║     ██╔═══██╗██║    ██║
 █████╗  ██║     ██║   ██║██║ █╗ ██║
 ██╔══╝  ██║     ██║   ██║██║███╗██║
 ██║     ███████╗╚██████╔╝╚███╔███╔╝
 ╚═╝     ╚══════╝ ╚═════╝  ╚══╝╚══╝
    "#;

    info!("{}", banner);
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!("");
}

/// Initialize logging for a service from its command-line arguments
///
/// Log directory priority:
/// 1. FLOWSIM_LOG_DIR environment variable
/// 2. `--log-dir` argument
/// 3. console only
pub fn init_logging(service: &ServiceInfo, args: &ServiceArgs) -> anyhow::Result<()> {
    let log_dir = std::env::var(logging::LOG_DIR_ENV)
        .ok()
        .map(std::path::PathBuf::from)
        .or_else(|| args.log_dir.clone());

    let config = LogConfig {
        service_name: service.name.clone(),
        level: args.parse_log_level(),
        log_dir,
        ansi: !args.no_color,
    };

    logging::init_with_config(config).map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(())
}
