//! HTTP receiver for the flow simulator's network output
//!
//! Accepts `POST /` with a JSON record and logs it.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use common::service_bootstrap::{self, ServiceInfo};
use common::ServiceArgs;
use tracing::info;

use flowsim::receiver::{router, ReceiverState, DEFAULT_LISTEN_ADDR};

#[derive(Parser, Debug)]
#[command(name = "flow-receiver", version, about = "Receives flow records over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    listen: SocketAddr,

    #[command(flatten)]
    service: ServiceArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let service_info = ServiceInfo::new(
        "flow-receiver",
        env!("CARGO_PKG_VERSION"),
        "HTTP receiver for flow simulator output",
    );
    service_bootstrap::init_logging(&service_info, &args.service)?;

    let state = ReceiverState::new();
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("HTTP Receiver listening on {}", args.listen);

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(common::shutdown::wait_for_shutdown())
        .await
        .context("HTTP server error")?;

    info!("Receiver stopped after {} records", state.received());
    Ok(())
}
