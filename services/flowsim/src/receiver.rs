//! HTTP endpoint accepting the records posted by the network sink

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::output::OutputData;

/// Default listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Counters shared by the request handlers
#[derive(Debug, Clone, Default)]
pub struct ReceiverState {
    received: Arc<AtomicU64>,
    last: Arc<Mutex<Option<OutputData>>>,
}

impl ReceiverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn last(&self) -> Option<OutputData> {
        *self.last.lock()
    }
}

/// `POST /` with an [`OutputData`] body; other methods get 405
pub fn router(state: ReceiverState) -> Router {
    Router::new()
        .route("/", post(receive_record))
        .with_state(state)
}

async fn receive_record(State(state): State<ReceiverState>, body: Bytes) -> StatusCode {
    let data: OutputData = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(e) => {
            warn!("Error decoding JSON: {}", e);
            return StatusCode::BAD_REQUEST;
        },
    };

    info!(
        "Received: Sample={}, Flow={}, P={}, T={}, Calc={}",
        data.sample_number, data.raw_flow, data.pressure, data.temperature, data.calculated_flow
    );

    state.received.fetch_add(1, Ordering::Relaxed);
    *state.last.lock() = Some(data);
    StatusCode::OK
}
