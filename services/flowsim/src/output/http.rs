//! HTTP sink: POSTs each record as JSON

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{OutputData, OutputSink};
use crate::error::{FlowSimError, Result};

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpSink {
    url: String,
    client: Client,
}

impl HttpSink {
    pub fn new(url: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(FlowSimError::config("HTTP output URL is empty"));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FlowSimError::http(e.to_string()))?;

        Ok(Self {
            url: url.trim().to_string(),
            client,
        })
    }
}

#[async_trait]
impl OutputSink for HttpSink {
    async fn write(&mut self, data: &OutputData) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(data)
            .send()
            .await
            .map_err(|e| FlowSimError::http(format!("Failed to send HTTP request: {}", e)))?;

        if !response.status().is_success() {
            return Err(FlowSimError::http(format!(
                "HTTP request failed with status: {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        format!("network {}", self.url)
    }
}
