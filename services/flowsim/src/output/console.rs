//! Console sink: one formatted line per record

use async_trait::async_trait;
use tokio::io::{self, AsyncWrite, AsyncWriteExt, Stdout};

use super::{OutputData, OutputSink};
use crate::error::Result;

/// Line-per-record sink over an async writer, tokio's stdout by default
pub struct ConsoleSink<W: AsyncWrite + Unpin + Send> {
    out: W,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// `[       1] Flow:     1000 | P: 127 | T: 255 | Calc: 498`
pub fn format_record(data: &OutputData) -> String {
    format!(
        "[{:>8}] Flow: {:>8} | P: {:>3} | T: {:>3} | Calc: {}",
        data.sample_number, data.raw_flow, data.pressure, data.temperature, data.calculated_flow
    )
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputSink for ConsoleSink<W> {
    async fn write(&mut self, data: &OutputData) -> Result<()> {
        let mut line = format_record(data);
        line.push('\n');
        self.out.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.out.flush().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        "console".to_string()
    }
}
