//! CSV file sink
//!
//! The header is written when the file is created, so an empty run still
//! leaves a valid CSV behind. Every record is flushed as it is written.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{OutputData, OutputSink};
use crate::error::{FlowSimError, Result};

pub const CSV_HEADER: [&str; 5] = [
    "sample_number",
    "raw_flow",
    "pressure",
    "temperature",
    "calculated_flow",
];

pub struct CsvFileSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl CsvFileSink {
    /// Create (or truncate) `path` and write the header
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| {
                FlowSimError::output(format!("Failed to create {}: {}", path.display(), e))
            })?;

        writer.write_record(CSV_HEADER)?;
        writer.flush()?;

        debug!("CSV output created: {}", path.display());
        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutputSink for CsvFileSink {
    async fn write(&mut self, data: &OutputData) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| FlowSimError::output("CSV output already closed"))?;

        writer.serialize(data)?;
        writer.flush()?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(mut writer) => {
                writer.flush()?;
                debug!("CSV output closed: {}", self.path.display());
                Ok(())
            },
            None => Ok(()),
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.csv");

        let mut sink = CsvFileSink::create(&path).unwrap();
        sink.write(&OutputData {
            sample_number: 1,
            raw_flow: 1000,
            pressure: 127,
            temperature: 255,
            calculated_flow: 498,
        })
        .await
        .unwrap();

        // Flushed per record, readable before close
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "sample_number,raw_flow,pressure,temperature,calculated_flow\n1,1000,127,255,498\n"
        );

        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert!(sink
            .write(&OutputData {
                sample_number: 2,
                raw_flow: 0,
                pressure: 0,
                temperature: 0,
                calculated_flow: 0,
            })
            .await
            .is_err());
    }

    #[test]
    fn test_empty_run_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let _sink = CsvFileSink::create(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "sample_number,raw_flow,pressure,temperature,calculated_flow\n"
        );
    }

    #[test]
    fn test_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("flow.csv");
        assert!(matches!(
            CsvFileSink::create(&path),
            Err(FlowSimError::OutputError(_))
        ));
    }
}
