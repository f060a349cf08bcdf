//! Record sink for confirmed submissions. Append-only, one writer per engine.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::models::record::SubmissionRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Record file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError>;
}

/// One JSON object per line, appended with a single write.
#[derive(Debug, Clone)]
pub struct JsonlRecordSink {
    path: PathBuf,
}

impl JsonlRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonlRecordSink {
    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        info!("Recorded {} @ {}", record.title, record.company);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(title: &str) -> SubmissionRecord {
        SubmissionRecord {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
            title: title.to_string(),
            company: "Acme".to_string(),
            url: "https://www.seek.com.au/job/1".to_string(),
            site: "seek".to_string(),
        }
    }

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlRecordSink::new(dir.path().join("applications.jsonl"));
        sink.append(&record("Project Manager")).await.unwrap();
        sink.append(&record("Program Manager")).await.unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: SubmissionRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, record("Project Manager"));
        assert!(lines[0].contains("\"timestamp\":\"2026-03-14T09:30:00Z\""));
    }
}
