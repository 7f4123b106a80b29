mod jsonl;

pub use jsonl::JsonLinesSink;

use crate::error::SinkError;
use crate::models::ReviewRecord;
use async_trait::async_trait;

/// Durable destination for review records.
///
/// Implementations route each record by its `scope` and must accept
/// concurrent `put` calls.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn put(&self, record: &ReviewRecord) -> Result<(), SinkError>;

    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes records to the log instead of storage.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl RecordSink for LogSink {
    async fn put(&self, record: &ReviewRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        crate::log_info!(scope = %record.scope, "[sink] {}", line);
        Ok(())
    }
}
