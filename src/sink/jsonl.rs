use super::RecordSink;
use crate::error::{Result, SinkError};
use crate::models::ReviewRecord;
use crate::utils::{ensure_directory, scope_slug};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON object per line to `<directory>/<scope-slug>.jsonl`.
pub struct JsonLinesSink {
    directory: PathBuf,
    files: Mutex<HashMap<String, File>>,
}

impl JsonLinesSink {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        ensure_directory(&directory)?;
        Ok(Self {
            directory,
            files: Mutex::new(HashMap::new()),
        })
    }

    pub fn path_for(&self, scope: &str) -> PathBuf {
        self.directory.join(format!("{}.jsonl", scope_slug(scope)))
    }

    async fn open(path: &Path, scope: &str) -> std::result::Result<File, SinkError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| write_error(scope, source))
    }
}

fn write_error(scope: &str, source: std::io::Error) -> SinkError {
    SinkError::Write {
        scope: scope.to_string(),
        source,
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn put(&self, record: &ReviewRecord) -> std::result::Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut files = self.files.lock().await;
        if !files.contains_key(&record.scope) {
            let file = Self::open(&self.path_for(&record.scope), &record.scope).await?;
            crate::log_info!(
                scope = %record.scope,
                "[sink] Writing records to {:?}",
                self.path_for(&record.scope)
            );
            files.insert(record.scope.clone(), file);
        }

        let Some(file) = files.get_mut(&record.scope) else {
            return Ok(());
        };
        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Reopen on the next record instead of appending after a partial line.
            files.remove(&record.scope);
            return Err(write_error(&record.scope, e));
        }
        Ok(())
    }

    async fn flush(&self) -> std::result::Result<(), SinkError> {
        let mut files = self.files.lock().await;
        for (scope, file) in files.iter_mut() {
            file.flush().await.map_err(|e| write_error(scope, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessMetadata;

    fn record(scope: &str, text: &str) -> ReviewRecord {
        let metadata = BusinessMetadata::rated("Club A", 4.0, 2);
        ReviewRecord::new(&metadata, scope, text.to_string(), "1/1/2017".to_string(), 4.0)
    }

    #[tokio::test]
    async fn writes_one_file_per_scope() {
        let dir = std::env::temp_dir().join(format!("review-crawler-jsonl-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let sink = JsonLinesSink::new(&dir).unwrap();

        sink.put(&record("Portland OR", "first")).await.unwrap();
        sink.put(&record("Seattle WA", "elsewhere")).await.unwrap();
        sink.put(&record("Portland OR", "second")).await.unwrap();
        sink.flush().await.unwrap();

        let portland = std::fs::read_to_string(dir.join("portland-or.jsonl")).unwrap();
        let texts: Vec<String> = portland
            .lines()
            .map(|line| serde_json::from_str::<ReviewRecord>(line).unwrap().text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);

        let seattle = std::fs::read_to_string(dir.join("seattle-wa.jsonl")).unwrap();
        assert_eq!(seattle.lines().count(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn each_record_is_on_disk_once_put_returns() {
        let dir = std::env::temp_dir()
            .join(format!("review-crawler-jsonl-put-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let sink = JsonLinesSink::new(&dir).unwrap();

        sink.put(&record("Austin TX", "first")).await.unwrap();
        let austin = std::fs::read_to_string(sink.path_for("Austin TX")).unwrap();
        assert_eq!(austin.lines().count(), 1);

        sink.put(&record("Austin TX", "second")).await.unwrap();
        let austin = std::fs::read_to_string(sink.path_for("Austin TX")).unwrap();
        assert_eq!(austin.lines().count(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
