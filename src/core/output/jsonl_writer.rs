//! JSON Lines (JSONL) output writer.
//!
//! One conversation goes to one file, one [`MessageRecord`] per line. Lines
//! are appended in processing order and flushed individually, so a line on
//! disk means every side effect of its message has resolved.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::Result;
use crate::record::MessageRecord;

/// Serializes one record to a single JSONL line, without the newline.
pub fn to_jsonl_line(record: &MessageRecord) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Append-only writer for one conversation's `.jsonl` file.
///
/// ```jsonl
/// {"id":3,"date":"2024-01-15T10:32:00Z","src":null,...}
/// {"id":2,"date":"2024-01-15T10:31:00Z","src":{"id":1,"type":"user",...},...}
/// ```
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: usize,
}

impl JsonlSink {
    /// Creates the file, truncating any previous content.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Appends one record and flushes it to the file.
    pub async fn append(&mut self, record: &MessageRecord) -> Result<()> {
        let mut line = to_jsonl_line(record)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and syncs the file, then closes it.
    pub async fn close(mut self) -> Result<usize> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await?;
        Ok(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawMessage;

    fn record(id: i64, text: &str) -> MessageRecord {
        MessageRecord::from(&RawMessage::new(id).with_text(text))
    }

    #[tokio::test]
    async fn test_append_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.jsonl");

        let mut sink = JsonlSink::create(&path).await.unwrap();
        sink.append(&record(1, "Hello")).await.unwrap();
        sink.append(&record(2, "Hi")).await.unwrap();
        assert_eq!(sink.close().await.unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(content.ends_with('\n'));

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(first["text"], "Hello");
    }

    #[tokio::test]
    async fn test_lines_are_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.jsonl");

        let mut sink = JsonlSink::create(&path).await.unwrap();
        sink.append(&record(1, "first")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert_eq!(sink.lines(), 1);
    }

    #[tokio::test]
    async fn test_create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.jsonl");
        std::fs::write(&path, "stale\nstale\n").unwrap();

        let sink = JsonlSink::create(&path).await.unwrap();
        assert_eq!(sink.path(), path.as_path());
        sink.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_to_jsonl_line_has_no_newline_or_brackets() {
        let line = to_jsonl_line(&record(1, "multi\nline")).unwrap();
        assert!(!line.contains('\n'));
        assert!(!line.starts_with('['));
    }
}
