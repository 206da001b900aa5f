//! Shared execution log.
//!
//! One append-only trace per task, shared by reference so resumed
//! segments append to the same log. Flushed to the audit directory on
//! every terminal transition, success or failure.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct LogLine {
    at: DateTime<Utc>,
    text: String,
}

/// Ordered, append-only, human-readable trace of a task run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, text: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.push(LogLine {
            at: Utc::now(),
            text: text.into(),
        });
    }

    /// Rendered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines
            .iter()
            .map(|line| format!("{} {}", line.at.to_rfc3339(), line.text))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the full log to `dir/<task_id>.log` for postmortem audit.
    pub async fn flush_to(&self, dir: &Path, task_id: Uuid) -> anyhow::Result<PathBuf> {
        let mut content = self.lines().join("\n");
        content.push('\n');
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{task_id}.log"));
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_keep_append_order() {
        let log = ExecutionLog::new();
        log.append("first");
        log.append("second");

        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }

    #[test]
    fn test_clones_share_the_same_log() {
        let log = ExecutionLog::new();
        let shared = log.clone();
        shared.append("from the resumed segment");
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_writes_audit_file() {
        let dir = tempfile::tempdir().unwrap();
        let task_id = Uuid::new_v4();
        let log = ExecutionLog::new();
        log.append("task started");

        let path = log.flush_to(dir.path(), task_id).await.unwrap();
        assert_eq!(path, dir.path().join(format!("{task_id}.log")));
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("task started"));
    }
}
