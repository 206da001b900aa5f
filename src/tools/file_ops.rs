//! File operation tools: read, write, delete.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{resolve_path, Tool};

/// Read the contents of a file.
pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file's contents. Use relative paths like 'src/main.rs' for workspace files or absolute paths for system files."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace or absolute"
                },
                "start_line": {
                    "type": "integer",
                    "description": "Optional: start reading from this line number (1-indexed)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "Optional: stop reading at this line number (inclusive)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;

        let resolved = resolve_path(path, working_dir);
        if !resolved.exists() {
            return Err(anyhow::anyhow!(
                "File not found: {} (resolved to: {})",
                path,
                resolved.display()
            ));
        }

        let bytes = tokio::fs::read(&resolved).await?;
        let content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                return Ok(format!(
                    "Binary file: {} ({} bytes); contents not displayed",
                    resolved.display(),
                    resolved.metadata().map(|m| m.len()).unwrap_or(0)
                ));
            }
        };

        let start_line = args["start_line"].as_u64().map(|n| n as usize);
        let end_line = args["end_line"].as_u64().map(|n| n as usize);

        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        let start = start_line.unwrap_or(1).saturating_sub(1).min(total);
        let end = end_line.unwrap_or(total).min(total);
        let (start, end) = if start > end { (end, start) } else { (start, end) };

        let numbered: Vec<String> = lines[start..end]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:4}| {}", start + i + 1, line))
            .collect();

        Ok(numbered.join("\n"))
    }
}

/// Write content to a file (create or overwrite).
pub struct WriteFile;

#[async_trait]
impl Tool for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories as needed. Use relative paths to stay in the workspace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace or absolute"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;
        let content = args["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'content' argument"))?;

        let resolved = resolve_path(path, working_dir);
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, content).await?;

        Ok(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            resolved.display()
        ))
    }
}

/// Delete a file.
pub struct DeleteFile;

#[async_trait]
impl Tool for DeleteFile {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file. Use relative paths for workspace files; absolute paths work but deserve caution."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace or absolute"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;

        let resolved = resolve_path(path, working_dir);
        if !resolved.exists() {
            return Err(anyhow::anyhow!(
                "File not found: {} (resolved to: {})",
                path,
                resolved.display()
            ));
        }

        tokio::fs::remove_file(&resolved).await?;
        Ok(format!("Successfully deleted {}", resolved.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let write = WriteFile
            .execute(
                json!({"path": "notes/hello.txt", "content": "line one\nline two"}),
                dir.path(),
            )
            .await
            .unwrap();
        assert!(write.contains("notes/hello.txt"));

        let read = ReadFile
            .execute(json!({"path": "notes/hello.txt"}), dir.path())
            .await
            .unwrap();
        assert!(read.contains("line one"));
        assert!(read.contains("   2| line two"));
    }

    #[tokio::test]
    async fn test_read_line_range() {
        let dir = tempfile::tempdir().unwrap();
        WriteFile
            .execute(json!({"path": "f.txt", "content": "a\nb\nc\nd"}), dir.path())
            .await
            .unwrap();

        let read = ReadFile
            .execute(json!({"path": "f.txt", "start_line": 2, "end_line": 3}), dir.path())
            .await
            .unwrap();
        assert_eq!(read, "   2| b\n   3| c");
    }

    #[tokio::test]
    async fn test_delete_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = DeleteFile
            .execute(json!({"path": "nope.txt"}), dir.path())
            .await;
        assert!(result.unwrap_err().to_string().contains("File not found"));
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        WriteFile
            .execute(json!({"path": "gone.txt", "content": "x"}), dir.path())
            .await
            .unwrap();
        DeleteFile
            .execute(json!({"path": "gone.txt"}), dir.path())
            .await
            .unwrap();
        assert!(!dir.path().join("gone.txt").exists());
    }
}
