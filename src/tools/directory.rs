//! Directory tools: list a tree, search files by name.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use walkdir::WalkDir;

use super::{resolve_path, Tool};

/// List contents of a directory.
pub struct ListDirectory;

#[async_trait]
impl Tool for ListDirectory {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and directories. Use '.' for the workspace root, relative paths for subdirectories, or absolute paths."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path, relative to the workspace or absolute"
                },
                "max_depth": {
                    "type": "integer",
                    "description": "Maximum depth to traverse (default: 3)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;
        let max_depth = args["max_depth"].as_u64().unwrap_or(3) as usize;

        let resolved = resolve_path(path, working_dir);
        if !resolved.exists() {
            return Err(anyhow::anyhow!(
                "Directory not found: {} (resolved to: {})",
                path,
                resolved.display()
            ));
        }
        if !resolved.is_dir() {
            return Err(anyhow::anyhow!("Not a directory: {}", path));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&resolved).max_depth(max_depth).sort_by_file_name();

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let depth = entry.depth();
            let entry_path = entry.path();
            let relative = entry_path.strip_prefix(&resolved).unwrap_or(entry_path);
            if relative.as_os_str().is_empty() {
                continue;
            }

            let prefix = "  ".repeat(depth.saturating_sub(1));
            let name = relative
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let suffix = if entry_path.is_dir() { "/" } else { "" };
            entries.push(format!("{}{}{}", prefix, name, suffix));
        }

        if entries.is_empty() {
            Ok("Directory is empty".to_string())
        } else {
            Ok(entries.join("\n"))
        }
    }
}

/// Search for files by name pattern.
pub struct SearchFiles;

#[async_trait]
impl Tool for SearchFiles {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files by name pattern (glob-style). Searches the workspace by default."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "File name pattern, e.g. '*.rs' or 'README*'"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in, defaults to the workspace"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let pattern = args["pattern"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'pattern' argument"))?;
        let path = args["path"].as_str().unwrap_or(".");

        let resolved = resolve_path(path, working_dir);
        if !resolved.exists() {
            return Err(anyhow::anyhow!(
                "Directory not found: {} (resolved to: {})",
                path,
                resolved.display()
            ));
        }

        let pattern_lower = pattern.to_lowercase();
        let is_glob = pattern.contains('*');

        let mut matches = Vec::new();
        for entry in WalkDir::new(&resolved).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_lowercase();
            let matched = if is_glob {
                glob_match(&pattern_lower, &file_name)
            } else {
                file_name.contains(&pattern_lower)
            };

            if matched {
                matches.push(entry.path().to_string_lossy().to_string());
            }
            if matches.len() >= 100 {
                matches.push("... (results truncated, showing first 100)".to_string());
                break;
            }
        }

        if matches.is_empty() {
            Ok(format!("No files matching '{}' found", pattern))
        } else {
            Ok(matches.join("\n"))
        }
    }
}

/// Simple glob pattern matching.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(idx) => {
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            }
            None => return false,
        }
    }

    if !pattern.ends_with('*') {
        if let Some(last) = parts.last() {
            if !last.is_empty() {
                return text.ends_with(last);
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.rs", "main.rs"));
        assert!(glob_match("readme*", "readme.md"));
        assert!(glob_match("*test*", "my_test_file.py"));
        assert!(!glob_match("*.rs", "main.py"));
        assert!(!glob_match("test_*", "untested.py"));
    }

    #[tokio::test]
    async fn test_list_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        tokio::fs::write(dir.path().join("top.txt"), "x").await.unwrap();
        tokio::fs::write(dir.path().join("sub/inner.txt"), "y").await.unwrap();

        let listing = ListDirectory
            .execute(json!({"path": "."}), dir.path())
            .await
            .unwrap();
        assert!(listing.contains("top.txt"));
        assert!(listing.contains("sub/"));
        assert!(listing.contains("inner.txt"));
    }

    #[tokio::test]
    async fn test_search_files_by_glob() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.rs"), "x").await.unwrap();
        tokio::fs::write(dir.path().join("b.py"), "y").await.unwrap();

        let found = SearchFiles
            .execute(json!({"pattern": "*.rs"}), dir.path())
            .await
            .unwrap();
        assert!(found.contains("a.rs"));
        assert!(!found.contains("b.py"));
    }
}
