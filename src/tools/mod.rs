//! Tool system for supervised agent tasks.
//!
//! Tools are what the reasoning engine acts through. The built-in set
//! covers workspace file and directory operations plus thin git
//! wrappers - enough to exercise every gating class end-to-end. Heavier
//! tool suites (sandboxed execution, code generation, debate) live
//! outside this crate and plug in through the same trait.
//!
//! ## Workspace-First Design
//!
//! Tools resolve relative paths from the task's working directory;
//! absolute paths are an escape hatch for system access.

mod directory;
mod file_ops;
mod git;

pub use directory::{ListDirectory, SearchFiles};
pub use file_ops::{DeleteFile, ReadFile, WriteFile};
pub use git::{GitCommit, GitDiff, GitLog, GitStatus};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

/// Resolve a path relative to the working directory.
///
/// - Relative paths are joined with `working_dir`
/// - Absolute paths are used as-is (escape hatch)
pub fn resolve_path(path_str: &str, working_dir: &Path) -> PathBuf {
    let path = Path::new(path_str);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// `working_dir` is the default directory for relative paths.
    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String>;
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new registry with all built-in tools.
    pub fn new() -> Self {
        let mut tools: HashMap<String, Arc<dyn Tool>> = HashMap::new();

        // File operations
        tools.insert("read_file".to_string(), Arc::new(file_ops::ReadFile));
        tools.insert("write_file".to_string(), Arc::new(file_ops::WriteFile));
        tools.insert("delete_file".to_string(), Arc::new(file_ops::DeleteFile));

        // Directory operations
        tools.insert(
            "list_directory".to_string(),
            Arc::new(directory::ListDirectory),
        );
        tools.insert("search_files".to_string(), Arc::new(directory::SearchFiles));

        // Git
        tools.insert("git_status".to_string(), Arc::new(git::GitStatus));
        tools.insert("git_diff".to_string(), Arc::new(git::GitDiff));
        tools.insert("git_commit".to_string(), Arc::new(git::GitCommit));
        tools.insert("git_log".to_string(), Arc::new(git::GitLog));

        Self { tools }
    }

    /// Create an empty registry (no built-in tools).
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register an additional tool, replacing any existing one with the
    /// same name.
    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// List all available tools.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Check if a tool exists by name.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool schemas for engines that advertise tools to a model.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.parameters_schema(),
                })
            })
            .collect()
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        working_dir: &Path,
    ) -> anyhow::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;

        tool.execute(args, working_dir).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        let workspace = Path::new("/workspace");
        assert_eq!(
            resolve_path("output/report.md", workspace),
            PathBuf::from("/workspace/output/report.md")
        );
        assert_eq!(resolve_path("/etc/hosts", workspace), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_default_registry_contents() {
        let registry = ToolRegistry::new();
        for tool in ["read_file", "write_file", "delete_file", "list_directory", "git_commit"] {
            assert!(registry.has_tool(tool), "missing {tool}");
        }
        assert!(!registry.has_tool("generate_code"));
    }

    #[tokio::test]
    async fn test_unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let result = registry
            .execute("no_such_tool", Value::Null, Path::new("/tmp"))
            .await;
        assert!(result.unwrap_err().to_string().contains("Unknown tool"));
    }
}
