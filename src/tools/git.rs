//! Git operation tools.
//!
//! Thin wrappers over the `git` binary, operating on the workspace by
//! default. Status, diff, and log are read-only; commit mutates and is
//! therefore subject to gating.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use super::{resolve_path, Tool};
use crate::events::truncate_for_display;

const DIFF_DISPLAY_LIMIT: usize = 10000;

/// Get git status.
pub struct GitStatus;

#[async_trait]
impl Tool for GitStatus {
    fn name(&self) -> &str {
        "git_status"
    }

    fn description(&self) -> &str {
        "Get the current git status, showing modified, staged, and untracked files."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_path": {
                    "type": "string",
                    "description": "Optional: path to the repository. Defaults to the workspace."
                }
            }
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let repo_path = repo_path(&args, working_dir);
        run_git_command(&["status", "--porcelain=v2", "--branch"], &repo_path).await
    }
}

/// Get git diff.
pub struct GitDiff;

#[async_trait]
impl Tool for GitDiff {
    fn name(&self) -> &str {
        "git_diff"
    }

    fn description(&self) -> &str {
        "Show git diff of changes. Can diff staged changes or a specific file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_path": {
                    "type": "string",
                    "description": "Optional: path to the repository. Defaults to the workspace."
                },
                "staged": {
                    "type": "boolean",
                    "description": "Show staged changes instead of unstaged (default: false)"
                },
                "file": {
                    "type": "string",
                    "description": "Optional: show diff for a specific file only"
                }
            }
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let repo_path = repo_path(&args, working_dir);
        let staged = args["staged"].as_bool().unwrap_or(false);
        let file = args["file"].as_str();

        let mut git_args = vec!["diff"];
        if staged {
            git_args.push("--staged");
        }
        if let Some(f) = file {
            git_args.push("--");
            git_args.push(f);
        }

        let result = run_git_command(&git_args, &repo_path).await?;
        if result.is_empty() {
            return Ok("No changes".to_string());
        }
        let (display, _truncated) = truncate_for_display(&result, DIFF_DISPLAY_LIMIT);
        Ok(display)
    }
}

/// Stage changes and create a commit.
pub struct GitCommit;

#[async_trait]
impl Tool for GitCommit {
    fn name(&self) -> &str {
        "git_commit"
    }

    fn description(&self) -> &str {
        "Stage changes and create a git commit with the given message."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_path": {
                    "type": "string",
                    "description": "Optional: path to the repository. Defaults to the workspace."
                },
                "message": {
                    "type": "string",
                    "description": "The commit message"
                },
                "files": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional: specific files to stage. Stages everything when omitted."
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let repo_path = repo_path(&args, working_dir);
        let message = args["message"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'message' argument"))?;

        let files: Vec<&str> = args["files"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        if files.is_empty() {
            run_git_command(&["add", "-A"], &repo_path).await?;
        } else {
            let mut git_args = vec!["add", "--"];
            git_args.extend(files);
            run_git_command(&git_args, &repo_path).await?;
        }

        run_git_command(&["commit", "-m", message], &repo_path).await
    }
}

/// Show recent commits.
pub struct GitLog;

#[async_trait]
impl Tool for GitLog {
    fn name(&self) -> &str {
        "git_log"
    }

    fn description(&self) -> &str {
        "Show recent git commits."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_path": {
                    "type": "string",
                    "description": "Optional: path to the repository. Defaults to the workspace."
                },
                "num_commits": {
                    "type": "integer",
                    "description": "Number of commits to show (default: 10)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, working_dir: &Path) -> anyhow::Result<String> {
        let repo_path = repo_path(&args, working_dir);
        let num_commits = args["num_commits"].as_u64().unwrap_or(10).to_string();
        run_git_command(&["log", "-n", &num_commits, "--oneline"], &repo_path).await
    }
}

fn repo_path(args: &Value, working_dir: &Path) -> std::path::PathBuf {
    args["repo_path"]
        .as_str()
        .map(|p| resolve_path(p, working_dir))
        .unwrap_or_else(|| working_dir.to_path_buf())
}

/// Run a git command and return its output.
async fn run_git_command(args: &[&str], repo_path: &Path) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run git: {}", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        if stderr.is_empty() {
            return Err(anyhow::anyhow!("Git command failed: {}", stdout.trim()));
        }
        return Err(anyhow::anyhow!("Git error: {}", stderr.trim()));
    }

    Ok(stdout.to_string())
}
