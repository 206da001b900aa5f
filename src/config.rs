//! Configuration management.
//!
//! Configuration comes from environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `WORKSPACE_PATH` - Optional. Working directory for tool execution.
//!   Defaults to the current directory.
//! - `MAX_STEPS` - Optional. Engine steps per task. Defaults to `50`.
//! - `BATCH_APPROVAL_THRESHOLD` - Optional. Modifying operations per
//!   batch checkpoint. Defaults to `10`; `0` disables batch checkpoints.
//! - `DEFAULT_MODEL` - Optional. Model passed to the engine factory when
//!   a task does not specify one.
//! - `ENGINE_SCRIPT` - Optional. Step file for the scripted engine;
//!   required by the stock binary.
//! - `AUDIT_LOG_DIR` - Optional. Where execution logs are written.
//!   Defaults to `{workspace}/.warden/audit`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Working directory for tool execution
    pub workspace_path: PathBuf,

    /// Maximum engine steps per task
    pub max_steps: usize,

    /// Modifying operations allowed between batch checkpoints
    pub batch_approval_threshold: usize,

    /// Default model identifier handed to the engine factory
    pub default_model: Option<String>,

    /// Step file for the scripted engine
    pub engine_script: Option<PathBuf>,

    /// Directory execution logs are flushed to
    pub audit_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", 3000)?;

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let max_steps = parse_var("MAX_STEPS", 50)?;
        let batch_approval_threshold = parse_var("BATCH_APPROVAL_THRESHOLD", 10)?;
        let default_model = std::env::var("DEFAULT_MODEL").ok();
        let engine_script = std::env::var("ENGINE_SCRIPT").ok().map(PathBuf::from);

        let audit_dir = std::env::var("AUDIT_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| workspace_path.join(".warden").join("audit"));

        Ok(Self {
            host,
            port,
            workspace_path,
            max_steps,
            batch_approval_threshold,
            default_model,
            engine_script,
            audit_dir,
        })
    }

    /// Config with explicit values, for tests and embedding.
    pub fn for_workspace(workspace_path: PathBuf) -> Self {
        let audit_dir = workspace_path.join(".warden").join("audit");
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            workspace_path,
            max_steps: 50,
            batch_approval_threshold: 10,
            default_model: None,
            engine_script: None,
            audit_dir,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
