//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkpoint::CheckpointView;
use crate::session::SessionState;

/// Request to start a new supervised task.
#[derive(Debug, Clone, Deserialize)]
pub struct StartTaskRequest {
    /// The task description / user prompt
    pub description: String,

    /// Whether gated actions require supervisor approval. On by default.
    #[serde(default = "default_safety_mode")]
    pub safety_mode: bool,

    /// Optional model override passed through to the engine factory.
    pub model: Option<String>,
}

fn default_safety_mode() -> bool {
    true
}

/// Snapshot view of a task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub description: String,
    pub safety_mode: bool,
    pub model: Option<String>,
    pub state: SessionState,
    pub result: Option<String>,
    /// The checkpoint the task is suspended on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_checkpoint: Option<CheckpointView>,
    pub log: Vec<String>,
}

/// Decision payload for a tool confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmToolRequest {
    pub confirmed: bool,
}

/// Acknowledgement body for resolution endpoints. Continued progress
/// streams on the original task's event stream, not here.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionAck {
    pub ok: bool,
    pub checkpoint_id: Uuid,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub max_steps: usize,
    pub batch_approval_threshold: usize,
    pub pending_checkpoints: usize,
}
