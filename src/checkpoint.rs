//! Suspended-task checkpoints and the registry that resolves them.
//!
//! A checkpoint is the stored continuation of a suspended task: what the
//! task is waiting on, plus the one-shot channel an approval endpoint
//! fires to wake the parked session. The registry is the single source
//! of truth for "what is waiting on a human". Entries live only in this
//! process - a restart drops every pending checkpoint and orphans the
//! tasks that were suspended on them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

/// Recovery choice for a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    Retry,
    Skip,
    Manual,
}

impl FailureAction {
    pub const ALL: [FailureAction; 3] =
        [FailureAction::Retry, FailureAction::Skip, FailureAction::Manual];

    pub fn label(self) -> &'static str {
        match self {
            FailureAction::Retry => "retry",
            FailureAction::Skip => "skip",
            FailureAction::Manual => "manual",
        }
    }
}

/// Details of a failed step awaiting a recovery decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetails {
    /// Identifier of the step that failed.
    pub step: String,
    /// Short error summary.
    pub error: String,
    /// Optional surrounding context for the supervisor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// What a checkpoint is waiting on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointKind {
    ToolConfirmation {
        tool: String,
        /// Opaque payload; also the pre-approval cache key, verbatim.
        input: Value,
        /// Conversational memory captured when the session suspended.
        conversation: Value,
        /// Modifying operations covered when this is a batch confirmation.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        covers: Vec<String>,
    },
    PlanApproval {
        plan: Value,
    },
    FailureResolution {
        failure: FailureDetails,
    },
}

impl CheckpointKind {
    /// Human-readable prompt shown next to the approval request.
    pub fn prompt(&self) -> String {
        match self {
            CheckpointKind::ToolConfirmation { tool, covers, .. } if !covers.is_empty() => {
                format!(
                    "Approve {} accumulated modifying operations (next: '{}')?",
                    covers.len(),
                    tool
                )
            }
            CheckpointKind::ToolConfirmation { tool, .. } => {
                format!("Allow the agent to run '{tool}'?")
            }
            CheckpointKind::PlanApproval { .. } => "Approve the proposed plan?".to_string(),
            CheckpointKind::FailureResolution { failure } => format!(
                "Step '{}' failed: {}. Retry, skip, or take over manually?",
                failure.step, failure.error
            ),
        }
    }

    fn accepts(&self, decision: &Decision) -> bool {
        matches!(
            (self, decision),
            (CheckpointKind::ToolConfirmation { .. }, Decision::ToolConfirmed(_))
                | (CheckpointKind::PlanApproval { .. }, Decision::PlanApproved(_))
                | (CheckpointKind::FailureResolution { .. }, Decision::FailureResolved(_))
        )
    }
}

/// The supervisor's decision for a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ToolConfirmed(bool),
    PlanApproved(bool),
    FailureResolved(FailureAction),
}

/// A pending checkpoint: what is awaited plus the continuation that
/// resumes the suspended session.
#[derive(Debug)]
struct Checkpoint {
    id: Uuid,
    task_id: Uuid,
    created_at: DateTime<Utc>,
    kind: CheckpointKind,
    resume: oneshot::Sender<Decision>,
}

impl Checkpoint {
    fn view(&self) -> CheckpointView {
        CheckpointView {
            id: self.id,
            task_id: self.task_id,
            created_at: self.created_at,
            prompt: self.kind.prompt(),
            kind: self.kind.clone(),
        }
    }
}

/// Serializable view of a pending checkpoint (no continuation).
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointView {
    pub id: Uuid,
    pub task_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: CheckpointKind,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Unknown id, or a checkpoint that was already processed. Races
    /// with slow or duplicate human responses are expected.
    #[error("checkpoint {0} not found or already processed")]
    NotFound(Uuid),
    /// The reasoning loop must never be re-entered while suspended, so a
    /// second registration for one task is a programming error.
    #[error("task {0} already has a pending checkpoint")]
    AlreadySuspended(Uuid),
    /// The decision does not match the checkpoint kind; the entry is
    /// left pending.
    #[error("checkpoint {0} does not accept this decision kind")]
    KindMismatch(Uuid),
    /// The suspended session is gone; its continuation cannot fire.
    #[error("the task waiting on checkpoint {0} is no longer running")]
    SessionGone(Uuid),
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<Uuid, Checkpoint>,
    by_task: HashMap<Uuid, Uuid>,
}

/// In-memory registry of pending checkpoints, shared by every session in
/// the process and by the HTTP layer that resolves them.
#[derive(Debug, Default)]
pub struct CheckpointRegistry {
    pending: Mutex<Inner>,
}

impl CheckpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pending checkpoint for `task_id` and hand back the
    /// receiver the suspended session parks on.
    pub async fn register(
        &self,
        task_id: Uuid,
        kind: CheckpointKind,
    ) -> Result<(Uuid, oneshot::Receiver<Decision>), CheckpointError> {
        let mut inner = self.pending.lock().await;
        if inner.by_task.contains_key(&task_id) {
            return Err(CheckpointError::AlreadySuspended(task_id));
        }
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        inner.by_task.insert(task_id, id);
        inner.by_id.insert(
            id,
            Checkpoint {
                id,
                task_id,
                created_at: Utc::now(),
                kind,
                resume: tx,
            },
        );
        Ok((id, rx))
    }

    /// Remove the checkpoint and fire its continuation. Of two racing
    /// calls exactly one wins; the loser sees `NotFound`.
    pub async fn resolve(&self, id: Uuid, decision: Decision) -> Result<(), CheckpointError> {
        let mut inner = self.pending.lock().await;
        let Some(found) = inner.by_id.get(&id) else {
            return Err(CheckpointError::NotFound(id));
        };
        if !found.kind.accepts(&decision) {
            return Err(CheckpointError::KindMismatch(id));
        }
        let Some(checkpoint) = inner.by_id.remove(&id) else {
            return Err(CheckpointError::NotFound(id));
        };
        inner.by_task.remove(&checkpoint.task_id);
        drop(inner);

        checkpoint
            .resume
            .send(decision)
            .map_err(|_| CheckpointError::SessionGone(id))
    }

    /// View of the pending checkpoint for a task, if any.
    pub async fn peek_by_task(&self, task_id: Uuid) -> Option<CheckpointView> {
        let inner = self.pending.lock().await;
        let id = inner.by_task.get(&task_id)?;
        inner.by_id.get(id).map(Checkpoint::view)
    }

    /// Number of pending checkpoints across all tasks.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.by_id.len()
    }
}
