//! Checkpoint resolution endpoints.
//!
//! Out-of-band counterpart to the task event stream: each endpoint looks
//! up a pending checkpoint, removes it, and fires its continuation. The
//! response only acknowledges receipt - continued progress appears on
//! the original task's stream when it is still writable, and the task
//! proceeds regardless when it is not.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::checkpoint::{CheckpointError, Decision, FailureAction};

use super::routes::AppState;
use super::types::{ConfirmToolRequest, ResolutionAck};

fn map_error(err: CheckpointError) -> (StatusCode, String) {
    let status = match err {
        // Unknown, already processed, or mismatched-kind ids all answer
        // 404; the caller cannot distinguish a stale id from a wrong one.
        CheckpointError::NotFound(_) | CheckpointError::KindMismatch(_) => StatusCode::NOT_FOUND,
        CheckpointError::SessionGone(_) | CheckpointError::AlreadySuspended(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

async fn resolve(
    state: &Arc<AppState>,
    id: Uuid,
    decision: Decision,
) -> Result<Json<ResolutionAck>, (StatusCode, String)> {
    state.registry.resolve(id, decision).await.map_err(map_error)?;
    tracing::info!(checkpoint_id = %id, ?decision, "checkpoint resolved");
    Ok(Json(ResolutionAck {
        ok: true,
        checkpoint_id: id,
    }))
}

/// Approve or deny a pending tool confirmation.
pub async fn confirm_tool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmToolRequest>,
) -> Result<Json<ResolutionAck>, (StatusCode, String)> {
    resolve(&state, id, Decision::ToolConfirmed(req.confirmed)).await
}

/// Approve a proposed plan.
pub async fn approve_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolutionAck>, (StatusCode, String)> {
    resolve(&state, id, Decision::PlanApproved(true)).await
}

/// Decline a proposed plan.
pub async fn decline_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolutionAck>, (StatusCode, String)> {
    resolve(&state, id, Decision::PlanApproved(false)).await
}

/// Retry the failed step.
pub async fn retry_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolutionAck>, (StatusCode, String)> {
    resolve(&state, id, Decision::FailureResolved(FailureAction::Retry)).await
}

/// Skip the failed step.
pub async fn skip_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolutionAck>, (StatusCode, String)> {
    resolve(&state, id, Decision::FailureResolved(FailureAction::Skip)).await
}

/// Convert the failed step to manual handling.
pub async fn manual_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolutionAck>, (StatusCode, String)> {
    resolve(&state, id, Decision::FailureResolved(FailureAction::Manual)).await
}
