//! HTTP route handlers and server assembly.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::checkpoint::CheckpointRegistry;
use crate::config::Config;
use crate::engine::EngineFactory;
use crate::events::{EventBroadcaster, TaskEvent};
use crate::session::{ExecutionLog, SessionContext, SharedStatus, TaskSession};
use crate::tools::ToolRegistry;

use super::approvals;
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub engines: Arc<dyn EngineFactory>,
    pub tools: Arc<ToolRegistry>,
    pub registry: Arc<CheckpointRegistry>,
    pub tasks: RwLock<HashMap<Uuid, TaskEntry>>,
}

/// Book-keeping for one task, kept after the session ends so finished
/// runs stay inspectable.
pub struct TaskEntry {
    pub description: String,
    pub safety_mode: bool,
    pub model: Option<String>,
    pub status: SharedStatus,
    pub log: ExecutionLog,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, engines: Arc<dyn EngineFactory>) -> Self {
        Self {
            config,
            engines,
            tools: Arc::new(ToolRegistry::new()),
            registry: Arc::new(CheckpointRegistry::new()),
            tasks: RwLock::new(HashMap::new()),
        }
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/task", post(start_task))
        .route("/api/task/:id", get(get_task))
        .route("/api/tasks", get(list_tasks))
        // Checkpoint resolution endpoints
        .route("/api/checkpoint/:id/confirm", post(approvals::confirm_tool))
        .route("/api/checkpoint/:id/plan/approve", post(approvals::approve_plan))
        .route("/api/checkpoint/:id/plan/decline", post(approvals::decline_plan))
        .route("/api/checkpoint/:id/step/retry", post(approvals::retry_step))
        .route("/api/checkpoint/:id/step/skip", post(approvals::skip_step))
        .route("/api/checkpoint/:id/step/manual", post(approvals::manual_step))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server with the given engine factory.
pub async fn serve(config: Config, engines: Arc<dyn EngineFactory>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, engines));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wait for SIGTERM/SIGINT. Pending checkpoints are process-local and
/// die with us, orphaning their tasks.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received; suspended tasks are orphaned");
}

/// Create the session for a task and spawn its driver; returns the task
/// id and the receiving end of its event stream. Used by `start_task`
/// and exercised directly by tests.
pub async fn spawn_task(
    state: &Arc<AppState>,
    req: StartTaskRequest,
) -> (Uuid, mpsc::UnboundedReceiver<TaskEvent>) {
    let task_id = Uuid::new_v4();
    let model = req.model.or_else(|| state.config.default_model.clone());
    let (events, rx) = EventBroadcaster::channel(task_id);
    let log = ExecutionLog::new();
    let engine = state.engines.create(model.as_deref());

    let ctx = SessionContext {
        tools: Arc::clone(&state.tools),
        registry: Arc::clone(&state.registry),
        working_dir: state.config.workspace_path.clone(),
        audit_dir: state.config.audit_dir.clone(),
        max_steps: state.config.max_steps,
        batch_threshold: state.config.batch_approval_threshold,
    };
    let session = TaskSession::new(
        task_id,
        req.description.clone(),
        req.safety_mode,
        model.clone(),
        engine,
        ctx,
        events,
        log.clone(),
    );
    let status = session.status_handle();

    state.tasks.write().await.insert(
        task_id,
        TaskEntry {
            description: req.description,
            safety_mode: req.safety_mode,
            model,
            status,
            log,
            started_at: Utc::now(),
        },
    );

    tracing::info!(%task_id, "task accepted");
    tokio::spawn(session.run());
    (task_id, rx)
}

/// Envelope adding the task id to every streamed event.
#[derive(Serialize)]
struct EventEnvelope<'a> {
    task_id: Uuid,
    #[serde(flatten)]
    event: &'a TaskEvent,
}

/// Start a task and stream its progress events (SSE).
///
/// The stream stays open while the task is suspended on a checkpoint;
/// keep-alive comments prevent idle proxies from cutting it. It closes
/// after `execution_complete` or `error`.
async fn start_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartTaskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, (StatusCode, String)>
{
    if req.description.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "description is required".to_string()));
    }

    let (task_id, mut rx) = spawn_task(&state, req).await;

    let stream = async_stream::stream! {
        let accepted = TaskEvent::Log {
            message: format!("task {task_id} accepted"),
        };
        yield Ok(Event::default()
            .event(accepted.event_name())
            .json_data(EventEnvelope { task_id, event: &accepted })
            .unwrap());

        while let Some(event) = rx.recv().await {
            let sse = Event::default()
                .event(event.event_name())
                .json_data(EventEnvelope { task_id, event: &event })
                .unwrap();
            yield Ok(sse);
        }
        // Sender dropped: the session reached a terminal state.
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keepalive"),
    ))
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_steps: state.config.max_steps,
        batch_approval_threshold: state.config.batch_approval_threshold,
        pending_checkpoints: state.registry.pending_count().await,
    })
}

async fn task_view(state: &Arc<AppState>, id: Uuid, entry: &TaskEntry) -> TaskView {
    let status = entry.status.read().await.clone();
    TaskView {
        id,
        description: entry.description.clone(),
        safety_mode: entry.safety_mode,
        model: entry.model.clone(),
        state: status.state,
        result: status.result,
        pending_checkpoint: state.registry.peek_by_task(id).await,
        log: entry.log.lines(),
    }
}

/// Get one task: state, result, pending checkpoint, and log so far.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskView>, (StatusCode, String)> {
    let tasks = state.tasks.read().await;
    let entry = tasks
        .get(&id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Task {} not found", id)))?;
    Ok(Json(task_view(&state, id, entry).await))
}

/// List all tasks, newest first.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskView>> {
    let tasks = state.tasks.read().await;
    let mut entries: Vec<(&Uuid, &TaskEntry)> = tasks.iter().collect();
    entries.sort_by(|a, b| b.1.started_at.cmp(&a.1.started_at));

    let mut views = Vec::with_capacity(entries.len());
    for (id, entry) in entries {
        views.push(task_view(&state, *id, entry).await);
    }
    Json(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scripted::ScriptedEngineFactory;
    use crate::engine::EngineStep;
    use crate::session::SessionState;
    use serde_json::json;
    use std::time::Duration;

    fn test_state(steps: Vec<EngineStep>, workspace: &std::path::Path) -> Arc<AppState> {
        let config = Config::for_workspace(workspace.to_path_buf());
        Arc::new(AppState::new(config, Arc::new(ScriptedEngineFactory::new(steps))))
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TaskEvent>) -> TaskEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed early")
    }

    fn write_script() -> Vec<EngineStep> {
        vec![
            EngineStep::ToolCall {
                tool: "write_file".to_string(),
                input: json!({"path": "out.txt", "content": "hello"}),
            },
            EngineStep::Finish {
                answer: "done".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_confirm_unknown_checkpoint_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![], dir.path());

        let result = approvals::confirm_tool(
            State(Arc::clone(&state)),
            Path(Uuid::new_v4()),
            Json(ConfirmToolRequest { confirmed: true }),
        )
        .await;

        let (status, _body) = result.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_start_confirm_inspect_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(write_script(), dir.path());

        let (task_id, mut rx) = spawn_task(
            &state,
            StartTaskRequest {
                description: "create out.txt".to_string(),
                safety_mode: true,
                model: None,
            },
        )
        .await;

        assert!(matches!(next_event(&mut rx).await, TaskEvent::AgentAction { .. }));
        let checkpoint_id = match next_event(&mut rx).await {
            TaskEvent::ConfirmationRequired { checkpoint_id, .. } => checkpoint_id,
            other => panic!("expected confirmation, got {other:?}"),
        };

        // While suspended, the task view reports the pending checkpoint.
        let view = get_task(State(Arc::clone(&state)), Path(task_id)).await.unwrap();
        assert_eq!(view.0.state, SessionState::SuspendedOnTool);
        assert_eq!(view.0.pending_checkpoint.as_ref().unwrap().id, checkpoint_id);

        approvals::confirm_tool(
            State(Arc::clone(&state)),
            Path(checkpoint_id),
            Json(ConfirmToolRequest { confirmed: true }),
        )
        .await
        .unwrap();

        assert!(matches!(next_event(&mut rx).await, TaskEvent::ToolResult { .. }));
        assert!(matches!(next_event(&mut rx).await, TaskEvent::ExecutionComplete { .. }));
        assert!(dir.path().join("out.txt").exists());

        // Stream closes after the terminal event.
        assert!(tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .is_none());

        let view = get_task(State(Arc::clone(&state)), Path(task_id)).await.unwrap();
        assert_eq!(view.0.state, SessionState::Completed);
        assert!(view.0.pending_checkpoint.is_none());
        assert!(!view.0.log.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_resolution_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(write_script(), dir.path());

        let (_task_id, mut rx) = spawn_task(
            &state,
            StartTaskRequest {
                description: "create out.txt".to_string(),
                safety_mode: true,
                model: None,
            },
        )
        .await;

        assert!(matches!(next_event(&mut rx).await, TaskEvent::AgentAction { .. }));
        let checkpoint_id = match next_event(&mut rx).await {
            TaskEvent::ConfirmationRequired { checkpoint_id, .. } => checkpoint_id,
            other => panic!("expected confirmation, got {other:?}"),
        };

        approvals::confirm_tool(
            State(Arc::clone(&state)),
            Path(checkpoint_id),
            Json(ConfirmToolRequest { confirmed: true }),
        )
        .await
        .unwrap();

        let second = approvals::confirm_tool(
            State(Arc::clone(&state)),
            Path(checkpoint_id),
            Json(ConfirmToolRequest { confirmed: false }),
        )
        .await;
        assert_eq!(second.unwrap_err().0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_kind_resolution_leaves_checkpoint_pending() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(write_script(), dir.path());

        let (task_id, mut rx) = spawn_task(
            &state,
            StartTaskRequest {
                description: "create out.txt".to_string(),
                safety_mode: true,
                model: None,
            },
        )
        .await;

        assert!(matches!(next_event(&mut rx).await, TaskEvent::AgentAction { .. }));
        let checkpoint_id = match next_event(&mut rx).await {
            TaskEvent::ConfirmationRequired { checkpoint_id, .. } => checkpoint_id,
            other => panic!("expected confirmation, got {other:?}"),
        };

        // A plan decision cannot resolve a tool confirmation.
        let wrong = approvals::approve_plan(State(Arc::clone(&state)), Path(checkpoint_id)).await;
        assert_eq!(wrong.unwrap_err().0, StatusCode::NOT_FOUND);
        assert!(state.registry.peek_by_task(task_id).await.is_some());

        // The right decision still works afterwards.
        approvals::confirm_tool(
            State(Arc::clone(&state)),
            Path(checkpoint_id),
            Json(ConfirmToolRequest { confirmed: false }),
        )
        .await
        .unwrap();
        assert!(matches!(next_event(&mut rx).await, TaskEvent::ExecutionComplete { .. }));
    }

    #[tokio::test]
    async fn test_health_reports_limits() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![], dir.path());

        let health = health(State(state)).await;
        assert_eq!(health.0.status, "ok");
        assert_eq!(health.0.batch_approval_threshold, 10);
        assert_eq!(health.0.pending_checkpoints, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_task_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![], dir.path());
        let result = get_task(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(result.unwrap_err().0, StatusCode::NOT_FOUND);
    }
}
