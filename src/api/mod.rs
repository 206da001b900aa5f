//! HTTP API surface.
//!
//! Two halves: the streaming task lifecycle (`POST /api/task` returns
//! the task's SSE event stream) and the request/response checkpoint
//! resolution endpoints that wake suspended sessions.

mod approvals;
mod routes;
mod types;

pub use routes::{router, serve, spawn_task, AppState, TaskEntry};
pub use types::{
    ConfirmToolRequest, HealthResponse, ResolutionAck, StartTaskRequest, TaskView,
};
