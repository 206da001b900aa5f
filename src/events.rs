//! Progress events and the per-task broadcaster.
//!
//! Each task run owns exactly one outbound stream. Events are emitted in
//! the order the reasoning loop produces them; when the client is gone
//! the stream becomes a silent sink - visibility is best-effort, task
//! correctness never depends on it.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::checkpoint::{FailureAction, FailureDetails};

/// Cap on tool output carried in a `tool_result` event. The full output
/// still reaches the reasoning engine and the execution log.
const TOOL_RESULT_DISPLAY_LIMIT: usize = 4000;

/// A structured progress event for one task run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    Log {
        message: String,
    },
    /// The engine chose a tool.
    AgentAction {
        tool: String,
        input: Value,
    },
    /// A tool ran; output truncated for display.
    ToolResult {
        tool: String,
        output: String,
        truncated: bool,
    },
    ConfirmationRequired {
        checkpoint_id: Uuid,
        prompt: String,
        tool: String,
        input: Value,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        covers: Vec<String>,
    },
    PlanApprovalRequired {
        checkpoint_id: Uuid,
        prompt: String,
        plan: Value,
    },
    StepFailureRequiresAction {
        checkpoint_id: Uuid,
        prompt: String,
        failure: FailureDetails,
        actions: Vec<String>,
    },
    Error {
        message: String,
    },
    ExecutionComplete {
        answer: String,
    },
}

impl TaskEvent {
    /// SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            TaskEvent::Log { .. } => "log",
            TaskEvent::AgentAction { .. } => "agent_action",
            TaskEvent::ToolResult { .. } => "tool_result",
            TaskEvent::ConfirmationRequired { .. } => "confirmation_required",
            TaskEvent::PlanApprovalRequired { .. } => "plan_approval_required",
            TaskEvent::StepFailureRequiresAction { .. } => "step_failure_requires_action",
            TaskEvent::Error { .. } => "error",
            TaskEvent::ExecutionComplete { .. } => "execution_complete",
        }
    }

    /// Build a display-truncated `tool_result` event.
    pub fn tool_result(tool: &str, output: &str) -> Self {
        let (display, truncated) = truncate_for_display(output, TOOL_RESULT_DISPLAY_LIMIT);
        TaskEvent::ToolResult {
            tool: tool.to_string(),
            output: display,
            truncated,
        }
    }

    /// The available recovery actions, as announced on failure events.
    pub fn failure_actions() -> Vec<String> {
        FailureAction::ALL.iter().map(|a| a.label().to_string()).collect()
    }
}

/// Truncate at a char boundary at or below `limit` bytes.
pub(crate) fn truncate_for_display(text: &str, limit: usize) -> (String, bool) {
    if text.len() <= limit {
        return (text.to_string(), false);
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (format!("{}... [truncated]", &text[..end]), true)
}

/// Wraps the single outbound stream for one task run.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    task_id: Uuid,
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl EventBroadcaster {
    /// Create the broadcaster and the receiving end the stream handler
    /// drains. The channel preserves emission order.
    pub fn channel(task_id: Uuid) -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { task_id, tx }, rx)
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Emit one event. A no-op once the stream is gone.
    pub fn emit(&self, event: TaskEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(task_id = %self.task_id, "event stream closed; dropping event");
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(TaskEvent::Log {
            message: message.into(),
        });
    }

    pub fn is_writable(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let (events, mut rx) = EventBroadcaster::channel(Uuid::new_v4());
        events.log("one");
        events.emit(TaskEvent::AgentAction {
            tool: "read_file".to_string(),
            input: json!({"path": "a.txt"}),
        });
        events.log("two");

        assert!(matches!(rx.recv().await.unwrap(), TaskEvent::Log { message } if message == "one"));
        assert!(matches!(rx.recv().await.unwrap(), TaskEvent::AgentAction { .. }));
        assert!(matches!(rx.recv().await.unwrap(), TaskEvent::Log { message } if message == "two"));
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_noop() {
        let (events, rx) = EventBroadcaster::channel(Uuid::new_v4());
        assert!(events.is_writable());
        drop(rx);
        assert!(!events.is_writable());
        // Must not panic or error.
        events.log("into the void");
    }

    #[test]
    fn test_tool_result_truncation() {
        let short = TaskEvent::tool_result("read_file", "ok");
        assert!(matches!(short, TaskEvent::ToolResult { truncated: false, .. }));

        let long = "x".repeat(TOOL_RESULT_DISPLAY_LIMIT + 1);
        match TaskEvent::tool_result("read_file", &long) {
            TaskEvent::ToolResult { output, truncated, .. } => {
                assert!(truncated);
                assert!(output.ends_with("[truncated]"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // A multi-byte character straddling the limit must not split.
        let text = format!("{}é", "a".repeat(TOOL_RESULT_DISPLAY_LIMIT - 1));
        let (out, truncated) = truncate_for_display(&text, TOOL_RESULT_DISPLAY_LIMIT);
        assert!(truncated);
        assert!(out.is_char_boundary(out.len()));
    }

    #[test]
    fn test_event_names() {
        let event = TaskEvent::ExecutionComplete {
            answer: "done".to_string(),
        };
        assert_eq!(event.event_name(), "execution_complete");
        assert_eq!(
            TaskEvent::Log { message: String::new() }.event_name(),
            "log"
        );
    }
}
