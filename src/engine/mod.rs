//! Reasoning-engine boundary.
//!
//! The engine picks tools and produces the final answer; this crate only
//! drives it. A session owns exactly one engine instance for the task's
//! lifetime and re-enters it with a synthetic observation after every
//! tool result or supervisor decision. Context is reconstructed from the
//! engine's own conversational memory - prior tool executions are never
//! rewound or replayed.

pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checkpoint::FailureDetails;

/// Input fed to the engine on each entry: the task description first,
/// then one observation per completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineInput {
    Task(String),
    Observation(String),
}

impl EngineInput {
    pub fn text(&self) -> &str {
        match self {
            EngineInput::Task(text) | EngineInput::Observation(text) => text,
        }
    }
}

/// One step proposed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStep {
    /// Invoke a tool with the given input payload.
    ToolCall { tool: String, input: Value },
    /// Propose a plan and wait for supervisor approval before going on.
    ProposePlan { plan: Value },
    /// Report a failed step and wait for a recovery choice.
    ReportFailure { failure: FailureDetails },
    /// Finish the task with the final answer.
    Finish { answer: String },
}

/// A tool-selecting reasoning engine.
///
/// Implementations own their conversational memory; the orchestrator
/// never inspects it beyond the opaque snapshot captured into
/// checkpoints.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Feed the next input and get the engine's next step.
    async fn next_step(&mut self, input: EngineInput) -> anyhow::Result<EngineStep>;

    /// Opaque snapshot of the conversational memory, captured when the
    /// session suspends on a tool confirmation.
    fn conversation_snapshot(&self) -> Value {
        Value::Null
    }
}

/// Produces one engine instance per task.
pub trait EngineFactory: Send + Sync {
    fn create(&self, model: Option<&str>) -> Box<dyn ReasoningEngine>;
}
