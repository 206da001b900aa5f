//! Task sessions: the per-task state machine driving the reasoning loop.
//!
//! A session owns one reasoning-engine instance, one execution log, and
//! one outbound event stream for the task's lifetime. The loop takes one
//! engine step at a time; a gated step does not execute - the session
//! registers a checkpoint and parks on its continuation until an
//! approval endpoint resolves it. Suspension is structural: nothing is
//! unwound or replayed, the loop simply waits and then re-enters the
//! engine with a synthetic observation.

mod log;
mod resume;

pub use log::ExecutionLog;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::checkpoint::{
    CheckpointError, CheckpointKind, CheckpointRegistry, Decision, FailureDetails,
};
use crate::engine::{EngineInput, EngineStep, ReasoningEngine};
use crate::events::{EventBroadcaster, TaskEvent};
use crate::gate::{self, GateEvaluator};
use crate::tools::ToolRegistry;

/// Lifecycle states of a task session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    SuspendedOnTool,
    SuspendedOnPlan,
    SuspendedOnFailure,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// Externally visible status of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub result: Option<String>,
}

pub type SharedStatus = Arc<RwLock<SessionStatus>>;

/// Hard failures that terminate a session. Suspension never appears
/// here - it is ordinary control flow.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("reasoning engine error: {0}")]
    Engine(#[source] anyhow::Error),
    #[error(transparent)]
    Registry(#[from] CheckpointError),
    #[error("checkpoint continuation dropped before resolution")]
    CheckpointDropped,
    #[error("checkpoint resolved with a mismatched decision kind")]
    DecisionMismatch,
    #[error("no completion after {0} engine steps")]
    StepLimit(usize),
}

/// Shared collaborators and limits a session runs against.
#[derive(Clone)]
pub struct SessionContext {
    pub tools: Arc<ToolRegistry>,
    pub registry: Arc<CheckpointRegistry>,
    pub working_dir: PathBuf,
    pub audit_dir: PathBuf,
    pub max_steps: usize,
    pub batch_threshold: usize,
}

/// The per-task state machine.
pub struct TaskSession {
    task_id: Uuid,
    description: String,
    safety_mode: bool,
    model: Option<String>,
    engine: Box<dyn ReasoningEngine>,
    gate: GateEvaluator,
    ctx: SessionContext,
    events: EventBroadcaster,
    log: ExecutionLog,
    status: SharedStatus,
}

impl TaskSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: Uuid,
        description: String,
        safety_mode: bool,
        model: Option<String>,
        engine: Box<dyn ReasoningEngine>,
        ctx: SessionContext,
        events: EventBroadcaster,
        log: ExecutionLog,
    ) -> Self {
        let gate = GateEvaluator::new(ctx.batch_threshold);
        let status = Arc::new(RwLock::new(SessionStatus {
            state: SessionState::Running,
            result: None,
        }));
        Self {
            task_id,
            description,
            safety_mode,
            model,
            engine,
            gate,
            ctx,
            events,
            log,
            status,
        }
    }

    /// Handle for observing the session's state from outside.
    pub fn status_handle(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    /// Drive the task to a terminal state. Consumes the session; the
    /// execution log is flushed for audit regardless of outcome.
    pub async fn run(mut self) {
        self.log.append(format!("task started: {}", self.description));
        if let Some(model) = &self.model {
            self.log.append(format!("model: {model}"));
        }

        match self.drive().await {
            Ok(answer) => {
                self.log.append("task completed");
                self.set_state(SessionState::Completed, Some(answer.clone())).await;
                self.events.emit(TaskEvent::ExecutionComplete { answer });
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(task_id = %self.task_id, error = %message, "task failed");
                self.log.append(format!("task failed: {message}"));
                self.set_state(SessionState::Failed, Some(message.clone())).await;
                self.events.emit(TaskEvent::Error { message });
            }
        }

        if let Err(err) = self.log.flush_to(&self.ctx.audit_dir, self.task_id).await {
            tracing::warn!(task_id = %self.task_id, error = %err, "could not write audit log");
        }
    }

    async fn drive(&mut self) -> Result<String, SessionError> {
        let mut input = EngineInput::Task(self.description.clone());
        for _ in 0..self.ctx.max_steps {
            let step = self
                .engine
                .next_step(input)
                .await
                .map_err(SessionError::Engine)?;

            input = match step {
                EngineStep::Finish { answer } => return Ok(answer),
                EngineStep::ToolCall { tool, input: args } => {
                    self.on_tool_call(tool, args).await?
                }
                EngineStep::ProposePlan { plan } => self.on_plan(plan).await?,
                EngineStep::ReportFailure { failure } => self.on_failure(failure).await?,
            };
        }
        Err(SessionError::StepLimit(self.ctx.max_steps))
    }

    async fn on_tool_call(&mut self, tool: String, args: Value) -> Result<EngineInput, SessionError> {
        self.events.emit(TaskEvent::AgentAction {
            tool: tool.clone(),
            input: args.clone(),
        });
        self.log.append(format!("agent action: {tool} {args}"));

        if self.gate.should_gate(&tool, &args, self.safety_mode) {
            let kind = CheckpointKind::ToolConfirmation {
                tool: tool.clone(),
                input: args.clone(),
                conversation: self.engine.conversation_snapshot(),
                covers: Vec::new(),
            };
            let decision = self.suspend(kind, SessionState::SuspendedOnTool).await?;
            let confirmed = match decision {
                Decision::ToolConfirmed(confirmed) => confirmed,
                _ => return Err(SessionError::DecisionMismatch),
            };
            if confirmed {
                self.gate.approve(&tool, &args);
                self.log.append(format!("supervisor approved '{tool}'"));
                Ok(EngineInput::Observation(self.execute_tool(&tool, &args).await))
            } else {
                self.log.append(format!("supervisor denied '{tool}'"));
                Ok(EngineInput::Observation(resume::denial_observation(&tool, &args)))
            }
        } else if self.safety_mode && gate::is_mutating(&tool) && self.gate.batch_due() {
            // Pre-approved calls still pause once enough modifications
            // have accumulated since the last batch review.
            let covers = self.gate.covered_ops();
            let kind = CheckpointKind::ToolConfirmation {
                tool: tool.clone(),
                input: args.clone(),
                conversation: self.engine.conversation_snapshot(),
                covers: covers.clone(),
            };
            let decision = self.suspend(kind, SessionState::SuspendedOnTool).await?;
            self.gate.reset_batch();
            let confirmed = match decision {
                Decision::ToolConfirmed(confirmed) => confirmed,
                _ => return Err(SessionError::DecisionMismatch),
            };
            if confirmed {
                self.log
                    .append(format!("supervisor approved batch of {} operations", covers.len()));
                Ok(EngineInput::Observation(self.execute_tool(&tool, &args).await))
            } else {
                self.log.append("supervisor denied batch of modifying operations");
                Ok(EngineInput::Observation(resume::batch_denial_observation(
                    &tool,
                    covers.len(),
                )))
            }
        } else {
            Ok(EngineInput::Observation(self.execute_tool(&tool, &args).await))
        }
    }

    /// Execute a tool and produce the observation for the engine. Tool
    /// errors become failure-prefixed observations, never session
    /// failures - the engine decides what to do next.
    async fn execute_tool(&mut self, tool: &str, args: &Value) -> String {
        match self
            .ctx
            .tools
            .execute(tool, args.clone(), &self.ctx.working_dir)
            .await
        {
            Ok(output) => {
                if self.safety_mode && gate::is_mutating(tool) {
                    let count = self.gate.record_modifying_op(format!("{tool} {args}"));
                    tracing::debug!(task_id = %self.task_id, tool, count, "modifying operation recorded");
                }
                self.events.emit(TaskEvent::tool_result(tool, &output));
                self.log.append(format!("tool result ({tool}): {output}"));
                resume::tool_result_observation(tool, &output)
            }
            Err(err) => {
                let message = err.to_string();
                self.events.emit(TaskEvent::tool_result(tool, &format!("Error: {message}")));
                self.log.append(format!("tool error ({tool}): {message}"));
                resume::tool_failure_observation(tool, &message)
            }
        }
    }

    async fn on_plan(&mut self, plan: Value) -> Result<EngineInput, SessionError> {
        self.log.append(format!("plan proposed: {plan}"));
        let decision = self
            .suspend(CheckpointKind::PlanApproval { plan }, SessionState::SuspendedOnPlan)
            .await?;
        let approved = match decision {
            Decision::PlanApproved(approved) => approved,
            _ => return Err(SessionError::DecisionMismatch),
        };
        self.log.append(if approved { "plan approved" } else { "plan declined" });
        Ok(EngineInput::Observation(resume::plan_observation(approved)))
    }

    async fn on_failure(&mut self, failure: FailureDetails) -> Result<EngineInput, SessionError> {
        self.log
            .append(format!("step failure reported: {} ({})", failure.step, failure.error));
        let step = failure.step.clone();
        let decision = self
            .suspend(
                CheckpointKind::FailureResolution { failure },
                SessionState::SuspendedOnFailure,
            )
            .await?;
        let action = match decision {
            Decision::FailureResolved(action) => action,
            _ => return Err(SessionError::DecisionMismatch),
        };
        self.log.append(format!("supervisor chose to {} step '{step}'", action.label()));
        Ok(EngineInput::Observation(resume::failure_observation(action, &step)))
    }

    /// Register a checkpoint, announce it, and park until the supervisor
    /// resolves it. Suspending is not an error; only registry
    /// inconsistencies are.
    async fn suspend(
        &mut self,
        kind: CheckpointKind,
        state: SessionState,
    ) -> Result<Decision, SessionError> {
        let (checkpoint_id, resolution) =
            self.ctx.registry.register(self.task_id, kind.clone()).await?;
        self.set_state(state, None).await;
        self.events.emit(announcement_event(checkpoint_id, &kind));
        self.log.append(format!("suspended on checkpoint {checkpoint_id}"));
        tracing::info!(task_id = %self.task_id, %checkpoint_id, ?state, "session suspended");

        let decision = resolution.await.map_err(|_| SessionError::CheckpointDropped)?;

        self.set_state(SessionState::Running, None).await;
        self.log.append(format!("checkpoint {checkpoint_id} resolved"));
        Ok(decision)
    }

    async fn set_state(&self, state: SessionState, result: Option<String>) {
        let mut status = self.status.write().await;
        status.state = state;
        if result.is_some() {
            status.result = result;
        }
    }
}

/// Event announcing a fresh checkpoint on the stream.
fn announcement_event(checkpoint_id: Uuid, kind: &CheckpointKind) -> TaskEvent {
    match kind {
        CheckpointKind::ToolConfirmation { tool, input, covers, .. } => {
            TaskEvent::ConfirmationRequired {
                checkpoint_id,
                prompt: kind.prompt(),
                tool: tool.clone(),
                input: input.clone(),
                covers: covers.clone(),
            }
        }
        CheckpointKind::PlanApproval { plan } => TaskEvent::PlanApprovalRequired {
            checkpoint_id,
            prompt: kind.prompt(),
            plan: plan.clone(),
        },
        CheckpointKind::FailureResolution { failure } => TaskEvent::StepFailureRequiresAction {
            checkpoint_id,
            prompt: kind.prompt(),
            failure: failure.clone(),
            actions: TaskEvent::failure_actions(),
        },
    }
}
