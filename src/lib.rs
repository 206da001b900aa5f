//! # warden
//!
//! Human-in-the-loop orchestrator for autonomous agent tasks.
//!
//! A task runs as a live stream of progress events. Every tool call the
//! reasoning engine proposes passes through a gate; gated calls suspend
//! the task on a checkpoint until a supervisor resolves it out of band,
//! after which the same session resumes with a synthetic observation.
//! Three checkpoint kinds exist: single-tool confirmation (including
//! batch confirmations covering several modifying operations),
//! whole-plan approval, and step-failure recovery.
//!
//! ## Task Flow
//! 1. `POST /api/task` creates a session and streams its events (SSE)
//! 2. Gated tool calls raise checkpoints (`confirmation_required`,
//!    `plan_approval_required`, `step_failure_requires_action`)
//! 3. `POST /api/checkpoint/:id/...` resolves them; the stream resumes
//! 4. The session ends with `execution_complete` or `error`, and its
//!    log is flushed for audit
//!
//! Suspension is structural, not stack suspension: the driving loop
//! parks on the checkpoint's continuation and re-enters the reasoning
//! engine with a synthetic observation, relying on the engine's own
//! memory for context. Checkpoints are process-local; a restart orphans
//! suspended tasks.
//!
//! ## Modules
//! - `session`: per-task state machine and resumption
//! - `checkpoint`: pending-approval registry
//! - `gate`: approval policy and batch counting
//! - `engine`: reasoning-engine boundary and the scripted replay engine
//! - `events`: progress events and per-task broadcasting
//! - `tools`: tool trait, registry, and built-in workspace tools
//! - `api`: HTTP surface

pub mod api;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod events;
pub mod gate;
pub mod session;
pub mod tools;

pub use config::Config;
