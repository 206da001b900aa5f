//! Resumption driver: turns supervisor decisions and tool outcomes into
//! the synthetic observations that re-enter the reasoning engine.
//!
//! Resumption is replay-with-synthetic-input: the engine's own memory
//! carries the context, so all that gets reconstructed here is the next
//! input message.

use serde_json::Value;

use crate::checkpoint::FailureAction;

/// Observation for a tool that ran, gated or not.
pub(crate) fn tool_result_observation(tool: &str, output: &str) -> String {
    format!("Tool '{tool}' output:\n{output}")
}

/// Observation for a tool invocation that errored. The engine decides
/// whether to retry, pick another tool, or give up.
pub(crate) fn tool_failure_observation(tool: &str, error: &str) -> String {
    format!("Tool '{tool}' failed: {error}")
}

/// Denial observation. Instructs the engine not to retry the identical
/// action and to re-plan instead.
pub(crate) fn denial_observation(tool: &str, input: &Value) -> String {
    format!(
        "The supervisor denied the '{tool}' action with input {input}. \
         Do not retry this exact action. Re-plan: choose a different \
         approach or finish with what you have."
    )
}

/// Denial of a batch confirmation covering several modifying operations.
pub(crate) fn batch_denial_observation(tool: &str, covered: usize) -> String {
    format!(
        "The supervisor reviewed the last {covered} modifying operations and \
         denied further changes; the pending '{tool}' action was not executed. \
         Do not retry this exact action. Re-plan or finish with what you have."
    )
}

pub(crate) fn plan_observation(approved: bool) -> String {
    if approved {
        "The supervisor approved the proposed plan. Proceed with execution.".to_string()
    } else {
        "The supervisor declined the proposed plan. Revise the plan or finish \
         with what you have."
            .to_string()
    }
}

pub(crate) fn failure_observation(action: FailureAction, step: &str) -> String {
    match action {
        FailureAction::Retry => {
            format!("The supervisor chose to retry step '{step}'. Attempt it again.")
        }
        FailureAction::Skip => {
            format!("The supervisor chose to skip step '{step}'. Continue with the next step.")
        }
        FailureAction::Manual => format!(
            "The supervisor will handle step '{step}' manually. Treat it as done and continue."
        ),
    }
}
