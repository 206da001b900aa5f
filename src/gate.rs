//! Action gating policy.
//!
//! Decides which tool calls must be approved by a human supervisor
//! before they run, remembers approvals already granted within a task,
//! and counts modifying operations so that long runs of pre-approved
//! writes still surface a periodic batch confirmation.

use std::collections::HashSet;

use serde_json::Value;

/// Tool names that mutate state. Classification is keyed on names so the
/// policy holds even for tools not installed in this process.
const MUTATING_TOOLS: &[&str] = &[
    "write_file",
    "delete_file",
    "create_directory",
    "delete_directory",
    "git_commit",
    "git_push",
    "git_pull",
    "git_revert",
    "generate_code",
];

/// Whether a tool mutates state. Read-only tools (list/read) never gate.
pub fn is_mutating(tool_name: &str) -> bool {
    MUTATING_TOOLS.contains(&tool_name)
}

/// Cache key for an approved `(tool, input)` pair: exact match on the
/// serialized input. serde_json keeps object keys sorted, so key-order
/// variants of the same input collapse to one key.
fn approval_key(tool_name: &str, input: &Value) -> String {
    format!("{tool_name}:{input}")
}

/// Per-task gating state: the pre-approval cache plus the modifying
/// operation counter that drives batch checkpoints.
#[derive(Debug)]
pub struct GateEvaluator {
    batch_threshold: usize,
    counter: usize,
    recent_ops: Vec<String>,
    approved: HashSet<String>,
}

impl GateEvaluator {
    /// A threshold of `0` disables batch checkpoints.
    pub fn new(batch_threshold: usize) -> Self {
        Self {
            batch_threshold,
            counter: 0,
            recent_ops: Vec::new(),
            approved: HashSet::new(),
        }
    }

    /// Whether this call must wait for supervisor confirmation.
    pub fn should_gate(&self, tool_name: &str, input: &Value, safety_mode: bool) -> bool {
        if !safety_mode {
            return false;
        }
        if self.is_pre_approved(tool_name, input) {
            return false;
        }
        is_mutating(tool_name)
    }

    pub fn is_pre_approved(&self, tool_name: &str, input: &Value) -> bool {
        self.approved.contains(&approval_key(tool_name, input))
    }

    /// Remember a supervisor-approved `(tool, input)` pair.
    pub fn approve(&mut self, tool_name: &str, input: &Value) {
        self.approved.insert(approval_key(tool_name, input));
    }

    /// Record one executed modifying operation; returns the running
    /// count since the last batch checkpoint.
    pub fn record_modifying_op(&mut self, description: impl Into<String>) -> usize {
        self.counter += 1;
        self.recent_ops.push(description.into());
        self.counter
    }

    /// True once enough modifying operations have accumulated that the
    /// next one must wait for a batch confirmation.
    pub fn batch_due(&self) -> bool {
        self.batch_threshold > 0 && self.counter >= self.batch_threshold
    }

    /// The operations a batch checkpoint would cover.
    pub fn covered_ops(&self) -> Vec<String> {
        self.recent_ops.clone()
    }

    /// Reset after a batch checkpoint resolves (approved or denied).
    pub fn reset_batch(&mut self) {
        self.counter = 0;
        self.recent_ops.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_only_tools_never_gate() {
        let gate = GateEvaluator::new(10);
        for tool in ["read_file", "list_directory", "search_files", "git_status", "git_log"] {
            assert!(!gate.should_gate(tool, &json!({}), true), "{tool} should not gate");
        }
    }

    #[test]
    fn test_mutating_tools_gate_in_safety_mode() {
        let gate = GateEvaluator::new(10);
        for tool in ["write_file", "delete_file", "git_commit", "git_push", "generate_code"] {
            assert!(gate.should_gate(tool, &json!({"path": "x"}), true), "{tool} should gate");
        }
    }

    #[test]
    fn test_safety_mode_off_never_gates() {
        let gate = GateEvaluator::new(10);
        assert!(!gate.should_gate("delete_file", &json!({"path": "x"}), false));
    }

    #[test]
    fn test_pre_approved_pair_skips_gate() {
        let mut gate = GateEvaluator::new(10);
        let input = json!({"path": "a.txt", "content": "hi"});
        assert!(gate.should_gate("write_file", &input, true));

        gate.approve("write_file", &input);
        assert!(!gate.should_gate("write_file", &input, true));

        // A different input for the same tool still gates.
        assert!(gate.should_gate("write_file", &json!({"path": "b.txt", "content": "hi"}), true));
    }

    #[test]
    fn test_pre_approval_ignores_key_order() {
        // serde_json normalizes map key order, so two wire forms of the
        // same input share one cache entry.
        let mut gate = GateEvaluator::new(10);
        let first: Value = serde_json::from_str(r#"{"path": "a.txt", "content": "hi"}"#).unwrap();
        let second: Value = serde_json::from_str(r#"{"content": "hi", "path": "a.txt"}"#).unwrap();

        gate.approve("write_file", &first);
        assert!(gate.is_pre_approved("write_file", &second));
    }

    #[test]
    fn test_batch_counter_reaches_threshold() {
        let mut gate = GateEvaluator::new(2);
        assert!(!gate.batch_due());

        assert_eq!(gate.record_modifying_op("write_file a"), 1);
        assert!(!gate.batch_due());

        assert_eq!(gate.record_modifying_op("write_file b"), 2);
        assert!(gate.batch_due());
        assert_eq!(gate.covered_ops(), vec!["write_file a", "write_file b"]);

        gate.reset_batch();
        assert!(!gate.batch_due());
        assert!(gate.covered_ops().is_empty());
    }

    #[test]
    fn test_zero_threshold_disables_batching() {
        let mut gate = GateEvaluator::new(0);
        for i in 0..100 {
            gate.record_modifying_op(format!("op {i}"));
        }
        assert!(!gate.batch_due());
    }
}
