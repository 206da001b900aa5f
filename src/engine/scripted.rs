//! Deterministic replay engine.
//!
//! Replays a declared step sequence and records every input it is fed in
//! its transcript. This is the engine the stock binary wires (steps
//! loaded from the `ENGINE_SCRIPT` file) and the double the orchestrator
//! tests drive end-to-end. Provider-backed engines implement
//! [`ReasoningEngine`] outside this crate.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{EngineFactory, EngineInput, EngineStep, ReasoningEngine};

pub struct ScriptedEngine {
    steps: VecDeque<EngineStep>,
    transcript: Vec<Value>,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<EngineStep>) -> Self {
        Self {
            steps: steps.into(),
            transcript: Vec::new(),
        }
    }

    /// Parse a script: a JSON array of steps, e.g.
    ///
    /// ```json
    /// [
    ///   {"tool_call": {"tool": "write_file", "input": {"path": "a.txt", "content": "hi"}}},
    ///   {"finish": {"answer": "done"}}
    /// ]
    /// ```
    pub fn from_script(script: &Value) -> anyhow::Result<Self> {
        let steps: Vec<EngineStep> = serde_json::from_value(script.clone())
            .map_err(|e| anyhow::anyhow!("invalid engine script: {e}"))?;
        Ok(Self::new(steps))
    }

    /// Everything the engine has been fed so far.
    pub fn transcript(&self) -> &[Value] {
        &self.transcript
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn next_step(&mut self, input: EngineInput) -> anyhow::Result<EngineStep> {
        let entry = match &input {
            EngineInput::Task(text) => json!({"role": "task", "content": text}),
            EngineInput::Observation(text) => json!({"role": "observation", "content": text}),
        };
        self.transcript.push(entry);

        Ok(self.steps.pop_front().unwrap_or_else(|| EngineStep::Finish {
            answer: "Script exhausted before an explicit finish step".to_string(),
        }))
    }

    fn conversation_snapshot(&self) -> Value {
        Value::Array(self.transcript.clone())
    }
}

/// Replays the same script for every task it creates.
pub struct ScriptedEngineFactory {
    steps: Vec<EngineStep>,
}

impl ScriptedEngineFactory {
    pub fn new(steps: Vec<EngineStep>) -> Self {
        Self { steps }
    }

    pub fn from_script(script: &Value) -> anyhow::Result<Self> {
        let probe = ScriptedEngine::from_script(script)?;
        Ok(Self {
            steps: probe.steps.into(),
        })
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn create(&self, _model: Option<&str>) -> Box<dyn ReasoningEngine> {
        Box::new(ScriptedEngine::new(self.steps.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_steps_in_order() {
        let mut engine = ScriptedEngine::new(vec![
            EngineStep::ToolCall {
                tool: "read_file".to_string(),
                input: json!({"path": "a.txt"}),
            },
            EngineStep::Finish {
                answer: "done".to_string(),
            },
        ]);

        let first = engine.next_step(EngineInput::Task("do it".to_string())).await.unwrap();
        assert!(matches!(first, EngineStep::ToolCall { tool, .. } if tool == "read_file"));

        let second = engine
            .next_step(EngineInput::Observation("file contents".to_string()))
            .await
            .unwrap();
        assert!(matches!(second, EngineStep::Finish { answer } if answer == "done"));
    }

    #[tokio::test]
    async fn test_transcript_records_every_input() {
        let mut engine = ScriptedEngine::new(vec![]);
        engine.next_step(EngineInput::Task("task".to_string())).await.unwrap();
        engine
            .next_step(EngineInput::Observation("obs".to_string()))
            .await
            .unwrap();

        let snapshot = engine.conversation_snapshot();
        let entries = snapshot.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["role"], "task");
        assert_eq!(entries[1]["role"], "observation");
        assert_eq!(entries[1]["content"], "obs");
    }

    #[tokio::test]
    async fn test_exhausted_script_finishes() {
        let mut engine = ScriptedEngine::new(vec![]);
        let step = engine.next_step(EngineInput::Task("task".to_string())).await.unwrap();
        assert!(matches!(step, EngineStep::Finish { .. }));
    }

    #[test]
    fn test_script_parsing() {
        let script = json!([
            {"tool_call": {"tool": "write_file", "input": {"path": "a.txt", "content": "hi"}}},
            {"propose_plan": {"plan": {"steps": ["one", "two"]}}},
            {"report_failure": {"failure": {"step": "build", "error": "exit 1"}}},
            {"finish": {"answer": "done"}}
        ]);
        let engine = ScriptedEngine::from_script(&script).unwrap();
        assert_eq!(engine.steps.len(), 4);

        let bad = json!([{"no_such_step": {}}]);
        assert!(ScriptedEngine::from_script(&bad).is_err());
    }
}
