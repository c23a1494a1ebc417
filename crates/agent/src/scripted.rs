//! A scripted language model for demos and tests.
//!
//! Replays a fixed sequence of replies so the agent loop can be exercised
//! end-to-end without network access. Its plan is derived from the tool
//! calls in its script, so the plan it announces matches what it will do.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use stepstream_core::error::ModelError;
use stepstream_core::model::{LanguageModel, ModelReply, ModelRequest, PlanRequest};
use stepstream_core::plan::AgentPlan;
use stepstream_core::tool::ToolCall;
use uuid::Uuid;

pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    /// Returned (with a fresh invocation ID) once the script runs out.
    repeat: Option<ModelReply>,
    plan: Option<AgentPlan>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            repeat: None,
            plan: None,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A model that answers with text straight away.
    pub fn text(text: &str) -> Self {
        Self::new(vec![ModelReply::Text { text: text.into() }])
    }

    /// A model that calls each named tool once, in order, with empty
    /// arguments.
    pub fn tool_calls(names: &[&str]) -> Self {
        Self::new(
            names
                .iter()
                .map(|name| ModelReply::ToolCall {
                    call: ToolCall::new(*name, serde_json::json!({})),
                })
                .collect(),
        )
    }

    /// A model that never stops calling `name`.
    pub fn always_calling(name: &str, arguments: serde_json::Value) -> Self {
        Self::new(vec![]).then_repeat(ModelReply::ToolCall {
            call: ToolCall::new(name, arguments),
        })
    }

    /// Reply with `reply` forever once the script is used up.
    pub fn then_repeat(mut self, reply: ModelReply) -> Self {
        self.repeat = Some(reply);
        self
    }

    /// Announce this plan instead of deriving one from the script.
    pub fn with_plan(mut self, plan: AgentPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Number of `call()`s made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received by `call()`, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> Option<ModelReply> {
        let scripted = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        scripted.or_else(|| {
            self.repeat.clone().map(|reply| match reply {
                ModelReply::ToolCall { mut call } => {
                    call.id = Uuid::new_v4().to_string();
                    ModelReply::ToolCall { call }
                }
                text => text,
            })
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn call(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.next_reply()
            .ok_or_else(|| ModelError::InvalidReply("script exhausted".into()))
    }

    async fn plan(&self, request: PlanRequest) -> Result<AgentPlan, ModelError> {
        if let Some(plan) = &self.plan {
            return Ok(plan.clone());
        }

        let mut steps: Vec<String> = self
            .replies
            .lock()
            .map(|replies| {
                replies
                    .iter()
                    .filter_map(|reply| match reply {
                        ModelReply::ToolCall { call } => Some(call.name.clone()),
                        ModelReply::Text { .. } => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        if steps.is_empty() {
            if let Some(ModelReply::ToolCall { call }) = &self.repeat {
                steps.push(call.name.clone());
            }
        }
        if steps.is_empty() {
            steps.push(request.prompt.clone());
        }
        Ok(AgentPlan::from_descriptions(request.prompt, steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepstream_core::model::ToolChoice;

    fn request() -> ModelRequest {
        ModelRequest {
            system_prompt: String::new(),
            messages: vec![],
            tools: vec![],
            tool_choice: ToolChoice::Auto,
        }
    }

    fn plan_request() -> PlanRequest {
        PlanRequest {
            system_prompt: String::new(),
            prompt: "do things".into(),
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn replays_script_then_errors() {
        let model = ScriptedModel::text("hi");
        assert_eq!(
            model.call(request()).await.unwrap(),
            ModelReply::Text { text: "hi".into() }
        );
        assert!(model.call(request()).await.is_err());
        assert_eq!(model.call_count(), 2);
        assert_eq!(model.requests().len(), 2);
    }

    #[tokio::test]
    async fn repeat_uses_fresh_invocation_ids() {
        let model = ScriptedModel::always_calling("lookup", serde_json::json!({}));
        let first = model.call(request()).await.unwrap();
        let second = model.call(request()).await.unwrap();
        match (first, second) {
            (ModelReply::ToolCall { call: a }, ModelReply::ToolCall { call: b }) => {
                assert_eq!(a.name, "lookup");
                assert_ne!(a.id, b.id);
            }
            other => panic!("Expected two tool calls, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn plan_follows_scripted_tool_calls() {
        let model = ScriptedModel::tool_calls(&["A", "B"]);
        let plan = model.plan(plan_request()).await.unwrap();
        assert_eq!(plan.goal, "do things");
        let descriptions: Vec<_> = plan.steps.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(descriptions, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn plan_for_text_only_script_is_single_step() {
        let model = ScriptedModel::text("done");
        let plan = model.plan(plan_request()).await.unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].description, "do things");
    }
}
