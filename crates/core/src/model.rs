//! LanguageModel trait: the abstraction over the model the agent drives.
//!
//! A model is asked for one action at a time: either a text answer or a
//! single tool call. It can also draft the run's initial plan.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ModelError;
use crate::message::Message;
use crate::plan::AgentPlan;
use crate::tool::{ToolCall, ToolDefinition};

/// Whether the model may call tools during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Reasoning-only: one call, no tools, no plan.
    None,
    /// The model decides when to call tools.
    #[default]
    Auto,
}

/// One request to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// System instructions
    pub system_prompt: String,

    /// The transcript so far
    pub messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Tool-choice policy for this call
    #[serde(default)]
    pub tool_choice: ToolChoice,
}

/// What the model decided to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelReply {
    /// A final text answer.
    Text { text: String },
    /// Call a tool and report back.
    ToolCall { call: ToolCall },
}

/// Input to plan drafting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub system_prompt: String,
    pub prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

/// The JSON shape the default planner asks the model for.
#[derive(Debug, Deserialize)]
struct PlanDraft {
    goal: String,
    steps: Vec<String>,
}

const PLANNING_INSTRUCTIONS: &str = "Before acting, reply with only a JSON object of the form \
{\"goal\": string, \"steps\": [string]} listing the steps you will take.";

/// The core LanguageModel trait.
///
/// The agent loop calls `call()` once per step without knowing which
/// backend answers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// A human-readable name for this model backend.
    fn name(&self) -> &str;

    /// Ask for the next action.
    async fn call(&self, request: ModelRequest) -> Result<ModelReply, ModelError>;

    /// Ask for a text answer as a stream of chunks.
    ///
    /// Default implementation calls `call()` and sends the text as a single chunk.
    async fn stream(
        &self,
        request: ModelRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<String, ModelError>>, ModelError> {
        let text = match self.call(request).await? {
            ModelReply::Text { text } => text,
            ModelReply::ToolCall { call } => {
                return Err(ModelError::InvalidReply(format!(
                    "expected text, got a call to '{}'",
                    call.name
                )));
            }
        };
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }

    /// Draft the run's initial plan.
    ///
    /// Default implementation asks the model for a JSON plan and falls back
    /// to a single step covering the whole prompt when the reply is not one.
    async fn plan(&self, request: PlanRequest) -> Result<AgentPlan, ModelError> {
        let reply = self
            .call(ModelRequest {
                system_prompt: format!("{}\n\n{}", request.system_prompt, PLANNING_INSTRUCTIONS),
                messages: vec![Message::user(&request.prompt)],
                tools: request.tools,
                tool_choice: ToolChoice::None,
            })
            .await?;

        let plan = match reply {
            ModelReply::Text { text } => parse_plan(&text),
            ModelReply::ToolCall { .. } => None,
        };
        Ok(plan.unwrap_or_else(|| {
            debug!("Model did not return a JSON plan, using a single-step plan");
            AgentPlan::from_descriptions(&request.prompt, [request.prompt.as_str()])
        }))
    }
}

/// Extract a `{goal, steps}` object from model text, tolerating code fences
/// and surrounding prose.
pub fn parse_plan(text: &str) -> Option<AgentPlan> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let draft: PlanDraft = serde_json::from_str(&text[start..=end]).ok()?;
    if draft.steps.is_empty() {
        return None;
    }
    Some(AgentPlan::from_descriptions(draft.goal, draft.steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StepStatus;

    struct FixedModel {
        reply: ModelReply,
    }

    #[async_trait]
    impl LanguageModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn call(&self, _request: ModelRequest) -> Result<ModelReply, ModelError> {
            Ok(self.reply.clone())
        }
    }

    fn plan_request(prompt: &str) -> PlanRequest {
        PlanRequest {
            system_prompt: "You are helpful.".into(),
            prompt: prompt.into(),
            tools: vec![],
        }
    }

    #[test]
    fn parse_plan_from_fenced_json() {
        let text = "Here you go:\n```json\n\
                    {\"goal\": \"trip\", \"steps\": [\"weather\", \"pack\"]}\n```";
        let plan = parse_plan(text).unwrap();
        assert_eq!(plan.goal, "trip");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].description, "pack");
        assert_eq!(plan.steps[0].status, StepStatus::Pending);
    }

    #[test]
    fn parse_plan_rejects_prose_and_empty_steps() {
        assert!(parse_plan("no plan here").is_none());
        assert!(parse_plan(r#"{"goal": "x", "steps": []}"#).is_none());
        assert!(parse_plan("} backwards {").is_none());
    }

    #[tokio::test]
    async fn default_plan_uses_model_json() {
        let model = FixedModel {
            reply: ModelReply::Text {
                text: r#"{"goal": "answer", "steps": ["search", "summarize"]}"#.into(),
            },
        };
        let plan = model.plan(plan_request("What's new?")).await.unwrap();
        assert_eq!(plan.goal, "answer");
        assert_eq!(plan.steps.len(), 2);
    }

    #[tokio::test]
    async fn default_plan_falls_back_to_single_step() {
        let model = FixedModel {
            reply: ModelReply::Text {
                text: "I'll just do it.".into(),
            },
        };
        let plan = model.plan(plan_request("Check the weather")).await.unwrap();
        assert_eq!(plan.goal, "Check the weather");
        assert_eq!(plan.steps.len(), 1);
    }

    #[tokio::test]
    async fn default_stream_wraps_text() {
        let model = FixedModel {
            reply: ModelReply::Text {
                text: "thinking done".into(),
            },
        };
        let mut rx = model
            .stream(ModelRequest {
                system_prompt: String::new(),
                messages: vec![],
                tools: vec![],
                tool_choice: ToolChoice::None,
            })
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), "thinking done");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn default_stream_rejects_tool_calls() {
        let model = FixedModel {
            reply: ModelReply::ToolCall {
                call: ToolCall::new("get_weather", serde_json::json!({})),
            },
        };
        let err = model
            .stream(ModelRequest {
                system_prompt: String::new(),
                messages: vec![],
                tools: vec![],
                tool_choice: ToolChoice::None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidReply(_)));
    }

    #[test]
    fn tool_choice_defaults_to_auto() {
        assert_eq!(ToolChoice::default(), ToolChoice::Auto);
        let parsed: ToolChoice = serde_json::from_str(r#""none""#).unwrap();
        assert_eq!(parsed, ToolChoice::None);
    }
}
