//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: look up the weather,
//! draft a document, and so on. The agent never calls a tool directly; every
//! invocation goes through a gate that reports its lifecycle on the run's
//! delta stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

use crate::delta::Delta;
use crate::error::ToolError;

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique invocation ID
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a call with a fresh invocation ID.
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The JSON value reported on the stream for this result.
    pub fn wire_output(&self) -> serde_json::Value {
        self.data
            .clone()
            .unwrap_or_else(|| serde_json::Value::String(self.output.clone()))
    }
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Artifact deltas staged by tools during a run.
///
/// The agent loop drains the draft when the run finalizes, so document
/// lifecycle deltas reach the stream after the tool calls that produced them.
#[derive(Debug, Clone, Default)]
pub struct DocumentDraft {
    pending: Arc<Mutex<Vec<Delta>>>,
}

impl DocumentDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an artifact delta. Non-artifact deltas are dropped.
    pub fn stage(&self, delta: Delta) {
        if !delta.is_artifact_delta() {
            warn!(kind = delta.kind(), "Ignoring non-document delta staged by a tool");
            return;
        }
        self.lock().push(delta);
    }

    /// Take every staged delta, oldest first.
    pub fn drain(&self) -> Vec<Delta> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Delta>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-invocation context handed to a tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The invocation this execution belongs to
    pub invocation_id: String,

    /// Where the tool stages document deltas
    pub documents: DocumentDraft,
}

impl ToolContext {
    pub fn new(invocation_id: impl Into<String>, documents: DocumentDraft) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            documents,
        }
    }
}

/// The core Tool trait.
///
/// Each tool implements this trait and is wrapped in a gate before the
/// agent loop can reach it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_weather").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
