//! Shared stub tools and helpers for agent tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stepstream_core::delta::{Delta, kind};
use stepstream_core::error::ToolError;
use stepstream_core::tool::{Tool, ToolContext, ToolResult};
use tokio::sync::mpsc;

/// Succeeds and counts how often it ran.
pub struct CountingTool {
    name: String,
    invocations: AtomicUsize,
}

impl CountingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Counts its invocations"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ToolResult::ok(format!("{} ran {n} time(s)", self.name))
            .with_data(serde_json::json!({"count": n, "arguments": arguments})))
    }
}

/// Always errors.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky".into(),
            reason: "upstream unavailable".into(),
        })
    }
}

/// Panics when executed.
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "explode"
    }
    fn description(&self) -> &str {
        "Panics"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        panic!("tool bug")
    }
}

/// Sleeps before succeeding.
pub struct SlowTool {
    delay: Duration,
    invocations: AtomicUsize,
}

impl SlowTool {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "Takes its time"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ToolResult::ok("finally"))
    }
}

/// Stages a small text document.
pub struct DraftingTool;

#[async_trait]
impl Tool for DraftingTool {
    fn name(&self) -> &str {
        "draft"
    }
    fn description(&self) -> &str {
        "Drafts a document"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        ctx.documents.stage(Delta::DocId("doc-1".into()));
        ctx.documents.stage(Delta::DocTitle("Notes".into()));
        ctx.documents.stage(Delta::DocFinish);
        Ok(ToolResult::ok("drafted"))
    }
}

/// Everything currently buffered in a delta receiver.
pub fn drain(rx: &mut mpsc::Receiver<Delta>) -> Vec<Delta> {
    let mut deltas = Vec::new();
    while let Ok(delta) = rx.try_recv() {
        deltas.push(delta);
    }
    deltas
}

/// Keep only plan, step and status deltas.
pub fn core_deltas(deltas: &[Delta]) -> Vec<Delta> {
    deltas
        .iter()
        .filter(|d| {
            matches!(
                d.kind(),
                kind::PLAN_SET | kind::STEP_PROGRESS | kind::STATUS_SET
            )
        })
        .cloned()
        .collect()
}
