//! Tool invocation gates.
//!
//! A gate wraps one tool. Every invocation is bracketed by lifecycle deltas
//! (`tool-start`, then `tool-result` or `tool-failed`), optionally preceded
//! by a human approval round-trip, and optionally bounded by a deadline.
//! Whatever happens inside the tool, the gate settles to a [`GateOutcome`];
//! it never returns an error to the loop.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use stepstream_core::delta::{
    ApprovalDecision, ApprovalResponse, Delta, ToolFailure, ToolInvocation, ToolOutcome,
};
use stepstream_core::error::ToolError;
use stepstream_core::event::DomainEvent;
use stepstream_core::plan::StepStatus;
use stepstream_core::tool::{Tool, ToolCall, ToolContext, ToolDefinition, ToolResult};
use tracing::{debug, info, warn};

use crate::run::{RunContext, RunState};

/// How a gated invocation settled.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// The tool ran and reported success.
    Completed(ToolResult),
    /// The tool errored, reported failure, timed out or does not exist.
    Failed(String),
    /// A human declined; the tool never ran.
    Rejected,
}

impl GateOutcome {
    /// The plan-step status this outcome maps to.
    pub fn step_status(&self) -> StepStatus {
        match self {
            Self::Completed(_) => StepStatus::Done,
            Self::Failed(_) | Self::Rejected => StepStatus::Failed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Rejected => "rejected",
        }
    }

    /// What the model sees as the tool's answer.
    pub fn transcript_text(&self) -> String {
        match self {
            Self::Completed(result) => result.output.clone(),
            Self::Failed(reason) => format!("Error: {reason}"),
            Self::Rejected => "The user rejected this tool call.".to_string(),
        }
    }
}

/// A tool plus the policy for invoking it.
pub struct ToolGate {
    tool: Arc<dyn Tool>,
    requires_approval: bool,
    timeout: Option<Duration>,
}

impl ToolGate {
    pub fn new(tool: Arc<dyn Tool>) -> Self {
        Self {
            tool,
            requires_approval: false,
            timeout: None,
        }
    }

    /// Require a human decision before each invocation.
    pub fn with_approval(mut self, required: bool) -> Self {
        self.requires_approval = required;
        self
    }

    /// Bound each invocation by a deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        self.tool.name()
    }

    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    pub fn definition(&self) -> ToolDefinition {
        self.tool.to_definition()
    }

    /// Run one invocation through the gate.
    pub async fn invoke(&self, call: &ToolCall, run: &RunContext, step: usize) -> GateOutcome {
        if self.requires_approval {
            let decision = self.await_approval(call, run, step).await;
            if decision == ApprovalDecision::Reject {
                info!(tool = %call.name, invocation_id = %call.id, "Tool call rejected");
                return GateOutcome::Rejected;
            }
        }

        run.emit(Delta::ToolStart(ToolInvocation {
            invocation_id: call.id.clone(),
            tool: call.name.clone(),
            input: call.arguments.clone(),
        }))
        .await;

        let ctx = ToolContext::new(&call.id, run.documents.clone());
        match self.execute(call, &ctx).await {
            Ok(result) if result.success => {
                debug!(tool = %call.name, invocation_id = %call.id, "Tool call completed");
                run.emit(Delta::ToolResult(ToolOutcome {
                    invocation_id: call.id.clone(),
                    tool: call.name.clone(),
                    output: result.wire_output(),
                }))
                .await;
                GateOutcome::Completed(result)
            }
            Ok(result) => {
                warn!(tool = %call.name, "Tool reported failure: {}", result.output);
                fail(run, call, result.output).await
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                fail(run, call, e.to_string()).await
            }
        }
    }

    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let execution = AssertUnwindSafe(self.tool.execute(call.arguments.clone(), ctx))
            .catch_unwind()
            .map(|settled| {
                settled.unwrap_or_else(|_| {
                    Err(ToolError::ExecutionFailed {
                        tool_name: call.name.clone(),
                        reason: "tool panicked".into(),
                    })
                })
            });

        let Some(limit) = self.timeout else {
            return execution.await;
        };
        match tokio::time::timeout(limit, execution).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool_name: call.name.clone(),
                timeout_ms: limit.as_millis() as u64,
            }),
        }
    }

    /// Suspend the run until a human answers. Cancellation while suspended
    /// counts as a rejection but is not reported as `approval-responded`,
    /// since nobody answered.
    async fn await_approval(
        &self,
        call: &ToolCall,
        run: &RunContext,
        step: usize,
    ) -> ApprovalDecision {
        let answer = run.approvals.register(&call.id);
        run.set_state(RunState::Suspended {
            step,
            invocation_id: call.id.clone(),
            tool: call.name.clone(),
        });
        run.publish(DomainEvent::ApprovalRequested {
            run_id: run.run_id.clone(),
            invocation_id: call.id.clone(),
            tool_name: call.name.clone(),
            timestamp: Utc::now(),
        });
        info!(tool = %call.name, invocation_id = %call.id, "Run suspended for approval");

        run.emit(Delta::ApprovalRequested(ToolInvocation {
            invocation_id: call.id.clone(),
            tool: call.name.clone(),
            input: call.arguments.clone(),
        }))
        .await;

        let answered = tokio::select! {
            biased;
            answer = answer => Some(answer.unwrap_or(ApprovalDecision::Reject)),
            _ = run.cancel.cancelled() => {
                run.approvals.withdraw(&call.id);
                debug!(invocation_id = %call.id, "Run cancelled while suspended");
                None
            }
        };

        run.set_state(RunState::Running { step });
        let Some(decision) = answered else {
            return ApprovalDecision::Reject;
        };
        run.emit(Delta::ApprovalResponded(ApprovalResponse {
            invocation_id: call.id.clone(),
            decision,
        }))
        .await;
        decision
    }
}

async fn fail(run: &RunContext, call: &ToolCall, error: String) -> GateOutcome {
    run.emit(Delta::ToolFailed(ToolFailure {
        invocation_id: call.id.clone(),
        tool: call.name.clone(),
        error: error.clone(),
    }))
    .await;
    GateOutcome::Failed(error)
}

/// The gates available to a run, keyed by tool name.
#[derive(Default)]
pub struct GateSet {
    gates: HashMap<String, ToolGate>,
}

impl GateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gate. Replaces any existing gate with the same name.
    pub fn register(&mut self, gate: ToolGate) {
        self.gates.insert(gate.name().to_string(), gate);
    }

    pub fn get(&self, name: &str) -> Option<&ToolGate> {
        self.gates.get(name)
    }

    /// Tool definitions for the model, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.gates.values().map(ToolGate::definition).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.gates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Invoke a call through the matching gate. A call to an unregistered
    /// tool settles as a failure.
    pub async fn invoke(&self, call: &ToolCall, run: &RunContext, step: usize) -> GateOutcome {
        let started = Instant::now();
        let outcome = match self.gates.get(&call.name) {
            Some(gate) => gate.invoke(call, run, step).await,
            None => {
                warn!(tool = %call.name, "Model called an unknown tool");
                fail(run, call, ToolError::NotFound(call.name.clone()).to_string()).await
            }
        };

        run.publish(DomainEvent::ToolExecuted {
            run_id: run.run_id.clone(),
            tool_name: call.name.clone(),
            outcome: outcome.label().to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        outcome
    }
}
