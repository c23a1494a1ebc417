//! The step-bounded agent loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use stepstream_config::AppConfig;
use stepstream_core::delta::{Delta, StepProgress};
use stepstream_core::event::{DomainEvent, EventBus};
use stepstream_core::message::Message;
use stepstream_core::model::{LanguageModel, ModelReply, ModelRequest, PlanRequest, ToolChoice};
use stepstream_core::status::AgentStatus;
use stepstream_core::Result;
use tracing::{debug, info, warn};

use crate::gate::GateSet;
use crate::run::{RunContext, RunHandle, RunOutcome, RunState, RunSummary};
use crate::writer::DeltaWriter;

/// Drives one model through at most `max_steps` tool calls per run,
/// reporting everything it does as deltas.
#[derive(Clone)]
pub struct AgentLoop {
    /// The model deciding each step
    model: Arc<dyn LanguageModel>,

    /// System prompt for every model call
    system_prompt: String,

    /// `None` runs a single reasoning-only call
    tool_choice: ToolChoice,

    /// Upper bound on model calls in the step loop
    max_steps: usize,

    /// Gated tools the model may call
    gates: Arc<GateSet>,

    /// Capacity of each run's delta channel
    delta_buffer: usize,

    /// Optional side channel for domain events
    event_bus: Option<Arc<EventBus>>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        system_prompt: impl Into<String>,
        gates: Arc<GateSet>,
    ) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
            tool_choice: ToolChoice::Auto,
            max_steps: 5,
            gates,
            delta_buffer: 128,
            event_bus: None,
        }
    }

    /// Build a loop from configuration.
    pub fn from_config(
        model: Arc<dyn LanguageModel>,
        gates: Arc<GateSet>,
        config: &AppConfig,
    ) -> Self {
        Self::new(model, config.system_prompt.clone(), gates)
            .with_tool_choice(config.effective_tool_choice())
            .with_max_steps(config.max_steps)
            .with_delta_buffer(config.delta_buffer)
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    /// Set the step budget. Values below 1 are raised to 1.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn with_delta_buffer(mut self, capacity: usize) -> Self {
        self.delta_buffer = capacity.max(1);
        self
    }

    /// Publish run and tool events to `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn tool_choice(&self) -> ToolChoice {
        self.tool_choice
    }

    /// Spawn a run for `prompt` on the tokio runtime.
    ///
    /// The returned handle must be drained: once the delta buffer is full
    /// the run waits for the consumer.
    pub fn start(&self, prompt: impl Into<String>) -> RunHandle {
        let (writer, deltas) = DeltaWriter::channel(self.delta_buffer);
        let (mut ctx, state) = RunContext::new(writer);
        if let Some(bus) = &self.event_bus {
            ctx = ctx.with_event_bus(bus.clone());
        }

        let agent = self.clone();
        let prompt = prompt.into();
        RunHandle::spawn(ctx, deltas, state, move |ctx| async move {
            agent.run(&prompt, ctx).await
        })
    }

    /// Execute one run to completion on the current task.
    ///
    /// Never fails: model errors and internal faults are reported as an
    /// `error` delta, and every run ends with `status-set(idle)`.
    pub async fn run(&self, prompt: &str, ctx: RunContext) -> RunSummary {
        info!(
            run_id = %ctx.run_id,
            max_steps = self.max_steps,
            tool_choice = tool_choice_label(self.tool_choice),
            "Run started"
        );
        ctx.publish(DomainEvent::RunStarted {
            run_id: ctx.run_id.clone(),
            tool_choice: tool_choice_label(self.tool_choice).to_string(),
            max_steps: self.max_steps,
            timestamp: Utc::now(),
        });

        let mut summary = RunSummary::new(&ctx.run_id);
        let driven = AssertUnwindSafe(self.drive(prompt, &ctx, &mut summary))
            .catch_unwind()
            .await;

        let outcome = match driven {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(run_id = %ctx.run_id, error = %e, "Run faulted");
                ctx.emit(Delta::Error(e.to_string())).await;
                RunOutcome::Faulted(e.to_string())
            }
            Err(_) => {
                warn!(run_id = %ctx.run_id, "Agent loop panicked");
                let message = "internal error: agent loop panicked".to_string();
                ctx.emit(Delta::Error(message.clone())).await;
                RunOutcome::Faulted(message)
            }
        };

        ctx.emit(Delta::StatusSet(AgentStatus::Idle)).await;
        ctx.set_state(RunState::Finished(outcome.clone()));
        ctx.publish(DomainEvent::RunFinished {
            run_id: ctx.run_id.clone(),
            outcome: outcome.as_str().to_string(),
            steps_taken: summary.steps_taken,
            timestamp: Utc::now(),
        });
        info!(
            run_id = %ctx.run_id,
            outcome = outcome.as_str(),
            steps = summary.steps_taken,
            tool_calls = summary.tool_calls,
            "Run finished"
        );

        summary.outcome = outcome;
        summary
    }

    async fn drive(
        &self,
        prompt: &str,
        ctx: &RunContext,
        summary: &mut RunSummary,
    ) -> Result<RunOutcome> {
        ctx.emit(Delta::StatusSet(AgentStatus::Thinking)).await;

        if self.tool_choice == ToolChoice::None {
            summary.final_text = Some(self.reason(prompt, ctx).await?);
            return Ok(RunOutcome::Completed);
        }

        ctx.emit(Delta::StatusSet(AgentStatus::Planning)).await;
        let tools = self.gates.definitions();
        let plan = self
            .model
            .plan(PlanRequest {
                system_prompt: self.system_prompt.clone(),
                prompt: prompt.to_string(),
                tools: tools.clone(),
            })
            .await?;
        debug!(run_id = %ctx.run_id, steps = plan.steps.len(), "Plan drafted");
        ctx.emit(Delta::PlanSet(plan)).await;
        ctx.emit(Delta::StatusSet(AgentStatus::Executing)).await;

        let mut messages = vec![Message::user(prompt)];
        for step in 0..self.max_steps {
            if ctx.cancel.is_cancelled() {
                info!(run_id = %ctx.run_id, step, "Run cancelled");
                return Ok(RunOutcome::Cancelled);
            }
            ctx.set_state(RunState::Running { step });
            summary.steps_taken += 1;

            let reply = self
                .model
                .call(ModelRequest {
                    system_prompt: self.system_prompt.clone(),
                    messages: messages.clone(),
                    tools: tools.clone(),
                    tool_choice: self.tool_choice,
                })
                .await?;

            match reply {
                ModelReply::ToolCall { call } => {
                    debug!(
                        run_id = %ctx.run_id,
                        step,
                        tool = %call.name,
                        "Model requested a tool"
                    );
                    summary.tool_calls += 1;
                    let outcome = self.gates.invoke(&call, ctx, step).await;

                    let invocation_id = call.id.clone();
                    messages.push(Message::assistant_tool_call(call));
                    messages.push(Message::tool_result(invocation_id, outcome.transcript_text()));

                    ctx.emit(Delta::StepProgress(StepProgress {
                        step_index: step,
                        status: outcome.step_status(),
                    }))
                    .await;
                }
                ModelReply::Text { text } => {
                    ctx.emit(Delta::TextDelta(text.clone())).await;
                    self.flush_documents(ctx).await;
                    summary.final_text = Some(text);
                    return Ok(RunOutcome::Completed);
                }
            }
        }

        info!(run_id = %ctx.run_id, max_steps = self.max_steps, "Step budget exhausted");
        self.flush_documents(ctx).await;
        Ok(RunOutcome::Exhausted)
    }

    /// Reasoning-only mode: one tool-less call, streamed as text deltas.
    async fn reason(&self, prompt: &str, ctx: &RunContext) -> Result<String> {
        let mut chunks = self
            .model
            .stream(ModelRequest {
                system_prompt: self.system_prompt.clone(),
                messages: vec![Message::user(prompt)],
                tools: vec![],
                tool_choice: ToolChoice::None,
            })
            .await?;

        let mut text = String::new();
        while let Some(chunk) = chunks.recv().await {
            let chunk = chunk?;
            text.push_str(&chunk);
            ctx.emit(Delta::TextDelta(chunk)).await;
        }
        Ok(text)
    }

    async fn flush_documents(&self, ctx: &RunContext) {
        let staged = ctx.documents.drain();
        if !staged.is_empty() {
            debug!(run_id = %ctx.run_id, count = staged.len(), "Flushing document deltas");
        }
        for delta in staged {
            ctx.emit(delta).await;
        }
    }
}

fn tool_choice_label(choice: ToolChoice) -> &'static str {
    match choice {
        ToolChoice::None => "none",
        ToolChoice::Auto => "auto",
    }
}
