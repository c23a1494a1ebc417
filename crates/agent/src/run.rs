//! Runs: one bounded execution of the agent loop and the handles around it.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stepstream_core::delta::{ApprovalDecision, Delta};
use stepstream_core::event::{DomainEvent, EventBus};
use stepstream_core::tool::DocumentDraft;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::warn;
use uuid::Uuid;

use crate::approval::ApprovalBroker;
use crate::writer::DeltaWriter;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model gave a final answer.
    Completed,
    /// `max_steps` ran out before a final answer. Not an error.
    Exhausted,
    /// Cancelled between steps.
    Cancelled,
    /// The model or the loop itself failed; the run still ended idle.
    Faulted(String),
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
            Self::Faulted(_) => "faulted",
        }
    }
}

/// Where a run is right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Created, not yet at its first step.
    Starting,
    /// Working on `step`.
    Running { step: usize },
    /// Waiting for a human to answer an approval request.
    Suspended {
        step: usize,
        invocation_id: String,
        tool: String,
    },
    Finished(RunOutcome),
}

/// What a finished run reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub outcome: RunOutcome,
    /// Steps begun (model calls in the step loop)
    pub steps_taken: usize,
    /// Tool calls sent through a gate
    pub tool_calls: usize,
    /// The model's final answer, if it gave one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,
}

impl RunSummary {
    pub(crate) fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            outcome: RunOutcome::Completed,
            steps_taken: 0,
            tool_calls: 0,
            final_text: None,
        }
    }
}

/// Everything one run owns: its delta writer, approvals, cancellation,
/// staged documents and observable state. Never shared between runs.
pub struct RunContext {
    pub run_id: String,
    pub writer: DeltaWriter,
    pub approvals: ApprovalBroker,
    pub cancel: CancellationToken,
    pub documents: DocumentDraft,
    pub(crate) event_bus: Option<Arc<EventBus>>,
    state: watch::Sender<RunState>,
}

impl RunContext {
    /// Create a fresh context around a writer.
    pub fn new(writer: DeltaWriter) -> (Self, watch::Receiver<RunState>) {
        let (state, state_rx) = watch::channel(RunState::Starting);
        let ctx = Self {
            run_id: Uuid::new_v4().to_string(),
            writer,
            approvals: ApprovalBroker::new(),
            cancel: CancellationToken::new(),
            documents: DocumentDraft::new(),
            event_bus: None,
            state,
        };
        (ctx, state_rx)
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub async fn emit(&self, delta: Delta) {
        self.writer.emit(delta).await;
    }

    pub(crate) fn set_state(&self, state: RunState) {
        self.state.send_replace(state);
    }

    pub(crate) fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// Controls a spawned run: answer approvals, cancel, watch, join.
///
/// Dropping the control cancels the run. A run suspended on an approval
/// then settles the call as rejected and ends idle.
pub struct RunControl {
    run_id: String,
    approvals: ApprovalBroker,
    cancel: CancellationToken,
    state: watch::Receiver<RunState>,
    task: JoinHandle<RunSummary>,
    _cancel_on_drop: DropGuard,
}

impl RunControl {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Answer an approval request. Returns `false` if the invocation was
    /// not waiting or was already answered.
    pub fn respond(&self, invocation_id: &str, decision: ApprovalDecision) -> bool {
        self.approvals.respond(invocation_id, decision)
    }

    /// Ask the run to stop before its next step.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The current run state.
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state change.
    pub fn state_changes(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Wait until the run is suspended on an unanswered approval and return
    /// its invocation ID. Returns `None` if the run finishes first.
    ///
    /// A suspension that was already answered is skipped, even while the
    /// run has not yet woken up to leave it.
    pub async fn next_suspension(&mut self) -> Option<String> {
        loop {
            match &*self.state.borrow_and_update() {
                RunState::Suspended { invocation_id, .. }
                    if self.approvals.is_pending(invocation_id) =>
                {
                    return Some(invocation_id.clone());
                }
                RunState::Finished(_) => return None,
                _ => {}
            }
            if self.state.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Wait for the run to finish.
    pub async fn join(self) -> RunSummary {
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Run task did not complete");
                RunSummary {
                    outcome: RunOutcome::Faulted(e.to_string()),
                    ..RunSummary::new(&self.run_id)
                }
            }
        }
    }
}

/// A spawned run: its delta stream plus its controls.
pub struct RunHandle {
    deltas: mpsc::Receiver<Delta>,
    control: RunControl,
}

impl RunHandle {
    /// Spawn `run` with `ctx` and wrap the resulting task.
    pub(crate) fn spawn<F, Fut>(
        ctx: RunContext,
        deltas: mpsc::Receiver<Delta>,
        state: watch::Receiver<RunState>,
        run: F,
    ) -> Self
    where
        F: FnOnce(RunContext) -> Fut,
        Fut: Future<Output = RunSummary> + Send + 'static,
    {
        let run_id = ctx.run_id.clone();
        let approvals = ctx.approvals.clone();
        let cancel = ctx.cancel.clone();
        let task = tokio::spawn(run(ctx));
        Self {
            deltas,
            control: RunControl {
                run_id,
                approvals,
                _cancel_on_drop: cancel.clone().drop_guard(),
                cancel,
                state,
                task,
            },
        }
    }

    pub fn run_id(&self) -> &str {
        self.control.run_id()
    }

    /// Receive the next delta; `None` once the run has finished and the
    /// stream is drained.
    pub async fn recv(&mut self) -> Option<Delta> {
        self.deltas.recv().await
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut RunControl {
        &mut self.control
    }

    /// Separate the stream from the controls, e.g. to hand the stream to a
    /// consumer task.
    pub fn into_parts(self) -> (mpsc::Receiver<Delta>, RunControl) {
        (self.deltas, self.control)
    }

    /// Drain the stream to the end and join the run.
    pub async fn collect(self) -> (Vec<Delta>, RunSummary) {
        let (mut deltas, control) = self.into_parts();
        let mut seen = Vec::new();
        while let Some(delta) = deltas.recv().await {
            seen.push(delta);
        }
        (seen, control.join().await)
    }
}
