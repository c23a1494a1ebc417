//! The agent loop: the producing side of StepStream.
//!
//! A run follows a **Plan → Act → Report** cycle:
//!
//! 1. **Plan**: ask the model for an initial plan and publish it
//! 2. **Act**: one model call per step; tool calls go through a gate
//! 3. **Report**: every state change leaves as a [`Delta`](stepstream_core::Delta)
//!
//! The run ends on a final answer, on cancellation, or when `max_steps` is
//! used up, and always with `status-set(idle)`.

pub mod approval;
pub mod gate;
pub mod loop_runner;
pub mod run;
pub mod scripted;
pub mod writer;

#[cfg(test)]
mod test_helpers;

pub use approval::ApprovalBroker;
pub use gate::{GateOutcome, GateSet, ToolGate};
pub use loop_runner::AgentLoop;
pub use run::{RunContext, RunControl, RunHandle, RunOutcome, RunState, RunSummary};
pub use scripted::ScriptedModel;
pub use writer::DeltaWriter;
