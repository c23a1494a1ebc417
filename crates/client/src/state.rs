//! The three slices a client renders.

use serde::{Deserialize, Serialize};
use stepstream_core::artifact::Artifact;
use stepstream_core::plan::AgentPlan;
use stepstream_core::status::AgentStatus;

/// Everything derived from a run's deltas so far.
///
/// The slices are independent: a delta for one never changes another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// Coarse agent status, last write wins
    pub status: AgentStatus,

    /// The current plan, once one has been set
    pub plan: Option<AgentPlan>,

    /// The document being assembled, once a `doc-*` delta arrived
    pub artifact: Option<Artifact>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps in the current plan that have reached `done`.
    pub fn completed_steps(&self) -> usize {
        self.plan.as_ref().map_or(0, |plan| {
            plan.steps
                .iter()
                .filter(|s| s.status == stepstream_core::plan::StepStatus::Done)
                .count()
        })
    }
}
