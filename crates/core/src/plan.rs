//! Agent plans: an ordered list of steps with individual progress.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress of a single plan step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Failed,
}

/// One step of an [`AgentPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique step ID
    pub id: String,

    /// What this step does
    pub description: String,

    /// Current progress
    #[serde(default)]
    pub status: StepStatus,
}

impl Step {
    /// Create a pending step with a fresh ID.
    pub fn pending(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            status: StepStatus::Pending,
        }
    }
}

/// A goal and the ordered steps to reach it.
///
/// Step order is fixed once the plan is created; only each step's
/// `status` changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPlan {
    pub goal: String,
    pub steps: Vec<Step>,
}

impl AgentPlan {
    pub fn new(goal: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            goal: goal.into(),
            steps,
        }
    }

    /// Build a plan of pending steps from their descriptions.
    pub fn from_descriptions<I, S>(goal: impl Into<String>, descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(goal, descriptions.into_iter().map(Step::pending).collect())
    }

    /// Return a copy with one step's status replaced.
    ///
    /// Returns `None` when `index` is out of bounds.
    pub fn with_step_status(&self, index: usize, status: StepStatus) -> Option<Self> {
        if index >= self.steps.len() {
            return None;
        }
        let mut next = self.clone();
        next.steps[index].status = status;
        Some(next)
    }
}
