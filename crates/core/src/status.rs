//! Coarse agent status.

use serde::{Deserialize, Serialize};

/// What the agent is currently doing.
///
/// Consumers treat this as last-write-wins: any value may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Thinking,
    Planning,
    Executing,
}

impl AgentStatus {
    /// Whether a stream that ends in this status ended cleanly.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Thinking => "thinking",
            Self::Planning => "planning",
            Self::Executing => "executing",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(AgentStatus::default(), AgentStatus::Idle);
        assert!(AgentStatus::Idle.is_terminal());
        assert!(!AgentStatus::Executing.is_terminal());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&AgentStatus::Planning).unwrap();
        assert_eq!(json, r#""planning""#);
    }
}
