//! Built-in tool implementations for StepStream.
//!
//! Tools give the agent the ability to act: check the weather and draft
//! documents shown beside the chat. [`default_gates`] wraps each one in a
//! gate configured from [`AppConfig`].

pub mod document;
pub mod weather;

use std::sync::Arc;

use stepstream_agent::gate::{GateSet, ToolGate};
use stepstream_config::AppConfig;
use stepstream_core::tool::Tool;
use tracing::debug;

pub use document::CreateDocumentTool;
pub use weather::GetWeatherTool;

/// Every built-in tool.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(GetWeatherTool), Arc::new(CreateDocumentTool)]
}

/// Gate every built-in tool with its configured policy.
pub fn default_gates(config: &AppConfig) -> GateSet {
    let mut gates = GateSet::new();
    for tool in builtin_tools() {
        let policy = config.tool_policy(tool.name());
        debug!(
            tool = tool.name(),
            requires_approval = policy.requires_approval,
            timeout_secs = ?policy.timeout_secs,
            "Registering tool gate"
        );
        gates.register(
            ToolGate::new(tool)
                .with_approval(policy.requires_approval)
                .with_timeout(policy.timeout()),
        );
    }
    gates
}
