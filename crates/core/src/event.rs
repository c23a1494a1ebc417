//! Domain event system: decoupled observation of agent runs.
//!
//! Deltas are the client-facing stream of one run. Domain events are the
//! process-wide side channel: any number of subscribers (loggers, metrics,
//! audit) can watch every run without touching its delta stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A run began
    RunStarted {
        run_id: String,
        tool_choice: String,
        max_steps: usize,
        timestamp: DateTime<Utc>,
    },

    /// A gated tool invocation settled
    ToolExecuted {
        run_id: String,
        tool_name: String,
        outcome: String, // "completed", "failed", "rejected"
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run is suspended waiting for a human
    ApprovalRequested {
        run_id: String,
        invocation_id: String,
        tool_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A run emitted its terminal status
    RunFinished {
        run_id: String,
        outcome: String,
        steps_taken: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
