//! # StepStream Core
//!
//! The delta protocol, domain types, traits, and error definitions for the
//! StepStream agent runtime. The agent loop produces [`Delta`]s; the client
//! reducer folds them into state. Both sides depend only on this crate.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here ([`LanguageModel`], [`Tool`]). Implementations
//! live in their respective crates, so runs can be driven by scripted models
//! and stub tools in tests.

pub mod artifact;
pub mod delta;
pub mod error;
pub mod event;
pub mod message;
pub mod model;
pub mod plan;
pub mod status;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use artifact::{Artifact, ArtifactKind, ArtifactStatus};
pub use delta::{ApprovalDecision, Delta, StepProgress, TextChunk, WireDelta};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role};
pub use model::{LanguageModel, ModelReply, ModelRequest, PlanRequest, ToolChoice};
pub use plan::{AgentPlan, Step, StepStatus};
pub use status::AgentStatus;
pub use tool::{DocumentDraft, Tool, ToolCall, ToolContext, ToolDefinition, ToolResult};
